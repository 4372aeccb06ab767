//! Page commands: `new`, `edit`, `show`, `list`, `recent`, `archive`,
//! `unarchive`, `delete`, `related`

use std::io;

use serde::Serialize;
use serde_json::json;

use crate::cli::Cli;
use crate::commands::format::{
    output_by_format_result, print_json, print_json_status, print_summaries, say,
};
use pagewiki_core::cache::WindowSession;
use pagewiki_core::db::StoreContext;
use pagewiki_core::document::JsonDocument;
use pagewiki_core::error::{Result, WikiError};
use pagewiki_core::page::{Page, PageId};
use pagewiki_core::{bail_usage, log_cache_metrics};

/// Fetch a page or fail with `PageNotFound`
pub fn require_page(store: &StoreContext, id: PageId) -> Result<Page> {
    store.fetch_page(id)?.ok_or(WikiError::PageNotFound { id })
}

#[derive(Serialize)]
struct PageView<'a> {
    #[serde(flatten)]
    page: &'a Page,
    tags: &'a [String],
}

pub fn execute_new(
    cli: &Cli,
    session: &WindowSession,
    text: Option<&str>,
    title: Option<&str>,
) -> Result<()> {
    let text = match text {
        Some(text) => text.to_string(),
        None => io::read_to_string(io::stdin())?,
    };
    if text.trim().is_empty() && title.is_none() {
        bail_usage!("page text is empty; pass TEXT, pipe it on stdin, or give --title");
    }

    let page = session.create_page(&JsonDocument::from_plain_text(&text), title)?;

    output_by_format_result!(cli.format,
        json => print_json(&page),
        human => {
            println!("{}", page.id);
        }
    )
}

pub fn execute_edit(
    cli: &Cli,
    session: &WindowSession,
    id: PageId,
    text: &str,
    title: Option<&str>,
) -> Result<()> {
    let page = session.save_page(id, &JsonDocument::from_plain_text(text), title)?;

    output_by_format_result!(cli.format,
        json => print_json(&page),
        human => {
            say(cli, format!("Saved page {}: {}", page.id, page.display_title()));
        }
    )
}

/// Show a page through the window cache, recording the view
pub fn execute_show(cli: &Cli, session: &WindowSession, id: PageId) -> Result<()> {
    session.observe(id);
    if !session.mark_viewed(id)? {
        return Err(WikiError::PageNotFound { id });
    }

    let report = session.reconcile();
    if let Some((_, reason)) = report.failed.iter().find(|(failed, _)| *failed == id) {
        return Err(WikiError::Other(format!(
            "failed to load page {}: {}",
            id, reason
        )));
    }
    log_cache_metrics!(session.cache().metrics(), "show");

    let page = session.page(id).ok_or(WikiError::PageNotFound { id })?;
    let tags = session.tags(id).unwrap_or_default();

    output_by_format_result!(cli.format,
        json => print_json(&PageView { page: &page, tags: &tags }),
        human => {
            println!("{}", page.display_title());
            if !tags.is_empty() {
                println!("tags: {}", tags.join(", "));
            }
            if !page.is_live() {
                println!("(archived)");
            }
            println!();
            println!("{}", page.markdown);
        }
    )
}

pub fn execute_list(cli: &Cli, store: &StoreContext) -> Result<()> {
    print_summaries(cli, &store.list_pages()?)
}

pub fn execute_recent(cli: &Cli, store: &StoreContext) -> Result<()> {
    print_summaries(cli, &store.recent_pages()?)
}

/// Archive (`archive = true`) or restore a page
pub fn execute_archive(
    cli: &Cli,
    session: &WindowSession,
    id: PageId,
    archive: bool,
) -> Result<()> {
    require_page(session.store(), id)?;
    let changed = if archive {
        session.archive(id)?
    } else {
        session.unarchive(id)?
    };

    let verb = if archive { "archived" } else { "restored" };
    output_by_format_result!(cli.format,
        json => print_json_status(
            verb,
            None,
            &[("id", json!(id)), ("changed", json!(changed))],
        ),
        human => {
            if changed {
                say(cli, format!("Page {} {}", id, verb));
            } else {
                say(cli, format!("Page {} was already {}", id, verb));
            }
        }
    )
}

pub fn execute_delete(cli: &Cli, session: &WindowSession, id: PageId) -> Result<()> {
    if !session.delete_page(id)? {
        return Err(WikiError::PageNotFound { id });
    }

    output_by_format_result!(cli.format,
        json => print_json_status("deleted", None, &[("id", json!(id))]),
        human => {
            say(cli, format!("Deleted page {}", id));
        }
    )
}

pub fn execute_related(cli: &Cli, store: &StoreContext, id: PageId) -> Result<()> {
    require_page(store, id)?;
    let related = store.related_pages(id)?;

    output_by_format_result!(cli.format,
        json => print_json(&related),
        human => {
            if related.is_empty() && !cli.quiet {
                eprintln!("No related pages");
            }
            for entry in &related {
                println!(
                    "{}\t{}\t{} shared",
                    entry.page.id,
                    entry.page.display_title(),
                    entry.shared_tags
                );
            }
        }
    )
}
