//! `pagewiki image` subcommands

use std::fs;
use std::path::Path;

use serde_json::json;

use crate::cli::{Cli, ImageCommands};
use crate::commands::format::{output_by_format_result, print_json, print_json_status, say};
use crate::commands::pages::require_page;
use pagewiki_core::cache::WindowSession;
use pagewiki_core::db::NewImage;
use pagewiki_core::document::{JsonDocument, Node};
use pagewiki_core::error::{Result, WikiError};
use pagewiki_core::page::PageId;

pub fn execute(cli: &Cli, session: &WindowSession, command: &ImageCommands) -> Result<()> {
    match command {
        ImageCommands::Add {
            page,
            file,
            mime,
            width,
            height,
        } => execute_add(cli, session, *page, file, mime.as_deref(), *width, *height),
        ImageCommands::List { page } => execute_list(cli, session, *page),
        ImageCommands::Rm { id } => {
            if !session.store().delete_image(*id)? {
                return Err(WikiError::not_found("image", id));
            }
            output_by_format_result!(cli.format,
                json => print_json_status("deleted", None, &[("id", json!(id))]),
                human => {
                    say(cli, format!("Deleted image {}", id));
                }
            )
        }
        ImageCommands::Cleanup { page } => execute_cleanup(cli, session, *page),
    }
}

/// Store the file as an attachment and embed it at the end of the page
fn execute_add(
    cli: &Cli,
    session: &WindowSession,
    page_id: PageId,
    file: &Path,
    mime: Option<&str>,
    width: Option<i64>,
    height: Option<i64>,
) -> Result<()> {
    let page = require_page(session.store(), page_id)?;
    let mut document = JsonDocument::parse(&page.document)?;

    let data = fs::read(file)?;
    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut image = NewImage::from_file_name(&file_name, data);
    if let Some(mime) = mime {
        image.mime_type = mime.to_string();
    }
    image.width = width;
    image.height = height;

    let id = session.store().create_image(page_id, &image)?;
    document.push(Node::Image {
        id,
        alt: image.original_filename.clone(),
    });
    session.save_page(page_id, &document, page.title.as_deref())?;

    output_by_format_result!(cli.format,
        json => print_json_status(
            "attached",
            None,
            &[
                ("id", json!(id)),
                ("page_id", json!(page_id)),
                ("mime_type", json!(image.mime_type)),
                ("bytes", json!(image.data.len())),
            ],
        ),
        human => {
            println!("{}", id);
        }
    )
}

fn execute_list(cli: &Cli, session: &WindowSession, page_id: PageId) -> Result<()> {
    require_page(session.store(), page_id)?;
    let images = session.store().images_for_page(page_id)?;

    output_by_format_result!(cli.format,
        json => print_json(&images),
        human => {
            for image in &images {
                let dims = match (image.width, image.height) {
                    (Some(w), Some(h)) => format!("{}x{}", w, h),
                    _ => "-".to_string(),
                };
                println!(
                    "{}\t{}\t{} bytes\t{}\t{}",
                    image.id,
                    image.mime_type,
                    image.size(),
                    dims,
                    image.original_filename
                );
            }
        }
    )
}

/// Drop attachments the page's document no longer embeds
fn execute_cleanup(cli: &Cli, session: &WindowSession, page_id: PageId) -> Result<()> {
    let page = require_page(session.store(), page_id)?;
    let document = JsonDocument::parse(&page.document)?;
    let removed = session.store().reconcile_with_document(page_id, &document)?;

    output_by_format_result!(cli.format,
        json => print_json_status("ok", None, &[("removed", json!(removed))]),
        human => {
            say(cli, format!("Removed {} unreferenced image(s)", removed.len()));
        }
    )
}
