//! Command dispatch logic for pagewiki

use std::sync::Arc;
use std::time::Instant;

use crate::cli::{Cli, Commands};
use crate::commands::{export, images, init, pages, search, status, tags};
use pagewiki_core::cache::WindowSession;
use pagewiki_core::config::resolve_store_root;
use pagewiki_core::db::StoreContext;
use pagewiki_core::error::Result;

pub fn run(cli: &Cli, start: Instant) -> Result<()> {
    let Some(command) = &cli.command else {
        return handle_no_command();
    };

    let root = resolve_store_root(cli.store.as_deref())?;
    tracing::debug!(elapsed = ?start.elapsed(), root = %root.display(), "resolve_store");

    if let Commands::Init = command {
        return init::execute(cli, &root);
    }

    // One invocation is one window: its own store handle and cache
    let store = Arc::new(StoreContext::open(&root)?);
    let session = WindowSession::new(Arc::clone(&store));

    let result = match command {
        Commands::Init => init::execute(cli, &root),
        Commands::New { text, title } => {
            pages::execute_new(cli, &session, text.as_deref(), title.as_deref())
        }
        Commands::Edit { id, text, title } => {
            pages::execute_edit(cli, &session, *id, text, title.as_deref())
        }
        Commands::Show { id } => pages::execute_show(cli, &session, *id),
        Commands::List => pages::execute_list(cli, &store),
        Commands::Recent => pages::execute_recent(cli, &store),
        Commands::Find { query } => search::execute_find(cli, &store, query),
        Commands::Search { query, title_only } => {
            search::execute_search(cli, &store, query, *title_only)
        }
        Commands::Archive { id } => pages::execute_archive(cli, &session, *id, true),
        Commands::Unarchive { id } => pages::execute_archive(cli, &session, *id, false),
        Commands::Delete { id } => pages::execute_delete(cli, &session, *id),
        Commands::Related { id } => pages::execute_related(cli, &store, *id),
        Commands::Tag(command) => tags::execute(cli, &session, command),
        Commands::Image(command) => images::execute(cli, &session, command),
        Commands::Export { dir } => export::execute(cli, &store, dir),
        Commands::Status => status::execute(cli, &store),
    };

    tracing::debug!(elapsed = ?start.elapsed(), ok = result.is_ok(), "command_complete");
    result
}

fn handle_no_command() -> Result<()> {
    println!("pagewiki {}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("A personal wiki kept in one local SQLite file.");
    println!();
    println!("Run `pagewiki --help` for usage information.");
    Ok(())
}
