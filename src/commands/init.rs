//! `pagewiki init` command - create a store
//!
//! Idempotent: an existing config file is left alone and the schema bootstrap
//! only creates what is missing.

use std::fs;
use std::path::Path;

use serde_json::json;

use crate::cli::Cli;
use crate::commands::format::{output_by_format_result, print_json_status};
use pagewiki_core::config::{StoreConfig, CONFIG_FILE};
use pagewiki_core::db::StoreContext;
use pagewiki_core::error::Result;

/// Execute the init command
pub fn execute(cli: &Cli, root: &Path) -> Result<()> {
    fs::create_dir_all(root)?;

    let config_path = root.join(CONFIG_FILE);
    let created_config = !config_path.exists();
    if created_config {
        StoreConfig::default().save(&config_path)?;
    }

    let store = StoreContext::open(root)?;
    let pages = store.page_count()?;
    tracing::debug!(root = %root.display(), pages, "store initialized");

    output_by_format_result!(cli.format,
        json => print_json_status(
            "ok",
            None,
            &[
                ("store", json!(root.display().to_string())),
                ("database", json!(store.db_path().display().to_string())),
                ("created_config", json!(created_config)),
            ],
        ),
        human => {
            if !cli.quiet {
                println!("Initialized store at {}", root.display());
            }
        }
    )
}
