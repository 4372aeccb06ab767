//! `pagewiki status` command - store location and counts

use serde_json::json;

use crate::cli::Cli;
use crate::commands::format::{output_by_format_result, print_json};
use pagewiki_core::db::StoreContext;
use pagewiki_core::error::Result;

pub fn execute(cli: &Cli, store: &StoreContext) -> Result<()> {
    let pages = store.page_count()?;
    let live = store.list_pages()?.len();
    let tags = store.tag_count()?;
    let images = store.image_count()?;

    output_by_format_result!(cli.format,
        json => print_json(&json!({
            "store": store.root().display().to_string(),
            "database": store.db_path().display().to_string(),
            "pages": pages,
            "tags": tags,
            "images": images,
            "config": store.config(),
        })),
        human => {
            println!("store:    {}", store.root().display());
            println!("database: {}", store.db_path().display());
            println!("pages:    {} ({} listed)", pages, live);
            println!("tags:     {}", tags);
            println!("images:   {}", images);
        }
    )
}
