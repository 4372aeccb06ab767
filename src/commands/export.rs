//! `pagewiki export` command - write live pages and images to a directory

use std::path::Path;

use crate::cli::Cli;
use crate::commands::format::{output_by_format_result, print_json, say};
use pagewiki_core::db::StoreContext;
use pagewiki_core::error::Result;
use pagewiki_core::export::export_to_directory;

pub fn execute(cli: &Cli, store: &StoreContext, dir: &Path) -> Result<()> {
    let report = export_to_directory(store, dir)?;

    output_by_format_result!(cli.format,
        json => print_json(&report),
        human => {
            say(
                cli,
                format!(
                    "Exported {} page(s) and {} image(s) to {}",
                    report.pages,
                    report.images,
                    report.directory.display()
                ),
            );
        }
    )
}
