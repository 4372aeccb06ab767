//! Shared output helpers for commands

use serde::Serialize;
use serde_json::json;

use crate::cli::{Cli, OutputFormat};
use pagewiki_core::error::Result;
use pagewiki_core::page::PageSummary;

pub use crate::output_by_format_result;

/// Pretty-print any serializable value as JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a `{"status": ..}` object with extra fields
pub fn print_json_status(
    status: &str,
    message: Option<&str>,
    extra_fields: &[(&str, serde_json::Value)],
) -> Result<()> {
    let mut output = json!({ "status": status });

    if let Some(obj) = output.as_object_mut() {
        if let Some(msg) = message {
            obj.insert("message".to_string(), json!(msg));
        }
        for (key, value) in extra_fields {
            obj.insert(key.to_string(), value.clone());
        }
    }

    print_json(&output)
}

/// One line per page: id, tab, title
pub fn print_summaries(cli: &Cli, pages: &[PageSummary]) -> Result<()> {
    output_by_format_result!(cli.format,
        json => print_json(pages),
        human => {
            if pages.is_empty() && !cli.quiet {
                eprintln!("No pages found");
            }
            for page in pages {
                println!("{}\t{}", page.id, page.display_title());
            }
        }
    )
}

/// Human status line, suppressed by `--quiet`
pub fn say(cli: &Cli, message: impl std::fmt::Display) {
    if cli.format == OutputFormat::Human && !cli.quiet {
        println!("{}", message);
    }
}
