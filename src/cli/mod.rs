//! CLI argument parsing for pagewiki
//!
//! Global flags: --store, --format, --quiet, --verbose, --log-level, --log-json

pub mod format;
pub mod images;
pub mod parse;
pub mod tags;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub use images::ImageCommands;
pub use pagewiki_core::format::OutputFormat;
use pagewiki_core::page::PageId;
use parse::parse_format;
pub use tags::TagCommands;

/// Pagewiki - a personal wiki kept in one local SQLite file
#[derive(Parser, Debug)]
#[command(name = "pagewiki")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Store directory (defaults to $PAGEWIKI_STORE, then the user data dir)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        value_parser = parse_format,
        default_value = "human"
    )]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Log level filter (e.g. "debug" or "pagewiki_core=trace")
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a store and write its config file
    Init,

    /// Create a new page (reads stdin when TEXT is omitted)
    New {
        /// Page text; the first line becomes the title
        text: Option<String>,

        /// Explicit title instead of the first line
        #[arg(long)]
        title: Option<String>,
    },

    /// Replace the text of a page, creating it if the id is unused
    Edit {
        id: PageId,

        text: String,

        #[arg(long)]
        title: Option<String>,
    },

    /// Show a page and record a view
    Show { id: PageId },

    /// List live pages
    List,

    /// List recently viewed pages
    Recent,

    /// Find pages whose title contains the query's letters in order
    Find { query: String },

    /// Full-text search over page titles and text
    Search {
        query: String,

        /// Only match titles
        #[arg(long)]
        title_only: bool,
    },

    /// Archive a page (hidden from listings and search)
    Archive { id: PageId },

    /// Restore an archived page
    Unarchive { id: PageId },

    /// Permanently delete a page with its tags and images
    Delete { id: PageId },

    /// Pages sharing tags with a page
    Related { id: PageId },

    /// Manage page tags
    #[command(subcommand)]
    Tag(TagCommands),

    /// Manage image attachments
    #[command(subcommand)]
    Image(ImageCommands),

    /// Write live pages as markdown, with their images, to a directory
    Export { dir: PathBuf },

    /// Show store location and counts
    Status,
}
