use clap::Subcommand;

use pagewiki_core::page::PageId;

/// Tag subcommands
#[derive(Subcommand, Debug)]
pub enum TagCommands {
    /// Replace the tags of a page
    Set {
        id: PageId,

        /// New tag set; an empty list removes all tags
        tags: Vec<String>,
    },

    /// Show the tags of a page
    Show { id: PageId },

    /// Autocomplete tags matching a query
    Find { query: String },

    /// List all tags
    List {
        /// Include usage counts, most used first
        #[arg(long)]
        popular: bool,
    },

    /// Remove tags no page uses
    Cleanup,
}
