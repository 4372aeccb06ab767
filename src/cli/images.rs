use clap::Subcommand;
use std::path::PathBuf;

use pagewiki_core::page::PageId;

/// Image attachment subcommands
#[derive(Subcommand, Debug)]
pub enum ImageCommands {
    /// Attach an image file to a page and embed it at the end
    Add {
        page: PageId,

        file: PathBuf,

        /// MIME type (guessed from the extension when omitted)
        #[arg(long)]
        mime: Option<String>,

        #[arg(long, requires = "height")]
        width: Option<i64>,

        #[arg(long, requires = "width")]
        height: Option<i64>,
    },

    /// List the attachments of a page
    List { page: PageId },

    /// Delete an attachment
    Rm { id: i64 },

    /// Delete attachments the page no longer embeds
    Cleanup { page: PageId },
}
