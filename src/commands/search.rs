//! `pagewiki find` and `pagewiki search`

use crate::cli::Cli;
use crate::commands::format::print_summaries;
use pagewiki_core::db::StoreContext;
use pagewiki_core::error::Result;

/// Title subsequence match: "gcl" finds "Grocery list"
pub fn execute_find(cli: &Cli, store: &StoreContext, query: &str) -> Result<()> {
    print_summaries(cli, &store.fuzzy_title_search(query)?)
}

/// Full-text search, best match first
pub fn execute_search(
    cli: &Cli,
    store: &StoreContext,
    query: &str,
    title_only: bool,
) -> Result<()> {
    print_summaries(cli, &store.full_text_search(query, title_only)?)
}
