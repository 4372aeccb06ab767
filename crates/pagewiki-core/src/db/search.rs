use std::time::Instant;

use rusqlite::params;

use super::pages::{query_summaries, SUMMARY_COLUMNS};
use crate::error::Result;
use crate::page::PageSummary;
use crate::trace_time;

/// Subsequence pattern for `LIKE`: `"abc"` becomes `"%a%b%c%"`.
///
/// An empty query yields `"%"` and matches everything.
pub fn fuzzy_pattern(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() * 2 + 1);
    pattern.push('%');
    for ch in query.chars() {
        pattern.push(ch);
        pattern.push('%');
    }
    pattern
}

/// Build an FTS5 match expression from free text.
///
/// Each whitespace-separated token is quoted so operator characters in user
/// input are matched literally. Tokens are implicitly ANDed. With
/// `title_only`, every token is scoped to the title column.
pub fn fts_query(query: &str, title_only: bool) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|token| {
            let quoted = format!("\"{}\"", token.replace('"', "\"\""));
            if title_only {
                format!("title : {}", quoted)
            } else {
                quoted
            }
        })
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

impl super::StoreContext {
    /// Live pages whose title contains the query's characters in order, most
    /// recently viewed first, then by title
    pub fn fuzzy_title_search(&self, query: &str) -> Result<Vec<PageSummary>> {
        let pattern = fuzzy_pattern(query);
        let limit = self.config().limits.search as i64;
        self.read(|conn| {
            query_summaries(
                conn,
                &format!(
                    "SELECT {} FROM pages p
                     WHERE p.title LIKE ?1 AND p.archived_at IS NULL
                     ORDER BY p.last_viewed_at DESC NULLS LAST, p.title ASC
                     LIMIT ?2",
                    SUMMARY_COLUMNS
                ),
                params![pattern, limit],
                "search titles",
            )
        })
    }

    /// Full-text search over titles and page text, ranked by the index
    #[tracing::instrument(skip(self))]
    pub fn full_text_search(&self, query: &str, title_only: bool) -> Result<Vec<PageSummary>> {
        let Some(fts) = fts_query(query, title_only) else {
            return Ok(Vec::new());
        };
        let start = Instant::now();
        let limit = self.config().limits.search as i64;
        let results = self.read(|conn| {
            query_summaries(
                conn,
                &format!(
                    "SELECT {} FROM pages_fts
                     JOIN pages p ON p.id = pages_fts.rowid
                     WHERE pages_fts MATCH ?1 AND p.archived_at IS NULL
                     ORDER BY pages_fts.rank
                     LIMIT ?2",
                    SUMMARY_COLUMNS
                ),
                params![fts, limit],
                "search page text",
            )
        })?;
        trace_time!(start, "full_text_search", hits = results.len());
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuzzy_pattern_interleaves_wildcards() {
        assert_eq!(fuzzy_pattern("abc"), "%a%b%c%");
        assert_eq!(fuzzy_pattern(""), "%");
        assert_eq!(fuzzy_pattern("né"), "%n%é%");
    }

    #[test]
    fn test_fts_query_quotes_tokens() {
        assert_eq!(
            fts_query("hello world", false).unwrap(),
            "\"hello\" \"world\""
        );
        assert_eq!(fts_query("a\"b", false).unwrap(), "\"a\"\"b\"");
        assert_eq!(fts_query("trip", true).unwrap(), "title : \"trip\"");
        assert!(fts_query("   ", false).is_none());
    }
}
