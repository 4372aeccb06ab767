//! Tag suggestion seam
//!
//! The suggestion service itself lives outside the core. The core gathers the
//! context it needs, parses what it answers and applies accepted tags through
//! the normal tag write path.

use serde::Serialize;

use crate::db::{normalize_tags, StoreContext};
use crate::error::Result;
use crate::page::PageId;

/// Inputs handed to a [`TagSuggester`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SuggestionContext {
    pub page_id: PageId,
    pub content: String,
    pub page_tags: Vec<String>,
    pub existing_tags: Vec<String>,
}

impl SuggestionContext {
    /// Collect page text, the page's tags and every tag in the store.
    ///
    /// Returns `None` when the page does not exist.
    pub fn gather(store: &StoreContext, page_id: PageId) -> Result<Option<Self>> {
        let Some(page) = store.fetch_page(page_id)? else {
            return Ok(None);
        };
        Ok(Some(SuggestionContext {
            page_id,
            content: page.plain_text,
            page_tags: store.tags_for_page(page_id)?,
            existing_tags: store.all_tags()?,
        }))
    }

    /// Request text for a language-model backed suggester
    pub fn prompt(&self) -> String {
        let known = if self.existing_tags.is_empty() {
            "There are no existing tags in the wiki yet.".to_string()
        } else {
            format!(
                "Here are all existing tags in the wiki: {}",
                self.existing_tags.join(", ")
            )
        };
        format!(
            "{}\n\nGiven this wiki page content, suggest appropriate tags. Reuse existing tags \
             where they fit. Tags should be single words or hyphenated phrases. Return only a \
             JSON array of strings.\n\nContent:\n{}",
            known, self.content
        )
    }
}

/// An external tag suggestion service
pub trait TagSuggester {
    fn suggest(&self, context: &SuggestionContext) -> Result<Vec<String>>;
}

/// Parse a suggester's reply: a JSON array of strings, possibly wrapped in
/// prose. Tags are normalized. Anything unparseable yields no suggestions.
pub fn parse_suggestions(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let candidate = match (trimmed.find('['), trimmed.rfind(']')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    };
    match serde_json::from_str::<Vec<String>>(candidate) {
        Ok(tags) => normalize_tags(&tags),
        Err(e) => {
            tracing::warn!(error = %e, "could not parse tag suggestions");
            Vec::new()
        }
    }
}

/// Drop suggestions the page already carries
pub fn filter_new_suggestions(suggestions: &[String], current: &[String]) -> Vec<String> {
    let current = normalize_tags(current);
    normalize_tags(suggestions)
        .into_iter()
        .filter(|tag| !current.contains(tag))
        .collect()
}

/// Add accepted suggestions to the page's tags, keeping the existing ones
pub fn accept_suggestions<S: AsRef<str>>(
    store: &StoreContext,
    page_id: PageId,
    accepted: &[S],
) -> Result<Vec<String>> {
    let mut tags = store.tags_for_page(page_id)?;
    tags.extend(accepted.iter().map(|t| t.as_ref().to_string()));
    store.set_tags_for_page(page_id, &tags)
}
