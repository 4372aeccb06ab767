//! Page types shared by the store, the window cache and the CLI

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Page identifier. Assigned by the application as `max(id) + 1`, never by
/// the database's autoincrement.
pub type PageId = i64;

/// A page row as stored, including its serialized document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub title: Option<String>,
    pub filename: String,
    /// Opaque document owned by the editor integration
    pub document: String,
    pub plain_text: String,
    pub markdown: String,
    pub view_count: i64,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Page {
    /// A page is live until it is archived
    pub fn is_live(&self) -> bool {
        self.archived_at.is_none()
    }

    /// Title for display, falling back to a placeholder for untitled pages
    pub fn display_title(&self) -> String {
        display_title(self.id, self.title.as_deref())
    }
}

/// Lightweight page listing entry (no document payload)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSummary {
    pub id: PageId,
    pub title: Option<String>,
    pub filename: String,
    pub view_count: i64,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl PageSummary {
    pub fn display_title(&self) -> String {
        display_title(self.id, self.title.as_deref())
    }
}

/// A page sharing tags with another page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedPage {
    #[serde(flatten)]
    pub page: PageSummary,
    pub shared_tags: i64,
}

/// Title shown for a page, `"Untitled Page {id}"` when blank
pub fn display_title(id: PageId, title: Option<&str>) -> String {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => format!("Untitled Page {}", id),
    }
}

/// Parse a SQLite timestamp.
///
/// `CURRENT_TIMESTAMP` yields `YYYY-MM-DD HH:MM:SS`; view stamps carry
/// fractional seconds. RFC 3339 is accepted for rows written by other tools.
pub(crate) fn parse_timestamp(value: Option<String>) -> Option<DateTime<Utc>> {
    let value = value?;
    if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&value, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_display_title_fallback() {
        assert_eq!(display_title(4, None), "Untitled Page 4");
        assert_eq!(display_title(4, Some("   ")), "Untitled Page 4");
        assert_eq!(display_title(4, Some("Groceries")), "Groceries");
    }

    #[test]
    fn test_parse_sqlite_timestamps() {
        let dt = parse_timestamp(Some("2024-03-05 10:11:12".to_string())).unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 3, 5));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (10, 11, 12));

        let frac = parse_timestamp(Some("2024-03-05 10:11:12.345".to_string())).unwrap();
        assert_eq!(frac.timestamp_subsec_millis(), 345);

        assert!(parse_timestamp(None).is_none());
        assert!(parse_timestamp(Some("yesterday".to_string())).is_none());
    }
}
