use std::collections::BTreeSet;
use std::time::Instant;

use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};

use super::pages::{query_summaries, SUMMARY_COLUMNS};
use super::search::fuzzy_pattern;
use crate::error::{Result, WikiError};
use crate::page::{PageId, PageSummary, RelatedPage};
use crate::{map_db_err, trace_time};

/// A tag with the number of pages carrying it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: i64,
}

/// Trim, lowercase, drop blanks and duplicates. Order of first appearance is
/// kept.
pub fn normalize_tags<S: AsRef<str>>(tags: &[S]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    tags.iter()
        .map(|t| t.as_ref().trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/// Remove tags with no remaining associations
pub(super) fn delete_orphaned_tags(conn: &Connection) -> Result<usize> {
    conn.execute(
        "DELETE FROM tags WHERE id NOT IN (SELECT DISTINCT tag_id FROM tag_associations)",
        [],
    )
    .map_err(map_db_err!("clean up orphaned tags"))
}

fn query_tag_counts(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    operation: &str,
) -> Result<Vec<TagCount>> {
    let mut stmt = conn.prepare(sql).map_err(map_db_err!(operation))?;
    let rows = stmt
        .query_map(params, |row| {
            Ok(TagCount {
                tag: row.get(0)?,
                count: row.get(1)?,
            })
        })
        .map_err(map_db_err!(operation))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_db_err!(operation))
}

impl super::StoreContext {
    /// Tags of a page, most used across the store first, then alphabetical
    pub fn tags_for_page(&self, page_id: PageId) -> Result<Vec<String>> {
        self.read(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT t.tag
                     FROM tags t
                     JOIN tag_associations ta ON ta.tag_id = t.id
                     WHERE ta.page_id = ?1
                     ORDER BY (SELECT COUNT(*) FROM tag_associations u WHERE u.tag_id = t.id) DESC,
                              t.tag ASC",
                )
                .map_err(map_db_err!("load page tags"))?;
            let rows = stmt
                .query_map(params![page_id], |row| row.get(0))
                .map_err(map_db_err!("load page tags"))?;
            rows.collect::<rusqlite::Result<Vec<String>>>()
                .map_err(map_db_err!("load page tags"))
        })
    }

    /// Replace the full tag set of a page.
    ///
    /// Tags are normalized first. An empty set removes every association. Tags
    /// left without pages are cleaned up before the transaction commits.
    #[tracing::instrument(skip(self, tags))]
    pub fn set_tags_for_page<S: AsRef<str>>(
        &self,
        page_id: PageId,
        tags: &[S],
    ) -> Result<Vec<String>> {
        let tags = normalize_tags(tags);

        self.write("set page tags", |conn| {
            conn.execute(
                "DELETE FROM tag_associations WHERE page_id = ?1",
                params![page_id],
            )
            .map_err(map_db_err!("clear page tags"))?;

            if !tags.is_empty() {
                let mut insert_tag = conn
                    .prepare_cached("INSERT OR IGNORE INTO tags (tag) VALUES (?1)")
                    .map_err(map_db_err!("insert tag"))?;
                let mut associate = conn
                    .prepare_cached(
                        "INSERT INTO tag_associations (page_id, tag_id)
                         SELECT ?1, id FROM tags WHERE tag = ?2",
                    )
                    .map_err(map_db_err!("associate tag"))?;
                for tag in &tags {
                    insert_tag
                        .execute(params![tag])
                        .map_err(map_db_err!("insert tag"))?;
                    let inserted = associate
                        .execute(params![page_id, tag])
                        .map_err(|e| {
                            WikiError::db_operation(&format!("tag page {}", page_id), e)
                        })?;
                    if inserted == 0 {
                        return Err(WikiError::integrity(format!(
                            "tag '{}' missing after insert",
                            tag
                        )));
                    }
                }
            }

            delete_orphaned_tags(conn)?;
            Ok(())
        })?;

        tracing::debug!(page_id, count = tags.len(), "replaced page tags");
        Ok(tags)
    }

    /// Autocomplete: tags whose text contains the query's characters in
    /// order, ranked by usage
    pub fn fuzzy_find_tags(&self, query: &str) -> Result<Vec<TagCount>> {
        let pattern = fuzzy_pattern(&query.to_lowercase());
        let limit = self.config().limits.tag_search as i64;
        self.read(|conn| {
            query_tag_counts(
                conn,
                "SELECT t.tag, COUNT(ta.page_id) AS usage
                 FROM tags t
                 LEFT JOIN tag_associations ta ON ta.tag_id = t.id
                 WHERE t.tag LIKE ?1
                 GROUP BY t.id
                 ORDER BY usage DESC, t.tag ASC
                 LIMIT ?2",
                params![pattern, limit],
                "search tags",
            )
        })
    }

    /// Every tag in alphabetical order
    pub fn all_tags(&self) -> Result<Vec<String>> {
        self.read(|conn| {
            let mut stmt = conn
                .prepare("SELECT tag FROM tags ORDER BY tag ASC")
                .map_err(map_db_err!("list tags"))?;
            let rows = stmt
                .query_map([], |row| row.get(0))
                .map_err(map_db_err!("list tags"))?;
            rows.collect::<rusqlite::Result<Vec<String>>>()
                .map_err(map_db_err!("list tags"))
        })
    }

    /// Tags with their usage count, most used first
    pub fn popular_tags(&self) -> Result<Vec<TagCount>> {
        let limit = self.config().limits.tag_search as i64;
        self.read(|conn| {
            query_tag_counts(
                conn,
                "SELECT t.tag, COUNT(ta.page_id) AS usage
                 FROM tags t
                 JOIN tag_associations ta ON ta.tag_id = t.id
                 GROUP BY t.id
                 ORDER BY usage DESC, t.tag ASC
                 LIMIT ?1",
                params![limit],
                "list popular tags",
            )
        })
    }

    /// Live pages carrying `tag`, by title
    pub fn pages_by_tag(&self, tag: &str) -> Result<Vec<PageSummary>> {
        let tag = tag.trim().to_lowercase();
        let limit = self.config().limits.list as i64;
        self.read(|conn| {
            query_summaries(
                conn,
                &format!(
                    "SELECT {} FROM pages p
                     JOIN tag_associations ta ON ta.page_id = p.id
                     JOIN tags t ON t.id = ta.tag_id
                     WHERE t.tag = ?1 AND p.archived_at IS NULL
                     ORDER BY p.title ASC, p.id ASC
                     LIMIT ?2",
                    SUMMARY_COLUMNS
                ),
                params![tag, limit],
                "list pages by tag",
            )
        })
    }

    /// Delete tags with no associations, returning how many went
    pub fn cleanup_orphaned_tags(&self) -> Result<usize> {
        let removed = self.write("clean up tags", delete_orphaned_tags)?;
        if removed > 0 {
            tracing::debug!(removed, "removed orphaned tags");
        }
        Ok(removed)
    }

    /// Live pages sharing at least one tag with `page_id`, most shared tags
    /// first. The page itself is never included.
    #[tracing::instrument(skip(self))]
    pub fn related_pages(&self, page_id: PageId) -> Result<Vec<RelatedPage>> {
        let start = Instant::now();
        let limit = self.config().limits.related as i64;
        let related = self.read(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {}, COUNT(*) AS shared_tags
                     FROM tag_associations mine
                     JOIN tag_associations theirs
                       ON theirs.tag_id = mine.tag_id AND theirs.page_id != mine.page_id
                     JOIN pages p ON p.id = theirs.page_id
                     WHERE mine.page_id = ?1 AND p.archived_at IS NULL
                     GROUP BY p.id
                     ORDER BY shared_tags DESC, p.id ASC
                     LIMIT ?2",
                    SUMMARY_COLUMNS
                ))
                .map_err(map_db_err!("find related pages"))?;
            let rows = stmt
                .query_map(params![page_id, limit], |row| {
                    Ok(RelatedPage {
                        page: super::pages::summary_from_row(row)?,
                        shared_tags: row.get(6)?,
                    })
                })
                .map_err(map_db_err!("find related pages"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_db_err!("find related pages"))
        })?;
        trace_time!(start, "related_pages", page_id = page_id);
        Ok(related)
    }
}
