use std::collections::HashMap;

use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::document::{page_filename, Document};
use crate::error::{Result, WikiError};
use crate::map_db_err;
use crate::page::{display_title, parse_timestamp, Page, PageId, PageSummary};

pub(super) const PAGE_COLUMNS: &str = "id, title, filename, document, plain_text, markdown_text, \
     view_count, last_viewed_at, archived_at, created_at, updated_at";

pub(super) const SUMMARY_COLUMNS: &str = "p.id, p.title, p.filename, p.view_count, \
     p.last_viewed_at, p.created_at";

pub(super) fn page_from_row(row: &Row) -> rusqlite::Result<Page> {
    Ok(Page {
        id: row.get(0)?,
        title: row.get(1)?,
        filename: row.get(2)?,
        document: row.get(3)?,
        plain_text: row.get(4)?,
        markdown: row.get(5)?,
        view_count: row.get(6)?,
        last_viewed_at: parse_timestamp(row.get(7)?),
        archived_at: parse_timestamp(row.get(8)?),
        created_at: parse_timestamp(row.get(9)?),
        updated_at: parse_timestamp(row.get(10)?),
    })
}

/// Map a row selected with [`SUMMARY_COLUMNS`]
pub(super) fn summary_from_row(row: &Row) -> rusqlite::Result<PageSummary> {
    Ok(PageSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        filename: row.get(2)?,
        view_count: row.get(3)?,
        last_viewed_at: parse_timestamp(row.get(4)?),
        created_at: parse_timestamp(row.get(5)?),
    })
}

pub(super) fn query_summaries(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    operation: &str,
) -> Result<Vec<PageSummary>> {
    let mut stmt = conn.prepare(sql).map_err(map_db_err!(operation))?;
    let rows = stmt
        .query_map(params, summary_from_row)
        .map_err(map_db_err!(operation))?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(map_db_err!(operation))
}

fn fetch_in(conn: &Connection, id: PageId) -> Result<Option<Page>> {
    conn.query_row(
        &format!("SELECT {} FROM pages WHERE id = ?1", PAGE_COLUMNS),
        params![id],
        page_from_row,
    )
    .optional()
    .map_err(|e| WikiError::db_operation(&format!("fetch page {}", id), e))
}

impl super::StoreContext {
    /// Next id the allocator would hand out: `max(id) + 1`, or 0 for an
    /// empty store.
    ///
    /// Read-only. [`Self::create_page`] allocates inside its own transaction
    /// and does not rely on this value.
    pub fn next_id(&self) -> Result<PageId> {
        self.read(|conn| {
            conn.query_row("SELECT COALESCE(MAX(id), -1) + 1 FROM pages", [], |r| {
                r.get(0)
            })
            .map_err(map_db_err!("compute next page id"))
        })
    }

    /// Fetch a page by id. Absence is `Ok(None)`.
    pub fn fetch_page(&self, id: PageId) -> Result<Option<Page>> {
        self.read(|conn| fetch_in(conn, id))
    }

    /// Create a page, allocating its id in the same transaction as the insert
    #[tracing::instrument(skip(self, document), fields(page_id))]
    pub fn create_page(&self, document: &impl Document, title: Option<&str>) -> Result<Page> {
        let projection = document.project()?;
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| projection.title());

        let page = self.write("create page", |conn| {
            let id: PageId = conn
                .query_row("SELECT COALESCE(MAX(id), -1) + 1 FROM pages", [], |r| {
                    r.get(0)
                })
                .map_err(map_db_err!("allocate page id"))?;
            conn.execute(
                "INSERT INTO pages (id, title, filename, document, plain_text, markdown_text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    title,
                    page_filename(id, title.as_deref()),
                    projection.serialized,
                    projection.plain_text,
                    projection.markdown,
                ],
            )
            .map_err(|e| WikiError::db_operation(&format!("insert page {}", id), e))?;
            fetch_in(conn, id)?
                .ok_or_else(|| WikiError::integrity(format!("page {} vanished after insert", id)))
        })?;

        tracing::Span::current().record("page_id", page.id);
        tracing::debug!(page_id = page.id, "created page");
        Ok(page)
    }

    /// Insert or update page `id` with the projections of `document`.
    ///
    /// `title = None` derives the title from the document. Returns the page as
    /// stored, including the freshly serialized document.
    #[tracing::instrument(skip(self, document, title))]
    pub fn upsert_page(
        &self,
        id: PageId,
        document: &impl Document,
        title: Option<&str>,
    ) -> Result<Page> {
        let projection = document.project()?;
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| projection.title());
        let filename = page_filename(id, title.as_deref());

        self.write("save page", |conn| {
            let exists = conn
                .query_row("SELECT 1 FROM pages WHERE id = ?1", params![id], |_| Ok(()))
                .optional()
                .map_err(|e| WikiError::db_operation(&format!("look up page {}", id), e))?
                .is_some();

            if exists {
                let changed = conn
                    .execute(
                        "UPDATE pages
                         SET title = ?2, filename = ?3, document = ?4, plain_text = ?5,
                             markdown_text = ?6, updated_at = CURRENT_TIMESTAMP
                         WHERE id = ?1",
                        params![
                            id,
                            title,
                            filename,
                            projection.serialized,
                            projection.plain_text,
                            projection.markdown,
                        ],
                    )
                    .map_err(|e| WikiError::db_operation(&format!("update page {}", id), e))?;
                if changed == 0 {
                    return Err(WikiError::integrity(format!(
                        "update of page {} touched no rows",
                        id
                    )));
                }
            } else {
                conn.execute(
                    "INSERT INTO pages (id, title, filename, document, plain_text, markdown_text)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    params![
                        id,
                        title,
                        filename,
                        projection.serialized,
                        projection.plain_text,
                        projection.markdown,
                    ],
                )
                .map_err(|e| WikiError::db_operation(&format!("insert page {}", id), e))?;
            }

            fetch_in(conn, id)?
                .ok_or_else(|| WikiError::integrity(format!("page {} vanished after save", id)))
        })
    }

    /// Live pages in ascending id order, capped at the configured list limit
    pub fn list_pages(&self) -> Result<Vec<PageSummary>> {
        let limit = self.config().limits.list as i64;
        self.read(|conn| {
            query_summaries(
                conn,
                &format!(
                    "SELECT {} FROM pages p WHERE p.archived_at IS NULL ORDER BY p.id ASC LIMIT ?1",
                    SUMMARY_COLUMNS
                ),
                params![limit],
                "list pages",
            )
        })
    }

    /// Every live page that has been viewed, most recent first. Uncapped.
    pub fn recent_pages(&self) -> Result<Vec<PageSummary>> {
        self.read(|conn| {
            query_summaries(
                conn,
                &format!(
                    "SELECT {} FROM pages p
                     WHERE p.archived_at IS NULL AND p.last_viewed_at IS NOT NULL
                     ORDER BY p.last_viewed_at DESC, p.id ASC",
                    SUMMARY_COLUMNS
                ),
                [],
                "list recent pages",
            )
        })
    }

    /// Every live page with its full content, in id order
    pub fn live_pages(&self) -> Result<Vec<Page>> {
        self.read(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM pages WHERE archived_at IS NULL ORDER BY id ASC",
                    PAGE_COLUMNS
                ))
                .map_err(map_db_err!("load live pages"))?;
            let rows = stmt
                .query_map([], page_from_row)
                .map_err(map_db_err!("load live pages"))?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_db_err!("load live pages"))
        })
    }

    /// Display titles for a batch of ids. Unknown ids are left out; blank
    /// titles fall back to `"Untitled Page {id}"`.
    pub fn titles_by_ids(&self, ids: &[PageId]) -> Result<HashMap<PageId, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("SELECT id, title FROM pages WHERE id IN ({})", placeholders);

        self.read(|conn| {
            let mut stmt = conn.prepare(&sql).map_err(map_db_err!("look up titles"))?;
            let rows = stmt
                .query_map(params_from_iter(ids.iter()), |row| {
                    let id: PageId = row.get(0)?;
                    let title: Option<String> = row.get(1)?;
                    Ok((id, display_title(id, title.as_deref())))
                })
                .map_err(map_db_err!("look up titles"))?;
            rows.collect::<rusqlite::Result<HashMap<_, _>>>()
                .map_err(map_db_err!("look up titles"))
        })
    }

    /// Hard-delete a page. Tag associations, attachments and the index row go
    /// with it; tags left without pages are removed in the same transaction.
    #[tracing::instrument(skip(self))]
    pub fn delete_page(&self, id: PageId) -> Result<bool> {
        let deleted = self.write("delete page", |conn| {
            let changed = conn
                .execute("DELETE FROM pages WHERE id = ?1", params![id])
                .map_err(|e| WikiError::db_operation(&format!("delete page {}", id), e))?;
            let orphans = super::tags::delete_orphaned_tags(conn)?;
            if orphans > 0 {
                tracing::debug!(page_id = id, orphans, "removed orphaned tags");
            }
            Ok(changed > 0)
        })?;
        if deleted {
            tracing::debug!(page_id = id, "deleted page");
        }
        Ok(deleted)
    }

    /// Record a view. The view counter is bumped by a trigger.
    pub fn mark_viewed(&self, id: PageId) -> Result<bool> {
        let changed = self.write("record page view", |conn| {
            conn.execute(
                "UPDATE pages SET last_viewed_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
                 WHERE id = ?1",
                params![id],
            )
            .map_err(|e| WikiError::db_operation(&format!("record view of page {}", id), e))
        })?;
        Ok(changed > 0)
    }

    /// Soft-delete a live page. Returns whether anything changed.
    pub fn archive_page(&self, id: PageId) -> Result<bool> {
        let changed = self.write("archive page", |conn| {
            conn.execute(
                "UPDATE pages SET archived_at = CURRENT_TIMESTAMP
                 WHERE id = ?1 AND archived_at IS NULL",
                params![id],
            )
            .map_err(|e| WikiError::db_operation(&format!("archive page {}", id), e))
        })?;
        Ok(changed > 0)
    }

    pub fn unarchive_page(&self, id: PageId) -> Result<bool> {
        let changed = self.write("unarchive page", |conn| {
            conn.execute(
                "UPDATE pages SET archived_at = NULL WHERE id = ?1 AND archived_at IS NOT NULL",
                params![id],
            )
            .map_err(|e| WikiError::db_operation(&format!("unarchive page {}", id), e))
        })?;
        Ok(changed > 0)
    }
}
