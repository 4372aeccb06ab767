//! SQLite database schema for pagewiki
//!
//! Every statement is conditional, so bootstrapping runs on each cold start
//! against new and already-initialized stores alike.

use rusqlite::Connection;

use crate::error::{Result, WikiError};

/// Names of the triggers that maintain derived columns and the FTS index
pub const TRIGGERS: [&str; 5] = [
    "pages_ai",
    "pages_ad",
    "pages_au",
    "pages_update_timestamp",
    "pages_update_view_stats",
];

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT,
    filename TEXT NOT NULL DEFAULT '',
    document TEXT NOT NULL,
    plain_text TEXT NOT NULL DEFAULT '',
    markdown_text TEXT NOT NULL DEFAULT '',
    view_count INTEGER NOT NULL DEFAULT 0,
    last_viewed_at TIMESTAMP NULL,
    archived_at TIMESTAMP NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tag TEXT NOT NULL UNIQUE,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS tag_associations (
    page_id INTEGER NOT NULL,
    tag_id INTEGER NOT NULL,
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (page_id, tag_id),
    FOREIGN KEY (page_id) REFERENCES pages(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_tag_associations_tag_id ON tag_associations(tag_id);
CREATE INDEX IF NOT EXISTS idx_tag_associations_created_at ON tag_associations(created_at);
CREATE INDEX IF NOT EXISTS idx_tags_tag ON tags(tag);

CREATE TABLE IF NOT EXISTS image_attachments (
    id INTEGER PRIMARY KEY,
    page_id INTEGER NOT NULL,
    mime_type TEXT NOT NULL,
    data BLOB NOT NULL,
    width INTEGER,
    height INTEGER,
    original_filename TEXT NOT NULL DEFAULT '',
    file_extension TEXT NOT NULL DEFAULT '',
    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (page_id) REFERENCES pages(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_image_attachments_page_id ON image_attachments(page_id);

-- Shadow index: rowid = pages.id, written only by the triggers below
CREATE VIRTUAL TABLE IF NOT EXISTS pages_fts USING fts5(
    title,
    plain_text,
    tokenize='porter unicode61'
);

CREATE TRIGGER IF NOT EXISTS pages_ai AFTER INSERT ON pages BEGIN
    INSERT INTO pages_fts(rowid, title, plain_text)
    VALUES (new.id, new.title, new.plain_text);
END;

CREATE TRIGGER IF NOT EXISTS pages_ad AFTER DELETE ON pages BEGIN
    DELETE FROM pages_fts WHERE rowid = old.id;
END;

CREATE TRIGGER IF NOT EXISTS pages_au AFTER UPDATE ON pages BEGIN
    DELETE FROM pages_fts WHERE rowid = old.id;
    INSERT INTO pages_fts(rowid, title, plain_text)
    VALUES (new.id, new.title, new.plain_text);
END;

CREATE TRIGGER IF NOT EXISTS pages_update_timestamp AFTER UPDATE ON pages BEGIN
    UPDATE pages SET updated_at = CURRENT_TIMESTAMP WHERE id = new.id;
END;

CREATE TRIGGER IF NOT EXISTS pages_update_view_stats
AFTER UPDATE OF last_viewed_at ON pages
WHEN new.last_viewed_at IS NOT NULL AND new.last_viewed_at IS NOT old.last_viewed_at
BEGIN
    UPDATE pages SET view_count = view_count + 1 WHERE id = new.id;
END;
"#;

/// Apply per-connection pragmas: WAL, busy timeout, normal sync, foreign keys
pub fn apply_pragmas(conn: &Connection, busy_timeout_ms: u64) -> Result<()> {
    conn.busy_timeout(std::time::Duration::from_millis(busy_timeout_ms))
        .map_err(|e| WikiError::db_operation("set busy timeout", e))?;
    // journal_mode returns a row, so it goes through pragma_update_and_check
    let mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(|e| WikiError::db_operation("enable WAL mode", e))?;
    if !mode.eq_ignore_ascii_case("wal") {
        tracing::debug!(journal_mode = %mode, "WAL not available for this database");
    }
    conn.pragma_update(None, "synchronous", "NORMAL")
        .map_err(|e| WikiError::db_operation("set synchronous mode", e))?;
    conn.pragma_update(None, "foreign_keys", true)
        .map_err(|e| WikiError::db_operation("enable foreign keys", e))?;
    conn.pragma_update(None, "temp_store", "MEMORY")
        .map_err(|e| WikiError::db_operation("set temp store", e))?;
    Ok(())
}

/// Create tables, indexes, the FTS shadow table and its triggers if missing
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA_SQL)
        .map_err(|e| WikiError::db_operation("create database schema", e))?;
    tracing::debug!("schema bootstrap complete");
    Ok(())
}
