//! SQLite store for pagewiki
//!
//! One [`StoreContext`] per process. It owns the lazily opened connection,
//! bootstraps the schema on every cold open and routes all reads and writes
//! through the retry policy. Repository operations live in the sibling
//! modules as `impl StoreContext` blocks.

pub mod executor;
mod images;
mod pages;
pub mod schema;
mod search;
mod tags;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::config::StoreConfig;
use crate::error::{Result, WikiError};

pub use executor::{retry_with_backoff, with_transaction, RetryOptions};
pub use images::{ImageAttachment, NewImage};
pub use tags::{normalize_tags, TagCount};

/// Per-process handle on the shared store file
#[derive(Debug)]
pub struct StoreContext {
    root: PathBuf,
    db_path: PathBuf,
    config: StoreConfig,
    retry: RetryOptions,
    conn: Mutex<Option<Connection>>,
}

impl StoreContext {
    /// Prepare a store rooted at `root`, loading `config.toml` if present.
    ///
    /// The database file is not touched until the first query.
    pub fn open(root: &Path) -> Result<Self> {
        let config = StoreConfig::load_or_default(root)?;
        Self::with_config(root, config)
    }

    pub fn with_config(root: &Path, config: StoreConfig) -> Result<Self> {
        fs::create_dir_all(root).map_err(|e| WikiError::InvalidStore {
            reason: format!("cannot create store directory {}: {}", root.display(), e),
        })?;
        let db_path = root.join(&config.database_file);
        let retry = RetryOptions::from(&config.retry);
        Ok(StoreContext {
            root: root.to_path_buf(),
            db_path,
            config,
            retry,
            conn: Mutex::new(None),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Override the retry policy, e.g. to shorten delays in tests
    pub fn set_retry_options(&mut self, retry: RetryOptions) {
        self.retry = retry;
    }

    fn lock(&self) -> Result<MutexGuard<'_, Option<Connection>>> {
        self.conn
            .lock()
            .map_err(|_| WikiError::Other("store handle mutex poisoned".to_string()))
    }

    fn open_connection(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path).map_err(|e| {
            WikiError::db_operation(&format!("open database at {}", self.db_path.display()), e)
        })?;
        schema::apply_pragmas(&conn, self.config.busy_timeout_ms)?;
        schema::create_schema(&conn)?;
        tracing::debug!(path = %self.db_path.display(), "opened store");
        Ok(conn)
    }

    /// Run `f` against the memoized connection, opening and bootstrapping it
    /// on first use
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.lock()?;
        if guard.is_none() {
            *guard = Some(self.open_connection()?);
        }
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(WikiError::Other("store handle unavailable".to_string())),
        }
    }

    /// Drop the memoized connection so the next call reopens it
    pub fn reset(&self) {
        match self.lock() {
            Ok(mut guard) => {
                if guard.take().is_some() {
                    tracing::debug!(path = %self.db_path.display(), "reset store handle");
                }
            }
            Err(e) => tracing::error!(error = %e, "could not reset store handle"),
        }
    }

    /// Whether a connection is currently open
    pub fn is_open(&self) -> bool {
        self.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    /// Read path: retried, no transaction
    pub(crate) fn read<T>(&self, mut f: impl FnMut(&Connection) -> Result<T>) -> Result<T> {
        retry_with_backoff(
            &self.retry,
            |_| self.with_connection(&mut f),
            || self.reset(),
        )
    }

    /// Write path: retried, each attempt in its own transaction
    pub(crate) fn write<T>(
        &self,
        operation: &str,
        mut f: impl FnMut(&Connection) -> Result<T>,
    ) -> Result<T> {
        retry_with_backoff(
            &self.retry,
            |_| self.with_connection(|conn| with_transaction(conn, operation, &mut f)),
            || self.reset(),
        )
    }

    pub fn page_count(&self) -> Result<i64> {
        self.read(|conn| {
            conn.query_row("SELECT COUNT(*) FROM pages", [], |r| r.get(0))
                .map_err(|e| WikiError::db_operation("count pages", e))
        })
    }

    pub fn tag_count(&self) -> Result<i64> {
        self.read(|conn| {
            conn.query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))
                .map_err(|e| WikiError::db_operation("count tags", e))
        })
    }

    pub fn image_count(&self) -> Result<i64> {
        self.read(|conn| {
            conn.query_row("SELECT COUNT(*) FROM image_attachments", [], |r| r.get(0))
                .map_err(|e| WikiError::db_operation("count images", e))
        })
    }
}

impl Drop for StoreContext {
    fn drop(&mut self) {
        // Fold the WAL back into the main file when the window goes away
        if let Ok(guard) = self.conn.get_mut() {
            if let Some(conn) = guard.as_ref() {
                let _ = conn.pragma_update(None, "wal_checkpoint", "PASSIVE");
            }
        }
    }
}

#[cfg(test)]
mod tests;
