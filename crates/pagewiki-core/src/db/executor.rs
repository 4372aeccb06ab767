//! Retry and transaction helpers
//!
//! Several window processes share one database file. WAL mode and the busy
//! timeout absorb most write contention, and whatever still surfaces as
//! "busy"/"locked" goes through [`retry_with_backoff`]. Multi-statement writes
//! run inside [`with_transaction`] so a failure never leaves tag associations
//! or the shadow index half written.

use std::thread;
use std::time::Duration;

use rusqlite::Connection;

use crate::config::RetryConfig;
use crate::error::{Result, WikiError};

/// How a failing operation is retried
#[derive(Debug, Clone, Copy)]
pub struct RetryOptions {
    /// Total attempts, including the first. Zero behaves like one.
    pub max_attempts: u32,
    /// Attempt `n` sleeps `delay * n` before the next try
    pub delay: Duration,
    /// Whether an error is worth another attempt
    pub should_retry: fn(&WikiError) -> bool,
}

impl Default for RetryOptions {
    fn default() -> Self {
        RetryOptions::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryOptions {
    fn from(config: &RetryConfig) -> Self {
        RetryOptions {
            max_attempts: config.max_attempts,
            delay: Duration::from_millis(config.delay_ms),
            should_retry: WikiError::is_transient,
        }
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of attempts. The last error is returned unchanged.
///
/// `between_attempts` runs after each backoff sleep; the store uses it to
/// drop a connection that may be broken.
pub fn retry_with_backoff<T>(
    options: &RetryOptions,
    mut operation: impl FnMut(u32) -> Result<T>,
    mut between_attempts: impl FnMut(),
) -> Result<T> {
    let max_attempts = options.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation(attempt) {
            Ok(value) => return Ok(value),
            Err(e) if attempt < max_attempts && (options.should_retry)(&e) => {
                tracing::warn!(
                    attempt,
                    max_attempts,
                    error = %e,
                    "transient store failure, retrying"
                );
                thread::sleep(options.delay * attempt);
                between_attempts();
                attempt += 1;
            }
            Err(e) => {
                if attempt > 1 {
                    tracing::warn!(attempt, error = %e, "giving up after retries");
                }
                return Err(e);
            }
        }
    }
}

/// Run `operation` between `BEGIN IMMEDIATE` and `COMMIT`.
///
/// Any error rolls the transaction back and is returned wrapped in
/// [`WikiError::Transaction`]. A rollback that itself fails is logged and
/// never replaces the original error.
pub fn with_transaction<T>(
    conn: &Connection,
    operation: &str,
    body: impl FnOnce(&Connection) -> Result<T>,
) -> Result<T> {
    // IMMEDIATE takes the write lock up front, so reads inside the body (such
    // as id allocation) cannot be invalidated by another window's commit
    conn.execute_batch("BEGIN IMMEDIATE")
        .map_err(|e| WikiError::db_operation(&format!("begin {}", operation), e))?;

    let outcome = body(conn).and_then(|value| {
        conn.execute_batch("COMMIT")
            .map_err(|e| WikiError::db_operation(&format!("commit {}", operation), e))?;
        Ok(value)
    });

    match outcome {
        Ok(value) => Ok(value),
        Err(e) => {
            if !conn.is_autocommit() {
                if let Err(rollback_err) = conn.execute_batch("ROLLBACK") {
                    tracing::error!(
                        operation,
                        error = %rollback_err,
                        "rollback failed"
                    );
                }
            }
            Err(WikiError::transaction(operation, e))
        }
    }
}
