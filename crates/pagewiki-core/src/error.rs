//! Error types and exit codes for pagewiki
//!
//! Exit codes:
//! - 0: Success
//! - 1: Generic failure (including store contention that survived retries)
//! - 2: Usage error (bad flags/args)
//! - 3: Data/store error (missing page, integrity violation, etc.)

mod macros;

use thiserror::Error;

use crate::page::PageId;

/// Exit codes for the pagewiki binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Success (0)
    Success = 0,
    /// Generic failure (1)
    Failure = 1,
    /// Usage error - bad flags/args (2)
    Usage = 2,
    /// Data/store error - missing page, integrity violation (3)
    Data = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

/// Errors that can occur during pagewiki operations
#[derive(Error, Debug)]
pub enum WikiError {
    // Usage errors (exit code 2)
    #[error("unknown format: {0} (expected: human or json)")]
    UnknownFormat(String),

    #[error("{0}")]
    UsageError(String),

    #[error("invalid {context}: {value}")]
    InvalidValue { context: String, value: String },

    // Data/store errors (exit code 3)
    #[error("page not found: {id}")]
    PageNotFound { id: PageId },

    #[error("{context} not found: {value}")]
    NotFound { context: String, value: String },

    #[error("integrity violation: {reason}")]
    Integrity { reason: String },

    #[error("invalid store: {reason}")]
    InvalidStore { reason: String },

    // Generic failures (exit code 1)
    #[error("failed to {operation}: {source}")]
    Sqlite {
        operation: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("transaction failed during {operation}: {source}")]
    Transaction {
        operation: String,
        #[source]
        source: Box<WikiError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("{0}")]
    Other(String),
}

impl From<rusqlite::Error> for WikiError {
    fn from(err: rusqlite::Error) -> Self {
        WikiError::Sqlite {
            operation: "execute query".to_string(),
            source: err,
        }
    }
}

impl WikiError {
    /// Create an error for a failed database operation
    pub fn db_operation(operation: &str, error: rusqlite::Error) -> Self {
        WikiError::Sqlite {
            operation: operation.to_string(),
            source: error,
        }
    }

    /// Wrap the cause of a failed transactional write
    pub fn transaction(operation: &str, cause: WikiError) -> Self {
        WikiError::Transaction {
            operation: operation.to_string(),
            source: Box::new(cause),
        }
    }

    /// Create an error for a write that did not touch the row it expected to
    pub fn integrity(reason: impl Into<String>) -> Self {
        WikiError::Integrity {
            reason: reason.into(),
        }
    }

    /// Create an error for an invalid value or configuration
    pub fn invalid_value(context: &str, value: impl std::fmt::Display) -> Self {
        WikiError::InvalidValue {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Create an error for an entity that was not found
    pub fn not_found(context: &str, value: impl std::fmt::Display) -> Self {
        WikiError::NotFound {
            context: context.to_string(),
            value: value.to_string(),
        }
    }

    /// Whether this failure looks like store contention worth retrying.
    ///
    /// SQLite busy/locked codes are checked first; anything else falls back to
    /// matching the rendered message, so wrapped transaction failures and
    /// errors raised by other layers are classified the same way.
    pub fn is_transient(&self) -> bool {
        match self {
            WikiError::Sqlite { source, .. } => {
                if matches!(
                    source.sqlite_error_code(),
                    Some(rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked)
                ) {
                    return true;
                }
                message_is_transient(&self.to_string())
            }
            WikiError::Transaction { source, .. } => source.is_transient(),
            _ => message_is_transient(&self.to_string()),
        }
    }

    /// Get the appropriate exit code for this error
    pub fn exit_code(&self) -> ExitCode {
        match self {
            WikiError::UnknownFormat(_)
            | WikiError::UsageError(_)
            | WikiError::InvalidValue { .. } => ExitCode::Usage,

            WikiError::PageNotFound { .. }
            | WikiError::NotFound { .. }
            | WikiError::Integrity { .. }
            | WikiError::InvalidStore { .. } => ExitCode::Data,

            // A failed transaction exits like the failure that aborted it
            WikiError::Transaction { source, .. } => source.exit_code(),

            WikiError::Sqlite { .. }
            | WikiError::Io(_)
            | WikiError::Json(_)
            | WikiError::Toml(_)
            | WikiError::Other(_) => ExitCode::Failure,
        }
    }

    /// Get the error type identifier
    fn error_type(&self) -> &'static str {
        match self {
            WikiError::UnknownFormat(_) => "unknown_format",
            WikiError::UsageError(_) => "usage_error",
            WikiError::InvalidValue { .. } => "invalid_value",
            WikiError::PageNotFound { .. } => "page_not_found",
            WikiError::NotFound { .. } => "not_found",
            WikiError::Integrity { .. } => "integrity",
            WikiError::InvalidStore { .. } => "invalid_store",
            WikiError::Sqlite { .. } => "sqlite",
            WikiError::Transaction { .. } => "transaction",
            WikiError::Io(_) => "io_error",
            WikiError::Json(_) => "json_error",
            WikiError::Toml(_) => "toml_error",
            WikiError::Other(_) => "other",
        }
    }

    /// Convert error to JSON representation for structured error output.
    pub fn to_json(&self) -> serde_json::Value {
        let mut error_obj = serde_json::json!({
            "code": self.exit_code() as i32,
            "type": self.error_type(),
            "message": self.to_string(),
        });

        if let WikiError::Transaction { source, .. } = self {
            error_obj["cause"] = serde_json::json!({
                "type": source.error_type(),
                "message": source.to_string(),
            });
        }

        serde_json::json!({ "error": error_obj })
    }
}

fn message_is_transient(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("locked") || lower.contains("busy") || lower.contains("connection")
}

/// Result type alias for pagewiki operations
pub type Result<T> = std::result::Result<T, WikiError>;
