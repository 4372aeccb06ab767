//! Error macros for pagewiki

/// Macro for creating usage errors
#[macro_export]
macro_rules! bail_usage {
    ($msg:expr) => {
        return Err($crate::error::WikiError::UsageError($msg.to_string()))
    };
}

/// Macro for mapping database errors
#[macro_export]
macro_rules! map_db_err {
    ($op:expr) => {
        |e: rusqlite::Error| $crate::error::WikiError::db_operation($op, e)
    };
}
