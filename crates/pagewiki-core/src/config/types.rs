//! Configuration type definitions

use serde::{Deserialize, Serialize};

/// Current store format version
pub const STORE_FORMAT_VERSION: u32 = 1;

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store format version for compatibility checking
    #[serde(default = "default_version")]
    pub version: u32,

    /// Logical name of the database file inside the store root
    #[serde(default = "default_database_file")]
    pub database_file: String,

    /// How long SQLite waits on a locked database before failing
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Retry policy for transient store contention
    #[serde(default)]
    pub retry: RetryConfig,

    /// Result caps for listings and searches
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Retry behaviour for busy/locked failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Base delay; attempt `n` waits `delay_ms * n`
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

/// Maximum rows returned by listing queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_list_limit")]
    pub list: usize,

    #[serde(default = "default_search_limit")]
    pub search: usize,

    #[serde(default = "default_related_limit")]
    pub related: usize,

    #[serde(default = "default_tag_search_limit")]
    pub tag_search: usize,
}

fn default_version() -> u32 {
    STORE_FORMAT_VERSION
}

fn default_database_file() -> String {
    "pagewiki.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    100
}

fn default_list_limit() -> usize {
    100
}

fn default_search_limit() -> usize {
    100
}

fn default_related_limit() -> usize {
    10
}

fn default_tag_search_limit() -> usize {
    100
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            list: default_list_limit(),
            search: default_search_limit(),
            related: default_related_limit(),
            tag_search: default_tag_search_limit(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            version: STORE_FORMAT_VERSION,
            database_file: default_database_file(),
            busy_timeout_ms: default_busy_timeout_ms(),
            retry: RetryConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}
