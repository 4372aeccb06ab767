//! Store configuration for pagewiki
//!
//! Configuration is stored in `config.toml` at the store root. Every field is
//! optional; a missing file means all defaults.

pub mod types;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, WikiError};

pub use types::{LimitsConfig, RetryConfig, StoreConfig, STORE_FORMAT_VERSION};

/// File name of the per-store configuration
pub const CONFIG_FILE: &str = "config.toml";

const STORE_DIR: &str = "pagewiki";
const STORE_ENV_VAR: &str = "PAGEWIKI_STORE";

impl StoreConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: StoreConfig = toml::from_str(&content)?;

        if config.version > STORE_FORMAT_VERSION {
            return Err(WikiError::InvalidStore {
                reason: format!(
                    "config version {} is newer than supported version {}",
                    config.version, STORE_FORMAT_VERSION
                ),
            });
        }
        if config.database_file.trim().is_empty() {
            return Err(WikiError::invalid_value("database_file", "(empty)"));
        }

        Ok(config)
    }

    /// Load `config.toml` from a store root, or defaults when absent
    pub fn load_or_default(store_root: &Path) -> Result<Self> {
        let path = store_root.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| WikiError::Other(format!("failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Resolve the store root: explicit path, then `PAGEWIKI_STORE`, then the
/// platform data directory
pub fn resolve_store_root(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_dir) = std::env::var(STORE_ENV_VAR) {
        if !env_dir.trim().is_empty() {
            return Ok(PathBuf::from(env_dir));
        }
    }
    dirs::data_dir()
        .map(|dir| dir.join(STORE_DIR))
        .ok_or_else(|| WikiError::Other("unable to determine data directory".to_string()))
}
