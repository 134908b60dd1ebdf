//! Engine configuration
//!
//! Loaded from TOML; every field has a default so an empty file (or no file)
//! is a valid configuration.
//!
//! ```toml
//! database_path = ".folio/folio.db"
//! default_language_id = 1
//!
//! [retention]
//! keep_versions = 20
//!
//! [cache]
//! enabled = true
//! ttl_secs = 300
//! max_entries = 10000
//!
//! [logging]
//! profile = "production"
//! ```

use folio_core::cache::CacheConfig;
use folio_core::errors::{ExError, ExErrorKind, Result};
use folio_core::logging_facility::Profile;
use folio_core_types::LanguageId;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DATABASE_PATH: &str = ".folio/folio.db";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FolioConfig {
    pub database_path: PathBuf,

    /// Language used when a render request names none
    pub default_language_id: i64,

    pub retention: RetentionConfig,
    pub cache: CacheSettings,
    pub logging: LoggingConfig,
}

impl Default for FolioConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            default_language_id: 1,
            retention: RetentionConfig::default(),
            cache: CacheSettings::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetentionConfig {
    /// When set, publishing prunes unpublished versions beyond this many
    pub keep_versions: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl_secs: Option<u64>,
    pub max_entries: Option<usize>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: None,
            max_entries: None,
        }
    }
}

impl CacheSettings {
    pub fn to_cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: self.ttl_secs.map(Duration::from_secs),
            max_entries: self.max_entries,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub profile: Profile,
}

impl FolioConfig {
    /// Read and validate a TOML configuration file
    ///
    /// # Errors
    ///
    /// - `Io` if the file cannot be read
    /// - `InvalidInput` if it is not valid configuration
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("load_config")
                .with_message(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML configuration text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: FolioConfig = toml::from_str(content).map_err(|e| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_op("load_config")
                .with_message(format!("invalid configuration: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| {
            Err(ExError::new(ExErrorKind::InvalidInput)
                .with_op("load_config")
                .with_message(message.to_string()))
        };
        // language 0 marks language-neutral fields in storage
        if self.default_language_id < 1 {
            return invalid("default_language_id must be at least 1");
        }
        if self.cache.max_entries == Some(0) {
            return invalid("cache.max_entries must be at least 1 when set");
        }
        if self.retention.keep_versions == Some(0) {
            return invalid("retention.keep_versions must be at least 1 when set");
        }
        Ok(())
    }

    pub fn default_language(&self) -> LanguageId {
        LanguageId::new(self.default_language_id)
    }
}
