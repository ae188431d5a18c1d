//! Engine configuration.
//!
//! Loaded from an optional TOML file; every field has a default, so an empty
//! file (or no file) yields a working configuration that reads the three CSV
//! tables from `./data`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::cache::ModelHandle;
use crate::provider::csv_file::{DEFAULT_CATALOG_FILE, DEFAULT_DESCRIPTOR_FILE, DEFAULT_REFERENCE_FILE};
use crate::provider::CsvDataSource;
use crate::query::{
    BruteForceRecommender, CachedRecommender, RecommendOptions, RecommendResult, Recommender,
    UnknownTagPolicy,
};

/// Errors that can occur while reading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory holding the three tables
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_catalog_file")]
    pub catalog_file: String,

    #[serde(default = "default_descriptor_file")]
    pub descriptor_file: String,

    #[serde(default = "default_reference_file")]
    pub reference_file: String,

    /// Directory display assets live in; `None` disables asset resolution
    #[serde(default = "default_asset_dir")]
    pub asset_dir: Option<PathBuf>,

    /// Policy for user tags outside the fitted vocabulary
    #[serde(default)]
    pub unknown_tags: UnknownTagPolicy,

    /// Fit the model once and reuse it instead of reloading per request
    #[serde(default)]
    pub cache_model: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_catalog_file() -> String {
    DEFAULT_CATALOG_FILE.into()
}
fn default_descriptor_file() -> String {
    DEFAULT_DESCRIPTOR_FILE.into()
}
fn default_reference_file() -> String {
    DEFAULT_REFERENCE_FILE.into()
}
fn default_asset_dir() -> Option<PathBuf> {
    Some(PathBuf::from("assets"))
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            catalog_file: default_catalog_file(),
            descriptor_file: default_descriptor_file(),
            reference_file: default_reference_file(),
            asset_dir: default_asset_dir(),
            unknown_tags: UnknownTagPolicy::default(),
            cache_model: false,
        }
    }
}

impl EngineConfig {
    /// Read a TOML configuration file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// CSV source over the configured files.
    pub fn data_source(&self) -> CsvDataSource {
        CsvDataSource::new(
            self.data_dir.join(&self.catalog_file),
            self.data_dir.join(&self.descriptor_file),
            self.data_dir.join(&self.reference_file),
        )
    }

    pub fn options(&self) -> RecommendOptions {
        RecommendOptions {
            unknown_tags: self.unknown_tags,
            asset_dir: self.asset_dir.clone(),
        }
    }

    /// Build the recommender this configuration describes.
    ///
    /// With `cache_model` the data is loaded and fitted here, so load errors
    /// surface immediately instead of on the first request.
    pub fn build_recommender(&self) -> RecommendResult<Box<dyn Recommender>> {
        let source = self.data_source();
        if self.cache_model {
            let handle = Arc::new(ModelHandle::build(&source)?);
            Ok(Box::new(CachedRecommender::new(handle, self.options())))
        } else {
            Ok(Box::new(BruteForceRecommender::with_options(source, self.options())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_engine_config_default() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert_eq!(cfg.catalog_file, "coffeeshop_df.csv");
        assert_eq!(cfg.unknown_tags, UnknownTagPolicy::Ignore);
        assert!(!cfg.cache_model);
        assert_eq!(
            cfg.data_source().catalog_path(),
            Path::new("data").join("coffeeshop_df.csv")
        );
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, EngineConfig::default());
    }

    #[test]
    fn test_engine_config_toml_roundtrip() {
        let cfg = EngineConfig {
            unknown_tags: UnknownTagPolicy::Reject,
            cache_model: true,
            ..Default::default()
        };
        let serialized = toml::to_string(&cfg).expect("serialize");
        let deserialized: EngineConfig = toml::from_str(&serialized).expect("deserialize");
        assert_eq!(deserialized, cfg);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "data_dir = \"/srv/cafes\"\nunknown_tags = \"reject\"").unwrap();
        let cfg = EngineConfig::load(file.path()).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/srv/cafes"));
        assert_eq!(cfg.options().unknown_tags, UnknownTagPolicy::Reject);
        assert_eq!(cfg.reference_file, "reference_df.csv");
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "unknown_tags = \"sometimes\"").unwrap();
        assert!(matches!(EngineConfig::load(file.path()), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            EngineConfig::load("/definitely/not/here.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}
