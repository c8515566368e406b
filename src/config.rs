//! Application configuration management.
//!
//! Settings are layered with `figment`, later layers winning:
//!
//! 1. Built-in defaults
//! 2. TOML file (`--config PATH`, else `config.toml` in the platform config
//!    directory)
//! 3. Environment variables prefixed with `DUPESTAGE_`
//!    (e.g. `DUPESTAGE_IO_THREADS=8`)
//! 4. CLI flags, applied by the caller on the extracted [`Config`]

use std::fs;
use std::path::{Component, Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::actions::RelocateConfig;
use crate::duplicates::fingerprint::DEFAULT_IO_THREADS;
use crate::duplicates::FinderConfig;
use crate::scanner::hasher::DEFAULT_READ_RETRIES;
use crate::scanner::{WalkerConfig, DEFAULT_QUARANTINE_DIR};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DUPESTAGE_";

/// Errors from loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or has the wrong types.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("Invalid configuration value for {field}: {reason}")]
    Value {
        /// Offending key
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Quarantine directory name, relative to the scan root.
    pub quarantine_dir: PathBuf,
    /// Number of hashing threads.
    pub io_threads: usize,
    /// Retries for transient read errors.
    pub read_retries: u32,
    /// Gitignore-style patterns to skip.
    pub ignore_patterns: Vec<String>,
    /// Skip hidden files and directories.
    pub skip_hidden: bool,
    /// Treat zero-byte files as duplicate candidates.
    pub include_empty: bool,
    /// Ignore files smaller than this many bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_size: Option<u64>,
    /// Always copy-verify-delete instead of renaming.
    pub force_copy: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quarantine_dir: PathBuf::from(DEFAULT_QUARANTINE_DIR),
            io_threads: DEFAULT_IO_THREADS,
            read_retries: DEFAULT_READ_RETRIES,
            ignore_patterns: Vec::new(),
            skip_hidden: false,
            include_empty: false,
            min_size: None,
            force_copy: false,
        }
    }
}

impl Config {
    /// Build the layered figment without extracting it.
    ///
    /// With no explicit file, the platform default path is used if it
    /// exists.
    #[must_use]
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        let file = config_file
            .map(Path::to_path_buf)
            .or_else(Self::default_path);
        if let Some(path) = file {
            log::debug!("Reading config from {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Load and validate the configuration.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `config_file` is given but missing
    /// - `Invalid` if a layer does not parse
    /// - `Value` if a setting is out of range
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_file {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
        }
        let config: Config = Self::figment(config_file)
            .extract()
            .map_err(|e| ConfigError::Invalid(Box::new(e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `Value` for the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.io_threads == 0 {
            return Err(ConfigError::Value {
                field: "io_threads",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.quarantine_dir.as_os_str().is_empty() {
            return Err(ConfigError::Value {
                field: "quarantine_dir",
                reason: "must not be empty".to_string(),
            });
        }
        if self.quarantine_dir.is_absolute()
            || self
                .quarantine_dir
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ConfigError::Value {
                field: "quarantine_dir",
                reason: "must be a relative path inside the scan root".to_string(),
            });
        }
        Ok(())
    }

    /// Save the configuration as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Default platform-specific config file path.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "dupestage", "dupestage")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Walker filters derived from this configuration.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig::default()
            .with_skip_hidden(self.skip_hidden)
            .with_include_empty(self.include_empty)
            .with_min_size(self.min_size)
            .with_patterns(self.ignore_patterns.clone())
    }

    /// Finder configuration derived from this configuration.
    #[must_use]
    pub fn finder_config(&self) -> FinderConfig {
        FinderConfig::default()
            .with_io_threads(self.io_threads)
            .with_read_retries(self.read_retries)
            .with_quarantine_dir(self.quarantine_dir.clone())
            .with_walker_config(self.walker_config())
    }

    /// Relocator configuration derived from this configuration.
    #[must_use]
    pub fn relocate_config(&self) -> RelocateConfig {
        RelocateConfig::default()
            .with_quarantine_dir(self.quarantine_dir.clone())
            .with_force_copy(self.force_copy)
            .with_read_retries(self.read_retries)
    }
}
