//! core::config
//!
//! Configuration schema and loading.
//!
//! # Precedence
//!
//! Configuration values are resolved in this order (later overrides earlier):
//! 1. Default values
//! 2. Config file
//! 3. Environment (`SHOP`, `API_VERSION`)
//! 4. CLI flags (not handled here)
//!
//! The admin credential is never part of the config file; see
//! [`crate::secrets::resolve_admin_token`].
//!
//! # Config Locations
//!
//! Searched in order:
//! 1. `$MEASUREKEEP_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/measurekeep/config.toml`
//! 3. `~/.measurekeep/config.toml` (canonical write location)
//!
//! # Example
//!
//! ```no_run
//! use measurekeep::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! println!("Layout: {}", config.layout());
//! println!("API version: {}", config.api_version());
//! ```

pub mod schema;

pub use schema::{
    normalize_shop_domain, FileConfig, RetryConfig, SecretsConfig, ShopConfig, StorageConfig,
    StorageLayout,
};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::metadata::RetryPolicy;

/// Admin API version used when none is configured.
pub const DEFAULT_API_VERSION: &str = "2025-10";

/// Aggregate entry key used when none is configured.
pub const DEFAULT_AGGREGATE_KEY: &str = "saved";

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "MEASUREKEEP_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("failed to write config file '{path}': {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("unknown configuration key: {0}")]
    UnknownKey(String),

    #[error("home directory not found")]
    NoHomeDir,
}

/// Values taken from the process environment at load time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvOverrides {
    /// `SHOP`
    pub shop: Option<String>,
    /// `API_VERSION`
    pub api_version: Option<String>,
}

impl EnvOverrides {
    /// Capture overrides from the environment. Empty values are ignored.
    pub fn from_env() -> Self {
        let read = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            shop: read("SHOP"),
            api_version: read("API_VERSION"),
        }
    }
}

/// Resolved configuration.
///
/// Built once at startup and passed to the client and repository; nothing
/// downstream reads the environment.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Parsed config file (defaults if none was found)
    pub file: FileConfig,
    /// Environment overrides
    pub env: EnvOverrides,
    /// Path the file was loaded from
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default location and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be parsed or
    /// fails validation. A missing file is not an error.
    pub fn load() -> Result<Self, ConfigError> {
        let (file, path) = Self::load_file()?;
        Ok(Self {
            file,
            env: EnvOverrides::from_env(),
            path,
        })
    }

    /// Build a config from already-loaded parts.
    pub fn from_parts(file: FileConfig, env: EnvOverrides) -> Result<Self, ConfigError> {
        file.validate()?;
        Ok(Self {
            file,
            env,
            path: None,
        })
    }

    /// Load the config file from standard locations.
    fn load_file() -> Result<(FileConfig, Option<PathBuf>), ConfigError> {
        for path in Self::candidate_paths() {
            if path.exists() {
                let config = Self::read_file(&path)?;
                return Ok((config, Some(path)));
            }
        }
        Ok((FileConfig::default(), None))
    }

    /// Config file locations in search order.
    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(path));
        }
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            paths.push(PathBuf::from(xdg_home).join("measurekeep/config.toml"));
        }
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".measurekeep/config.toml"));
        }
        paths
    }

    /// Read, parse and validate a config file.
    pub fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: FileConfig = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Where `write` stores the config file.
    ///
    /// Honors `$MEASUREKEEP_CONFIG`, otherwise `~/.measurekeep/config.toml`.
    pub fn write_path() -> Result<PathBuf, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(".measurekeep/config.toml"))
    }

    /// Write a config file atomically.
    ///
    /// Creates parent directories if needed. Writes to a temp file in the
    /// same directory, then renames over the target.
    pub fn write_atomic(path: &Path, config: &FileConfig) -> Result<(), ConfigError> {
        config.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            toml::to_string_pretty(config).map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        let temp_path = path.with_extension("toml.tmp");
        let mut file = fs::File::create(&temp_path).map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        file.write_all(contents.as_bytes())
            .map_err(|e| ConfigError::WriteError {
                path: temp_path.clone(),
                source: e,
            })?;

        file.sync_all().map_err(|e| ConfigError::WriteError {
            path: temp_path.clone(),
            source: e,
        })?;

        fs::rename(&temp_path, path).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(())
    }

    // =========================================================================
    // Accessor methods with precedence
    // =========================================================================

    /// Shop domain, normalized. `None` when neither env nor file sets one.
    pub fn shop_domain(&self) -> Option<String> {
        self.env
            .shop
            .as_deref()
            .or_else(|| self.file.shop.as_ref().and_then(|s| s.domain.as_deref()))
            .map(normalize_shop_domain)
            .filter(|d| !d.is_empty())
    }

    /// Admin API version. Defaults to [`DEFAULT_API_VERSION`].
    pub fn api_version(&self) -> &str {
        self.env
            .api_version
            .as_deref()
            .or_else(|| self.file.shop.as_ref().and_then(|s| s.api_version.as_deref()))
            .unwrap_or(DEFAULT_API_VERSION)
    }

    /// Storage layout. Defaults to discrete.
    pub fn layout(&self) -> StorageLayout {
        self.file
            .storage
            .as_ref()
            .and_then(|s| s.layout)
            .unwrap_or_default()
    }

    /// Aggregate entry key. Defaults to [`DEFAULT_AGGREGATE_KEY`].
    pub fn aggregate_key(&self) -> &str {
        self.file
            .storage
            .as_ref()
            .and_then(|s| s.aggregate_key.as_deref())
            .unwrap_or(DEFAULT_AGGREGATE_KEY)
    }

    /// Whether the structured-object lookup runs first. Defaults to `true`.
    pub fn structured_lookup(&self) -> bool {
        self.file
            .storage
            .as_ref()
            .and_then(|s| s.structured_lookup)
            .unwrap_or(true)
    }

    /// Transport retry policy.
    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        let retry = self.file.retry.clone().unwrap_or_default();
        RetryPolicy {
            max_attempts: retry.max_attempts.unwrap_or(defaults.max_attempts),
            base_delay: retry
                .base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.base_delay),
            timeout: retry
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Secret provider. Defaults to "file".
    pub fn secrets_provider(&self) -> &str {
        self.file
            .secrets
            .as_ref()
            .and_then(|s| s.provider.as_deref())
            .unwrap_or(crate::secrets::DEFAULT_PROVIDER)
    }

    /// Path the config file was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

/// Every key accepted by `get_key` / `set_key`.
pub const KNOWN_KEYS: &[&str] = &[
    "shop.domain",
    "shop.api_version",
    "storage.layout",
    "storage.aggregate_key",
    "storage.structured_lookup",
    "retry.max_attempts",
    "retry.base_delay_ms",
    "retry.timeout_secs",
    "secrets.provider",
];

impl FileConfig {
    /// Read a dotted key as a display string. `Ok(None)` when unset.
    pub fn get_key(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let shop = self.shop.as_ref();
        let storage = self.storage.as_ref();
        let retry = self.retry.as_ref();
        let value = match key {
            "shop.domain" => shop.and_then(|s| s.domain.clone()),
            "shop.api_version" => shop.and_then(|s| s.api_version.clone()),
            "storage.layout" => storage.and_then(|s| s.layout).map(|l| l.to_string()),
            "storage.aggregate_key" => storage.and_then(|s| s.aggregate_key.clone()),
            "storage.structured_lookup" => {
                storage.and_then(|s| s.structured_lookup).map(|b| b.to_string())
            }
            "retry.max_attempts" => retry.and_then(|r| r.max_attempts).map(|n| n.to_string()),
            "retry.base_delay_ms" => retry.and_then(|r| r.base_delay_ms).map(|n| n.to_string()),
            "retry.timeout_secs" => retry.and_then(|r| r.timeout_secs).map(|n| n.to_string()),
            "secrets.provider" => self.secrets.as_ref().and_then(|s| s.provider.clone()),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        };
        Ok(value)
    }

    /// Set a dotted key from a string, then validate the whole config.
    pub fn set_key(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "shop.domain" => {
                self.shop.get_or_insert_with(Default::default).domain =
                    Some(normalize_shop_domain(value))
            }
            "shop.api_version" => {
                self.shop.get_or_insert_with(Default::default).api_version =
                    Some(value.to_string())
            }
            "storage.layout" => {
                self.storage.get_or_insert_with(Default::default).layout = Some(value.parse()?)
            }
            "storage.aggregate_key" => {
                self.storage.get_or_insert_with(Default::default).aggregate_key =
                    Some(value.to_string())
            }
            "storage.structured_lookup" => {
                self.storage
                    .get_or_insert_with(Default::default)
                    .structured_lookup = Some(parse_value(key, value)?)
            }
            "retry.max_attempts" => {
                self.retry.get_or_insert_with(Default::default).max_attempts =
                    Some(parse_value(key, value)?)
            }
            "retry.base_delay_ms" => {
                self.retry.get_or_insert_with(Default::default).base_delay_ms =
                    Some(parse_value(key, value)?)
            }
            "retry.timeout_secs" => {
                self.retry.get_or_insert_with(Default::default).timeout_secs =
                    Some(parse_value(key, value)?)
            }
            "secrets.provider" => {
                self.secrets.get_or_insert_with(Default::default).provider =
                    Some(value.to_string())
            }
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        self.validate()
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue(format!("invalid value '{}' for {}", value, key)))
}
