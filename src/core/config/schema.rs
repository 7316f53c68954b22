//! core::config::schema
//!
//! Configuration schema types.
//!
//! # Location
//!
//! Searched in order:
//! 1. `$MEASUREKEEP_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/measurekeep/config.toml`
//! 3. `~/.measurekeep/config.toml` (canonical write location)
//!
//! # Validation
//!
//! Config values are validated after parsing so that a bad layout name or
//! a zero retry budget is reported at startup rather than on first use.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Complete configuration file.
///
/// # Example
///
/// ```toml
/// [shop]
/// domain = "example.myshopify.com"
/// api_version = "2025-10"
///
/// [storage]
/// layout = "discrete"
/// structured_lookup = true
///
/// [retry]
/// max_attempts = 3
/// base_delay_ms = 200
///
/// [secrets]
/// provider = "file"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Platform connection settings
    pub shop: Option<ShopConfig>,

    /// Storage layout settings
    pub storage: Option<StorageConfig>,

    /// Transport retry settings
    pub retry: Option<RetryConfig>,

    /// Secret storage settings
    pub secrets: Option<SecretsConfig>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(shop) = &self.shop {
            shop.validate()?;
        }
        if let Some(storage) = &self.storage {
            storage.validate()?;
        }
        if let Some(retry) = &self.retry {
            retry.validate()?;
        }
        if let Some(secrets) = &self.secrets {
            secrets.validate()?;
        }
        Ok(())
    }
}

/// Platform connection settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ShopConfig {
    /// Shop domain (e.g. "example.myshopify.com")
    pub domain: Option<String>,

    /// Admin API version (e.g. "2025-10")
    pub api_version: Option<String>,
}

impl ShopConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(domain) = &self.domain {
            if normalize_shop_domain(domain).is_empty() {
                return Err(ConfigError::InvalidValue(
                    "shop.domain cannot be empty".to_string(),
                ));
            }
        }
        if let Some(version) = &self.api_version {
            if version.trim().is_empty() || version.contains('/') {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid shop.api_version '{}'",
                    version
                )));
            }
        }
        Ok(())
    }
}

/// How measurement records are laid out in metadata entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLayout {
    /// All records in one JSON array entry
    Aggregate,
    /// One entry per record plus a `selected` pointer entry
    #[default]
    Discrete,
}

impl StorageLayout {
    /// Valid layout names.
    pub const NAMES: &'static [&'static str] = &["aggregate", "discrete"];
}

impl fmt::Display for StorageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageLayout::Aggregate => write!(f, "aggregate"),
            StorageLayout::Discrete => write!(f, "discrete"),
        }
    }
}

impl FromStr for StorageLayout {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aggregate" => Ok(StorageLayout::Aggregate),
            "discrete" => Ok(StorageLayout::Discrete),
            other => Err(ConfigError::InvalidValue(format!(
                "invalid storage.layout '{}', must be one of: {}",
                other,
                Self::NAMES.join(", ")
            ))),
        }
    }
}

/// Storage layout settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Layout used by this deployment
    pub layout: Option<StorageLayout>,

    /// Key of the aggregate entry (aggregate layout)
    pub aggregate_key: Option<String>,

    /// Query structured objects before scanning flat entries
    pub structured_lookup: Option<bool>,
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(key) = &self.aggregate_key {
            if key.is_empty() {
                return Err(ConfigError::InvalidValue(
                    "storage.aggregate_key cannot be empty".to_string(),
                ));
            }
            if key == crate::core::types::SELECTED_KEY {
                return Err(ConfigError::InvalidValue(format!(
                    "storage.aggregate_key cannot be the reserved key '{}'",
                    key
                )));
            }
        }
        Ok(())
    }
}

/// Transport retry settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts per request, including the first
    pub max_attempts: Option<u32>,

    /// Delay before the first retry; doubles on each further retry
    pub base_delay_ms: Option<u64>,

    /// Per-request timeout
    pub timeout_secs: Option<u64>,
}

impl RetryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == Some(0) {
            return Err(ConfigError::InvalidValue(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::InvalidValue(
                "retry.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Secrets configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SecretsConfig {
    /// Provider to use ("file" or "keychain")
    pub provider: Option<String>,
}

impl SecretsConfig {
    /// Valid secret providers.
    pub const VALID_PROVIDERS: &'static [&'static str] = &["file", "keychain"];

    /// Validate the secrets configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(provider) = &self.provider {
            if !Self::VALID_PROVIDERS.contains(&provider.as_str()) {
                return Err(ConfigError::InvalidValue(format!(
                    "invalid secrets provider '{}', must be one of: {}",
                    provider,
                    Self::VALID_PROVIDERS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

/// Strip scheme, trailing slashes and whitespace from a shop domain.
///
/// ```
/// use measurekeep::core::config::normalize_shop_domain;
///
/// assert_eq!(normalize_shop_domain(" https://example.myshopify.com/ "), "example.myshopify.com");
/// assert_eq!(normalize_shop_domain("example.myshopify.com"), "example.myshopify.com");
/// ```
pub fn normalize_shop_domain(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    without_scheme.trim_end_matches('/').trim().to_string()
}
