//! secrets
//!
//! Storage and resolution of the platform admin token.
//!
//! # Providers
//!
//! - [`FileSecretStore`]: `~/.measurekeep/secrets.toml` (default)
//! - [`KeychainSecretStore`]: OS keychain, behind the `keychain` feature
//!
//! # Resolution
//!
//! The `ADMIN_TOKEN` environment variable wins over the store. A blank
//! variable counts as unset.
//!
//! ```
//! use measurekeep::secrets::{resolve_admin_token_from, FileSecretStore, TokenSource};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = FileSecretStore::with_path(dir.path().join("secrets.toml"));
//!
//! let (token, source) = resolve_admin_token_from(Some("shpat_env".into()), &store).unwrap();
//! assert_eq!(token.as_deref(), Some("shpat_env"));
//! assert_eq!(source, TokenSource::Environment);
//! ```

mod file_store;
mod keychain_store;
mod traits;

use std::fmt;

pub use file_store::FileSecretStore;
pub use keychain_store::KeychainSecretStore;
pub use traits::{SecretError, SecretStore};

/// Default provider name.
pub const DEFAULT_PROVIDER: &str = "file";

/// Store key of the admin token.
pub const ADMIN_TOKEN_KEY: &str = "shopify.admin_token";

/// Environment variable that overrides the stored token.
pub const ADMIN_TOKEN_ENV: &str = "ADMIN_TOKEN";

/// Create the store named by `provider` (`file` or `keychain`).
///
/// # Errors
///
/// `ProviderNotAvailable` for an unknown name, or for `keychain` when the
/// feature is not compiled in.
pub fn create_store(provider: &str) -> Result<Box<dyn SecretStore>, SecretError> {
    match provider {
        "file" => Ok(Box::new(FileSecretStore::new()?)),
        "keychain" => Ok(Box::new(KeychainSecretStore::new()?)),
        other => Err(SecretError::ProviderNotAvailable(format!(
            "unknown secret provider: '{}' (valid: file, keychain)",
            other
        ))),
    }
}

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Environment,
    Store,
    None,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Environment => write!(f, "{} environment variable", ADMIN_TOKEN_ENV),
            TokenSource::Store => write!(f, "secret store"),
            TokenSource::None => write!(f, "not configured"),
        }
    }
}

/// Resolve the admin token from the environment, then `store`.
pub fn resolve_admin_token(
    store: &dyn SecretStore,
) -> Result<(Option<String>, TokenSource), SecretError> {
    resolve_admin_token_from(std::env::var(ADMIN_TOKEN_ENV).ok(), store)
}

/// Resolve the admin token given the environment value explicitly.
pub fn resolve_admin_token_from(
    env_value: Option<String>,
    store: &dyn SecretStore,
) -> Result<(Option<String>, TokenSource), SecretError> {
    if let Some(token) = env_value.filter(|t| !t.trim().is_empty()) {
        return Ok((Some(token.trim().to_string()), TokenSource::Environment));
    }

    match store.get(ADMIN_TOKEN_KEY)? {
        Some(token) if !token.trim().is_empty() => Ok((Some(token), TokenSource::Store)),
        _ => Ok((None, TokenSource::None)),
    }
}
