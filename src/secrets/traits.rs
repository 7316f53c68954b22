//! secrets::traits
//!
//! The secret store interface.
//!
//! Keys are dotted names such as `shopify.admin_token`. Stores keep them
//! verbatim. No implementation may log a secret value or put one in an
//! error message.

use thiserror::Error;

/// Errors from secret storage.
///
/// Messages never contain secret values.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("failed to read secret: {0}")]
    ReadError(String),

    #[error("failed to write secret: {0}")]
    WriteError(String),

    #[error("failed to delete secret: {0}")]
    DeleteError(String),

    #[error("secret provider not available: {0}")]
    ProviderNotAvailable(String),
}

/// Key-value storage for credentials.
pub trait SecretStore: Send + Sync {
    /// Stored value for `key`, or `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, SecretError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), SecretError>;

    /// Remove `key`. Removing an absent key succeeds.
    fn delete(&self, key: &str) -> Result<(), SecretError>;

    fn exists(&self, key: &str) -> Result<bool, SecretError> {
        Ok(self.get(key)?.is_some())
    }
}
