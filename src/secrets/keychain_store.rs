//! secrets::keychain_store
//!
//! Secrets in the OS keychain via `keyring`, under the service name
//! `measurekeep`. Only functional with the `keychain` feature; without it
//! the store exists but every call fails with `ProviderNotAvailable`.

#[cfg(feature = "keychain")]
use keyring::Entry;

use super::traits::{SecretError, SecretStore};

/// Keychain service name.
pub const SERVICE: &str = "measurekeep";

const NOT_ENABLED: &str = "keychain support not enabled (compile with --features keychain)";

/// OS keychain secret store.
#[derive(Debug, Clone)]
pub struct KeychainSecretStore {
    service: String,
}

impl KeychainSecretStore {
    /// Store under the default service name.
    ///
    /// # Errors
    ///
    /// Returns `ProviderNotAvailable` when built without the `keychain` feature.
    pub fn new() -> Result<Self, SecretError> {
        if cfg!(feature = "keychain") {
            Ok(Self::with_service(SERVICE))
        } else {
            Err(SecretError::ProviderNotAvailable(NOT_ENABLED.into()))
        }
    }

    /// Store under a custom service name.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    #[cfg(feature = "keychain")]
    fn entry(&self, key: &str) -> Result<Entry, SecretError> {
        Entry::new(&self.service, key)
            .map_err(|e| SecretError::ReadError(format!("cannot open keychain entry: {}", e)))
    }
}

#[cfg(feature = "keychain")]
impl SecretStore for KeychainSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        match self.entry(key)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(SecretError::ReadError(format!(
                "cannot read from keychain: {}",
                e
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| SecretError::WriteError(format!("cannot write to keychain: {}", e)))
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(SecretError::DeleteError(format!(
                "cannot delete from keychain: {}",
                e
            ))),
        }
    }
}

#[cfg(not(feature = "keychain"))]
impl SecretStore for KeychainSecretStore {
    fn get(&self, _key: &str) -> Result<Option<String>, SecretError> {
        Err(SecretError::ProviderNotAvailable(NOT_ENABLED.into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), SecretError> {
        Err(SecretError::ProviderNotAvailable(NOT_ENABLED.into()))
    }

    fn delete(&self, _key: &str) -> Result<(), SecretError> {
        Err(SecretError::ProviderNotAvailable(NOT_ENABLED.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_accessor() {
        assert_eq!(KeychainSecretStore::with_service("mk-test").service(), "mk-test");
    }

    #[cfg(not(feature = "keychain"))]
    #[test]
    fn unavailable_without_feature() {
        let err = KeychainSecretStore::new().unwrap_err();
        assert!(err.to_string().contains("not enabled"));

        let store = KeychainSecretStore::with_service("mk-test");
        assert!(matches!(
            store.get("shopify.admin_token"),
            Err(SecretError::ProviderNotAvailable(_))
        ));
    }

    // Touches the real keychain; run manually with --ignored.
    #[cfg(feature = "keychain")]
    #[test]
    #[ignore]
    fn round_trip_real_keychain() {
        let store = KeychainSecretStore::with_service(format!("measurekeep-test-{}", std::process::id()));
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.delete("k").unwrap();
        assert_eq!(store.get("k").unwrap(), None);
    }
}
