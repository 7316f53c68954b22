//! secrets::file_store
//!
//! Secrets in a TOML file, `~/.measurekeep/secrets.toml` by default.
//!
//! The file is written atomically (temp file, then rename) and on Unix is
//! readable by its owner only.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use super::traits::{SecretError, SecretStore};

/// TOML-file secret store.
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    path: PathBuf,
}

impl FileSecretStore {
    /// Store at the default location under the home directory.
    ///
    /// # Errors
    ///
    /// Returns `ReadError` if the home directory cannot be determined.
    pub fn new() -> Result<Self, SecretError> {
        let home = dirs::home_dir()
            .ok_or_else(|| SecretError::ReadError("cannot determine home directory".into()))?;
        Ok(Self::with_path(home.join(".measurekeep").join("secrets.toml")))
    }

    /// Store at an explicit path.
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file is absent or has mode 0600.
    #[cfg(unix)]
    pub fn verify_permissions(&self) -> Result<bool, SecretError> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.permissions().mode() & 0o777 == 0o600),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) => Err(SecretError::ReadError(format!(
                "cannot read file metadata: {}",
                e
            ))),
        }
    }

    #[cfg(not(unix))]
    pub fn verify_permissions(&self) -> Result<bool, SecretError> {
        Ok(true)
    }

    fn load(&self) -> Result<BTreeMap<String, String>, SecretError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(SecretError::ReadError(format!(
                    "cannot read secrets file: {}",
                    e
                )))
            }
        };

        toml::from_str(&content)
            .map_err(|e| SecretError::ReadError(format!("cannot parse secrets file: {}", e)))
    }

    fn store(&self, secrets: &BTreeMap<String, String>) -> Result<(), SecretError> {
        let write_err = |what: &str, e: std::io::Error| {
            SecretError::WriteError(format!("cannot {}: {}", what, e))
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err("create directory", e))?;
        }

        let content = toml::to_string_pretty(secrets)
            .map_err(|e| SecretError::WriteError(format!("cannot serialize secrets: {}", e)))?;

        let temp_path = self.path.with_extension("tmp");
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| write_err("create temp file", e))?;

        // Restrict before any secret bytes land on disk.
        #[cfg(unix)]
        file.set_permissions(fs::Permissions::from_mode(0o600))
            .map_err(|e| write_err("set permissions", e))?;

        file.write_all(content.as_bytes())
            .map_err(|e| write_err("write secrets", e))?;
        file.sync_all().map_err(|e| write_err("sync to disk", e))?;
        drop(file);

        fs::rename(&temp_path, &self.path).map_err(|e| write_err("rename temp file", e))
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>, SecretError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SecretError> {
        let mut secrets = self.load()?;
        secrets.insert(key.to_string(), value.to_string());
        self.store(&secrets)
    }

    fn delete(&self, key: &str) -> Result<(), SecretError> {
        let mut secrets = self.load()?;
        if secrets.remove(key).is_none() {
            return Ok(());
        }
        self.store(&secrets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(temp: &TempDir) -> FileSecretStore {
        FileSecretStore::with_path(temp.path().join("secrets.toml"))
    }

    #[test]
    fn absent_file_reads_empty() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        assert_eq!(store.get("shopify.admin_token").unwrap(), None);
        assert!(!store.exists("shopify.admin_token").unwrap());
    }

    #[test]
    fn set_get_delete() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);

        store.set("shopify.admin_token", "shpat_one").unwrap();
        store.set("shopify.admin_token", "shpat_two").unwrap();
        assert_eq!(
            store.get("shopify.admin_token").unwrap().as_deref(),
            Some("shpat_two")
        );

        store.delete("shopify.admin_token").unwrap();
        assert_eq!(store.get("shopify.admin_token").unwrap(), None);
        store.delete("shopify.admin_token").unwrap();
    }

    #[test]
    fn creates_parent_directory() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("secrets.toml");
        let store = FileSecretStore::with_path(path.clone());

        store.set("k", "v").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn persists_across_instances() {
        let temp = TempDir::new().unwrap();
        store_in(&temp).set("k", "quoted \"value\"\nline").unwrap();
        assert_eq!(
            store_in(&temp).get("k").unwrap().as_deref(),
            Some("quoted \"value\"\nline")
        );
    }

    #[cfg(unix)]
    #[test]
    fn owner_only_permissions() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        assert!(store.verify_permissions().unwrap());

        store.set("k", "v").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert!(store.verify_permissions().unwrap());
    }

    #[test]
    fn malformed_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp);
        fs::write(store.path(), "token = [unclosed").unwrap();

        let err = store.get("token").unwrap_err();
        assert!(matches!(err, SecretError::ReadError(_)));
        assert!(err.to_string().contains("cannot parse"), "{}", err);
    }
}
