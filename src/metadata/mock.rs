//! metadata::mock
//!
//! Mock metadata client for deterministic testing.
//!
//! # Design
//!
//! The mock keeps entries in memory per owner, in creation order, and
//! records every call so tests can assert on call counts. Failures can be
//! injected per operation, and per key for writes. Structured objects are
//! unsupported until objects are configured.
//!
//! Creating an entry whose namespace and key already exist for the owner
//! overwrites it in place, the way the platform upserts metafields.
//!
//! # Example
//!
//! ```
//! use measurekeep::metadata::mock::MockMetadataClient;
//! use measurekeep::metadata::{EntryWrite, MetadataClient};
//!
//! # tokio_test::block_on(async {
//! let client = MockMetadataClient::new();
//!
//! client
//!     .write_entry(42, EntryWrite::create("measurements", "selected", "measurement_1", "single_line_text_field"))
//!     .await
//!     .unwrap();
//!
//! let entries = client.list_entries(42, "measurements").await.unwrap();
//! assert_eq!(entries.len(), 1);
//! assert_eq!(client.call_count(), 2);
//! # });
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::traits::{
    EntryWrite, MetadataClient, MetadataEntry, MetadataError, ObjectFilter, ObjectNode,
};

/// Mock metadata client for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone)]
pub struct MockMetadataClient {
    inner: Arc<Mutex<MockInner>>,
}

#[derive(Debug)]
struct MockInner {
    /// Entries by owner, in creation order.
    entries: HashMap<u64, Vec<MetadataEntry>>,
    /// Structured objects by owner; `None` means the capability is unsupported.
    objects: Option<HashMap<u64, Vec<ObjectNode>>>,
    /// Next entry id to assign.
    next_id: u64,
    /// Whether a credential is configured.
    credential: bool,
    /// Injected failures.
    fail_on: Vec<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail list_entries with the given error.
    ListEntries(MetadataError),
    /// Fail every write_entry with the given error.
    WriteEntry(MetadataError),
    /// Fail write_entry only for this key.
    WriteKey(String, MetadataError),
    /// Fail delete_entry with the given error.
    DeleteEntry(MetadataError),
    /// Fail query_structured_objects with the given error.
    QueryObjects(MetadataError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq)]
pub enum MockOperation {
    ListEntries {
        owner_id: u64,
        namespace: String,
    },
    WriteEntry {
        owner_id: u64,
        key: String,
        value: String,
        value_type: String,
        entry_id: Option<String>,
    },
    DeleteEntry {
        owner_id: u64,
        entry_id: String,
    },
    QueryObjects {
        owner_id: u64,
    },
}

impl MockOperation {
    /// Whether this operation modifies stored state.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            MockOperation::WriteEntry { .. } | MockOperation::DeleteEntry { .. }
        )
    }
}

impl MockMetadataClient {
    /// Create an empty mock with a credential configured.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                entries: HashMap::new(),
                objects: None,
                next_id: 1,
                credential: true,
                fail_on: Vec::new(),
                operations: Vec::new(),
            })),
        }
    }

    /// Create a mock that reports no credential.
    pub fn without_credential() -> Self {
        let mock = Self::new();
        mock.inner.lock().unwrap().credential = false;
        mock
    }

    /// Seed an entry directly, without recording an operation.
    ///
    /// Returns the assigned entry id.
    pub fn seed_entry(
        &self,
        owner_id: u64,
        namespace: &str,
        key: &str,
        value: &str,
        value_type: &str,
    ) -> String {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id.to_string();
        inner.next_id += 1;
        inner.entries.entry(owner_id).or_default().push(MetadataEntry {
            id: id.clone(),
            key: key.to_string(),
            value: value.to_string(),
            namespace: namespace.to_string(),
            value_type: value_type.to_string(),
        });
        id
    }

    /// Enable structured objects and seed some for an owner.
    pub fn with_objects(self, owner_id: u64, objects: Vec<ObjectNode>) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner
                .objects
                .get_or_insert_with(HashMap::new)
                .insert(owner_id, objects);
        }
        self
    }

    /// Enable structured objects with no objects stored.
    pub fn with_object_support(self) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.objects.get_or_insert_with(HashMap::new);
        }
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use measurekeep::metadata::mock::{FailOn, MockMetadataClient};
    /// use measurekeep::metadata::MetadataError;
    ///
    /// let client = MockMetadataClient::new().fail_on(FailOn::ListEntries(
    ///     MetadataError::Upstream { status: 401, body: "denied".into() },
    /// ));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_on.push(fail_on);
        }
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.fail_on.clear();
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        let inner = self.inner.lock().unwrap();
        inner.operations.clone()
    }

    /// Number of calls made against the mock.
    pub fn call_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.operations.len()
    }

    /// Number of writes and deletes made against the mock.
    pub fn write_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.operations.iter().filter(|op| op.is_write()).count()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.clear();
    }

    /// All entries stored for an owner (for test verification).
    pub fn entries(&self, owner_id: u64) -> Vec<MetadataEntry> {
        let inner = self.inner.lock().unwrap();
        inner.entries.get(&owner_id).cloned().unwrap_or_default()
    }

    /// Stored entry by key (for test verification).
    pub fn entry_by_key(&self, owner_id: u64, key: &str) -> Option<MetadataEntry> {
        self.entries(owner_id).into_iter().find(|e| e.key == key)
    }

    fn record(&self, op: MockOperation) {
        let mut inner = self.inner.lock().unwrap();
        inner.operations.push(op);
    }

    /// Find an injected failure matching `pred`.
    fn check_fail(&self, pred: impl Fn(&FailOn) -> Option<&MetadataError>) -> Option<MetadataError> {
        let inner = self.inner.lock().unwrap();
        inner.fail_on.iter().find_map(|f| pred(f).cloned())
    }
}

impl Default for MockMetadataClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataClient for MockMetadataClient {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn credential_configured(&self) -> bool {
        self.inner.lock().unwrap().credential
    }

    async fn list_entries(
        &self,
        owner_id: u64,
        namespace: &str,
    ) -> Result<Vec<MetadataEntry>, MetadataError> {
        self.record(MockOperation::ListEntries {
            owner_id,
            namespace: namespace.to_string(),
        });

        if let Some(e) = self.check_fail(|f| match f {
            FailOn::ListEntries(e) => Some(e),
            _ => None,
        }) {
            return Err(e);
        }

        Ok(self
            .entries(owner_id)
            .into_iter()
            .filter(|e| e.namespace == namespace)
            .collect())
    }

    async fn write_entry(
        &self,
        owner_id: u64,
        write: EntryWrite,
    ) -> Result<MetadataEntry, MetadataError> {
        self.record(MockOperation::WriteEntry {
            owner_id,
            key: write.key.clone(),
            value: write.value.clone(),
            value_type: write.value_type.clone(),
            entry_id: write.entry_id.clone(),
        });

        if let Some(e) = self.check_fail(|f| match f {
            FailOn::WriteEntry(e) => Some(e),
            FailOn::WriteKey(key, e) if *key == write.key => Some(e),
            _ => None,
        }) {
            return Err(e);
        }

        let mut guard = self.inner.lock().unwrap();
        let inner = &mut *guard;
        let next_id = inner.next_id;
        let entries = inner.entries.entry(owner_id).or_default();

        let existing = match &write.entry_id {
            Some(id) => Some(entries.iter().position(|e| &e.id == id).ok_or_else(|| {
                MetadataError::Upstream {
                    status: 404,
                    body: "{\"errors\":\"Not Found\"}".to_string(),
                }
            })?),
            None => entries
                .iter()
                .position(|e| e.namespace == write.namespace && e.key == write.key),
        };

        let entry = match existing {
            Some(index) => {
                let entry = &mut entries[index];
                entry.value = write.value;
                entry.value_type = write.value_type;
                entry.clone()
            }
            None => {
                let entry = MetadataEntry {
                    id: next_id.to_string(),
                    key: write.key,
                    value: write.value,
                    namespace: write.namespace,
                    value_type: write.value_type,
                };
                entries.push(entry.clone());
                inner.next_id += 1;
                entry
            }
        };

        Ok(entry)
    }

    async fn delete_entry(&self, owner_id: u64, entry_id: &str) -> Result<(), MetadataError> {
        self.record(MockOperation::DeleteEntry {
            owner_id,
            entry_id: entry_id.to_string(),
        });

        if let Some(e) = self.check_fail(|f| match f {
            FailOn::DeleteEntry(e) => Some(e),
            _ => None,
        }) {
            return Err(e);
        }

        let mut inner = self.inner.lock().unwrap();
        let entries = inner.entries.entry(owner_id).or_default();
        let before = entries.len();
        entries.retain(|e| e.id != entry_id);
        if entries.len() == before {
            return Err(MetadataError::Upstream {
                status: 404,
                body: "{\"errors\":\"Not Found\"}".to_string(),
            });
        }
        Ok(())
    }

    async fn query_structured_objects(
        &self,
        filter: &ObjectFilter,
    ) -> Result<Vec<ObjectNode>, MetadataError> {
        self.record(MockOperation::QueryObjects {
            owner_id: filter.owner_id,
        });

        if let Some(e) = self.check_fail(|f| match f {
            FailOn::QueryObjects(e) => Some(e),
            _ => None,
        }) {
            return Err(e);
        }

        let inner = self.inner.lock().unwrap();
        match &inner.objects {
            None => Err(MetadataError::Unsupported(
                "mock has no structured objects".to_string(),
            )),
            Some(objects) => Ok(objects
                .get(&filter.owner_id)
                .map(|nodes| {
                    nodes
                        .iter()
                        .filter(|n| n.object_type == filter.object_type)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()),
        }
    }
}
