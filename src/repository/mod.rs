//! repository
//!
//! Customer measurement records stored as platform metadata.
//!
//! # Architecture
//!
//! [`MeasurementRepository`] owns the storage layout and talks to the
//! platform only through `dyn MetadataClient`.
//!
//! - **Discrete layout**: one entry per record, append-only. Saving also
//!   points the selection pointer at the new record.
//! - **Aggregate layout**: one entry holding every record. Saves and
//!   deletes read the whole array, change it, and write it back.
//!
//! # Validation
//!
//! Every operation validates its inputs and checks that a credential is
//! configured before the first platform call. A request with a missing
//! customer id makes no upstream calls at all.
//!
//! # Concurrency
//!
//! Aggregate writes are read-modify-write without a version check. Two
//! concurrent saves for the same customer can each read the same array and
//! the later write wins, losing the earlier record. Callers that need
//! stronger guarantees must serialize writes per customer.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use measurekeep::core::types::{RecordDraft, MeasurementValue};
//! use measurekeep::metadata::mock::MockMetadataClient;
//! use measurekeep::repository::{MeasurementRepository, RepositoryOptions};
//!
//! # tokio_test::block_on(async {
//! let client = Arc::new(MockMetadataClient::new());
//! let repo = MeasurementRepository::new(client.clone(), RepositoryOptions::default());
//!
//! let mut draft = RecordDraft::default();
//! draft.label = "Me".into();
//! draft.values.insert("chest".into(), MeasurementValue::from(40));
//!
//! let saved = repo.save("42", draft).await.unwrap();
//! let listed = repo.list("42").await.unwrap();
//! assert_eq!(listed.len(), 1);
//! assert_eq!(listed[0].selection_id(), saved.record.id);
//! # });
//! ```

pub mod codec;
mod error;
pub mod ids;
pub mod selection;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::core::config::{Config, StorageLayout, DEFAULT_AGGREGATE_KEY};
use crate::core::types::{
    CustomerId, ListedRecord, MeasurementRecord, RecordDraft, SelectionReport,
    MEASUREMENTS_NAMESPACE, SELECTED_KEY,
};
use crate::metadata::{EntryWrite, MetadataClient, MetadataEntry, MetadataError};

use codec::{Listing, POINTER_VALUE_TYPE, RECORD_VALUE_TYPE};
use ids::{ClockIds, IdGenerator};
use selection::{SelectionResolver, DEFAULT_OBJECT_TYPE};

pub use error::RepositoryError;

/// Repository settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RepositoryOptions {
    /// Storage layout for records
    pub layout: StorageLayout,
    /// Key of the aggregate entry
    pub aggregate_key: String,
    /// Whether selection tries structured objects first
    pub structured_lookup: bool,
    /// Structured object type to query
    pub object_type: String,
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        Self {
            layout: StorageLayout::default(),
            aggregate_key: DEFAULT_AGGREGATE_KEY.to_string(),
            structured_lookup: true,
            object_type: DEFAULT_OBJECT_TYPE.to_string(),
        }
    }
}

impl RepositoryOptions {
    /// Options from resolved configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            layout: config.layout(),
            aggregate_key: config.aggregate_key().to_string(),
            structured_lookup: config.structured_lookup(),
            object_type: DEFAULT_OBJECT_TYPE.to_string(),
        }
    }

    /// Same options with a different layout.
    pub fn with_layout(mut self, layout: StorageLayout) -> Self {
        self.layout = layout;
        self
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveOutcome {
    /// The record as stored
    pub record: MeasurementRecord,
    /// The platform entry written
    pub metafield: MetadataEntry,
}

/// Result of the best-effort pointer write after a discrete save.
///
/// Never affects the save's own result.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvisoryOutcome {
    Written(MetadataEntry),
    Failed(MetadataError),
}

/// Measurement records for customers of one shop.
pub struct MeasurementRepository {
    client: Arc<dyn MetadataClient>,
    options: RepositoryOptions,
    ids: Arc<dyn IdGenerator>,
    resolver: SelectionResolver,
}

impl MeasurementRepository {
    /// Create a repository using wall-clock ids and the standard resolver.
    pub fn new(client: Arc<dyn MetadataClient>, options: RepositoryOptions) -> Self {
        let resolver = SelectionResolver::standard(
            options.layout,
            &options.aggregate_key,
            options.structured_lookup,
            &options.object_type,
        );
        Self {
            client,
            options,
            ids: Arc::new(ClockIds),
            resolver,
        }
    }

    /// Replace the id generator.
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn options(&self) -> &RepositoryOptions {
        &self.options
    }

    /// List a customer's records in storage order.
    ///
    /// Entries that fail to decode are listed as their raw value. The
    /// pointer entry is never listed.
    ///
    /// # Errors
    ///
    /// - `MissingParameter` / `InvalidParameter` for a bad customer id
    /// - `CredentialUnconfigured` if no token is available
    /// - `UpstreamRequestFailed` / `Transport` if the platform call fails
    pub async fn list(&self, customer_id: &str) -> Result<Vec<ListedRecord>, RepositoryError> {
        let customer = self.ready(customer_id)?;
        let listing = self.read_listing(customer).await?;
        debug!(%customer, count = listing.items.len(), "listed measurements");
        Ok(listing.items)
    }

    /// Save a record.
    ///
    /// Discrete layout: always creates a new entry, then points the
    /// selection at it (best effort). A draft id is ignored.
    ///
    /// Aggregate layout: a draft id naming an existing record replaces it
    /// in place; otherwise the record is appended under a new id.
    ///
    /// # Errors
    ///
    /// As [`list`](Self::list), plus `CorruptAggregate` if the aggregate
    /// entry cannot be decoded (nothing is written).
    pub async fn save(
        &self,
        customer_id: &str,
        draft: RecordDraft,
    ) -> Result<SaveOutcome, RepositoryError> {
        let customer = self.ready(customer_id)?;
        match self.options.layout {
            StorageLayout::Discrete => self.save_discrete(customer, draft).await,
            StorageLayout::Aggregate => self.save_aggregate(customer, draft).await,
        }
    }

    /// Delete a record by id.
    ///
    /// Returns whether a record was removed. Deleting an id that does not
    /// exist succeeds without writing anything.
    ///
    /// # Errors
    ///
    /// As [`save`](Self::save), plus `MissingParameter("id")` for a blank id.
    pub async fn delete(&self, customer_id: &str, id: &str) -> Result<bool, RepositoryError> {
        let customer = CustomerId::parse(customer_id)?;
        let id = required("id", id)?;
        self.check_credential()?;

        let listing = self.read_listing(customer).await?;
        match self.options.layout {
            StorageLayout::Discrete => self.delete_discrete(customer, &listing, id).await,
            StorageLayout::Aggregate => self.delete_aggregate(customer, listing, id).await,
        }
    }

    /// Point the selection at an existing record.
    ///
    /// Returns the selected record id.
    ///
    /// # Errors
    ///
    /// As [`list`](Self::list), plus `RecordNotFound` if no record answers
    /// to `id`.
    pub async fn select(&self, customer_id: &str, id: &str) -> Result<String, RepositoryError> {
        let customer = CustomerId::parse(customer_id)?;
        let id = required("id", id)?;
        self.check_credential()?;

        let listing = self.read_listing(customer).await?;
        let target = listing
            .find(id)
            .map(|item| item.selection_id().to_string())
            .ok_or_else(|| RepositoryError::RecordNotFound(id.to_string()))?;

        let existing = listing.pointer.as_ref().map(|p| p.id.clone());
        self.write_pointer(customer, &target, existing).await?;
        info!(%customer, selected = %target, "selection updated");
        Ok(target)
    }

    /// Resolve the customer's active record.
    ///
    /// # Errors
    ///
    /// Validation errors as [`list`](Self::list). Flat-entry failures are
    /// returned; structured-object failures fall back silently.
    pub async fn get_selected(&self, customer_id: &str) -> Result<SelectionReport, RepositoryError> {
        let customer = self.ready(customer_id)?;
        self.resolver.resolve(self.client.as_ref(), customer).await
    }

    /// Write the pointer entry naming `record_id`.
    ///
    /// `existing` is the pointer's current entry id, if known.
    pub async fn write_pointer(
        &self,
        customer: CustomerId,
        record_id: &str,
        existing: Option<String>,
    ) -> Result<MetadataEntry, MetadataError> {
        let write = EntryWrite::create(
            MEASUREMENTS_NAMESPACE,
            SELECTED_KEY,
            record_id,
            POINTER_VALUE_TYPE,
        )
        .updating(existing);
        self.client.write_entry(customer.get(), write).await
    }

    /// Best-effort pointer write; failures are logged, never returned.
    pub async fn advise_pointer(&self, customer: CustomerId, record_id: &str) -> AdvisoryOutcome {
        match self.write_pointer(customer, record_id, None).await {
            Ok(entry) => {
                debug!(%customer, selected = record_id, "pointer updated");
                AdvisoryOutcome::Written(entry)
            }
            Err(e) => {
                warn!(%customer, selected = record_id, error = %e, "failed to update selection pointer");
                AdvisoryOutcome::Failed(e)
            }
        }
    }

    fn ready(&self, customer_id: &str) -> Result<CustomerId, RepositoryError> {
        let customer = CustomerId::parse(customer_id)?;
        self.check_credential()?;
        Ok(customer)
    }

    fn check_credential(&self) -> Result<(), RepositoryError> {
        if self.client.credential_configured() {
            Ok(())
        } else {
            Err(RepositoryError::CredentialUnconfigured)
        }
    }

    async fn read_listing(&self, customer: CustomerId) -> Result<Listing, RepositoryError> {
        let entries = self
            .client
            .list_entries(customer.get(), MEASUREMENTS_NAMESPACE)
            .await?;
        Ok(Listing::read(
            entries,
            self.options.layout,
            &self.options.aggregate_key,
        ))
    }

    async fn save_discrete(
        &self,
        customer: CustomerId,
        draft: RecordDraft,
    ) -> Result<SaveOutcome, RepositoryError> {
        if let Some(id) = &draft.id {
            debug!(%customer, id = %id, "discrete layout ignores draft id");
        }

        let key = ids::discrete_key(self.ids.next_token());
        let value = codec::encode_record_value(&draft.label, &draft.values)?;
        let write = EntryWrite::create(MEASUREMENTS_NAMESPACE, &key, value, RECORD_VALUE_TYPE);
        let entry = self.client.write_entry(customer.get(), write).await?;

        let record = MeasurementRecord {
            id: key.clone(),
            label: draft.label,
            values: draft.values,
            namespace: entry.namespace.clone(),
            entry_id: Some(entry.id.clone()),
        };
        info!(%customer, id = %key, "measurement saved");

        self.advise_pointer(customer, &key).await;

        Ok(SaveOutcome {
            record,
            metafield: entry,
        })
    }

    async fn save_aggregate(
        &self,
        customer: CustomerId,
        draft: RecordDraft,
    ) -> Result<SaveOutcome, RepositoryError> {
        let listing = self.read_listing(customer).await?;
        let mut records = self.aggregate_records(&listing)?;

        let position = draft
            .id
            .as_deref()
            .and_then(|id| records.iter().position(|r| r.id == id));

        let record = match position {
            Some(index) => {
                let existing = &mut records[index];
                existing.label = draft.label;
                existing.values = draft.values;
                existing.clone()
            }
            None => {
                let id = ids::unique_aggregate_id(self.ids.next_token(), &records);
                let record = MeasurementRecord::new(id, draft.label, draft.values);
                records.push(record.clone());
                record
            }
        };

        let entry = self.write_aggregate(customer, &listing, &records).await?;
        info!(%customer, id = %record.id, replaced = position.is_some(), "measurement saved");

        Ok(SaveOutcome {
            record,
            metafield: entry,
        })
    }

    async fn delete_discrete(
        &self,
        customer: CustomerId,
        listing: &Listing,
        id: &str,
    ) -> Result<bool, RepositoryError> {
        let entry_id = match listing.find(id) {
            Some(ListedRecord::Record(r)) => r.entry_id.clone(),
            Some(ListedRecord::Undecoded(u)) => Some(u.id.clone()),
            None => None,
        };

        let Some(entry_id) = entry_id else {
            debug!(%customer, id, "nothing to delete");
            return Ok(false);
        };

        self.client.delete_entry(customer.get(), &entry_id).await?;
        info!(%customer, id, "measurement deleted");
        Ok(true)
    }

    async fn delete_aggregate(
        &self,
        customer: CustomerId,
        listing: Listing,
        id: &str,
    ) -> Result<bool, RepositoryError> {
        if listing.aggregate.is_none() {
            debug!(%customer, id, "no aggregate entry, nothing to delete");
            return Ok(false);
        }

        let mut records = self.aggregate_records(&listing)?;
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() == before {
            debug!(%customer, id, "nothing to delete");
            return Ok(false);
        }

        self.write_aggregate(customer, &listing, &records).await?;
        info!(%customer, id, "measurement deleted");
        Ok(true)
    }

    /// Decoded aggregate records; empty when there is no aggregate entry.
    fn aggregate_records(&self, listing: &Listing) -> Result<Vec<MeasurementRecord>, RepositoryError> {
        match &listing.aggregate {
            Some(entry) => codec::decode_aggregate(entry),
            None => Ok(Vec::new()),
        }
    }

    async fn write_aggregate(
        &self,
        customer: CustomerId,
        listing: &Listing,
        records: &[MeasurementRecord],
    ) -> Result<MetadataEntry, RepositoryError> {
        let value = codec::encode_aggregate(records)?;
        let write = EntryWrite::create(
            MEASUREMENTS_NAMESPACE,
            &self.options.aggregate_key,
            value,
            RECORD_VALUE_TYPE,
        )
        .updating(listing.aggregate.as_ref().map(|e| e.id.clone()));
        Ok(self.client.write_entry(customer.get(), write).await?)
    }
}

impl std::fmt::Debug for MeasurementRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeasurementRepository")
            .field("client", &self.client.name())
            .field("options", &self.options)
            .field("resolver", &self.resolver)
            .finish()
    }
}

fn required<'a>(name: &'static str, value: &'a str) -> Result<&'a str, RepositoryError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(RepositoryError::MissingParameter(name))
    } else {
        Ok(trimmed)
    }
}
