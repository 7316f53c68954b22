//! metadata::traits
//!
//! Metadata client trait definition.
//!
//! # Design
//!
//! The `MetadataClient` trait is async because every operation is a call to
//! the commerce platform. All methods return `Result` so callers decide
//! which failures are fatal. The repository treats flat entry calls as
//! required and the structured-object query as optional.
//!
//! # Example
//!
//! ```ignore
//! use measurekeep::metadata::{EntryWrite, MetadataClient, MetadataError};
//!
//! async fn remember(client: &dyn MetadataClient) -> Result<(), MetadataError> {
//!     let entry = client
//!         .write_entry(42, EntryWrite::create("measurements", "note", "hi", "single_line_text_field"))
//!         .await?;
//!     println!("stored as entry {}", entry.id);
//!     Ok(())
//! }
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from metadata operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MetadataError {
    /// No credential is configured for the platform.
    #[error("admin credential not configured")]
    CredentialUnconfigured,

    /// The platform answered with a non-success status.
    ///
    /// `body` is the response body exactly as received.
    #[error("upstream request failed with status {status}: {body}")]
    Upstream {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    Network(String),

    /// The request could not be built (e.g. a credential with invalid characters).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response could not be interpreted.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// The operation is not supported by this client or deployment.
    #[error("not supported: {0}")]
    Unsupported(String),
}

impl MetadataError {
    /// Whether a retry could plausibly succeed.
    ///
    /// Server errors and connection failures are transient; client errors
    /// (4xx) are not.
    pub fn is_transient(&self) -> bool {
        match self {
            MetadataError::Upstream { status, .. } => *status >= 500,
            MetadataError::Network(_) => true,
            _ => false,
        }
    }
}

/// A flat owner-scoped metadata entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Platform-assigned entry id
    pub id: String,
    /// Entry key, unique within its namespace
    pub key: String,
    /// Stored value as text
    pub value: String,
    /// Namespace
    pub namespace: String,
    /// Platform value type (e.g. "json", "single_line_text_field")
    #[serde(rename = "type", default)]
    pub value_type: String,
}

/// Request to create or update an entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryWrite {
    pub namespace: String,
    pub key: String,
    pub value: String,
    pub value_type: String,
    /// Existing entry to update; `None` creates a new entry
    pub entry_id: Option<String>,
}

impl EntryWrite {
    /// A write that creates a new entry.
    pub fn create(
        namespace: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
        value_type: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
            value: value.into(),
            value_type: value_type.into(),
            entry_id: None,
        }
    }

    /// Turn this into an update of `entry_id`.
    pub fn updating(mut self, entry_id: Option<String>) -> Self {
        self.entry_id = entry_id;
        self
    }
}

/// Filter for structured-object queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectFilter {
    /// Object type (e.g. "measurement")
    pub object_type: String,
    /// Owning customer
    pub owner_id: u64,
}

impl ObjectFilter {
    /// Platform search string for this filter.
    ///
    /// Only narrows by owner; the object type is a separate query argument.
    pub fn query_string(&self) -> String {
        format!("owner_id:{} owner_resource:customer", self.owner_id)
    }
}

/// A structured object returned by a query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectNode {
    pub id: String,
    #[serde(rename = "type")]
    pub object_type: String,
    /// Field key to value
    pub fields: BTreeMap<String, String>,
}

/// The metadata client trait.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a single client can serve
/// concurrent operations.
///
/// # Error Handling
///
/// - `Upstream` carries the platform's status and body unchanged
/// - `Network` covers failures with no HTTP response
/// - `Unsupported` is returned by clients lacking an optional capability
#[async_trait]
pub trait MetadataClient: Send + Sync {
    /// Client name for logs (e.g. "shopify", "mock").
    fn name(&self) -> &'static str;

    /// Whether a credential is available.
    ///
    /// Callers check this before issuing any request so a missing
    /// credential fails fast as a configuration error.
    fn credential_configured(&self) -> bool;

    /// List the owner's entries in a namespace.
    ///
    /// # Errors
    ///
    /// - `Upstream` on a non-success response
    async fn list_entries(
        &self,
        owner_id: u64,
        namespace: &str,
    ) -> Result<Vec<MetadataEntry>, MetadataError>;

    /// Create or update an entry.
    ///
    /// Creates when `write.entry_id` is `None`, updates otherwise.
    async fn write_entry(
        &self,
        owner_id: u64,
        write: EntryWrite,
    ) -> Result<MetadataEntry, MetadataError>;

    /// Delete an entry by its platform id.
    async fn delete_entry(&self, owner_id: u64, entry_id: &str) -> Result<(), MetadataError>;

    /// Query structured objects.
    ///
    /// Optional capability. The default implementation reports
    /// `Unsupported`.
    async fn query_structured_objects(
        &self,
        filter: &ObjectFilter,
    ) -> Result<Vec<ObjectNode>, MetadataError> {
        let _ = filter;
        Err(MetadataError::Unsupported(format!(
            "{} does not support structured objects",
            self.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(MetadataError::Upstream {
            status: 502,
            body: String::new()
        }
        .is_transient());
        assert!(MetadataError::Network("reset".into()).is_transient());

        assert!(!MetadataError::Upstream {
            status: 401,
            body: String::new()
        }
        .is_transient());
        assert!(!MetadataError::Upstream {
            status: 429,
            body: String::new()
        }
        .is_transient());
        assert!(!MetadataError::CredentialUnconfigured.is_transient());
    }

    #[test]
    fn error_display() {
        assert_eq!(
            MetadataError::Upstream {
                status: 401,
                body: "{\"errors\":\"bad token\"}".into()
            }
            .to_string(),
            "upstream request failed with status 401: {\"errors\":\"bad token\"}"
        );
        assert_eq!(
            MetadataError::Unsupported("x".into()).to_string(),
            "not supported: x"
        );
    }

    #[test]
    fn filter_query_string() {
        let filter = ObjectFilter {
            object_type: "measurement".into(),
            owner_id: 42,
        };
        assert_eq!(
            filter.query_string(),
            "owner_id:42 owner_resource:customer"
        );
    }

    #[test]
    fn entry_write_builders() {
        let write = EntryWrite::create("measurements", "saved", "[]", "json");
        assert!(write.entry_id.is_none());

        let update = write.updating(Some("77".into()));
        assert_eq!(update.entry_id.as_deref(), Some("77"));
    }

    #[test]
    fn object_node_serializes_type_field() {
        let node = ObjectNode {
            id: "gid://shopify/Metaobject/1".into(),
            object_type: "measurement".into(),
            fields: BTreeMap::from([("chest".to_string(), "39".to_string())]),
        };
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "measurement");
        assert_eq!(json["fields"]["chest"], "39");
    }
}
