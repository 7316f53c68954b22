//! repository::error
//!
//! Error types for repository operations.

use thiserror::Error;

use crate::core::types::TypeError;
use crate::metadata::MetadataError;

/// Errors from repository operations.
///
/// Stored values that fail to decode and failed pointer writes after a
/// save are not errors: the former surface as
/// [`ListedRecord::Undecoded`](crate::core::types::ListedRecord) and the
/// latter as [`AdvisoryOutcome::Failed`](super::AdvisoryOutcome).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RepositoryError {
    /// A required input was not supplied. Raised before any upstream call.
    #[error("missing {0}")]
    MissingParameter(&'static str),

    /// An input was supplied but malformed. Raised before any upstream call.
    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// No admin credential is available.
    #[error("admin credential not configured")]
    CredentialUnconfigured,

    /// A required platform call returned a non-success status.
    ///
    /// `body` is passed through unchanged.
    #[error("upstream request failed with status {status}: {body}")]
    UpstreamRequestFailed { status: u16, body: String },

    /// A platform call failed without an HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The aggregate entry holds something other than a record array.
    ///
    /// Writes refuse to proceed rather than overwrite it.
    #[error("aggregate entry '{key}' is not a valid record list: {reason}")]
    CorruptAggregate { key: String, reason: String },

    /// A record value could not be serialized.
    #[error("failed to encode record: {0}")]
    Encode(String),

    /// The named record does not exist.
    #[error("measurement record not found: {0}")]
    RecordNotFound(String),
}

impl RepositoryError {
    /// HTTP-equivalent status for this error.
    ///
    /// Upstream failures keep the platform's status.
    pub fn status(&self) -> u16 {
        match self {
            RepositoryError::MissingParameter(_) | RepositoryError::InvalidParameter { .. } => 400,
            RepositoryError::RecordNotFound(_) => 404,
            RepositoryError::UpstreamRequestFailed { status, .. } => *status,
            RepositoryError::Transport(_) => 502,
            RepositoryError::CredentialUnconfigured
            | RepositoryError::CorruptAggregate { .. }
            | RepositoryError::Encode(_) => 500,
        }
    }

    /// Whether the caller supplied bad input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RepositoryError::MissingParameter(_) | RepositoryError::InvalidParameter { .. }
        )
    }
}

impl From<MetadataError> for RepositoryError {
    fn from(e: MetadataError) -> Self {
        match e {
            MetadataError::Upstream { status, body } => {
                RepositoryError::UpstreamRequestFailed { status, body }
            }
            MetadataError::CredentialUnconfigured => RepositoryError::CredentialUnconfigured,
            other => RepositoryError::Transport(other.to_string()),
        }
    }
}

impl From<TypeError> for RepositoryError {
    fn from(e: TypeError) -> Self {
        match e {
            TypeError::Missing(name) => RepositoryError::MissingParameter(name),
            TypeError::Invalid { name, reason } => {
                RepositoryError::InvalidParameter { name, reason }
            }
        }
    }
}
