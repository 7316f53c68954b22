//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`CustomerId`] - Validated numeric owner id
//! - [`MeasurementValue`] - A single measurement (number or text)
//! - [`MeasurementRecord`] - A labelled set of measurements
//! - [`RecordDraft`] - Caller input for a save
//! - [`ListedRecord`] - A record as listed, or the raw stored string
//! - [`Selected`] - Result of selection resolution
//!
//! # Validation
//!
//! These types enforce validity at construction time. A customer id that
//! is not a positive integer cannot be represented, so an invalid owner id
//! can never reach the metadata API.
//!
//! # Examples
//!
//! ```
//! use measurekeep::core::types::{CustomerId, TypeError};
//!
//! let id = CustomerId::parse("42").unwrap();
//! assert_eq!(id.get(), 42);
//!
//! assert_eq!(CustomerId::parse("  "), Err(TypeError::Missing("customer_id")));
//! assert!(CustomerId::parse("abc").is_err());
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::metadata::ObjectNode;

/// Namespace every measurement entry lives in.
pub const MEASUREMENTS_NAMESPACE: &str = "measurements";

/// Reserved key of the selection pointer entry.
pub const SELECTED_KEY: &str = "selected";

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// A validated customer (owner) id.
///
/// The platform addresses customers by a positive integer. Input is
/// trimmed before parsing; empty input reports a missing parameter rather
/// than a malformed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CustomerId(u64);

impl CustomerId {
    /// Parse a customer id from user input.
    ///
    /// # Errors
    ///
    /// - `TypeError::Missing` if the input is empty or whitespace
    /// - `TypeError::Invalid` if it is not a positive integer
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TypeError::Missing("customer_id"));
        }
        match trimmed.parse::<u64>() {
            Ok(0) => Err(TypeError::Invalid {
                name: "customer_id",
                reason: "must be a positive integer".into(),
            }),
            Ok(id) => Ok(Self(id)),
            Err(_) => Err(TypeError::Invalid {
                name: "customer_id",
                reason: format!("'{}' is not a number", trimmed),
            }),
        }
    }

    /// Parse an optional customer id, treating `None` as missing.
    pub fn from_option(raw: Option<&str>) -> Result<Self, TypeError> {
        Self::parse(raw.unwrap_or_default())
    }

    /// The numeric owner id.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CustomerId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<CustomerId> for String {
    fn from(id: CustomerId) -> Self {
        id.0.to_string()
    }
}

/// A single measurement value.
///
/// Only numbers and strings are accepted. Numbers keep their original
/// representation (`39` stays `39`, not `39.0`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Number(serde_json::Number),
    Text(String),
}

impl From<i64> for MeasurementValue {
    fn from(n: i64) -> Self {
        MeasurementValue::Number(n.into())
    }
}

impl From<&str> for MeasurementValue {
    fn from(s: &str) -> Self {
        MeasurementValue::Text(s.to_string())
    }
}

/// Measurement name to value.
pub type MeasurementValues = BTreeMap<String, MeasurementValue>;

/// A customer's labelled set of measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    /// Record id, unique within the customer's record set
    pub id: String,
    /// Human label ("Me", "Wedding suit")
    #[serde(default)]
    pub label: String,
    /// Measurement values by name
    #[serde(default)]
    pub values: MeasurementValues,
    /// Always [`MEASUREMENTS_NAMESPACE`]
    pub namespace: String,
    /// Platform id of the backing entry (discrete layout only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_id: Option<String>,
}

impl MeasurementRecord {
    /// Build a record in the measurements namespace.
    pub fn new(id: impl Into<String>, label: impl Into<String>, values: MeasurementValues) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            values,
            namespace: MEASUREMENTS_NAMESPACE.to_string(),
            entry_id: None,
        }
    }

    /// Whether a pointer value names this record, by id or by platform id.
    pub fn answers_to(&self, pointer: &str) -> bool {
        self.id == pointer || self.entry_id.as_deref() == Some(pointer)
    }
}

/// Caller input for `save`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordDraft {
    /// Existing record to replace (aggregate layout only)
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: String,
    pub values: MeasurementValues,
}

/// A stored entry whose value could not be decoded as a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UndecodedEntry {
    pub id: String,
    pub key: String,
    pub namespace: String,
    /// The stored value exactly as the platform returned it
    pub value: String,
}

/// One item of a listing.
///
/// Stored values that are not valid records are surfaced as their raw
/// string instead of failing the whole listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ListedRecord {
    Record(MeasurementRecord),
    Undecoded(UndecodedEntry),
}

impl ListedRecord {
    /// The decoded record, if any.
    pub fn as_record(&self) -> Option<&MeasurementRecord> {
        match self {
            ListedRecord::Record(r) => Some(r),
            ListedRecord::Undecoded(_) => None,
        }
    }

    /// Whether a pointer value names this item.
    pub fn answers_to(&self, pointer: &str) -> bool {
        match self {
            ListedRecord::Record(r) => r.answers_to(pointer),
            ListedRecord::Undecoded(u) => u.key == pointer || u.id == pointer,
        }
    }

    /// Id reported as `selected` when this item is the pointer target.
    pub fn selection_id(&self) -> &str {
        match self {
            ListedRecord::Record(r) => &r.id,
            ListedRecord::Undecoded(u) => &u.key,
        }
    }
}

/// Which record is currently selected.
///
/// Serializes as the id string, `true`, or `null`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selected {
    /// A specific record is active
    Id(String),
    /// Measurements exist but no specific record is known to be active.
    ///
    /// Kept for compatibility with existing storefront scripts that read
    /// `selected: true` as "has measurements".
    Present,
    /// No measurements exist
    Nothing,
}

impl Serialize for Selected {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Selected::Id(id) => serializer.serialize_str(id),
            Selected::Present => serializer.serialize_bool(true),
            Selected::Nothing => serializer.serialize_none(),
        }
    }
}

/// Items returned alongside a selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SelectionItems {
    /// Structured objects from the object query
    Objects(Vec<ObjectNode>),
    /// Records from the flat entry scan
    Records(Vec<ListedRecord>),
}

/// Outcome of selection resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectionReport {
    pub selected: Selected,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<SelectionItems>,
}

impl SelectionReport {
    /// The report for a customer without measurements.
    pub fn nothing() -> Self {
        Self {
            selected: Selected::Nothing,
            items: None,
        }
    }
}
