//! repository::codec
//!
//! Persisted representation of measurement records.
//!
//! # Formats
//!
//! Discrete layout: one entry per record, keyed `measurement_<millis>`,
//! type `json`, value `{"label": ..., "values": {...}}`.
//!
//! Aggregate layout: one entry (key configurable, type `json`) whose value
//! is an array of `{"id": ..., "label": ..., "values": {...}}`.
//!
//! Both layouts share the pointer entry [`SELECTED_KEY`], whose value is a
//! record id. The pointer is never listed as a record.

use serde::{Deserialize, Deserializer, Serialize};

use super::error::RepositoryError;
use crate::core::config::StorageLayout;
use crate::core::types::{
    ListedRecord, MeasurementRecord, MeasurementValues, UndecodedEntry, MEASUREMENTS_NAMESPACE,
    SELECTED_KEY,
};
use crate::metadata::MetadataEntry;

/// Platform type of record entries.
pub const RECORD_VALUE_TYPE: &str = "json";

/// Platform type of the pointer entry.
pub const POINTER_VALUE_TYPE: &str = "single_line_text_field";

#[derive(Debug, Serialize, Deserialize)]
struct StoredBody {
    #[serde(default)]
    label: String,
    values: MeasurementValues,
}

#[derive(Debug, Serialize, Deserialize)]
struct AggregateElement {
    #[serde(deserialize_with = "id_text")]
    id: String,
    #[serde(default)]
    label: String,
    values: MeasurementValues,
}

/// Accept ids written as JSON numbers as well as strings.
fn id_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRepr {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match IdRepr::deserialize(deserializer)? {
        IdRepr::Text(s) => s,
        IdRepr::Number(n) => n.to_string(),
    })
}

/// Encode a discrete-layout entry value.
pub fn encode_record_value(label: &str, values: &MeasurementValues) -> Result<String, RepositoryError> {
    serde_json::to_string(&StoredBody {
        label: label.to_string(),
        values: values.clone(),
    })
    .map_err(|e| RepositoryError::Encode(e.to_string()))
}

/// Decode a discrete-layout entry.
///
/// A value that is not a valid record body comes back as
/// [`ListedRecord::Undecoded`] carrying the raw string.
pub fn decode_entry(entry: &MetadataEntry) -> ListedRecord {
    match serde_json::from_str::<StoredBody>(&entry.value) {
        Ok(body) => ListedRecord::Record(MeasurementRecord {
            id: entry.key.clone(),
            label: body.label,
            values: body.values,
            namespace: entry.namespace.clone(),
            entry_id: Some(entry.id.clone()),
        }),
        Err(_) => ListedRecord::Undecoded(undecoded(entry)),
    }
}

/// Decode the aggregate entry's record array.
///
/// # Errors
///
/// Returns `RepositoryError::CorruptAggregate` if the value is not an
/// array of records.
pub fn decode_aggregate(entry: &MetadataEntry) -> Result<Vec<MeasurementRecord>, RepositoryError> {
    let elements: Vec<AggregateElement> =
        serde_json::from_str(&entry.value).map_err(|e| RepositoryError::CorruptAggregate {
            key: entry.key.clone(),
            reason: e.to_string(),
        })?;

    Ok(elements
        .into_iter()
        .map(|el| MeasurementRecord::new(el.id, el.label, el.values))
        .collect())
}

/// Encode the aggregate record array, preserving order.
pub fn encode_aggregate(records: &[MeasurementRecord]) -> Result<String, RepositoryError> {
    let elements: Vec<AggregateElement> = records
        .iter()
        .map(|r| AggregateElement {
            id: r.id.clone(),
            label: r.label.clone(),
            values: r.values.clone(),
        })
        .collect();
    serde_json::to_string(&elements).map_err(|e| RepositoryError::Encode(e.to_string()))
}

/// Record id named by a pointer entry value.
///
/// Plain text is used as-is. JSON strings and numbers are unwrapped, and a
/// JSON object contributes its `key` or `id` field. Blank pointers name
/// nothing.
///
/// ```
/// use measurekeep::repository::codec::pointer_target;
///
/// assert_eq!(pointer_target("measurement_1").as_deref(), Some("measurement_1"));
/// assert_eq!(pointer_target("\"measurement_1\"").as_deref(), Some("measurement_1"));
/// assert_eq!(pointer_target("{\"key\":\"measurement_1\"}").as_deref(), Some("measurement_1"));
/// assert_eq!(pointer_target("  "), None);
/// ```
pub fn pointer_target(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let target = match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(serde_json::Value::Number(n)) => n.to_string(),
        Ok(serde_json::Value::Object(map)) => {
            let field = map.get("key").or_else(|| map.get("id"));
            match field {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => return None,
            }
        }
        _ => trimmed.to_string(),
    };

    let target = target.trim().to_string();
    if target.is_empty() {
        None
    } else {
        Some(target)
    }
}

/// A customer's measurement entries, split by role.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// The selection pointer entry, if present
    pub pointer: Option<MetadataEntry>,
    /// The aggregate entry, if present (aggregate layout only)
    pub aggregate: Option<MetadataEntry>,
    /// Records in storage order
    pub items: Vec<ListedRecord>,
}

impl Listing {
    /// Split raw entries according to `layout`.
    ///
    /// Discrete: every non-pointer entry in the namespace is decoded as a
    /// record. Aggregate: only the entry at `aggregate_key` holds records;
    /// if it fails to decode, the listing carries it as a single undecoded
    /// item. Other keys are ignored.
    pub fn read(entries: Vec<MetadataEntry>, layout: StorageLayout, aggregate_key: &str) -> Self {
        let mut listing = Listing::default();

        for entry in entries {
            if entry.namespace != MEASUREMENTS_NAMESPACE {
                continue;
            }
            if entry.key == SELECTED_KEY {
                listing.pointer = Some(entry);
                continue;
            }
            match layout {
                StorageLayout::Discrete => listing.items.push(decode_entry(&entry)),
                StorageLayout::Aggregate if entry.key == aggregate_key => {
                    listing.items = match decode_aggregate(&entry) {
                        Ok(records) => records.into_iter().map(ListedRecord::Record).collect(),
                        Err(_) => vec![ListedRecord::Undecoded(undecoded(&entry))],
                    };
                    listing.aggregate = Some(entry);
                }
                StorageLayout::Aggregate => {}
            }
        }

        listing
    }

    /// Record id the pointer names, if any.
    pub fn pointer_target(&self) -> Option<String> {
        self.pointer.as_ref().and_then(|p| pointer_target(&p.value))
    }

    /// The item the pointer names, if it still exists.
    pub fn pointed_item(&self) -> Option<&ListedRecord> {
        let target = self.pointer_target()?;
        self.items.iter().find(|item| item.answers_to(&target))
    }

    /// Find an item by record id or platform entry id.
    pub fn find(&self, id: &str) -> Option<&ListedRecord> {
        self.items.iter().find(|item| item.answers_to(id))
    }
}

fn undecoded(entry: &MetadataEntry) -> UndecodedEntry {
    UndecodedEntry {
        id: entry.id.clone(),
        key: entry.key.clone(),
        namespace: entry.namespace.clone(),
        value: entry.value.clone(),
    }
}
