//! repository::ids
//!
//! Time-based record id generation.
//!
//! Ids are millisecond timestamps. Two records created in the same
//! millisecond would collide; the aggregate layout guards against that by
//! bumping the token past ids already in the list it just read. The
//! discrete layout has no such guard (it never reads before writing), so
//! two saves for the same customer within one millisecond can produce the
//! same key and the platform will keep only one of them.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use crate::core::types::MeasurementRecord;

/// Prefix of discrete-layout entry keys.
pub const DISCRETE_KEY_PREFIX: &str = "measurement_";

/// Source of time-based tokens.
pub trait IdGenerator: Send + Sync {
    /// Next token, in milliseconds since the Unix epoch.
    fn next_token(&self) -> i64;
}

/// Wall-clock tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClockIds;

impl IdGenerator for ClockIds {
    fn next_token(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Deterministic increasing tokens, for tests.
#[derive(Debug)]
pub struct SequenceIds {
    next: AtomicI64,
}

impl SequenceIds {
    /// Start the sequence at `start`.
    pub fn starting_at(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }
}

impl IdGenerator for SequenceIds {
    fn next_token(&self) -> i64 {
        self.next.fetch_add(1, Ordering::SeqCst)
    }
}

/// Entry key for a discrete-layout record.
///
/// ```
/// use measurekeep::repository::ids::discrete_key;
///
/// assert_eq!(discrete_key(1700000000000), "measurement_1700000000000");
/// ```
pub fn discrete_key(token: i64) -> String {
    format!("{}{}", DISCRETE_KEY_PREFIX, token)
}

/// Aggregate-layout id for `token`, bumped past any id already in `existing`.
pub fn unique_aggregate_id(token: i64, existing: &[MeasurementRecord]) -> String {
    let mut candidate = token;
    while existing.iter().any(|r| r.id == candidate.to_string()) {
        candidate += 1;
    }
    candidate.to_string()
}
