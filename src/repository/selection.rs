//! repository::selection
//!
//! Two-tier resolution of a customer's active record.
//!
//! # Tiers
//!
//! 1. [`StructuredObjectLookup`]: query structured measurement objects
//!    owned by the customer. Any failure here is logged and skipped.
//! 2. [`FlatEntryLookup`]: scan the flat entries and follow the pointer.
//!    Failures here are returned to the caller.
//!
//! The resolver tries strategies in order. The first one that returns a
//! report wins; a strategy that finds nothing hands over to the next. If
//! every strategy finds nothing, the customer has no measurements.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::codec::Listing;
use super::error::RepositoryError;
use crate::core::config::StorageLayout;
use crate::core::types::{
    CustomerId, SelectionItems, SelectionReport, Selected, MEASUREMENTS_NAMESPACE,
};
use crate::metadata::{MetadataClient, ObjectFilter};

/// Default structured object type.
pub const DEFAULT_OBJECT_TYPE: &str = "measurement";

/// What the resolver does when a strategy fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log and fall through to the next strategy
    Soft,
    /// Return the error to the caller
    Propagate,
}

/// One way of finding a customer's selection.
#[async_trait]
pub trait SelectionStrategy: Send + Sync {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    /// How failures of this strategy are treated.
    fn failure_policy(&self) -> FailurePolicy;

    /// Attempt resolution.
    ///
    /// `Ok(None)` means this strategy found nothing and the next one
    /// should be tried.
    async fn try_resolve(
        &self,
        client: &dyn MetadataClient,
        customer: CustomerId,
    ) -> Result<Option<SelectionReport>, RepositoryError>;
}

/// Structured-object tier.
#[derive(Debug, Clone)]
pub struct StructuredObjectLookup {
    object_type: String,
}

impl StructuredObjectLookup {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
        }
    }
}

impl Default for StructuredObjectLookup {
    fn default() -> Self {
        Self::new(DEFAULT_OBJECT_TYPE)
    }
}

#[async_trait]
impl SelectionStrategy for StructuredObjectLookup {
    fn name(&self) -> &'static str {
        "structured-objects"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Soft
    }

    async fn try_resolve(
        &self,
        client: &dyn MetadataClient,
        customer: CustomerId,
    ) -> Result<Option<SelectionReport>, RepositoryError> {
        let filter = ObjectFilter {
            object_type: self.object_type.clone(),
            owner_id: customer.get(),
        };
        let nodes = client.query_structured_objects(&filter).await?;

        let Some(first) = nodes.first() else {
            return Ok(None);
        };

        Ok(Some(SelectionReport {
            selected: Selected::Id(first.id.clone()),
            items: Some(SelectionItems::Objects(nodes)),
        }))
    }
}

/// Flat-entry tier.
#[derive(Debug, Clone)]
pub struct FlatEntryLookup {
    layout: StorageLayout,
    aggregate_key: String,
}

impl FlatEntryLookup {
    pub fn new(layout: StorageLayout, aggregate_key: impl Into<String>) -> Self {
        Self {
            layout,
            aggregate_key: aggregate_key.into(),
        }
    }
}

#[async_trait]
impl SelectionStrategy for FlatEntryLookup {
    fn name(&self) -> &'static str {
        "flat-entries"
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Propagate
    }

    async fn try_resolve(
        &self,
        client: &dyn MetadataClient,
        customer: CustomerId,
    ) -> Result<Option<SelectionReport>, RepositoryError> {
        let entries = client
            .list_entries(customer.get(), MEASUREMENTS_NAMESPACE)
            .await?;
        let listing = Listing::read(entries, self.layout, &self.aggregate_key);

        if listing.items.is_empty() {
            return Ok(None);
        }

        // A pointer naming a record that no longer exists still reports
        // that measurements are present.
        let selected = match listing.pointed_item() {
            Some(item) => Selected::Id(item.selection_id().to_string()),
            None => Selected::Present,
        };

        Ok(Some(SelectionReport {
            selected,
            items: Some(SelectionItems::Records(listing.items)),
        }))
    }
}

/// Ordered list of strategies.
pub struct SelectionResolver {
    strategies: Vec<Box<dyn SelectionStrategy>>,
}

impl SelectionResolver {
    pub fn new(strategies: Vec<Box<dyn SelectionStrategy>>) -> Self {
        Self { strategies }
    }

    /// The standard chain: structured objects (if enabled), then flat entries.
    pub fn standard(
        layout: StorageLayout,
        aggregate_key: &str,
        structured_lookup: bool,
        object_type: &str,
    ) -> Self {
        let mut strategies: Vec<Box<dyn SelectionStrategy>> = Vec::new();
        if structured_lookup {
            strategies.push(Box::new(StructuredObjectLookup::new(object_type)));
        }
        strategies.push(Box::new(FlatEntryLookup::new(layout, aggregate_key)));
        Self::new(strategies)
    }

    /// Names of the configured strategies, in order.
    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run the strategies in order.
    pub async fn resolve(
        &self,
        client: &dyn MetadataClient,
        customer: CustomerId,
    ) -> Result<SelectionReport, RepositoryError> {
        for strategy in &self.strategies {
            match strategy.try_resolve(client, customer).await {
                Ok(Some(report)) => {
                    debug!(strategy = strategy.name(), %customer, "selection resolved");
                    return Ok(report);
                }
                Ok(None) => {
                    debug!(strategy = strategy.name(), %customer, "nothing found, trying next");
                }
                Err(e) => match strategy.failure_policy() {
                    FailurePolicy::Soft => {
                        warn!(strategy = strategy.name(), %customer, error = %e, "lookup failed, falling back");
                    }
                    FailurePolicy::Propagate => return Err(e),
                },
            }
        }

        Ok(SelectionReport::nothing())
    }
}

impl std::fmt::Debug for SelectionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectionResolver")
            .field("strategies", &self.strategy_names())
            .finish()
    }
}
