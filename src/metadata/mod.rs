//! metadata
//!
//! Abstraction over the commerce platform's owner-scoped metadata.
//!
//! # Architecture
//!
//! The `MetadataClient` trait is the only way the repository reaches the
//! platform. Commands use [`create_client`] rather than importing a
//! concrete client.
//!
//! - Flat entries (list, write, delete) are required capabilities
//! - Structured-object queries are optional; clients may report `Unsupported`
//! - Credentials, retries and timeouts belong to the client, not its callers
//!
//! # Modules
//!
//! - `traits`: Core `MetadataClient` trait and request/response types
//! - [`shopify`]: Shopify Admin API implementation (REST + GraphQL)
//! - [`mock`]: In-memory implementation for deterministic testing
//! - `factory`: Client creation from configuration

mod factory;
pub mod mock;
pub mod shopify;
mod traits;

pub use factory::{client_settings, create_client, resolve_shop};
pub use shopify::RetryPolicy;
pub use traits::*;
