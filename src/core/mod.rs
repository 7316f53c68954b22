//! core
//!
//! Core domain types and configuration for measurekeep.
//!
//! # Modules
//!
//! - [`types`] - Strong types: CustomerId, MeasurementRecord, Selected, etc.
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Configuration is loaded once and passed down explicitly

pub mod config;
pub mod types;
