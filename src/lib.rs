//! measurekeep - customer body measurements stored as shop metafields
//!
//! Keeps labelled sets of measurements per customer in the commerce
//! platform's owner-scoped metadata, tracks which set is currently
//! selected, and resolves that selection through structured objects first
//! and flat entries second.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface (`mk`)
//! - [`repository`] - Storage layouts, selection pointer, selection resolver
//! - [`metadata`] - Platform metadata client trait, Shopify client, mock
//! - [`core`] - Domain types and configuration
//! - [`secrets`] - Admin token storage and resolution
//! - [`ui`] - Terminal output and prompts
//! - [`logging`] - `tracing` subscriber setup
//!
//! # Invariants
//!
//! 1. Input validation and the credential check happen before any platform call
//! 2. Stored values that fail to decode are surfaced raw, never dropped
//! 3. The selection pointer is never listed as a record
//! 4. Upstream errors reach the caller with status and body unchanged

pub mod cli;
pub mod core;
pub mod logging;
pub mod metadata;
pub mod repository;
pub mod secrets;
pub mod ui;
