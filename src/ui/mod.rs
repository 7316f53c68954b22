//! ui
//!
//! User interaction utilities.
//!
//! # Modules
//!
//! - [`output`] - JSON results and stderr notices
//! - [`prompts`] - Masked input for credentials
//!
//! Prompts only run in interactive mode; otherwise callers must supply the
//! value by flag or fail with a clear message.

pub mod output;
pub mod prompts;
