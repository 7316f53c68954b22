//! cli
//!
//! Command-line interface layer.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Install logging
//! - Build configuration, credential, client and repository once per run
//! - Delegate to command handlers and print their results
//!
//! The CLI holds no measurement logic; every record operation goes through
//! [`crate::repository::MeasurementRepository`].

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use anyhow::Result;

use crate::logging;
use crate::ui::output::Verbosity;

/// Settings every command handler receives.
#[derive(Debug, Clone)]
pub struct Context {
    /// Shop named by `--shop`, if any
    pub shop: Option<String>,
    pub verbosity: Verbosity,
    pub interactive: bool,
}

impl Context {
    pub fn quiet(&self) -> bool {
        self.verbosity == Verbosity::Quiet
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let verbosity = Verbosity::from_flags(cli.quiet, cli.debug);
    logging::init(verbosity);

    let ctx = Context {
        shop: cli.shop.clone(),
        verbosity,
        interactive: cli.interactive(),
    };

    commands::dispatch(cli.command, &ctx)
}
