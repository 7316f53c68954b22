//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--shop <domain>`: Shop to talk to (overrides config and `SHOP`)
//! - `--debug`: Enable debug logging
//! - `--interactive` / `--no-interactive`: Control prompts
//! - `--quiet` / `-q`: Minimal output

use std::io::IsTerminal;

use clap::{Args, Parser, Subcommand};

use crate::core::types::MeasurementValues;

/// mk - customer measurements stored as shop metafields
#[derive(Parser, Debug)]
#[command(name = "mk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Shop domain (e.g. my-store.myshopify.com)
    #[arg(long, global = true, value_name = "DOMAIN")]
    pub shop: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output; implies --no-interactive
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable interactive prompts
    #[arg(long = "interactive", global = true, conflicts_with = "no_interactive")]
    pub interactive_flag: bool,

    /// Disable interactive prompts
    #[arg(long, global = true)]
    pub no_interactive: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }

    /// Whether prompts may be shown.
    ///
    /// `--interactive` forces prompts on; `--no-interactive` and `--quiet`
    /// force them off. Otherwise prompts run when stdin is a terminal.
    pub fn interactive(&self) -> bool {
        if self.interactive_flag {
            true
        } else if self.no_interactive || self.quiet {
            false
        } else {
            std::io::stdin().is_terminal()
        }
    }
}

/// The customer a command operates on.
#[derive(Args, Debug, Clone)]
pub struct CustomerArg {
    /// Numeric customer id
    #[arg(long = "customer-id", value_name = "ID")]
    pub customer_id: Option<String>,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List a customer's measurement records
    #[command(
        name = "list",
        long_about = "List a customer's measurement records.\n\n\
            Prints every record in storage order as {\"data\": [...]}. Stored values \
            that are not valid records are listed as their raw entry so nothing is \
            hidden. The selection pointer is never listed.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Everything saved for a customer
    mk list --customer-id 7208720597214

    # Just the labels
    mk list --customer-id 7208720597214 | jq -r '.data[].label'"
    )]
    List {
        #[command(flatten)]
        customer: CustomerArg,
    },

    /// Save a measurement record
    #[command(
        name = "save",
        long_about = "Save a measurement record for a customer.\n\n\
            In the discrete layout every save creates a new record and makes it the \
            customer's selected record. In the aggregate layout, passing --id of an \
            existing record replaces it in place; otherwise a new record is appended.",
        after_help = "\
WORKFLOW EXAMPLES:
    # New record
    mk save --customer-id 7208720597214 --label 'Wedding suit' \\
        --values '{\"chest\": 40, \"inseam\": \"32in\"}'

    # Replace a record (aggregate layout)
    mk save --customer-id 7208720597214 --id 1760000000000 --label Me \\
        --values '{\"chest\": 41}'

VALUES:
    A JSON object whose values are numbers or strings."
    )]
    Save {
        #[command(flatten)]
        customer: CustomerArg,

        /// Record to replace (aggregate layout only)
        #[arg(long)]
        id: Option<String>,

        /// Human label for the record
        #[arg(long, default_value = "")]
        label: String,

        /// Measurements as a JSON object
        #[arg(long, value_parser = parse_values, value_name = "JSON")]
        values: MeasurementValues,
    },

    /// Delete a measurement record
    #[command(
        name = "delete",
        long_about = "Delete a measurement record by id.\n\n\
            Deleting a record that does not exist succeeds without changing anything.",
        after_help = "\
WORKFLOW EXAMPLES:
    mk delete --customer-id 7208720597214 --id measurement_1760000000000"
    )]
    Delete {
        #[command(flatten)]
        customer: CustomerArg,

        /// Record id
        #[arg(long, default_value = "")]
        id: String,
    },

    /// Show a customer's selected record
    #[command(
        name = "selected",
        long_about = "Show which measurement record is currently selected.\n\n\
            Structured measurement objects are consulted first. If there are none, \
            the flat entries are scanned and the selection pointer followed.\n\n\
            \"selected\" is a record id, true when records exist but none is known \
            to be active, or null when the customer has no measurements.",
        after_help = "\
WORKFLOW EXAMPLES:
    mk selected --customer-id 7208720597214
    mk selected --customer-id 7208720597214 --shop other-store.myshopify.com"
    )]
    Selected {
        #[command(flatten)]
        customer: CustomerArg,
    },

    /// Make a record the selected one
    #[command(
        name = "select",
        long_about = "Point the customer's selection at an existing record.\n\n\
            Fails if no record has the given id.",
        after_help = "\
WORKFLOW EXAMPLES:
    mk select --customer-id 7208720597214 --id measurement_1760000000000"
    )]
    Select {
        #[command(flatten)]
        customer: CustomerArg,

        /// Record id
        #[arg(long, default_value = "")]
        id: String,
    },

    /// Store or inspect the admin API token
    #[command(
        name = "auth",
        long_about = "Store the shop's Admin API access token.\n\n\
            The token is kept in the secret store (~/.measurekeep/secrets.toml by \
            default, mode 0600). The ADMIN_TOKEN environment variable, when set, \
            takes precedence over the stored token. The token is never printed.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Prompt for the token (input hidden)
    mk auth

    # Non-interactive
    mk auth --token shpat_xxxx

    # Where would the token come from?
    mk auth --status

    # Forget the stored token
    mk auth --logout"
    )]
    Auth {
        /// Token to store (prompted for when omitted)
        #[arg(long)]
        token: Option<String>,

        /// Show whether a token is configured
        #[arg(long, conflicts_with_all = ["token", "logout"])]
        status: bool,

        /// Remove the stored token
        #[arg(long, conflicts_with = "token")]
        logout: bool,
    },

    /// Get, set, or list configuration values
    #[command(
        name = "config",
        after_help = "\
WORKFLOW EXAMPLES:
    mk config set shop.domain my-store.myshopify.com
    mk config set storage.layout aggregate
    mk config get shop.api_version
    mk config list"
    )]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completion scripts
    #[command(
        name = "completion",
        long_about = "Generate shell completion scripts for tab-completion.\n\n\
            Outputs a completion script for the specified shell.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Bash (add to ~/.bashrc)
    mk completion bash >> ~/.bashrc

    # Fish
    mk completion fish > ~/.config/fish/completions/mk.fish"
    )]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Get a configuration value
    Get {
        /// Configuration key
        key: String,
    },
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Value to set
        value: String,
    },
    /// List all configuration values
    List,
}

/// Supported shells for completion
#[derive(clap::ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Parse `--values` as a JSON object of numbers and strings.
fn parse_values(raw: &str) -> Result<MeasurementValues, String> {
    serde_json::from_str(raw).map_err(|e| format!("expected a JSON object of numbers or strings: {}", e))
}
