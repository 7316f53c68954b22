//! cli::commands::auth
//!
//! Store, inspect or remove the Admin API token.
//!
//! The token value is never printed, not even partially.

use anyhow::{bail, Context as _, Result};

use crate::cli::Context;
use crate::core::config::Config;
use crate::secrets::{self, SecretStore, TokenSource, ADMIN_TOKEN_KEY};
use crate::ui::{output, prompts};

/// Run the auth command.
pub fn auth(ctx: &Context, token: Option<&str>, status: bool, logout: bool) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    let store = secrets::create_store(config.secrets_provider())
        .context("Failed to initialize secret store")?;

    if status {
        return show_status(ctx, store.as_ref());
    }
    if logout {
        store
            .delete(ADMIN_TOKEN_KEY)
            .context("Failed to remove stored token")?;
        output::print("Stored admin token removed.", ctx.verbosity);
        return Ok(());
    }

    let value = match token {
        Some(t) => t.trim().to_string(),
        None => prompts::password("Admin API access token", ctx.interactive)
            .context("Token required. Use --token <TOKEN> or run interactively")?,
    };
    validate_token(&value)?;

    store
        .set(ADMIN_TOKEN_KEY, &value)
        .context("Failed to store token")?;
    output::print("Admin token stored.", ctx.verbosity);
    Ok(())
}

fn show_status(ctx: &Context, store: &dyn SecretStore) -> Result<()> {
    let (_, source) = secrets::resolve_admin_token(store).context("Failed to read admin token")?;

    if ctx.quiet() {
        // Machine-readable
        let state = if source == TokenSource::None {
            "not_authenticated"
        } else {
            "authenticated"
        };
        println!("{}", state);
    } else if source == TokenSource::None {
        println!("Admin token: not configured.");
        println!("Run 'mk auth' or set {}.", secrets::ADMIN_TOKEN_ENV);
    } else {
        println!("Admin token: configured ({}).", source);
    }
    Ok(())
}

fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() {
        bail!("Token cannot be empty.");
    }
    if token.chars().any(char::is_whitespace) {
        bail!("Token cannot contain whitespace.");
    }
    Ok(())
}
