//! config command - Get, set, or list configuration values

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::config::{Config, FileConfig, KNOWN_KEYS};
use crate::ui::output;

/// Print the effective value of a key, if set.
pub fn get(_ctx: &Context, key: &str) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;
    if let Some(value) = effective_value(&config, key)? {
        println!("{}", value);
    }
    Ok(())
}

/// Set a key in the config file.
pub fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let path = Config::write_path()?;
    let mut file = if path.exists() {
        Config::read_file(&path)?
    } else {
        FileConfig::default()
    };

    file.set_key(key, value)?;
    Config::write_atomic(&path, &file).context("Failed to write config")?;

    let shown = file.get_key(key)?.unwrap_or_default();
    output::print(format!("Set {} = {}", key, shown), ctx.verbosity);
    Ok(())
}

/// List every known key with its effective value.
pub fn list(_ctx: &Context) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match config.loaded_from() {
        Some(path) => println!("# Configuration ({})", path.display()),
        None => println!("# Configuration (defaults)"),
    }
    for key in KNOWN_KEYS {
        let value = effective_value(&config, key)?.unwrap_or_else(|| "(not set)".to_string());
        println!("{} = {}", key, value);
    }
    Ok(())
}

/// Value after applying environment overrides and defaults.
///
/// `shop.domain` has no default; it is `None` when nothing sets it.
fn effective_value(config: &Config, key: &str) -> Result<Option<String>> {
    // Unknown keys fail here.
    let from_file = config.file.get_key(key)?;
    let value = match key {
        "shop.domain" => config.shop_domain(),
        "shop.api_version" => Some(config.api_version().to_string()),
        "storage.layout" => Some(config.layout().to_string()),
        "storage.aggregate_key" => Some(config.aggregate_key().to_string()),
        "storage.structured_lookup" => Some(config.structured_lookup().to_string()),
        "retry.max_attempts" => Some(config.retry_policy().max_attempts.to_string()),
        "retry.base_delay_ms" => Some(config.retry_policy().base_delay.as_millis().to_string()),
        "retry.timeout_secs" => Some(config.retry_policy().timeout.as_secs().to_string()),
        "secrets.provider" => Some(config.secrets_provider().to_string()),
        _ => from_file,
    };
    Ok(value)
}
