//! metadata::factory
//!
//! Client creation from resolved configuration.
//!
//! Commands call [`create_client`] instead of constructing a specific client
//! so that the repository only ever sees `dyn MetadataClient`.

use std::sync::Arc;

use super::shopify::{ClientSettings, ShopifyMetadataClient};
use super::traits::{MetadataClient, MetadataError};
use crate::core::config::{normalize_shop_domain, Config};

/// Resolve the shop to talk to: an explicit override wins over config.
///
/// Returns `None` when neither names a shop.
///
/// ```
/// use measurekeep::core::config::Config;
/// use measurekeep::metadata::resolve_shop;
///
/// let config = Config::default();
/// assert_eq!(resolve_shop(&config, Some("https://a.myshopify.com")).as_deref(), Some("a.myshopify.com"));
/// assert_eq!(resolve_shop(&config, Some("   ")), None);
/// assert_eq!(resolve_shop(&config, None), None);
/// ```
pub fn resolve_shop(config: &Config, shop_override: Option<&str>) -> Option<String> {
    shop_override
        .map(normalize_shop_domain)
        .filter(|s| !s.is_empty())
        .or_else(|| config.shop_domain())
}

/// Build the settings for one shop from configuration.
pub fn client_settings(config: &Config, shop: &str, credential: Option<String>) -> ClientSettings {
    ClientSettings {
        shop: shop.to_string(),
        api_version: config.api_version().to_string(),
        credential,
        retry: config.retry_policy(),
    }
}

/// Create the metadata client for `shop`.
///
/// # Errors
///
/// Returns `MetadataError::InvalidRequest` if `shop` is empty.
pub fn create_client(
    config: &Config,
    shop: &str,
    credential: Option<String>,
) -> Result<Arc<dyn MetadataClient>, MetadataError> {
    let client = ShopifyMetadataClient::new(client_settings(config, shop, credential))?;
    Ok(Arc::new(client))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{EnvOverrides, FileConfig};

    fn config_with_shop(domain: &str) -> Config {
        let env = EnvOverrides {
            shop: Some(domain.to_string()),
            api_version: Some("2024-07".to_string()),
        };
        Config::from_parts(FileConfig::default(), env).unwrap()
    }

    #[test]
    fn override_wins_over_config() {
        let config = config_with_shop("config.myshopify.com");
        assert_eq!(
            resolve_shop(&config, Some("flag.myshopify.com")).as_deref(),
            Some("flag.myshopify.com")
        );
        assert_eq!(
            resolve_shop(&config, None).as_deref(),
            Some("config.myshopify.com")
        );
    }

    #[test]
    fn settings_carry_config() {
        let config = config_with_shop("a.myshopify.com");
        let settings = client_settings(&config, "a.myshopify.com", Some("t".into()));
        assert_eq!(settings.api_version, "2024-07");
        assert_eq!(settings.credential.as_deref(), Some("t"));
    }

    #[test]
    fn create_client_without_credential() {
        let config = config_with_shop("a.myshopify.com");
        let client = create_client(&config, "a.myshopify.com", None).unwrap();
        assert_eq!(client.name(), "shopify");
        assert!(!client.credential_configured());
    }
}
