//! metadata::shopify
//!
//! Metadata client for the Shopify Admin API.
//!
//! # Design
//!
//! Flat entries are customer metafields, read and written through the REST
//! API. Structured objects are metaobjects, queried through GraphQL.
//!
//! # Authentication
//!
//! Every request carries `X-Shopify-Access-Token`. A client built without
//! a credential refuses to send anything and reports
//! `MetadataError::CredentialUnconfigured`.
//!
//! # Retries
//!
//! Server errors (5xx) and connection failures are retried with
//! exponential backoff, up to [`RetryPolicy::max_attempts`] attempts in
//! total. Client errors (4xx) are returned immediately. Each attempt is
//! bounded by [`RetryPolicy::timeout`].
//!
//! # Example
//!
//! ```ignore
//! use measurekeep::metadata::shopify::{ClientSettings, ShopifyMetadataClient};
//! use measurekeep::metadata::MetadataClient;
//!
//! let client = ShopifyMetadataClient::new(ClientSettings {
//!     shop: "example.myshopify.com".into(),
//!     api_version: "2025-10".into(),
//!     credential: Some(token),
//!     retry: Default::default(),
//! })?;
//!
//! let entries = client.list_entries(42, "measurements").await?;
//! ```

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, LINK};
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::traits::{
    EntryWrite, MetadataClient, MetadataEntry, MetadataError, ObjectFilter, ObjectNode,
};

/// Header carrying the admin access token.
const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Owner resource for every entry this crate writes.
const OWNER_RESOURCE: &str = "customer";

/// Largest page the REST listing endpoints serve.
const PAGE_LIMIT: &str = "250";

/// Retry and timeout policy for platform requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay before the first retry; doubled for each further retry
    pub base_delay: Duration,
    /// Per-attempt timeout
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(retry.saturating_sub(1)))
    }
}

/// Everything needed to talk to one shop.
#[derive(Clone)]
pub struct ClientSettings {
    /// Shop domain without scheme (e.g. "example.myshopify.com")
    pub shop: String,
    /// Admin API version (e.g. "2025-10")
    pub api_version: String,
    /// Admin access token
    pub credential: Option<String>,
    /// Transport retry policy
    pub retry: RetryPolicy,
}

// Custom Debug to avoid exposing the credential
impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field("shop", &self.shop)
            .field("api_version", &self.api_version)
            .field("has_credential", &self.credential.is_some())
            .field("retry", &self.retry)
            .finish()
    }
}

/// Shopify Admin API metadata client.
pub struct ShopifyMetadataClient {
    /// HTTP client for making requests
    client: Client,
    /// Admin access token
    credential: Option<String>,
    /// `{scheme}://{shop}/admin/api/{version}`
    api_base: String,
    /// Transport retry policy
    retry: RetryPolicy,
}

// Custom Debug to avoid exposing the credential
impl std::fmt::Debug for ShopifyMetadataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopifyMetadataClient")
            .field("has_credential", &self.credential.is_some())
            .field("api_base", &self.api_base)
            .field("retry", &self.retry)
            .finish()
    }
}

impl ShopifyMetadataClient {
    /// Create a client for the shop in `settings`.
    ///
    /// # Errors
    ///
    /// Returns `MetadataError::InvalidRequest` if the shop domain is empty.
    pub fn new(settings: ClientSettings) -> Result<Self, MetadataError> {
        if settings.shop.trim().is_empty() {
            return Err(MetadataError::InvalidRequest("missing shop".into()));
        }
        let origin = format!("https://{}", settings.shop);
        Ok(Self::with_origin(settings, &origin))
    }

    /// Create a client against an explicit origin (scheme + host).
    ///
    /// Used to point the client at a local test server.
    pub fn with_origin(settings: ClientSettings, origin: &str) -> Self {
        Self {
            client: Client::new(),
            credential: settings.credential,
            api_base: format!(
                "{}/admin/api/{}",
                origin.trim_end_matches('/'),
                settings.api_version
            ),
            retry: settings.retry,
        }
    }

    /// Base URL of the versioned admin API.
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, MetadataError> {
        let token = self
            .credential
            .as_deref()
            .ok_or(MetadataError::CredentialUnconfigured)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCESS_TOKEN_HEADER,
            HeaderValue::from_str(token).map_err(|_| {
                MetadataError::InvalidRequest("credential contains invalid characters".into())
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    /// Send a request built by `build`, retrying transient failures.
    ///
    /// Returns the reply to the first successful attempt.
    async fn send<F>(&self, what: &str, build: F) -> Result<Reply, MetadataError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let headers = self.headers()?;
        let mut attempt = 1;
        loop {
            let request = build(&self.client)
                .headers(headers.clone())
                .timeout(self.retry.timeout);
            let result = Self::send_once(request).await;

            match result {
                Err(ref e) if e.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        operation = what,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient metadata failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => {
                    if let Err(ref e) = other {
                        debug!(operation = what, attempt, error = %e, "metadata request failed");
                    }
                    return other;
                }
            }
        }
    }

    async fn send_once(request: RequestBuilder) -> Result<Reply, MetadataError> {
        let response = request
            .send()
            .await
            .map_err(|e| MetadataError::Network(e.to_string()))?;
        let status = response.status();
        let link = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .text()
            .await
            .map_err(|e| MetadataError::Network(e.to_string()))?;

        if status.is_success() {
            Ok(Reply { body, link })
        } else {
            Err(MetadataError::Upstream {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn parse<T: for<'de> Deserialize<'de>>(body: &str) -> Result<T, MetadataError> {
        serde_json::from_str(body)
            .map_err(|e| MetadataError::InvalidResponse(format!("failed to parse response: {}", e)))
    }
}

#[async_trait]
impl MetadataClient for ShopifyMetadataClient {
    fn name(&self) -> &'static str {
        "shopify"
    }

    fn credential_configured(&self) -> bool {
        self.credential.is_some()
    }

    async fn list_entries(
        &self,
        owner_id: u64,
        namespace: &str,
    ) -> Result<Vec<MetadataEntry>, MetadataError> {
        let url = self.url("metafields.json");
        let owner = owner_id.to_string();
        debug!(owner_id, namespace, "listing metafields");

        let mut entries = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let reply = self
                .send("list_entries", |client| {
                    let request = client.get(&url);
                    match cursor.as_deref() {
                        // Cursor pages reject every filter except limit.
                        Some(page_info) => {
                            request.query(&[("limit", PAGE_LIMIT), ("page_info", page_info)])
                        }
                        None => request.query(&[
                            ("owner_id", owner.as_str()),
                            ("owner_resource", OWNER_RESOURCE),
                            ("namespace", namespace),
                            ("limit", PAGE_LIMIT),
                        ]),
                    }
                })
                .await?;

            let list: MetafieldList = Self::parse(&reply.body)?;
            entries.extend(list.metafields.into_iter().map(MetadataEntry::from));

            match reply.link.as_deref().and_then(next_page_info) {
                Some(next) if cursor.as_deref() != Some(next.as_str()) => {
                    debug!(owner_id, fetched = entries.len(), "following next metafield page");
                    cursor = Some(next);
                }
                _ => break,
            }
        }
        Ok(entries)
    }

    async fn write_entry(
        &self,
        owner_id: u64,
        write: EntryWrite,
    ) -> Result<MetadataEntry, MetadataError> {
        let body = match write.entry_id.as_deref() {
            None => {
                let url = self.url("metafields.json");
                let payload = CreateMetafieldBody {
                    metafield: CreateMetafield {
                        namespace: &write.namespace,
                        key: &write.key,
                        value_type: &write.value_type,
                        value: &write.value,
                        owner_id,
                        owner_resource: OWNER_RESOURCE,
                    },
                };
                debug!(owner_id, key = %write.key, "creating metafield");
                self.send("create_entry", |client| client.post(&url).json(&payload))
                    .await?
                    .body
            }
            Some(entry_id) => {
                let url = self.url(&format!("metafields/{}.json", entry_id));
                let payload = UpdateMetafieldBody {
                    metafield: UpdateMetafield {
                        id: entry_id,
                        value_type: &write.value_type,
                        value: &write.value,
                    },
                };
                debug!(owner_id, entry_id, key = %write.key, "updating metafield");
                self.send("update_entry", |client| client.put(&url).json(&payload))
                    .await?
                    .body
            }
        };

        let envelope: MetafieldEnvelope = Self::parse(&body)?;
        Ok(envelope.metafield.into())
    }

    async fn delete_entry(&self, owner_id: u64, entry_id: &str) -> Result<(), MetadataError> {
        let url = self.url(&format!("metafields/{}.json", entry_id));
        debug!(owner_id, entry_id, "deleting metafield");
        self.send("delete_entry", |client| client.delete(&url))
            .await?;
        Ok(())
    }

    async fn query_structured_objects(
        &self,
        filter: &ObjectFilter,
    ) -> Result<Vec<ObjectNode>, MetadataError> {
        let url = self.url("graphql.json");
        let payload = serde_json::json!({
            "query": METAOBJECTS_QUERY,
            "variables": {
                "type": filter.object_type,
                "query": filter.query_string(),
            },
        });
        debug!(owner_id = filter.owner_id, "querying metaobjects");

        let body = self
            .send("query_structured_objects", |client| {
                client.post(&url).json(&payload)
            })
            .await?
            .body;

        let response: GraphQlResponse = Self::parse(&body)?;
        if let Some(error) = response.errors.as_ref().and_then(|e| e.first()) {
            return Err(MetadataError::InvalidResponse(format!(
                "graphql error: {}",
                error.message
            )));
        }

        let edges = response
            .data
            .and_then(|d| d.metaobjects)
            .map(|m| m.edges)
            .unwrap_or_default();
        Ok(edges.into_iter().map(|e| e.node.into()).collect())
    }
}

/// A successful response: its body and `Link` header, if any.
#[derive(Debug)]
struct Reply {
    body: String,
    link: Option<String>,
}

/// Cursor of the `rel="next"` page in a `Link` header.
///
/// `<https://shop/admin/api/2025-10/metafields.json?limit=250&page_info=abc>; rel="next"`
/// yields `abc`. Returns `None` on the last page.
fn next_page_info(link: &str) -> Option<String> {
    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params
            .split(';')
            .any(|p| p.trim().eq_ignore_ascii_case(r#"rel="next""#));
        if !is_next {
            return None;
        }
        let url = target.trim().strip_prefix('<')?.strip_suffix('>')?;
        Url::parse(url)
            .ok()?
            .query_pairs()
            .find(|(key, _)| key == "page_info")
            .map(|(_, value)| value.into_owned())
    })
}

/// Metaobject lookup. `type` is a required argument; the search string
/// narrows by owner.
const METAOBJECTS_QUERY: &str = r#"query($type: String!, $query: String!) {
  metaobjects(type: $type, first: 50, query: $query) {
    edges {
      node {
        id
        type
        handle
        fields { key type value }
      }
    }
  }
}"#;

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct CreateMetafieldBody<'a> {
    metafield: CreateMetafield<'a>,
}

#[derive(Debug, Serialize)]
struct CreateMetafield<'a> {
    namespace: &'a str,
    key: &'a str,
    #[serde(rename = "type")]
    value_type: &'a str,
    value: &'a str,
    owner_id: u64,
    owner_resource: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateMetafieldBody<'a> {
    metafield: UpdateMetafield<'a>,
}

#[derive(Debug, Serialize)]
struct UpdateMetafield<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    value_type: &'a str,
    value: &'a str,
}

#[derive(Debug, Deserialize)]
struct MetafieldList {
    #[serde(default)]
    metafields: Vec<Metafield>,
}

#[derive(Debug, Deserialize)]
struct MetafieldEnvelope {
    metafield: Metafield,
}

/// Metafield as returned by the REST API.
///
/// Ids are numbers and values may come back as non-strings, so both are
/// read loosely and normalized to text.
#[derive(Debug, Deserialize)]
struct Metafield {
    id: serde_json::Value,
    key: String,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    namespace: String,
    #[serde(rename = "type", default)]
    value_type: String,
}

fn json_to_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl From<Metafield> for MetadataEntry {
    fn from(m: Metafield) -> Self {
        Self {
            id: json_to_text(m.id),
            key: m.key,
            value: json_to_text(m.value),
            namespace: m.namespace,
            value_type: m.value_type,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    metaobjects: Option<MetaobjectConnection>,
}

#[derive(Debug, Deserialize)]
struct MetaobjectConnection {
    #[serde(default)]
    edges: Vec<MetaobjectEdge>,
}

#[derive(Debug, Deserialize)]
struct MetaobjectEdge {
    node: Metaobject,
}

#[derive(Debug, Deserialize)]
struct Metaobject {
    id: String,
    #[serde(rename = "type", default)]
    object_type: String,
    #[serde(default)]
    fields: Vec<MetaobjectField>,
}

#[derive(Debug, Deserialize)]
struct MetaobjectField {
    key: String,
    value: Option<String>,
}

impl From<Metaobject> for ObjectNode {
    fn from(m: Metaobject) -> Self {
        let fields: BTreeMap<String, String> = m
            .fields
            .into_iter()
            .map(|f| (f.key, f.value.unwrap_or_default()))
            .collect();
        Self {
            id: m.id,
            object_type: m.object_type,
            fields,
        }
    }
}
