//! HTTP-level tests for the Shopify metadata client.
//!
//! A local wiremock server stands in for the Admin API.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use measurekeep::core::config::StorageLayout;
use measurekeep::core::types::Selected;
use measurekeep::metadata::shopify::{ClientSettings, ShopifyMetadataClient};
use measurekeep::metadata::{EntryWrite, MetadataClient, MetadataError, ObjectFilter, RetryPolicy};
use measurekeep::repository::{MeasurementRepository, RepositoryOptions};

const TOKEN: &str = "shpat_test_token";
const BASE: &str = "/admin/api/2025-10";

fn settings(credential: Option<&str>) -> ClientSettings {
    ClientSettings {
        shop: "test-shop.myshopify.com".to_string(),
        api_version: "2025-10".to_string(),
        credential: credential.map(str::to_string),
        retry: RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
            timeout: Duration::from_secs(5),
        },
    }
}

fn client(server: &MockServer) -> ShopifyMetadataClient {
    ShopifyMetadataClient::with_origin(settings(Some(TOKEN)), &server.uri())
}

// =============================================================================
// Flat entries
// =============================================================================

mod entries {
    use super::*;

    #[tokio::test]
    async fn list_sends_token_and_owner_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/metafields.json", BASE)))
            .and(header("X-Shopify-Access-Token", TOKEN))
            .and(query_param("owner_id", "42"))
            .and(query_param("owner_resource", "customer"))
            .and(query_param("namespace", "measurements"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metafields": [
                    {
                        "id": 9001,
                        "namespace": "measurements",
                        "key": "measurement_1",
                        "value": "{\"label\":\"Me\",\"values\":{\"chest\":39}}",
                        "type": "json"
                    },
                    {
                        "id": 9002,
                        "namespace": "measurements",
                        "key": "selected",
                        "value": "measurement_1",
                        "type": "single_line_text_field"
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let entries = client(&server).list_entries(42, "measurements").await.unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "9001");
        assert_eq!(entries[0].value_type, "json");
        assert_eq!(entries[1].value, "measurement_1");
    }

    /// Page 1 holds a record and links to page 2, which holds the pointer.
    async fn mount_two_pages(server: &MockServer) {
        let next = format!(
            "<{}{}/metafields.json?limit=250&page_info=p2>; rel=\"next\"",
            server.uri(),
            BASE
        );
        Mock::given(method("GET"))
            .and(path(format!("{}/metafields.json", BASE)))
            .and(query_param("owner_id", "42"))
            .and(query_param("limit", "250"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Link", next.as_str())
                    .set_body_json(json!({
                        "metafields": [{
                            "id": 9001,
                            "namespace": "measurements",
                            "key": "measurement_1",
                            "value": "{\"label\":\"Me\",\"values\":{\"chest\":39}}",
                            "type": "json"
                        }]
                    })),
            )
            .expect(1)
            .mount(server)
            .await;

        let previous = format!(
            "<{}{}/metafields.json?limit=250&page_info=p1>; rel=\"previous\"",
            server.uri(),
            BASE
        );
        Mock::given(method("GET"))
            .and(path(format!("{}/metafields.json", BASE)))
            .and(query_param("page_info", "p2"))
            .and(query_param("limit", "250"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Link", previous.as_str())
                    .set_body_json(json!({
                        "metafields": [{
                            "id": 9002,
                            "namespace": "measurements",
                            "key": "selected",
                            "value": "measurement_1",
                            "type": "single_line_text_field"
                        }]
                    })),
            )
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn list_follows_next_page() {
        let server = MockServer::start().await;
        mount_two_pages(&server).await;

        let entries = client(&server).list_entries(42, "measurements").await.unwrap();

        let keys: Vec<_> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["measurement_1", "selected"]);
    }

    #[tokio::test]
    async fn pointer_on_later_page_is_resolved() {
        let server = MockServer::start().await;
        mount_two_pages(&server).await;

        let options = RepositoryOptions {
            structured_lookup: false,
            ..RepositoryOptions::default().with_layout(StorageLayout::Discrete)
        };
        let repo = MeasurementRepository::new(Arc::new(client(&server)), options);

        let report = repo.get_selected("42").await.unwrap();
        assert_eq!(report.selected, Selected::Id("measurement_1".into()));
    }

    #[tokio::test]
    async fn create_posts_metafield() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}/metafields.json", BASE)))
            .and(body_partial_json(json!({
                "metafield": {
                    "namespace": "measurements",
                    "key": "measurement_5",
                    "type": "json",
                    "owner_id": 42,
                    "owner_resource": "customer"
                }
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "metafield": {
                    "id": 77,
                    "namespace": "measurements",
                    "key": "measurement_5",
                    "value": "{\"label\":\"\",\"values\":{}}",
                    "type": "json"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let entry = client(&server)
            .write_entry(
                42,
                EntryWrite::create("measurements", "measurement_5", "{\"label\":\"\",\"values\":{}}", "json"),
            )
            .await
            .unwrap();

        assert_eq!(entry.id, "77");
        assert_eq!(entry.key, "measurement_5");
    }

    #[tokio::test]
    async fn update_puts_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(format!("{}/metafields/77.json", BASE)))
            .and(body_partial_json(json!({ "metafield": { "id": "77", "value": "[]" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "metafield": {
                    "id": 77,
                    "namespace": "measurements",
                    "key": "saved",
                    "value": "[]",
                    "type": "json"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let write = EntryWrite::create("measurements", "saved", "[]", "json").updating(Some("77".into()));
        let entry = client(&server).write_entry(42, write).await.unwrap();
        assert_eq!(entry.value, "[]");
    }

    #[tokio::test]
    async fn delete_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("{}/metafields/77.json", BASE)))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).delete_entry(42, "77").await.unwrap();
    }
}

// =============================================================================
// Failures and retries
// =============================================================================

mod failures {
    use super::*;

    #[tokio::test]
    async fn status_and_body_pass_through() {
        let server = MockServer::start().await;
        let body = r#"{"errors":"[API] Invalid API key or access token (unrecognized login or wrong password)"}"#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string(body))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).list_entries(42, "measurements").await.unwrap_err();
        assert_eq!(
            err,
            MetadataError::Upstream {
                status: 401,
                body: body.to_string()
            }
        );
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string(r#"{"errors":{"value":["is invalid"]}}"#))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server)
            .write_entry(42, EntryWrite::create("measurements", "k", "v", "json"))
            .await
            .unwrap_err();
        assert!(matches!(err, MetadataError::Upstream { status: 422, .. }));
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "metafields": [] })))
            .expect(1)
            .mount(&server)
            .await;

        let entries = client(&server).list_entries(42, "measurements").await.unwrap();
        assert!(entries.is_empty());
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server).list_entries(42, "measurements").await.unwrap_err();
        assert_eq!(
            err,
            MetadataError::Upstream {
                status: 500,
                body: "boom".into()
            }
        );
    }

    #[tokio::test]
    async fn missing_credential_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = ShopifyMetadataClient::with_origin(settings(None), &server.uri());
        assert!(!client.credential_configured());
        let err = client.list_entries(42, "measurements").await.unwrap_err();
        assert_eq!(err, MetadataError::CredentialUnconfigured);
    }

    #[tokio::test]
    async fn malformed_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client(&server).list_entries(42, "measurements").await.unwrap_err();
        assert!(matches!(err, MetadataError::InvalidResponse(_)));
    }
}

// =============================================================================
// Structured objects
// =============================================================================

mod structured {
    use super::*;

    fn filter() -> ObjectFilter {
        ObjectFilter {
            object_type: "measurement".into(),
            owner_id: 42,
        }
    }

    #[tokio::test]
    async fn query_maps_nodes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}/graphql.json", BASE)))
            .and(body_partial_json(json!({
                "variables": {
                    "type": "measurement",
                    "query": "owner_id:42 owner_resource:customer"
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "metaobjects": {
                        "edges": [
                            {
                                "node": {
                                    "id": "gid://shopify/Metaobject/1",
                                    "type": "measurement",
                                    "handle": "me",
                                    "fields": [
                                        { "key": "label", "type": "single_line_text_field", "value": "Me" },
                                        { "key": "chest", "type": "number_integer", "value": "39" }
                                    ]
                                }
                            }
                        ]
                    }
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let nodes = client(&server).query_structured_objects(&filter()).await.unwrap();

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "gid://shopify/Metaobject/1");
        assert_eq!(nodes[0].object_type, "measurement");
        assert_eq!(nodes[0].fields.get("chest").map(String::as_str), Some("39"));
    }

    #[tokio::test]
    async fn graphql_errors_are_invalid_responses() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}/graphql.json", BASE)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "errors": [{ "message": "Access denied for metaobjects field." }]
            })))
            .mount(&server)
            .await;

        let err = client(&server).query_structured_objects(&filter()).await.unwrap_err();
        match err {
            MetadataError::InvalidResponse(msg) => assert!(msg.contains("Access denied")),
            other => panic!("expected InvalidResponse, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "metaobjects": { "edges": [] } }
            })))
            .mount(&server)
            .await;

        let nodes = client(&server).query_structured_objects(&filter()).await.unwrap();
        assert!(nodes.is_empty());
    }
}
