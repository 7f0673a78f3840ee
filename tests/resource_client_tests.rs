//! Integration tests for fetching and mutating catalog records.
//!
//! These tests run the resource operations against a mock Admin API and
//! verify request shapes, decoding and error classification.

use std::time::Duration;

use serde_json::json;
use shopify_catalog::clients::{CancellationToken, GovernorConfig, RetryPolicy};
use shopify_catalog::rest::resources::{
    Product, ProductCountParams, ProductFindParams, ProductStatus, Variant,
};
use shopify_catalog::rest::{CodecError, Resource};
use shopify_catalog::{
    AccessToken, ApiVersion, ClientConfig, Field, HostUrl, ResourceError, RestClient, ShopDomain,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRODUCTS: &str = "/admin/api/2025-10/products";

fn client_for(server: &MockServer) -> RestClient {
    let config = ClientConfig::builder()
        .shop(ShopDomain::new("test-shop").unwrap())
        .access_token(AccessToken::new("shpat_test_token").unwrap())
        .api_version(ApiVersion::V2025_10)
        .host(HostUrl::new(server.uri()).unwrap())
        .retry_policy(
            RetryPolicy::default()
                .with_base_delay(Duration::from_millis(5))
                .with_max_delay(Duration::from_millis(20)),
        )
        .governor(
            GovernorConfig::default()
                .with_min_interval(Duration::ZERO)
                .with_backoff(Duration::from_millis(5), Duration::from_millis(20)),
        )
        .build()
        .unwrap();
    RestClient::new(&config).unwrap()
}

fn product_json(id: u64, title: &str) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "vendor": "Acme",
        "status": "active",
        "body_html": null,
        "variants": [{"id": id * 10, "product_id": id, "price": "19.99"}]
    })
}

// ============================================================================
// Fetch One
// ============================================================================

#[tokio::test]
async fn test_fetch_one_decodes_product_and_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{PRODUCTS}/632910392.json")))
        .and(header("X-Shopify-Access-Token", "shpat_test_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Request-Id", "req-1")
                .insert_header("X-Shopify-Shop-Api-Call-Limit", "1/40")
                .set_body_json(json!({"product": product_json(632_910_392, "IPod Nano")})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cancel = CancellationToken::new();
    let response = Product::fetch_one(&client, 632_910_392, None, &cancel)
        .await
        .unwrap();

    assert_eq!(response.title, Field::Value("IPod Nano".to_string()));
    assert_eq!(response.status, Field::Value(ProductStatus::Active));
    assert!(response.body_html.is_null());
    assert!(response.handle.is_absent());
    assert_eq!(response.variants.value().map(Vec::len), Some(1));
    assert_eq!(response.request_id(), Some("req-1"));
    assert_eq!(response.rate_limit().map(|limit| limit.limit), Some(40));

    let snapshot = client.governor().snapshot();
    assert_eq!(snapshot.limit, Some(40));
    assert_eq!(snapshot.reserved, 0);
}

#[tokio::test]
async fn test_fetch_one_sends_find_params_as_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{PRODUCTS}/1.json")))
        .and(query_param("fields", "id,title"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"product": {"id": 1, "title": "A"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let params = ProductFindParams {
        fields: Some("id,title".to_string()),
    };
    let product = Product::fetch_one(&client, 1, Some(params), &CancellationToken::new())
        .await
        .unwrap()
        .into_inner();

    assert_eq!(product.get_id(), Some(1));
    assert!(product.vendor.is_absent());
}

#[tokio::test]
async fn test_fetch_one_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{PRODUCTS}/999.json")))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("X-Request-Id", "req-404")
                .set_body_json(json!({"errors": "Not Found"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = Product::fetch_one(&client, 999, None, &CancellationToken::new())
        .await
        .unwrap_err();

    match &error {
        ResourceError::NotFound {
            id, request_id, ..
        } => {
            assert_eq!(id, "999");
            assert_eq!(request_id.as_deref(), Some("req-404"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert_eq!(error.attempts(), 1);
    assert!(error.to_string().contains("999"));
}

#[tokio::test]
async fn test_fetch_one_malformed_body_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{PRODUCTS}/1.json")))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Request-Id", "req-bad")
                .set_body_json(json!({"product": 5})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = Product::fetch_one(&client, 1, None, &CancellationToken::new())
        .await
        .unwrap_err();

    match error {
        ResourceError::Malformed {
            source: CodecError::Malformed { resource, .. },
            request_id,
            context,
        } => {
            assert_eq!(resource, "Product");
            assert_eq!(request_id.as_deref(), Some("req-bad"));
            assert_eq!(context.attempts, 1);
        }
        other => panic!("expected Malformed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_one_keeps_unknown_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{PRODUCTS}/1.json")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"product": {"id": 1, "status": "unlisted"}})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let product = Product::fetch_one(&client, 1, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        product.status,
        Field::Value(ProductStatus::Unknown("unlisted".to_string()))
    );
}

// ============================================================================
// Count
// ============================================================================

#[tokio::test]
async fn test_count_sends_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("{PRODUCTS}/count.json")))
        .and(query_param("vendor", "Acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 7})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let params = ProductCountParams {
        vendor: Some("Acme".to_string()),
        ..Default::default()
    };
    let count = Product::count(&client, Some(params), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(count, 7);
}

#[tokio::test]
async fn test_variant_count_has_no_path() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let error = Variant::count(&client, None, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ResourceError::PathResolutionFailed {
            resource: "Variant",
            ..
        }
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ============================================================================
// Create / Update / Delete
// ============================================================================

#[tokio::test]
async fn test_create_posts_envelope_without_absent_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{PRODUCTS}.json")))
        .and(body_json(json!({"product": {"title": "Burton Custom", "vendor": "Burton"}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "product": {"id": 1072481061, "title": "Burton Custom", "vendor": "Burton"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let product = Product {
        title: Field::Value("Burton Custom".to_string()),
        vendor: Field::Value("Burton".to_string()),
        ..Product::default()
    };

    let saved = product
        .create(&client, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(saved.get_id(), Some(1_072_481_061));
}

#[tokio::test]
async fn test_create_validation_failed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{PRODUCTS}.json")))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({"errors": {"title": ["can't be blank"]}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = Product::default()
        .create(&client, None, &CancellationToken::new())
        .await
        .unwrap_err();

    match error {
        ResourceError::ValidationFailed { errors, .. } => {
            assert_eq!(errors["title"], vec!["can't be blank".to_string()]);
        }
        other => panic!("expected ValidationFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_create_sends_idempotency_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("{PRODUCTS}.json")))
        .and(header("Idempotency-Key", "create-burton-1"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"product": {"id": 5, "title": "B"}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let product = Product {
        title: Field::Value("B".to_string()),
        ..Product::default()
    };

    let saved = product
        .create(&client, Some("create-burton-1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(saved.get_id(), Some(5));
}

#[tokio::test]
async fn test_update_puts_record_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path(format!("{PRODUCTS}/7.json")))
        .and(body_json(json!({"product": {"id": 7, "title": "Renamed", "body_html": null}})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"product": {"id": 7, "title": "Renamed", "body_html": null}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let product = Product {
        id: Field::Value(7),
        title: Field::Value("Renamed".to_string()),
        body_html: Field::Null,
        ..Product::default()
    };

    let saved = product
        .update(&client, None, &CancellationToken::new())
        .await
        .unwrap();

    assert!(saved.body_html.is_null());
}

#[tokio::test]
async fn test_update_without_id_makes_no_request() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    let error = Product::default()
        .update(&client, None, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ResourceError::PathResolutionFailed {
            operation: "update",
            ..
        }
    ));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_nested_variant() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/admin/api/2025-10/products/1/variants/2.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let variant = Variant {
        id: Field::Value(2),
        product_id: Field::Value(1),
        ..Variant::default()
    };

    variant
        .delete(&client, None, &CancellationToken::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_fetch_standalone_variant() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/api/2025-10/variants/808950810.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "variant": {"id": 808950810, "product_id": 632910392, "sku": "IPOD2008PINK"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let variant = Variant::fetch_one(&client, 808_950_810, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(variant.sku, Field::Value("IPOD2008PINK".to_string()));
}
