//! Integration tests for retries, throttling, deadlines and cancellation.
//!
//! These tests drive the request executor against mock endpoints that fail,
//! throttle or stall, and verify how many exchanges reach the server.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use shopify_catalog::clients::{
    ApiCallLimit, CancellationToken, GovernorConfig, HttpError, RateLimitGovernor, RetryPolicy,
};
use shopify_catalog::rest::resources::Product;
use shopify_catalog::rest::{ResourceContext, Resource};
use shopify_catalog::{
    AccessToken, ApiVersion, ClientConfig, Field, HostUrl, HttpMethod, HttpRequest,
    ResourceError, RestClient, ShopDomain,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PRODUCT: &str = "/admin/api/2025-10/products/1.json";
const PRODUCTS: &str = "/admin/api/2025-10/products.json";

fn config_for(server: &MockServer, policy: RetryPolicy, exchange_timeout: Duration) -> ClientConfig {
    ClientConfig::builder()
        .shop(ShopDomain::new("test-shop").unwrap())
        .access_token(AccessToken::new("shpat_test_token").unwrap())
        .api_version(ApiVersion::V2025_10)
        .host(HostUrl::new(server.uri()).unwrap())
        .exchange_timeout(exchange_timeout)
        .retry_policy(policy)
        .governor(
            GovernorConfig::default()
                .with_min_interval(Duration::ZERO)
                .with_backoff(Duration::from_millis(5), Duration::from_millis(20)),
        )
        .build()
        .unwrap()
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy::default()
        .with_base_delay(Duration::from_millis(5))
        .with_max_delay(Duration::from_millis(20))
}

fn client_for(server: &MockServer) -> RestClient {
    RestClient::new(&config_for(server, fast_policy(), Duration::from_secs(5))).unwrap()
}

fn product_body() -> serde_json::Value {
    json!({"product": {"id": 1, "title": "Board"}})
}

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.unwrap().len()
}

// ============================================================================
// Transient Failures
// ============================================================================

#[tokio::test]
async fn test_server_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCT))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PRODUCT))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_body()))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let product = Product::fetch_one(&client, 1, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(product.title, Field::Value("Board".to_string()));
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_timeouts_are_retried_for_reads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCT))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(product_body())
                .set_delay(Duration::from_millis(500)),
        )
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PRODUCT))
        .respond_with(ResponseTemplate::new(200).set_body_json(product_body()))
        .mount(&server)
        .await;

    let config = config_for(&server, fast_policy(), Duration::from_millis(100));
    let client = RestClient::new(&config).unwrap();
    let product = Product::fetch_one(&client, 1, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(product.get_id(), Some(1));
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_retries_exhausted_reports_last_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCT))
        .respond_with(ResponseTemplate::new(500).insert_header("X-Request-Id", "req-500"))
        .mount(&server)
        .await;

    let policy = fast_policy().with_max_tries(3);
    let client = RestClient::new(&config_for(&server, policy, Duration::from_secs(5))).unwrap();
    let error = Product::fetch_one(&client, 1, None, &CancellationToken::new())
        .await
        .unwrap_err();

    match &error {
        ResourceError::RetriesExhausted { last, context } => {
            assert_eq!(last.status(), Some(500));
            assert_eq!(context.attempts, 3);
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    assert_eq!(error.request_id(), Some("req-500"));
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCT))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"errors": "Forbidden"})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = Product::fetch_one(&client, 1, None, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, ResourceError::Client { ref source, .. } if source.code == 403));
    assert_eq!(request_count(&server).await, 1);
}

// ============================================================================
// Throttling
// ============================================================================

#[tokio::test]
async fn test_throttled_read_waits_retry_after_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCT))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("Retry-After", "0.05")
                .insert_header("X-Shopify-Shop-Api-Call-Limit", "40/40"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PRODUCT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Shopify-Shop-Api-Call-Limit", "1/40")
                .set_body_json(product_body()),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let started = tokio::time::Instant::now();
    let product = Product::fetch_one(&client, 1, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(product.get_id(), Some(1));
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert_eq!(request_count(&server).await, 2);
    assert_eq!(client.governor().snapshot().reserved, 0);
}

#[tokio::test]
async fn test_clients_of_one_shop_share_rate_limit_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Shopify-Shop-Api-Call-Limit", "12/80")
                .set_body_json(product_body()),
        )
        .mount(&server)
        .await;

    let config = config_for(&server, fast_policy(), Duration::from_secs(5));
    let governor = Arc::new(RateLimitGovernor::new(config.governor().clone()));
    let first = RestClient::with_governor(&config, Arc::clone(&governor)).unwrap();
    let second = RestClient::with_governor(&config, Arc::clone(&governor)).unwrap();

    Product::fetch_one(&first, 1, None, &CancellationToken::new())
        .await
        .unwrap();

    let seen_by_second = second.governor().snapshot();
    assert_eq!(seen_by_second.limit, Some(80));
    assert!(seen_by_second.used <= 12);
}

#[tokio::test]
async fn test_observed_report_is_visible_to_clients() {
    let server = MockServer::start().await;
    let client = client_for(&server);

    client.governor().observe(ApiCallLimit { used: 3, limit: 40 });

    assert_eq!(client.governor().snapshot().limit, Some(40));
}

// ============================================================================
// Unsafe Mutations
// ============================================================================

#[tokio::test]
async fn test_post_without_key_is_not_repeated_after_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRODUCTS))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(product_body())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let config = config_for(&server, fast_policy(), Duration::from_millis(100));
    let client = RestClient::new(&config).unwrap();
    let product = Product {
        title: Field::Value("Board".to_string()),
        ..Product::default()
    };

    let error = product
        .create(&client, None, &CancellationToken::new())
        .await
        .unwrap_err();

    match &error {
        ResourceError::NotRetried { source, context } => {
            assert!(matches!(source, HttpError::Timeout(_)));
            assert_eq!(context.attempts, 1);
        }
        other => panic!("expected NotRetried, got {other:?}"),
    }
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_post_without_key_is_not_repeated_after_throttle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRODUCTS))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0.01"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let error = Product::default()
        .create(&client, None, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        ResourceError::NotRetried {
            source: HttpError::RateLimited { .. },
            ..
        }
    ));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_post_without_key_is_retried_after_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRODUCTS))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PRODUCTS))
        .respond_with(ResponseTemplate::new(201).set_body_json(product_body()))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let saved = Product::default()
        .create(&client, None, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(saved.get_id(), Some(1));
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_post_with_key_is_retried_after_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRODUCTS))
        .and(header("Idempotency-Key", "key-1"))
        .respond_with(
            ResponseTemplate::new(201)
                .set_body_json(product_body())
                .set_delay(Duration::from_millis(500)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(PRODUCTS))
        .and(header("Idempotency-Key", "key-1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(product_body()))
        .mount(&server)
        .await;

    let config = config_for(&server, fast_policy(), Duration::from_millis(100));
    let client = RestClient::new(&config).unwrap();
    let saved = Product::default()
        .create(&client, Some("key-1"), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(saved.get_id(), Some(1));
    assert_eq!(request_count(&server).await, 2);
}

// ============================================================================
// Deadlines and Cancellation
// ============================================================================

#[tokio::test]
async fn test_deadline_stops_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCT))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let policy = RetryPolicy::default()
        .with_base_delay(Duration::from_millis(400))
        .with_max_delay(Duration::from_secs(1))
        .with_jitter(false);
    let client = RestClient::new(&config_for(&server, policy, Duration::from_secs(5))).unwrap();
    let request = HttpRequest::builder(HttpMethod::Get, "products/1")
        .deadline(Duration::from_millis(200))
        .build()
        .unwrap();

    let error = client
        .execute(request, &ResourceContext::new("Product").with_id(1), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(error, ResourceError::RetriesExhausted { .. }));
    assert_eq!(error.attempts(), 1);
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_cancelled_before_start_sends_nothing() {
    let server = MockServer::start().await;
    let client = client_for(&server);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let error = Product::fetch_one(&client, 1, None, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(error, ResourceError::Cancelled { .. }));
    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn test_cancel_interrupts_retry_backoff() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCT))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let policy = RetryPolicy::default()
        .with_base_delay(Duration::from_secs(10))
        .with_max_delay(Duration::from_secs(10))
        .with_jitter(false);
    let client = RestClient::new(&config_for(&server, policy, Duration::from_secs(5))).unwrap();
    let cancel = CancellationToken::new();

    let started = tokio::time::Instant::now();
    let (result, ()) = tokio::join!(Product::fetch_one(&client, 1, None, &cancel), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let error = result.unwrap_err();
    assert!(matches!(error, ResourceError::Cancelled { .. }));
    assert_eq!(error.attempts(), 1);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_cancel_during_exchange_discards_result_and_settles_permit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Shopify-Shop-Api-Call-Limit", "7/40")
                .set_body_json(product_body())
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;

    let config = config_for(&server, fast_policy(), Duration::from_secs(5));
    let governor = Arc::new(RateLimitGovernor::new(
        config.governor().clone().with_leak_rate(None),
    ));
    let client = RestClient::with_governor(&config, governor).unwrap();
    let cancel = CancellationToken::new();

    let (result, ()) = tokio::join!(Product::fetch_one(&client, 1, None, &cancel), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
    });

    let error = result.unwrap_err();
    assert!(matches!(error, ResourceError::Cancelled { .. }));
    assert_eq!(error.attempts(), 1);
    assert_eq!(request_count(&server).await, 1);

    let snapshot = client.governor().snapshot();
    assert_eq!(snapshot.used, 7);
    assert_eq!(snapshot.limit, Some(40));
    assert_eq!(snapshot.reserved, 0);
}

#[tokio::test]
async fn test_every_attempt_is_settled_with_the_governor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(PRODUCT))
        .respond_with(
            ResponseTemplate::new(503).insert_header("X-Shopify-Shop-Api-Call-Limit", "5/40"),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(PRODUCT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("X-Shopify-Shop-Api-Call-Limit", "6/40")
                .set_body_json(product_body()),
        )
        .mount(&server)
        .await;

    let config = config_for(&server, fast_policy(), Duration::from_secs(5));
    let governor = Arc::new(RateLimitGovernor::new(
        config.governor().clone().with_leak_rate(None),
    ));
    let client = RestClient::with_governor(&config, Arc::clone(&governor)).unwrap();

    Product::fetch_one(&client, 1, None, &CancellationToken::new())
        .await
        .unwrap();

    let snapshot = governor.snapshot();
    assert_eq!(snapshot.used, 6);
    assert_eq!(snapshot.reserved, 0);
    assert_eq!(request_count(&server).await, 2);
}
