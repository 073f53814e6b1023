//! Integration tests for `KeepaClient` using wiremock HTTP mocks.

use std::time::Duration;

use brickdesk_keepa::{KeepaClient, KeepaError, RateLimitPolicy};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> KeepaClient {
    KeepaClient::with_base_url("test-key", 2, 30, "brickdesk-test", base_url)
        .expect("client construction should not fail")
        .with_rate_limit_policy(RateLimitPolicy {
            max_attempts: 4,
            min_wait: Duration::ZERO,
            padding: Duration::ZERO,
            min_tokens: 5,
        })
}

#[tokio::test]
async fn products_by_asin_sends_stats_and_history_params() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/product"))
        .and(query_param("key", "test-key"))
        .and(query_param("domain", "2"))
        .and(query_param("asin", "B0BBSF8T3R,B09BNWS8QW"))
        .and(query_param("stats", "90"))
        .and(query_param("buybox", "1"))
        .and(query_param("history", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "tokensLeft": 180,
            "refillIn": 4000,
            "products": [
                { "asin": "B0BBSF8T3R", "title": "LEGO Icons 10316 Rivendell" },
                { "asin": "B09BNWS8QW", "title": "LEGO Icons 10294 Titanic" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let asins = vec!["B0BBSF8T3R".to_owned(), "B09BNWS8QW".to_owned()];
    let products = client.products_by_asin(&asins).await.expect("should parse products");

    assert_eq!(products.len(), 2);
    assert_eq!(products[1].asin, "B09BNWS8QW");
    assert_eq!(client.tokens_left().await, Some(180));
}

#[tokio::test]
async fn products_by_code_uses_code_param() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/product"))
        .and(query_param("code", "5702017416298"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "tokensLeft": 50,
            "products": [{ "asin": "B0BBSF8T3R", "eanList": ["5702017416298"] }]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let products = client
        .products_by_code(&["5702017416298".to_owned()])
        .await
        .expect("should parse products");
    assert_eq!(products[0].ean_list.as_deref(), Some(&["5702017416298".to_owned()][..]));
}

#[tokio::test]
async fn search_sends_term() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("type", "product"))
        .and(query_param("term", "LEGO 42115"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "tokensLeft": 90,
            "products": [{ "asin": "B08G4D1D2V", "title": "LEGO Technic 42115" }]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let products = client.search("LEGO 42115").await.expect("should parse search");
    assert_eq!(products.len(), 1);
}

#[tokio::test]
async fn api_error_in_body_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "tokensLeft": 0,
            "error": { "type": "invalidKey", "message": "Invalid API key" }
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.search("LEGO 1").await.unwrap_err();
    match err {
        KeepaError::Api(message) => assert_eq!(message, "Invalid API key"),
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn rate_limit_is_retried_after_refill() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/product"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
            "refillIn": 1,
            "tokensLeft": -3
        })))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/product"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "tokensLeft": 40,
            "products": [{ "asin": "B0X" }]
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let products = client
        .products_by_asin(&["B0X".to_owned()])
        .await
        .expect("should succeed after rate limit clears");
    assert_eq!(products.len(), 1);

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn persistent_rate_limit_gives_up_after_four_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({ "refillIn": 1 })))
        .expect(4)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.products_by_asin(&["B0X".to_owned()]).await.unwrap_err();
    assert!(matches!(err, KeepaError::RateLimited { attempts: 4 }));
}

#[tokio::test]
async fn low_tokens_delay_the_next_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "tokensLeft": 2,
            "refillIn": 150,
            "products": []
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    client.search("LEGO 1").await.expect("first call");

    let started = std::time::Instant::now();
    client.search("LEGO 2").await.expect("second call");
    assert!(
        started.elapsed() >= Duration::from_millis(150),
        "second call should wait for refill, took {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn server_errors_are_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.search("LEGO 1").await.unwrap_err();
    assert!(matches!(err, KeepaError::UnexpectedStatus { status: 500, .. }));
}
