//! Integration tests for `BricqerClient` using wiremock HTTP mocks.

use std::time::Duration;

use brickdesk_bricqer::{BricqerClient, BricqerError, RetryPolicy};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str) -> BricqerClient {
    BricqerClient::new(
        base_url,
        "test-key",
        30,
        "brickdesk-test",
        RetryPolicy {
            max_retries: 2,
            base_delay_ms: 1,
            max_delay_ms: 5,
        },
        Duration::ZERO,
    )
    .expect("client construction should not fail")
}

fn order_json(id: i64, status: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "order_number": format!("BQ-{id}"),
        "status": status,
        "created": "2026-03-04T10:15:00Z",
        "customer_name": "Jo Bloggs",
        "items": [{ "quantity": 2 }, { "quantity": 1 }],
        "subtotal": "24.50",
        "shipping_cost": "3.20",
        "fees": "1.10",
        "total": "27.70",
        "currency": "GBP"
    })
}

#[tokio::test]
async fn list_orders_sends_api_key_header() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders/order/"))
        .and(query_param("page", "1"))
        .and(header("authorization", "Api-Key test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "next": null,
            "results": [order_json(501, "PAID")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let page = client.list_orders(1).await.expect("should parse page");

    assert_eq!(page.count, 1);
    assert!(page.next.is_none());
    assert_eq!(page.results.len(), 1);
    assert_eq!(page.results[0].id, 501);
    assert_eq!(page.results[0].items.len(), 2);
}

#[tokio::test]
async fn fetch_all_orders_follows_next_links() {
    let server = MockServer::start().await;
    let page_two = format!("{}/orders/order/?page=2", server.uri());

    Mock::given(method("GET"))
        .and(path("/orders/order/"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 3,
            "next": page_two,
            "results": [order_json(1, "PAID"), order_json(2, "SHIPPED")]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/orders/order/"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 3,
            "next": null,
            "results": [order_json(3, "COMPLETED")]
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let orders = client.fetch_all_orders(10).await.expect("should paginate");

    let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn fetch_all_inventory_stops_at_page_limit() {
    let server = MockServer::start().await;
    let next = format!("{}/inventory/item/?page=2", server.uri());

    Mock::given(method("GET"))
        .and(path("/inventory/item/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1000,
            "next": next,
            "results": []
        })))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.fetch_all_inventory(1).await.unwrap_err();

    assert!(
        matches!(err, BricqerError::PaginationLimit { max_pages: 1, .. }),
        "expected PaginationLimit, got {err:?}"
    );
}

#[tokio::test]
async fn retries_service_unavailable_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders/order/77/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/orders/order/77/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_json(77, "PAID")))
        .with_priority(2)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let order = client.get_order(77).await.expect("should recover after 503s");
    assert_eq!(order.id, 77);

    let requests = server.received_requests().await.unwrap_or_default();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn rate_limit_is_retried_with_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/inventory/item/"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/inventory/item/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "count": 1,
            "next": null,
            "results": [{
                "id": 9,
                "item_type": "minifig",
                "bricklink_id": "sw0001a",
                "name": "Battle Droid",
                "condition": "U",
                "price": "4.99",
                "purchase_price": "1.00",
                "quantity": 3
            }]
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let page = client.list_inventory(1).await.expect("should recover after 429");
    assert_eq!(page.results[0].bricklink_id.as_deref(), Some("sw0001a"));
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.list_orders(1).await.unwrap_err();
    assert!(matches!(
        err,
        BricqerError::UnexpectedStatus { status: 400, .. }
    ));
}

#[tokio::test]
async fn persistent_server_errors_give_up() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.list_orders(1).await.unwrap_err();
    assert!(matches!(err, BricqerError::ServerError { status: 502, .. }));
}

#[tokio::test]
async fn missing_order_returns_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/orders/order/404/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.get_order(404).await.unwrap_err();
    assert!(matches!(err, BricqerError::NotFound { .. }));
}

#[tokio::test]
async fn malformed_body_returns_deserialize_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = test_client(&server.uri());
    let err = client.list_orders(1).await.unwrap_err();
    assert!(matches!(err, BricqerError::Deserialize { .. }));
}
