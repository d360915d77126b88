use reqwest::StatusCode;
use serde_json::{json, Value};

use storeadmin_api::config::{AppConfig, StoreBackend};

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(AppConfig::for_tests()).await
    }

    async fn spawn_with(config: AppConfig) -> Self {
        // Same router as prod, bound to an ephemeral port.
        let app = storeadmin_api::app::build_app(&config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn create_product(client: &reqwest::Client, srv: &TestServer, body: Value) -> Value {
    let res = client
        .post(srv.api("/products/"))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = res.status();
    let body: Value = res.json().await.unwrap();
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body
}

async fn seed_products(client: &reqwest::Client, srv: &TestServer, count: u32) -> Vec<i64> {
    let mut ids = Vec::new();
    for i in 1..=count {
        let created = create_product(
            client,
            srv,
            json!({
                "name": format!("Product {i:02}"),
                "sku": format!("SKU-{i:02}"),
                "price": 100 * i,
                "inventory_count": 10,
                "category": if i % 2 == 0 { "even" } else { "odd" },
            }),
        )
        .await;
        ids.push(created["id"].as_i64().unwrap());
    }
    ids
}

async fn get_json(client: &reqwest::Client, url: String) -> (StatusCode, Value) {
    let res = client.get(url).send().await.unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

fn ids_of(list: &Value) -> Vec<i64> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn health_and_root_report_identity() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = get_json(&client, format!("{}/health", srv.base_url)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "test");
    assert!(body["version"].is_string());

    let (status, body) = get_json(&client, format!("{}/", srv.base_url)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().starts_with("Welcome"));
}

#[tokio::test]
async fn responses_carry_correlation_and_timing_headers() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/health", srv.base_url))
        .header("X-Correlation-ID", "trace-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-correlation-id"], "trace-42");
    let elapsed: f64 = res.headers()["x-process-time"].to_str().unwrap().parse().unwrap();
    assert!(elapsed >= 0.0);

    let res = client.get(format!("{}/health", srv.base_url)).send().await.unwrap();
    assert!(!res.headers()["x-correlation-id"].is_empty());
}

#[tokio::test]
async fn listing_pages_through_twenty_five_products() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let ids = seed_products(&client, &srv, 25).await;

    let (status, first) = get_json(&client, srv.api("/products/?skip=0&limit=10")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ids_of(&first), ids[..10].to_vec());

    let (_, last) = get_json(&client, srv.api("/products/?skip=20&limit=10")).await;
    assert_eq!(ids_of(&last), ids[20..].to_vec());

    // default page size
    let (_, default_page) = get_json(&client, srv.api("/products")).await;
    assert_eq!(default_page.as_array().unwrap().len(), 10);

    let (_, again) = get_json(&client, srv.api("/products/?skip=0&limit=10")).await;
    assert_eq!(again, first);
}

#[tokio::test]
async fn limit_outside_bounds_is_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for query in ["limit=0", "limit=101", "skip=-1", "limit=ten"] {
        let (status, body) = get_json(&client, srv.api(&format!("/products/?{query}"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{query}");
        assert_eq!(body["error"], "validation_error", "{query}");
    }
}

#[tokio::test]
async fn search_and_category_filters() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    seed_products(&client, &srv, 6).await;
    create_product(
        &client,
        &srv,
        json!({"name": "Lamp", "sku": "LAMP", "price": 1, "description": "A bright PRODUCT light"}),
    )
    .await;

    let (status, found) = get_json(&client, srv.api("/products/search/?query=product%2003")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);
    assert_eq!(found[0]["sku"], "SKU-03");

    let (_, found) = get_json(&client, srv.api("/products/search?query=PRODUCT&limit=100")).await;
    assert_eq!(found.as_array().unwrap().len(), 7);

    create_product(&client, &srv, json!({"name": "Code03X", "sku": "CODE", "price": 1})).await;
    let (_, spaced) = get_json(&client, srv.api("/products/search/?query=%2003")).await;
    let skus: Vec<_> = spaced
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["sku"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(skus, vec!["SKU-03"]);

    let (status, body) = get_json(&client, srv.api("/products/search/?query=%20")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let (_, even) = get_json(&client, srv.api("/products/category/even?skip=1&limit=10")).await;
    let skus: Vec<_> = even
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["sku"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(skus, vec!["SKU-04", "SKU-06"]);
}

#[tokio::test]
async fn product_crud_lifecycle() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = create_product(
        &client,
        &srv,
        json!({"name": "Mug", "sku": "MUG-1", "price": 1250, "stock": 3, "price_currency": "eur"}),
    )
    .await;
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["inventory_count"], 3);
    assert_eq!(created["price_currency"], "EUR");
    assert_eq!(created["is_active"], true);

    let res = client
        .post(srv.api("/products"))
        .json(&json!({"name": "Other", "sku": "MUG-1", "price": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .put(srv.api(&format!("/products/{id}")))
        .json(&json!({"price": 1500, "category": "kitchen", "stock": 9}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["price"], 1500);
    assert_eq!(updated["category"], "kitchen");
    assert_eq!(updated["inventory_count"], 9);
    assert_eq!(updated["name"], "Mug");

    let res = client
        .delete(srv.api(&format!("/products/{id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let deleted: Value = res.json().await.unwrap();
    assert_eq!(deleted["id"], id);

    let (status, body) = get_json(&client, srv.api(&format!("/products/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = get_json(&client, srv.api("/products/abc")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_id");
}

#[tokio::test]
async fn invalid_product_bodies_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let cases = [
        json!({"name": "", "sku": "X", "price": 1}),
        json!({"name": "X", "sku": "X", "price": -5}),
        json!({"name": "X", "price": 1}),
    ];
    for body in cases {
        let res = client.post(srv.api("/products")).json(&body).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{body}");
    }
}

#[tokio::test]
async fn order_lifecycle_over_http() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let ids = seed_products(&client, &srv, 2).await;

    let res = client
        .post(srv.api("/orders/"))
        .json(&json!({
            "customer_name": "Grace Hopper",
            "customer_email": "grace@example.com",
            "items": [
                {"product_id": ids[0], "quantity": 2},
                {"product_id": ids[1], "quantity": 1, "unit_price": 150}
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let order: Value = res.json().await.unwrap();
    let order_id = order["id"].as_i64().unwrap();
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_amount"], 2 * 100 + 150);
    assert_eq!(order["items"].as_array().unwrap().len(), 2);

    let (_, product) = get_json(&client, srv.api(&format!("/products/{}", ids[0]))).await;
    assert_eq!(product["inventory_count"], 8);

    let res = client
        .put(srv.api(&format!("/orders/{order_id}/status")))
        .json(&json!({"status": "shipped"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let (_, shipped) = get_json(&client, srv.api("/orders/?status=shipped")).await;
    assert_eq!(ids_of(&shipped), vec![order_id]);
    let (_, pending) = get_json(&client, srv.api("/orders?status=pending")).await;
    assert!(pending.as_array().unwrap().is_empty());

    let (_, by_customer) = get_json(&client, srv.api("/orders/customer/grace@example.com")).await;
    assert_eq!(ids_of(&by_customer), vec![order_id]);

    let res = client
        .put(srv.api(&format!("/orders/{order_id}")))
        .json(&json!({"notes": "fragile", "customer_phone": null}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let edited: Value = res.json().await.unwrap();
    assert_eq!(edited["notes"], "fragile");
    assert_eq!(edited["status"], "shipped");

    let res = client
        .delete(srv.api(&format!("/products/{}", ids[0])))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .delete(srv.api(&format!("/orders/{order_id}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let (status, _) = get_json(&client, srv.api(&format!("/orders/{order_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_orders_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let ids = seed_products(&client, &srv, 1).await;

    let cases = [
        json!({"customer_name": "A", "customer_email": "a@example.com", "items": []}),
        json!({"customer_name": "A", "customer_email": "a@example.com",
               "items": [{"product_id": 999, "quantity": 1}]}),
        json!({"customer_name": "A", "customer_email": "a@example.com",
               "items": [{"product_id": ids[0], "quantity": 0}]}),
        json!({"customer_name": "A", "customer_email": "a@example.com", "status": "lost",
               "items": [{"product_id": ids[0], "quantity": 1}]}),
    ];
    for body in cases {
        let res = client.post(srv.api("/orders")).json(&body).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{body}");
    }

    let (status, _) = get_json(&client, srv.api("/orders/?status=lost")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sqlite_backend_serves_the_same_contract() {
    let srv = TestServer::spawn_with(AppConfig {
        backend: StoreBackend::Sqlite,
        database_url: "sqlite::memory:".to_string(),
        ..AppConfig::for_tests()
    })
    .await;
    let client = reqwest::Client::new();
    let ids = seed_products(&client, &srv, 12).await;

    let (_, page) = get_json(&client, srv.api("/products/?skip=10&limit=10")).await;
    assert_eq!(ids_of(&page), ids[10..].to_vec());

    let (_, found) = get_json(&client, srv.api("/products/search/?query=product%2011")).await;
    assert_eq!(ids_of(&found), vec![ids[10]]);

    let res = client
        .post(srv.api("/products"))
        .json(&json!({"name": "Dup", "sku": "SKU-01", "price": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
}
