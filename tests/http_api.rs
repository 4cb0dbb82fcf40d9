//! HTTP API Tests
//!
//! Drives the axum router in-process with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use docstore::http_server::{HttpServer, HttpServerConfig};
use docstore::store::DocumentStore;
use serde_json::{json, Value};
use tower::ServiceExt;

// =============================================================================
// Test Utilities
// =============================================================================

fn app_with(config: HttpServerConfig) -> (Router, Arc<DocumentStore>) {
    let store = Arc::new(DocumentStore::open(":memory:").unwrap().with_clock(|| 1_000));
    let router = HttpServer::with_config(config, Arc::clone(&store)).router();
    (router, store)
}

fn app() -> (Router, Arc<DocumentStore>) {
    app_with(HttpServerConfig::default())
}

async fn call(router: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn create(router: &Router, collection: &str, body: &str) -> String {
    let (status, json) = call(router, Method::POST, &format!("/db/{}", collection), body).await;
    assert_eq!(status, StatusCode::OK, "{}", json);
    json["result"]["id"].as_str().unwrap().to_string()
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health() {
    let (router, _) = app();
    let (status, json) = call(&router, Method::GET, "/health", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

// =============================================================================
// CRUD
// =============================================================================

#[tokio::test]
async fn test_create_then_read() {
    let (router, _) = app();
    let id = create(&router, "notes", r#"{"title":"hi"}"#).await;

    let (status, json) = call(&router, Method::GET, &format!("/db/notes/{}", id), "").await;
    assert_eq!(status, StatusCode::OK);
    assert!(json.get("error").is_none());
    assert_eq!(json["result"]["title"], "hi");
    assert_eq!(json["result"]["_id"], id.as_str());
    assert_eq!(json["result"]["created_at"], 1_000);
}

#[tokio::test]
async fn test_update_and_soft_delete() {
    let (router, store) = app();
    let id = create(&router, "notes", r#"{"v":1}"#).await;
    let uri = format!("/db/notes/{}", id);

    let (status, json) = call(&router, Method::PUT, &uri, r#"{"v":2}"#).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["result"], json!({"success": true}));

    let (status, _) = call(&router, Method::DELETE, &uri, "").await;
    assert_eq!(status, StatusCode::OK);

    let doc = store.read("notes", &id).unwrap();
    assert_eq!(doc["v"], 2);
    assert_eq!(doc["deleted_at"], 1_000);
}

#[tokio::test]
async fn test_permanent_delete() {
    let (router, _) = app();
    let id = create(&router, "notes", "{}").await;
    let uri = format!("/db/notes/{}", id);

    let (status, _) = call(&router, Method::DELETE, &format!("{}?permanent=true", uri), "").await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = call(&router, Method::GET, &uri, "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "DOCSTORE_NOT_FOUND");
    assert!(json["result"].is_null());
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn test_missing_document_is_404() {
    let (router, _) = app();
    for method in [Method::GET, Method::DELETE] {
        let (status, json) = call(&router, method, "/db/notes/unknown", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("unknown"));
    }
    let (status, _) = call(&router, Method::PUT, "/db/notes/unknown", "{}").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bad_payloads_are_400() {
    let (router, store) = app();
    for body in ["", "not json", "[1,2]", "3"] {
        let (status, json) = call(&router, Method::POST, "/db/notes", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body {:?}", body);
        assert_eq!(json["code"], "DOCSTORE_ENCODING");
    }
    assert!(store.is_empty().unwrap());
}

#[tokio::test]
async fn test_bad_collection_is_400() {
    let (router, _) = app();
    let (status, json) = call(&router, Method::POST, "/db/a%3Ab", "{}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "DOCSTORE_INVALID_COLLECTION");
}

#[tokio::test]
async fn test_bad_permanent_flag_is_400() {
    let (router, _) = app();
    let id = create(&router, "notes", "{}").await;
    let (status, json) = call(
        &router,
        Method::DELETE,
        &format!("/db/notes/{}?permanent=maybe", id),
        "",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "DOCSTORE_HTTP_INVALID_QUERY");
}

#[tokio::test]
async fn test_closed_store_is_500() {
    let (router, store) = app();
    store.close().unwrap();
    let (status, json) = call(&router, Method::POST, "/db/notes", "{}").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "DOCSTORE_ENGINE_DATABASE_CLOSED");
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_list_pages() {
    let (router, _) = app();
    let a = create(&router, "notes", "{}").await;
    let b = create(&router, "tasks", "{}").await;
    let c = create(&router, "notes", "{}").await;

    let (status, json) = call(&router, Method::GET, "/db?count=2", "").await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<_> = json["result"]["documents"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["_id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec![a, b]);
    assert_eq!(json["result"]["next_token"], "2");

    let (_, json) = call(&router, Method::GET, "/db?count=2&token=2", "").await;
    assert_eq!(json["result"]["documents"][0]["_id"], c.as_str());
    assert_eq!(json["result"]["next_token"], "4");
}

#[tokio::test]
async fn test_list_defaults_and_clamps_count() {
    let config = HttpServerConfig {
        default_page_size: 2,
        max_page_size: 3,
        ..HttpServerConfig::default()
    };
    let (router, _) = app_with(config);
    for _ in 0..5 {
        create(&router, "notes", "{}").await;
    }

    let (_, json) = call(&router, Method::GET, "/db", "").await;
    assert_eq!(json["result"]["documents"].as_array().unwrap().len(), 2);
    assert_eq!(json["result"]["next_token"], "2");

    let (_, json) = call(&router, Method::GET, "/db?count=100", "").await;
    assert_eq!(json["result"]["documents"].as_array().unwrap().len(), 3);
    assert_eq!(json["result"]["next_token"], "3");
}

#[tokio::test]
async fn test_list_invalid_token_and_count() {
    let (router, _) = app();

    let (status, json) = call(&router, Method::GET, "/db?token=abc", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "DOCSTORE_INVALID_TOKEN");

    let (status, json) = call(&router, Method::GET, "/db?count=-5", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "DOCSTORE_HTTP_INVALID_QUERY");
}
