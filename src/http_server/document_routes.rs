//! Document HTTP Routes
//!
//! - `POST   /db/:collection`      create, body is the document
//! - `GET    /db/:collection/:id`  read
//! - `PUT    /db/:collection/:id`  replace body
//! - `DELETE /db/:collection/:id`  soft delete, `?permanent=true` removes
//! - `GET    /db?count=N&token=T`  list across collections
//!
//! Store calls block on the engine lock and on fsync, so they run on the
//! blocking pool.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::store::{DocumentStore, StoreResult, Timeline};

use super::config::HttpServerConfig;
use super::errors::{ApiError, ApiResult, Envelope};

// ==================
// Shared State
// ==================

/// State shared across document handlers
pub struct DocumentState {
    pub store: Arc<DocumentStore>,
    pub config: HttpServerConfig,
}

impl DocumentState {
    pub fn new(store: Arc<DocumentStore>, config: HttpServerConfig) -> Self {
        Self { store, config }
    }
}

// ==================
// Query Parameters
// ==================

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub count: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// `created` (default), `updated` or `deleted`
    #[serde(default)]
    pub by: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub permanent: Option<String>,
}

fn parse_count(raw: Option<&str>) -> ApiResult<Option<usize>> {
    raw.map(|v| {
        v.parse::<usize>().map_err(|_| ApiError::InvalidQuery {
            name: "count",
            value: v.to_string(),
        })
    })
    .transpose()
}

fn parse_timeline(raw: Option<&str>) -> ApiResult<Timeline> {
    match raw {
        None | Some("") | Some("created") => Ok(Timeline::Created),
        Some("updated") => Ok(Timeline::Updated),
        Some("deleted") => Ok(Timeline::Deleted),
        Some(other) => Err(ApiError::InvalidQuery {
            name: "by",
            value: other.to_string(),
        }),
    }
}

fn parse_flag(name: &'static str, raw: Option<&str>) -> ApiResult<bool> {
    match raw {
        None | Some("") | Some("false") | Some("0") => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some(other) => Err(ApiError::InvalidQuery {
            name,
            value: other.to_string(),
        }),
    }
}

fn body_text(body: Bytes) -> ApiResult<String> {
    String::from_utf8(body.to_vec()).map_err(|e| ApiError::InvalidBody(e.to_string()))
}

async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

// ==================
// Document Routes
// ==================

pub fn document_routes(state: Arc<DocumentState>) -> Router {
    Router::new()
        .route("/db", get(list_handler))
        .route("/db/:collection", post(create_handler))
        .route(
            "/db/:collection/:id",
            get(read_handler).put(update_handler).delete(delete_handler),
        )
        .with_state(state)
}

async fn create_handler(
    State(state): State<Arc<DocumentState>>,
    Path(collection): Path<String>,
    body: Bytes,
) -> ApiResult<Json<Envelope>> {
    let payload = body_text(body)?;
    let store = Arc::clone(&state.store);
    let id = blocking(move || store.create(&collection, &payload)).await?;
    Ok(Json(Envelope::ok(json!({ "id": id }))))
}

async fn read_handler(
    State(state): State<Arc<DocumentState>>,
    Path((collection, id)): Path<(String, String)>,
) -> ApiResult<Json<Envelope>> {
    let store = Arc::clone(&state.store);
    let doc = blocking(move || store.read(&collection, &id)).await?;
    Ok(Json(Envelope::ok(doc)))
}

async fn update_handler(
    State(state): State<Arc<DocumentState>>,
    Path((collection, id)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<Envelope>> {
    let payload = body_text(body)?;
    let store = Arc::clone(&state.store);
    blocking(move || store.update(&collection, &id, &payload)).await?;
    Ok(Json(Envelope::ok(json!({ "success": true }))))
}

async fn delete_handler(
    State(state): State<Arc<DocumentState>>,
    Path((collection, id)): Path<(String, String)>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<Json<Envelope>> {
    let permanent = parse_flag("permanent", query.permanent.as_deref())?;
    let store = Arc::clone(&state.store);
    blocking(move || store.delete(&collection, &id, permanent)).await?;
    Ok(Json(Envelope::ok(json!({ "success": true }))))
}

async fn list_handler(
    State(state): State<Arc<DocumentState>>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Envelope>> {
    let page_size = state
        .config
        .page_size(parse_count(query.count.as_deref())?);
    let timeline = parse_timeline(query.by.as_deref())?;
    let token = query.token.unwrap_or_default();

    let store = Arc::clone(&state.store);
    let page = blocking(move || store.list_by(timeline, page_size, &token)).await?;

    let result = serde_json::to_value(page).map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(Envelope::ok(result)))
}
