//! HTTP adapter: translates requests into store calls and serves the pages.
//!
//! Methods that a route does not list are answered with `405 Method Not
//! Allowed` by the method router before any handler runs, so rejected calls
//! never touch the store or its request counter.

use std::{path::Path, sync::Arc};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path as UrlPath, State},
    http::StatusCode,
    routing::{delete, get},
};
use serde_json::{Value, json};
use tower_http::{
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{
    error::ApiError,
    store::{Entries, Store, StoreStats},
};

/// Full application router: JSON API, static pages, request tracing.
pub fn router(store: Arc<Store>, public_dir: &Path, views_dir: &Path) -> Router {
    api_router(store)
        .merge(pages_router(public_dir, views_dir))
        .layer(TraceLayer::new_for_http())
}

pub fn api_router(store: Arc<Store>) -> Router {
    Router::new()
        .route(
            "/api/data",
            get(list_entries)
                .head(method_not_allowed)
                .post(merge_entries),
        )
        .route("/api/data/", delete(missing_key))
        .route("/api/data/:key", delete(delete_entry))
        // Only the first segment names the key; anything after it is ignored.
        .route("/api/data/:key/*rest", delete(delete_leading_key))
        .route("/api/stats", get(stats).head(method_not_allowed))
        .with_state(store)
}

/// Static assets under `/public` and the three HTML views.
pub fn pages_router(public_dir: &Path, views_dir: &Path) -> Router {
    Router::new()
        .nest_service("/public", ServeDir::new(public_dir))
        .route_service("/", ServeFile::new(views_dir.join("index.html")))
        .route_service("/index", ServeFile::new(views_dir.join("index.html")))
        .route_service("/data", ServeFile::new(views_dir.join("data.html")))
        .route_service("/stats", ServeFile::new(views_dir.join("stats.html")))
}

async fn merge_entries(
    State(store): State<Arc<Store>>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let updates: Entries = serde_json::from_slice(&body).map_err(ApiError::InvalidJson)?;
    store.put(updates);
    Ok(Json(json!({ "status": "ok" })))
}

async fn list_entries(State(store): State<Arc<Store>>) -> Json<Entries> {
    Json(store.get_all())
}

async fn delete_entry(
    State(store): State<Arc<Store>>,
    UrlPath(key): UrlPath<String>,
) -> Result<Json<Value>, ApiError> {
    remove_key(&store, key)
}

async fn delete_leading_key(
    State(store): State<Arc<Store>>,
    UrlPath((key, _rest)): UrlPath<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    remove_key(&store, key)
}

fn remove_key(store: &Store, key: String) -> Result<Json<Value>, ApiError> {
    if !store.delete(&key) {
        return Err(ApiError::KeyNotFound(key));
    }
    Ok(Json(json!({ "deleted": key })))
}

// `get` also answers HEAD, which would count as a request.
async fn method_not_allowed() -> StatusCode {
    StatusCode::METHOD_NOT_ALLOWED
}

async fn missing_key() -> ApiError {
    ApiError::MissingKey
}

async fn stats(State(store): State<Arc<Store>>) -> Json<StoreStats> {
    Json(store.stats())
}
