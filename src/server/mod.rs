//! HTTP surface of the gateway
//!
//! Router assembly, shared state, and the request-logging layer. Handlers
//! live in the submodules; every handler returns either a success envelope
//! or a [`GatewayError`], which renders itself as the error envelope.

mod chat;
mod runs;
mod usage;

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::info;

use crate::config::GatewayConfig;
use crate::registry::Provider;
use crate::store::Store;

/// Shared state for all handlers: immutable config, one HTTP client, and
/// the datastore. No other state is shared across requests.
pub struct AppState {
    pub config: GatewayConfig,
    pub http: reqwest::Client,
    pub store: Store,
}

impl AppState {
    pub fn new(config: GatewayConfig, store: Store) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            store,
        }
    }
}

/// Build the gateway router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/models", get(models))
        .route("/api/chat/{provider}", post(chat::chat))
        .route("/api/usage", post(usage::record))
        .route("/api/usage/summary", get(usage::summary))
        .route("/api/runs/dispatch", post(runs::dispatch))
        .route("/api/runs/{id}", get(runs::status))
        .route("/api/deploy", post(runs::deploy))
        .layer(middleware::from_fn(request_logging))
        .with_state(state)
}

/// Log method, path, status and latency for every request
async fn request_logging(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let start = Instant::now();
    let response = next.run(req).await;
    info!(
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "request"
    );
    response
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "ok": true,
        "service": "charsiu",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Allow-list table, one entry per provider
async fn models(State(_state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let mut data = serde_json::Map::new();
    for provider in Provider::ALL {
        data.insert(
            provider.as_str().to_string(),
            json!(provider.allowed_models()),
        );
    }
    Json(json!({ "ok": true, "data": data }))
}
