//! Usage accounting endpoints

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use crate::error::GatewayError;
use crate::pricing;
use crate::store::NewUsageRow;

#[derive(Debug, Deserialize)]
pub struct RecordUsageBody {
    #[serde(default = "default_route")]
    pub route: String,
    pub provider: String,
    pub model: String,
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_route() -> String {
    "/api/usage".to_string()
}

fn default_status() -> String {
    "ok".to_string()
}

/// `POST /api/usage` — record an explicit usage row
pub async fn record(
    State(state): State<Arc<AppState>>,
    body: Result<Json<RecordUsageBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let Json(body) = body.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;
    if body.provider.is_empty() || body.model.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "provider and model are required".to_string(),
        ));
    }

    let cost = pricing::estimate(
        body.input_tokens as u64,
        body.output_tokens as u64,
        &body.model,
        state.config.fx_rate,
        &state.config.currency,
    );

    let id = state.store.insert_usage(&NewUsageRow {
        route: body.route,
        provider: body.provider,
        model: body.model,
        prompt_tokens: body.input_tokens,
        completion_tokens: body.output_tokens,
        cost_usd: cost.usd,
        cost_local: cost.local,
        currency: cost.currency.clone(),
        status: body.status,
    })?;

    Ok(Json(json!({
        "ok": true,
        "data": {
            "id": id,
            "cost_usd": cost.usd,
            "cost_local": cost.local,
            "currency": cost.currency,
        }
    })))
}

/// `GET /api/usage/summary` — per-provider aggregates
pub async fn summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let rows = state.store.usage_summary()?;
    Ok(Json(json!({ "ok": true, "data": rows })))
}
