//! Chat endpoint: validate against the allow-list, forward, account usage

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use tracing::warn;

use super::AppState;
use crate::error::GatewayError;
use crate::pricing;
use crate::providers::{self, ForwardRequest};
use crate::registry::{Provider, validate_model};
use crate::store::NewUsageRow;
use crate::types::{ChatEnvelope, ChatRequestBody};

/// `POST /api/chat/{provider}`
///
/// The allow-list check runs before anything touches the network; the
/// upstream call is a single attempt.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Path(provider_name): Path<String>,
    body: Result<Json<ChatRequestBody>, JsonRejection>,
) -> Result<Json<ChatEnvelope>, GatewayError> {
    let provider = Provider::parse(&provider_name)
        .ok_or_else(|| GatewayError::UnknownProvider(provider_name.clone()))?;

    let Json(body) = body.map_err(|e| GatewayError::InvalidRequest(e.body_text()))?;

    validate_model(&provider_name, body.model.as_deref())?;
    // validate_model guarantees a non-empty model from here on
    let model = body.model.as_deref().unwrap_or_default();

    if body.messages.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "messages must not be empty".to_string(),
        ));
    }

    let reply = providers::forward(
        &state.http,
        &state.config,
        provider,
        ForwardRequest {
            model,
            messages: &body.messages,
            max_tokens: body.max_tokens,
        },
    )
    .await?;

    // Accounting is best-effort: a failed write never fails the chat reply
    if let Some(usage) = reply.usage {
        let cost = pricing::estimate(
            usage.prompt_tokens as u64,
            usage.completion_tokens as u64,
            model,
            state.config.fx_rate,
            &state.config.currency,
        );
        let row = NewUsageRow {
            route: format!("/api/chat/{provider}"),
            provider: provider.as_str().to_string(),
            model: model.to_string(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            cost_usd: cost.usd,
            cost_local: cost.local,
            currency: cost.currency,
            status: "ok".to_string(),
        };
        if let Err(e) = state.store.insert_usage(&row) {
            warn!(provider = %provider, error = %e, "failed to record usage row");
        }
    }

    Ok(Json(ChatEnvelope {
        ok: true,
        provider: provider.as_str(),
        model: model.to_string(),
        reply: reply.reply,
        usage: reply.usage,
    }))
}
