//! Run dispatch, status polling, and deploy-hook endpoints

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::AppState;
use crate::error::GatewayError;
use crate::runs::{self, GithubRuns, map_external};
use crate::store::RunRecord;

#[derive(Debug, Default, Deserialize)]
pub struct DispatchBody {
    pub workflow_id: Option<String>,
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub inputs: serde_json::Value,
}

/// `POST /api/runs/dispatch` — dispatch a workflow and create the local
/// run record in `queued`.
pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    body: Result<Json<DispatchBody>, JsonRejection>,
) -> Result<(StatusCode, Json<serde_json::Value>), GatewayError> {
    // A body is optional; dispatch with defaults when none was sent
    let body = match body {
        Ok(Json(body)) => body,
        Err(JsonRejection::MissingJsonContentType(_)) => DispatchBody::default(),
        Err(e) => return Err(GatewayError::InvalidRequest(e.body_text())),
    };
    let workflow_id = body
        .workflow_id
        .unwrap_or_else(|| state.config.github.default_workflow.clone());
    let git_ref = body
        .git_ref
        .unwrap_or_else(|| crate::config::defaults::GIT_REF.to_string());
    let inputs = if body.inputs.is_null() {
        json!({})
    } else {
        body.inputs
    };

    let github = GithubRuns::from_config(&state.http, &state.config)?;
    github.dispatch(&workflow_id, &git_ref, &inputs).await?;

    let record = state
        .store
        .create_run(&workflow_id, &format!("dispatched {workflow_id} @ {git_ref}"))?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "ok": true,
            "data": {
                "id": record.id,
                "status": record.status,
                "progress": record.progress,
            }
        })),
    ))
}

/// `GET /api/runs/{id}` — stored record refreshed by a live poll while the
/// run is still in flight.
pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let record = state
        .store
        .get_run(&id)?
        .ok_or_else(|| GatewayError::NotFound(format!("run {id}")))?;

    let record = if record.status.is_terminal() {
        record
    } else {
        refresh_from_github(&state, record).await
    };

    Ok(Json(json!({
        "ok": true,
        "data": {
            "id": record.id,
            "status": record.status,
            "progress": record.progress,
            "updated_at": record.updated_at,
        }
    })))
}

/// Mirror the external run state onto the record. The poll is best-effort;
/// when it fails the stored record is served as-is.
async fn refresh_from_github(state: &AppState, record: RunRecord) -> RunRecord {
    let github = match GithubRuns::from_config(&state.http, &state.config) {
        Ok(github) => github,
        Err(_) => return record,
    };

    let external = match record.external_id {
        Some(external_id) => github.run(external_id).await.map(Some),
        None => {
            // Record was dispatched before GitHub assigned it a run id;
            // adopt the newest run of the workflow it was dispatched for.
            match github.latest_run(&record.workflow).await {
                Ok(Some(run)) => {
                    if let Err(e) = state.store.bind_external(&record.id, run.id) {
                        warn!(run = %record.id, error = %e, "failed to bind external run id");
                    }
                    Ok(Some(run))
                }
                other => other,
            }
        }
    };

    match external {
        Ok(Some(run)) => {
            let (status, progress) = map_external(&run.status, run.conclusion.as_deref());
            let line = format!("external status: {}", run.status);
            match state
                .store
                .update_run(&record.id, status, progress, Some(&line))
            {
                Ok(updated) => updated,
                Err(e) => {
                    warn!(run = %record.id, error = %e, "failed to update run record");
                    record
                }
            }
        }
        Ok(None) => record,
        Err(e) => {
            warn!(run = %record.id, error = %e, "run poll failed, serving stored record");
            record
        }
    }
}

/// `POST /api/deploy` — fire the configured deploy hook
pub async fn deploy(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, GatewayError> {
    let hook_url = state
        .config
        .deploy_hook_url
        .as_deref()
        .ok_or(GatewayError::NotConfigured("VERCEL_DEPLOY_HOOK_URL"))?;

    let status = runs::trigger_deploy_hook(&state.http, hook_url).await?;
    Ok(Json(json!({ "ok": true, "status": status })))
}
