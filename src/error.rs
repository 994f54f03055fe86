//! Error types for the gateway
//!
//! Every error carries a machine-readable code and maps to an HTTP status.
//! The taxonomy distinguishes four classes:
//!
//! - **Validation** (4xx): the caller sent something we refuse to forward.
//! - **Configuration** (503): a credential or config value is missing, so
//!   operators can tell "we're misconfigured" from "upstream is down".
//! - **Upstream** (relayed status or 502): a provider or external API failed.
//! - **Internal** (500): storage failures and anything unexpected caught at
//!   the handler boundary.
//!
//! No error is retried; no error escalates beyond the response to the
//! immediate caller.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Gateway error taxonomy
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Chat request arrived without a model
    #[error("model is required")]
    ModelRequired { allow: &'static [&'static str] },

    /// Requested model is not in the provider's allow-list
    #[error("model '{model}' is not allowed")]
    ModelNotAllowed {
        model: String,
        allow: &'static [&'static str],
    },

    /// Route names a provider this gateway does not know
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// Malformed or incomplete request body
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A credential or config value required for this route is missing
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// Upstream returned a non-2xx status
    #[error("upstream {provider} returned {status}: {message}")]
    Upstream {
        provider: &'static str,
        status: u16,
        message: String,
    },

    /// The request never reached the upstream (DNS, connect, timeout)
    #[error("network error: {0}")]
    Network(String),

    /// Upstream answered 2xx but the body did not match its wire format
    #[error("unexpected upstream response: {0}")]
    BadUpstreamResponse(String),

    /// Datastore failure
    #[error("storage error: {0}")]
    Storage(String),

    /// Requested record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Anything unexpected caught at the handler boundary
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Machine-readable error code for the response envelope
    pub fn code(&self) -> &'static str {
        match self {
            Self::ModelRequired { .. } => "MODEL_REQUIRED",
            Self::ModelNotAllowed { .. } => "MODEL_NOT_ALLOWED",
            Self::UnknownProvider(_) => "UNKNOWN_PROVIDER",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::NotConfigured(_) => "NOT_CONFIGURED",
            Self::Upstream { .. } => "UPSTREAM_ERROR",
            Self::Network(_) => "NETWORK_ERROR",
            Self::BadUpstreamResponse(_) => "BAD_UPSTREAM_RESPONSE",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// HTTP status for this error. Upstream errors relay the upstream
    /// status where it is a valid HTTP code, falling back to 502.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::ModelRequired { .. } | Self::ModelNotAllowed { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::UnknownProvider(_) | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            Self::Network(_) | Self::BadUpstreamResponse(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "ok": false,
            "error": self.code(),
            "message": self.to_string(),
        });
        match &self {
            GatewayError::ModelRequired { allow } | GatewayError::ModelNotAllowed { allow, .. } => {
                body["allow"] = json!(allow);
            }
            GatewayError::Upstream {
                provider, status, ..
            } => {
                body["provider"] = json!(provider);
                body["status"] = json!(status);
            }
            _ => {}
        }
        (self.status(), Json(body)).into_response()
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
