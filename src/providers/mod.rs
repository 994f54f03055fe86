//! Per-provider wire transforms and upstream forwarding
//!
//! Each provider gets one [`WireFormat`] implementation: a fixed, stateless
//! mapping between the gateway's normalized chat shape and the provider's
//! request/response JSON. OpenAI, DeepSeek and Grok all speak the
//! OpenAI-style chat-completions shape and share one transform; Gemini has
//! its own.
//!
//! Forwarding is a single attempt. Any non-2xx status or network failure is
//! surfaced to the caller as-is; there is no retry, backoff or fallback.

pub mod gemini;
pub mod openai_compat;

use reqwest::header::HeaderMap;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::registry::Provider;
use crate::types::{ChatMessage, Usage};

/// Normalized request handed to a wire transform
#[derive(Debug, Clone)]
pub struct ForwardRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub max_tokens: Option<u32>,
}

/// Normalized reply extracted from a provider response
#[derive(Debug, Clone)]
pub struct ForwardReply {
    pub reply: String,
    pub usage: Option<Usage>,
}

/// Fixed, stateless transform between the normalized chat shape and one
/// provider's wire format.
pub trait WireFormat: Send + Sync {
    /// Full request URL for a chat call
    fn endpoint(&self, base_url: &str, model: &str) -> String;

    /// Auth and content headers for a chat call
    fn headers(&self, api_key: &str) -> Result<HeaderMap, GatewayError>;

    /// Build the provider-specific request body
    fn build_body(&self, req: &ForwardRequest<'_>) -> Result<serde_json::Value, GatewayError>;

    /// Extract the normalized reply from a provider response body
    fn parse_reply(&self, raw: serde_json::Value) -> Result<ForwardReply, GatewayError>;
}

/// Wire transform for a provider
pub fn wire_for(provider: Provider) -> &'static dyn WireFormat {
    match provider {
        Provider::OpenAi => &openai_compat::OPENAI_WIRE,
        Provider::DeepSeek => &openai_compat::DEEPSEEK_WIRE,
        Provider::Grok => &openai_compat::GROK_WIRE,
        Provider::Gemini => &gemini::GeminiWire,
    }
}

/// Forward a normalized chat request to a provider. Single attempt.
///
/// Credentials must be present in the config; a missing key fails with
/// `NOT_CONFIGURED` before any network traffic.
pub async fn forward(
    client: &reqwest::Client,
    config: &GatewayConfig,
    provider: Provider,
    req: ForwardRequest<'_>,
) -> Result<ForwardReply, GatewayError> {
    use secrecy::ExposeSecret;

    let provider_config = config.provider(provider);
    let api_key = provider_config
        .api_key
        .as_ref()
        .ok_or(GatewayError::NotConfigured(match provider {
            Provider::OpenAi => "OPENAI_API_KEY",
            Provider::DeepSeek => "DEEPSEEK_API_KEY",
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::Grok => "XAI_API_KEY",
        }))?;

    let wire = wire_for(provider);
    let url = wire.endpoint(&provider_config.base_url, req.model);
    let headers = wire.headers(api_key.expose_secret())?;
    let body = wire.build_body(&req)?;

    debug!(provider = %provider, model = req.model, "forwarding chat request");

    let response = client
        .post(&url)
        .headers(headers)
        .json(&body)
        .send()
        .await
        .map_err(|e| GatewayError::Network(format!("{provider}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(GatewayError::Upstream {
            provider: provider.as_str(),
            status: status.as_u16(),
            message: extract_upstream_message(&text),
        });
    }

    let raw: serde_json::Value = response
        .json()
        .await
        .map_err(|e| GatewayError::BadUpstreamResponse(format!("{provider}: {e}")))?;
    wire.parse_reply(raw)
}

/// Pull the human-readable message out of a provider error body when the
/// body is the common `{"error": {"message": ...}}` shape, otherwise return
/// the raw text.
fn extract_upstream_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "upstream returned an empty error body".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_message_prefers_structured_error() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(extract_upstream_message(body), "Incorrect API key provided");
    }

    #[test]
    fn upstream_message_falls_back_to_raw_text() {
        assert_eq!(extract_upstream_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(
            extract_upstream_message("  "),
            "upstream returned an empty error body"
        );
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_network_call() {
        let config = GatewayConfig::default();
        let client = reqwest::Client::new();
        let messages = vec![ChatMessage::user("hi")];
        let req = ForwardRequest {
            model: "gpt-4o",
            messages: &messages,
            max_tokens: None,
        };
        match forward(&client, &config, Provider::OpenAi, req).await {
            Err(GatewayError::NotConfigured(what)) => assert_eq!(what, "OPENAI_API_KEY"),
            other => panic!("expected NOT_CONFIGURED, got {other:?}"),
        }
    }
}
