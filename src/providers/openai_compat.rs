//! OpenAI-style chat-completions wire format
//!
//! Shared by OpenAI, DeepSeek and Grok/xAI, which differ only in base URL
//! and credentials. Replies come back as
//! `choices[0].message.content`.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::{ForwardReply, ForwardRequest, WireFormat};
use crate::error::GatewayError;
use crate::types::{ChatMessage, Usage};

pub static OPENAI_WIRE: OpenAiCompatWire = OpenAiCompatWire { provider: "openai" };
pub static DEEPSEEK_WIRE: OpenAiCompatWire = OpenAiCompatWire {
    provider: "deepseek",
};
pub static GROK_WIRE: OpenAiCompatWire = OpenAiCompatWire { provider: "grok" };

/// Wire transform for any provider speaking the chat-completions shape
pub struct OpenAiCompatWire {
    provider: &'static str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

impl WireFormat for OpenAiCompatWire {
    fn endpoint(&self, base_url: &str, _model: &str) -> String {
        format!("{}/chat/completions", base_url.trim_end_matches('/'))
    }

    fn headers(&self, api_key: &str) -> Result<HeaderMap, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let bearer = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| GatewayError::InvalidRequest("API key contains invalid characters".to_string()))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    fn build_body(&self, req: &ForwardRequest<'_>) -> Result<serde_json::Value, GatewayError> {
        let body = ChatCompletionRequest {
            model: req.model,
            messages: req.messages,
            max_tokens: req.max_tokens,
        };
        serde_json::to_value(body).map_err(|e| GatewayError::Internal(e.to_string()))
    }

    fn parse_reply(&self, raw: serde_json::Value) -> Result<ForwardReply, GatewayError> {
        let response: ChatCompletionResponse = serde_json::from_value(raw)
            .map_err(|e| GatewayError::BadUpstreamResponse(format!("{}: {e}", self.provider)))?;
        let reply = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                GatewayError::BadUpstreamResponse(format!(
                    "{}: response carried no choices",
                    self.provider
                ))
            })?;
        let usage = response
            .usage
            .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens));
        Ok(ForwardReply { reply, usage })
    }
}
