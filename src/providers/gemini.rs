//! Gemini `generateContent` wire format
//!
//! Gemini takes the model in the URL path, system messages as a separate
//! `systemInstruction`, and replies as
//! `candidates[0].content.parts[].text`.

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::{ForwardReply, ForwardRequest, WireFormat};
use crate::error::GatewayError;
use crate::types::{ChatMessage, MessageRole, Usage};

pub struct GeminiWire;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
}

/// Convert a non-system message to a Gemini content block. System messages
/// are collected into `systemInstruction` instead and yield `None` here.
fn convert_message(message: &ChatMessage) -> Option<Content> {
    let role = match message.role {
        MessageRole::User => "user",
        MessageRole::Assistant => "model",
        MessageRole::System => return None,
    };
    Some(Content {
        role: Some(role.to_string()),
        parts: vec![Part {
            text: message.content.clone(),
        }],
    })
}

impl WireFormat for GeminiWire {
    fn endpoint(&self, base_url: &str, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model
        )
    }

    fn headers(&self, api_key: &str) -> Result<HeaderMap, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(api_key).map_err(|_| {
            GatewayError::InvalidRequest("API key contains invalid characters".to_string())
        })?;
        headers.insert("x-goog-api-key", key);
        Ok(headers)
    }

    fn build_body(&self, req: &ForwardRequest<'_>) -> Result<serde_json::Value, GatewayError> {
        let mut contents = Vec::new();
        let mut system_texts = Vec::new();

        for message in req.messages {
            match convert_message(message) {
                Some(content) => contents.push(content),
                None => {
                    if !message.content.is_empty() {
                        system_texts.push(message.content.as_str());
                    }
                }
            }
        }

        let system_instruction = if system_texts.is_empty() {
            None
        } else {
            Some(Content {
                role: None,
                parts: vec![Part {
                    text: system_texts.join(" "),
                }],
            })
        };

        let body = GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: req.max_tokens.map(|max_output_tokens| GenerationConfig {
                max_output_tokens,
            }),
        };
        serde_json::to_value(body).map_err(|e| GatewayError::Internal(e.to_string()))
    }

    fn parse_reply(&self, raw: serde_json::Value) -> Result<ForwardReply, GatewayError> {
        let response: GenerateContentResponse = serde_json::from_value(raw)
            .map_err(|e| GatewayError::BadUpstreamResponse(format!("gemini: {e}")))?;
        let content = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| {
                GatewayError::BadUpstreamResponse(
                    "gemini: response carried no candidates".to_string(),
                )
            })?;
        let reply = content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect::<Vec<_>>()
            .join("");
        let usage = response
            .usage_metadata
            .map(|u| Usage::new(u.prompt_token_count, u.candidates_token_count));
        Ok(ForwardReply { reply, usage })
    }
}
