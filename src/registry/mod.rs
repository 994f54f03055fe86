//! Provider identity and model allow-lists
//!
//! The allow-lists are static, defined at compile time, and consulted before
//! any upstream call. Adding a provider is one enum variant, one allow-list
//! constant, and one wire transform under [`crate::providers`].

use crate::error::GatewayError;

/// Models each provider integration is permitted to route to.
///
/// Exact, case-sensitive membership; order is preserved in rejection
/// responses.
pub const OPENAI_MODELS: &[&str] = &["gpt-4o", "gpt-4o-mini"];
pub const DEEPSEEK_MODELS: &[&str] = &["deepseek-chat", "deepseek-reasoner"];
pub const GEMINI_MODELS: &[&str] = &["gemini-2.0-flash", "gemini-1.5-pro"];
pub const GROK_MODELS: &[&str] = &["grok-2-latest", "grok-2-mini"];

/// Provider identity, the dispatch key for wire transforms and credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAi,
    DeepSeek,
    Gemini,
    Grok,
}

impl Provider {
    pub const ALL: &[Provider] = &[
        Provider::OpenAi,
        Provider::DeepSeek,
        Provider::Gemini,
        Provider::Grok,
    ];

    /// Canonical provider id as it appears in routes and logs
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::DeepSeek => "deepseek",
            Self::Gemini => "gemini",
            Self::Grok => "grok",
        }
    }

    /// Resolve a provider id or alias
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "openai" => Some(Self::OpenAi),
            "deepseek" => Some(Self::DeepSeek),
            "gemini" => Some(Self::Gemini),
            "grok" | "xai" => Some(Self::Grok),
            _ => None,
        }
    }

    /// The provider's model allow-list
    pub const fn allowed_models(self) -> &'static [&'static str] {
        match self {
            Self::OpenAi => OPENAI_MODELS,
            Self::DeepSeek => DEEPSEEK_MODELS,
            Self::Gemini => GEMINI_MODELS,
            Self::Grok => GROK_MODELS,
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Allow-list for a provider name; unknown providers get an empty list
/// rather than a distinct error.
pub fn allowed_models_for(provider: &str) -> &'static [&'static str] {
    Provider::parse(provider)
        .map(Provider::allowed_models)
        .unwrap_or(&[])
}

/// Decide whether a `(provider, model)` pair may proceed upstream.
///
/// - Missing or empty model rejects with `MODEL_REQUIRED`.
/// - A model outside the provider's allow-list rejects with
///   `MODEL_NOT_ALLOWED`.
///
/// Both rejections carry the provider's allow-list verbatim. Pure function;
/// must run before any upstream network call.
pub fn validate_model(provider: &str, model: Option<&str>) -> Result<(), GatewayError> {
    let allow = allowed_models_for(provider);
    match model {
        None | Some("") => Err(GatewayError::ModelRequired { allow }),
        Some(m) if !allow.contains(&m) => Err(GatewayError::ModelNotAllowed {
            model: m.to_string(),
            allow,
        }),
        Some(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_allowed_model_is_accepted() {
        for provider in Provider::ALL {
            for &model in provider.allowed_models() {
                assert!(
                    validate_model(provider.as_str(), Some(model)).is_ok(),
                    "{provider}/{model} should be accepted"
                );
            }
        }
    }

    #[test]
    fn missing_model_is_rejected_with_allow_list() {
        for provider in Provider::ALL {
            for model in [None, Some("")] {
                match validate_model(provider.as_str(), model) {
                    Err(GatewayError::ModelRequired { allow }) => {
                        assert_eq!(allow, provider.allowed_models());
                    }
                    other => panic!("expected MODEL_REQUIRED, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn disallowed_model_is_rejected_with_allow_list() {
        match validate_model("openai", Some("gpt-5")) {
            Err(GatewayError::ModelNotAllowed { model, allow }) => {
                assert_eq!(model, "gpt-5");
                assert_eq!(allow, ["gpt-4o", "gpt-4o-mini"]);
            }
            other => panic!("expected MODEL_NOT_ALLOWED, got {other:?}"),
        }
    }

    #[test]
    fn membership_is_case_sensitive() {
        assert!(matches!(
            validate_model("openai", Some("GPT-4o")),
            Err(GatewayError::ModelNotAllowed { .. })
        ));
    }

    #[test]
    fn unknown_provider_yields_empty_allow_list() {
        assert!(allowed_models_for("mistral").is_empty());
        match validate_model("mistral", Some("mistral-large")) {
            Err(GatewayError::ModelNotAllowed { allow, .. }) => assert!(allow.is_empty()),
            other => panic!("expected MODEL_NOT_ALLOWED, got {other:?}"),
        }
        match validate_model("mistral", None) {
            Err(GatewayError::ModelRequired { allow }) => assert!(allow.is_empty()),
            other => panic!("expected MODEL_REQUIRED, got {other:?}"),
        }
    }

    #[test]
    fn xai_is_an_alias_for_grok() {
        assert_eq!(Provider::parse("xai"), Some(Provider::Grok));
        assert!(validate_model("xai", Some("grok-2-latest")).is_ok());
    }
}
