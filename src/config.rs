//! Gateway configuration
//!
//! All configuration comes from the environment at startup. API keys are
//! wrapped in [`secrecy::SecretString`] so they never show up in debug
//! output or logs.

use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::registry::Provider;

/// Default upstream base URLs, overridable per provider via
/// `<PROVIDER>_BASE_URL` (e.g. `OPENAI_BASE_URL`).
pub mod defaults {
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
    pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com/v1";
    pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
    pub const XAI_BASE_URL: &str = "https://api.x.ai/v1";
    pub const GITHUB_API_BASE: &str = "https://api.github.com";

    pub const BIND_ADDR: &str = "127.0.0.1:8080";
    pub const DATABASE_PATH: &str = "charsiu.db";
    pub const WORKFLOW_ID: &str = "deploy.yml";
    pub const GIT_REF: &str = "main";
}

/// Per-provider upstream settings
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// API key; `None` means the provider is not configured and requests
    /// routed to it fail with `NOT_CONFIGURED`.
    pub api_key: Option<SecretString>,
    pub base_url: String,
}

impl ProviderConfig {
    fn from_env(key_var: &str, base_var: &str, default_base: &str) -> Self {
        Self {
            api_key: read_secret(key_var),
            base_url: std::env::var(base_var).unwrap_or_else(|_| default_base.to_string()),
        }
    }
}

/// GitHub Actions settings for CI dispatch and run polling
#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub token: Option<SecretString>,
    /// `owner/repo` slug
    pub repo: Option<String>,
    pub api_base: String,
    /// Workflow file dispatched when the caller does not name one
    pub default_workflow: String,
}

/// Top-level gateway configuration, read once at startup
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind: SocketAddr,
    pub database_path: PathBuf,
    pub openai: ProviderConfig,
    pub deepseek: ProviderConfig,
    pub gemini: ProviderConfig,
    pub grok: ProviderConfig,
    pub github: GithubConfig,
    /// Vercel deploy hook URL, if deploys are wired up
    pub deploy_hook_url: Option<String>,
    /// USD -> local currency multiplier for cost reporting
    pub fx_rate: f64,
    /// ISO code of the local reporting currency
    pub currency: String,
}

impl GatewayConfig {
    /// Read configuration from the environment, falling back to defaults
    /// for everything except credentials.
    pub fn from_env() -> Self {
        let bind = std::env::var("CHARSIU_ADDR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| defaults::BIND_ADDR.parse().unwrap());

        let fx_rate = std::env::var("FX_RATE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Self {
            bind,
            database_path: std::env::var("CHARSIU_DB")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(defaults::DATABASE_PATH)),
            openai: ProviderConfig::from_env(
                "OPENAI_API_KEY",
                "OPENAI_BASE_URL",
                defaults::OPENAI_BASE_URL,
            ),
            deepseek: ProviderConfig::from_env(
                "DEEPSEEK_API_KEY",
                "DEEPSEEK_BASE_URL",
                defaults::DEEPSEEK_BASE_URL,
            ),
            gemini: ProviderConfig::from_env(
                "GEMINI_API_KEY",
                "GEMINI_BASE_URL",
                defaults::GEMINI_BASE_URL,
            ),
            grok: ProviderConfig::from_env("XAI_API_KEY", "XAI_BASE_URL", defaults::XAI_BASE_URL),
            github: GithubConfig {
                token: read_secret("GITHUB_TOKEN"),
                repo: std::env::var("GITHUB_REPO").ok().filter(|s| !s.is_empty()),
                api_base: std::env::var("GITHUB_API_BASE")
                    .unwrap_or_else(|_| defaults::GITHUB_API_BASE.to_string()),
                default_workflow: std::env::var("GITHUB_WORKFLOW_ID")
                    .unwrap_or_else(|_| defaults::WORKFLOW_ID.to_string()),
            },
            deploy_hook_url: std::env::var("VERCEL_DEPLOY_HOOK_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            fx_rate,
            currency: std::env::var("FX_CURRENCY").unwrap_or_else(|_| "USD".to_string()),
        }
    }

    /// Upstream settings for a provider
    pub fn provider(&self, provider: Provider) -> &ProviderConfig {
        match provider {
            Provider::OpenAi => &self.openai,
            Provider::DeepSeek => &self.deepseek,
            Provider::Gemini => &self.gemini,
            Provider::Grok => &self.grok,
        }
    }
}

impl Default for GatewayConfig {
    /// Unconfigured gateway with standard base URLs and no credentials.
    /// Mostly useful as a starting point in tests.
    fn default() -> Self {
        Self {
            bind: defaults::BIND_ADDR.parse().unwrap(),
            database_path: PathBuf::from(defaults::DATABASE_PATH),
            openai: ProviderConfig {
                api_key: None,
                base_url: defaults::OPENAI_BASE_URL.to_string(),
            },
            deepseek: ProviderConfig {
                api_key: None,
                base_url: defaults::DEEPSEEK_BASE_URL.to_string(),
            },
            gemini: ProviderConfig {
                api_key: None,
                base_url: defaults::GEMINI_BASE_URL.to_string(),
            },
            grok: ProviderConfig {
                api_key: None,
                base_url: defaults::XAI_BASE_URL.to_string(),
            },
            github: GithubConfig {
                token: None,
                repo: None,
                api_base: defaults::GITHUB_API_BASE.to_string(),
                default_workflow: defaults::WORKFLOW_ID.to_string(),
            },
            deploy_hook_url: None,
            fx_rate: 1.0,
            currency: "USD".to_string(),
        }
    }
}

fn read_secret(var: &str) -> Option<SecretString> {
    std::env::var(var)
        .ok()
        .filter(|s| !s.is_empty())
        .map(SecretString::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_no_credentials() {
        let config = GatewayConfig::default();
        assert!(config.openai.api_key.is_none());
        assert!(config.github.token.is_none());
        assert!(config.deploy_hook_url.is_none());
        assert_eq!(config.currency, "USD");
    }

    #[test]
    fn provider_lookup_returns_matching_config() {
        let mut config = GatewayConfig::default();
        config.gemini.base_url = "http://localhost:9999".to_string();
        assert_eq!(
            config.provider(Provider::Gemini).base_url,
            "http://localhost:9999"
        );
        assert_eq!(
            config.provider(Provider::OpenAi).base_url,
            defaults::OPENAI_BASE_URL
        );
    }
}
