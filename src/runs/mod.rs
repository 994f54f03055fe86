//! CI run tracking: GitHub Actions dispatch, polling, and status mapping
//!
//! The gateway never drives a run itself. It dispatches a workflow, then
//! mirrors whatever GitHub reports onto the local record. If GitHub never
//! completes the run, the record stays `running` indefinitely; there is no
//! local timeout or cancellation.

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::store::RunStatus;

/// Coarse progress attached to each mapped status
pub mod progress {
    pub const DISPATCHED: u8 = 10;
    pub const QUEUED: u8 = 40;
    pub const RUNNING: u8 = 70;
    pub const FINISHED: u8 = 100;
}

/// Translate an external GitHub run state into the local status enum and a
/// coarse progress percentage.
///
/// `conclusion` is only meaningful once `status` is `completed`.
pub fn map_external(status: &str, conclusion: Option<&str>) -> (RunStatus, u8) {
    match status {
        "completed" => {
            let status = match conclusion {
                Some("success") => RunStatus::Done,
                Some("cancelled") => RunStatus::Cancelled,
                _ => RunStatus::Failed,
            };
            (status, progress::FINISHED)
        }
        "in_progress" => (RunStatus::Running, progress::RUNNING),
        // queued, waiting, requested, pending and anything new GitHub grows
        _ => (RunStatus::Queued, progress::QUEUED),
    }
}

/// An external workflow run as reported by GitHub
#[derive(Debug, Clone, Deserialize)]
pub struct ExternalRun {
    pub id: u64,
    pub status: String,
    pub conclusion: Option<String>,
}

#[derive(Deserialize)]
struct WorkflowRunList {
    #[serde(default)]
    workflow_runs: Vec<ExternalRun>,
}

/// GitHub Actions API client scoped to one repository
pub struct GithubRuns {
    client: reqwest::Client,
    api_base: String,
    repo: String,
    token: SecretString,
}

impl GithubRuns {
    /// Build from gateway config; fails with `NOT_CONFIGURED` when the
    /// token or repo slug is missing.
    pub fn from_config(
        client: &reqwest::Client,
        config: &GatewayConfig,
    ) -> Result<Self, GatewayError> {
        let token = config
            .github
            .token
            .clone()
            .ok_or(GatewayError::NotConfigured("GITHUB_TOKEN"))?;
        let repo = config
            .github
            .repo
            .clone()
            .ok_or(GatewayError::NotConfigured("GITHUB_REPO"))?;
        Ok(Self {
            client: client.clone(),
            api_base: config.github.api_base.trim_end_matches('/').to_string(),
            repo,
            token,
        })
    }

    fn headers(&self) -> Result<HeaderMap, GatewayError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(USER_AGENT, HeaderValue::from_static("charsiu-gateway"));
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.token.expose_secret()))
            .map_err(|_| GatewayError::NotConfigured("GITHUB_TOKEN"))?;
        headers.insert(AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Dispatch a workflow. GitHub acknowledges with 204 and no body.
    pub async fn dispatch(
        &self,
        workflow_id: &str,
        git_ref: &str,
        inputs: &serde_json::Value,
    ) -> Result<(), GatewayError> {
        let url = format!(
            "{}/repos/{}/actions/workflows/{}/dispatches",
            self.api_base, self.repo, workflow_id
        );
        debug!(workflow = workflow_id, git_ref, "dispatching workflow");
        let response = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&serde_json::json!({ "ref": git_ref, "inputs": inputs }))
            .send()
            .await
            .map_err(|e| GatewayError::Network(format!("github: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                provider: "github",
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    /// Most recent run of a workflow, if any
    pub async fn latest_run(&self, workflow_id: &str) -> Result<Option<ExternalRun>, GatewayError> {
        let url = format!(
            "{}/repos/{}/actions/workflows/{}/runs?per_page=1",
            self.api_base, self.repo, workflow_id
        );
        let list: WorkflowRunList = self.get_json(&url).await?;
        Ok(list.workflow_runs.into_iter().next())
    }

    /// Current state of a specific run
    pub async fn run(&self, run_id: u64) -> Result<ExternalRun, GatewayError> {
        let url = format!("{}/repos/{}/actions/runs/{}", self.api_base, self.repo, run_id);
        self.get_json(&url).await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, GatewayError> {
        let response = self
            .client
            .get(url)
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| GatewayError::Network(format!("github: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream {
                provider: "github",
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::BadUpstreamResponse(format!("github: {e}")))
    }
}

/// Fire the configured deploy hook. Body-less POST; the hook's status code
/// is relayed to the caller on failure.
pub async fn trigger_deploy_hook(
    client: &reqwest::Client,
    hook_url: &str,
) -> Result<u16, GatewayError> {
    let response = client
        .post(hook_url)
        .send()
        .await
        .map_err(|e| GatewayError::Network(format!("deploy hook: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(GatewayError::Upstream {
            provider: "vercel",
            status: status.as_u16(),
            message,
        });
    }
    Ok(status.as_u16())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_progress_maps_to_running_at_seventy() {
        assert_eq!(map_external("in_progress", None), (RunStatus::Running, 70));
    }

    #[test]
    fn queued_like_states_map_to_queued() {
        for status in ["queued", "waiting", "requested", "pending"] {
            assert_eq!(map_external(status, None), (RunStatus::Queued, 40));
        }
    }

    #[test]
    fn completed_maps_by_conclusion() {
        assert_eq!(
            map_external("completed", Some("success")),
            (RunStatus::Done, 100)
        );
        assert_eq!(
            map_external("completed", Some("cancelled")),
            (RunStatus::Cancelled, 100)
        );
        for conclusion in [Some("failure"), Some("timed_out"), None] {
            assert_eq!(
                map_external("completed", conclusion),
                (RunStatus::Failed, 100)
            );
        }
    }

    #[test]
    fn github_client_requires_token_and_repo() {
        let client = reqwest::Client::new();
        let mut config = GatewayConfig::default();
        assert!(matches!(
            GithubRuns::from_config(&client, &config),
            Err(GatewayError::NotConfigured("GITHUB_TOKEN"))
        ));

        config.github.token = Some(SecretString::from("ghp_test".to_string()));
        assert!(matches!(
            GithubRuns::from_config(&client, &config),
            Err(GatewayError::NotConfigured("GITHUB_REPO"))
        ));

        config.github.repo = Some("acme/widgets".to_string());
        assert!(GithubRuns::from_config(&client, &config).is_ok());
    }
}
