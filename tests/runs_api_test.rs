//! Run dispatch/polling and deploy-hook integration tests

mod support;

use axum::http::StatusCode;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use charsiu::config::GatewayConfig;
use support::{app, configured_github, send_json};

#[tokio::test]
async fn dispatch_without_github_config_is_not_configured() {
    let app = app(GatewayConfig::default());
    let (status, body) = send_json(app, "POST", "/api/runs/dispatch", Some(json!({}))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "NOT_CONFIGURED");
}

#[tokio::test]
async fn dispatch_creates_a_queued_run_record() {
    let github = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/repos/acme/widgets/actions/workflows/deploy.yml/dispatches",
        ))
        .and(header("authorization", "Bearer ghp_test"))
        .and(body_partial_json(json!({"ref": "main"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&github)
        .await;

    let app = app(configured_github(&github.uri()));
    let (status, body) = send_json(app, "POST", "/api/runs/dispatch", Some(json!({}))).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"]["status"], "queued");
    assert_eq!(body["data"]["progress"], 10);
    assert!(body["data"]["id"].as_str().is_some());
}

#[tokio::test]
async fn dispatch_forwards_workflow_ref_and_inputs() {
    let github = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/repos/acme/widgets/actions/workflows/release.yml/dispatches",
        ))
        .and(body_partial_json(json!({
            "ref": "staging",
            "inputs": {"channel": "beta"}
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&github)
        .await;

    let app = app(configured_github(&github.uri()));
    let (status, _) = send_json(
        app,
        "POST",
        "/api/runs/dispatch",
        Some(json!({
            "workflow_id": "release.yml",
            "ref": "staging",
            "inputs": {"channel": "beta"},
        })),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn rejected_dispatch_relays_the_github_status() {
    let github = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/repos/acme/widgets/actions/workflows/deploy.yml/dispatches",
        ))
        .respond_with(ResponseTemplate::new(422).set_body_string("No ref found"))
        .mount(&github)
        .await;

    let app = app(configured_github(&github.uri()));
    let (status, body) = send_json(app, "POST", "/api/runs/dispatch", Some(json!({}))).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "UPSTREAM_ERROR");
    assert_eq!(body["provider"], "github");
}

#[tokio::test]
async fn polling_mirrors_external_progress_until_terminal() {
    let github = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/repos/acme/widgets/actions/workflows/deploy.yml/dispatches",
        ))
        .respond_with(ResponseTemplate::new(204))
        .mount(&github)
        .await;

    // First poll: record has no external id yet, so the newest workflow
    // run is adopted; it reports in_progress.
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/actions/workflows/deploy.yml/runs"))
        .and(query_param("per_page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workflow_runs": [{"id": 42, "status": "in_progress", "conclusion": null}]
        })))
        .expect(1)
        .mount(&github)
        .await;

    // Second poll goes straight to the bound run, now completed.
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/actions/runs/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42, "status": "completed", "conclusion": "success"
        })))
        .expect(1)
        .mount(&github)
        .await;

    let app = app(configured_github(&github.uri()));
    let (_, dispatched) = send_json(
        app.clone(),
        "POST",
        "/api/runs/dispatch",
        Some(json!({})),
    )
    .await;
    let id = dispatched["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send_json(app.clone(), "GET", &format!("/api/runs/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "running");
    assert_eq!(body["data"]["progress"], 70);

    let (_, body) = send_json(app.clone(), "GET", &format!("/api/runs/{id}"), None).await;
    assert_eq!(body["data"]["status"], "done");
    assert_eq!(body["data"]["progress"], 100);

    // Terminal records are served from the store; the expect(1) mocks
    // above verify no further GitHub traffic happens.
    let (_, body) = send_json(app, "GET", &format!("/api/runs/{id}"), None).await;
    assert_eq!(body["data"]["status"], "done");
}

#[tokio::test]
async fn polling_follows_the_dispatched_workflow() {
    let github = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/repos/acme/widgets/actions/workflows/release.yml/dispatches",
        ))
        .respond_with(ResponseTemplate::new(204))
        .mount(&github)
        .await;

    // The default workflow has a finished run; a record dispatched for
    // release.yml must never adopt it.
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/actions/workflows/deploy.yml/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workflow_runs": [{"id": 999, "status": "completed", "conclusion": "success"}]
        })))
        .expect(0)
        .mount(&github)
        .await;

    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/actions/workflows/release.yml/runs"))
        .and(query_param("per_page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "workflow_runs": [{"id": 7, "status": "in_progress", "conclusion": null}]
        })))
        .expect(1)
        .mount(&github)
        .await;

    let app = app(configured_github(&github.uri()));
    let (_, dispatched) = send_json(
        app.clone(),
        "POST",
        "/api/runs/dispatch",
        Some(json!({"workflow_id": "release.yml"})),
    )
    .await;
    let id = dispatched["data"]["id"].as_str().unwrap();

    let (status, body) = send_json(app, "GET", &format!("/api/runs/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "running");
    assert_eq!(body["data"]["progress"], 70);
}

#[tokio::test]
async fn poll_failure_serves_the_stored_record() {
    let github = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(
            "/repos/acme/widgets/actions/workflows/deploy.yml/dispatches",
        ))
        .respond_with(ResponseTemplate::new(204))
        .mount(&github)
        .await;
    Mock::given(method("GET"))
        .and(path("/repos/acme/widgets/actions/workflows/deploy.yml/runs"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&github)
        .await;

    let app = app(configured_github(&github.uri()));
    let (_, dispatched) = send_json(
        app.clone(),
        "POST",
        "/api/runs/dispatch",
        Some(json!({})),
    )
    .await;
    let id = dispatched["data"]["id"].as_str().unwrap();

    let (status, body) = send_json(app, "GET", &format!("/api/runs/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "queued");
    assert_eq!(body["data"]["progress"], 10);
}

#[tokio::test]
async fn unknown_run_is_a_404() {
    let app = app(GatewayConfig::default());
    let (status, body) = send_json(app, "GET", "/api/runs/no-such-run", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn deploy_without_hook_is_not_configured() {
    let app = app(GatewayConfig::default());
    let (status, body) = send_json(app, "POST", "/api/deploy", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "NOT_CONFIGURED");
}

#[tokio::test]
async fn deploy_fires_the_hook_and_relays_acceptance() {
    let hook = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook/abc123"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"job": "created"})))
        .expect(1)
        .mount(&hook)
        .await;

    let mut config = GatewayConfig::default();
    config.deploy_hook_url = Some(format!("{}/hook/abc123", hook.uri()));
    let app = app(config);

    let (status, body) = send_json(app, "POST", "/api/deploy", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["status"], 201);
}
