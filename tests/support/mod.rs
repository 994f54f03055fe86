//! Shared helpers for gateway integration tests
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use secrecy::SecretString;
use tower::ServiceExt;

use charsiu::config::GatewayConfig;
use charsiu::server::{AppState, router};
use charsiu::store::Store;

/// Router over an in-memory store
pub fn app(config: GatewayConfig) -> Router {
    let store = Store::open_in_memory().expect("in-memory store");
    router(Arc::new(AppState::new(config, store)))
}

/// Config with every provider keyed and pointed at `base_url`
pub fn configured_providers(base_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    for provider in [
        &mut config.openai,
        &mut config.deepseek,
        &mut config.gemini,
        &mut config.grok,
    ] {
        provider.api_key = Some(SecretString::from("test-key".to_string()));
        provider.base_url = base_url.to_string();
    }
    config
}

/// Config with GitHub dispatch/polling wired at `api_base`
pub fn configured_github(api_base: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.github.token = Some(SecretString::from("ghp_test".to_string()));
    config.github.repo = Some("acme/widgets".to_string());
    config.github.api_base = api_base.to_string();
    config
}

/// Send a JSON request through the router and decode the JSON response
pub async fn send_json(
    app: Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.expect("router response");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("response body")
        .to_bytes();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| panic!("non-JSON response body: {:?}", bytes));
    (status, value)
}
