//! # Charsiu - A Multi-Provider LLM Gateway
//!
//! Charsiu is an HTTP gateway in front of several LLM providers (OpenAI,
//! DeepSeek, Gemini, Grok/xAI). Each chat endpoint validates the requested
//! model against a static per-provider allow-list, forwards the request to
//! the upstream provider, and relays a normalized response envelope back to
//! the caller. Auxiliary endpoints record usage/cost estimates to a local
//! datastore, dispatch CI workflows, and mirror the status of external runs.
//!
//! ## Design
//!
//! - **Allow-list first**: every chat request is checked against the
//!   provider's allow-list before any upstream call is made.
//! - **Single attempt**: upstream calls are made exactly once; failures are
//!   relayed to the caller with the upstream status, never retried.
//! - **Append-only accounting**: token usage and estimated cost are written
//!   to an append-only log; a logging failure never fails the request that
//!   produced it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use charsiu::config::GatewayConfig;
//! use charsiu::server::{AppState, router};
//! use charsiu::store::Store;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = GatewayConfig::from_env();
//!     let store = Store::open(&config.database_path)?;
//!     let state = Arc::new(AppState::new(config, store));
//!     let app = router(state);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod pricing;
pub mod providers;
pub mod registry;
pub mod runs;
pub mod server;
pub mod store;
pub mod types;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use registry::{Provider, validate_model};
