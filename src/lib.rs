//! ragstream - streaming client library for AI inference and RAG backends
//!
//! This library turns newline-delimited JSON streams from an inference
//! backend into incrementally updated views, and follows a live telemetry
//! feed over WebSocket.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `stream`: NDJSON line buffering and event classification
//! - `flows`: the four request flows (LLM, PDF, web, smart) and their runner
//! - `view`: typed panels, HTML and terminal renderers
//! - `api`: HTTP client for the streaming endpoints
//! - `dispatch`: submit gating and Enter-key routing
//! - `telemetry`: reconnecting WebSocket metrics client
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use ragstream::api::ApiClient;
//! use ragstream::dispatch::SubmitGate;
//! use ragstream::flows::{build_flow, run_flow, FlowKind};
//! use ragstream::view::html::HtmlDocument;
//! use ragstream::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let api = ApiClient::new(&config.endpoints.api_url)?;
//!     let mut flow = build_flow(FlowKind::Web, &config, "latest rust release");
//!     let mut document = HtmlDocument::new();
//!     run_flow(&api, flow.as_mut(), &SubmitGate::new(), &mut document).await;
//!     println!("{}", document.to_html());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod flows;
pub mod logging;
pub mod stream;
pub mod telemetry;
pub mod view;

// Re-export commonly used types
pub use config::Config;
pub use error::{RagstreamError, Result};
pub use flows::{Flow, FlowKind, FlowOutcome};
