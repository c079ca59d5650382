//! Streaming request flows
//!
//! A flow owns one submission: it validates the input, builds the request
//! body, and turns classified stream events into view updates. The four
//! flows share [`run_flow`], which drives the request and stream and makes
//! sure the flow's [`SubmitGate`] is released on every path.

pub mod llm;
pub mod pdf;
pub mod progress;
pub mod smart;
pub mod web;

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::ApiClient;
use crate::config::Config;
use crate::dispatch::SubmitGate;
use crate::error::Result;
use crate::stream::{consume, StreamEvent, StreamStats};
use crate::view::{Panel, ViewSink, ViewUpdate};

pub use llm::LlmFlow;
pub use pdf::PdfFlow;
pub use smart::SmartFlow;
pub use web::WebFlow;

/// The four request flows
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FlowKind {
    /// Plain LLM generation
    Llm,
    /// Question over indexed PDFs
    Pdf,
    /// Web-search RAG
    Web,
    /// Server-routed between web RAG and the local model
    Smart,
}

impl fmt::Display for FlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Llm => write!(f, "llm"),
            Self::Pdf => write!(f, "pdf"),
            Self::Web => write!(f, "web"),
            Self::Smart => write!(f, "smart"),
        }
    }
}

impl FlowKind {
    /// Every flow, in display order
    pub const ALL: [FlowKind; 4] = [Self::Llm, Self::Pdf, Self::Web, Self::Smart];

    /// Endpoint path the flow POSTs to
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Llm => "/api/generate",
            Self::Pdf => "/api/ask",
            Self::Web => "/api/rag",
            Self::Smart => "/api/chat-smart",
        }
    }

    /// Human-readable name
    pub fn label(&self) -> &'static str {
        match self {
            Self::Llm => "Local LLM",
            Self::Pdf => "PDF Knowledge Base",
            Self::Web => "Web Search",
            Self::Smart => "Smart AI",
        }
    }

    /// Parse a flow name
    ///
    /// # Examples
    ///
    /// ```
    /// use ragstream::flows::FlowKind;
    ///
    /// assert_eq!(FlowKind::parse_str("WEB").unwrap(), FlowKind::Web);
    /// assert!(FlowKind::parse_str("fax").is_err());
    /// ```
    pub fn parse_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "llm" => Ok(Self::Llm),
            "pdf" => Ok(Self::Pdf),
            "web" => Ok(Self::Web),
            "smart" => Ok(Self::Smart),
            other => Err(format!("Unknown flow: {}", other)),
        }
    }
}

/// Outcome of validating a flow's input before sending anything
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputCheck {
    /// Send the request
    Ready,
    /// Do nothing
    Ignore,
    /// Show a warning panel instead of sending
    Warn(String),
}

/// Result of one [`run_flow`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
    /// Empty input, nothing shown
    Ignored,
    /// Input rejected with a warning panel
    Warned,
    /// A run for this flow was already in flight
    Busy,
    /// Stream consumed to the end
    Streamed {
        /// A completion event reached the flow
        finalized: bool,
    },
    /// Request or stream failed; the flow showed its error panel
    Failed(String),
}

/// One submission of a request flow.
///
/// Handlers return the view updates to apply, in order. They never fail:
/// malformed data has already been filtered out by the stream layer, and
/// server-reported errors are display state.
pub trait Flow: Send {
    /// Which flow this is
    fn kind(&self) -> FlowKind;

    /// Endpoint path to POST to
    fn endpoint(&self) -> &'static str {
        self.kind().endpoint()
    }

    /// Validate the input
    fn check_input(&self) -> InputCheck;

    /// JSON body of the request
    fn request_body(&self) -> Result<Value>;

    /// Start timing and return the pending view
    fn begin(&mut self) -> Vec<ViewUpdate>;

    /// Response headers arrived with a success status
    fn stream_opened(&mut self) -> Vec<ViewUpdate> {
        Vec::new()
    }

    /// Handle one event
    fn handle_event(&mut self, event: StreamEvent) -> Vec<ViewUpdate>;

    /// Handle the events of one line, in classification order
    fn handle_line(&mut self, events: Vec<StreamEvent>) -> Vec<ViewUpdate> {
        let mut updates = Vec::new();
        for event in events {
            updates.extend(self.handle_event(event));
        }
        updates
    }

    /// The stream ended normally
    fn finish(&mut self) -> Vec<ViewUpdate> {
        Vec::new()
    }

    /// The request or stream failed
    fn transport_error(&mut self, error: &anyhow::Error) -> Vec<ViewUpdate>;

    /// A completion event has been handled
    fn finalized(&self) -> bool;
}

/// Time since `started`, or zero if the flow never began
pub(crate) fn elapsed(started: Option<Instant>) -> Duration {
    started.map(|s| s.elapsed()).unwrap_or_default()
}

fn apply_all(sink: &mut dyn ViewSink, updates: Vec<ViewUpdate>) {
    for update in &updates {
        sink.apply(update);
    }
}

/// Run one submission of `flow` end to end.
///
/// Order: validate input, acquire `gate`, show the pending view, POST,
/// consume the stream. The gate is held until this function returns, on
/// success and on failure alike.
pub async fn run_flow(
    api: &ApiClient,
    flow: &mut dyn Flow,
    gate: &SubmitGate,
    sink: &mut dyn ViewSink,
) -> FlowOutcome {
    let kind = flow.kind();

    match flow.check_input() {
        InputCheck::Ready => {}
        InputCheck::Ignore => {
            tracing::debug!(flow = %kind, "Empty input ignored");
            return FlowOutcome::Ignored;
        }
        InputCheck::Warn(message) => {
            sink.apply(&ViewUpdate::Panel(Panel::Warning(message)));
            return FlowOutcome::Warned;
        }
    }

    let Some(_guard) = gate.try_acquire() else {
        tracing::warn!(flow = %kind, "Submission rejected, request already in flight");
        return FlowOutcome::Busy;
    };

    tracing::info!(flow = %kind, endpoint = flow.endpoint(), "Submitting request");
    let updates = flow.begin();
    apply_all(sink, updates);

    match stream_response(api, flow, sink).await {
        Ok(stats) => {
            let updates = flow.finish();
            apply_all(sink, updates);
            let finalized = flow.finalized();
            tracing::info!(
                flow = %kind,
                lines = stats.lines,
                skipped = stats.skipped,
                finalized,
                "Stream complete"
            );
            FlowOutcome::Streamed { finalized }
        }
        Err(e) => {
            tracing::error!(flow = %kind, error = %e, "Request failed");
            let updates = flow.transport_error(&e);
            apply_all(sink, updates);
            FlowOutcome::Failed(e.to_string())
        }
    }
}

async fn stream_response(
    api: &ApiClient,
    flow: &mut dyn Flow,
    sink: &mut dyn ViewSink,
) -> Result<StreamStats> {
    let body = flow.request_body()?;
    let byte_stream = api.post_stream(flow.endpoint(), &body).await?;

    let updates = flow.stream_opened();
    apply_all(sink, updates);

    consume(byte_stream, |events| {
        let updates = flow.handle_line(events);
        apply_all(sink, updates);
    })
    .await
}

/// Build the flow for `kind` with its configured settings
pub fn build_flow(kind: FlowKind, config: &Config, input: &str) -> Box<dyn Flow> {
    match kind {
        FlowKind::Llm => Box::new(LlmFlow::new(
            input,
            &config.llm.model,
            &config.llm,
            config.render.interval(),
        )),
        FlowKind::Pdf => Box::new(PdfFlow::new(input, &config.pdf)),
        FlowKind::Web => Box::new(WebFlow::new(input)),
        FlowKind::Smart => Box::new(SmartFlow::new(input)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints() {
        assert_eq!(FlowKind::Llm.endpoint(), "/api/generate");
        assert_eq!(FlowKind::Pdf.endpoint(), "/api/ask");
        assert_eq!(FlowKind::Web.endpoint(), "/api/rag");
        assert_eq!(FlowKind::Smart.endpoint(), "/api/chat-smart");
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for kind in FlowKind::ALL {
            assert_eq!(FlowKind::parse_str(&kind.to_string()).unwrap(), kind);
        }
    }

    #[test]
    fn test_build_flow_matches_kind() {
        let config = Config::default();
        for kind in FlowKind::ALL {
            assert_eq!(build_flow(kind, &config, "q").kind(), kind);
        }
    }

    #[test]
    fn test_empty_input_checks() {
        let config = Config::default();
        assert_eq!(
            build_flow(FlowKind::Llm, &config, "   ").check_input(),
            InputCheck::Ignore
        );
        assert_eq!(
            build_flow(FlowKind::Smart, &config, "").check_input(),
            InputCheck::Ignore
        );
        assert!(matches!(
            build_flow(FlowKind::Pdf, &config, " ").check_input(),
            InputCheck::Warn(_)
        ));
        assert!(matches!(
            build_flow(FlowKind::Web, &config, "").check_input(),
            InputCheck::Warn(_)
        ));
    }
}
