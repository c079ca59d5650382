//! NDJSON envelope and its classification into typed stream events
//!
//! The backends do not tag their lines: which keys are present decides how a
//! line is handled, and one line may carry several keys at once.
//! [`classify`] turns that duck-typed shape into an ordered list of
//! [`StreamEvent`]s so flows can match on them exhaustively.

use serde::Deserialize;
use serde_json::Value;

use crate::stream::lenient;
use crate::stream::metadata::Metadata;

/// One NDJSON line as sent by any of the backends.
///
/// Every key is optional and unknown keys are ignored. A key with an
/// unexpected type is treated as absent; only a line that is not a JSON
/// object fails to parse.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    /// Token delta from `/api/generate` and the smart flow's local mode
    #[serde(default, deserialize_with = "lenient::text")]
    pub response: Option<String>,
    /// Token delta from the RAG endpoints
    #[serde(default, deserialize_with = "lenient::text")]
    pub chunk: Option<String>,
    /// Pipeline stage name (`searching`, `scraping`, `embedding`, `generating`)
    #[serde(default, deserialize_with = "lenient::text")]
    pub status: Option<String>,
    /// Human-readable label for the current stage
    #[serde(default, deserialize_with = "lenient::text")]
    pub message: Option<String>,
    /// Retrieval metadata, sent once near the end
    pub metadata: Option<Value>,
    /// Smart-flow routing decision (`rag` or `local`)
    #[serde(default, deserialize_with = "lenient::text")]
    pub mode: Option<String>,
    /// Completion flag
    pub done: Option<Value>,
    /// Completion timing block; its presence also finalizes
    pub timing: Option<Value>,
    /// Server-reported application error
    pub error: Option<Value>,
    /// Extra detail accompanying `error`
    pub details: Option<Value>,
    /// Prompt tokens evaluated by the model
    #[serde(default, deserialize_with = "lenient::count")]
    pub prompt_eval_count: Option<u64>,
    /// Tokens generated by the model
    #[serde(default, deserialize_with = "lenient::count")]
    pub eval_count: Option<u64>,
}

/// Routing decision announced by the smart endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    /// Answer comes from the web-search RAG pipeline
    Rag,
    /// Answer comes straight from the local model
    Local,
}

impl StreamMode {
    /// Parse the wire value; unknown values yield `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "rag" => Some(Self::Rag),
            "local" => Some(Self::Local),
            _ => None,
        }
    }
}

/// Terminal line of a stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// `done` was truthy
    pub done: bool,
    /// Raw `timing` block, when present
    pub timing: Option<Value>,
    /// Prompt tokens evaluated
    pub prompt_eval_count: Option<u64>,
    /// Tokens generated
    pub eval_count: Option<u64>,
}

/// Normalized event kinds carried by an NDJSON line
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Smart-flow routing decision
    Mode(StreamMode),
    /// Pipeline progress
    Status {
        /// Stage identifier
        status: String,
        /// Optional display label
        message: Option<String>,
    },
    /// Retrieval metadata
    Metadata(Metadata),
    /// Answer text delta
    Token(String),
    /// Stream finished successfully
    Complete(Completion),
    /// Server-reported error
    Error {
        /// Error text
        error: String,
        /// Optional detail text
        details: Option<String>,
    },
}

impl StreamEvent {
    /// Convenience accessor for `Token` contents
    pub fn as_token(&self) -> Option<&str> {
        match self {
            Self::Token(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Returns true for `Complete`
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// JavaScript-style truthiness used by the backends' producers
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a JSON value as display text; strings are unquoted
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

/// Classify an envelope into events, in handling precedence:
/// mode, status, metadata, token, completion, error.
///
/// # Examples
///
/// ```
/// use ragstream::stream::{classify, Envelope, StreamEvent};
///
/// let envelope: Envelope = serde_json::from_str(r#"{"response":"Hi","done":true}"#).unwrap();
/// let events = classify(&envelope);
/// assert_eq!(events.len(), 2);
/// assert_eq!(events[0], StreamEvent::Token("Hi".to_string()));
/// assert!(events[1].is_complete());
/// ```
pub fn classify(envelope: &Envelope) -> Vec<StreamEvent> {
    let mut events = Vec::new();

    if let Some(mode) = non_empty(&envelope.mode) {
        match StreamMode::parse(mode) {
            Some(mode) => events.push(StreamEvent::Mode(mode)),
            None => tracing::warn!(mode = %mode, "Ignoring unknown stream mode"),
        }
    }

    if let Some(status) = non_empty(&envelope.status) {
        events.push(StreamEvent::Status {
            status: status.to_string(),
            message: non_empty(&envelope.message).map(str::to_string),
        });
    }

    if let Some(metadata) = envelope.metadata.as_ref().filter(|v| is_truthy(v)) {
        events.push(StreamEvent::Metadata(Metadata::from_value(metadata.clone())));
    }

    if let Some(text) = non_empty(&envelope.response).or_else(|| non_empty(&envelope.chunk)) {
        events.push(StreamEvent::Token(text.to_string()));
    }

    let done = envelope.done.as_ref().map(is_truthy).unwrap_or(false);
    let timing = envelope.timing.clone().filter(is_truthy);
    if done || timing.is_some() {
        events.push(StreamEvent::Complete(Completion {
            done,
            timing,
            prompt_eval_count: envelope.prompt_eval_count,
            eval_count: envelope.eval_count,
        }));
    }

    if let Some(error) = envelope.error.as_ref().filter(|v| is_truthy(v)) {
        events.push(StreamEvent::Error {
            error: value_text(error),
            details: envelope
                .details
                .as_ref()
                .filter(|v| is_truthy(v))
                .map(value_text),
        });
    }

    events
}
