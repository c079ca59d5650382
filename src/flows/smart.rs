//! Server-routed chat (`/api/chat-smart`)
//!
//! The server classifies the prompt and announces its decision with a
//! `mode` line before streaming. `rag` continues with the web pipeline's
//! sub-protocol (status, metadata, chunks); `local` streams model tokens.

use std::time::Instant;

use serde_json::Value;

use crate::api::SmartRequest;
use crate::error::Result;
use crate::flows::progress::{StepState, StepTracker};
use crate::flows::{elapsed, Flow, FlowKind, InputCheck};
use crate::stream::{Completion, Metadata, StreamEvent, StreamMode};
use crate::view::format::AnswerBuffer;
use crate::view::{
    DetailsView, ErrorView, LiveView, Panel, PendingView, ResultView, SourceView, StatItem,
    ViewUpdate,
};

const SEARCHING: &str = "searching";
const GENERATING: &str = "generating";

/// Mode indicator for the web pipeline
pub const RAG_LABEL: &str = "🌍 Web Search Mode";
/// Mode indicator for the local model
pub const LOCAL_LABEL: &str = "🤖 Local AI";
/// Mode indicator after a transport failure
pub const ERROR_LABEL: &str = "❌ Error";

#[derive(Debug)]
enum Branch {
    Undecided,
    Rag {
        steps: StepTracker,
        metadata: Option<Metadata>,
    },
    Local {
        tokens: u64,
    },
}

/// Streams an answer from whichever backend the server picks
pub struct SmartFlow {
    prompt: String,
    branch: Branch,
    answer: AnswerBuffer,
    started: Option<Instant>,
    llm_started: Option<Instant>,
    finalized: bool,
}

impl SmartFlow {
    /// Create a flow for `prompt`
    pub fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.trim().to_string(),
            branch: Branch::Undecided,
            answer: AnswerBuffer::new(),
            started: None,
            llm_started: None,
            finalized: false,
        }
    }

    /// Routing decision, once announced
    pub fn mode(&self) -> Option<StreamMode> {
        match self.branch {
            Branch::Undecided => None,
            Branch::Rag { .. } => Some(StreamMode::Rag),
            Branch::Local { .. } => Some(StreamMode::Local),
        }
    }

    fn live(&self) -> ViewUpdate {
        let view = match &self.branch {
            Branch::Rag { steps, .. } => LiveView {
                steps: steps.steps().to_vec(),
                answer: (!self.answer.is_empty()).then(|| self.answer.answer("Answer:")),
                cursor: !self.answer.is_empty(),
            },
            Branch::Local { .. } | Branch::Undecided => LiveView {
                steps: Vec::new(),
                answer: Some(self.answer.answer("AI:")),
                cursor: true,
            },
        };
        ViewUpdate::Panel(Panel::Live(view))
    }

    fn enter_mode(&mut self, mode: StreamMode) -> Vec<ViewUpdate> {
        tracing::info!(mode = ?mode, "Server selected answer mode");
        let label = match mode {
            StreamMode::Rag => {
                self.branch = Branch::Rag {
                    steps: StepTracker::new(&[
                        (SEARCHING, "Searching..."),
                        (GENERATING, "Generating answer..."),
                    ]),
                    metadata: None,
                };
                RAG_LABEL
            }
            StreamMode::Local => {
                self.branch = Branch::Local { tokens: 0 };
                LOCAL_LABEL
            }
        };
        vec![ViewUpdate::ModeLabel(label.to_string()), self.live()]
    }

    fn handle_rag(&mut self, event: StreamEvent) -> Vec<ViewUpdate> {
        let Branch::Rag { steps, metadata } = &mut self.branch else {
            return Vec::new();
        };
        match event {
            StreamEvent::Status { status, message } => {
                let changed = match status.as_str() {
                    "searching" | "scraping" | "embedding" => {
                        if steps.state(SEARCHING) == Some(StepState::Active) {
                            steps.relabel(
                                SEARCHING,
                                message.as_deref().unwrap_or("Processing..."),
                            );
                            true
                        } else {
                            false
                        }
                    }
                    GENERATING => steps.advance(GENERATING, Some("Generating answer...")),
                    other => {
                        tracing::debug!(status = %other, "Ignoring unknown pipeline status");
                        false
                    }
                };
                if changed {
                    vec![self.live()]
                } else {
                    Vec::new()
                }
            }
            StreamEvent::Metadata(received) => {
                *metadata = Some(received);
                steps.mark_complete(SEARCHING);
                vec![self.live()]
            }
            StreamEvent::Token(text) => {
                self.answer.push(&text);
                vec![self.live()]
            }
            StreamEvent::Complete(completion) => vec![self.complete_rag(&completion)],
            StreamEvent::Error { .. } | StreamEvent::Mode(_) => Vec::new(),
        }
    }

    fn complete_rag(&mut self, completion: &Completion) -> ViewUpdate {
        self.finalized = true;
        let total = format!("{:.2}s", elapsed(self.started).as_secs_f64());
        let metadata = match &self.branch {
            Branch::Rag { metadata, .. } => metadata.clone(),
            _ => None,
        };

        let mut view = ResultView {
            banner: Some(format!("Search completed in {}", total)),
            answer: self.answer.answer("Answer:"),
            ..ResultView::default()
        };

        if let Some(metadata) = &metadata {
            view.sources = metadata
                .web_sources()
                .into_iter()
                .map(|source| SourceView::Web {
                    title: source.title.clone().unwrap_or_else(|| "Source".to_string()),
                    url: source.url.clone().unwrap_or_default(),
                    date: None,
                })
                .collect();
        }

        if completion.timing.is_some() || metadata.is_some() {
            let mut items = vec![StatItem::new("Total Time", &total)];
            if let Some(timing) = metadata.as_ref().and_then(|m| m.timing) {
                for (label, ms) in [
                    ("Search", timing.search_elapsed),
                    ("Scraping", timing.scrape_elapsed),
                    ("Embedding", timing.embed_elapsed),
                ] {
                    let value = ms
                        .map(|ms| format!("{:.2}s", ms / 1000.0))
                        .unwrap_or_else(|| "n/a".to_string());
                    items.push(StatItem::new(label, value));
                }
            }
            view.details = Some(DetailsView {
                title: "Timing Breakdown:".to_string(),
                items,
                note: Some("Total time from query to final response".to_string()),
            });
        }

        ViewUpdate::Panel(Panel::Result(view))
    }

    fn handle_local(&mut self, event: StreamEvent) -> Vec<ViewUpdate> {
        let Branch::Local { tokens } = &mut self.branch else {
            return Vec::new();
        };
        match event {
            StreamEvent::Token(text) => {
                *tokens += 1;
                self.answer.push(&text);
                vec![self.live()]
            }
            // A bare `timing` block does not end a local answer
            StreamEvent::Complete(completion) if completion.done => {
                vec![self.complete_local(&completion)]
            }
            _ => Vec::new(),
        }
    }

    fn complete_local(&mut self, completion: &Completion) -> ViewUpdate {
        self.finalized = true;
        let tokens = match self.branch {
            Branch::Local { tokens } => tokens,
            _ => 0,
        };
        let total = elapsed(self.started).as_secs_f64();
        let llm = elapsed(self.llm_started).as_secs_f64();
        let output = completion
            .eval_count
            .filter(|count| *count > 0)
            .unwrap_or(tokens);

        ViewUpdate::Panel(Panel::Result(ResultView {
            answer: self.answer.answer("AI:"),
            details: Some(DetailsView {
                title: "Performance Stats:".to_string(),
                items: vec![
                    StatItem::new("Total Time", format!("{:.2}s", total)),
                    StatItem::new("LLM Time", format!("{:.2}s", llm)),
                    StatItem::new("Speed", format!("{:.1} tok/s", tokens as f64 / llm.max(0.01))),
                    StatItem::new("Output", format!("{} tokens", output)),
                ],
                note: Some("Total time includes classification + generation".to_string()),
            }),
            ..ResultView::default()
        }))
    }
}

impl Flow for SmartFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Smart
    }

    fn check_input(&self) -> InputCheck {
        if self.prompt.is_empty() {
            InputCheck::Ignore
        } else {
            InputCheck::Ready
        }
    }

    fn request_body(&self) -> Result<Value> {
        Ok(serde_json::to_value(SmartRequest {
            prompt: self.prompt.clone(),
        })?)
    }

    fn begin(&mut self) -> Vec<ViewUpdate> {
        self.started = Some(Instant::now());
        vec![ViewUpdate::Panel(Panel::Pending(PendingView {
            message: "Analyzing query...".to_string(),
            detail: None,
            reasoning: false,
        }))]
    }

    fn stream_opened(&mut self) -> Vec<ViewUpdate> {
        self.llm_started = Some(Instant::now());
        Vec::new()
    }

    /// A line carrying `mode` only switches the branch; the first such line
    /// wins and later ones are dropped whole.
    fn handle_line(&mut self, events: Vec<StreamEvent>) -> Vec<ViewUpdate> {
        let announced = events.iter().find_map(|event| match event {
            StreamEvent::Mode(mode) => Some(*mode),
            _ => None,
        });
        if let Some(mode) = announced {
            return match self.branch {
                Branch::Undecided => self.enter_mode(mode),
                _ => {
                    tracing::debug!(mode = ?mode, "Ignoring repeated mode announcement");
                    Vec::new()
                }
            };
        }

        let mut updates = Vec::new();
        for event in events {
            updates.extend(self.handle_event(event));
        }
        updates
    }

    fn handle_event(&mut self, event: StreamEvent) -> Vec<ViewUpdate> {
        if let StreamEvent::Error { error, .. } = event {
            return vec![ViewUpdate::Panel(Panel::Error(ErrorView::message(error)))];
        }
        match self.branch {
            Branch::Rag { .. } => self.handle_rag(event),
            Branch::Local { .. } => self.handle_local(event),
            Branch::Undecided => {
                tracing::debug!(event = ?event, "Dropping event received before mode");
                Vec::new()
            }
        }
    }

    fn transport_error(&mut self, error: &anyhow::Error) -> Vec<ViewUpdate> {
        vec![
            ViewUpdate::ModeLabel(ERROR_LABEL.to_string()),
            ViewUpdate::Panel(Panel::Error(ErrorView::message(format!(
                "Error: {}",
                error
            )))),
        ]
    }

    fn finalized(&self) -> bool {
        self.finalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status(status: &str, message: Option<&str>) -> StreamEvent {
        StreamEvent::Status {
            status: status.to_string(),
            message: message.map(str::to_string),
        }
    }

    fn steps(flow: &SmartFlow) -> StepTracker {
        match &flow.branch {
            Branch::Rag { steps, .. } => steps.clone(),
            other => panic!("not in rag mode: {:?}", other),
        }
    }

    #[test]
    fn test_first_mode_wins() {
        let mut flow = SmartFlow::new("weather in Paris");
        flow.begin();
        let updates = flow.handle_line(vec![StreamEvent::Mode(StreamMode::Rag)]);
        assert_eq!(updates[0], ViewUpdate::ModeLabel(RAG_LABEL.to_string()));

        let ignored = flow.handle_line(vec![
            StreamEvent::Mode(StreamMode::Local),
            StreamEvent::Token("x".to_string()),
        ]);
        assert!(ignored.is_empty());
        assert_eq!(flow.mode(), Some(StreamMode::Rag));
    }

    #[test]
    fn test_tokens_before_mode_are_dropped() {
        let mut flow = SmartFlow::new("hi");
        assert!(flow
            .handle_line(vec![StreamEvent::Token("early".to_string())])
            .is_empty());
        assert_eq!(flow.mode(), None);
    }

    #[test]
    fn test_rag_statuses_relabel_searching_step() {
        let mut flow = SmartFlow::new("q");
        flow.handle_line(vec![StreamEvent::Mode(StreamMode::Rag)]);
        flow.handle_line(vec![status("scraping", Some("Reading 3 pages..."))]);
        assert_eq!(steps(&flow).steps()[0].label, "Reading 3 pages...");
        flow.handle_line(vec![status("embedding", None)]);
        assert_eq!(steps(&flow).steps()[0].label, "Processing...");
        assert_eq!(steps(&flow).state(SEARCHING), Some(StepState::Active));

        flow.handle_line(vec![status("generating", None)]);
        assert_eq!(steps(&flow).state(SEARCHING), Some(StepState::Complete));
        assert_eq!(steps(&flow).state(GENERATING), Some(StepState::Active));
    }

    #[test]
    fn test_rag_completion_timing_breakdown() {
        let mut flow = SmartFlow::new("q");
        flow.begin();
        flow.handle_line(vec![StreamEvent::Mode(StreamMode::Rag)]);
        flow.handle_line(vec![StreamEvent::Metadata(Metadata::from_value(json!({
            "sources": [{"url": "https://example.com"}],
            "timing": {"searchElapsed": 1500, "scrapeElapsed": 250, "embedElapsed": 1000}
        })))]);
        flow.handle_line(vec![StreamEvent::Token("Sunny".to_string())]);
        let updates = flow.handle_line(vec![StreamEvent::Complete(Completion {
            done: true,
            ..Completion::default()
        })]);

        match &updates[..] {
            [ViewUpdate::Panel(Panel::Result(view))] => {
                let details = view.details.as_ref().unwrap();
                assert_eq!(details.value("Search"), Some("1.50s"));
                assert_eq!(details.value("Scraping"), Some("0.25s"));
                assert_eq!(details.value("Embedding"), Some("1.00s"));
                assert!(matches!(&view.sources[0], SourceView::Web { title, .. } if title == "Source"));
                assert_eq!(view.answer.text, "Sunny");
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(flow.finalized());
    }

    #[test]
    fn test_local_counts_tokens() {
        let mut flow = SmartFlow::new("hello");
        flow.begin();
        flow.stream_opened();
        let updates = flow.handle_line(vec![StreamEvent::Mode(StreamMode::Local)]);
        assert_eq!(updates[0], ViewUpdate::ModeLabel(LOCAL_LABEL.to_string()));
        flow.handle_line(vec![StreamEvent::Token("Hi".to_string())]);
        flow.handle_line(vec![StreamEvent::Token(" there".to_string())]);
        let updates = flow.handle_line(vec![StreamEvent::Complete(Completion {
            done: true,
            ..Completion::default()
        })]);

        match &updates[..] {
            [ViewUpdate::Panel(Panel::Result(view))] => {
                assert_eq!(view.answer.heading, "AI:");
                assert_eq!(view.details.as_ref().unwrap().value("Output"), Some("2 tokens"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_local_ignores_timing_without_done() {
        let mut flow = SmartFlow::new("hello");
        flow.begin();
        flow.handle_line(vec![StreamEvent::Mode(StreamMode::Local)]);
        flow.handle_line(vec![StreamEvent::Token("Hi".to_string())]);

        let updates = flow.handle_line(vec![StreamEvent::Complete(Completion {
            done: false,
            timing: Some(json!({"total": 1200})),
            ..Completion::default()
        })]);
        assert!(updates.is_empty());
        assert!(!flow.finalized());

        flow.handle_line(vec![StreamEvent::Token("!".to_string())]);
        let updates = flow.handle_line(vec![StreamEvent::Complete(Completion {
            done: true,
            ..Completion::default()
        })]);
        match &updates[..] {
            [ViewUpdate::Panel(Panel::Result(view))] => assert_eq!(view.answer.text, "Hi!"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(flow.finalized());
    }

    #[test]
    fn test_error_shown_in_any_mode() {
        let mut flow = SmartFlow::new("q");
        let updates = flow.handle_line(vec![StreamEvent::Error {
            error: "classifier down".to_string(),
            details: None,
        }]);
        assert_eq!(
            updates,
            vec![ViewUpdate::Panel(Panel::Error(ErrorView::message(
                "classifier down"
            )))]
        );
    }

    #[test]
    fn test_transport_error_sets_error_label() {
        let mut flow = SmartFlow::new("q");
        let updates = flow.transport_error(&anyhow::anyhow!("HTTP 503: Service Unavailable"));
        assert_eq!(updates[0], ViewUpdate::ModeLabel(ERROR_LABEL.to_string()));
    }
}
