//! Web-search RAG (`/api/rag`)

use std::time::Instant;

use serde_json::Value;

use crate::api::RagRequest;
use crate::error::Result;
use crate::flows::progress::StepTracker;
use crate::flows::{elapsed, Flow, FlowKind, InputCheck};
use crate::stream::envelope::value_text;
use crate::stream::{Metadata, StreamEvent};
use crate::view::format::AnswerBuffer;
use crate::view::{
    DetailsView, ErrorView, LiveView, Panel, Refinement, ResultView, SourceView, StatItem,
    ViewUpdate,
};

const STEPS: [(&str, &str); 4] = [
    ("searching", "Searching the web..."),
    ("scraping", "Scraping content..."),
    ("embedding", "Analyzing content..."),
    ("generating", "Generating answer..."),
];

/// Researches a question on the web and streams a cited answer
pub struct WebFlow {
    question: String,
    steps: StepTracker,
    answer: AnswerBuffer,
    metadata: Option<Metadata>,
    started: Option<Instant>,
    finalized: bool,
}

impl WebFlow {
    /// Create a flow for `question`
    pub fn new(question: &str) -> Self {
        Self {
            question: question.trim().to_string(),
            steps: StepTracker::new(&STEPS),
            answer: AnswerBuffer::new(),
            metadata: None,
            started: None,
            finalized: false,
        }
    }

    /// Current pipeline steps
    pub fn steps(&self) -> &StepTracker {
        &self.steps
    }

    fn live(&self) -> ViewUpdate {
        ViewUpdate::Panel(Panel::Live(LiveView {
            steps: self.steps.steps().to_vec(),
            answer: (!self.answer.is_empty()).then(|| self.answer.answer("Answer:")),
            cursor: !self.answer.is_empty(),
        }))
    }

    fn complete(&mut self) -> ViewUpdate {
        self.finalized = true;
        let duration = format!("{:.1}s", elapsed(self.started).as_secs_f64());

        let mut view = ResultView {
            banner: Some(format!("Search completed in {}", duration)),
            answer: self.answer.answer("Answer:"),
            ..ResultView::default()
        };

        if let Some(metadata) = &self.metadata {
            view.sources = metadata
                .web_sources()
                .into_iter()
                .map(|source| SourceView::Web {
                    title: source.title.clone().unwrap_or_default(),
                    url: source.url.clone().unwrap_or_default(),
                    date: source.date.clone(),
                })
                .collect();

            view.details = Some(DetailsView {
                title: "Search Details:".to_string(),
                items: vec![
                    StatItem::new(
                        "Chunks",
                        format!(
                            "{}/{}",
                            optional(metadata.chunks_used),
                            optional(metadata.total_chunks)
                        ),
                    ),
                    StatItem::new(
                        "Best match",
                        metadata
                            .top_similarity
                            .as_ref()
                            .map(value_text)
                            .unwrap_or_else(|| "n/a".to_string()),
                    ),
                    StatItem::new(
                        "Context",
                        format!("{} chars", optional(metadata.context_length)),
                    ),
                    StatItem::new("Time", &duration),
                ],
                note: None,
            });

            let attempts = metadata.search_attempts.unwrap_or(0);
            if metadata.query_was_refined && attempts > 1 {
                view.refinement = Some(Refinement {
                    attempts,
                    original_query: metadata.original_query.clone().unwrap_or_default(),
                    final_query: metadata.final_query.clone().unwrap_or_default(),
                });
            }
        }

        ViewUpdate::Panel(Panel::Result(view))
    }
}

fn optional(value: Option<u64>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

impl Flow for WebFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Web
    }

    fn check_input(&self) -> InputCheck {
        if self.question.is_empty() {
            InputCheck::Warn("Please enter a question".to_string())
        } else {
            InputCheck::Ready
        }
    }

    fn request_body(&self) -> Result<Value> {
        Ok(serde_json::to_value(RagRequest {
            question: self.question.clone(),
        })?)
    }

    fn begin(&mut self) -> Vec<ViewUpdate> {
        self.started = Some(Instant::now());
        vec![self.live()]
    }

    fn handle_event(&mut self, event: StreamEvent) -> Vec<ViewUpdate> {
        match event {
            StreamEvent::Status { status, message } => {
                if self.steps.advance(&status, message.as_deref()) {
                    vec![self.live()]
                } else {
                    Vec::new()
                }
            }
            StreamEvent::Metadata(metadata) => {
                self.metadata = Some(metadata);
                self.steps.mark_complete("embedding");
                vec![self.live()]
            }
            StreamEvent::Token(text) => {
                if self.answer.is_empty() {
                    self.steps.mark_complete("generating");
                }
                self.answer.push(&text);
                vec![self.live()]
            }
            StreamEvent::Complete(_) => vec![self.complete()],
            StreamEvent::Error { error, details } => {
                vec![ViewUpdate::Panel(Panel::Error(ErrorView {
                    title: Some("Error".to_string()),
                    message: error,
                    details,
                    ..ErrorView::default()
                }))]
            }
            StreamEvent::Mode(_) => Vec::new(),
        }
    }

    fn transport_error(&mut self, error: &anyhow::Error) -> Vec<ViewUpdate> {
        vec![ViewUpdate::Panel(Panel::Error(ErrorView {
            title: Some("Connection Error".to_string()),
            message: error.to_string(),
            details: None,
            hint_title: Some("Troubleshooting Steps:".to_string()),
            hints: vec![
                "Check if server is running".to_string(),
                "Verify Cloudflare tunnel is active".to_string(),
                "Run with --verbose for detailed errors".to_string(),
            ],
            footer: Some(format!(
                "Time elapsed: {:.1}s",
                elapsed(self.started).as_secs_f64()
            )),
        }))]
    }

    fn finalized(&self) -> bool {
        self.finalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flows::progress::StepState;
    use serde_json::json;

    fn status(status: &str) -> StreamEvent {
        StreamEvent::Status {
            status: status.to_string(),
            message: None,
        }
    }

    #[test]
    fn test_status_with_message_relabels_step() {
        let mut flow = WebFlow::new("rust async");
        flow.begin();
        flow.handle_event(StreamEvent::Status {
            status: "scraping".to_string(),
            message: Some("Scraping 5 pages...".to_string()),
        });
        let steps = flow.steps();
        assert_eq!(steps.state("searching"), Some(StepState::Complete));
        assert_eq!(steps.state("scraping"), Some(StepState::Active));
        assert_eq!(steps.steps()[1].label, "Scraping 5 pages...");
    }

    #[test]
    fn test_progress_never_regresses() {
        let mut flow = WebFlow::new("q");
        flow.begin();
        flow.handle_event(status("embedding"));
        assert!(flow.handle_event(status("searching")).is_empty());
        assert_eq!(flow.steps().state("searching"), Some(StepState::Complete));
        assert_eq!(flow.steps().state("embedding"), Some(StepState::Active));
    }

    #[test]
    fn test_metadata_and_first_token_complete_steps() {
        let mut flow = WebFlow::new("q");
        flow.begin();
        flow.handle_event(status("generating"));
        flow.handle_event(StreamEvent::Metadata(Metadata::default()));
        flow.handle_event(StreamEvent::Token("A".to_string()));
        assert!(flow.steps().all_complete());
    }

    #[test]
    fn test_completion_with_refinement() {
        let mut flow = WebFlow::new("q");
        flow.begin();
        flow.handle_event(StreamEvent::Metadata(Metadata::from_value(json!({
            "sources": [{"title": "Docs", "url": "https://docs.rs", "date": "2024-05-01"}],
            "chunksUsed": 3,
            "totalChunks": 12,
            "topSimilarity": 0.87,
            "contextLength": 4000,
            "queryWasRefined": true,
            "searchAttempts": 2,
            "originalQuery": "q",
            "finalQuery": "q refined"
        }))));
        flow.handle_event(StreamEvent::Token("Answer".to_string()));
        let updates = flow.handle_event(StreamEvent::Complete(Default::default()));

        match &updates[..] {
            [ViewUpdate::Panel(Panel::Result(view))] => {
                let details = view.details.as_ref().unwrap();
                assert_eq!(details.value("Chunks"), Some("3/12"));
                assert_eq!(details.value("Best match"), Some("0.87"));
                assert_eq!(details.value("Context"), Some("4000 chars"));
                assert_eq!(view.refinement.as_ref().unwrap().attempts, 2);
                assert!(matches!(&view.sources[0], SourceView::Web { url, .. } if url == "https://docs.rs"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_single_attempt_has_no_refinement_notice() {
        let mut flow = WebFlow::new("q");
        flow.handle_event(StreamEvent::Metadata(Metadata::from_value(json!({
            "queryWasRefined": true,
            "searchAttempts": 1
        }))));
        let updates = flow.handle_event(StreamEvent::Complete(Default::default()));
        match &updates[..] {
            [ViewUpdate::Panel(Panel::Result(view))] => assert!(view.refinement.is_none()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_error_then_done_ends_on_result() {
        let mut flow = WebFlow::new("q");
        flow.begin();
        let updates = flow.handle_line(vec![
            StreamEvent::Error {
                error: "Search failed".to_string(),
                details: None,
            },
            StreamEvent::Complete(Default::default()),
        ]);
        assert!(matches!(updates[0], ViewUpdate::Panel(Panel::Error(_))));
        assert!(matches!(updates[1], ViewUpdate::Panel(Panel::Result(_))));
    }
}
