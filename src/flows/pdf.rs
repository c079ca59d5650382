//! Question answering over indexed PDFs (`/api/ask`)

use std::time::Instant;

use serde_json::Value;

use crate::api::{AskConfig, AskRequest};
use crate::config::PdfConfig;
use crate::error::Result;
use crate::flows::progress::StepTracker;
use crate::flows::{elapsed, Flow, FlowKind, InputCheck};
use crate::stream::metadata::file_name;
use crate::stream::{Metadata, StreamEvent};
use crate::view::format::AnswerBuffer;
use crate::view::{
    ChunkView, DetailsView, ErrorView, LiveView, Panel, ResultView, SourceView, StatItem,
    ViewUpdate,
};

const SEARCHING: &str = "searching";
const GENERATING: &str = "generating";

/// Streams an answer grounded in the PDF knowledge base
pub struct PdfFlow {
    question: String,
    config: PdfConfig,
    steps: StepTracker,
    answer: AnswerBuffer,
    metadata: Option<Metadata>,
    started: Option<Instant>,
    finalized: bool,
}

impl PdfFlow {
    /// Create a flow asking `question` with the configured retrieval settings
    pub fn new(question: &str, config: &PdfConfig) -> Self {
        let searching = format!("Searching {} chunks...", config.top_k);
        Self {
            question: question.trim().to_string(),
            config: config.clone(),
            steps: StepTracker::new(&[
                (SEARCHING, searching.as_str()),
                (GENERATING, "Generating answer..."),
            ]),
            answer: AnswerBuffer::new(),
            metadata: None,
            started: None,
            finalized: false,
        }
    }

    /// Override the number of chunks to retrieve
    pub fn with_top_k(question: &str, config: &PdfConfig, top_k: u32) -> Self {
        let config = PdfConfig {
            top_k,
            ..config.clone()
        };
        Self::new(question, &config)
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
        let duration = format!("{:.1}", elapsed(self.started).as_secs_f64());
        let metadata = self.metadata.clone().unwrap_or_default();

        let chunks: Vec<ChunkView> = metadata
            .relevant_chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| ChunkView {
                rank: i + 1,
                similarity_pct: chunk.similarity * 100.0,
                file_name: file_name(&chunk.source).to_string(),
                preview: chunk.preview.clone(),
            })
            .collect();

        let details = DetailsView {
            title: "Stats".to_string(),
            items: vec![
                StatItem::new(
                    "Total chunks",
                    metadata.total_embeddings.unwrap_or_default(),
                ),
                StatItem::new("Chunks used", chunks.len()),
                StatItem::new("Response time", format!("{}s", duration)),
            ],
            note: None,
        };

        ViewUpdate::Panel(Panel::Result(ResultView {
            banner: Some(format!(
                "Answer generated in {}s using {} chunks",
                duration, self.config.top_k
            )),
            answer: self.answer.answer("Answer:"),
            sources: metadata
                .document_names()
                .into_iter()
                .map(SourceView::Document)
                .collect(),
            chunks,
            details: Some(details),
            refinement: None,
        }))
    }
}

impl Flow for PdfFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Pdf
    }

    fn check_input(&self) -> InputCheck {
        if self.question.is_empty() {
            InputCheck::Warn("Please enter a question".to_string())
        } else {
            InputCheck::Ready
        }
    }

    fn request_body(&self) -> Result<Value> {
        Ok(serde_json::to_value(AskRequest {
            question: self.question.clone(),
            config: AskConfig {
                top_k: self.config.top_k,
                embedding_model: self.config.embedding_model.clone(),
                llm_model: self.config.llm_model.clone(),
            },
        })?)
    }

    fn begin(&mut self) -> Vec<ViewUpdate> {
        self.started = Some(Instant::now());
        vec![self.live()]
    }

    fn handle_event(&mut self, event: StreamEvent) -> Vec<ViewUpdate> {
        match event {
            StreamEvent::Status { status, .. } if status == GENERATING => {
                if self.steps.advance(GENERATING, Some("Generating answer...")) {
                    vec![self.live()]
                } else {
                    Vec::new()
                }
            }
            StreamEvent::Status { .. } | StreamEvent::Mode(_) => Vec::new(),
            StreamEvent::Metadata(metadata) => {
                self.metadata = Some(metadata);
                Vec::new()
            }
            StreamEvent::Token(text) => {
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
        }
    }

    fn transport_error(&mut self, error: &anyhow::Error) -> Vec<ViewUpdate> {
        vec![ViewUpdate::Panel(Panel::Error(ErrorView {
            title: Some("Error".to_string()),
            message: error.to_string(),
            details: None,
            hint_title: Some("Possible causes:".to_string()),
            hints: vec![
                "PDFs not indexed yet".to_string(),
                "Server connection issue".to_string(),
                "Qdrant database not accessible".to_string(),
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
