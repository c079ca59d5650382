//! Retrieval metadata attached near the end of a RAG stream

use serde::Deserialize;
use serde_json::Value;

use crate::stream::lenient;

/// Retrieval metadata sent by `/api/ask`, `/api/rag`, and the smart
/// endpoint's `rag` mode.
///
/// The raw JSON is kept verbatim in [`Metadata::raw`]. Every typed field is
/// read on its own: a field with an unexpected type or `null` falls back to
/// its default, and a malformed source or chunk is dropped alone.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Documents or web pages the answer drew from
    #[serde(default, deserialize_with = "lenient::items")]
    pub sources: Vec<Source>,
    /// Chunks retrieved from the vector store (PDF flow)
    #[serde(default, deserialize_with = "lenient::items")]
    pub relevant_chunks: Vec<RelevantChunk>,
    /// Total chunks indexed
    #[serde(default, deserialize_with = "lenient::count")]
    pub total_embeddings: Option<u64>,
    /// Chunks placed in the prompt context (web flow)
    #[serde(default, deserialize_with = "lenient::count")]
    pub chunks_used: Option<u64>,
    /// Chunks produced by scraping (web flow)
    #[serde(default, deserialize_with = "lenient::count")]
    pub total_chunks: Option<u64>,
    /// Best similarity score, as sent
    #[serde(default)]
    pub top_similarity: Option<Value>,
    /// Prompt context size in characters
    #[serde(default, deserialize_with = "lenient::count")]
    pub context_length: Option<u64>,
    /// Per-stage durations
    #[serde(default, deserialize_with = "lenient::record")]
    pub timing: Option<StageTiming>,
    /// The search query was rewritten after an empty result
    #[serde(default, deserialize_with = "lenient::flag")]
    pub query_was_refined: bool,
    /// Search attempts made
    #[serde(default, deserialize_with = "lenient::count")]
    pub search_attempts: Option<u32>,
    /// Query as typed
    #[serde(default, deserialize_with = "lenient::text")]
    pub original_query: Option<String>,
    /// Query that produced results
    #[serde(default, deserialize_with = "lenient::text")]
    pub final_query: Option<String>,
    /// Payload exactly as received
    #[serde(skip)]
    pub raw: Value,
}

/// A source reference; the PDF flow sends bare paths, the web flow objects
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Source {
    /// Path of an indexed document
    Document(String),
    /// Web page
    Web(WebSource),
}

/// Web page used as a source
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WebSource {
    /// Page title
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: Option<String>,
    /// Page URL
    #[serde(default, deserialize_with = "lenient::text")]
    pub url: Option<String>,
    /// Publication or crawl date
    #[serde(default, deserialize_with = "lenient::text")]
    pub date: Option<String>,
}

/// A chunk retrieved from the vector store
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RelevantChunk {
    /// Cosine similarity in `[0, 1]`
    #[serde(default, deserialize_with = "lenient::number_or_zero")]
    pub similarity: f64,
    /// Path of the document the chunk came from
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub source: String,
    /// Leading text of the chunk
    #[serde(default, deserialize_with = "lenient::text_or_empty")]
    pub preview: String,
}

/// Stage durations in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    /// Web search
    #[serde(default, deserialize_with = "lenient::number")]
    pub search_elapsed: Option<f64>,
    /// Page scraping
    #[serde(default, deserialize_with = "lenient::number")]
    pub scrape_elapsed: Option<f64>,
    /// Embedding and ranking
    #[serde(default, deserialize_with = "lenient::number")]
    pub embed_elapsed: Option<f64>,
}

impl Metadata {
    /// Build from a raw payload, keeping it verbatim in `raw`.
    ///
    /// Only a payload that is not an object at all yields empty typed
    /// fields; that case is logged.
    pub fn from_value(raw: Value) -> Self {
        let mut metadata = match serde_json::from_value::<Metadata>(raw.clone()) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(error = %e, "Metadata did not match the expected shape");
                Metadata::default()
            }
        };
        metadata.raw = raw;
        metadata
    }

    /// Document sources only, reduced to their file names
    pub fn document_names(&self) -> Vec<String> {
        self.sources
            .iter()
            .filter_map(|source| match source {
                Source::Document(path) => Some(file_name(path).to_string()),
                Source::Web(_) => None,
            })
            .collect()
    }

    /// Web sources only
    pub fn web_sources(&self) -> Vec<&WebSource> {
        self.sources
            .iter()
            .filter_map(|source| match source {
                Source::Web(web) => Some(web),
                Source::Document(_) => None,
            })
            .collect()
    }
}

/// Final path segment of a `/`-separated path
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
