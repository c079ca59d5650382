//! Typed render state for flow output
//!
//! Flows never build markup. They emit [`ViewUpdate`]s describing what the
//! response area should show, and a [`ViewSink`] draws them: [`html`] renders
//! Bootstrap-styled HTML fragments, [`terminal`] prints to a console.

pub mod format;
pub mod html;
pub mod terminal;

use crate::flows::progress::Step;

/// Glyph shown after a streaming answer until it completes
pub const CURSOR: &str = "▊";

/// One change to a flow's display
#[derive(Debug, Clone, PartialEq)]
pub enum ViewUpdate {
    /// Replace the response area
    Panel(Panel),
    /// Set the mode indicator next to the response area (smart flow)
    ModeLabel(String),
}

/// Everything the response area can show
#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    /// Request sent, nothing received yet
    Pending(PendingView),
    /// Input rejected before any request was made
    Warning(String),
    /// Stream in progress
    Live(LiveView),
    /// Stream finished
    Result(ResultView),
    /// Transport failure or server-reported error
    Error(ErrorView),
}

/// Placeholder while waiting for the first bytes
#[derive(Debug, Clone, PartialEq)]
pub struct PendingView {
    /// Main line ("Thinking...")
    pub message: String,
    /// Secondary line
    pub detail: Option<String>,
    /// The selected model will reason before answering
    pub reasoning: bool,
}

/// Answer text with its rendered form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Answer {
    /// Heading above the answer ("Answer:" or the model name)
    pub heading: String,
    /// Accumulated raw text
    pub text: String,
    /// Rendered HTML of `text`
    pub html: String,
}

/// In-progress stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LiveView {
    /// Pipeline progress; empty for flows without stages
    pub steps: Vec<Step>,
    /// Answer so far, once the first token (or the stream) arrived
    pub answer: Option<Answer>,
    /// Show the trailing cursor glyph
    pub cursor: bool,
}

/// Finished stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultView {
    /// Success banner ("Search completed in 1.2s")
    pub banner: Option<String>,
    /// Final answer
    pub answer: Answer,
    /// Sources cited
    pub sources: Vec<SourceView>,
    /// Retrieved chunks
    pub chunks: Vec<ChunkView>,
    /// Stats or timing box
    pub details: Option<DetailsView>,
    /// Query refinement notice
    pub refinement: Option<Refinement>,
}

/// A cited source
#[derive(Debug, Clone, PartialEq)]
pub enum SourceView {
    /// Web page
    Web {
        /// Page title
        title: String,
        /// Page URL
        url: String,
        /// Date, when known
        date: Option<String>,
    },
    /// Indexed document, by file name
    Document(String),
}

/// A retrieved chunk
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkView {
    /// 1-based rank
    pub rank: usize,
    /// Similarity as a percentage
    pub similarity_pct: f64,
    /// File the chunk came from
    pub file_name: String,
    /// Leading text
    pub preview: String,
}

/// Labelled figures shown in a stats box
#[derive(Debug, Clone, PartialEq)]
pub struct DetailsView {
    /// Box title
    pub title: String,
    /// Figures in display order
    pub items: Vec<StatItem>,
    /// Footnote
    pub note: Option<String>,
}

/// One figure in a [`DetailsView`]
#[derive(Debug, Clone, PartialEq)]
pub struct StatItem {
    /// Label ("Duration")
    pub label: String,
    /// Formatted value ("1.25s")
    pub value: String,
}

impl StatItem {
    /// Build a figure from anything displayable
    pub fn new(label: impl Into<String>, value: impl std::fmt::Display) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
        }
    }
}

impl DetailsView {
    /// Look up a figure's value by label
    pub fn value(&self, label: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|item| item.label == label)
            .map(|item| item.value.as_str())
    }
}

/// Notice that the search query had to be rewritten
#[derive(Debug, Clone, PartialEq)]
pub struct Refinement {
    /// Attempts made
    pub attempts: u32,
    /// Query as typed
    pub original_query: String,
    /// Query that produced results
    pub final_query: String,
}

/// Error panel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorView {
    /// Heading ("Connection Error")
    pub title: Option<String>,
    /// Error text
    pub message: String,
    /// Secondary detail line
    pub details: Option<String>,
    /// Heading for `hints`
    pub hint_title: Option<String>,
    /// Suggested causes or fixes
    pub hints: Vec<String>,
    /// Trailing line ("Time elapsed: 1.2s")
    pub footer: Option<String>,
}

impl ErrorView {
    /// Error panel with only a message
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Receives view updates in order
pub trait ViewSink: Send {
    /// Apply one update
    fn apply(&mut self, update: &ViewUpdate);
}

/// Forwards every update to several sinks
pub struct Tee<'a> {
    sinks: Vec<&'a mut dyn ViewSink>,
}

impl<'a> Tee<'a> {
    /// Fan out to `sinks`, in order
    pub fn new(sinks: Vec<&'a mut dyn ViewSink>) -> Self {
        Self { sinks }
    }
}

impl ViewSink for Tee<'_> {
    fn apply(&mut self, update: &ViewUpdate) {
        for sink in self.sinks.iter_mut() {
            sink.apply(update);
        }
    }
}
