//! NDJSON streaming protocol shared by every flow
//!
//! - [`ndjson`]: byte framing and the [`consume`] driver
//! - [`envelope`]: the per-line [`Envelope`] and its [`StreamEvent`] classification
//! - [`metadata`]: retrieval metadata carried by RAG streams
//! - [`lenient`]: type-forgiving field deserializers

pub mod envelope;
pub mod lenient;
pub mod metadata;
pub mod ndjson;

pub use envelope::{classify, Completion, Envelope, StreamEvent, StreamMode};
pub use metadata::{Metadata, RelevantChunk, Source, StageTiming, WebSource};
pub use ndjson::{consume, parse_line, LineBuffer, StreamStats};
