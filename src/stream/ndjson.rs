//! Newline-delimited JSON framing
//!
//! [`LineBuffer`] reassembles lines from arbitrarily fragmented byte chunks,
//! and [`consume`] drives a response body through framing, parsing, and
//! classification, handing one classified line at a time to the caller.

use bytes::BytesMut;
use futures::{Stream, StreamExt};

use crate::error::{Result, RagstreamError};
use crate::stream::envelope::{classify, Envelope, StreamEvent};

/// Accumulates raw bytes and yields complete `\n`-terminated lines.
///
/// Bytes are only decoded once a full line is available, so a multi-byte
/// UTF-8 sequence split across two reads decodes correctly.
///
/// # Examples
///
/// ```
/// use ragstream::stream::LineBuffer;
///
/// let mut buffer = LineBuffer::new();
/// assert!(buffer.push(b"{\"resp").is_empty());
/// assert_eq!(buffer.push(b"onse\":\"hi\"}\n{"), vec![r#"{"response":"hi"}"#]);
/// assert_eq!(buffer.finish(), Some("{".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: BytesMut,
    // Prefix of `pending` already known to hold no newline
    scanned: usize,
}

impl LineBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completed, in order.
    ///
    /// A trailing `\r` is stripped from each line; the unterminated tail
    /// stays buffered for the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(offset) = self.pending[self.scanned..]
            .iter()
            .position(|b| *b == b'\n')
        {
            let pos = self.scanned + offset;
            let line = self.pending.split_to(pos + 1);
            lines.push(decode_line(&line[..pos]));
            self.scanned = 0;
        }
        self.scanned = self.pending.len();
        lines
    }

    /// Drain the unterminated tail once the stream has ended
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = self.pending.split();
        self.scanned = 0;
        Some(decode_line(&rest))
    }

    /// Number of buffered bytes not yet forming a complete line
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Parse one NDJSON line into an [`Envelope`].
///
/// Blank lines yield `None` silently. Lines that are not a JSON object are
/// logged and yield `None`; they never abort the stream.
pub fn parse_line(line: &str) -> Option<Envelope> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Envelope>(trimmed) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            tracing::warn!(error = %e, line = %trimmed, "Skipping malformed NDJSON line");
            None
        }
    }
}

/// Counters reported once a stream has been fully consumed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Lines parsed and handed to the caller
    pub lines: usize,
    /// Non-blank lines that failed to parse
    pub skipped: usize,
    /// Raw bytes read from the body
    pub bytes: usize,
}

/// Consume an NDJSON byte stream, calling `on_line` with the classified
/// events of every parsed line in arrival order.
///
/// A non-empty unterminated tail left when the stream ends is processed as
/// a final line.
///
/// # Errors
///
/// Returns [`RagstreamError::Transport`] if the underlying body fails
/// mid-stream. Lines handled before the failure have already been delivered.
pub async fn consume<S, B, E, F>(byte_stream: S, mut on_line: F) -> Result<StreamStats>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
    F: FnMut(Vec<StreamEvent>),
{
    let mut buffer = LineBuffer::new();
    let mut stats = StreamStats::default();

    tokio::pin!(byte_stream);

    let mut dispatch = |line: &str, stats: &mut StreamStats| {
        if line.trim().is_empty() {
            return;
        }
        match parse_line(line) {
            Some(envelope) => {
                stats.lines += 1;
                on_line(classify(&envelope));
            }
            None => stats.skipped += 1,
        }
    };

    while let Some(chunk) = byte_stream.next().await {
        let chunk = chunk.map_err(|e| {
            RagstreamError::Transport(format!("Response stream interrupted: {}", e))
        })?;
        let bytes = chunk.as_ref();
        stats.bytes += bytes.len();

        for line in buffer.push(bytes) {
            dispatch(&line, &mut stats);
        }
    }

    if let Some(tail) = buffer.finish() {
        dispatch(&tail, &mut stats);
    }

    tracing::debug!(
        lines = stats.lines,
        skipped = stats.skipped,
        bytes = stats.bytes,
        "NDJSON stream finished"
    );

    Ok(stats)
}
