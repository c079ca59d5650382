//! Answer text rendering
//!
//! RAG answers are plain text, escaped once per delta into an
//! [`AnswerBuffer`]. LLM answers get light markup (reasoning block, code
//! fences, inline code, bold) from [`format_llm_answer`]; because that needs
//! the whole text, streaming re-renders are paced by a [`RenderThrottle`].

use std::sync::OnceLock;
use std::time::{Duration, Instant};

use regex::Regex;

use crate::view::html::escape_html;
use crate::view::Answer;

/// Accumulates answer text together with its escaped HTML.
///
/// Escaping is character-local, so escaping each delta and appending gives
/// the same result as escaping the whole text.
#[derive(Debug, Clone, Default)]
pub struct AnswerBuffer {
    text: String,
    html: String,
}

impl AnswerBuffer {
    /// Create an empty buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta
    pub fn push(&mut self, delta: &str) {
        self.text.push_str(delta);
        self.html.push_str(&escape_html(delta));
    }

    /// Raw accumulated text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Escaped accumulated text
    pub fn html(&self) -> &str {
        &self.html
    }

    /// True until the first non-empty delta
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Snapshot under `heading`
    pub fn answer(&self, heading: &str) -> Answer {
        Answer {
            heading: heading.to_string(),
            text: self.text.clone(),
            html: self.html.clone(),
        }
    }
}

/// Limits how often a streaming answer is re-formatted
#[derive(Debug, Clone)]
pub struct RenderThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl RenderThrottle {
    /// Allow at most one render per `interval`; zero allows every render
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// Returns true (and records the render) when a render is due
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        match self.last {
            Some(last) if now.duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

fn think_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)&lt;think&gt;(.*?)&lt;/think&gt;").expect("valid think regex")
    })
}

fn open_think_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)&lt;think&gt;(.*)$").expect("valid open think regex"))
}

fn code_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(\w+)?\n(.*?)```").expect("valid fence regex"))
}

fn inline_code() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"`([^`]+)`").expect("valid inline code regex"))
}

fn bold() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*([^*]+)\*\*").expect("valid bold regex"))
}

fn reasoning_panel(reasoning: &str, in_progress: bool) -> String {
    let class = if in_progress {
        "reasoning reasoning-live"
    } else {
        "reasoning"
    };
    format!(
        "<div class=\"{}\"><strong>🧠 Reasoning:</strong><br><em>{}</em></div>",
        class,
        reasoning.trim()
    )
}

/// Render an LLM answer as HTML.
///
/// The text is escaped first, then:
/// - `<think>…</think>` becomes a reasoning panel (an unclosed block renders
///   as a live panel holding the partial reasoning)
/// - ```` ```lang ```` fences become labelled code panels
/// - `` `code` `` and `**bold**` get minimal styling
/// - newlines become `<br>`
///
/// # Examples
///
/// ```
/// use ragstream::view::format::format_llm_answer;
///
/// let html = format_llm_answer("<think>plan</think>**Done**");
/// assert!(html.contains("Reasoning"));
/// assert!(html.ends_with("<strong>Done</strong>"));
/// ```
pub fn format_llm_answer(text: &str) -> String {
    let escaped = escape_html(text);

    let with_reasoning = think_block().replace_all(&escaped, |caps: &regex::Captures| {
        reasoning_panel(&caps[1], false)
    });
    let with_reasoning = open_think_block().replace(&with_reasoning, |caps: &regex::Captures| {
        reasoning_panel(&caps[1], true)
    });

    let with_fences = code_fence().replace_all(&with_reasoning, |caps: &regex::Captures| {
        let language = caps.get(1).map(|m| m.as_str()).unwrap_or("code");
        format!(
            "<div class=\"code-header\">{}</div><pre><code>{}</code></pre>",
            language,
            caps[2].trim()
        )
    });

    let with_inline = inline_code().replace_all(&with_fences, "<code>$1</code>");
    let with_bold = bold().replace_all(&with_inline, "<strong>$1</strong>");

    with_bold.replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answer_buffer_incremental_escape_matches_whole() {
        let mut buffer = AnswerBuffer::new();
        for delta in ["a <b", "> & \"", "c'"] {
            buffer.push(delta);
        }
        assert_eq!(buffer.text(), "a <b> & \"c'");
        assert_eq!(buffer.html(), escape_html("a <b> & \"c'"));
    }

    #[test]
    fn test_reasoning_precedes_final_body() {
        let html = format_llm_answer("<think>reasoning</think>final");
        let panel = html.find("class=\"reasoning\"").expect("reasoning panel");
        let reasoning = html.find("reasoning</em>").expect("reasoning text");
        let body = html.rfind("final").expect("final body");
        assert!(panel < reasoning);
        assert!(reasoning < body);
        assert!(html.ends_with("</div>final"));
    }

    #[test]
    fn test_unclosed_think_renders_live_panel() {
        let html = format_llm_answer("<think>still going");
        assert!(html.contains("reasoning-live"));
        assert!(html.contains("still going"));
        assert!(!html.contains("&lt;think&gt;"));
    }

    #[test]
    fn test_code_fence_is_labelled_and_escaped() {
        let html = format_llm_answer("Look:\n```rust\nfn f() -> Vec<u8> {}\n```");
        assert!(html.contains("<div class=\"code-header\">rust</div>"));
        assert!(html.contains("<pre><code>fn f() -&gt; Vec&lt;u8&gt; {}</code></pre>"));
    }

    #[test]
    fn test_code_fence_without_language() {
        let html = format_llm_answer("```\nx\n```");
        assert!(html.contains("<div class=\"code-header\">code</div>"));
    }

    #[test]
    fn test_inline_code_bold_and_breaks() {
        let html = format_llm_answer("use `a<b` and **care**\nbye");
        assert_eq!(
            html,
            "use <code>a&lt;b</code> and <strong>care</strong><br>bye"
        );
    }

    #[test]
    fn test_raw_markup_is_neutralized() {
        let html = format_llm_answer("<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_zero_interval_throttle_always_ready() {
        let mut throttle = RenderThrottle::new(Duration::ZERO);
        assert!(throttle.ready());
        assert!(throttle.ready());
    }

    #[test]
    fn test_throttle_suppresses_within_interval() {
        let mut throttle = RenderThrottle::new(Duration::from_secs(3600));
        assert!(throttle.ready());
        assert!(!throttle.ready());
    }
}
