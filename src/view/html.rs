//! HTML rendering of flow panels
//!
//! Produces Bootstrap-flavoured fragments meant for a page's response
//! container, so exported HTML picks up the dashboard page styles.

use std::fmt::Write as _;

use crate::flows::progress::{Step, StepState};
use crate::view::{
    Answer, ChunkView, DetailsView, ErrorView, LiveView, Panel, PendingView, Refinement,
    ResultView, SourceView, ViewSink, ViewUpdate, CURSOR,
};

/// Escape text for safe inclusion in HTML element content or a quoted
/// attribute value.
///
/// # Examples
///
/// ```
/// use ragstream::view::html::escape_html;
///
/// assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

const CURSOR_HTML: &str = "<span class=\"blinking-cursor\">▊</span>";

/// Render one panel as an HTML fragment
pub fn render_panel(panel: &Panel) -> String {
    match panel {
        Panel::Pending(view) => render_pending(view),
        Panel::Warning(message) => format!(
            "<div class=\"alert alert-warning\"><i class=\"fas fa-exclamation-circle\"></i> {}</div>",
            escape_html(message)
        ),
        Panel::Live(view) => render_live(view),
        Panel::Result(view) => render_result(view),
        Panel::Error(view) => render_error(view),
    }
}

fn render_pending(view: &PendingView) -> String {
    if view.reasoning {
        let mut html = format!(
            "<div class=\"alert alert-warning text-center\"><i class=\"fas fa-brain\"></i> {}",
            escape_html(&view.message)
        );
        if let Some(detail) = &view.detail {
            let _ = write!(
                html,
                "<div class=\"small text-muted mt-2\">{}</div>",
                escape_html(detail)
            );
        }
        html.push_str("</div>");
        html
    } else {
        format!(
            "<div class=\"text-center\"><div class=\"spinner-border text-primary\" role=\"status\"></div><p class=\"mt-2 text-muted\">{}</p></div>",
            escape_html(&view.message)
        )
    }
}

fn render_steps(steps: &[Step]) -> String {
    let mut html = String::from("<div class=\"status-progress\">");
    for step in steps {
        let (class, icon) = match step.state {
            StepState::Pending => ("status-step", "far fa-circle me-2"),
            StepState::Active => ("status-step active", "fas fa-spinner fa-spin me-2"),
            StepState::Complete => ("status-step complete", "fas fa-check-circle me-2"),
        };
        let _ = write!(
            html,
            "<div class=\"{}\" id=\"step-{}\"><i class=\"{}\"></i>{}</div>",
            class,
            step.id,
            icon,
            escape_html(&step.label)
        );
    }
    html.push_str("</div>");
    html
}

fn render_answer(answer: &Answer, cursor: bool) -> String {
    format!(
        "<div class=\"alert alert-light mt-3\"><h5><i class=\"fas fa-lightbulb\"></i> {}</h5><p class=\"answer-text\">{}{}</p></div>",
        escape_html(&answer.heading),
        answer.html,
        if cursor { CURSOR_HTML } else { "" }
    )
}

fn render_live(view: &LiveView) -> String {
    let mut html = String::new();
    if !view.steps.is_empty() {
        html.push_str(&render_steps(&view.steps));
    }
    match &view.answer {
        Some(answer) => html.push_str(&render_answer(answer, view.cursor)),
        None if view.steps.is_empty() && view.cursor => html.push_str(CURSOR_HTML),
        None => {}
    }
    html
}

fn render_sources(sources: &[SourceView]) -> String {
    let mut html = String::new();
    let documents: Vec<&String> = sources
        .iter()
        .filter_map(|s| match s {
            SourceView::Document(name) => Some(name),
            SourceView::Web { .. } => None,
        })
        .collect();
    let pages: Vec<&SourceView> = sources
        .iter()
        .filter(|s| matches!(s, SourceView::Web { .. }))
        .collect();

    if !documents.is_empty() {
        html.push_str("<h6 class=\"mt-3\"><i class=\"fas fa-file-pdf\"></i> Sources Used:</h6>");
        for name in documents {
            let _ = write!(
                html,
                "<span class=\"badge bg-secondary me-2 mb-2\"><i class=\"fas fa-file\"></i> {}</span>",
                escape_html(name)
            );
        }
    }

    if !pages.is_empty() {
        html.push_str("<h6 class=\"mt-3\"><i class=\"fas fa-book\"></i> Sources:</h6>");
        for page in pages {
            if let SourceView::Web { title, url, date } = page {
                let _ = write!(
                    html,
                    "<div class=\"rag-source\"><div class=\"rag-source-title\"><i class=\"fas fa-link\"></i> {}</div><a href=\"{}\" target=\"_blank\" class=\"rag-source-url\">{}</a>",
                    escape_html(title),
                    escape_html(url),
                    escape_html(url)
                );
                if let Some(date) = date {
                    let _ = write!(
                        html,
                        "<div class=\"text-muted small mt-1\"><i class=\"far fa-calendar\"></i> {}</div>",
                        escape_html(date)
                    );
                }
                html.push_str("</div>");
            }
        }
    }

    html
}

fn render_chunks(chunks: &[ChunkView]) -> String {
    if chunks.is_empty() {
        return String::new();
    }
    let mut html = format!(
        "<div class=\"mt-3\"><h6><i class=\"fas fa-puzzle-piece\"></i> Retrieved Chunks ({}):</h6>",
        chunks.len()
    );
    for chunk in chunks {
        let _ = write!(
            html,
            "<div class=\"card mb-2\"><div class=\"card-body p-2\"><small><strong>#{}</strong> - <span class=\"badge badge-gradient\">{:.1}% match</span> <span class=\"text-muted\">from {}</span><br><span class=\"text-muted\">{}</span></small></div></div>",
            chunk.rank,
            chunk.similarity_pct,
            escape_html(&chunk.file_name),
            escape_html(&chunk.preview)
        );
    }
    html.push_str("</div>");
    html
}

fn render_details(details: &DetailsView) -> String {
    let mut html = format!(
        "<div class=\"stats-box mt-3\"><strong><i class=\"fas fa-clock\"></i> {}</strong><div class=\"row mt-2\">",
        escape_html(&details.title)
    );
    for item in &details.items {
        let _ = write!(
            html,
            "<div class=\"col-6\">{}: {}</div>",
            escape_html(&item.label),
            escape_html(&item.value)
        );
    }
    html.push_str("</div>");
    if let Some(note) = &details.note {
        let _ = write!(
            html,
            "<small class=\"text-muted d-block mt-2\"><i class=\"fas fa-info-circle\"></i> {}</small>",
            escape_html(note)
        );
    }
    html.push_str("</div>");
    html
}

fn render_refinement(refinement: &Refinement) -> String {
    format!(
        "<div class=\"alert alert-theme-info mb-0\"><i class=\"fas fa-magic\"></i> <strong>Query Refinement:</strong> No results found for original query. Successfully refined after {} attempt(s).<br><small class=\"text-muted\">Original: \"{}\" → Refined: \"{}\"</small></div>",
        refinement.attempts,
        escape_html(&refinement.original_query),
        escape_html(&refinement.final_query)
    )
}

fn render_result(view: &ResultView) -> String {
    let mut html = String::new();
    if let Some(banner) = &view.banner {
        let _ = write!(
            html,
            "<div class=\"alert alert-success mb-3\"><i class=\"fas fa-check-circle\"></i> {}</div>",
            escape_html(banner)
        );
    }
    html.push_str(&render_answer(&view.answer, false));
    html.push_str(&render_sources(&view.sources));
    html.push_str(&render_chunks(&view.chunks));
    if let Some(details) = &view.details {
        html.push_str(&render_details(details));
    }
    if let Some(refinement) = &view.refinement {
        html.push_str(&render_refinement(refinement));
    }
    html
}

fn render_error(view: &ErrorView) -> String {
    let mut html = String::from("<div class=\"alert alert-danger\">");
    match &view.title {
        Some(title) => {
            let _ = write!(
                html,
                "<h5><i class=\"fas fa-exclamation-triangle\"></i> {}</h5><p>{}</p>",
                escape_html(title),
                escape_html(&view.message)
            );
        }
        None => {
            let _ = write!(
                html,
                "<i class=\"fas fa-exclamation-triangle\"></i> {}",
                escape_html(&view.message)
            );
        }
    }
    if let Some(details) = &view.details {
        let _ = write!(
            html,
            "<small class=\"text-muted\">{}</small>",
            escape_html(details)
        );
    }
    if !view.hints.is_empty() {
        html.push_str("<hr><small>");
        if let Some(hint_title) = &view.hint_title {
            let _ = write!(html, "<strong>{}</strong>", escape_html(hint_title));
        }
        html.push_str("<ul class=\"mb-0\">");
        for hint in &view.hints {
            let _ = write!(html, "<li>{}</li>", escape_html(hint));
        }
        html.push_str("</ul></small>");
    }
    if let Some(footer) = &view.footer {
        let _ = write!(
            html,
            "<div class=\"small text-muted mt-2\">{}</div>",
            escape_html(footer)
        );
    }
    html.push_str("</div>");
    html
}

/// A flow's response container, kept as HTML.
///
/// Every panel update replaces the body wholesale.
#[derive(Debug, Clone, Default)]
pub struct HtmlDocument {
    mode_label: Option<String>,
    body: String,
    updates: usize,
}

impl HtmlDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Current response container contents
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Current mode indicator text
    pub fn mode_label(&self) -> Option<&str> {
        self.mode_label.as_deref()
    }

    /// Number of updates applied
    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Full fragment: mode indicator (if any) followed by the body
    pub fn to_html(&self) -> String {
        match &self.mode_label {
            Some(label) => format!(
                "<span id=\"smartMode\">{}</span>\n{}",
                escape_html(label),
                self.body
            ),
            None => self.body.clone(),
        }
    }
}

impl ViewSink for HtmlDocument {
    fn apply(&mut self, update: &ViewUpdate) {
        self.updates += 1;
        match update {
            ViewUpdate::Panel(panel) => self.body = render_panel(panel),
            ViewUpdate::ModeLabel(label) => self.mode_label = Some(label.clone()),
        }
    }
}
