//! Console rendering of flow panels
//!
//! The terminal cannot redraw a panel in place, so [`TerminalSink`] prints
//! what changed between updates: newly completed steps, the answer text
//! beyond what was already printed, and the closing summary.

use std::io::Write;

use colored::Colorize;

use crate::flows::progress::StepState;
use crate::view::{
    ChunkView, DetailsView, ErrorView, LiveView, Panel, ResultView, SourceView, ViewSink,
    ViewUpdate,
};

/// Prints view updates incrementally to a writer
pub struct TerminalSink<W: Write + Send> {
    out: W,
    printed: String,
    heading_shown: bool,
    steps: Vec<(&'static str, StepState, String)>,
}

impl TerminalSink<std::io::Stdout> {
    /// Sink writing to standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalSink<W> {
    /// Sink writing to `out`
    pub fn new(out: W) -> Self {
        Self {
            out,
            printed: String::new(),
            heading_shown: false,
            steps: Vec::new(),
        }
    }

    /// Recover the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        if let Err(e) = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
        {
            tracing::debug!(error = %e, "Failed to write to terminal");
        }
    }

    fn line(&mut self, text: &str) {
        self.emit(&format!("{}\n", text));
    }

    fn reset(&mut self) {
        self.printed.clear();
        self.heading_shown = false;
        self.steps.clear();
    }

    fn close_answer(&mut self) {
        if !self.printed.is_empty() && !self.printed.ends_with('\n') {
            self.emit("\n");
        }
    }

    fn print_steps(&mut self, view: &LiveView) {
        for step in &view.steps {
            let known = self.steps.iter().position(|(id, _, _)| *id == step.id);
            let changed = match known {
                Some(i) => self.steps[i].1 != step.state || self.steps[i].2 != step.label,
                None => step.state != StepState::Pending,
            };
            if !changed {
                continue;
            }
            match step.state {
                StepState::Active => {
                    let text = format!("  {} {}", "…".cyan(), step.label);
                    self.line(&text);
                }
                StepState::Complete => {
                    let text = format!("  {} {}", "✓".green(), step.label);
                    self.line(&text);
                }
                StepState::Pending => {}
            }
            match known {
                Some(i) => self.steps[i] = (step.id, step.state, step.label.clone()),
                None => self.steps.push((step.id, step.state, step.label.clone())),
            }
        }
    }

    fn print_answer_delta(&mut self, heading: &str, text: &str) {
        if !self.heading_shown {
            let heading = format!("{}", heading.bold());
            self.line(&heading);
            self.heading_shown = true;
        }
        match text.strip_prefix(self.printed.as_str()) {
            Some(delta) if !delta.is_empty() => {
                let delta = delta.to_string();
                self.emit(&delta);
                self.printed.push_str(&delta);
            }
            Some(_) => {}
            None => {
                self.close_answer();
                self.emit(text);
                self.printed = text.to_string();
            }
        }
    }

    fn print_sources(&mut self, sources: &[SourceView]) {
        if sources.is_empty() {
            return;
        }
        let heading = format!("{}", "Sources:".bold());
        self.line(&heading);
        for source in sources {
            let text = match source {
                SourceView::Document(name) => format!("  - {}", name),
                SourceView::Web { title, url, date } => match date {
                    Some(date) => format!("  - {} <{}> ({})", title, url.underline(), date),
                    None => format!("  - {} <{}>", title, url.underline()),
                },
            };
            self.line(&text);
        }
    }

    fn print_chunks(&mut self, chunks: &[ChunkView]) {
        if chunks.is_empty() {
            return;
        }
        let heading = format!("{}", format!("Retrieved Chunks ({}):", chunks.len()).bold());
        self.line(&heading);
        for chunk in chunks {
            let text = format!(
                "  #{} {:.1}% match from {}: {}",
                chunk.rank,
                chunk.similarity_pct,
                chunk.file_name,
                chunk.preview.dimmed()
            );
            self.line(&text);
        }
    }

    fn print_details(&mut self, details: &DetailsView) {
        let heading = format!("{}", details.title.bold());
        self.line(&heading);
        for item in &details.items {
            let text = format!("  {}: {}", item.label, item.value);
            self.line(&text);
        }
        if let Some(note) = &details.note {
            let text = format!("  {}", note.dimmed());
            self.line(&text);
        }
    }

    fn print_result(&mut self, view: &ResultView) {
        self.print_answer_delta(&view.answer.heading, &view.answer.text);
        self.close_answer();
        if let Some(banner) = &view.banner {
            let text = format!("{} {}", "✓".green(), banner.green());
            self.line(&text);
        }
        self.print_sources(&view.sources);
        self.print_chunks(&view.chunks);
        if let Some(details) = &view.details {
            self.print_details(details);
        }
        if let Some(refinement) = &view.refinement {
            let text = format!(
                "{} Query refined after {} attempt(s): \"{}\" -> \"{}\"",
                "ℹ".blue(),
                refinement.attempts,
                refinement.original_query,
                refinement.final_query
            );
            self.line(&text);
        }
    }

    fn print_error(&mut self, view: &ErrorView) {
        self.close_answer();
        let text = match &view.title {
            Some(title) => format!("{} {}: {}", "✗".red(), title.red().bold(), view.message),
            None => format!("{} {}", "✗".red(), view.message.red()),
        };
        self.line(&text);
        if let Some(details) = &view.details {
            let text = format!("  {}", details.dimmed());
            self.line(&text);
        }
        if let Some(hint_title) = &view.hint_title {
            self.line(&format!("  {}", hint_title));
        }
        for hint in &view.hints {
            self.line(&format!("    - {}", hint));
        }
        if let Some(footer) = &view.footer {
            let text = format!("  {}", footer.dimmed());
            self.line(&text);
        }
    }
}

impl<W: Write + Send> ViewSink for TerminalSink<W> {
    fn apply(&mut self, update: &ViewUpdate) {
        match update {
            ViewUpdate::ModeLabel(label) => {
                let text = format!("{}", label.bold());
                self.line(&text);
            }
            ViewUpdate::Panel(Panel::Pending(view)) => {
                self.reset();
                let text = format!("{}", view.message.dimmed());
                self.line(&text);
                if let Some(detail) = &view.detail {
                    let text = format!("{}", detail.dimmed());
                    self.line(&text);
                }
            }
            ViewUpdate::Panel(Panel::Warning(message)) => {
                self.reset();
                let text = format!("{} {}", "⚠".yellow(), message.yellow());
                self.line(&text);
            }
            ViewUpdate::Panel(Panel::Live(view)) => {
                self.print_steps(view);
                if let Some(answer) = &view.answer {
                    self.print_answer_delta(&answer.heading, &answer.text);
                }
            }
            ViewUpdate::Panel(Panel::Result(view)) => self.print_result(view),
            ViewUpdate::Panel(Panel::Error(view)) => self.print_error(view),
        }
    }
}
