//! Plain LLM generation (`/api/generate`)

use std::time::{Duration, Instant};

use serde_json::Value;

use crate::api::GenerateRequest;
use crate::config::{GenerationOptions, LlmConfig};
use crate::error::Result;
use crate::flows::{elapsed, Flow, FlowKind, InputCheck};
use crate::stream::{Completion, StreamEvent};
use crate::view::format::{format_llm_answer, RenderThrottle};
use crate::view::{
    Answer, DetailsView, ErrorView, LiveView, Panel, PendingView, ResultView, StatItem, ViewUpdate,
};

const REASONING_DIRECTIVE: &str = "/think\nBefore giving your final answer, write your reasoning inside <think>...</think> tags.\nThen after </think>, provide the final answer clearly and concisely.\n";

/// Streams a completion from the local model.
///
/// Reasoning models get a `/think` directive prepended to the prompt, and
/// the answer is rendered with [`format_llm_answer`] so their `<think>`
/// block shows as a separate panel.
pub struct LlmFlow {
    prompt: String,
    model: String,
    reasoning: bool,
    options: GenerationOptions,
    throttle: RenderThrottle,
    started: Option<Instant>,
    answer: String,
    tokens: u64,
    dirty: bool,
    finalized: bool,
}

impl LlmFlow {
    /// Create a flow sending `prompt` to `model`
    pub fn new(prompt: &str, model: &str, config: &LlmConfig, render_interval: Duration) -> Self {
        Self {
            prompt: prompt.trim().to_string(),
            model: model.to_string(),
            reasoning: config.is_reasoning_model(model),
            options: config.options,
            throttle: RenderThrottle::new(render_interval),
            started: None,
            answer: String::new(),
            tokens: 0,
            dirty: false,
            finalized: false,
        }
    }

    /// Prompt as sent, including the reasoning directive when it applies
    pub fn prompt_to_send(&self) -> String {
        if self.reasoning {
            format!("{}{}", REASONING_DIRECTIVE, self.prompt)
        } else {
            self.prompt.clone()
        }
    }

    fn answer_view(&self) -> Answer {
        Answer {
            heading: self.model.clone(),
            text: self.answer.clone(),
            html: format_llm_answer(&self.answer),
        }
    }

    fn live(&mut self) -> ViewUpdate {
        self.dirty = false;
        ViewUpdate::Panel(Panel::Live(LiveView {
            steps: Vec::new(),
            answer: Some(self.answer_view()),
            cursor: true,
        }))
    }

    fn complete(&mut self, completion: &Completion) -> ViewUpdate {
        self.finalized = true;
        self.dirty = false;

        let took = elapsed(self.started);
        let secs = took.as_secs_f64().max(0.01);
        let output = completion
            .eval_count
            .filter(|count| *count > 0)
            .unwrap_or(self.tokens);

        tracing::debug!(
            model = %self.model,
            tokens = self.tokens,
            eval_count = ?completion.eval_count,
            "Generation finished"
        );

        ViewUpdate::Panel(Panel::Result(ResultView {
            answer: self.answer_view(),
            details: Some(DetailsView {
                title: "Performance Stats".to_string(),
                items: vec![
                    StatItem::new("Duration", format!("{:.2}s", took.as_secs_f64())),
                    StatItem::new("Speed", format!("{:.1} tok/s", self.tokens as f64 / secs)),
                    StatItem::new(
                        "Input",
                        format!("{} tokens", completion.prompt_eval_count.unwrap_or(0)),
                    ),
                    StatItem::new("Output", format!("{} tokens", output)),
                ],
                note: None,
            }),
            ..ResultView::default()
        }))
    }
}

impl Flow for LlmFlow {
    fn kind(&self) -> FlowKind {
        FlowKind::Llm
    }

    fn check_input(&self) -> InputCheck {
        if self.prompt.is_empty() {
            InputCheck::Ignore
        } else {
            InputCheck::Ready
        }
    }

    fn request_body(&self) -> Result<Value> {
        Ok(serde_json::to_value(GenerateRequest {
            model: self.model.clone(),
            prompt: self.prompt_to_send(),
            stream: true,
            options: self.options,
        })?)
    }

    fn begin(&mut self) -> Vec<ViewUpdate> {
        self.started = Some(Instant::now());
        let pending = if self.reasoning {
            PendingView {
                message: "Gathering thoughts...".to_string(),
                detail: Some(
                    "This model will show its reasoning before the final answer.".to_string(),
                ),
                reasoning: true,
            }
        } else {
            PendingView {
                message: "Thinking...".to_string(),
                detail: None,
                reasoning: false,
            }
        };
        vec![ViewUpdate::Panel(Panel::Pending(pending))]
    }

    fn stream_opened(&mut self) -> Vec<ViewUpdate> {
        vec![self.live()]
    }

    fn handle_event(&mut self, event: StreamEvent) -> Vec<ViewUpdate> {
        match event {
            StreamEvent::Token(text) => {
                self.answer.push_str(&text);
                self.tokens += 1;
                self.dirty = true;
                if self.throttle.ready() {
                    vec![self.live()]
                } else {
                    Vec::new()
                }
            }
            StreamEvent::Complete(completion) => vec![self.complete(&completion)],
            StreamEvent::Error { error, details } => {
                vec![ViewUpdate::Panel(Panel::Error(ErrorView {
                    message: error,
                    details,
                    ..ErrorView::default()
                }))]
            }
            StreamEvent::Mode(_) | StreamEvent::Status { .. } | StreamEvent::Metadata(_) => {
                Vec::new()
            }
        }
    }

    fn finish(&mut self) -> Vec<ViewUpdate> {
        if self.dirty && !self.finalized {
            vec![self.live()]
        } else {
            Vec::new()
        }
    }

    fn transport_error(&mut self, error: &anyhow::Error) -> Vec<ViewUpdate> {
        vec![ViewUpdate::Panel(Panel::Error(ErrorView {
            message: format!("Error: {}", error),
            details: Some(format!(
                "Make sure the model is installed: ollama pull {}",
                self.model
            )),
            ..ErrorView::default()
        }))]
    }

    fn finalized(&self) -> bool {
        self.finalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow(model: &str) -> LlmFlow {
        LlmFlow::new("Say hi", model, &LlmConfig::default(), Duration::ZERO)
    }

    fn result(updates: &[ViewUpdate]) -> &ResultView {
        match updates.last() {
            Some(ViewUpdate::Panel(Panel::Result(view))) => view,
            other => panic!("expected result panel, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_model_prompt_unchanged() {
        let flow = flow("llama3.2:1b");
        assert_eq!(flow.prompt_to_send(), "Say hi");
        let body = flow.request_body().unwrap();
        assert_eq!(body["model"], "llama3.2:1b");
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_reasoning_model_gets_directive_and_pending_hint() {
        let mut flow = flow("hf.co/JOSIEFIED-Qwen3:8b");
        assert!(flow.prompt_to_send().starts_with("/think\n"));
        assert!(flow.prompt_to_send().ends_with("\nSay hi"));
        match &flow.begin()[..] {
            [ViewUpdate::Panel(Panel::Pending(p))] => {
                assert_eq!(p.message, "Gathering thoughts...");
                assert!(p.reasoning);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tokens_accumulate_and_output_uses_eval_count() {
        let mut flow = flow("llama3.2:1b");
        flow.begin();
        flow.handle_event(StreamEvent::Token("Hel".to_string()));
        flow.handle_event(StreamEvent::Token("lo".to_string()));
        let updates = flow.handle_event(StreamEvent::Complete(Completion {
            done: true,
            eval_count: Some(7),
            ..Completion::default()
        }));

        let view = result(&updates);
        assert_eq!(view.answer.text, "Hello");
        let details = view.details.as_ref().unwrap();
        assert_eq!(details.value("Output"), Some("7 tokens"));
        assert_eq!(details.value("Input"), Some("0 tokens"));
        assert!(flow.finalized());
    }

    #[test]
    fn test_output_falls_back_to_counted_tokens() {
        let mut flow = flow("llama3.2:1b");
        flow.begin();
        for t in ["a", "b", "c"] {
            flow.handle_event(StreamEvent::Token(t.to_string()));
        }
        let updates = flow.handle_event(StreamEvent::Complete(Completion {
            done: true,
            eval_count: Some(0),
            prompt_eval_count: Some(12),
            ..Completion::default()
        }));
        let details = result(&updates).details.clone().unwrap();
        assert_eq!(details.value("Output"), Some("3 tokens"));
        assert_eq!(details.value("Input"), Some("12 tokens"));
    }

    #[test]
    fn test_throttled_tokens_flushed_at_stream_end() {
        let mut flow = LlmFlow::new(
            "q",
            "llama3.2:1b",
            &LlmConfig::default(),
            Duration::from_secs(3600),
        );
        flow.begin();
        assert_eq!(flow.handle_event(StreamEvent::Token("a".to_string())).len(), 1);
        assert!(flow.handle_event(StreamEvent::Token("b".to_string())).is_empty());
        match &flow.finish()[..] {
            [ViewUpdate::Panel(Panel::Live(live))] => {
                assert_eq!(live.answer.as_ref().unwrap().text, "ab");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_transport_error_suggests_pull() {
        let mut flow = flow("mistral");
        let err = anyhow::anyhow!("HTTP 404: Not Found");
        match &flow.transport_error(&err)[..] {
            [ViewUpdate::Panel(Panel::Error(e))] => {
                assert_eq!(e.message, "Error: HTTP 404: Not Found");
                assert!(e.details.as_deref().unwrap().ends_with("ollama pull mistral"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
