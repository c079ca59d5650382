/*!
Command handlers for the CLI

- `stream`: one submission of a flow, rendered to the terminal
- `stats`: the live telemetry dashboard
- `interactive`: readline prompt that submits to the active flow
*/

use crate::api::ApiClient;
use crate::config::Config;
use crate::dispatch::{Key, KeyDispatcher, SubmitGate};
use crate::error::{RagstreamError, Result};
use crate::flows::{build_flow, run_flow, Flow, FlowKind, FlowOutcome};
use crate::view::html::HtmlDocument;
use crate::view::terminal::TerminalSink;
use crate::view::{Tee, ViewSink};
use std::path::Path;

// Parser for `/` commands in interactive mode
pub mod special_commands;

pub mod stream {
    //! Single-shot flow execution.

    use super::*;

    /// Submit `flow` once and render the stream to stdout.
    ///
    /// When `html` is set, the final rendered markup is also written there.
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is invalid, the HTML file cannot be
    /// written, or the request fails before a response stream is open.
    pub async fn run_once(config: &Config, mut flow: Box<dyn Flow>, html: Option<&Path>) -> Result<()> {
        let api = ApiClient::new(&config.endpoints.api_url)?;
        let gate = SubmitGate::new();

        let mut terminal = TerminalSink::stdout();
        let mut document = HtmlDocument::new();
        let outcome = {
            let mut sink = Tee::new(vec![
                &mut terminal as &mut dyn ViewSink,
                &mut document as &mut dyn ViewSink,
            ]);
            run_flow(&api, flow.as_mut(), &gate, &mut sink).await
        };

        if let Some(path) = html {
            std::fs::write(path, document.to_html())?;
            tracing::info!(path = %path.display(), "Wrote rendered HTML");
        }

        match outcome {
            FlowOutcome::Failed(message) => Err(RagstreamError::Transport(message).into()),
            other => {
                tracing::debug!(outcome = ?other, "Flow finished");
                Ok(())
            }
        }
    }
}

pub mod stats {
    //! Live telemetry dashboard.

    use super::*;
    use crate::telemetry::{TelemetryClient, TerminalDashboard, WsConnector};
    use std::sync::Arc;

    /// Connect to the telemetry feed and print it until Ctrl-C
    pub async fn run_stats(config: &Config) -> Result<()> {
        tracing::info!(url = %config.endpoints.ws_url, "Starting telemetry dashboard");

        let client = TelemetryClient::new(
            &config.endpoints.ws_url,
            &config.telemetry,
            Arc::new(WsConnector),
            Box::new(TerminalDashboard::stdout()),
        );
        let handle = client.start();

        tokio::signal::ctrl_c().await?;
        handle.stop().await;
        Ok(())
    }
}

pub mod interactive {
    //! Interactive prompt.
    //!
    //! Each line is routed through the [`KeyDispatcher`] as an Enter press
    //! on the active flow's input, so the busy gate decides whether it runs.

    use super::special_commands::{parse_special_command, print_help, SpecialCommand};
    use super::*;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Run the prompt, starting on `flow`
    ///
    /// # Errors
    ///
    /// Returns an error if the API URL is invalid or the line editor
    /// cannot be created.
    pub async fn run_interactive(config: &Config, flow: FlowKind) -> Result<()> {
        tracing::info!(flow = %flow, "Starting interactive mode");

        let api = ApiClient::new(&config.endpoints.api_url)?;
        let dispatcher = KeyDispatcher::new();
        let mut current = flow;
        let mut rl = DefaultEditor::new()?;

        print_welcome_banner(current, &api);

        loop {
            let prompt = format!("[{}] >> ", current.to_string().cyan().bold());
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::SwitchFlow(next)) => {
                            current = next;
                            println!("Switched to {}\n", current.label().green());
                            continue;
                        }
                        Ok(SpecialCommand::ShowStatus) => {
                            print_status(current, &api);
                            continue;
                        }
                        Ok(SpecialCommand::Help) => {
                            print_help();
                            continue;
                        }
                        Ok(SpecialCommand::Exit) => break,
                        Ok(SpecialCommand::None) => {}
                        Err(e) => {
                            eprintln!("{}\n", e.to_string().red());
                            continue;
                        }
                    }

                    if let Err(e) = rl.add_history_entry(trimmed) {
                        tracing::debug!(error = %e, "Failed to record history");
                    }

                    let Some(kind) = dispatcher.on_key(current, Key::Enter) else {
                        continue;
                    };
                    let mut flow = build_flow(kind, config, trimmed);
                    // Lines are submitted one at a time, so the gate is only
                    // ever busy for concurrent library callers
                    let gate = dispatcher.gate(kind);
                    let mut sink = TerminalSink::stdout();
                    let outcome = run_flow(&api, flow.as_mut(), &gate, &mut sink).await;
                    tracing::debug!(outcome = ?outcome, "Submission finished");
                    println!();
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    fn print_welcome_banner(flow: FlowKind, api: &ApiClient) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                 ragstream interactive mode                   ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Flow:    {}", flow.label().cyan().bold());
        println!("Backend: {}\n", api.base_url());
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    fn print_status(flow: FlowKind, api: &ApiClient) {
        println!();
        println!("{}", "Session status".bold());
        println!("  Flow:     {} ({})", flow.label(), flow);
        println!("  Endpoint: {}", api.endpoint_url(flow.endpoint()));
        println!();
    }
}

pub use interactive::run_interactive;
pub use stats::run_stats;
pub use stream::run_once;
