//! Command-line interface definition for ragstream
//!
//! This module defines the CLI structure using clap's derive API,
//! providing one command per streaming flow plus the telemetry dashboard
//! and an interactive prompt.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::flows::FlowKind;

/// ragstream - streaming client for AI inference and RAG backends
///
/// Sends prompts to an LLM, a PDF knowledge base, a web-search RAG
/// pipeline, or the smart router, and renders the streamed answer as it
/// arrives.
#[derive(Parser, Debug, Clone)]
#[command(name = "ragstream")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the HTTP API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// Override the telemetry WebSocket URL
    #[arg(long)]
    pub ws_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Also append logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for ragstream
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Stream a completion from the plain LLM endpoint
    Generate {
        /// Prompt to send
        prompt: String,

        /// Override the configured model
        #[arg(short, long)]
        model: Option<String>,

        /// Write the final rendered HTML to this file
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Ask a question against the indexed PDF documents
    Ask {
        /// Question to ask
        question: String,

        /// Number of chunks to retrieve
        #[arg(short = 'k', long, value_parser = clap::value_parser!(u32).range(1..))]
        top_k: Option<u32>,

        /// Write the final rendered HTML to this file
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Answer a question from a live web search
    Search {
        /// Question to ask
        question: String,

        /// Write the final rendered HTML to this file
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Let the server route between web search and the local model
    Smart {
        /// Prompt to send
        prompt: String,

        /// Write the final rendered HTML to this file
        #[arg(long)]
        html: Option<PathBuf>,
    },

    /// Show the live system telemetry dashboard
    Stats,

    /// Interactive prompt; Enter submits to the active flow
    Interactive {
        /// Flow that receives submitted lines (llm, pdf, web, smart)
        #[arg(short, long, default_value = "llm")]
        flow: FlowKind,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            api_url: None,
            ws_url: None,
            verbose: false,
            json_logs: false,
            log_file: None,
            command: Commands::Stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert_eq!(cli.config, Some("config/config.yaml".to_string()));
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Stats));
    }

    #[test]
    fn test_cli_parse_generate_with_model() {
        let cli = Cli::try_parse_from(["ragstream", "generate", "hi there", "--model", "qwen3"])
            .unwrap();
        if let Commands::Generate {
            prompt,
            model,
            html,
        } = cli.command
        {
            assert_eq!(prompt, "hi there");
            assert_eq!(model, Some("qwen3".to_string()));
            assert_eq!(html, None);
        } else {
            panic!("Expected Generate command");
        }
    }

    #[test]
    fn test_cli_parse_ask_with_top_k_and_html() {
        let cli = Cli::try_parse_from([
            "ragstream", "ask", "what?", "-k", "7", "--html", "out.html",
        ])
        .unwrap();
        if let Commands::Ask {
            question,
            top_k,
            html,
        } = cli.command
        {
            assert_eq!(question, "what?");
            assert_eq!(top_k, Some(7));
            assert_eq!(html, Some(PathBuf::from("out.html")));
        } else {
            panic!("Expected Ask command");
        }
    }

    #[test]
    fn test_cli_parse_interactive_flow() {
        let cli = Cli::try_parse_from(["ragstream", "interactive", "--flow", "smart"]).unwrap();
        if let Commands::Interactive { flow } = cli.command {
            assert_eq!(flow, FlowKind::Smart);
        } else {
            panic!("Expected Interactive command");
        }
    }

    #[test]
    fn test_cli_rejects_unknown_flow() {
        let cli = Cli::try_parse_from(["ragstream", "interactive", "--flow", "nope"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_rejects_zero_top_k() {
        let cli = Cli::try_parse_from(["ragstream", "ask", "what?", "-k", "0"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::try_parse_from([
            "ragstream",
            "--json-logs",
            "-v",
            "--api-url",
            "http://api.local",
            "stats",
        ])
        .unwrap();
        assert!(cli.json_logs);
        assert!(cli.verbose);
        assert_eq!(cli.api_url, Some("http://api.local".to_string()));
        assert_eq!(cli.log_file, None);
    }

    #[test]
    fn test_cli_parse_log_file() {
        let cli =
            Cli::try_parse_from(["ragstream", "--log-file", "/tmp/rs.log", "stats"]).unwrap();
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/rs.log")));
    }
}
