//! ragstream - streaming client for AI inference and RAG backends
//!
#![doc = "Main entry point for the ragstream application."]

use anyhow::Result;

use ragstream::cli::{Cli, Commands};
use ragstream::commands;
use ragstream::config::Config;
use ragstream::flows::llm::LlmFlow;
use ragstream::flows::pdf::PdfFlow;
use ragstream::flows::smart::SmartFlow;
use ragstream::flows::web::WebFlow;
use ragstream::logging::{init_logging, LoggingOptions};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_logging(
        &LoggingOptions::from_flags(cli.verbose, cli.json_logs).with_file(cli.log_file.clone()),
    )?;

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Generate {
            prompt,
            model,
            html,
        } => {
            let model = model.unwrap_or_else(|| config.llm.model.clone());
            tracing::info!("Starting generation with model {}", model);
            let flow = LlmFlow::new(&prompt, &model, &config.llm, config.render.interval());
            commands::run_once(&config, Box::new(flow), html.as_deref()).await
        }
        Commands::Ask {
            question,
            top_k,
            html,
        } => {
            let top_k = top_k.unwrap_or(config.pdf.top_k);
            tracing::info!("Asking the PDF knowledge base (top_k = {})", top_k);
            let flow = PdfFlow::with_top_k(&question, &config.pdf, top_k);
            commands::run_once(&config, Box::new(flow), html.as_deref()).await
        }
        Commands::Search { question, html } => {
            tracing::info!("Starting web search");
            let flow = WebFlow::new(&question);
            commands::run_once(&config, Box::new(flow), html.as_deref()).await
        }
        Commands::Smart { prompt, html } => {
            tracing::info!("Starting smart routing");
            let flow = SmartFlow::new(&prompt);
            commands::run_once(&config, Box::new(flow), html.as_deref()).await
        }
        Commands::Stats => commands::run_stats(&config).await,
        Commands::Interactive { flow } => commands::run_interactive(&config, flow).await,
    }
}
