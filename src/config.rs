//! Configuration management for ragstream
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{Result, RagstreamError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for ragstream
///
/// Holds the backend endpoints, per-flow request settings, telemetry
/// tuning, and rendering cadence.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP and WebSocket endpoints
    #[serde(default)]
    pub endpoints: EndpointConfig,
    /// Plain LLM flow settings
    #[serde(default)]
    pub llm: LlmConfig,
    /// PDF RAG flow settings
    #[serde(default)]
    pub pdf: PdfConfig,
    /// Telemetry feed settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Rendering settings
    #[serde(default)]
    pub render: RenderConfig,
}

/// Backend endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Base URL of the inference/RAG HTTP API
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// URL of the telemetry WebSocket feed
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
}

fn default_api_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_ws_url() -> String {
    "ws://localhost:3000".to_string()
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ws_url: default_ws_url(),
        }
    }
}

/// Plain LLM flow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Model sent to `/api/generate`
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Model-name substrings that identify reasoning-capable models
    #[serde(default = "default_reasoning_markers")]
    pub reasoning_markers: Vec<String>,

    /// Sampling options forwarded verbatim to the backend
    #[serde(default)]
    pub options: GenerationOptions,
}

fn default_llm_model() -> String {
    "llama3.2:1b".to_string()
}

fn default_reasoning_markers() -> Vec<String> {
    vec!["JOSIEFIED-Qwen3".to_string()]
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            reasoning_markers: default_reasoning_markers(),
            options: GenerationOptions::default(),
        }
    }
}

impl LlmConfig {
    /// Whether `model` should receive the reasoning instruction
    ///
    /// # Examples
    ///
    /// ```
    /// use ragstream::config::LlmConfig;
    ///
    /// let config = LlmConfig::default();
    /// assert!(config.is_reasoning_model("hf.co/JOSIEFIED-Qwen3:8b"));
    /// assert!(!config.is_reasoning_model("llama3.2:1b"));
    /// ```
    pub fn is_reasoning_model(&self, model: &str) -> bool {
        self.reasoning_markers
            .iter()
            .any(|marker| !marker.is_empty() && model.contains(marker.as_str()))
    }
}

/// Sampling options for `/api/generate`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GenerationOptions {
    /// Maximum number of tokens to generate
    #[serde(default = "default_num_predict")]
    pub num_predict: u32,
    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Nucleus sampling cutoff
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    /// Repetition penalty
    #[serde(default = "default_repeat_penalty")]
    pub repeat_penalty: f32,
}

fn default_num_predict() -> u32 {
    1000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.9
}

fn default_repeat_penalty() -> f32 {
    1.1
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            num_predict: default_num_predict(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            repeat_penalty: default_repeat_penalty(),
        }
    }
}

/// PDF RAG flow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Number of chunks to retrieve
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Embedding model used by the backend for retrieval
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Model used by the backend to generate the answer
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
}

fn default_top_k() -> u32 {
    5
}

fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            embedding_model: default_embedding_model(),
            llm_model: default_llm_model(),
        }
    }
}

/// Telemetry feed configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Samples retained per series
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Fixed delay before reconnecting after close or error (milliseconds)
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Keep-alive ping interval while connected (milliseconds)
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,
}

fn default_capacity() -> usize {
    30
}

fn default_reconnect_delay_ms() -> u64 {
    5_000
}

fn default_ping_interval_ms() -> u64 {
    20_000
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            ping_interval_ms: default_ping_interval_ms(),
        }
    }
}

impl TelemetryConfig {
    /// Reconnect delay as a [`Duration`]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Ping interval as a [`Duration`]
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }
}

/// Rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Minimum interval between re-formatting a streaming LLM answer
    /// (milliseconds); 0 re-renders on every token
    #[serde(default = "default_render_interval_ms")]
    pub interval_ms: u64,
}

fn default_render_interval_ms() -> u64 {
    50
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_render_interval_ms(),
        }
    }
}

impl RenderConfig {
    /// Render interval as a [`Duration`]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the YAML configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| RagstreamError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| RagstreamError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(api_url) = std::env::var("RAGSTREAM_API_URL") {
            self.endpoints.api_url = api_url;
        }

        if let Ok(ws_url) = std::env::var("RAGSTREAM_WS_URL") {
            self.endpoints.ws_url = ws_url;
        }

        if let Ok(model) = std::env::var("RAGSTREAM_LLM_MODEL") {
            self.llm.model = model;
        }

        if let Ok(top_k) = std::env::var("RAGSTREAM_PDF_TOP_K") {
            if let Ok(value) = top_k.parse() {
                self.pdf.top_k = value;
            } else {
                tracing::warn!("Invalid RAGSTREAM_PDF_TOP_K: {}", top_k);
            }
        }

        if let Ok(delay) = std::env::var("RAGSTREAM_RECONNECT_DELAY_MS") {
            if let Ok(value) = delay.parse() {
                self.telemetry.reconnect_delay_ms = value;
            } else {
                tracing::warn!("Invalid RAGSTREAM_RECONNECT_DELAY_MS: {}", delay);
            }
        }

        if let Ok(interval) = std::env::var("RAGSTREAM_PING_INTERVAL_MS") {
            if let Ok(value) = interval.parse() {
                self.telemetry.ping_interval_ms = value;
            } else {
                tracing::warn!("Invalid RAGSTREAM_PING_INTERVAL_MS: {}", interval);
            }
        }

        if let Ok(interval) = std::env::var("RAGSTREAM_RENDER_INTERVAL_MS") {
            if let Ok(value) = interval.parse() {
                self.render.interval_ms = value;
            } else {
                tracing::warn!("Invalid RAGSTREAM_RENDER_INTERVAL_MS: {}", interval);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(api_url) = &cli.api_url {
            self.endpoints.api_url = api_url.clone();
        }
        if let Some(ws_url) = &cli.ws_url {
            self.endpoints.ws_url = ws_url.clone();
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        validate_url("endpoints.api_url", &self.endpoints.api_url, &["http", "https"])?;
        validate_url("endpoints.ws_url", &self.endpoints.ws_url, &["ws", "wss"])?;

        if self.llm.model.trim().is_empty() {
            return Err(RagstreamError::Config("llm.model cannot be empty".to_string()).into());
        }

        if self.pdf.top_k == 0 {
            return Err(
                RagstreamError::Config("pdf.top_k must be greater than 0".to_string()).into(),
            );
        }

        if self.telemetry.capacity == 0 {
            return Err(RagstreamError::Config(
                "telemetry.capacity must be greater than 0".to_string(),
            )
            .into());
        }

        if self.telemetry.reconnect_delay_ms == 0 {
            return Err(RagstreamError::Config(
                "telemetry.reconnect_delay_ms must be greater than 0".to_string(),
            )
            .into());
        }

        if self.telemetry.ping_interval_ms == 0 {
            return Err(RagstreamError::Config(
                "telemetry.ping_interval_ms must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

fn validate_url(field: &str, value: &str, schemes: &[&str]) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| RagstreamError::Config(format!("{} is not a valid URL: {}", field, e)))?;

    if !schemes.contains(&parsed.scheme()) {
        return Err(RagstreamError::Config(format!(
            "{} must use one of: {}",
            field,
            schemes.join(", ")
        ))
        .into());
    }

    Ok(())
}
