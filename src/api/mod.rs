//! HTTP client for the streaming inference and RAG endpoints
//!
//! Every flow POSTs a JSON body and reads the answer back as an NDJSON
//! byte stream. [`ApiClient`] owns the connection pool and turns non-2xx
//! responses into [`RagstreamError::HttpStatus`].

use bytes::Bytes;
use futures::Stream;
use serde::Serialize;

use crate::config::GenerationOptions;
use crate::error::{RagstreamError, Result};

/// Body of `POST /api/generate`
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    /// Model to run
    pub model: String,
    /// Prompt text, including any reasoning directive
    pub prompt: String,
    /// Always true; the client only consumes streamed responses
    pub stream: bool,
    /// Sampling options
    pub options: GenerationOptions,
}

/// Body of `POST /api/ask`
#[derive(Debug, Clone, Serialize)]
pub struct AskRequest {
    /// Question about the indexed documents
    pub question: String,
    /// Retrieval settings
    pub config: AskConfig,
}

/// Retrieval settings sent with [`AskRequest`]
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AskConfig {
    /// Chunks to retrieve
    pub top_k: u32,
    /// Embedding model used for retrieval
    pub embedding_model: String,
    /// Model that writes the answer
    pub llm_model: String,
}

/// Body of `POST /api/rag`
#[derive(Debug, Clone, Serialize)]
pub struct RagRequest {
    /// Question to research on the web
    pub question: String,
}

/// Body of `POST /api/chat-smart`
#[derive(Debug, Clone, Serialize)]
pub struct SmartRequest {
    /// Prompt to route
    pub prompt: String,
}

/// Client for the backend HTTP API
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for `base_url`.
    ///
    /// No request timeout is configured: generation may legitimately run
    /// for minutes.
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute URL or the HTTP
    /// client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        let parsed = url::Url::parse(base_url).map_err(|e| {
            RagstreamError::Config(format!("Invalid API URL '{}': {}", base_url, e))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RagstreamError::Config(format!(
                "API URL '{}' must use http or https",
                base_url
            ))
            .into());
        }

        let client = reqwest::Client::builder()
            .user_agent(concat!("ragstream/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of an endpoint path
    pub fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST `body` as JSON to `path` and return the response body as a byte
    /// stream.
    ///
    /// # Errors
    ///
    /// - [`RagstreamError::Transport`] when the request cannot be sent
    /// - [`RagstreamError::HttpStatus`] when the server answers with a
    ///   non-success status
    pub async fn post_stream<T>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<impl Stream<Item = reqwest::Result<Bytes>>>
    where
        T: Serialize + ?Sized,
    {
        let url = self.endpoint_url(path);
        tracing::debug!(url = %url, "POST streaming request");

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/x-ndjson")
            .json(body)
            .send()
            .await
            .map_err(|e| RagstreamError::Transport(format!("Request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "Backend returned an error status");
            return Err(RagstreamError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            }
            .into());
        }

        Ok(response.bytes_stream())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_generate_request_shape() {
        let body = serde_json::to_value(GenerateRequest {
            model: "llama3.2:1b".to_string(),
            prompt: "hi".to_string(),
            stream: true,
            options: GenerationOptions::default(),
        })
        .unwrap();
        assert_eq!(body["stream"], json!(true));
        assert_eq!(body["options"]["num_predict"], json!(1000));
        assert!(body["options"]["top_p"].is_number());
    }

    #[test]
    fn test_ask_request_uses_camel_case_config() {
        let body = serde_json::to_value(AskRequest {
            question: "q".to_string(),
            config: AskConfig {
                top_k: 5,
                embedding_model: "nomic-embed-text".to_string(),
                llm_model: "llama3.2:1b".to_string(),
            },
        })
        .unwrap();
        assert_eq!(
            body,
            json!({
                "question": "q",
                "config": {"topK": 5, "embeddingModel": "nomic-embed-text", "llmModel": "llama3.2:1b"}
            })
        );
    }

    #[test]
    fn test_endpoint_url_strips_trailing_slash() {
        let client = ApiClient::new("http://localhost:3000/").unwrap();
        assert_eq!(
            client.endpoint_url("/api/rag"),
            "http://localhost:3000/api/rag"
        );
    }

    #[test]
    fn test_rejects_relative_base_url() {
        assert!(ApiClient::new("localhost:3000").is_err());
    }
}
