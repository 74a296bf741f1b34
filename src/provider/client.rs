//! HTTP client for OpenAI-compatible chat completion endpoints.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{header, Client as ReqwestClient, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use super::sse::delta_stream;
use super::{ApiError, CompletionClient, CompletionRequest, DeltaStream};
use crate::config::Config;
use crate::constants::CONNECT_TIMEOUT_SECS;

/// A configured endpoint ready to handle completion requests.
///
/// Every request is bounded by `timeout` until its response headers arrive.
/// Streamed bodies have no overall deadline; the chat engine times out
/// individual chunks instead.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: ReqwestClient,
    api_key: String,
    endpoint: String,
    timeout: Duration,
}

/// Request body: the request plus the `stream` switch.
#[derive(Serialize)]
struct Body<'a> {
    #[serde(flatten)]
    request: &'a CompletionRequest,
    stream: bool,
}

#[derive(Deserialize)]
struct CompletionBody {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorObject,
}

/// The `error` object of an OpenAI-style error payload.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorObject {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

impl ErrorObject {
    /// Converts to [`ApiError::Provider`]. Errors delivered with a 200 status
    /// (in-stream or in-body) take their status from a numeric `code`.
    pub(crate) fn into_api_error(self, status: u16) -> ApiError {
        let code = self
            .code
            .as_ref()
            .and_then(|c| c.as_u64())
            .filter(|c| (100..600).contains(c))
            .map(|c| c as u16);
        let status = match code {
            Some(code) if status == 200 => code,
            _ => status,
        };
        let message = self
            .message
            .unwrap_or_else(|| "provider returned an error".to_string());
        ApiError::provider(status, message)
    }
}

impl OpenAiClient {
    /// Creates a client for `base_url` (e.g. `https://host/openrouter/v1`).
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = ReqwestClient::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            timeout,
        })
    }

    /// Builds the client from the `[api]` section, failing if no key is set.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.api_key()?;
        Self::new(
            api_key,
            &config.api.base_url,
            Duration::from_secs(config.api.timeout_secs),
        )
        .context("Failed to create API client")
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, request: &CompletionRequest, stream: bool) -> Result<Response, ApiError> {
        debug!(
            model = %request.model,
            messages = request.messages.len(),
            stream,
            "sending completion request"
        );
        let accept = if stream {
            "text/event-stream"
        } else {
            "application/json"
        };
        let send = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, accept)
            .json(&Body { request, stream })
            .send();

        // A failed status's error body counts against the first-byte deadline.
        let exchange = async {
            let response = send.await.map_err(|e| self.map_send_error(e))?;
            if !response.status().is_success() {
                let err = error_from_response(response).await;
                warn!(error = %err, model = %request.model, "completion request failed");
                return Err(err);
            }
            Ok::<_, ApiError>(response)
        };
        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| ApiError::Timeout(self.timeout))?
    }

    fn map_send_error(&self, e: reqwest::Error) -> ApiError {
        if e.is_timeout() {
            ApiError::Timeout(self.timeout)
        } else if e.is_connect() {
            ApiError::Network(format!("connection failed: {}", e))
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ApiError> {
        let read = async {
            let response = self.post(request, false).await?;
            let body = response
                .bytes()
                .await
                .map_err(|e| ApiError::Network(format!("error reading response: {}", e)))?;
            parse_completion(&body)
        };
        tokio::time::timeout(self.timeout, read)
            .await
            .map_err(|_| ApiError::Timeout(self.timeout))?
    }

    async fn complete_streaming(
        &self,
        request: &CompletionRequest,
    ) -> Result<DeltaStream, ApiError> {
        let response = self.post(request, true).await?;
        Ok(delta_stream(response.bytes_stream()))
    }
}

/// Extracts `choices[0].message.content`; a null content is an empty reply.
fn parse_completion(body: &[u8]) -> Result<String, ApiError> {
    if let Ok(envelope) = serde_json::from_slice::<ErrorEnvelope>(body) {
        return Err(envelope.error.into_api_error(200));
    }
    let parsed: CompletionBody = serde_json::from_slice(body)
        .map_err(|e| ApiError::Decode(format!("bad completion body: {}", e)))?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.unwrap_or_default())
        .ok_or_else(|| ApiError::Decode("response has no choices".to_string()))
}

async fn error_from_response(response: Response) -> ApiError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    error_from_body(status.as_u16(), status.canonical_reason(), &text)
}

fn error_from_body(status: u16, reason: Option<&str>, text: &str) -> ApiError {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(text) {
        return envelope.error.into_api_error(status);
    }
    let trimmed = text.trim();
    let message = if trimmed.is_empty() {
        reason.unwrap_or("request failed").to_string()
    } else {
        trimmed.chars().take(500).collect()
    };
    ApiError::provider(status, message)
}
