//! LLM provider abstraction for ai.
//!
//! The rest of the crate talks to the model through the [`CompletionClient`]
//! trait: one buffered call and one streaming call, both taking a
//! [`CompletionRequest`]. [`OpenAiClient`] implements it against any
//! OpenAI-compatible `/chat/completions` endpoint.

mod client;
mod error;
mod sse;
#[cfg(test)]
pub(crate) mod testing;

pub use client::OpenAiClient;
pub use error::ApiError;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;
use std::pin::Pin;

use crate::message::Message;

/// Incremental text fragments of a streamed reply, consumed once.
///
/// Dropping the stream closes the underlying HTTP response.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String, ApiError>> + Send>>;

/// One chat completion call: ordered history plus sampling parameters.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature,
            max_tokens: None,
        }
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Capability the chat engine and the one-shot commands depend on.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends the request and returns the complete reply text.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ApiError>;

    /// Sends the request and returns the reply as a stream of deltas.
    ///
    /// Resolves once the response headers arrive; failures before that point
    /// (connection, timeout, provider error status) are returned directly.
    async fn complete_streaming(&self, request: &CompletionRequest)
        -> Result<DeltaStream, ApiError>;
}
