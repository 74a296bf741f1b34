use std::time::Duration;
use thiserror::Error;

/// Failures talking to the completion endpoint. All of them are recoverable:
/// the caller reports them and the session carries on.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection refused, DNS failure, broken response body.
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    /// The provider answered with an error (status or in-stream error object).
    #[error("API error ({status}): {message}{}", hint_suffix(.status, .message))]
    Provider { status: u16, message: String },

    /// The response could not be understood.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn provider(status: u16, message: impl Into<String>) -> Self {
        Self::Provider {
            status,
            message: message.into(),
        }
    }

    /// Short advice for well-known provider failures.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Provider { status, message } => hint_for(*status, message),
            Self::Timeout(_) => Some("the provider did not answer in time; try again"),
            Self::Network(_) => Some("check your connection and the configured base_url"),
            Self::Decode(_) => None,
        }
    }
}

fn hint_for(status: u16, message: &str) -> Option<&'static str> {
    let lower = message.to_lowercase();
    if status == 402 || lower.contains("insufficient_quota") || lower.contains("credits") {
        Some("not enough credits on the provider account")
    } else if status == 429 {
        Some("rate limited; wait a moment before retrying")
    } else if status == 401 || status == 403 {
        Some("check the API key in config.toml")
    } else if status == 404 || (lower.contains("model") && lower.contains("not")) {
        Some("check the model name in config.toml")
    } else {
        None
    }
}

fn hint_suffix(status: &u16, message: &str) -> String {
    hint_for(*status, message)
        .map(|h| format!(" ({})", h))
        .unwrap_or_default()
}
