use std::time::Duration;

use thiserror::Error;

use crate::models::achievement::AchievementKind;

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("No message template configured for achievement kind {0}")]
    UnsupportedKind(AchievementKind),
}

#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Endpoint returned server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Endpoint rate limited the request (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Endpoint rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid endpoint configuration: {0}")]
    InvalidEndpoint(String),

    #[error("Failed to encode payload: {0}")]
    Encoding(String),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Delivery cancelled")]
    Cancelled,
}

impl DeliveryError {
    /// Transient errors move a task to `Retrying`; everything else is final.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DeliveryError::Timeout
                | DeliveryError::Connection(_)
                | DeliveryError::Server { .. }
                | DeliveryError::RateLimited { .. }
        )
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            DeliveryError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DeliveryError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DeliveryError::Timeout
        } else if e.is_connect() || e.is_request() || e.is_body() {
            DeliveryError::Connection(e.to_string())
        } else if e.is_builder() {
            DeliveryError::InvalidEndpoint(e.to_string())
        } else {
            DeliveryError::Request(e.to_string())
        }
    }
}
