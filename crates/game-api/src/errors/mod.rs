//! Error types and retry classification for the game API crate.

mod retry;

pub use retry::RetryClass;

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the game API.
#[derive(Error, Debug)]
pub enum GameApiError {
    /// The API answered 429 and retries were exhausted.
    #[error("Rate limited by upstream (retry after {retry_after:?})")]
    RateLimited {
        /// Server-provided wait, when the response carried one
        retry_after: Option<Duration>,
    },

    /// The request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The requested resource does not exist upstream.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The API key was rejected.
    #[error("Unauthorized: API key rejected")]
    Unauthorized,

    /// Any other non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// The response body did not match the expected schema.
    #[error("Unexpected payload shape: {0}")]
    UnexpectedShape(String),

    /// Transport-level failure.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Invalid client or limiter configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The caller's cancellation token fired.
    #[error("Cancelled")]
    Cancelled,
}

impl GameApiError {
    /// Returns the retry classification for this error.
    ///
    /// ```
    /// use matchsync_game_api::errors::{GameApiError, RetryClass};
    ///
    /// let error = GameApiError::RateLimited { retry_after: None };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = GameApiError::NotFound("EUW1_1".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited { .. } | Self::Timeout | Self::Network(_) => RetryClass::WithBackoff,
            Self::Http { status, .. } if *status >= 500 => RetryClass::WithBackoff,

            Self::NotFound(_)
            | Self::Unauthorized
            | Self::Http { .. }
            | Self::UnexpectedShape(_)
            | Self::InvalidConfig(_) => RetryClass::Never,

            Self::Cancelled => RetryClass::Abort,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
