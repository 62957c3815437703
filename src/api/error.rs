//! Error types for the Tier3 API client.

use thiserror::Error;

/// Errors raised by the API client, its response futures and the deployment
/// poller.
///
/// The type is `Clone` because a single failed exchange is re-raised to every
/// reader of the same [`ResponseFuture`](super::ResponseFuture).
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ApiError {
    /// Raised before any network call when the endpoint, credentials or
    /// runtime context are missing or malformed.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// Raised when a DELETE or POST targets a resource the provider does not
    /// know about.
    #[error("no such endpoint: {target}")]
    NotFound {
        /// Fully qualified URL that returned 404.
        target: String,
    },
    /// Raised when the provider answers with an unexpected status.
    #[error("provider returned {status} {reason}: {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider reason phrase for the status.
        reason: String,
        /// Response body, verbatim.
        body: String,
    },
    /// Raised when the HTTP exchange itself fails.
    #[error("cloud I/O error: {message}")]
    Transport {
        /// Message reported by the transport.
        message: String,
    },
    /// Raised when a successful response carries a malformed JSON body.
    #[error("failed to parse response body: {message}")]
    Parse {
        /// Parser error message.
        message: String,
    },
    /// Raised when logon succeeds without handing back a session cookie.
    #[error("error obtaining session with supplied credentials: {0}")]
    Session(String),
    /// Raised when the deployment-status endpoint reports a failed request.
    #[error("deployment request {request_id} failed: {message}")]
    DeploymentFailed {
        /// Correlation identifier of the failed request.
        request_id: i64,
        /// Message returned by the provider.
        message: String,
    },
    /// Raised to readers of a response whose producing task ended without
    /// resolving it.
    #[error("response abandoned before it was resolved")]
    Abandoned,
}

impl ApiError {
    /// Returns the HTTP status carried by the error, when there is one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound { .. } => Some(404),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` when the error represents a missing resource.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport {
            message: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse {
            message: value.to_string(),
        }
    }
}

impl From<crate::config::ConfigError> for ApiError {
    fn from(value: crate::config::ConfigError) -> Self {
        Self::Configuration(value.to_string())
    }
}
