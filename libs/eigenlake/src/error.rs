//! Error taxonomy for the Eigenlake client
//!
//! Every failure surfaced by the client is one of six kinds. Retrying is the
//! transport's job and happens before any of these is returned, so callers
//! never need to retry on their own.

use core_config::ConfigError;
use reqwest::StatusCode;
use thiserror::Error;

/// Category of a client failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Authentication,
    NotFound,
    Conflict,
    Validation,
    Api,
    Network,
}

#[derive(Debug, Error)]
pub enum EigenlakeError {
    /// 401 or 403 from the service
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// 404 from the service
    #[error("Not found: {0}")]
    NotFound(String),

    /// 409 from the service
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 400 or 422 from the service, or invalid client-side input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Any other non-2xx response, including 5xx after retries
    #[error("API error: {0}")]
    Api(String),

    /// No response was obtained after exhausting retries
    #[error("Network error: {0}")]
    Network(String),
}

pub type EigenlakeResult<T> = Result<T, EigenlakeError>;

impl EigenlakeError {
    /// Classify a non-2xx status into an error carrying `detail`
    pub fn from_status(status: StatusCode, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status.as_u16() {
            401 | 403 => EigenlakeError::Authentication(detail),
            404 => EigenlakeError::NotFound(detail),
            409 => EigenlakeError::Conflict(detail),
            400 | 422 => EigenlakeError::Validation(detail),
            _ => EigenlakeError::Api(detail),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            EigenlakeError::Authentication(_) => ErrorKind::Authentication,
            EigenlakeError::NotFound(_) => ErrorKind::NotFound,
            EigenlakeError::Conflict(_) => ErrorKind::Conflict,
            EigenlakeError::Validation(_) => ErrorKind::Validation,
            EigenlakeError::Api(_) => ErrorKind::Api,
            EigenlakeError::Network(_) => ErrorKind::Network,
        }
    }

    /// The human-readable detail, without the kind prefix
    pub fn detail(&self) -> &str {
        match self {
            EigenlakeError::Authentication(d)
            | EigenlakeError::NotFound(d)
            | EigenlakeError::Conflict(d)
            | EigenlakeError::Validation(d)
            | EigenlakeError::Api(d)
            | EigenlakeError::Network(d) => d,
        }
    }
}

impl From<ConfigError> for EigenlakeError {
    fn from(err: ConfigError) -> Self {
        EigenlakeError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for EigenlakeError {
    fn from(err: serde_json::Error) -> Self {
        EigenlakeError::Api(format!("invalid response body: {}", err))
    }
}
