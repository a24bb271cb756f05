// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types shared across the retrieval pipeline.
//!
//! Callers branch on the error kind, not on message contents:
//! - `Authorization`: cookies rejected and login also failed
//! - `ElementTimeout`: an expected page element did not appear in time
//! - `MalformedResponse`: fetched data missing expected fields
//! - `Store`: credential persistence I/O failure
//! - `Network`: transport-level failure (connect, status, timeout)

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Timed out waiting for page element: {0}")]
    ElementTimeout(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Credential store error: {0}")]
    Store(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Telegram API error: {0}")]
    Telegram(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// True when the failure means the account itself was rejected.
    /// Not worth retrying with the same credentials.
    pub fn is_authorization(&self) -> bool {
        matches!(self, AppError::Authorization(_))
    }

    /// True for failures that may be transient (network slowness, a slow
    /// page). Candidates for caller-level retry with backoff; the core
    /// itself never auto-retries.
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::Network(_) | AppError::ElementTimeout(_))
    }
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_is_not_transient() {
        let err = AppError::Authorization("bad password".to_string());
        assert!(err.is_authorization());
        assert!(!err.is_transient());
    }

    #[test]
    fn timeout_and_network_are_transient() {
        assert!(AppError::ElementTimeout("table".to_string()).is_transient());
        assert!(AppError::Network("connection reset".to_string()).is_transient());
        assert!(!AppError::MalformedResponse("missing cell".to_string()).is_transient());
    }
}
