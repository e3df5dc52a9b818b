// SPDX-License-Identifier: MIT

//! Application error types shared across the tracking engine.

/// Application error type.
///
/// Only authorization, session-start and finish errors are allowed to reach
/// the session state machine's error phase; storage and remote failures are
/// absorbed by the components that produce them.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Location authorization denied: {0}")]
    Authorization(String),

    #[error("Failed to start workout session: {0}")]
    SessionStart(String),

    #[error("A workout session is already active")]
    SessionActive,

    #[error("No workout session is being tracked")]
    NotTracking,

    #[error("Failed to finalize workout session: {0}")]
    SessionFinish(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Remote activity API error: {0}")]
    RemoteApi(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Sentinel message for remote rate limiting (HTTP 429).
    pub const REMOTE_RATE_LIMIT: &'static str = "rate_limit_exceeded";

    /// Sentinel message for remote auth failures (HTTP 401).
    pub const REMOTE_AUTH_ERROR: &'static str = "remote_auth_failed";

    /// Whether this error is a remote rate-limit response.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, AppError::RemoteApi(msg) if msg == Self::REMOTE_RATE_LIMIT)
    }

    /// Whether this error is a remote authentication failure.
    pub fn is_remote_auth_error(&self) -> bool {
        matches!(self, AppError::RemoteApi(msg) if msg == Self::REMOTE_AUTH_ERROR)
    }

    /// Whether this error may transition the session state machine into its
    /// user-visible error phase.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Authorization(_) | AppError::SessionStart(_) | AppError::SessionFinish(_)
        )
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, AppError>;
