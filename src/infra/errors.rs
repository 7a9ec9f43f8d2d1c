// src/infra/errors.rs — Error types for winear

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WinearError {
    // Interview errors (user-facing)
    #[error("Session '{session_id}' not found or expired")]
    SessionNotFound { session_id: String },

    #[error("Session '{session_id}' is already finalized")]
    SessionFinalized { session_id: String },

    #[error("Session '{session_id}' was modified concurrently, retry the request")]
    SessionConflict { session_id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // Text oracle errors (retriable by the caller)
    #[error("Text generation timed out after {timeout_secs}s")]
    GenerationTimeout { timeout_secs: u64 },

    #[error("Text generation failed: {message}")]
    GenerationFailure { message: String },

    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    // Storage / downstream
    #[error("Session store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Downstream service '{service}' degraded: {message}")]
    DownstreamDegraded { service: String, message: String },

    // Infra
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WinearError {
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Whether the caller may safely repeat the same request.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            WinearError::Provider {
                retriable: true,
                ..
            } | WinearError::RateLimited { .. }
                | WinearError::GenerationTimeout { .. }
                | WinearError::GenerationFailure { .. }
                | WinearError::SessionConflict { .. }
                | WinearError::StoreUnavailable(_)
        )
    }
}
