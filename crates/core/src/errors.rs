use thiserror::Error;

/// Unified error type for the entire fund-tracker-core library.
/// Every fallible public function returns `Result<T, CoreError>`.
///
/// The one exception is the request gateway: its `fetch` normalizes every
/// network, parse and timeout failure into an `ApiResponse` payload with
/// `success == false`, so callers of that path check the discriminant instead.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Storage ─────────────────────────────────────────────────────
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    // ── Network ─────────────────────────────────────────────────────
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// A direct-upstream source could not produce a usable result.
    /// The gateway treats this as "not handled" and falls back to the backend.
    #[error("Upstream error ({source_name}): {message}")]
    Upstream {
        source_name: String,
        message: String,
    },

    /// The backend answered, but the payload itself signalled failure
    /// (`success: false`). Carries the backend's message for display.
    #[error("Backend error: {0}")]
    Backend(String),

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Background task failed: {0}")]
    Task(String),
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Strip query strings from URLs embedded in reqwest messages:
        // upstream queries carry provider tokens.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        if e.is_timeout() {
            CoreError::Timeout(sanitized)
        } else {
            CoreError::Network(sanitized)
        }
    }
}
