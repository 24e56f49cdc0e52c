//! Unified error taxonomy for the resolution pipeline.
//! Transient failures are retried with backoff; permanent failures and
//! validation errors surface immediately. A miss across every tier is
//! `NotFound`, which callers treat as an empty result rather than a fault.

use std::fmt;

#[derive(Debug, Clone)]
pub enum TranslateError {
    /// Bad input shape, length, or unsupported language. Never retried.
    Validation(String),
    /// Network / timeout / rate-limit style failure, likely to succeed on retry.
    Transient(String),
    /// The upstream explicitly rejected the request or produced an unusable
    /// result. Retrying will not help.
    Permanent(String),
    /// Retries against the generative backend were exhausted.
    UpstreamUnavailable { attempts: u32, last_error: String },
    /// No translation exists in any tier and no fallback is available.
    NotFound,
    /// Durable store failure (read or write).
    Store(String),
    /// The operation was cancelled cooperatively.
    Cancelled,
}

impl TranslateError {
    /// Whether a retry loop should attempt this failure again. Transient
    /// store faults are reported as `Transient`; `Store` covers rejected
    /// writes and bad payloads, which retrying will not fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TranslateError::Transient(_))
    }
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslateError::Validation(msg) => write!(f, "invalid input: {msg}"),
            TranslateError::Transient(msg) => write!(f, "transient upstream error: {msg}"),
            TranslateError::Permanent(msg) => write!(f, "permanent upstream error: {msg}"),
            TranslateError::UpstreamUnavailable { attempts, last_error } => write!(
                f,
                "upstream unavailable after {attempts} attempts: {last_error}"
            ),
            TranslateError::NotFound => write!(f, "translation not available"),
            TranslateError::Store(msg) => write!(f, "store error: {msg}"),
            TranslateError::Cancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for TranslateError {}

impl From<std::io::Error> for TranslateError {
    fn from(e: std::io::Error) -> Self {
        TranslateError::Store(format!("io: {e}"))
    }
}

impl From<serde_json::Error> for TranslateError {
    fn from(e: serde_json::Error) -> Self {
        TranslateError::Store(format!("serialization: {e}"))
    }
}

pub type TranslateResult<T> = Result<T, TranslateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_matches_taxonomy() {
        assert!(TranslateError::Transient("timeout".into()).is_retryable());
        assert!(!TranslateError::Store("io".into()).is_retryable());
        assert!(!TranslateError::Validation("empty".into()).is_retryable());
        assert!(!TranslateError::Permanent("quota".into()).is_retryable());
        assert!(!TranslateError::Cancelled.is_retryable());
    }
}
