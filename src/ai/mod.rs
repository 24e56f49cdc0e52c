//! Generative fallback for phrases absent from every lookup tier.
//! A backend trait hides the concrete model; `AiFallback` owns the retry
//! policy and result validation. Caching is the resolver's responsibility,
//! not this module's.

pub mod gemini;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::TranslateError;
use crate::lang::TargetLanguage;

pub use gemini::GeminiClient;

/// Backend failure classification. Transient failures are worth retrying;
/// permanent ones (rejected input, quota exhausted, unusable output) abort.
#[derive(Debug, Clone)]
pub enum BackendError {
    Transient(String),
    Permanent(String),
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::Transient(msg) => write!(f, "transient backend error: {msg}"),
            BackendError::Permanent(msg) => write!(f, "permanent backend error: {msg}"),
        }
    }
}

impl std::error::Error for BackendError {}

/// A generative translation backend: text in, translation out.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    async fn translate(&self, text: &str, lang: TargetLanguage) -> Result<String, BackendError>;
}

/// Retry policy for backend calls. `attempts` counts total calls; backoff
/// doubles from `base_backoff` between them (no jitter).
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn backoff_for(&self, attempt: u32) -> Duration {
        // attempt is 1-based: 1 → base, 2 → 2×base, 3 → 4×base, ...
        self.base_backoff * (1u32 << (attempt - 1).min(8))
    }
}

/// The AI fallback client: backend + retry + validation.
pub struct AiFallback {
    backend: Arc<dyn GenerativeBackend>,
    policy: RetryPolicy,
}

impl AiFallback {
    pub fn new(backend: Arc<dyn GenerativeBackend>, policy: RetryPolicy) -> Self {
        Self { backend, policy }
    }

    /// Translate with retry on transient failures. Permanent failures and
    /// invalid results abort immediately; exhausted retries surface as
    /// `UpstreamUnavailable`. Cancellation is honored between attempts.
    pub async fn translate(
        &self,
        text: &str,
        lang: TargetLanguage,
        cancel: &CancellationToken,
    ) -> Result<String, TranslateError> {
        if self.policy.attempts == 0 {
            return Err(TranslateError::UpstreamUnavailable {
                attempts: 0,
                last_error: "retry policy allows no attempts".into(),
            });
        }

        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(TranslateError::Cancelled);
            }

            attempt += 1;
            match self.backend.translate(text, lang).await {
                Ok(candidate) => {
                    if let Err(reason) = validate_translation(text, &candidate) {
                        warn!(lang = %lang, reason, "rejecting invalid backend result");
                        return Err(TranslateError::Permanent(format!(
                            "invalid translation: {reason}"
                        )));
                    }
                    debug!(lang = %lang, attempt, "backend translation accepted");
                    return Ok(candidate);
                }
                Err(BackendError::Permanent(msg)) => {
                    return Err(TranslateError::Permanent(msg));
                }
                Err(BackendError::Transient(msg)) => {
                    if attempt >= self.policy.attempts {
                        return Err(TranslateError::UpstreamUnavailable {
                            attempts: attempt,
                            last_error: msg,
                        });
                    }
                    let wait = self.policy.backoff_for(attempt);
                    warn!(
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        error = %msg,
                        "transient backend error, retrying"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(wait) => {}
                        _ = cancel.cancelled() => return Err(TranslateError::Cancelled),
                    }
                }
            }
        }
    }
}

/// Sanity checks on a generated translation: non-empty, different from the
/// source, length ratio within [0.2, 5.0], no error markers.
pub fn validate_translation(source: &str, translation: &str) -> Result<(), String> {
    let trimmed = translation.trim();
    if trimmed.is_empty() {
        return Err("empty result".into());
    }
    if trimmed.to_lowercase() == source.trim().to_lowercase() {
        return Err("identical to source".into());
    }

    let source_len = source.trim().chars().count();
    let trans_len = trimmed.chars().count();
    if source_len == 0 {
        return Err("empty source".into());
    }
    let ratio = trans_len as f64 / source_len as f64;
    if !(0.2..=5.0).contains(&ratio) {
        return Err(format!("suspicious length ratio {ratio:.2}"));
    }

    const ERROR_MARKERS: &[&str] = &[
        "erreur",
        "error",
        "impossible",
        "cannot",
        "unable",
        "je ne peux pas",
        "i cannot",
        "désolé",
        "sorry",
        "traduction non disponible",
        "translation unavailable",
    ];
    let lower = trimmed.to_lowercase();
    if ERROR_MARKERS.iter().any(|m| lower.contains(m)) {
        return Err("error marker in result".into());
    }

    Ok(())
}
