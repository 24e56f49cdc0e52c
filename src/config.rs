//! Environment-driven configuration with sane defaults.
//! Every limit the pipeline enforces lives here so callers construct the
//! whole service from one place.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the generative fallback. Absent key disables the fallback.
    pub gemini_api_key: Option<String>,
    /// Use the local JSON-backed store instead of the cloud document store.
    pub use_local_data: bool,
    /// Path of the local store file.
    pub local_data_path: PathBuf,
    /// Base URL of the cloud document store (ignored when `use_local_data`).
    pub store_base_url: Option<String>,
    /// Bearer token for the cloud document store.
    pub store_api_key: Option<String>,

    /// Maximum source text length in characters.
    pub max_text_length: usize,
    /// Maximum number of texts per batch call.
    pub max_batch_size: usize,
    /// Maximum length of a single batch item.
    pub max_batch_item_length: usize,
    /// L1 translation cache capacity (entries).
    pub translation_cache_capacity: usize,
    /// Audio cache capacity (entries).
    pub audio_cache_capacity: usize,

    /// Generative fallback retry attempts (total calls, not re-tries).
    pub ai_retry_attempts: u32,
    /// Base delay for exponential backoff between attempts.
    pub ai_backoff_base: Duration,
    /// Per-attempt HTTP timeout for the generative fallback.
    pub ai_timeout: Duration,
    /// Bounded fan-out for batch items when failures are tolerated.
    pub batch_concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            use_local_data: true,
            local_data_path: PathBuf::from("data/translations.json"),
            store_base_url: None,
            store_api_key: None,
            max_text_length: 5000,
            max_batch_size: 100,
            max_batch_item_length: 1000,
            translation_cache_capacity: 512,
            audio_cache_capacity: 100,
            ai_retry_attempts: 3,
            ai_backoff_base: Duration::from_millis(500),
            ai_timeout: Duration::from_secs(30),
            batch_concurrency: 4,
        }
    }
}

impl Config {
    /// Read configuration from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            gemini_api_key: env_opt("GEMINI_API_KEY"),
            use_local_data: env_bool("KUMAJALA_USE_LOCAL_DATA", defaults.use_local_data),
            local_data_path: env_opt("KUMAJALA_LOCAL_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.local_data_path),
            store_base_url: env_opt("KUMAJALA_STORE_URL"),
            store_api_key: env_opt("KUMAJALA_STORE_API_KEY"),
            max_text_length: env_usize("KUMAJALA_MAX_TEXT_LENGTH", defaults.max_text_length),
            max_batch_size: env_usize("KUMAJALA_MAX_BATCH_SIZE", defaults.max_batch_size),
            max_batch_item_length: env_usize(
                "KUMAJALA_MAX_BATCH_ITEM_LENGTH",
                defaults.max_batch_item_length,
            ),
            translation_cache_capacity: env_usize(
                "KUMAJALA_TRANSLATION_CACHE_CAPACITY",
                defaults.translation_cache_capacity,
            ),
            audio_cache_capacity: env_usize(
                "KUMAJALA_AUDIO_CACHE_CAPACITY",
                defaults.audio_cache_capacity,
            ),
            ai_retry_attempts: env_usize(
                "KUMAJALA_AI_RETRY_ATTEMPTS",
                defaults.ai_retry_attempts as usize,
            ) as u32,
            ai_backoff_base: Duration::from_millis(env_usize(
                "KUMAJALA_AI_BACKOFF_BASE_MS",
                defaults.ai_backoff_base.as_millis() as usize,
            ) as u64),
            ai_timeout: Duration::from_secs(env_usize(
                "KUMAJALA_AI_TIMEOUT_SECS",
                defaults.ai_timeout.as_secs() as usize,
            ) as u64),
            batch_concurrency: env_usize(
                "KUMAJALA_BATCH_CONCURRENCY",
                defaults.batch_concurrency,
            ),
        }
    }

    /// Sanity-check the configuration, returning human-readable warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.gemini_api_key.is_none() {
            warnings.push("GEMINI_API_KEY not set: generative fallback disabled".to_string());
        }
        if !self.use_local_data && self.store_base_url.is_none() {
            warnings.push(
                "KUMAJALA_STORE_URL not set: falling back to the local JSON store".to_string(),
            );
        }
        if self.ai_retry_attempts == 0 {
            warnings.push("ai_retry_attempts is 0: generative fallback will never run".into());
        }
        if self.translation_cache_capacity == 0 {
            warnings.push(
                "translation_cache_capacity is 0: the cache will be clamped to one entry".into(),
            );
        }
        if self.audio_cache_capacity == 0 {
            warnings
                .push("audio_cache_capacity is 0: the cache will be clamped to one entry".into());
        }
        warnings
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes"),
        Err(_) => default,
    }
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
