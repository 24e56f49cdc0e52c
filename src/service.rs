//! Service assembly.
//! Wires the cache, store, generative fallback, batch orchestrator, and
//! speech service together from one [`Config`]. Missing credentials degrade
//! features instead of failing startup: no AI key disables the fallback, no
//! store URL falls back to the local JSON file.

use std::sync::Arc;

use tracing::{info, warn};

use crate::ai::{AiFallback, GeminiClient, RetryPolicy};
use crate::batch::{BatchOptions, BatchOrchestrator, BatchReport};
use crate::cache::{CacheStats, TranslationCache};
use crate::config::Config;
use crate::error::{TranslateError, TranslateResult};
use crate::lang::TargetLanguage;
use crate::metrics::{MetricsRegistry, StageSummary};
use crate::resolver::{Resolution, TranslationResolver};
use crate::store::{FirestoreRestStore, LocalJsonStore, TranslationEntry, TranslationStore};
use crate::tts::{
    AudioCacheStats, GoogleTranslateTts, SpeechService, SpokenAudio, SynthesisError,
};

pub struct KumajalaService {
    resolver: Arc<TranslationResolver>,
    batch: BatchOrchestrator,
    speech: SpeechService,
    metrics: Arc<MetricsRegistry>,
}

impl KumajalaService {
    /// Assemble the full service from configuration.
    pub fn from_config(config: &Config) -> TranslateResult<Self> {
        for warning in config.validate() {
            warn!("{warning}");
        }

        let metrics = Arc::new(MetricsRegistry::new());
        let cache = Arc::new(TranslationCache::new(config.translation_cache_capacity));

        let store: Arc<dyn TranslationStore> = if config.use_local_data {
            info!(path = %config.local_data_path.display(), "using local JSON store");
            Arc::new(LocalJsonStore::open(&config.local_data_path)?)
        } else if let Some(base_url) = &config.store_base_url {
            info!(base_url, "using cloud document store");
            Arc::new(FirestoreRestStore::new(
                base_url.clone(),
                config.store_api_key.clone().unwrap_or_default(),
            )?)
        } else {
            warn!("no store URL configured, using local JSON store");
            Arc::new(LocalJsonStore::open(&config.local_data_path)?)
        };

        let ai = match &config.gemini_api_key {
            Some(api_key) => {
                let client = GeminiClient::new(api_key.clone(), config.ai_timeout)
                    .map_err(|e| TranslateError::Permanent(e.to_string()))?;
                info!("generative fallback enabled");
                Some(AiFallback::new(
                    Arc::new(client),
                    RetryPolicy {
                        attempts: config.ai_retry_attempts,
                        base_backoff: config.ai_backoff_base,
                    },
                ))
            }
            None => {
                warn!("generative fallback disabled (no API key)");
                None
            }
        };

        let resolver = Arc::new(TranslationResolver::new(
            cache,
            store,
            ai,
            Arc::clone(&metrics),
            config.max_text_length,
        ));
        let batch = BatchOrchestrator::new(
            Arc::clone(&resolver),
            config.max_batch_size,
            config.max_batch_item_length,
        );

        let synthesizer = GoogleTranslateTts::new(config.ai_timeout)
            .map_err(|e| TranslateError::Permanent(e.to_string()))?;
        let speech = SpeechService::new(
            Arc::new(synthesizer),
            config.audio_cache_capacity,
            Arc::clone(&metrics),
        );

        Ok(Self {
            resolver,
            batch,
            speech,
            metrics,
        })
    }

    pub async fn translate(
        &self,
        text: &str,
        lang: TargetLanguage,
    ) -> TranslateResult<Resolution> {
        self.resolver.resolve(text, lang).await
    }

    pub async fn translate_batch(
        &self,
        texts: &[String],
        lang: TargetLanguage,
        options: &BatchOptions,
    ) -> TranslateResult<BatchReport> {
        self.batch.translate_batch(texts, lang, options).await
    }

    pub async fn upsert(
        &self,
        text: &str,
        lang: TargetLanguage,
        translated_text: &str,
    ) -> TranslateResult<TranslationEntry> {
        self.resolver.upsert(text, lang, translated_text).await
    }

    pub async fn search(
        &self,
        query: &str,
        lang: Option<TargetLanguage>,
        limit: usize,
        offset: usize,
    ) -> TranslateResult<Vec<TranslationEntry>> {
        self.resolver.search(query, lang, limit, offset).await
    }

    pub async fn speak(
        &self,
        text: &str,
        lang_code: &str,
        use_cache: bool,
    ) -> Result<SpokenAudio, SynthesisError> {
        self.speech.speak(text, lang_code, use_cache).await
    }

    pub fn translation_cache_stats(&self) -> CacheStats {
        self.resolver.cache_stats()
    }

    pub fn audio_cache_stats(&self) -> AudioCacheStats {
        self.speech.cache_stats()
    }

    pub fn clear_caches(&self) {
        self.resolver.clear_cache();
        self.speech.clear_cache();
    }

    pub fn metrics_summary(&self) -> std::collections::HashMap<String, StageSummary> {
        self.metrics.summary()
    }
}

/// Initialize structured logging for binaries and long-running hosts.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kumajala=debug".parse().expect("static filter is valid")),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();
}
