//! Multi-tier resolution pipeline.
//! Lookup order is fixed: in-process cache, then the durable store, then the
//! generative fallback. Whichever tier answers, the result is propagated back
//! into the faster tiers so the next request short-circuits earlier.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ai::AiFallback;
use crate::cache::{CacheStats, TranslationCache};
use crate::error::{TranslateError, TranslateResult};
use crate::key::{normalize, NormalizedKey};
use crate::lang::TargetLanguage;
use crate::metrics::{stages, MetricsRegistry};
use crate::store::{Origin, TranslationEntry, TranslationStore};

/// Outcome of a single resolution: the text, which tier produced it, the
/// store version it corresponds to, and how long the pipeline took.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub translated_text: String,
    pub origin: Origin,
    pub version: u32,
    #[serde(skip)]
    pub elapsed: Duration,
}

pub struct TranslationResolver {
    cache: Arc<TranslationCache>,
    store: Arc<dyn TranslationStore>,
    ai: Option<AiFallback>,
    metrics: Arc<MetricsRegistry>,
    max_text_length: usize,
}

impl TranslationResolver {
    pub fn new(
        cache: Arc<TranslationCache>,
        store: Arc<dyn TranslationStore>,
        ai: Option<AiFallback>,
        metrics: Arc<MetricsRegistry>,
        max_text_length: usize,
    ) -> Self {
        Self {
            cache,
            store,
            ai,
            metrics,
            max_text_length,
        }
    }

    pub async fn resolve(
        &self,
        text: &str,
        lang: TargetLanguage,
    ) -> TranslateResult<Resolution> {
        self.resolve_with_cancel(text, lang, &CancellationToken::new())
            .await
    }

    /// Resolve through the tiers, honoring cancellation during the AI stage.
    /// A store read failure is logged and treated as a miss; a store write
    /// failure after an AI success is logged but does not fail the request.
    pub async fn resolve_with_cancel(
        &self,
        text: &str,
        lang: TargetLanguage,
        cancel: &CancellationToken,
    ) -> TranslateResult<Resolution> {
        let request_id = Uuid::new_v4();
        let start = Instant::now();
        let total = self.metrics.timer(stages::RESOLVE_TOTAL);

        let key = normalize(text, lang, self.max_text_length)?;

        // Tier 1: in-process cache.
        let lookup = self.metrics.timer(stages::CACHE_LOOKUP);
        let cached = self.cache.get(&key.hash);
        lookup.finish();
        if let Some(hit) = cached {
            total.finish();
            debug!(%request_id, lang = %lang, "cache hit");
            return Ok(Resolution {
                translated_text: hit.translated_text,
                origin: Origin::Cache,
                version: hit.version,
                elapsed: start.elapsed(),
            });
        }

        // Tier 2: durable store.
        if let Some(entry) = self.store_get_lenient(&key, request_id).await {
            self.cache
                .insert(key.hash, entry.translated_text.clone(), entry.version);
            total.finish();
            debug!(%request_id, lang = %lang, version = entry.version, "store hit");
            return Ok(Resolution {
                translated_text: entry.translated_text,
                origin: Origin::Store,
                version: entry.version,
                elapsed: start.elapsed(),
            });
        }

        // Tier 3: generative fallback.
        let Some(ai) = &self.ai else {
            total.finish();
            debug!(%request_id, lang = %lang, "miss with no fallback configured");
            return Err(TranslateError::NotFound);
        };

        let ai_timer = self.metrics.timer(stages::AI_TRANSLATE);
        let generated = ai.translate(&key.text, lang, cancel).await;
        ai_timer.finish();
        let translated = generated?;

        let (translated, origin, version) =
            self.persist_generated(&key, translated, request_id).await;
        self.cache.insert(key.hash, translated.clone(), version);

        total.finish();
        info!(%request_id, lang = %lang, origin = %origin, "resolved via fallback");
        Ok(Resolution {
            translated_text: translated,
            origin,
            version,
            elapsed: start.elapsed(),
        })
    }

    /// Store read that degrades to a miss on failure so the pipeline can fall
    /// through to the next tier.
    async fn store_get_lenient(
        &self,
        key: &NormalizedKey,
        request_id: Uuid,
    ) -> Option<TranslationEntry> {
        let timer = self.metrics.timer(stages::STORE_LOOKUP);
        let result = self.store.get(key).await;
        timer.finish();
        match result {
            Ok(found) => found,
            Err(e) => {
                warn!(%request_id, error = %e, "store lookup failed, treating as miss");
                None
            }
        }
    }

    /// Persist an AI result. The store is re-read first: if an entry appeared
    /// concurrently it wins, so a fallback write never lowers a version.
    async fn persist_generated(
        &self,
        key: &NormalizedKey,
        translated: String,
        request_id: Uuid,
    ) -> (String, Origin, u32) {
        if let Some(existing) = self.store_get_lenient(key, request_id).await {
            debug!(%request_id, version = existing.version, "concurrent store entry wins over fallback result");
            return (existing.translated_text, Origin::Store, existing.version);
        }

        let entry = TranslationEntry::new(key, translated.clone(), Origin::Ai, 1);
        let timer = self.metrics.timer(stages::STORE_WRITE);
        let write = self.store.put(key, &entry).await;
        timer.finish();
        if let Err(e) = write {
            warn!(%request_id, error = %e, "persisting fallback result failed");
        }
        (translated, Origin::Ai, entry.version)
    }

    /// Manual write-through: store the given translation, bumping the version
    /// past any existing entry, and refresh the in-process cache.
    pub async fn upsert(
        &self,
        text: &str,
        lang: TargetLanguage,
        translated_text: &str,
    ) -> TranslateResult<TranslationEntry> {
        let key = normalize(text, lang, self.max_text_length)?;
        let trimmed = translated_text.trim();
        if trimmed.is_empty() {
            return Err(TranslateError::Validation("translation is empty".into()));
        }

        let version = match self.store.get(&key).await? {
            Some(existing) => existing.version + 1,
            None => 1,
        };
        let entry = TranslationEntry::new(&key, trimmed.to_string(), Origin::Store, version);

        let timer = self.metrics.timer(stages::STORE_WRITE);
        self.store.put(&key, &entry).await?;
        timer.finish();

        self.cache
            .insert(key.hash, entry.translated_text.clone(), version);
        info!(lang = %lang, version, "manual translation stored");
        Ok(entry)
    }

    pub async fn search(
        &self,
        query: &str,
        lang: Option<TargetLanguage>,
        limit: usize,
        offset: usize,
    ) -> TranslateResult<Vec<TranslationEntry>> {
        self.store.search(query, lang, limit, offset).await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        info!("translation cache cleared");
    }

    pub fn metrics(&self) -> &Arc<MetricsRegistry> {
        &self.metrics
    }
}
