//! Batch orchestration over the resolution pipeline.
//! One batch fans out into per-item resolutions, either sequentially with
//! abort-on-first-failure or concurrently with partial-failure tolerance.
//! Item order in the report always follows submission order.

use std::sync::Arc;
use std::time::Instant;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{TranslateError, TranslateResult};
use crate::lang::TargetLanguage;
use crate::metrics::stages;
use crate::resolver::TranslationResolver;
use crate::store::Origin;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Keep going past failed items. When false, items run sequentially and
    /// the batch stops at the first failure.
    pub continue_on_error: bool,
    /// Upper bound on concurrently running items. Only relevant when
    /// `continue_on_error` is set.
    pub concurrency: usize,
    pub cancel: CancellationToken,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            concurrency: 4,
            cancel: CancellationToken::new(),
        }
    }
}

/// Per-item outcome. Exactly one of `translation` and `error` is set.
#[derive(Debug, Clone, Serialize)]
pub struct BatchItem {
    pub index: usize,
    pub input: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<Origin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BatchSummary {
    /// Count of items submitted, including any never attempted because the
    /// batch aborted or was cancelled first.
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Report for one batch. `items` holds attempted items only, in submission
/// order; items skipped by an abort or cancellation do not appear.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
    pub summary: BatchSummary,
}

pub struct BatchOrchestrator {
    resolver: Arc<TranslationResolver>,
    max_batch_size: usize,
    max_item_length: usize,
}

impl BatchOrchestrator {
    pub fn new(
        resolver: Arc<TranslationResolver>,
        max_batch_size: usize,
        max_item_length: usize,
    ) -> Self {
        Self {
            resolver,
            max_batch_size,
            max_item_length,
        }
    }

    /// Translate every text into `lang`. Batch-level validation failures
    /// (empty or oversized list) fail the whole call; item-level failures are
    /// reported per item.
    pub async fn translate_batch(
        &self,
        texts: &[String],
        lang: TargetLanguage,
        options: &BatchOptions,
    ) -> TranslateResult<BatchReport> {
        if texts.is_empty() {
            return Err(TranslateError::Validation("batch is empty".into()));
        }
        if texts.len() > self.max_batch_size {
            return Err(TranslateError::Validation(format!(
                "batch too large: {} items (max {})",
                texts.len(),
                self.max_batch_size
            )));
        }

        let batch_id = Uuid::new_v4();
        let start = Instant::now();
        let timer = self.resolver.metrics().timer(stages::BATCH_TOTAL);

        let items = if options.continue_on_error {
            self.run_concurrent(texts, lang, options).await
        } else {
            self.run_sequential(texts, lang, options).await
        };

        timer.finish();
        let successful = items.iter().filter(|i| i.success).count();
        let summary = BatchSummary {
            total: texts.len(),
            successful,
            failed: items.len() - successful,
        };
        info!(
            %batch_id,
            lang = %lang,
            total = summary.total,
            successful = summary.successful,
            failed = summary.failed,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "batch finished"
        );
        Ok(BatchReport { items, summary })
    }

    async fn run_sequential(
        &self,
        texts: &[String],
        lang: TargetLanguage,
        options: &BatchOptions,
    ) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(texts.len());
        for (index, input) in texts.iter().enumerate() {
            if options.cancel.is_cancelled() {
                warn!(attempted = items.len(), "batch cancelled, remaining items skipped");
                break;
            }
            let item = self.run_item(index, input, lang, &options.cancel).await;
            let failed = !item.success;
            items.push(item);
            if failed {
                break;
            }
        }
        items
    }

    async fn run_concurrent(
        &self,
        texts: &[String],
        lang: TargetLanguage,
        options: &BatchOptions,
    ) -> Vec<BatchItem> {
        let concurrency = options.concurrency.max(1);
        let results: Vec<Option<BatchItem>> = stream::iter(texts.iter().enumerate().map(
            |(index, input)| {
                let cancel = options.cancel.clone();
                async move {
                    // Items the token beats to the start line never run and
                    // are left out of the report.
                    if cancel.is_cancelled() {
                        return None;
                    }
                    Some(self.run_item(index, input, lang, &cancel).await)
                }
            },
        ))
        .buffered(concurrency)
        .collect()
        .await;

        results.into_iter().flatten().collect()
    }

    async fn run_item(
        &self,
        index: usize,
        input: &str,
        lang: TargetLanguage,
        cancel: &CancellationToken,
    ) -> BatchItem {
        let char_count = input.trim().chars().count();
        if char_count > self.max_item_length {
            return BatchItem {
                index,
                input: input.to_string(),
                success: false,
                translation: None,
                origin: None,
                error: Some(format!(
                    "item too long: {char_count} chars (max {})",
                    self.max_item_length
                )),
            };
        }

        let timer = self.resolver.metrics().timer(stages::BATCH_ITEM);
        let result = self.resolver.resolve_with_cancel(input, lang, cancel).await;
        timer.finish();

        match result {
            Ok(resolution) => BatchItem {
                index,
                input: input.to_string(),
                success: true,
                translation: Some(resolution.translated_text),
                origin: Some(resolution.origin),
                error: None,
            },
            Err(e) => BatchItem {
                index,
                input: input.to_string(),
                success: false,
                translation: None,
                origin: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{AiFallback, BackendError, GenerativeBackend, RetryPolicy};
    use crate::cache::TranslationCache;
    use crate::key::NormalizedKey;
    use crate::metrics::MetricsRegistry;
    use crate::store::{TranslationEntry, TranslationStore};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::time::Duration;

    struct MemStore {
        entries: Mutex<HashMap<String, TranslationEntry>>,
    }

    #[async_trait]
    impl TranslationStore for MemStore {
        async fn get(
            &self,
            key: &NormalizedKey,
        ) -> Result<Option<TranslationEntry>, TranslateError> {
            Ok(self.entries.lock().get(&key.hex()).cloned())
        }

        async fn put(
            &self,
            key: &NormalizedKey,
            entry: &TranslationEntry,
        ) -> Result<(), TranslateError> {
            self.entries.lock().insert(key.hex(), entry.clone());
            Ok(())
        }

        async fn search(
            &self,
            _query: &str,
            _lang: Option<TargetLanguage>,
            _limit: usize,
            _offset: usize,
        ) -> Result<Vec<TranslationEntry>, TranslateError> {
            Ok(Vec::new())
        }
    }

    /// Backend that answers from a fixed table and permanently fails on
    /// anything else.
    struct TableBackend {
        table: HashMap<String, String>,
    }

    #[async_trait]
    impl GenerativeBackend for TableBackend {
        async fn translate(
            &self,
            text: &str,
            _lang: TargetLanguage,
        ) -> Result<String, BackendError> {
            self.table
                .get(text)
                .cloned()
                .ok_or_else(|| BackendError::Permanent("unknown phrase".into()))
        }
    }

    fn orchestrator(pairs: &[(&str, &str)]) -> BatchOrchestrator {
        let table = pairs
            .iter()
            .map(|&(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let ai = AiFallback::new(
            Arc::new(TableBackend { table }),
            RetryPolicy {
                attempts: 3,
                base_backoff: Duration::from_millis(1),
            },
        );
        let resolver = TranslationResolver::new(
            Arc::new(TranslationCache::new(16)),
            Arc::new(MemStore {
                entries: Mutex::new(HashMap::new()),
            }),
            Some(ai),
            Arc::new(MetricsRegistry::new()),
            5000,
        );
        BatchOrchestrator::new(Arc::new(resolver), 100, 1000)
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn tolerant_batch_reports_every_item_in_order() {
        let orchestrator = orchestrator(&[("bonjour", "Mo ho"), ("merci", "Mo")]);
        let report = orchestrator
            .translate_batch(
                &texts(&["bonjour", "phrase inconnue", "merci"]),
                TargetLanguage::Baoule,
                &BatchOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(report.items.len(), 3);
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.successful, 2);
        assert_eq!(report.summary.failed, 1);

        assert_eq!(report.items[0].index, 0);
        assert_eq!(report.items[0].translation.as_deref(), Some("Mo ho"));
        assert!(!report.items[1].success);
        assert!(report.items[1].error.is_some());
        assert_eq!(report.items[2].index, 2);
        assert_eq!(report.items[2].translation.as_deref(), Some("Mo"));
    }

    #[tokio::test]
    async fn strict_batch_stops_at_first_failure() {
        let orchestrator = orchestrator(&[("bonjour", "Mo ho"), ("merci", "Mo")]);
        let options = BatchOptions {
            continue_on_error: false,
            ..Default::default()
        };
        let report = orchestrator
            .translate_batch(
                &texts(&["bonjour", "phrase inconnue", "merci"]),
                TargetLanguage::Baoule,
                &options,
            )
            .await
            .unwrap();

        // The third item was never attempted and is absent from the report,
        // but the summary still counts all submitted items.
        assert_eq!(report.items.len(), 2);
        assert!(report.items[0].success);
        assert!(!report.items[1].success);
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.successful, 1);
        assert_eq!(report.summary.failed, 1);
    }

    #[tokio::test]
    async fn empty_and_oversized_batches_are_rejected() {
        let orchestrator = orchestrator(&[]);
        let err = orchestrator
            .translate_batch(&[], TargetLanguage::Bete, &BatchOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::Validation(_)));

        let small = BatchOrchestrator::new(
            Arc::new(TranslationResolver::new(
                Arc::new(TranslationCache::new(4)),
                Arc::new(MemStore {
                    entries: Mutex::new(HashMap::new()),
                }),
                None,
                Arc::new(MetricsRegistry::new()),
                5000,
            )),
            2,
            1000,
        );
        let err = small
            .translate_batch(
                &texts(&["a", "b", "c"]),
                TargetLanguage::Bete,
                &BatchOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TranslateError::Validation(_)));
    }

    #[tokio::test]
    async fn oversized_item_fails_without_reaching_the_pipeline() {
        let orchestrator = orchestrator(&[("bonjour", "Akwaba")]);
        let long = "x".repeat(1001);
        let report = orchestrator
            .translate_batch(
                &[long, "bonjour".to_string()],
                TargetLanguage::Bete,
                &BatchOptions::default(),
            )
            .await
            .unwrap();

        assert!(!report.items[0].success);
        assert!(report.items[0]
            .error
            .as_deref()
            .is_some_and(|e| e.contains("too long")));
        assert!(report.items[1].success);
        assert_eq!(report.summary.successful, 1);
        assert_eq!(report.summary.failed, 1);
    }

    #[tokio::test]
    async fn cancelled_batch_skips_unlaunched_items() {
        let orchestrator = orchestrator(&[("bonjour", "Akwaba")]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let options = BatchOptions {
            cancel,
            ..Default::default()
        };

        let report = orchestrator
            .translate_batch(
                &texts(&["bonjour", "merci", "oui"]),
                TargetLanguage::Bete,
                &options,
            )
            .await
            .unwrap();

        assert!(report.items.is_empty());
        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.successful, 0);
        assert_eq!(report.summary.failed, 0);
    }
}
