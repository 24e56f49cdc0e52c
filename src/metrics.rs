//! Timing metrics for the resolution pipeline.
//! Named histograms over a bounded sample window, with p50/p95/p99 summaries.
//! Stages record elapsed microseconds via `Timer` guards.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

/// Well-known stage names.
pub mod stages {
    pub const RESOLVE_TOTAL: &str = "resolve_total";
    pub const CACHE_LOOKUP: &str = "cache_lookup";
    pub const STORE_LOOKUP: &str = "store_lookup";
    pub const STORE_WRITE: &str = "store_write";
    pub const AI_TRANSLATE: &str = "ai_translate";
    pub const BATCH_TOTAL: &str = "batch_total";
    pub const BATCH_ITEM: &str = "batch_item";
    pub const TTS_SYNTHESIZE: &str = "tts_synthesize";
}

const WINDOW: usize = 1024;

/// Sliding window of the most recent samples for one stage.
struct Window {
    samples: Vec<f64>,
    next: usize,
    filled: bool,
}

impl Window {
    fn new() -> Self {
        Self {
            samples: Vec::with_capacity(WINDOW),
            next: 0,
            filled: false,
        }
    }

    fn push(&mut self, value: f64) {
        if self.filled {
            self.samples[self.next] = value;
            self.next = (self.next + 1) % WINDOW;
        } else {
            self.samples.push(value);
            if self.samples.len() == WINDOW {
                self.filled = true;
            }
        }
    }

    fn percentile(&self, p: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted = self.samples.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((p / 100.0) * (sorted.len() as f64 - 1.0)).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }
}

/// Registry of per-stage histograms. Shared behind an Arc; all mutation goes
/// through one mutex so summaries are consistent snapshots.
pub struct MetricsRegistry {
    windows: Mutex<HashMap<&'static str, Window>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Record one sample, in microseconds.
    pub fn observe(&self, stage: &'static str, value_us: f64) {
        self.windows
            .lock()
            .entry(stage)
            .or_insert_with(Window::new)
            .push(value_us);
    }

    /// Start a timer that records its elapsed time when finished.
    pub fn timer(self: &Arc<Self>, stage: &'static str) -> Timer {
        Timer {
            stage,
            start: Instant::now(),
            registry: Arc::clone(self),
        }
    }

    pub fn percentile(&self, stage: &str, p: f64) -> f64 {
        self.windows
            .lock()
            .get(stage)
            .map(|w| w.percentile(p))
            .unwrap_or(0.0)
    }

    /// Snapshot of every stage at p50/p95/p99.
    pub fn summary(&self) -> HashMap<String, StageSummary> {
        let windows = self.windows.lock();
        windows
            .iter()
            .map(|(&name, w)| {
                (
                    name.to_string(),
                    StageSummary {
                        p50_us: w.percentile(50.0),
                        p95_us: w.percentile(95.0),
                        p99_us: w.percentile(99.0),
                        count: w.samples.len(),
                    },
                )
            })
            .collect()
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct StageSummary {
    pub p50_us: f64,
    pub p95_us: f64,
    pub p99_us: f64,
    pub count: usize,
}

/// Guard returned by [`MetricsRegistry::timer`].
pub struct Timer {
    stage: &'static str,
    start: Instant,
    registry: Arc<MetricsRegistry>,
}

impl Timer {
    /// Stop the timer, record the sample, and return elapsed microseconds.
    pub fn finish(self) -> f64 {
        let elapsed_us = self.start.elapsed().as_micros() as f64;
        self.registry.observe(self.stage, elapsed_us);
        elapsed_us
    }
}
