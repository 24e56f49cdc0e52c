//! Speech synthesis with a bounded audio cache.
//! The synthesizer is a trait so tests run without a network; the cache is an
//! LRU keyed by blake3 of (effective language, text) with byte accounting.
//! Local African language codes have no synthesis voice and fall back to
//! French with a warning attached to the result.

pub mod gtts;

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::Engine as _;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, warn};

use crate::key;
use crate::metrics::{stages, MetricsRegistry};

pub use gtts::GoogleTranslateTts;

#[derive(Debug, Clone)]
pub enum SynthesisError {
    InvalidText(String),
    /// The engine has no voice for the requested code. Callers may retry
    /// with a substitute language, surfacing a warning.
    UnsupportedLanguage { requested: String },
    Failed { lang: String, reason: String },
}

impl fmt::Display for SynthesisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SynthesisError::InvalidText(msg) => write!(f, "invalid text: {msg}"),
            SynthesisError::UnsupportedLanguage { requested } => {
                write!(f, "no synthesis voice for '{requested}'")
            }
            SynthesisError::Failed { lang, reason } => {
                write!(f, "synthesis failed for '{lang}': {reason}")
            }
        }
    }
}

impl std::error::Error for SynthesisError {}

/// Text in, encoded audio out.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, lang_code: &str) -> Result<Vec<u8>, SynthesisError>;

    fn supports(&self, lang_code: &str) -> bool;
}

/// Map a requested language code onto one the synthesizer can voice.
/// Region suffixes are stripped ("fr-FR" becomes "fr"); anything the
/// synthesizer cannot voice falls back to French with a warning.
pub fn effective_tts_language(
    requested: &str,
    synthesizer: &dyn SpeechSynthesizer,
) -> (String, Option<String>) {
    let base = requested
        .split(['-', '_'])
        .next()
        .unwrap_or(requested)
        .to_lowercase();

    if synthesizer.supports(&base) {
        return (base, None);
    }
    let warning = format!("no synthesis voice for '{requested}', using French audio");
    ("fr".to_string(), Some(warning))
}

struct AudioEntry {
    bytes: Arc<Vec<u8>>,
    created_at: i64,
    hit_count: u64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AudioCacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub total_bytes: usize,
    /// Creation time of the oldest resident entry, Unix seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_created_at: Option<i64>,
}

struct AudioCacheInner {
    map: LruCache<[u8; 32], AudioEntry>,
    hits: u64,
    misses: u64,
    total_bytes: usize,
}

/// Bounded LRU over synthesized audio. Capacity counts entries; byte totals
/// are tracked so operators can see how much memory the cache holds.
pub struct AudioCache {
    inner: Mutex<AudioCacheInner>,
}

impl AudioCache {
    pub fn new(capacity: usize) -> Self {
        // A zero capacity would be unconstructible; one entry is the floor.
        Self {
            inner: Mutex::new(AudioCacheInner {
                map: LruCache::new(
                    NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to at least 1"),
                ),
                hits: 0,
                misses: 0,
                total_bytes: 0,
            }),
        }
    }

    pub fn get(&self, key: &[u8; 32]) -> Option<Arc<Vec<u8>>> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        match inner.map.get_mut(key) {
            Some(entry) => {
                entry.hit_count += 1;
                let bytes = Arc::clone(&entry.bytes);
                inner.hits += 1;
                Some(bytes)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    pub fn insert(&self, key: [u8; 32], bytes: Arc<Vec<u8>>) {
        let mut inner = self.inner.lock();
        inner.total_bytes += bytes.len();
        let entry = AudioEntry {
            bytes,
            created_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs() as i64,
            hit_count: 0,
        };
        if let Some((_, evicted)) = inner.map.push(key, entry) {
            inner.total_bytes = inner.total_bytes.saturating_sub(evicted.bytes.len());
            debug!(evicted_bytes = evicted.bytes.len(), age_hits = evicted.hit_count, "audio entry evicted");
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.map.clear();
        inner.hits = 0;
        inner.misses = 0;
        inner.total_bytes = 0;
    }

    pub fn stats(&self) -> AudioCacheStats {
        let inner = self.inner.lock();
        AudioCacheStats {
            entries: inner.map.len(),
            hits: inner.hits,
            misses: inner.misses,
            total_bytes: inner.total_bytes,
            oldest_created_at: inner.map.iter().map(|(_, e)| e.created_at).min(),
        }
    }
}

/// Result of a speak request.
#[derive(Debug, Clone)]
pub struct SpokenAudio {
    pub bytes: Arc<Vec<u8>>,
    pub cached: bool,
    pub effective_lang: String,
    pub warning: Option<String>,
}

/// Wire shape for callers that want the audio inline.
#[derive(Debug, Clone, Serialize)]
pub struct SpeakPayload {
    pub audio_base64: String,
    pub content_type: &'static str,
    pub audio_size_bytes: usize,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl SpeakPayload {
    pub fn from_audio(audio: &SpokenAudio) -> Self {
        Self {
            audio_base64: base64::engine::general_purpose::STANDARD.encode(audio.bytes.as_slice()),
            content_type: "audio/mpeg",
            audio_size_bytes: audio.bytes.len(),
            cached: audio.cached,
            warning: audio.warning.clone(),
        }
    }
}

pub struct SpeechService {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    cache: AudioCache,
    metrics: Arc<MetricsRegistry>,
}

impl SpeechService {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        cache_capacity: usize,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        Self {
            synthesizer,
            cache: AudioCache::new(cache_capacity),
            metrics,
        }
    }

    /// Synthesize `text` in the closest supported voice. With `use_cache`
    /// unset the cache is bypassed on both the read and the write side.
    pub async fn speak(
        &self,
        text: &str,
        lang_code: &str,
        use_cache: bool,
    ) -> Result<SpokenAudio, SynthesisError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(SynthesisError::InvalidText("text is empty".into()));
        }

        let (effective_lang, warning) =
            effective_tts_language(lang_code, self.synthesizer.as_ref());
        if let Some(w) = &warning {
            warn!(requested = lang_code, "{w}");
        }

        let cache_key = key::compute_hash(&effective_lang, &trimmed.to_lowercase());
        if use_cache {
            if let Some(bytes) = self.cache.get(&cache_key) {
                return Ok(SpokenAudio {
                    bytes,
                    cached: true,
                    effective_lang,
                    warning,
                });
            }
        }

        let timer = self.metrics.timer(stages::TTS_SYNTHESIZE);
        let result = self.synthesizer.synthesize(trimmed, &effective_lang).await;
        timer.finish();
        let bytes = Arc::new(result?);

        if use_cache {
            self.cache.insert(cache_key, Arc::clone(&bytes));
        }
        Ok(SpokenAudio {
            bytes,
            cached: false,
            effective_lang,
            warning,
        })
    }

    pub fn cache_stats(&self) -> AudioCacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FakeVoice {
        calls: AtomicU32,
    }

    impl FakeVoice {
        fn service(capacity: usize) -> (Arc<Self>, SpeechService) {
            let voice = Arc::new(FakeVoice {
                calls: AtomicU32::new(0),
            });
            let service = SpeechService::new(
                voice.clone(),
                capacity,
                Arc::new(MetricsRegistry::new()),
            );
            (voice, service)
        }
    }

    #[async_trait]
    impl SpeechSynthesizer for FakeVoice {
        async fn synthesize(
            &self,
            text: &str,
            lang_code: &str,
        ) -> Result<Vec<u8>, SynthesisError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{lang_code}:{text}").into_bytes())
        }

        fn supports(&self, lang_code: &str) -> bool {
            lang_code == "fr" || lang_code == "en"
        }
    }

    #[test]
    fn language_fallback_strips_region_and_warns_on_unsupported() {
        let voice = FakeVoice {
            calls: AtomicU32::new(0),
        };
        let (lang, warning) = effective_tts_language("fr-FR", &voice);
        assert_eq!(lang, "fr");
        assert!(warning.is_none());

        let (lang, warning) = effective_tts_language("bété", &voice);
        assert_eq!(lang, "fr");
        assert!(warning.is_some());
    }

    #[tokio::test]
    async fn second_speak_is_served_from_cache() {
        let (voice, service) = FakeVoice::service(8);
        let first = service.speak("bonjour", "fr", true).await.unwrap();
        assert!(!first.cached);
        let second = service.speak("Bonjour ", "fr", true).await.unwrap();
        assert!(second.cached);
        assert_eq!(first.bytes, second.bytes);
        assert_eq!(voice.calls.load(Ordering::SeqCst), 1);

        let stats = service.cache_stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn cache_bypass_skips_read_and_write() {
        let (voice, service) = FakeVoice::service(8);
        service.speak("bonjour", "fr", false).await.unwrap();
        service.speak("bonjour", "fr", false).await.unwrap();
        assert_eq!(voice.calls.load(Ordering::SeqCst), 2);
        assert_eq!(service.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn capacity_bounds_entries_and_bytes() {
        let (_, service) = FakeVoice::service(2);
        service.speak("un", "fr", true).await.unwrap();
        service.speak("deux", "fr", true).await.unwrap();
        service.speak("trois", "fr", true).await.unwrap();

        let stats = service.cache_stats();
        assert_eq!(stats.entries, 2);
        // "fr:deux" + "fr:trois"
        assert_eq!(stats.total_bytes, 7 + 8);
        assert!(stats.oldest_created_at.is_some());
    }

    #[tokio::test]
    async fn zero_capacity_is_clamped_to_one_entry() {
        let (_, service) = FakeVoice::service(0);
        service.speak("un", "fr", true).await.unwrap();
        service.speak("deux", "fr", true).await.unwrap();
        let stats = service.cache_stats();
        assert_eq!(stats.entries, 1);
        // Only the newest entry's bytes remain accounted for ("fr:deux").
        assert_eq!(stats.total_bytes, 7);
    }

    #[tokio::test]
    async fn unsupported_language_falls_back_to_french_audio() {
        let (_, service) = FakeVoice::service(8);
        let audio = service.speak("akwaba", "bété", true).await.unwrap();
        assert_eq!(audio.effective_lang, "fr");
        assert!(audio.warning.is_some());
        assert_eq!(audio.bytes.as_slice(), b"fr:akwaba");
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let (_, service) = FakeVoice::service(8);
        let err = service.speak("   ", "fr", true).await.unwrap_err();
        assert!(matches!(err, SynthesisError::InvalidText(_)));
    }

    #[test]
    fn payload_encodes_audio() {
        let audio = SpokenAudio {
            bytes: Arc::new(b"abc".to_vec()),
            cached: true,
            effective_lang: "fr".into(),
            warning: None,
        };
        let payload = SpeakPayload::from_audio(&audio);
        assert_eq!(payload.audio_base64, "YWJj");
        assert_eq!(payload.audio_size_bytes, 3);
        assert_eq!(payload.content_type, "audio/mpeg");
        assert!(payload.cached);
    }
}
