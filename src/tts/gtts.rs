//! Google Translate TTS endpoint.
//! Unofficial but stable: a GET against translate_tts with the `tw-ob`
//! client returns MP3 audio for short texts. Only a handful of voices are
//! relevant here; French is the one the fallback path relies on.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{SpeechSynthesizer, SynthesisError};

const ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// Voices this synthesizer will claim support for.
const SUPPORTED: &[&str] = &["fr", "en", "es", "de", "it", "pt"];

/// The endpoint truncates long inputs; keep requests under its limit.
const MAX_CHARS: usize = 200;

pub struct GoogleTranslateTts {
    http: reqwest::Client,
}

impl GoogleTranslateTts {
    pub fn new(timeout: Duration) -> Result<Self, SynthesisError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(2)
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36")
            .build()
            .map_err(|e| SynthesisError::Failed {
                lang: String::new(),
                reason: format!("http client: {e}"),
            })?;
        Ok(Self { http })
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(&self, text: &str, lang_code: &str) -> Result<Vec<u8>, SynthesisError> {
        if !self.supports(lang_code) {
            return Err(SynthesisError::UnsupportedLanguage {
                requested: lang_code.to_string(),
            });
        }
        let char_count = text.chars().count();
        if char_count > MAX_CHARS {
            return Err(SynthesisError::InvalidText(format!(
                "text too long for synthesis: {char_count} chars (max {MAX_CHARS})"
            )));
        }

        let response = self
            .http
            .get(ENDPOINT)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", lang_code),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| SynthesisError::Failed {
                lang: lang_code.to_string(),
                reason: format!("transport: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(SynthesisError::Failed {
                lang: lang_code.to_string(),
                reason: format!("endpoint returned {}", response.status()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::Failed {
                lang: lang_code.to_string(),
                reason: format!("reading audio: {e}"),
            })?
            .to_vec();

        if bytes.is_empty() {
            return Err(SynthesisError::Failed {
                lang: lang_code.to_string(),
                reason: "endpoint returned no audio".into(),
            });
        }
        debug!(lang = lang_code, bytes = bytes.len(), "audio synthesized");
        Ok(bytes)
    }

    fn supports(&self, lang_code: &str) -> bool {
        SUPPORTED.contains(&lang_code)
    }
}
