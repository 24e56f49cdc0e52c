//! Gemini REST backend.
//! Builds a few-shot prompt from the target-language context, calls
//! generateContent, and cleans the model output down to the bare translation.
//! The model is instructed to answer `TRADUCTION_IMPOSSIBLE` when it cannot
//! translate, which surfaces as a permanent failure.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::{BackendError, GenerativeBackend};
use crate::lang::TargetLanguage;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

/// Markers the model uses to signal an untranslatable input.
const IMPOSSIBILITY_MARKERS: &[&str] = &[
    "traduction_impossible",
    "cannot translate",
    "unable to translate",
    "impossible de traduire",
];

pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    cleaner: ResponseCleaner,
}

impl GeminiClient {
    pub fn new(api_key: String, timeout: Duration) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Permanent(format!("http client: {e}")))?;

        Ok(Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key,
            cleaner: ResponseCleaner::new(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }
}

#[async_trait]
impl GenerativeBackend for GeminiClient {
    async fn translate(&self, text: &str, lang: TargetLanguage) -> Result<String, BackendError> {
        let prompt = build_prompt(text, lang);
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "maxOutputTokens": 200,
                "temperature": 0.2,
                "topP": 0.8,
                "topK": 40
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    BackendError::Transient(format!("transport: {e}"))
                } else {
                    BackendError::Permanent(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 408 || status.as_u16() == 429 || status.is_server_error() {
            return Err(BackendError::Transient(format!("model returned {status}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let snippet: String = body.chars().take(200).collect();
            return Err(BackendError::Permanent(format!(
                "model returned {status}: {snippet}"
            )));
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Permanent(format!("model payload: {e}")))?;

        let raw = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .filter(|s| !s.is_empty())
            .ok_or_else(|| BackendError::Permanent("model returned no candidates".into()))?;

        let cleaned = self.cleaner.clean(&raw);
        debug!(lang = %lang, raw_len = raw.len(), cleaned_len = cleaned.len(), "model output cleaned");

        let lower = cleaned.to_lowercase();
        if IMPOSSIBILITY_MARKERS.iter().any(|m| lower.contains(m)) {
            return Err(BackendError::Permanent(
                "model reported the text as untranslatable".into(),
            ));
        }
        if cleaned.is_empty() {
            return Err(BackendError::Permanent("model returned empty text".into()));
        }

        Ok(cleaned)
    }
}

/// Strips the chatter models wrap around a bare translation: surrounding
/// quotes, "Traduction:" style prefixes, parenthesised explanations, and a
/// stray trailing period.
pub struct ResponseCleaner {
    prefixes: Vec<Regex>,
    parenthetical: Regex,
}

impl ResponseCleaner {
    pub fn new() -> Self {
        let prefix_patterns = [
            r"(?i)^traduction\s*:?\s*",
            r"(?i)^translation\s*:?\s*",
            r"(?i)^réponse\s*:?\s*",
            r"(?i)^response\s*:?\s*",
            r"(?i)^en\s+\w+\s*:?\s*",
            r"(?i)^le texte traduit est\s*:?\s*",
            r"(?i)^voici la traduction\s+(?:en\s+\w+\s+)?:?\s*",
            r"(?i)^la traduction est\s*:?\s*",
            r"(?i)^traduction en\s+\w+\s*:?\s*",
            r"(?i)^\w+\s*:\s*",
        ];
        Self {
            prefixes: prefix_patterns
                .iter()
                .map(|p| Regex::new(p).expect("prefix pattern is valid"))
                .collect(),
            parenthetical: Regex::new(r"\s*[(\[].*").expect("parenthetical pattern is valid"),
        }
    }

    pub fn clean(&self, raw: &str) -> String {
        let mut text = raw.trim().to_string();

        // Surrounding quotes.
        if (text.starts_with('"') && text.ends_with('"') && text.len() >= 2)
            || (text.starts_with('\'') && text.ends_with('\'') && text.len() >= 2)
        {
            text = text[1..text.len() - 1].trim().to_string();
        }

        for prefix in &self.prefixes {
            text = prefix.replace(&text, "").trim().to_string();
        }

        // Explanations appended in brackets, e.g. "Akwaba (cela signifie...)".
        text = self.parenthetical.replace(&text, "").trim().to_string();

        if text.ends_with('.') && !text.ends_with("...") {
            text.pop();
            text = text.trim().to_string();
        }

        text
    }
}

impl Default for ResponseCleaner {
    fn default() -> Self {
        Self::new()
    }
}

/// Prompt with language description, few-shot pairs, and strict output rules.
fn build_prompt(text: &str, lang: TargetLanguage) -> String {
    let ctx = lang.prompt_context();
    let examples: String = ctx
        .examples
        .iter()
        .map(|(fr, local)| format!("  - {fr} → {local}\n"))
        .collect();

    format!(
        "Tu es un expert linguiste spécialisé dans les langues africaines locales.\n\
         \n\
         LANGUE CIBLE: {code}\n\
         Description: {description}\n\
         \n\
         EXEMPLES DE TRADUCTIONS FRANÇAISES → {code_upper}:\n\
         {examples}\
         \n\
         NOTES IMPORTANTES:\n\
         - {notes}\n\
         \n\
         TEXTE À TRADUIRE:\n\
         \"{text}\"\n\
         \n\
         INSTRUCTIONS STRICTES:\n\
         1. Traduis le texte français ci-dessus en {code}\n\
         2. Fournis UNIQUEMENT la traduction, sans aucun préfixe, explication ou commentaire\n\
         3. Ne mets pas de guillemets autour de ta réponse\n\
         4. Respecte strictement la grammaire et les tons du {code}\n\
         5. Utilise les caractères spéciaux appropriés (accents, tildes, etc.)\n\
         6. Si la traduction est impossible ou que tu n'es pas sûr, réponds exactement: TRADUCTION_IMPOSSIBLE\n\
         \n\
         TRADUCTION:",
        code = lang.code(),
        code_upper = lang.code().to_uppercase(),
        description = ctx.description,
        examples = examples,
        notes = ctx.notes,
        text = text,
    )
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}
