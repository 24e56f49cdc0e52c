//! Durable store adapter.
//! Two interchangeable implementations behind one trait: a cloud document
//! store reached over REST and a local JSON-backed map. The resolver never
//! depends on which one it is talking to.

pub mod firestore;
pub mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TranslateError;
use crate::key::NormalizedKey;
use crate::lang::TargetLanguage;

pub use firestore::FirestoreRestStore;
pub use local::LocalJsonStore;

/// Which tier satisfied a translation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Cache,
    Store,
    Ai,
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Origin::Cache => "cache",
            Origin::Store => "store",
            Origin::Ai => "ai",
        };
        f.write_str(s)
    }
}

/// One authoritative translation record. At most one entry exists per
/// (normalized source text, target language) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationEntry {
    pub source_text: String,
    pub source_lang: String,
    pub target_lang: TargetLanguage,
    pub translated_text: String,
    pub origin: Origin,
    pub version: u32,
    pub updated_at: i64,
}

impl TranslationEntry {
    pub fn new(
        key: &NormalizedKey,
        translated_text: String,
        origin: Origin,
        version: u32,
    ) -> Self {
        Self {
            source_text: key.text.clone(),
            source_lang: crate::lang::SOURCE_LANG.to_string(),
            target_lang: key.lang,
            translated_text,
            origin,
            version,
            updated_at: now_unix(),
        }
    }
}

/// Key-value + search surface over the durable tier.
#[async_trait]
pub trait TranslationStore: Send + Sync {
    async fn get(&self, key: &NormalizedKey) -> Result<Option<TranslationEntry>, TranslateError>;

    /// Write the entry for `key`, replacing any previous one. Callers are
    /// responsible for never lowering an existing entry's version.
    async fn put(&self, key: &NormalizedKey, entry: &TranslationEntry)
        -> Result<(), TranslateError>;

    /// Substring match over stored source texts, ordered by (updated_at,
    /// source_text) so pagination is deterministic absent concurrent writes.
    async fn search(
        &self,
        query: &str,
        lang: Option<TargetLanguage>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TranslationEntry>, TranslateError>;
}

/// Current time as Unix timestamp (seconds).
pub(crate) fn now_unix() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
