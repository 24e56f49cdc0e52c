//! Local JSON-backed store.
//! Entries live in memory behind an RwLock and every mutation rewrites the
//! JSON file atomically (temp file + rename). Seed translations are written
//! on first open so a fresh deployment answers common phrases offline.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{now_unix, Origin, TranslationEntry, TranslationStore};
use crate::error::TranslateError;
use crate::key::{self, NormalizedKey};
use crate::lang::TargetLanguage;

/// Common phrases shipped with the store, per target language:
/// (french, bété, baoulé, mooré, agni).
const SEED_TRANSLATIONS: &[(&str, &str, &str, &str, &str)] = &[
    ("bonjour", "Akwaba", "Mo ho", "Ne y windga", "Agni oh"),
    ("comment allez-vous?", "Bi ye né?", "Wo ho tè n?", "Fo laafi?", "Aka kye?"),
    ("merci", "Akpé", "Mo", "Barika", "Akpé"),
    ("au revoir", "Kan na", "Kan na", "Nan kã pãalem", "Aka na"),
    ("oui", "Yoo", "Yoo", "Yãa", "Aoo"),
    ("non", "Kou", "Kou", "Ayi", "N'an"),
];

/// On-disk file format. Keyed by the hex of the normalized key hash.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    entries: HashMap<String, TranslationEntry>,
}

pub struct LocalJsonStore {
    path: PathBuf,
    entries: RwLock<HashMap<String, TranslationEntry>>,
}

impl LocalJsonStore {
    /// Open the store at `path`, creating it with seed data when absent.
    pub fn open(path: &Path) -> Result<Self, TranslateError> {
        let entries = match std::fs::read_to_string(path) {
            Ok(content) => {
                let file: StoreFile = serde_json::from_str(&content)?;
                info!(
                    path = %path.display(),
                    entries = file.entries.len(),
                    "local store loaded"
                );
                file.entries
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "local store missing, seeding defaults");
                seed_entries()
            }
            Err(e) => return Err(e.into()),
        };

        let store = Self {
            path: path.to_path_buf(),
            entries: RwLock::new(entries),
        };
        store.persist()?;
        Ok(store)
    }

    /// Rewrite the backing file from the in-memory map. Write-then-rename so
    /// readers of the file never observe a partial document.
    fn persist(&self) -> Result<(), TranslateError> {
        let snapshot = StoreFile {
            entries: self.entries.read().clone(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl TranslationStore for LocalJsonStore {
    async fn get(&self, key: &NormalizedKey) -> Result<Option<TranslationEntry>, TranslateError> {
        Ok(self.entries.read().get(&key.hex()).cloned())
    }

    async fn put(
        &self,
        key: &NormalizedKey,
        entry: &TranslationEntry,
    ) -> Result<(), TranslateError> {
        self.entries.write().insert(key.hex(), entry.clone());
        if let Err(e) = self.persist() {
            warn!(error = %e, "local store persist failed");
            return Err(e);
        }
        Ok(())
    }

    async fn search(
        &self,
        query: &str,
        lang: Option<TargetLanguage>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TranslationEntry>, TranslateError> {
        let needle = query.trim().to_lowercase();
        let entries = self.entries.read();

        let mut matches: Vec<TranslationEntry> = entries
            .values()
            .filter(|e| lang.map_or(true, |l| e.target_lang == l))
            .filter(|e| needle.is_empty() || e.source_text.contains(&needle))
            .cloned()
            .collect();

        matches.sort_by(|a, b| {
            a.updated_at
                .cmp(&b.updated_at)
                .then_with(|| a.source_text.cmp(&b.source_text))
                .then_with(|| a.target_lang.code().cmp(b.target_lang.code()))
        });

        Ok(matches.into_iter().skip(offset).take(limit).collect())
    }
}

fn seed_entries() -> HashMap<String, TranslationEntry> {
    let now = now_unix();
    let mut entries = HashMap::new();
    for &(fr, bete, baoule, moore, agni) in SEED_TRANSLATIONS {
        let pairs = [
            (TargetLanguage::Bete, bete),
            (TargetLanguage::Baoule, baoule),
            (TargetLanguage::Moore, moore),
            (TargetLanguage::Agni, agni),
        ];
        for (lang, translation) in pairs {
            let hash = key::compute_hash(lang.code(), fr);
            let hex: String = hash.iter().map(|b| format!("{b:02x}")).collect();
            entries.insert(
                hex,
                TranslationEntry {
                    source_text: fr.to_string(),
                    source_lang: crate::lang::SOURCE_LANG.to_string(),
                    target_lang: lang,
                    translated_text: translation.to_string(),
                    origin: Origin::Store,
                    version: 1,
                    updated_at: now,
                },
            );
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::normalize;

    fn open_in(dir: &tempfile::TempDir) -> LocalJsonStore {
        LocalJsonStore::open(&dir.path().join("translations.json")).unwrap()
    }

    #[tokio::test]
    async fn seeds_defaults_on_first_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_in(&dir);
        assert_eq!(store.len(), SEED_TRANSLATIONS.len() * 4);

        let key = normalize("Bonjour", TargetLanguage::Baoule, 5000).unwrap();
        let entry = store.get(&key).await.unwrap().unwrap();
        assert_eq!(entry.translated_text, "Mo ho");
        assert_eq!(entry.version, 1);
    }

    #[tokio::test]
    async fn put_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("translations.json");
        let key = normalize("fleuve", TargetLanguage::Moore, 5000).unwrap();

        {
            let store = LocalJsonStore::open(&path).unwrap();
            let entry = TranslationEntry::new(&key, "Kuilga".into(), Origin::Ai, 1);
            store.put(&key, &entry).await.unwrap();
        }

        let reopened = LocalJsonStore::open(&path).unwrap();
        let entry = reopened.get(&key).await.unwrap().unwrap();
        assert_eq!(entry.translated_text, "Kuilga");
        assert_eq!(entry.origin, Origin::Ai);
    }

    #[tokio::test]
    async fn search_filters_and_paginates_deterministically() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_in(&dir);

        let all = store.search("", None, 100, 0).await.unwrap();
        assert_eq!(all.len(), SEED_TRANSLATIONS.len() * 4);

        // Same query twice yields the same ordering.
        let again = store.search("", None, 100, 0).await.unwrap();
        let ids = |v: &[TranslationEntry]| -> Vec<(String, String)> {
            v.iter()
                .map(|e| (e.source_text.clone(), e.target_lang.code().to_string()))
                .collect()
        };
        assert_eq!(ids(&all), ids(&again));

        // Pagination slices the same ordering.
        let page1 = store.search("", None, 5, 0).await.unwrap();
        let page2 = store.search("", None, 5, 5).await.unwrap();
        assert_eq!(ids(&all)[..5], ids(&page1)[..]);
        assert_eq!(ids(&all)[5..10], ids(&page2)[..]);

        // Substring + language filter.
        let bonjour = store
            .search("bonjour", Some(TargetLanguage::Bete), 10, 0)
            .await
            .unwrap();
        assert_eq!(bonjour.len(), 1);
        assert_eq!(bonjour[0].translated_text, "Akwaba");

        // No match is an empty result, not an error.
        let none = store.search("zzzz", None, 10, 0).await.unwrap();
        assert!(none.is_empty());
    }
}
