//! Lookup-key normalization.
//! Canonical form of (text, language) used for equality across cache tiers:
//! trimmed, Unicode-lowercased (accents preserved), paired with the language
//! code and hashed with blake3 for compact keying.

use crate::error::TranslateError;
use crate::lang::TargetLanguage;

/// A normalized lookup key. `text` is the canonical source text; `hash` keys
/// the in-memory caches and the durable store documents.
#[derive(Debug, Clone)]
pub struct NormalizedKey {
    pub text: String,
    pub lang: TargetLanguage,
    pub hash: [u8; 32],
}

impl NormalizedKey {
    /// Hex form of the hash, used as a document id in the durable store.
    pub fn hex(&self) -> String {
        self.hash.iter().map(|b| format!("{b:02x}")).collect()
    }
}

/// Normalize raw input into a lookup key.
/// Fails with `Validation` when the text is empty after trimming or exceeds
/// `max_len` characters.
pub fn normalize(
    text: &str,
    lang: TargetLanguage,
    max_len: usize,
) -> Result<NormalizedKey, TranslateError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TranslateError::Validation("text is empty".into()));
    }
    let char_count = trimmed.chars().count();
    if char_count > max_len {
        return Err(TranslateError::Validation(format!(
            "text too long: {char_count} chars (max {max_len})"
        )));
    }

    let canonical = trimmed.to_lowercase();
    let hash = compute_hash(lang.code(), &canonical);

    Ok(NormalizedKey {
        text: canonical,
        lang,
        hash,
    })
}

/// blake3 over `lang | text`, the same keying scheme for every cache tier.
pub fn compute_hash(lang_code: &str, normalized_text: &str) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(lang_code.as_bytes());
    hasher.update(b"|");
    hasher.update(normalized_text.as_bytes());
    *hasher.finalize().as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_lowercases_preserving_accents() {
        let key = normalize("  Ça Va Bien  ", TargetLanguage::Baoule, 5000).unwrap();
        assert_eq!(key.text, "ça va bien");
    }

    #[test]
    fn same_text_different_language_yields_different_hash() {
        let a = normalize("bonjour", TargetLanguage::Bete, 5000).unwrap();
        let b = normalize("bonjour", TargetLanguage::Agni, 5000).unwrap();
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn case_variants_collide() {
        let a = normalize("Bonjour", TargetLanguage::Moore, 5000).unwrap();
        let b = normalize("bonjour ", TargetLanguage::Moore, 5000).unwrap();
        assert_eq!(a.hash, b.hash);
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert!(matches!(
            normalize("   ", TargetLanguage::Bete, 5000),
            Err(TranslateError::Validation(_))
        ));
        let long = "a".repeat(5001);
        assert!(matches!(
            normalize(&long, TargetLanguage::Bete, 5000),
            Err(TranslateError::Validation(_))
        ));
        // Boundary: exactly max_len is accepted.
        let exact = "a".repeat(5000);
        assert!(normalize(&exact, TargetLanguage::Bete, 5000).is_ok());
    }

    #[test]
    fn hex_id_is_stable() {
        let key = normalize("merci", TargetLanguage::Agni, 5000).unwrap();
        assert_eq!(key.hex().len(), 64);
        assert_eq!(key.hex(), normalize("MERCI", TargetLanguage::Agni, 5000).unwrap().hex());
    }
}
