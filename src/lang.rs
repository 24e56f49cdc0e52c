//! Supported target languages and their metadata.
//! Source language is always French; targets are the four West-African
//! languages the dictionary covers. Each language carries a prompt context
//! (description + few-shot pairs) for the generative fallback and an
//! effective TTS code for speech synthesis.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TranslateError;

/// The only supported source language.
pub const SOURCE_LANG: &str = "fr";

/// A translation target language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetLanguage {
    #[serde(rename = "bété")]
    Bete,
    #[serde(rename = "baoulé")]
    Baoule,
    #[serde(rename = "mooré")]
    Moore,
    #[serde(rename = "agni")]
    Agni,
}

impl TargetLanguage {
    pub const ALL: [TargetLanguage; 4] = [
        TargetLanguage::Bete,
        TargetLanguage::Baoule,
        TargetLanguage::Moore,
        TargetLanguage::Agni,
    ];

    /// Canonical lowercase language code, as used in requests and store keys.
    pub fn code(&self) -> &'static str {
        match self {
            TargetLanguage::Bete => "bété",
            TargetLanguage::Baoule => "baoulé",
            TargetLanguage::Moore => "mooré",
            TargetLanguage::Agni => "agni",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TargetLanguage::Bete => "Bété",
            TargetLanguage::Baoule => "Baoulé",
            TargetLanguage::Moore => "Mooré",
            TargetLanguage::Agni => "Agni",
        }
    }

    pub fn region(&self) -> &'static str {
        match self {
            TargetLanguage::Bete | TargetLanguage::Baoule | TargetLanguage::Agni => {
                "Côte d'Ivoire"
            }
            TargetLanguage::Moore => "Burkina Faso",
        }
    }

    /// The language the speech engine actually synthesizes with. None of the
    /// targets have native TTS support, so all fall back to French.
    pub fn tts_code(&self) -> &'static str {
        "fr"
    }

    /// Prompt context for the generative fallback.
    pub fn prompt_context(&self) -> PromptContext {
        match self {
            TargetLanguage::Bete => PromptContext {
                description: "langue Kru parlée principalement en Côte d'Ivoire, \
                              dans les régions de Gagnoa et Daloa",
                examples: &[
                    ("Bonjour", "Akwaba"),
                    ("Merci", "Akpé"),
                    ("Au revoir", "Kan na"),
                    ("Oui", "Yoo"),
                    ("Non", "Kou"),
                    ("Comment allez-vous?", "Bi ye né?"),
                    ("Ça va", "Bi dè"),
                    ("Eau", "Nyɛ"),
                ],
                notes: "Le Bété utilise des tons et des nasales. Respecte les \
                        accents et les caractères spéciaux.",
            },
            TargetLanguage::Baoule => PromptContext {
                description: "langue akan parlée en Côte d'Ivoire, principalement \
                              dans la région du centre (Yamoussoukro, Bouaké)",
                examples: &[
                    ("Bonjour", "Mo ho"),
                    ("Merci", "Mo"),
                    ("Au revoir", "Kan na"),
                    ("Oui", "Yoo"),
                    ("Non", "Kou"),
                    ("Comment allez-vous?", "Wo ho tè n?"),
                    ("Je m'appelle", "Man yi tɔ"),
                    ("Maison", "Kpè"),
                ],
                notes: "Le Baoulé est une langue tonale avec des voyelles nasales.",
            },
            TargetLanguage::Moore => PromptContext {
                description: "langue Gur parlée principalement au Burkina Faso par \
                              le peuple Mossi, également parlée au Ghana et au Togo",
                examples: &[
                    ("Bonjour", "Ne y windga"),
                    ("Merci", "Barika"),
                    ("Au revoir", "Nan kã pãalem"),
                    ("Oui", "Yãa"),
                    ("Non", "Ayi"),
                    ("Comment allez-vous?", "Fo laafi?"),
                    ("Bonne nuit", "Sẽn-doogo"),
                    ("Eau", "Koom"),
                ],
                notes: "Le Mooré utilise des nasales marquées par des tildes (~).",
            },
            TargetLanguage::Agni => PromptContext {
                description: "langue akan parlée principalement en Côte d'Ivoire \
                              dans la région Est (Abengourou, Agnibilékrou)",
                examples: &[
                    ("Bonjour", "Agni oh"),
                    ("Merci", "Akpé"),
                    ("Au revoir", "Aka na"),
                    ("Oui", "Aoo"),
                    ("Non", "N'an"),
                    ("Comment allez-vous?", "Aka kye?"),
                    ("Maison", "Aso"),
                    ("Eau", "Nsu"),
                ],
                notes: "L'Agni est proche du Baoulé mais avec des variations \
                        dialectales.",
            },
        }
    }
}

impl fmt::Display for TargetLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for TargetLanguage {
    type Err = TranslateError;

    /// Accepts the canonical accented code and its plain-ASCII spelling,
    /// case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bété" | "bete" => Ok(TargetLanguage::Bete),
            "baoulé" | "baoule" => Ok(TargetLanguage::Baoule),
            "mooré" | "moore" => Ok(TargetLanguage::Moore),
            "agni" => Ok(TargetLanguage::Agni),
            other => Err(TranslateError::Validation(format!(
                "unsupported target language '{other}', supported: {}",
                supported_codes().join(", ")
            ))),
        }
    }
}

/// Few-shot context injected into the generative prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptContext {
    pub description: &'static str,
    pub examples: &'static [(&'static str, &'static str)],
    pub notes: &'static str,
}

/// Language descriptor for the supported-languages listing.
#[derive(Debug, Clone, Serialize)]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub region: &'static str,
    pub tts_code: &'static str,
}

/// All supported target languages, sorted by display name.
pub fn supported_languages() -> Vec<LanguageInfo> {
    let mut langs: Vec<LanguageInfo> = TargetLanguage::ALL
        .iter()
        .map(|l| LanguageInfo {
            code: l.code(),
            name: l.display_name(),
            region: l.region(),
            tts_code: l.tts_code(),
        })
        .collect();
    langs.sort_by(|a, b| a.name.cmp(b.name));
    langs
}

fn supported_codes() -> Vec<&'static str> {
    TargetLanguage::ALL.iter().map(|l| l.code()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_accented_and_ascii_codes() {
        assert_eq!("bété".parse::<TargetLanguage>().unwrap(), TargetLanguage::Bete);
        assert_eq!("bete".parse::<TargetLanguage>().unwrap(), TargetLanguage::Bete);
        assert_eq!("BAOULÉ".parse::<TargetLanguage>().unwrap(), TargetLanguage::Baoule);
        assert_eq!(" mooré ".parse::<TargetLanguage>().unwrap(), TargetLanguage::Moore);
    }

    #[test]
    fn rejects_unknown_code() {
        let err = "klingon".parse::<TargetLanguage>().unwrap_err();
        assert!(matches!(err, TranslateError::Validation(_)));
    }

    #[test]
    fn listing_is_sorted_and_complete() {
        let langs = supported_languages();
        assert_eq!(langs.len(), 4);
        let names: Vec<_> = langs.iter().map(|l| l.name).collect();
        assert_eq!(names, vec!["Agni", "Baoulé", "Bété", "Mooré"]);
        assert!(langs.iter().all(|l| l.tts_code == "fr"));
    }
}
