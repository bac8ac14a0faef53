// src/phonetic.rs
//
// Known speech-to-text mis-transcriptions of radiology vocabulary.
// Covers RADS classification names, anatomic terms and the spoken command
// words themselves. Keys and values are in normalized form (lowercase, no
// diacritics) because correction runs after `normalizer::normalize`.

use std::collections::HashMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Built-in correction table: (heard, meant)
const BUILTIN_CORRECTIONS: &[(&str, &str)] = &[
    // RADS family
    ("bi rads", "birads"),
    ("bi-rads", "birads"),
    ("bairads", "birads"),
    ("bay rads", "birads"),
    ("birradis", "birads"),
    ("ti rads", "tirads"),
    ("ti-rads", "tirads"),
    ("tirradis", "tirads"),
    ("chi rads", "tirads"),
    ("pi rads", "pirads"),
    ("pi-rads", "pirads"),
    ("pirradis", "pirads"),
    ("li rads", "lirads"),
    ("li-rads", "lirads"),
    ("o rads", "orads"),
    ("o-rads", "orads"),
    ("lung rads", "lungrads"),
    ("lung-rads", "lungrads"),
    // Anatomy
    ("tiroide", "tireoide"),
    ("tiroides", "tireoide"),
    ("tireoides", "tireoide"),
    ("vesicola", "vesicula"),
    ("pancrias", "pancreas"),
    ("figadu", "figado"),
    ("baso", "baco"),
    ("rim direitu", "rim direito"),
    ("rim esquerdu", "rim esquerdo"),
    ("prostrata", "prostata"),
    ("uteru", "utero"),
    ("ovareo", "ovario"),
    // Findings
    ("nodolo", "nodulo"),
    ("nodulu", "nodulo"),
    ("hipoecoiko", "hipoecoico"),
    ("hipoecogeniko", "hipoecogenico"),
    ("calcificassao", "calcificacao"),
    ("calcificassoes", "calcificacoes"),
    // Modalities
    ("tomografia computadorisada", "tomografia computadorizada"),
    ("resonancia", "ressonancia"),
    ("ressonansia", "ressonancia"),
    ("ultra som", "ultrassom"),
    ("ultra-som", "ultrassom"),
    ("ultrasom", "ultrassom"),
    // Command words
    ("virgola", "virgula"),
    ("birgula", "virgula"),
    ("ponto finau", "ponto final"),
    ("ponto e virgola", "ponto e virgula"),
    ("dois pontu", "dois pontos"),
    ("paragrafu", "paragrafo"),
    ("novo paragrafu", "novo paragrafo"),
    ("nova linia", "nova linha"),
    ("proxima linia", "proxima linha"),
    ("apaga linha", "apagar linha"),
    ("apaga palavra", "apagar palavra"),
    ("desfaser", "desfazer"),
    ("refaser", "refazer"),
    ("negritu", "negrito"),
    ("italicu", "italico"),
    ("sublinhadu", "sublinhado"),
    ("conclusau", "conclusao"),
    ("impresao", "impressao"),
];

/// Whole-word, case-insensitive replacement table.
///
/// All keys are compiled into one alternation ordered longest first, so a
/// multi-word key such as "novo paragrafu" wins over its single-word part.
pub struct PhoneticCorrector {
    replacements: HashMap<String, String>,
    pattern: Option<Regex>,
}

static DEFAULT_CORRECTOR: Lazy<PhoneticCorrector> = Lazy::new(PhoneticCorrector::new);

impl PhoneticCorrector {
    /// Corrector with the built-in table only
    pub fn new() -> Self {
        Self::with_extra_rules(&HashMap::new())
    }

    /// Built-in table merged with user rules (user rules win on conflicts)
    pub fn with_extra_rules(extra: &HashMap<String, String>) -> Self {
        let mut replacements: HashMap<String, String> = BUILTIN_CORRECTIONS
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();

        for (from, to) in extra {
            let key = from.trim().to_lowercase();
            if !key.is_empty() {
                replacements.insert(key, to.trim().to_string());
            }
        }
        replacements.retain(|from, to| *from != *to);

        let pattern = Self::compile(&replacements);
        Self { replacements, pattern }
    }

    fn compile(replacements: &HashMap<String, String>) -> Option<Regex> {
        if replacements.is_empty() {
            return None;
        }

        let mut keys: Vec<&String> = replacements.keys().collect();
        // Longest first, then alphabetical so the pattern is stable
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let alternation = keys
            .iter()
            .map(|k| regex::escape(k))
            .collect::<Vec<_>>()
            .join("|");

        match Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)) {
            Ok(re) => Some(re),
            Err(e) => {
                log::error!("[PhoneticCorrector] Failed to compile correction pattern: {}", e);
                None
            }
        }
    }

    /// Apply every matching rule. Returns the input unchanged when nothing matches.
    pub fn correct(&self, text: &str) -> String {
        let Some(pattern) = &self.pattern else {
            return text.to_string();
        };

        pattern
            .replace_all(text, |caps: &Captures| {
                let matched = &caps[0];
                self.replacements
                    .get(&matched.to_lowercase())
                    .cloned()
                    .unwrap_or_else(|| matched.to_string())
            })
            .into_owned()
    }

    pub fn rule_count(&self) -> usize {
        self.replacements.len()
    }
}

impl Default for PhoneticCorrector {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply the built-in correction table
pub fn apply_phonetic_corrections(text: &str) -> String {
    DEFAULT_CORRECTOR.correct(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_corrections() {
        assert_eq!(apply_phonetic_corrections("bi rads 3"), "birads 3");
        assert_eq!(apply_phonetic_corrections("classificacao ti-rads"), "classificacao tirads");
        assert_eq!(apply_phonetic_corrections("virgola"), "virgula");
        assert_eq!(apply_phonetic_corrections("nova linia"), "nova linha");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(apply_phonetic_corrections("BI RADS"), "birads");
        assert_eq!(apply_phonetic_corrections("Virgola"), "virgula");
    }

    #[test]
    fn test_word_boundaries_only() {
        // "tiroide" must not be rewritten inside a longer word
        assert_eq!(apply_phonetic_corrections("tiroideano"), "tiroideano");
        assert_eq!(apply_phonetic_corrections("paratiroide"), "paratiroide");
        // but is rewritten as a whole word
        assert_eq!(apply_phonetic_corrections("lobo da tiroide"), "lobo da tireoide");
    }

    #[test]
    fn test_longest_match_first() {
        assert_eq!(apply_phonetic_corrections("novo paragrafu"), "novo paragrafo");
        assert_eq!(apply_phonetic_corrections("ponto finau"), "ponto final");
    }

    #[test]
    fn test_no_match_returns_input() {
        assert_eq!(apply_phonetic_corrections("figado normal"), "figado normal");
        assert_eq!(apply_phonetic_corrections(""), "");
    }

    #[test]
    fn test_extra_rules() {
        let mut extra = HashMap::new();
        extra.insert("Hepatomegalhia".to_string(), "hepatomegalia".to_string());
        let corrector = PhoneticCorrector::with_extra_rules(&extra);
        assert_eq!(corrector.correct("discreta hepatomegalhia"), "discreta hepatomegalia");
        // built-ins still apply
        assert_eq!(corrector.correct("virgola"), "virgula");
        assert!(corrector.rule_count() > PhoneticCorrector::new().rule_count());
    }

    #[test]
    fn test_identity_rules_are_dropped() {
        let mut extra = HashMap::new();
        extra.insert("figado".to_string(), "figado".to_string());
        let corrector = PhoneticCorrector::with_extra_rules(&extra);
        assert_eq!(corrector.rule_count(), PhoneticCorrector::new().rule_count());
        assert_eq!(corrector.correct("figado"), "figado");
    }
}
