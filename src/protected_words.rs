// src/protected_words.rs
//
// Medical vocabulary that must never trigger a system command when spoken on
// its own. A radiologist dictating "direita" or "nódulo" is writing the
// report, not asking the editor to do something.

use std::collections::HashSet;
use once_cell::sync::Lazy;
use crate::normalizer::{normalize, word_count};

/// Protected words in normalized form (lowercase, no diacritics)
pub static PROTECTED_MEDICAL_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Laterality and position
        "direita", "direito", "esquerda", "esquerdo", "bilateral", "unilateral",
        "medial", "lateral", "anterior", "posterior", "superior", "inferior",
        "proximal", "distal", "central", "periferico", "periferica", "apical", "basal",

        // Anatomy
        "figado", "baco", "pancreas", "vesicula", "biliar", "rim", "rins", "renal",
        "adrenal", "aorta", "bexiga", "prostata", "utero", "ovario", "ovarios",
        "tireoide", "mama", "mamas", "axila", "pulmao", "pulmoes", "coracao",
        "torax", "abdome", "pelve", "cranio", "cerebro", "coluna", "joelho", "ombro",
        "quadril", "lobo", "segmento", "parenquima", "linfonodo", "linfonodos",
        "estomago", "intestino", "colon", "reto", "cisto", "vertebra",

        // Common findings
        "nodulo", "nodulos", "massa", "lesao", "lesoes", "calcificacao",
        "calcificacoes", "derrame", "edema", "espessamento", "estenose",
        "fratura", "hernia", "atelectasia", "consolidacao", "opacidade",
        "hipoecoico", "hiperecoico", "anecoico", "isoecoico", "hipodenso",
        "hiperdenso", "hipointenso", "hiperintenso", "normal", "normais",
        "preservado", "preservada", "aumentado", "aumentada", "reduzido", "reduzida",
        "discreto", "discreta", "moderado", "moderada", "acentuado", "acentuada",

        // Modalities
        "tomografia", "ressonancia", "ultrassom", "ultrassonografia",
        "mamografia", "radiografia", "densitometria", "tc", "rm", "us", "rx", "mg",
    ]
    .into_iter()
    .collect()
});

/// Check whether a single word (any casing/accents) is protected
pub fn is_protected_word(word: &str) -> bool {
    let normalized = normalize(word);
    let trimmed = normalized.trim_matches(|c: char| !c.is_alphanumeric());
    PROTECTED_MEDICAL_WORDS.contains(trimmed)
}

/// True when the utterance has 1 to `max_words` words and every one of them
/// is protected
pub fn is_protected_utterance(text: &str, max_words: usize) -> bool {
    let count = word_count(text);
    if count == 0 || count > max_words {
        return false;
    }
    text.split_whitespace().all(is_protected_word)
}
