// src/distance.rs
//
// Phonetically weighted edit distance used by the command matcher and the
// in-memory template/phrase search.
// Substitutions between sounds that Brazilian Portuguese speech recognition
// commonly confuses cost half of a regular edit.

/// Cost of substituting two phonetically or visually similar characters
const SIMILAR_SUBSTITUTION_COST: f32 = 0.5;

/// Keys or windows shorter than this tolerate at most one similar-character
/// substitution. A single real edit on a five-letter word already turns
/// "ponto" into "pronto".
const SHORT_TEXT_CHARS: usize = 6;

/// Largest edit cost a short text may carry and still match
const SHORT_TEXT_MAX_COST: f32 = SIMILAR_SUBSTITUTION_COST;

/// Weight of the uncovered share of the longer text when a phrase is found
/// inside a longer utterance (or an utterance inside a longer phrase)
const COVERAGE_WEIGHT: f32 = 0.75;

/// Check if two characters are commonly confused in transcribed Portuguese
pub fn are_similar_chars(c1: char, c2: char) -> bool {
    let pair = if c1 <= c2 { (c1, c2) } else { (c2, c1) };
    matches!(
        pair,
        // Sibilants: "s", "z", "c" before e/i, "ç" (already stripped to "c"), "x"
        ('s', 'z') | ('c', 's') | ('s', 'x') | ('x', 'z') | ('c', 'x')
        // Velar stops
        | ('c', 'k') | ('k', 'q') | ('c', 'q') | ('g', 'k')
        // Voicing pairs
        | ('b', 'p') | ('d', 't') | ('f', 'v') | ('b', 'v')
        // "g" before e/i sounds like "j"
        | ('g', 'j')
        // Nasals and liquids; final "l" is pronounced like "u"
        | ('m', 'n') | ('l', 'r') | ('l', 'u')
        // Unstressed vowel reduction (final "o" -> "u", "e" -> "i")
        | ('e', 'i') | ('o', 'u') | ('i', 'y')
        // Visual similarity from OCR-like transcription noise
        | ('0', 'o') | ('1', 'l') | ('1', 'i')
    )
}

fn substitution_cost(a: char, b: char) -> f32 {
    if a == b {
        0.0
    } else if are_similar_chars(a, b) {
        SIMILAR_SUBSTITUTION_COST
    } else {
        1.0
    }
}

/// Calculate weighted Levenshtein distance with phonetic costs
pub fn weighted_levenshtein(s1: &str, s2: &str) -> f32 {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();

    // Two rolling rows instead of the full matrix
    let mut prev: Vec<f32> = (0..=b.len()).map(|j| j as f32).collect();
    let mut curr = vec![0.0_f32; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = (i + 1) as f32;
        for (j, &cb) in b.iter().enumerate() {
            let deletion = prev[j + 1] + 1.0;
            let insertion = curr[j] + 1.0;
            let substitution = prev[j] + substitution_cost(ca, cb);
            curr[j + 1] = deletion.min(insertion).min(substitution);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Length-normalized distance, or `None` when a short text needs more
/// than one similar-character substitution
fn normalized_distance(a: &str, b: &str) -> Option<f32> {
    let a_len = a.chars().count();
    let b_len = b.chars().count();
    let cost = weighted_levenshtein(a, b);
    if a_len.min(b_len) < SHORT_TEXT_CHARS && cost > SHORT_TEXT_MAX_COST {
        return None;
    }
    Some((cost / a_len.max(b_len) as f32).min(1.0))
}

/// Best score of `shorter` aligned against a run of whole words of `longer`.
///
/// The run has as many words as `shorter`, so alignment never starts or ends
/// inside a word. The uncovered share of `longer` is added as a penalty.
/// `None` when `longer` has no more words than `shorter` or no run matches.
pub fn window_score(shorter: &str, longer: &str) -> Option<f32> {
    let short_words = shorter.split(' ').count();
    let long_words: Vec<&str> = longer.split(' ').collect();
    if short_words >= long_words.len() {
        return None;
    }

    let long_len = longer.chars().count() as f32;
    long_words
        .windows(short_words)
        .filter_map(|run| {
            let window = run.join(" ");
            let distance = normalized_distance(shorter, &window)?;
            let uncovered = 1.0 - window.chars().count() as f32 / long_len;
            Some(distance + uncovered * COVERAGE_WEIGHT)
        })
        .min_by(|a, b| a.total_cmp(b))
}

/// Score a normalized query against a normalized candidate.
///
/// 0.0 means identical and 1.0 means nothing in common. When one side has
/// fewer words, it may also match a run of words inside the other (either
/// direction), paying for the part it leaves uncovered.
pub fn match_score(query: &str, candidate: &str) -> f32 {
    let q_len = query.chars().count();
    let c_len = candidate.chars().count();

    if q_len == 0 && c_len == 0 {
        return 0.0;
    }
    if q_len == 0 || c_len == 0 {
        return 1.0;
    }

    let full = normalized_distance(query, candidate).unwrap_or(1.0);
    let (shorter, longer) = if q_len < c_len { (query, candidate) } else { (candidate, query) };

    match window_score(shorter, longer) {
        Some(partial) => full.min(partial).min(1.0),
        None => full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_levenshtein() {
        assert_eq!(weighted_levenshtein("virgula", "virgula"), 0.0);
        assert_eq!(weighted_levenshtein("", "ponto"), 5.0);
        assert_eq!(weighted_levenshtein("ponto", ""), 5.0);
        // one plain deletion
        assert_eq!(weighted_levenshtein("virgulas", "virgula"), 1.0);
        // similar substitution costs half
        assert_eq!(weighted_levenshtein("birgula", "virgula"), 0.5);
        // unrelated substitution costs a full edit
        assert_eq!(weighted_levenshtein("hirgula", "virgula"), 1.0);
    }

    #[test]
    fn test_similar_chars_symmetric() {
        assert!(are_similar_chars('s', 'z'));
        assert!(are_similar_chars('z', 's'));
        assert!(are_similar_chars('o', 'u'));
        assert!(are_similar_chars('u', 'o'));
        assert!(!are_similar_chars('a', 'k'));
        assert!(!are_similar_chars('a', 'a'));
    }

    #[test]
    fn test_vowel_swaps_are_full_edits() {
        assert!(!are_similar_chars('a', 'e'));
        assert!(!are_similar_chars('e', 'o'));
        assert_eq!(weighted_levenshtein("ponte", "ponto"), 1.0);
    }

    #[test]
    fn test_match_score_full() {
        assert_eq!(match_score("negrito", "negrito"), 0.0);
        let typo = match_score("negritu", "negrito");
        assert!(typo > 0.0 && typo < 0.1, "score was {}", typo);
        assert_eq!(match_score("", ""), 0.0);
        assert_eq!(match_score("", "negrito"), 1.0);
    }

    #[test]
    fn test_short_text_allows_one_similar_substitution() {
        assert!((match_score("pontu", "ponto") - 0.1).abs() < 1e-6);
        // one real insertion turns a short command word into another word
        assert_eq!(match_score("pronto", "ponto"), 1.0);
        assert_eq!(match_score("ponte", "ponto"), 1.0);
        assert_eq!(match_score("porto", "ponto"), 1.0);
    }

    #[test]
    fn test_phrase_inside_utterance() {
        let score = match_score("por favor apagar linha", "apagar linha");
        assert!(score > 0.3 && score < 0.4, "score was {}", score);
        assert_eq!(window_score("apagar linha", "por favor apagar linha"), Some(score));
    }

    #[test]
    fn test_utterance_inside_phrase_pays_for_coverage() {
        let score = match_score("direita", "alinhar a direita");
        assert!(score > 0.4, "score was {}", score);
        let score = match_score("linha", "nova linha");
        assert!(score > 0.3, "score was {}", score);
    }

    #[test]
    fn test_windows_respect_word_boundaries() {
        // "cento" sits inside "por cento" but "segmento" is a different word
        assert!(match_score("segmento", "por cento") > 0.5);
        assert_eq!(window_score("pronto", "ponto final"), None);
        assert_eq!(window_score("apagar linha", "apagar"), None);
    }

    #[test]
    fn test_long_dictation_does_not_match_trailing_command() {
        let score = match_score("o nodulo mede dois centimetros ponto", "ponto");
        assert!(score > 0.6, "score was {}", score);
    }

    #[test]
    fn test_ordering_is_best_first() {
        let close = match_score("apagar linhas", "apagar linha");
        let far = match_score("apagar linhas", "apagar palavra");
        assert!(close < far);
    }
}
