// src/normalizer.rs
//
// Deterministic transcript cleanup shared by the intent detector, the command
// matcher and the safety guard. Everything here is pure and infallible.

/// Lower-case, strip diacritics, collapse whitespace and trim.
///
/// Diacritic stripping maps every accented Latin letter to exactly one base
/// letter, so the normalized form has the same number of characters per word
/// as the original.
pub fn normalize(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = !result.is_empty();
            continue;
        }
        if pending_space {
            result.push(' ');
            pending_space = false;
        }
        for lower in ch.to_lowercase() {
            result.push(strip_diacritic(lower));
        }
    }

    result
}

/// Normalize each whitespace-separated word independently.
pub fn normalized_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(normalize).collect()
}

/// Map an accented lowercase letter to its base letter
pub fn strip_diacritic(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'ī' | 'į' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => 'u',
        'ç' | 'ć' | 'č' => 'c',
        'ñ' | 'ń' | 'ň' => 'n',
        'ý' | 'ÿ' => 'y',
        'š' | 'ś' | 'ș' => 's',
        'ž' | 'ź' | 'ż' => 'z',
        'ř' => 'r',
        'ď' => 'd',
        'ť' | 'ț' => 't',
        'ľ' | 'ł' => 'l',
        'ğ' => 'g',
        // Default: keep as is
        other => other,
    }
}

/// Number of whitespace-separated words in the text
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("Vírgula"), "virgula");
        assert_eq!(normalize("  TC   de  Tórax \n"), "tc de torax");
        assert_eq!(normalize("Conclusão"), "conclusao");
        assert_eq!(normalize("ÓRGÃOS ABDOMINAIS"), "orgaos abdominais");
    }

    #[test]
    fn test_normalize_empty_and_whitespace() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t\n "), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize("  Impressão:  Nódulo  hipoecóico ");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn test_normalize_keeps_char_count_per_word() {
        for word in ["ção", "hipoecóico", "pâncreas", "útero"] {
            assert_eq!(normalize(word).chars().count(), word.chars().count());
        }
    }

    #[test]
    fn test_normalized_words() {
        assert_eq!(normalized_words("Aplicar  Modelo TC"), vec!["aplicar", "modelo", "tc"]);
        assert!(normalized_words("  ").is_empty());
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("lobo direito"), 2);
        assert_eq!(word_count("   "), 0);
    }
}
