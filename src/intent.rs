// src/intent.rs
//
// Prefix classifier deciding whether an utterance asks for a template, a
// fixed phrase ("frase") or is plain text for the command matcher.

use serde::{Deserialize, Serialize};

use crate::config::IntentSettings;
use crate::normalizer::normalize;

/// Most specific first: a multi-word prefix must come before any single word
/// it contains.
const TEMPLATE_PREFIXES: &[&str] = &[
    "aplicar modelo",
    "usar modelo",
    "carregar modelo",
    "inserir modelo",
    "abrir modelo",
    "aplicar template",
    "usar template",
    "inserir template",
    "template",
    "modelo",
];

const FRASE_PREFIXES: &[&str] = &[
    "inserir frase",
    "aplicar frase",
    "usar frase",
    "adicionar frase",
    "frase",
];

/// Minimum characters left after a prefix for it to count as a query
const MIN_QUERY_CHARS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Template,
    Frase,
    /// Assigned by the engine once a text utterance resolves to a command
    System,
    Text,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedIntent {
    pub intent_type: IntentType,
    pub query: String,
    pub confidence: f32,
    pub matched_prefix: Option<String>,
    pub original_text: String,
}

struct PrefixRule {
    intent_type: IntentType,
    /// Normalized prefix words
    words: Vec<String>,
}

pub struct IntentDetector {
    rules: Vec<PrefixRule>,
    prefixed_confidence: f32,
    bare_prefix_confidence: f32,
    text_confidence: f32,
}

impl IntentDetector {
    pub fn new() -> Self {
        Self::from_settings(&IntentSettings::default())
    }

    pub fn from_settings(settings: &IntentSettings) -> Self {
        let mut rules = Vec::new();

        let templates = settings
            .extra_template_prefixes
            .iter()
            .map(String::as_str)
            .chain(TEMPLATE_PREFIXES.iter().copied());
        for prefix in templates {
            push_rule(&mut rules, IntentType::Template, prefix);
        }

        let frases = settings
            .extra_frase_prefixes
            .iter()
            .map(String::as_str)
            .chain(FRASE_PREFIXES.iter().copied());
        for prefix in frases {
            push_rule(&mut rules, IntentType::Frase, prefix);
        }

        Self {
            rules,
            prefixed_confidence: settings.prefixed_confidence,
            bare_prefix_confidence: settings.bare_prefix_confidence,
            text_confidence: settings.text_confidence,
        }
    }

    pub fn detect_intent(&self, transcript: &str) -> DetectedIntent {
        let original_words: Vec<&str> = transcript.split_whitespace().collect();
        let normalized: Vec<String> = original_words.iter().map(|w| normalize(w)).collect();

        for rule in &self.rules {
            let prefix_len = rule.words.len();
            if normalized.len() < prefix_len || normalized[..prefix_len] != rule.words[..] {
                continue;
            }

            let prefix = rule.words.join(" ");
            if normalized.len() == prefix_len {
                log::debug!("[IntentDetector] Bare prefix '{}'", prefix);
                return DetectedIntent {
                    intent_type: rule.intent_type,
                    query: String::new(),
                    confidence: self.bare_prefix_confidence,
                    matched_prefix: Some(prefix),
                    original_text: transcript.to_string(),
                };
            }

            // Remainder of the original text, internal spacing kept
            let residual = word_starts(transcript)
                .get(prefix_len)
                .map_or("", |&start| transcript[start..].trim())
                .to_string();
            if residual.chars().count() >= MIN_QUERY_CHARS {
                log::debug!(
                    "[IntentDetector] {:?} intent via '{}', query '{}'",
                    rule.intent_type,
                    prefix,
                    residual
                );
                return DetectedIntent {
                    intent_type: rule.intent_type,
                    query: residual,
                    confidence: self.prefixed_confidence,
                    matched_prefix: Some(prefix),
                    original_text: transcript.to_string(),
                };
            }
        }

        DetectedIntent {
            intent_type: IntentType::Text,
            query: transcript.to_string(),
            confidence: self.text_confidence,
            matched_prefix: None,
            original_text: transcript.to_string(),
        }
    }
}

impl Default for IntentDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte offset of every whitespace-separated word
fn word_starts(text: &str) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut in_word = false;
    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            starts.push(i);
            in_word = true;
        }
    }
    starts
}

fn push_rule(rules: &mut Vec<PrefixRule>, intent_type: IntentType, prefix: &str) {
    let words: Vec<String> = prefix.split_whitespace().map(normalize).collect();
    if words.is_empty() {
        return;
    }
    if rules.iter().any(|r| r.intent_type == intent_type && r.words == words) {
        return;
    }
    rules.push(PrefixRule { intent_type, words });
}
