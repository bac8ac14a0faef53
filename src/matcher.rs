// src/matcher.rs
//
// Command matcher: an exact lookup table over every name and phrase, backed
// by a weighted fuzzy index for noisy transcripts.
// Both are rebuilt together off to the side and swapped in as one
// `Arc<MatcherIndex>`, so a reader never sees a half-built index.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use parking_lot::RwLock;

use crate::command::{CommandMatchResult, VoiceCommand};
use crate::config::MatcherSettings;
use crate::distance::match_score;
use crate::normalizer::normalize;
use crate::phonetic::PhoneticCorrector;

/// Which part of a command an index entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexField {
    Name,
    Phrase,
    Modality,
    Category,
}

impl IndexField {
    fn weight(self) -> f32 {
        match self {
            IndexField::Name => 1.0,
            IndexField::Phrase => 0.9,
            IndexField::Modality => 0.6,
            IndexField::Category => 0.3,
        }
    }

    /// Added to the raw distance score. A lower weight means a hit on this
    /// field is worth less.
    fn penalty(self) -> f32 {
        (1.0 - self.weight()) * 0.5
    }
}

#[derive(Debug, Clone)]
struct IndexEntry {
    command_idx: usize,
    field: IndexField,
    /// Normalized and phonetically corrected text
    key: String,
    /// Text as written in the catalog
    display: String,
}

/// Immutable snapshot of everything the matcher needs for one catalog
#[derive(Debug, Default)]
pub struct MatcherIndex {
    commands: Vec<VoiceCommand>,
    exact: HashMap<String, (usize, String)>,
    entries: Vec<IndexEntry>,
}

impl MatcherIndex {
    fn build(commands: &[VoiceCommand], corrector: &PhoneticCorrector, min_len: usize) -> Self {
        let mut exact: HashMap<String, (usize, String)> = HashMap::new();
        let mut entries = Vec::new();

        for (idx, command) in commands.iter().enumerate() {
            let mut fields: Vec<(IndexField, &str)> = vec![(IndexField::Name, command.name.as_str())];
            fields.extend(command.phrases.iter().map(|p| (IndexField::Phrase, p.as_str())));

            for (field, text) in &fields {
                let key = corrector.correct(&normalize(text));
                if key.is_empty() {
                    continue;
                }
                // First registration wins
                exact.entry(key.clone()).or_insert_with(|| (idx, text.to_string()));
                if key.chars().count() >= min_len {
                    entries.push(IndexEntry {
                        command_idx: idx,
                        field: *field,
                        key,
                        display: text.to_string(),
                    });
                }
            }

            if let Some(modality) = &command.modality {
                let key = corrector.correct(&normalize(modality));
                if key.chars().count() >= min_len {
                    entries.push(IndexEntry {
                        command_idx: idx,
                        field: IndexField::Modality,
                        key,
                        display: modality.clone(),
                    });
                }
            }

            let label = command.category.label();
            entries.push(IndexEntry {
                command_idx: idx,
                field: IndexField::Category,
                key: normalize(label),
                display: label.to_string(),
            });
        }

        Self {
            commands: commands.to_vec(),
            exact,
            entries,
        }
    }

    /// Best score per command, best first, ties in catalog order
    fn rank(&self, query: &str, threshold: f32) -> Vec<CommandMatchResult> {
        let mut best: HashMap<usize, (f32, &IndexEntry)> = HashMap::new();

        for entry in &self.entries {
            let score = (match_score(query, &entry.key) + entry.field.penalty()).min(1.0);
            if score > threshold {
                continue;
            }
            match best.get(&entry.command_idx) {
                Some((current, _)) if *current <= score => {}
                _ => {
                    best.insert(entry.command_idx, (score, entry));
                }
            }
        }

        let mut ranked: Vec<(usize, f32, &IndexEntry)> =
            best.into_iter().map(|(idx, (score, entry))| (idx, score, entry)).collect();
        ranked.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        ranked
            .into_iter()
            .map(|(idx, score, entry)| CommandMatchResult {
                command: self.commands[idx].clone(),
                score,
                matched_phrase: entry.display.clone(),
                exact: false,
            })
            .collect()
    }

    fn exact_match(&self, query: &str) -> Option<CommandMatchResult> {
        self.exact.get(query).map(|(idx, phrase)| CommandMatchResult {
            command: self.commands[*idx].clone(),
            score: 0.0,
            matched_phrase: phrase.clone(),
            exact: true,
        })
    }
}

pub struct FuzzyCommandMatcher {
    index: RwLock<Arc<MatcherIndex>>,
    corrector: PhoneticCorrector,
    match_threshold: f32,
    min_match_length: usize,
}

impl FuzzyCommandMatcher {
    pub fn new(settings: &MatcherSettings, corrector: PhoneticCorrector) -> Self {
        Self {
            index: RwLock::new(Arc::new(MatcherIndex::default())),
            corrector,
            match_threshold: settings.match_threshold,
            min_match_length: settings.min_match_length.max(1),
        }
    }

    /// Rebuild both tables for a new catalog and swap them in
    pub fn update_commands(&self, commands: &[VoiceCommand]) {
        let start = Instant::now();
        let index = MatcherIndex::build(commands, &self.corrector, self.min_match_length);
        log::debug!(
            "[CommandMatcher] Indexed {} commands ({} exact keys, {} fuzzy entries) in {:?}",
            index.commands.len(),
            index.exact.len(),
            index.entries.len(),
            start.elapsed()
        );
        *self.index.write() = Arc::new(index);
    }

    fn snapshot(&self) -> Arc<MatcherIndex> {
        self.index.read().clone()
    }

    fn prepare(&self, transcript: &str) -> String {
        self.corrector.correct(&normalize(transcript))
    }

    pub fn find_best_match(&self, transcript: &str) -> Option<CommandMatchResult> {
        let query = self.prepare(transcript);
        if query.is_empty() {
            return None;
        }

        let index = self.snapshot();
        if let Some(hit) = index.exact_match(&query) {
            log::debug!("[CommandMatcher] Exact match '{}' -> {}", query, hit.command.id);
            return Some(hit);
        }

        if query.chars().count() < self.min_match_length {
            return None;
        }

        let best = index.rank(&query, self.match_threshold).into_iter().next();
        if let Some(m) = &best {
            log::debug!(
                "[CommandMatcher] Fuzzy match '{}' -> {} via '{}' (score {:.3})",
                query,
                m.command.id,
                m.matched_phrase,
                m.score
            );
        }
        best
    }

    /// Ranked candidates, best first. An exact hit, if any, leads the list.
    pub fn search(&self, transcript: &str, limit: usize) -> Vec<CommandMatchResult> {
        let query = self.prepare(transcript);
        if query.is_empty() || limit == 0 {
            return Vec::new();
        }

        let index = self.snapshot();
        let mut results = Vec::new();
        let exact = index.exact_match(&query);
        let exact_id = exact.as_ref().map(|m| m.command.id.clone());
        results.extend(exact);

        if query.chars().count() >= self.min_match_length {
            results.extend(
                index
                    .rank(&query, self.match_threshold)
                    .into_iter()
                    .filter(|m| Some(&m.command.id) != exact_id.as_ref()),
            );
        }

        results.truncate(limit);
        results
    }

    pub fn exact_key_count(&self) -> usize {
        self.index.read().exact.len()
    }

    pub fn command_count(&self) -> usize {
        self.index.read().commands.len()
    }
}
