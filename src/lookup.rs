// src/lookup.rs
//
// Dynamic template / fixed phrase ("frase") retrieval. The engine never
// executes anything from here; it hands ranked candidates to the host, which
// applies the one the radiologist picks.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::distance::match_score;
use crate::error::LookupError;
use crate::intent::{DetectedIntent, IntentType};
use crate::normalizer::{normalize, normalized_words};
use crate::usage::UsageRecord;

/// Worst title distance accepted by the fuzzy fallback
const FUZZY_TITLE_THRESHOLD: f32 = 0.4;

/// Subtracted from the score of a favorite
const FAVORITE_BOOST: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Template,
    Frase,
}

/// Alternative technique text for a template, e.g. with or without contrast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechniqueVariant {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupCandidate {
    pub id: String,
    pub kind: CandidateKind,
    pub title: String,
    /// Fully resolved text, ready to insert
    pub content: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub modality: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub variants: Vec<TechniqueVariant>,
    /// Lower is better
    #[serde(default)]
    pub score: f32,
}

impl LookupCandidate {
    pub fn new(id: impl Into<String>, kind: CandidateKind, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            content: content.into(),
            category: None,
            tags: Vec::new(),
            modality: None,
            region: None,
            variants: Vec::new(),
            score: 0.0,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_modality(mut self, modality: impl Into<String>) -> Self {
        self.modality = Some(modality.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_variant(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.variants.push(TechniqueVariant {
            name: name.into(),
            content: content.into(),
        });
        self
    }

    /// Content for the named variant (case and accent insensitive), or the
    /// default content when the variant is absent or unknown
    pub fn content_for(&self, variant: Option<&str>) -> &str {
        variant
            .and_then(|wanted| {
                let wanted = normalize(wanted);
                self.variants.iter().find(|v| normalize(&v.name) == wanted)
            })
            .map_or(self.content.as_str(), |v| v.content.as_str())
    }
}

/// Filters and ranking hints for one search
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    pub modality: Option<String>,
    pub region: Option<String>,
    pub favorite_ids: HashSet<String>,
    pub usage: Vec<UsageRecord>,
}

#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search_templates(&self, query: &str, ctx: &SearchContext) -> Result<Vec<LookupCandidate>, LookupError>;
    async fn search_frases(&self, query: &str, ctx: &SearchContext) -> Result<Vec<LookupCandidate>, LookupError>;
}

pub struct DynamicLookupBridge {
    search: Arc<dyn CatalogSearch>,
    max_results: usize,
}

impl DynamicLookupBridge {
    pub fn new(search: Arc<dyn CatalogSearch>, max_results: usize) -> Self {
        Self { search, max_results }
    }

    /// Ranked candidates for a template or frase intent; empty for anything else
    pub async fn lookup(&self, intent: &DetectedIntent, ctx: &SearchContext) -> Result<Vec<LookupCandidate>, LookupError> {
        let mut candidates = match intent.intent_type {
            IntentType::Template => self.search.search_templates(&intent.query, ctx).await?,
            IntentType::Frase => self.search.search_frases(&intent.query, ctx).await?,
            IntentType::System | IntentType::Text => return Ok(Vec::new()),
        };

        candidates.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(Ordering::Equal));
        candidates.truncate(self.max_results);

        log::debug!(
            "[LookupBridge] {:?} '{}' -> {} candidates",
            intent.intent_type,
            intent.query,
            candidates.len()
        );
        Ok(candidates)
    }
}

/// In-memory `CatalogSearch` over a fixed candidate list
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    entries: Vec<LookupCandidate>,
}

impl InMemoryCatalog {
    pub fn new(entries: Vec<LookupCandidate>) -> Self {
        Self { entries }
    }

    pub fn add(&mut self, entry: LookupCandidate) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Synchronous search shared by both trait methods
    pub fn search(&self, kind: CandidateKind, query: &str, ctx: &SearchContext) -> Vec<LookupCandidate> {
        let pool: Vec<&LookupCandidate> = self
            .entries
            .iter()
            .filter(|e| e.kind == kind)
            .filter(|e| tag_matches(&ctx.modality, &e.modality))
            .filter(|e| tag_matches(&ctx.region, &e.region))
            .collect();

        let query_norm = normalize(query);
        let query_words = normalized_words(query);

        let mut hits: Vec<(f32, &LookupCandidate)> = if query_words.is_empty() {
            pool.iter().map(|e| (0.5, *e)).collect()
        } else {
            pool.iter()
                .filter_map(|e| substring_score(e, &query_norm, &query_words).map(|s| (s, *e)))
                .collect()
        };

        if hits.is_empty() && !query_words.is_empty() {
            hits = pool
                .iter()
                .map(|e| (match_score(&query_norm, &normalize(&e.title)), *e))
                .filter(|(score, _)| *score <= FUZZY_TITLE_THRESHOLD)
                .collect();
        }

        let usage: HashMap<&str, &UsageRecord> = ctx.usage.iter().map(|u| (u.id.as_str(), u)).collect();
        let now = Utc::now();

        let mut ranked: Vec<LookupCandidate> = hits
            .into_iter()
            .map(|(base, entry)| {
                let mut boost = usage.get(entry.id.as_str()).map_or(0.0, |u| u.boost_at(now));
                if ctx.favorite_ids.contains(&entry.id) {
                    boost += FAVORITE_BOOST;
                }
                let mut candidate = entry.clone();
                candidate.score = (base - boost).max(0.0);
                candidate
            })
            .collect();

        ranked.sort_by(|a, b| {
            a.score
                .partial_cmp(&b.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.title.cmp(&b.title))
        });
        ranked
    }
}

#[async_trait]
impl CatalogSearch for InMemoryCatalog {
    async fn search_templates(&self, query: &str, ctx: &SearchContext) -> Result<Vec<LookupCandidate>, LookupError> {
        Ok(self.search(CandidateKind::Template, query, ctx))
    }

    async fn search_frases(&self, query: &str, ctx: &SearchContext) -> Result<Vec<LookupCandidate>, LookupError> {
        Ok(self.search(CandidateKind::Frase, query, ctx))
    }
}

/// A filter passes when unset, when the entry is untagged, or on a normalized match
fn tag_matches(filter: &Option<String>, value: &Option<String>) -> bool {
    match (filter, value) {
        (Some(wanted), Some(actual)) => normalize(wanted) == normalize(actual),
        _ => true,
    }
}

/// Base score for substring hits: title beats tags and category beats body
fn substring_score(entry: &LookupCandidate, query: &str, words: &[String]) -> Option<f32> {
    let title = normalize(&entry.title);
    if title.contains(query) {
        return Some(if title == query { 0.0 } else { 0.05 });
    }
    if words.iter().all(|w| title.contains(w.as_str())) {
        return Some(0.1);
    }

    let tags: Vec<String> = entry.tags.iter().chain(entry.category.iter()).map(|t| normalize(t)).collect();
    let in_tags_or_title = |w: &String| title.contains(w.as_str()) || tags.iter().any(|t| t.contains(w.as_str()));
    if words.iter().all(in_tags_or_title) {
        return Some(0.2);
    }

    let body = normalize(&entry.content);
    if words.iter().all(|w| in_tags_or_title(w) || body.contains(w.as_str())) {
        return Some(0.3);
    }
    None
}
