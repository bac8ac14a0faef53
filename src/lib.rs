// src/lib.rs
//
// Voice command engine for radiology report dictation (Brazilian Portuguese).

pub mod catalog;
pub mod command;
pub mod config;
pub mod distance;
pub mod document;
pub mod engine;
pub mod error;
pub mod executor;
pub mod intent;
pub mod lookup;
pub mod matcher;
pub mod normalizer;
pub mod phonetic;
pub mod protected_words;
pub mod safety;
pub mod usage;

pub use catalog::{help_listing, BuiltinCatalog, CatalogFile, CommandSource};
pub use command::{
    CommandAction, CommandCategory, CommandExecutionResult, CommandMatchResult, VoiceCommand,
};
pub use config::EngineSettings;
pub use document::{DocumentEditor, MemoryDocument, Selection};
pub use engine::{EngineCallbacks, EngineState, UtteranceOutcome, VoiceCommandEngine};
pub use error::{CatalogError, ConfigError, EditError, EngineError, LookupError, UsageError};
pub use intent::{DetectedIntent, IntentDetector, IntentType};
pub use lookup::{
    CandidateKind, CatalogSearch, DynamicLookupBridge, InMemoryCatalog, LookupCandidate,
    SearchContext, TechniqueVariant,
};
pub use matcher::FuzzyCommandMatcher;
pub use normalizer::normalize;
pub use phonetic::{apply_phonetic_corrections, PhoneticCorrector};
pub use safety::{RecommendedAction, SafetyGuard, SafetyVerdict};
pub use usage::{UsageRecord, UsageTracker};
