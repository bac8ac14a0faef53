// src/engine.rs
//
// Orchestrates one dictation session: intent detection, command matching,
// safety checks, execution against the attached document and template/phrase
// lookup. Owns its catalog, matcher and usage history.

use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::catalog::{help_listing, validate_unique_ids, BuiltinCatalog, CatalogFile, CommandSource};
use crate::command::{
    sort_by_priority, CommandAction, CommandCategory, CommandExecutionResult, CommandMatchResult,
    VoiceCommand,
};
use crate::config::EngineSettings;
use crate::document::DocumentEditor;
use crate::error::{EngineError, LookupError};
use crate::executor::{insert_with_leading_space, CommandExecutor};
use crate::intent::{DetectedIntent, IntentDetector, IntentType};
use crate::lookup::{CandidateKind, CatalogSearch, DynamicLookupBridge, LookupCandidate, SearchContext};
use crate::matcher::FuzzyCommandMatcher;
use crate::phonetic::PhoneticCorrector;
use crate::safety::SafetyGuard;
use crate::usage::UsageTracker;

type MatchCallback = Box<dyn Fn(&CommandMatchResult) + Send + Sync>;
type ExecuteCallback = Box<dyn Fn(&CommandExecutionResult) + Send + Sync>;
type RejectCallback = Box<dyn Fn(&str, Option<&CommandMatchResult>) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&EngineError) + Send + Sync>;
type SearchCallback = Box<dyn Fn(&str, &SearchContext) + Send + Sync>;

/// Host notifications. Every hook is optional.
#[derive(Default)]
pub struct EngineCallbacks {
    on_match: Option<MatchCallback>,
    on_execute: Option<ExecuteCallback>,
    on_reject: Option<RejectCallback>,
    on_error: Option<ErrorCallback>,
    on_search_template: Option<SearchCallback>,
    on_search_frase: Option<SearchCallback>,
}

impl EngineCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_match(mut self, f: impl Fn(&CommandMatchResult) + Send + Sync + 'static) -> Self {
        self.on_match = Some(Box::new(f));
        self
    }

    pub fn on_execute(mut self, f: impl Fn(&CommandExecutionResult) + Send + Sync + 'static) -> Self {
        self.on_execute = Some(Box::new(f));
        self
    }

    /// Called with the transcript and, when there was one, the rejected candidate
    pub fn on_reject(mut self, f: impl Fn(&str, Option<&CommandMatchResult>) + Send + Sync + 'static) -> Self {
        self.on_reject = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&EngineError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_search_template(mut self, f: impl Fn(&str, &SearchContext) + Send + Sync + 'static) -> Self {
        self.on_search_template = Some(Box::new(f));
        self
    }

    pub fn on_search_frase(mut self, f: impl Fn(&str, &SearchContext) + Send + Sync + 'static) -> Self {
        self.on_search_frase = Some(Box::new(f));
        self
    }
}

/// Snapshot of the engine for the host UI
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    pub ready: bool,
    pub active: bool,
    pub total_commands: usize,
    pub last_intent: Option<DetectedIntent>,
    pub last_match: Option<CommandMatchResult>,
    pub last_execution: Option<CommandExecutionResult>,
    pub loaded_at: Option<DateTime<Utc>>,
}

/// What `handle_utterance` did with a transcript
#[derive(Debug, Clone, PartialEq)]
pub enum UtteranceOutcome {
    /// Empty or whitespace-only input
    Ignored,
    /// Template/frase request; nothing was applied yet
    Lookup {
        intent: DetectedIntent,
        candidates: Vec<LookupCandidate>,
    },
    Executed {
        command_match: CommandMatchResult,
        result: CommandExecutionResult,
    },
    /// Inserted as literal text
    Dictated { result: CommandExecutionResult },
}

#[derive(Default)]
struct CatalogState {
    commands: Vec<VoiceCommand>,
    ready: bool,
    loaded_at: Option<DateTime<Utc>>,
}

/// Everything the background reload task needs
struct Shared {
    catalog: RwLock<CatalogState>,
    matcher: FuzzyCommandMatcher,
    source: Box<dyn CommandSource>,
    callbacks: EngineCallbacks,
}

impl Shared {
    fn load(&self) -> Result<usize, EngineError> {
        let mut commands = self.source.load()?;
        validate_unique_ids(&commands)?;
        sort_by_priority(&mut commands);

        let mut catalog = self.catalog.write();
        self.matcher.update_commands(&commands);
        let count = commands.len();
        catalog.commands = commands;
        catalog.ready = true;
        catalog.loaded_at = Some(Utc::now());
        Ok(count)
    }

    /// Load and report. The previous catalog stays in place on failure.
    fn load_and_report(&self) -> bool {
        match self.load() {
            Ok(count) => {
                log::info!("[VoiceEngine] Loaded {} commands", count);
                true
            }
            Err(e) => {
                log::error!("[VoiceEngine] Failed to load commands: {}", e);
                self.report_error(&e);
                false
            }
        }
    }

    fn report_error(&self, error: &EngineError) {
        if let Some(cb) = &self.callbacks.on_error {
            cb(error);
        }
    }
}

pub struct VoiceCommandEngine {
    shared: Arc<Shared>,
    settings: EngineSettings,
    intent_detector: IntentDetector,
    safety: SafetyGuard,
    executor: CommandExecutor,
    lookup: Option<DynamicLookupBridge>,
    editor: Option<Box<dyn DocumentEditor>>,
    usage: UsageTracker,
    search_context: SearchContext,
    active: bool,
    last_intent: Option<DetectedIntent>,
    last_match: Option<CommandMatchResult>,
    last_execution: Option<CommandExecutionResult>,
    reload_task: Option<JoinHandle<()>>,
}

impl VoiceCommandEngine {
    pub fn new(settings: EngineSettings, source: impl CommandSource + 'static, callbacks: EngineCallbacks) -> Self {
        let corrector = PhoneticCorrector::with_extra_rules(&settings.phonetic.extra_rules);
        let shared = Shared {
            catalog: RwLock::new(CatalogState::default()),
            matcher: FuzzyCommandMatcher::new(&settings.matcher, corrector),
            source: Box::new(source),
            callbacks,
        };

        Self {
            shared: Arc::new(shared),
            intent_detector: IntentDetector::from_settings(&settings.intent),
            safety: SafetyGuard::new(&settings.matcher),
            executor: CommandExecutor::new(&settings.formats),
            lookup: None,
            editor: None,
            usage: UsageTracker::new(),
            search_context: SearchContext::default(),
            active: false,
            last_intent: None,
            last_match: None,
            last_execution: None,
            reload_task: None,
            settings,
        }
    }

    /// Engine wired from settings: catalog file when configured, built-in
    /// commands otherwise, plus any saved usage history
    pub fn from_settings(settings: EngineSettings, callbacks: EngineCallbacks) -> Self {
        let mut engine = match settings.catalog.file.clone() {
            Some(path) => Self::new(settings, CatalogFile::new(path), callbacks),
            None => Self::new(settings, BuiltinCatalog, callbacks),
        };

        if let Some(path) = engine.settings.lookup.usage_file.clone() {
            match UsageTracker::load_from_file(&path) {
                Ok(usage) => engine.usage = usage,
                Err(e) => {
                    log::warn!("[VoiceEngine] Ignoring usage history at {}: {}", path.display(), e);
                    engine.shared.report_error(&e.into());
                }
            }
        }
        engine
    }

    pub fn attach_editor(&mut self, editor: Box<dyn DocumentEditor>) {
        self.editor = Some(editor);
    }

    pub fn detach_editor(&mut self) -> Option<Box<dyn DocumentEditor>> {
        self.editor.take()
    }

    pub fn editor(&self) -> Option<&dyn DocumentEditor> {
        self.editor.as_deref()
    }

    pub fn set_catalog_search(&mut self, search: Arc<dyn CatalogSearch>) {
        self.lookup = Some(DynamicLookupBridge::new(search, self.settings.lookup.max_results));
    }

    /// Modality/region filters and favorites for lookups. Usage records are
    /// filled in from the engine's own history.
    pub fn set_search_context(&mut self, ctx: SearchContext) {
        self.search_context = ctx;
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // --- Lifecycle ---

    pub fn start(&mut self) {
        if self.active {
            log::info!("[VoiceEngine] Already active");
            return;
        }
        self.active = true;
        log::info!("[VoiceEngine] Started");

        let Some(secs) = self.settings.catalog.auto_reload_interval_secs.filter(|s| *s > 0) else {
            return;
        };
        if self.reload_task.is_some() {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let shared = Arc::clone(&self.shared);
                self.reload_task = Some(handle.spawn(async move {
                    let mut ticker = tokio::time::interval(Duration::from_secs(secs));
                    // First tick completes immediately
                    ticker.tick().await;
                    loop {
                        ticker.tick().await;
                        log::debug!("[VoiceEngine] Periodic catalog reload");
                        // Catalog sources may read files
                        let loader = Arc::clone(&shared);
                        if let Err(e) = tokio::task::spawn_blocking(move || loader.load_and_report()).await {
                            log::error!("[VoiceEngine] Catalog reload task failed: {}", e);
                        }
                    }
                }));
                log::info!("[VoiceEngine] Auto-reload every {}s", secs);
            }
            Err(_) => {
                log::warn!("[VoiceEngine] No Tokio runtime, auto-reload disabled");
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.reload_task.take() {
            task.abort();
            log::debug!("[VoiceEngine] Auto-reload cancelled");
        }
        if !self.active {
            log::info!("[VoiceEngine] Already stopped");
            return;
        }
        self.active = false;
        log::info!("[VoiceEngine] Stopped");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    // --- Catalog ---

    /// Load the catalog from the command source. On failure the error
    /// callback fires and the previous catalog stays active.
    pub fn load_commands(&mut self) -> bool {
        self.shared.load_and_report()
    }

    pub fn reload_commands(&mut self) -> bool {
        log::info!("[VoiceEngine] Reloading commands");
        self.shared.load_and_report()
    }

    /// Add or replace (same id) a command
    pub fn add_command(&mut self, command: VoiceCommand) {
        let mut catalog = self.shared.catalog.write();
        catalog.commands.retain(|c| c.id != command.id);
        log::debug!("[VoiceEngine] Adding command '{}'", command.id);
        catalog.commands.push(command);
        sort_by_priority(&mut catalog.commands);
        self.shared.matcher.update_commands(&catalog.commands);
    }

    pub fn remove_command(&mut self, id: &str) -> bool {
        let mut catalog = self.shared.catalog.write();
        let before = catalog.commands.len();
        catalog.commands.retain(|c| c.id != id);
        if catalog.commands.len() == before {
            return false;
        }
        self.shared.matcher.update_commands(&catalog.commands);
        log::debug!("[VoiceEngine] Removed command '{}'", id);
        true
    }

    pub fn commands(&self) -> Vec<VoiceCommand> {
        self.shared.catalog.read().commands.clone()
    }

    pub fn help_text(&self) -> String {
        help_listing(&self.shared.catalog.read().commands)
    }

    pub fn state(&self) -> EngineState {
        let catalog = self.shared.catalog.read();
        EngineState {
            ready: catalog.ready,
            active: self.active,
            total_commands: catalog.commands.len(),
            last_intent: self.last_intent.clone(),
            last_match: self.last_match.clone(),
            last_execution: self.last_execution.clone(),
            loaded_at: catalog.loaded_at,
        }
    }

    // --- Processing ---

    /// Match a transcript against the command catalog and run the command
    /// when it is accepted and safe
    pub fn process_transcript(&mut self, transcript: &str) -> Option<CommandMatchResult> {
        if transcript.trim().is_empty() {
            return None;
        }

        let Some(candidate) = self.shared.matcher.find_best_match(transcript) else {
            log::debug!("[VoiceEngine] No command for '{}'", transcript);
            self.last_match = None;
            self.reject(transcript, None);
            return None;
        };

        let acceptance = self.settings.matcher.acceptance_threshold;
        if !candidate.exact && candidate.score > acceptance {
            log::debug!(
                "[VoiceEngine] '{}' -> '{}' rejected, score {:.3} above {:.3}",
                transcript,
                candidate.command.id,
                candidate.score,
                acceptance
            );
            self.last_match = None;
            self.reject(transcript, Some(&candidate));
            return None;
        }

        let verdict = self.safety.validate_system_command(&candidate, transcript);
        if !verdict.safe {
            log::info!(
                "[VoiceEngine] '{}' -> '{}' vetoed: {}",
                transcript,
                candidate.command.id,
                verdict.reason
            );
            self.last_match = None;
            self.reject(transcript, Some(&candidate));
            return None;
        }

        log::info!(
            "[VoiceEngine] '{}' -> '{}' (score {:.3}, exact {})",
            transcript,
            candidate.command.id,
            candidate.score,
            candidate.exact
        );
        self.last_match = Some(candidate.clone());
        if let Some(cb) = &self.shared.callbacks.on_match {
            cb(&candidate);
        }

        self.execute_command(&candidate.command);
        Some(candidate)
    }

    pub fn execute_command(&mut self, command: &VoiceCommand) -> CommandExecutionResult {
        let result = {
            let catalog = self.shared.catalog.read();
            self.executor.execute(command, self.editor.as_deref_mut(), &catalog.commands)
        };
        self.finish_execution(result)
    }

    /// Full pipeline for one finalized transcript
    pub async fn handle_utterance(&mut self, transcript: &str) -> UtteranceOutcome {
        if transcript.trim().is_empty() {
            return UtteranceOutcome::Ignored;
        }

        let intent = self.intent_detector.detect_intent(transcript);
        self.last_intent = Some(intent.clone());

        match intent.intent_type {
            IntentType::Template | IntentType::Frase => {
                let candidates = self.lookup_candidates(&intent).await;
                UtteranceOutcome::Lookup { intent, candidates }
            }
            IntentType::System | IntentType::Text => match self.process_transcript(transcript) {
                Some(command_match) => {
                    if let Some(last) = self.last_intent.as_mut() {
                        last.intent_type = IntentType::System;
                    }
                    let result = self.last_execution.clone().unwrap_or_default();
                    UtteranceOutcome::Executed { command_match, result }
                }
                None => UtteranceOutcome::Dictated {
                    result: self.insert_dictation(transcript),
                },
            },
        }
    }

    async fn lookup_candidates(&self, intent: &DetectedIntent) -> Vec<LookupCandidate> {
        let ctx = self.search_context_with_usage();
        let hook = match intent.intent_type {
            IntentType::Template => &self.shared.callbacks.on_search_template,
            _ => &self.shared.callbacks.on_search_frase,
        };
        if let Some(cb) = hook {
            cb(&intent.query, &ctx);
        }

        let Some(bridge) = &self.lookup else {
            log::warn!("[VoiceEngine] No catalog search configured for '{}'", intent.query);
            self.shared.report_error(&LookupError::NoBackend.into());
            return Vec::new();
        };

        match bridge.lookup(intent, &ctx).await {
            Ok(candidates) => candidates,
            Err(e) => {
                log::error!("[VoiceEngine] Lookup for '{}' failed: {}", intent.query, e);
                self.shared.report_error(&e.into());
                Vec::new()
            }
        }
    }

    fn search_context_with_usage(&self) -> SearchContext {
        let mut ctx = self.search_context.clone();
        ctx.usage = self.usage.records();
        ctx
    }

    /// Apply a lookup candidate picked by the user: templates replace the
    /// document, frases are inserted at the cursor
    pub fn apply_candidate(&mut self, candidate: &LookupCandidate, variant: Option<&str>) -> CommandExecutionResult {
        let content = candidate.content_for(variant).to_string();
        let (category, action) = match candidate.kind {
            CandidateKind::Template => (CommandCategory::Template, CommandAction::ApplyTemplate(content)),
            CandidateKind::Frase => (CommandCategory::Frase, CommandAction::InsertContent(content)),
        };
        let command = VoiceCommand::new(candidate.id.clone(), candidate.title.clone(), category, action);

        let result = self.execute_command(&command);
        if result.success {
            self.usage.record_usage(&candidate.id);
            self.persist_usage();
        }
        result
    }

    fn persist_usage(&self) {
        let Some(path) = &self.settings.lookup.usage_file else {
            return;
        };
        if let Err(e) = self.usage.save_to_file(path) {
            log::error!("[VoiceEngine] Failed to save usage history: {}", e);
            self.shared.report_error(&e.into());
        }
    }

    /// Insert literal dictation with the leading-space rule
    pub fn insert_dictation(&mut self, text: &str) -> CommandExecutionResult {
        let text = text.trim();
        let result = match self.editor.as_deref_mut() {
            None => CommandExecutionResult::failed(None, "Nenhum documento conectado"),
            Some(_) if text.is_empty() => CommandExecutionResult::failed(None, "Texto vazio"),
            Some(editor) => match insert_with_leading_space(editor, text) {
                Ok(inserted) => CommandExecutionResult::ok(None).with_inserted(inserted),
                Err(e) => {
                    log::error!("[VoiceEngine] Dictation insert failed: {}", e);
                    CommandExecutionResult::failed(None, e.to_string())
                }
            },
        };
        self.last_execution = Some(result.clone());
        result
    }

    fn finish_execution(&mut self, result: CommandExecutionResult) -> CommandExecutionResult {
        self.last_execution = Some(result.clone());
        if let Some(cb) = &self.shared.callbacks.on_execute {
            cb(&result);
        }
        result
    }

    fn reject(&self, transcript: &str, candidate: Option<&CommandMatchResult>) {
        if let Some(cb) = &self.shared.callbacks.on_reject {
            cb(transcript, candidate);
        }
    }
}

impl Drop for VoiceCommandEngine {
    fn drop(&mut self) {
        if let Some(task) = self.reload_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_commands;
    use crate::document::MemoryDocument;
    use crate::error::CatalogError;
    use crate::lookup::InMemoryCatalog;
    use crate::command::SystemAction;
    use crate::protected_words::PROTECTED_MEDICAL_WORDS;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn engine_with_doc(text: &str, callbacks: EngineCallbacks) -> VoiceCommandEngine {
        let mut engine = VoiceCommandEngine::new(EngineSettings::default(), BuiltinCatalog, callbacks);
        assert!(engine.load_commands());
        engine.attach_editor(Box::new(MemoryDocument::with_text(text)));
        engine
    }

    fn doc_text(engine: &VoiceCommandEngine) -> String {
        engine.editor().map(|e| e.plain_text()).unwrap_or_default()
    }

    fn templates() -> InMemoryCatalog {
        InMemoryCatalog::new(vec![
            LookupCandidate::new("tc_torax", CandidateKind::Template, "TC de Tórax", "TC DO TÓRAX\n\nAchados: [achados]\n\nImpressão: [impressão]")
                .with_variant("com contraste", "TC DO TÓRAX COM CONTRASTE"),
            LookupCandidate::new("frase_normal", CandidateKind::Frase, "Exame normal", "Exame dentro dos limites da normalidade."),
        ])
    }

    #[test]
    fn test_load_sets_ready_state() {
        let mut engine = VoiceCommandEngine::new(EngineSettings::default(), BuiltinCatalog, EngineCallbacks::new());
        let state = engine.state();
        assert!(!state.ready);
        assert_eq!(state.total_commands, 0);

        assert!(engine.load_commands());
        let state = engine.state();
        assert!(state.ready);
        assert!(state.loaded_at.is_some());
        assert_eq!(state.total_commands, builtin_commands().len());

        // priority order
        let commands = engine.commands();
        assert!(commands.windows(2).all(|w| w[0].priority >= w[1].priority));
    }

    #[tokio::test]
    async fn test_comma_scenario() {
        let matched = Arc::new(AtomicUsize::new(0));
        let m = Arc::clone(&matched);
        let callbacks = EngineCallbacks::new().on_match(move |_| {
            m.fetch_add(1, Ordering::SeqCst);
        });
        let mut engine = engine_with_doc("fígado normal", callbacks);

        match engine.handle_utterance("vírgula").await {
            UtteranceOutcome::Executed { command_match, result } => {
                assert_eq!(command_match.command.id, "punct_comma");
                assert!(command_match.exact);
                assert!(result.success);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(doc_text(&engine), "fígado normal,");
        assert_eq!(matched.load(Ordering::SeqCst), 1);
        assert_eq!(engine.state().last_intent.unwrap().intent_type, IntentType::System);
    }

    #[tokio::test]
    async fn test_template_scenario_skips_matcher() {
        let searched = Arc::new(Mutex::new(Vec::new()));
        let rejected = Arc::new(AtomicUsize::new(0));
        let s = Arc::clone(&searched);
        let r = Arc::clone(&rejected);
        let callbacks = EngineCallbacks::new()
            .on_search_template(move |query, _| s.lock().unwrap().push(query.to_string()))
            .on_reject(move |_, _| {
                r.fetch_add(1, Ordering::SeqCst);
            });
        let mut engine = engine_with_doc("", callbacks);
        engine.set_catalog_search(Arc::new(templates()));

        match engine.handle_utterance("modelo tc tórax").await {
            UtteranceOutcome::Lookup { intent, candidates } => {
                assert_eq!(intent.intent_type, IntentType::Template);
                assert_eq!(intent.query, "tc tórax");
                assert_eq!(candidates[0].id, "tc_torax");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(*searched.lock().unwrap(), vec!["tc tórax".to_string()]);
        assert_eq!(rejected.load(Ordering::SeqCst), 0);
        assert!(engine.state().last_match.is_none());
        assert_eq!(doc_text(&engine), "");
    }

    #[tokio::test]
    async fn test_protected_word_scenario() {
        let rejected = Arc::new(Mutex::new(None));
        let r = Arc::clone(&rejected);
        let callbacks = EngineCallbacks::new().on_reject(move |transcript, candidate| {
            *r.lock().unwrap() = Some((transcript.to_string(), candidate.map(|c| c.command.id.clone())));
        });
        let mut engine = engine_with_doc("Rim", callbacks);

        match engine.handle_utterance("direita").await {
            UtteranceOutcome::Dictated { result } => {
                assert!(result.success);
                assert_eq!(result.inserted_content.as_deref(), Some(" direita"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(doc_text(&engine), "Rim direita");
        let (transcript, candidate) = rejected.lock().unwrap().clone().unwrap();
        assert_eq!(transcript, "direita");
        assert_ne!(candidate.as_deref(), Some("fmt_align_right"));
    }

    #[test]
    fn test_protected_words_never_execute() {
        let matched = Arc::new(AtomicUsize::new(0));
        let m = Arc::clone(&matched);
        let callbacks = EngineCallbacks::new().on_match(move |_| {
            m.fetch_add(1, Ordering::SeqCst);
        });
        let mut engine = engine_with_doc("Rim", callbacks);

        let mut words: Vec<&str> = PROTECTED_MEDICAL_WORDS.iter().copied().collect();
        words.sort_unstable();
        for word in &words {
            assert!(engine.process_transcript(word).is_none(), "'{}' ran a command", word);
        }
        for pair in words.windows(2) {
            let utterance = pair.join(" ");
            assert!(engine.process_transcript(&utterance).is_none(), "'{}' ran a command", utterance);
        }
        assert_eq!(matched.load(Ordering::SeqCst), 0);
        assert_eq!(doc_text(&engine), "Rim");
    }

    #[tokio::test]
    async fn test_ordinary_dictation_is_not_punctuation() {
        let mut engine = engine_with_doc("Rim", EngineCallbacks::new());
        for text in ["coração", "segmento", "hiperintenso", "pronto", "agora vírgula", "baço"] {
            let outcome = engine.handle_utterance(text).await;
            assert!(matches!(outcome, UtteranceOutcome::Dictated { .. }), "'{}' gave {:?}", text, outcome);
        }
        assert_eq!(doc_text(&engine), "Rim coração segmento hiperintenso pronto agora vírgula baço");
    }

    #[tokio::test]
    async fn test_delete_line_scenario() {
        let mut engine = engine_with_doc("Achados: normal\nlinha errada", EngineCallbacks::new());
        match engine.handle_utterance("apagar linha").await {
            UtteranceOutcome::Executed { command_match, result } => {
                assert_eq!(command_match.command.id, "edit_delete_line");
                assert!(result.success);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(doc_text(&engine), "Achados: normal");
    }

    #[tokio::test]
    async fn test_empty_input_is_ignored() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (a, b, c) = (Arc::clone(&calls), Arc::clone(&calls), Arc::clone(&calls));
        let callbacks = EngineCallbacks::new()
            .on_match(move |_| {
                a.fetch_add(1, Ordering::SeqCst);
            })
            .on_reject(move |_, _| {
                b.fetch_add(1, Ordering::SeqCst);
            })
            .on_execute(move |_| {
                c.fetch_add(1, Ordering::SeqCst);
            });
        let mut engine = engine_with_doc("abc", callbacks);

        assert_eq!(engine.handle_utterance("").await, UtteranceOutcome::Ignored);
        assert_eq!(engine.handle_utterance("   \n").await, UtteranceOutcome::Ignored);
        assert!(engine.process_transcript("  ").is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(doc_text(&engine), "abc");
    }

    #[tokio::test]
    async fn test_fuzzy_command_accepted_when_safe() {
        let mut engine = engine_with_doc("linha um\nlinha dois", EngineCallbacks::new());
        let outcome = engine.handle_utterance("apagar linhas").await;
        assert!(matches!(outcome, UtteranceOutcome::Executed { .. }));
        assert_eq!(doc_text(&engine), "linha um");
    }

    #[tokio::test]
    async fn test_weak_match_becomes_dictation() {
        let mut engine = engine_with_doc("", EngineCallbacks::new());
        let outcome = engine.handle_utterance("pontuação").await;
        assert!(matches!(outcome, UtteranceOutcome::Dictated { .. }));
        assert_eq!(doc_text(&engine), "pontuação");
    }

    #[test]
    fn test_no_editor_fails_softly() {
        let executed = Arc::new(Mutex::new(None));
        let e = Arc::clone(&executed);
        let callbacks = EngineCallbacks::new().on_execute(move |result| {
            *e.lock().unwrap() = Some(result.success);
        });
        let mut engine = VoiceCommandEngine::new(EngineSettings::default(), BuiltinCatalog, callbacks);
        engine.load_commands();

        let m = engine.process_transcript("vírgula").unwrap();
        assert_eq!(m.command.id, "punct_comma");
        let last = engine.state().last_execution.unwrap();
        assert!(!last.success);
        assert!(last.message.is_some());
        assert_eq!(*executed.lock().unwrap(), Some(false));

        assert!(!engine.insert_dictation("texto").success);
    }

    #[test]
    fn test_failed_reload_keeps_previous_catalog() {
        let fail = Arc::new(AtomicBool::new(false));
        let f = Arc::clone(&fail);
        let source = move || -> Result<Vec<VoiceCommand>, CatalogError> {
            if f.load(Ordering::SeqCst) {
                Err(CatalogError::Unavailable("disk gone".to_string()))
            } else {
                Ok(builtin_commands())
            }
        };
        let errors = Arc::new(AtomicUsize::new(0));
        let e = Arc::clone(&errors);
        let callbacks = EngineCallbacks::new().on_error(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        });

        let mut engine = VoiceCommandEngine::new(EngineSettings::default(), source, callbacks);
        assert!(engine.load_commands());
        let before = engine.state();

        fail.store(true, Ordering::SeqCst);
        assert!(!engine.reload_commands());
        let after = engine.state();

        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert!(after.ready);
        assert_eq!(after.total_commands, before.total_commands);
        assert_eq!(after.loaded_at, before.loaded_at);
        assert!(engine.process_transcript("vírgula").is_some());
    }

    #[test]
    fn test_duplicate_ids_fail_load() {
        let source = || -> Result<Vec<VoiceCommand>, CatalogError> {
            let mut commands = builtin_commands();
            commands.push(commands[0].clone());
            Ok(commands)
        };
        let mut engine = VoiceCommandEngine::new(EngineSettings::default(), source, EngineCallbacks::new());
        assert!(!engine.load_commands());
        assert!(!engine.state().ready);
    }

    #[test]
    fn test_add_replace_and_remove_command() {
        let mut engine = engine_with_doc("", EngineCallbacks::new());
        let total = engine.state().total_commands;
        let utterances = ["vírgula", "apagar linhas", "negritu", "por favor apagar linha", "pontuação", "próximo campo"];
        let matches_for = |engine: &VoiceCommandEngine| -> Vec<Option<(String, f32, bool)>> {
            utterances
                .iter()
                .map(|p| engine.shared.matcher.find_best_match(p).map(|m| (m.command.id, m.score, m.exact)))
                .collect()
        };
        let before = matches_for(&engine);

        engine.add_command(
            VoiceCommand::new(
                "assinatura",
                "inserir assinatura",
                CommandCategory::Frase,
                CommandAction::InsertContent("Dr. Fulano".to_string()),
            )
            .with_priority(1000),
        );
        assert_eq!(engine.state().total_commands, total + 1);
        assert_eq!(engine.commands()[0].id, "assinatura");

        engine.add_command(VoiceCommand::new(
            "assinatura",
            "inserir assinatura",
            CommandCategory::Frase,
            CommandAction::InsertContent("Dra. Beltrana".to_string()),
        ));
        assert_eq!(engine.state().total_commands, total + 1);
        engine.process_transcript("inserir assinatura");
        assert_eq!(doc_text(&engine), "Dra. Beltrana");

        assert!(engine.remove_command("assinatura"));
        assert!(!engine.remove_command("assinatura"));
        assert_eq!(engine.state().total_commands, total);
        assert_eq!(matches_for(&engine), before);
    }

    #[test]
    fn test_start_stop_idempotent() {
        let mut engine = engine_with_doc("", EngineCallbacks::new());
        assert!(!engine.state().active);
        engine.start();
        engine.start();
        assert!(engine.is_active());
        engine.stop();
        engine.stop();
        assert!(!engine.state().active);
    }

    #[tokio::test]
    async fn test_auto_reload_task_runs_and_stops() {
        let loads = Arc::new(AtomicUsize::new(0));
        let l = Arc::clone(&loads);
        let source = move || -> Result<Vec<VoiceCommand>, CatalogError> {
            l.fetch_add(1, Ordering::SeqCst);
            Ok(builtin_commands())
        };
        let mut settings = EngineSettings::default();
        settings.catalog.auto_reload_interval_secs = Some(1);

        let mut engine = VoiceCommandEngine::new(settings, source, EngineCallbacks::new());
        engine.load_commands();
        engine.start();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(loads.load(Ordering::SeqCst) >= 2);

        engine.stop();
        tokio::task::yield_now().await;
        let after_stop = loads.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1200)).await;
        assert_eq!(loads.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_start_without_runtime_does_not_spawn() {
        let mut settings = EngineSettings::default();
        settings.catalog.auto_reload_interval_secs = Some(1);
        let mut engine = VoiceCommandEngine::new(settings, BuiltinCatalog, EngineCallbacks::new());
        engine.start();
        assert!(engine.is_active());
        assert!(engine.reload_task.is_none());
    }

    #[tokio::test]
    async fn test_apply_candidate_and_usage() {
        let mut engine = engine_with_doc("rascunho", EngineCallbacks::new());
        engine.set_catalog_search(Arc::new(templates()));

        let candidates = match engine.handle_utterance("modelo tc tórax").await {
            UtteranceOutcome::Lookup { candidates, .. } => candidates,
            other => panic!("unexpected outcome {:?}", other),
        };
        let result = engine.apply_candidate(&candidates[0], Some("com contraste"));
        assert!(result.success);
        assert_eq!(doc_text(&engine), "TC DO TÓRAX COM CONTRASTE");
        assert_eq!(engine.usage().get("tc_torax").unwrap().use_count, 1);

        let frases = match engine.handle_utterance("frase exame normal").await {
            UtteranceOutcome::Lookup { candidates, .. } => candidates,
            other => panic!("unexpected outcome {:?}", other),
        };
        engine.apply_candidate(&frases[0], None);
        assert_eq!(
            doc_text(&engine),
            "TC DO TÓRAX COM CONTRASTE Exame dentro dos limites da normalidade."
        );
    }

    #[tokio::test]
    async fn test_lookup_without_backend_reports_error() {
        let errors = Arc::new(AtomicUsize::new(0));
        let e = Arc::clone(&errors);
        let callbacks = EngineCallbacks::new().on_error(move |err| {
            assert!(matches!(err, EngineError::Lookup(LookupError::NoBackend)));
            e.fetch_add(1, Ordering::SeqCst);
        });
        let mut engine = engine_with_doc("", callbacks);
        let outcome = engine.handle_utterance("frase normal").await;
        assert!(matches!(outcome, UtteranceOutcome::Lookup { ref candidates, .. } if candidates.is_empty()));
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_help_command() {
        let mut engine = engine_with_doc("", EngineCallbacks::new());
        match engine.handle_utterance("ajuda").await {
            UtteranceOutcome::Executed { command_match, result } => {
                assert_eq!(command_match.command.action, CommandAction::System(SystemAction::Help));
                assert!(result.message.unwrap().contains("vírgula"));
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert_eq!(doc_text(&engine), "");
    }

    #[test]
    fn test_from_settings_uses_catalog_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("comandos.json");
        std::fs::write(
            &path,
            r#"{"commands": [{"id": "undo", "name": "desfazer", "category": "system",
                "action": {"type": "system", "payload": "undo"}}]}"#,
        )
        .unwrap();

        let mut settings = EngineSettings::default();
        settings.catalog.file = Some(path);
        let mut engine = VoiceCommandEngine::from_settings(settings, EngineCallbacks::new());
        assert!(engine.load_commands());
        assert_eq!(engine.state().total_commands, 1);
    }
}
