// src/command.rs
//
// Command catalog entries and the per-utterance results that flow between
// the matcher, the safety guard and the executor.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of command categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandCategory {
    Punctuation,
    Structural,
    System,
    Formatting,
    Navigation,
    Frase,
    Template,
}

impl CommandCategory {
    pub const ALL: [CommandCategory; 7] = [
        CommandCategory::Punctuation,
        CommandCategory::Structural,
        CommandCategory::Formatting,
        CommandCategory::Navigation,
        CommandCategory::System,
        CommandCategory::Frase,
        CommandCategory::Template,
    ];

    /// Spoken/display label, also indexed by the fuzzy matcher
    pub fn label(&self) -> &'static str {
        match self {
            CommandCategory::Punctuation => "pontuação",
            CommandCategory::Structural => "estrutura",
            CommandCategory::System => "sistema",
            CommandCategory::Formatting => "formatação",
            CommandCategory::Navigation => "navegação",
            CommandCategory::Frase => "frases",
            CommandCategory::Template => "modelos",
        }
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralAction {
    LineBreak,
    NewParagraph,
    Tab,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMark {
    Bold,
    Italic,
    Underline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextCase {
    Upper,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum FormatAction {
    Toggle(TextMark),
    Align(Alignment),
    Case(TextCase),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum NavigateAction {
    DocumentStart,
    DocumentEnd,
    NextPlaceholder,
    PreviousPlaceholder,
    /// Jump to the line starting with this header name
    Section(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemAction {
    ClearDocument,
    NewDocument,
    DeleteLastWord,
    DeleteLine,
    Undo,
    Redo,
    SelectAll,
    InsertDate,
    InsertTime,
    InsertDateTime,
    Help,
    /// Handled by the host's dictation layer; the engine only acknowledges it
    StopDictation,
}

/// What a command does, with its payload.
///
/// Serialized as `{ type = "...", payload = ... }` so catalog files stay
/// readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "payload")]
pub enum CommandAction {
    InsertContent(String),
    ApplyTemplate(String),
    Punctuation(String),
    Structural(StructuralAction),
    Format(FormatAction),
    Navigate(NavigateAction),
    System(SystemAction),
}

impl CommandAction {
    /// Short action-type name used in logs
    pub fn type_name(&self) -> &'static str {
        match self {
            CommandAction::InsertContent(_) => "insert_content",
            CommandAction::ApplyTemplate(_) => "apply_template",
            CommandAction::Punctuation(_) => "punctuation",
            CommandAction::Structural(_) => "structural",
            CommandAction::Format(_) => "format",
            CommandAction::Navigate(_) => "navigate",
            CommandAction::System(_) => "system",
        }
    }
}

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceCommand {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub phrases: Vec<String>,
    pub category: CommandCategory,
    pub action: CommandAction,
    /// Tie-break only, higher first. Never used for scoring.
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl VoiceCommand {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: CommandCategory,
        action: CommandAction,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phrases: Vec::new(),
            category,
            action,
            priority: 0,
            modality: None,
            region: None,
        }
    }

    pub fn with_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
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
}

/// Sort a catalog by descending priority. Stable, so equal priorities keep
/// their insertion order.
pub fn sort_by_priority(commands: &mut [VoiceCommand]) {
    commands.sort_by(|a, b| b.priority.cmp(&a.priority));
}

/// Best match for an utterance. Lower score is better; 0 is a perfect match.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMatchResult {
    pub command: VoiceCommand,
    pub score: f32,
    /// The name or phrase variant that produced the match
    pub matched_phrase: String,
    pub exact: bool,
}

/// Outcome of running a command against the document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandExecutionResult {
    pub success: bool,
    pub command: Option<VoiceCommand>,
    pub message: Option<String>,
    pub inserted_content: Option<String>,
}

impl CommandExecutionResult {
    pub fn ok(command: Option<VoiceCommand>) -> Self {
        Self {
            success: true,
            command,
            message: None,
            inserted_content: None,
        }
    }

    pub fn failed(command: Option<VoiceCommand>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            command,
            message: Some(message.into()),
            inserted_content: None,
        }
    }

    pub fn with_inserted(mut self, content: impl Into<String>) -> Self {
        self.inserted_content = Some(content.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
