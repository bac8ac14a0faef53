// src/executor.rs
//
// Runs a resolved command against the document. One handler per action
// variant; every editor error becomes a failed result.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::catalog::help_listing;
use crate::command::{
    Alignment, CommandAction, CommandExecutionResult, FormatAction, NavigateAction,
    StructuralAction, SystemAction, TextCase, VoiceCommand,
};
use crate::config::FormatSettings;
use crate::document::{DocumentEditor, Selection};
use crate::error::EditError;
use crate::normalizer::strip_diacritic;

const TAB: &str = "    ";

// `[lado]`, `[medida em cm]`: one line, no nested brackets
static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[[^\[\]\n]*\]").unwrap()
});

pub struct CommandExecutor {
    date_format: String,
    time_format: String,
    clock: fn() -> DateTime<Local>,
}

impl CommandExecutor {
    pub fn new(formats: &FormatSettings) -> Self {
        let defaults = FormatSettings::default();
        Self {
            date_format: valid_format(&formats.date_format, &defaults.date_format),
            time_format: valid_format(&formats.time_format, &defaults.time_format),
            clock: Local::now,
        }
    }

    /// Replace the time source used for date/time insertion
    pub fn with_clock(mut self, clock: fn() -> DateTime<Local>) -> Self {
        self.clock = clock;
        self
    }

    pub fn execute(
        &self,
        command: &VoiceCommand,
        editor: Option<&mut (dyn DocumentEditor + '_)>,
        catalog: &[VoiceCommand],
    ) -> CommandExecutionResult {
        let Some(editor) = editor else {
            log::warn!("[CommandExecutor] No document attached, cannot run '{}'", command.id);
            return CommandExecutionResult::failed(Some(command.clone()), "Nenhum documento conectado");
        };

        log::debug!(
            "[CommandExecutor] Running '{}' ({})",
            command.id,
            command.action.type_name()
        );

        let outcome = match &command.action {
            CommandAction::InsertContent(text) => insert_with_leading_space(editor, text).map(Outcome::Inserted),
            CommandAction::ApplyTemplate(content) => editor.set_content(content).map(|_| Outcome::Done),
            CommandAction::Punctuation(mark) => editor.insert_text(mark).map(|_| Outcome::Inserted(mark.clone())),
            CommandAction::Structural(action) => self.structural(editor, *action),
            CommandAction::Format(action) => self.format(editor, *action),
            CommandAction::Navigate(action) => self.navigate(editor, action),
            CommandAction::System(action) => self.system(editor, *action, catalog),
        };

        match outcome {
            Ok(Outcome::Done) => CommandExecutionResult::ok(Some(command.clone())),
            Ok(Outcome::Inserted(text)) => CommandExecutionResult::ok(Some(command.clone())).with_inserted(text),
            Ok(Outcome::Message(message)) => CommandExecutionResult::ok(Some(command.clone())).with_message(message),
            Ok(Outcome::Declined(message)) => {
                log::debug!("[CommandExecutor] '{}' had nothing to do: {}", command.id, message);
                CommandExecutionResult::failed(Some(command.clone()), message)
            }
            Err(e) => {
                log::error!("[CommandExecutor] '{}' failed: {}", command.id, e);
                CommandExecutionResult::failed(Some(command.clone()), e.to_string())
            }
        }
    }

    fn structural(&self, editor: &mut dyn DocumentEditor, action: StructuralAction) -> Result<Outcome, EditError> {
        match action {
            StructuralAction::LineBreak => editor.insert_hard_break().map(|_| Outcome::Inserted("\n".to_string())),
            StructuralAction::NewParagraph => editor.split_block().map(|_| Outcome::Done),
            StructuralAction::Tab => editor.insert_text(TAB).map(|_| Outcome::Inserted(TAB.to_string())),
        }
    }

    fn format(&self, editor: &mut dyn DocumentEditor, action: FormatAction) -> Result<Outcome, EditError> {
        match action {
            FormatAction::Toggle(mark) => editor.toggle_mark(mark).map(|_| Outcome::Done),
            FormatAction::Align(alignment) => editor.set_alignment(alignment).map(|_| Outcome::Done),
            FormatAction::Case(case) => change_case(editor, case),
        }
    }

    fn navigate(&self, editor: &mut dyn DocumentEditor, action: &NavigateAction) -> Result<Outcome, EditError> {
        match action {
            NavigateAction::DocumentStart => editor.set_selection(0, 0).map(|_| Outcome::Done),
            NavigateAction::DocumentEnd => {
                let end = editor.size();
                editor.set_selection(end, end).map(|_| Outcome::Done)
            }
            NavigateAction::NextPlaceholder => {
                let text = editor.plain_text();
                let spans = placeholder_spans(&text);
                let current = editor.selection();
                let target = spans
                    .iter()
                    .find(|(from, _)| *from >= current.to)
                    .or_else(|| spans.first());
                select_span(editor, target.copied())
            }
            NavigateAction::PreviousPlaceholder => {
                let text = editor.plain_text();
                let spans = placeholder_spans(&text);
                let current = editor.selection();
                let target = spans
                    .iter()
                    .rev()
                    .find(|(_, to)| *to <= current.from)
                    .or_else(|| spans.last());
                select_span(editor, target.copied())
            }
            NavigateAction::Section(header) => {
                let text = editor.plain_text();
                match find_section(&text, header) {
                    Some(pos) => editor.set_selection(pos, pos).map(|_| Outcome::Done),
                    None => Ok(Outcome::Declined(format!("Seção '{}' não encontrada", header))),
                }
            }
        }
    }

    fn system(
        &self,
        editor: &mut dyn DocumentEditor,
        action: SystemAction,
        catalog: &[VoiceCommand],
    ) -> Result<Outcome, EditError> {
        match action {
            SystemAction::ClearDocument => editor.clear().map(|_| Outcome::Done),
            SystemAction::NewDocument => {
                editor.clear()?;
                editor.set_alignment(Alignment::Left)?;
                Ok(Outcome::Message("Novo laudo".to_string()))
            }
            SystemAction::DeleteLastWord => delete_last_word(editor),
            SystemAction::DeleteLine => delete_current_line(editor),
            SystemAction::Undo => Ok(if editor.undo()? {
                Outcome::Done
            } else {
                Outcome::Declined("Nada para desfazer".to_string())
            }),
            SystemAction::Redo => Ok(if editor.redo()? {
                Outcome::Done
            } else {
                Outcome::Declined("Nada para refazer".to_string())
            }),
            SystemAction::SelectAll => editor.select_all().map(|_| Outcome::Done),
            SystemAction::InsertDate => {
                let stamp = (self.clock)().format(&self.date_format).to_string();
                insert_with_leading_space(editor, &stamp).map(Outcome::Inserted)
            }
            SystemAction::InsertTime => {
                let stamp = (self.clock)().format(&self.time_format).to_string();
                insert_with_leading_space(editor, &stamp).map(Outcome::Inserted)
            }
            SystemAction::InsertDateTime => {
                let now = (self.clock)();
                let stamp = format!("{} {}", now.format(&self.date_format), now.format(&self.time_format));
                insert_with_leading_space(editor, &stamp).map(Outcome::Inserted)
            }
            SystemAction::Help => Ok(Outcome::Message(help_listing(catalog))),
            SystemAction::StopDictation => Ok(Outcome::Message("Ditado encerrado".to_string())),
        }
    }
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new(&FormatSettings::default())
    }
}

/// Result of a handler before it is wrapped into a `CommandExecutionResult`
enum Outcome {
    Done,
    Inserted(String),
    Message(String),
    /// Nothing to act on; reported as a failed result without an error log
    Declined(String),
}

fn valid_format(format: &str, fallback: &str) -> String {
    if format.is_empty() || StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        log::warn!("[CommandExecutor] Invalid date/time format '{}', using '{}'", format, fallback);
        fallback.to_string()
    } else {
        format.to_string()
    }
}

/// Insert text, prefixing a space when it would otherwise glue onto the
/// previous word. Returns what was actually inserted.
pub fn insert_with_leading_space(editor: &mut dyn DocumentEditor, text: &str) -> Result<String, EditError> {
    let to_insert = if needs_leading_space(editor) && !text.starts_with(char::is_whitespace) {
        format!(" {}", text)
    } else {
        text.to_string()
    };
    editor.insert_text(&to_insert)?;
    Ok(to_insert)
}

fn needs_leading_space(editor: &dyn DocumentEditor) -> bool {
    let cursor = editor.selection().from;
    if cursor == 0 {
        return false;
    }
    match editor.plain_text().chars().nth(cursor - 1) {
        Some(prev) => !(prev.is_whitespace() || prev == '('),
        None => false,
    }
}

/// Placeholder spans as char offsets
fn placeholder_spans(text: &str) -> Vec<(usize, usize)> {
    PLACEHOLDER_PATTERN
        .find_iter(text)
        .map(|m| {
            let from = text[..m.start()].chars().count();
            let len = m.as_str().chars().count();
            (from, from + len)
        })
        .collect()
}

fn select_span(editor: &mut dyn DocumentEditor, span: Option<(usize, usize)>) -> Result<Outcome, EditError> {
    match span {
        Some((from, to)) => editor.set_selection(from, to).map(|_| Outcome::Done),
        None => Ok(Outcome::Declined("Nenhum campo encontrado".to_string())),
    }
}

fn fold(c: char) -> char {
    strip_diacritic(c.to_lowercase().next().unwrap_or(c))
}

/// Char offset right after the first line-start header matching `header`,
/// including its colon. Case and accent insensitive.
pub fn find_section(text: &str, header: &str) -> Option<usize> {
    let wanted: Vec<char> = header.trim().chars().map(fold).collect();
    if wanted.is_empty() {
        return None;
    }

    let mut line_start = 0;
    for line in text.split('\n') {
        let chars: Vec<char> = line.chars().collect();
        let indent = chars.iter().take_while(|c| **c == ' ' || **c == '\t').count();
        let body = &chars[indent..];

        if body.len() >= wanted.len()
            && body.iter().zip(&wanted).all(|(a, b)| fold(*a) == *b)
        {
            let header_end = indent + wanted.len();
            match chars.get(header_end) {
                None => return Some(line_start + header_end),
                Some(':') => return Some(line_start + header_end + 1),
                Some(c) if c.is_whitespace() => return Some(line_start + header_end),
                Some(_) => {}
            }
        }

        line_start += chars.len() + 1;
    }
    None
}

fn change_case(editor: &mut dyn DocumentEditor, case: TextCase) -> Result<Outcome, EditError> {
    let selection = editor.selection();
    if !selection.is_empty() {
        editor.change_case(selection.from, selection.to, case)?;
        return Ok(Outcome::Done);
    }

    let chars: Vec<char> = editor.plain_text().chars().collect();
    match word_before(&chars, selection.from) {
        Some((from, to)) => {
            editor.change_case(from, to, case)?;
            Ok(Outcome::Done)
        }
        None => Ok(Outcome::Declined("Nenhuma palavra antes do cursor".to_string())),
    }
}

/// The word ending at or before `cursor`, skipping trailing whitespace
fn word_before(chars: &[char], cursor: usize) -> Option<(usize, usize)> {
    let mut end = cursor.min(chars.len());
    while end > 0 && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    let mut start = end;
    while start > 0 && !chars[start - 1].is_whitespace() {
        start -= 1;
    }
    if start == end {
        None
    } else {
        Some((start, end))
    }
}

fn delete_last_word(editor: &mut dyn DocumentEditor) -> Result<Outcome, EditError> {
    let selection = editor.selection();
    if !selection.is_empty() {
        editor.delete_range(selection.from, selection.to)?;
        return Ok(Outcome::Done);
    }

    let chars: Vec<char> = editor.plain_text().chars().collect();
    match word_before(&chars, selection.from) {
        Some((from, _)) => {
            editor.delete_range(from, selection.from)?;
            Ok(Outcome::Done)
        }
        None => Ok(Outcome::Declined("Nada para apagar".to_string())),
    }
}

fn delete_current_line(editor: &mut dyn DocumentEditor) -> Result<Outcome, EditError> {
    let chars: Vec<char> = editor.plain_text().chars().collect();
    if chars.is_empty() {
        return Ok(Outcome::Declined("Nada para apagar".to_string()));
    }

    let Selection { from: cursor, .. } = editor.selection();
    let cursor = cursor.min(chars.len());
    let start = chars[..cursor].iter().rposition(|c| *c == '\n').map_or(0, |i| i + 1);
    let end = chars[cursor..].iter().position(|c| *c == '\n').map_or(chars.len(), |i| cursor + i);

    // Take one adjoining newline with the line
    let (from, to) = if end < chars.len() {
        (start, end + 1)
    } else if start > 0 {
        (start - 1, end)
    } else {
        (start, end)
    };

    editor.delete_range(from, to)?;
    Ok(Outcome::Done)
}
