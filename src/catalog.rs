// src/catalog.rs
//
// The system command catalog: where it comes from (built-in list, TOML/JSON
// file, or any closure) and how it is validated before the engine indexes it.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::command::{
    Alignment, CommandAction, CommandCategory, FormatAction, NavigateAction, StructuralAction,
    SystemAction, TextCase, TextMark, VoiceCommand,
};
use crate::error::CatalogError;

/// Anything that can hand the engine a full command catalog
pub trait CommandSource: Send + Sync {
    fn load(&self) -> Result<Vec<VoiceCommand>, CatalogError>;
}

impl<F> CommandSource for F
where
    F: Fn() -> Result<Vec<VoiceCommand>, CatalogError> + Send + Sync,
{
    fn load(&self) -> Result<Vec<VoiceCommand>, CatalogError> {
        self()
    }
}

/// The static command set shipped with the editor
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalog;

impl CommandSource for BuiltinCatalog {
    fn load(&self) -> Result<Vec<VoiceCommand>, CatalogError> {
        Ok(builtin_commands())
    }
}

/// Catalog stored on disk, `.toml` or `.json`
#[derive(Debug, Clone)]
pub struct CatalogFile {
    path: PathBuf,
}

/// On-disk shape: a list of commands under `commands`
#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    commands: Vec<VoiceCommand>,
}

impl CatalogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CommandSource for CatalogFile {
    fn load(&self) -> Result<Vec<VoiceCommand>, CatalogError> {
        let extension = self
            .path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        let contents = fs::read_to_string(&self.path).map_err(|source| CatalogError::Io {
            path: self.path.clone(),
            source,
        })?;

        let document: CatalogDocument = match extension.as_deref() {
            Some("toml") => toml::from_str(&contents)?,
            Some("json") => serde_json::from_str(&contents)?,
            _ => return Err(CatalogError::UnsupportedFormat(self.path.clone())),
        };

        log::info!(
            "[Catalog] Loaded {} commands from {}",
            document.commands.len(),
            self.path.display()
        );
        Ok(document.commands)
    }
}

/// Reject catalogs that reuse an id
pub fn validate_unique_ids(commands: &[VoiceCommand]) -> Result<(), CatalogError> {
    let mut seen = HashSet::with_capacity(commands.len());
    for command in commands {
        if !seen.insert(command.id.as_str()) {
            return Err(CatalogError::DuplicateId(command.id.clone()));
        }
    }
    Ok(())
}

/// Categorized listing of every loaded command, one block per category
pub fn help_listing(commands: &[VoiceCommand]) -> String {
    let mut by_category: BTreeMap<usize, (CommandCategory, Vec<&VoiceCommand>)> = BTreeMap::new();
    for command in commands {
        let order = CommandCategory::ALL
            .iter()
            .position(|c| *c == command.category)
            .unwrap_or(CommandCategory::ALL.len());
        by_category
            .entry(order)
            .or_insert_with(|| (command.category, Vec::new()))
            .1
            .push(command);
    }

    let mut out = format!("Comandos de voz disponíveis ({}):\n", commands.len());
    for (category, entries) in by_category.values() {
        out.push_str(&format!("\n{}:\n", category.label().to_uppercase()));
        for command in entries {
            if command.phrases.is_empty() {
                out.push_str(&format!("  - {}\n", command.name));
            } else {
                out.push_str(&format!("  - {} ({})\n", command.name, command.phrases.join(", ")));
            }
        }
    }
    out
}

fn punctuation(id: &str, name: &str, phrases: &[&str], mark: &str) -> VoiceCommand {
    VoiceCommand::new(id, name, CommandCategory::Punctuation, CommandAction::Punctuation(mark.to_string()))
        .with_phrases(phrases.iter().copied())
        .with_priority(100)
}

fn structural(id: &str, name: &str, phrases: &[&str], action: StructuralAction) -> VoiceCommand {
    VoiceCommand::new(id, name, CommandCategory::Structural, CommandAction::Structural(action))
        .with_phrases(phrases.iter().copied())
        .with_priority(90)
}

fn format(id: &str, name: &str, phrases: &[&str], action: FormatAction) -> VoiceCommand {
    VoiceCommand::new(id, name, CommandCategory::Formatting, CommandAction::Format(action))
        .with_phrases(phrases.iter().copied())
        .with_priority(70)
}

fn navigate(id: &str, name: &str, phrases: &[&str], action: NavigateAction) -> VoiceCommand {
    VoiceCommand::new(id, name, CommandCategory::Navigation, CommandAction::Navigate(action))
        .with_phrases(phrases.iter().copied())
        .with_priority(60)
}

fn system(id: &str, name: &str, phrases: &[&str], action: SystemAction, priority: i32) -> VoiceCommand {
    VoiceCommand::new(id, name, CommandCategory::System, CommandAction::System(action))
        .with_phrases(phrases.iter().copied())
        .with_priority(priority)
}

fn frase(id: &str, name: &str, phrases: &[&str], text: &str) -> VoiceCommand {
    VoiceCommand::new(id, name, CommandCategory::Frase, CommandAction::InsertContent(text.to_string()))
        .with_phrases(phrases.iter().copied())
        .with_priority(40)
}

/// The built-in command set, grouped the way the help listing shows it
pub fn builtin_commands() -> Vec<VoiceCommand> {
    vec![
        // Punctuation
        punctuation("punct_comma", "vírgula", &["virgula"], ","),
        punctuation("punct_period", "ponto final", &["ponto"], "."),
        punctuation("punct_semicolon", "ponto e vírgula", &[], ";"),
        punctuation("punct_colon", "dois pontos", &[], ":"),
        punctuation("punct_question", "ponto de interrogação", &["interrogação"], "?"),
        punctuation("punct_exclamation", "ponto de exclamação", &["exclamação"], "!"),
        punctuation("punct_hyphen", "hífen", &["traço"], "-"),
        punctuation("punct_open_paren", "abre parênteses", &["abrir parênteses"], "("),
        punctuation("punct_close_paren", "fecha parênteses", &["fechar parênteses"], ")"),
        punctuation("punct_slash", "barra", &[], "/"),
        punctuation("punct_percent", "por cento", &["porcento"], "%"),
        // Structural
        structural("struct_line_break", "nova linha", &["próxima linha", "quebra de linha", "pular linha"], StructuralAction::LineBreak),
        structural("struct_paragraph", "novo parágrafo", &["parágrafo", "próximo parágrafo"], StructuralAction::NewParagraph),
        structural("struct_tab", "tabulação", &["tab", "recuo"], StructuralAction::Tab),
        // Editing
        system("edit_delete_word", "apagar palavra", &["apaga palavra", "deletar palavra", "apagar última palavra"], SystemAction::DeleteLastWord, 80),
        system("edit_delete_line", "apagar linha", &["apaga linha", "deletar linha", "apagar última linha"], SystemAction::DeleteLine, 80),
        system("edit_undo", "desfazer", &["voltar", "desfaz"], SystemAction::Undo, 80),
        system("edit_redo", "refazer", &["refaz"], SystemAction::Redo, 80),
        system("edit_select_all", "selecionar tudo", &["seleciona tudo"], SystemAction::SelectAll, 80),
        // Formatting
        format("fmt_bold", "negrito", &["ativar negrito", "desativar negrito"], FormatAction::Toggle(TextMark::Bold)),
        format("fmt_italic", "itálico", &["ativar itálico", "desativar itálico"], FormatAction::Toggle(TextMark::Italic)),
        format("fmt_underline", "sublinhado", &["sublinhar"], FormatAction::Toggle(TextMark::Underline)),
        format("fmt_upper", "maiúsculas", &["caixa alta", "tudo maiúsculo"], FormatAction::Case(TextCase::Upper)),
        format("fmt_lower", "minúsculas", &["caixa baixa", "tudo minúsculo"], FormatAction::Case(TextCase::Lower)),
        format("fmt_align_left", "alinhar à esquerda", &["alinhamento à esquerda"], FormatAction::Align(Alignment::Left)),
        format("fmt_align_center", "centralizar", &["alinhar ao centro"], FormatAction::Align(Alignment::Center)),
        format("fmt_align_right", "alinhar à direita", &["alinhamento à direita"], FormatAction::Align(Alignment::Right)),
        format("fmt_justify", "justificar", &["texto justificado"], FormatAction::Align(Alignment::Justify)),
        // Navigation
        navigate("nav_start", "ir para o início", &["início do documento", "topo"], NavigateAction::DocumentStart),
        navigate("nav_end", "ir para o fim", &["fim do documento", "final do laudo"], NavigateAction::DocumentEnd),
        navigate("nav_next_field", "próximo campo", &["próximo", "campo seguinte"], NavigateAction::NextPlaceholder),
        navigate("nav_prev_field", "campo anterior", &["voltar campo", "campo de trás"], NavigateAction::PreviousPlaceholder),
        navigate("nav_technique", "ir para técnica", &["seção técnica"], NavigateAction::Section("técnica".to_string())),
        navigate("nav_findings", "ir para achados", &["seção achados", "ir para relatório"], NavigateAction::Section("achados".to_string())),
        navigate("nav_impression", "ir para impressão", &["seção impressão", "ir para conclusão"], NavigateAction::Section("impressão".to_string())),
        // System actions
        system("sys_clear", "limpar laudo", &["limpar tudo", "apagar tudo"], SystemAction::ClearDocument, 50),
        system("sys_new", "novo laudo", &["novo documento"], SystemAction::NewDocument, 50),
        system("sys_date", "inserir data", &["data de hoje"], SystemAction::InsertDate, 50),
        system("sys_time", "inserir hora", &["hora atual"], SystemAction::InsertTime, 50),
        system("sys_datetime", "inserir data e hora", &[], SystemAction::InsertDateTime, 50),
        system("sys_help", "ajuda", &["comandos de voz", "lista de comandos"], SystemAction::Help, 50),
        system("sys_stop", "parar ditado", &["parar gravação", "encerrar ditado"], SystemAction::StopDictation, 50),
        // Medical fixed phrases
        frase("frase_normal", "exame normal", &["exame dentro da normalidade"], "Exame dentro dos limites da normalidade."),
        frase("frase_no_changes", "sem alterações", &["sem alterações significativas"], "Sem alterações significativas."),
        frase("frase_compare", "sem exames anteriores", &["sem exames prévios"], "Não há exames anteriores disponíveis para comparação."),
        frase("frase_correlate", "correlação clínica", &["sugiro correlação clínica"], "Sugere-se correlação clínica."),
    ]
}
