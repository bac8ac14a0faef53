// src/safety.rs
//
// Last check before a matched command touches the report. Doubtful matches
// go back to the caller as dictation.

use crate::command::{CommandCategory, CommandMatchResult};
use crate::config::MatcherSettings;
use crate::protected_words::is_protected_utterance;

#[derive(Debug, Clone, PartialEq)]
pub struct SafetyVerdict {
    pub safe: bool,
    pub reason: String,
}

impl SafetyVerdict {
    fn safe(reason: impl Into<String>) -> Self {
        Self { safe: true, reason: reason.into() }
    }

    fn unsafe_because(reason: impl Into<String>) -> Self {
        Self { safe: false, reason: reason.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendedAction {
    Execute,
    InsertText,
}

pub struct SafetyGuard {
    safety_threshold: f32,
    protected_max_words: usize,
}

impl SafetyGuard {
    pub fn new(settings: &MatcherSettings) -> Self {
        Self {
            safety_threshold: settings.safety_threshold,
            protected_max_words: settings.protected_max_words,
        }
    }

    /// Only an exact hit bypasses the medical-vocabulary veto. Punctuation and
    /// structural commands skip the score check, not the veto.
    pub fn validate_system_command(&self, m: &CommandMatchResult, original_text: &str) -> SafetyVerdict {
        if m.exact && m.score == 0.0 {
            return SafetyVerdict::safe("exact match");
        }

        if is_protected_utterance(original_text, self.protected_max_words) {
            return SafetyVerdict::unsafe_because(format!(
                "'{}' is medical vocabulary, not a command",
                original_text.trim()
            ));
        }

        if matches!(
            m.command.category,
            CommandCategory::Punctuation | CommandCategory::Structural
        ) {
            return SafetyVerdict::safe("punctuation and structural commands are always safe");
        }

        if m.score < self.safety_threshold {
            SafetyVerdict::safe(format!("score {:.3} below {:.3}", m.score, self.safety_threshold))
        } else {
            SafetyVerdict::unsafe_because(format!(
                "score {:.3} not below safety threshold {:.3}",
                m.score, self.safety_threshold
            ))
        }
    }

    pub fn recommended_action(&self, m: Option<&CommandMatchResult>, original_text: &str) -> RecommendedAction {
        match m {
            Some(m) if self.validate_system_command(m, original_text).safe => RecommendedAction::Execute,
            _ => RecommendedAction::InsertText,
        }
    }
}

impl Default for SafetyGuard {
    fn default() -> Self {
        Self::new(&MatcherSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{
        Alignment, CommandAction, FormatAction, StructuralAction, SystemAction, VoiceCommand,
    };

    fn result(command: VoiceCommand, score: f32, exact: bool) -> CommandMatchResult {
        CommandMatchResult {
            matched_phrase: command.name.clone(),
            command,
            score,
            exact,
        }
    }

    fn align_right() -> VoiceCommand {
        VoiceCommand::new(
            "fmt_align_right",
            "alinhar à direita",
            CommandCategory::Formatting,
            CommandAction::Format(FormatAction::Align(Alignment::Right)),
        )
    }

    fn delete_line() -> VoiceCommand {
        VoiceCommand::new(
            "edit_delete_line",
            "apagar linha",
            CommandCategory::System,
            CommandAction::System(SystemAction::DeleteLine),
        )
    }

    #[test]
    fn test_punctuation_always_safe() {
        let guard = SafetyGuard::default();
        let comma = VoiceCommand::new(
            "punct_comma",
            "vírgula",
            CommandCategory::Punctuation,
            CommandAction::Punctuation(",".to_string()),
        );
        assert!(guard.validate_system_command(&result(comma, 0.29, false), "virgulaa").safe);
    }

    #[test]
    fn test_exact_match_safe() {
        let guard = SafetyGuard::default();
        let verdict = guard.validate_system_command(&result(delete_line(), 0.0, true), "apagar linha");
        assert!(verdict.safe);
    }

    #[test]
    fn test_protected_word_vetoes_fuzzy_punctuation() {
        let guard = SafetyGuard::default();
        let percent = VoiceCommand::new(
            "punct_percent",
            "por cento",
            CommandCategory::Punctuation,
            CommandAction::Punctuation("%".to_string()),
        );
        let verdict = guard.validate_system_command(&result(percent.clone(), 0.27, false), "segmento");
        assert!(!verdict.safe);
        assert_eq!(
            guard.recommended_action(Some(&result(percent, 0.27, false)), "Segmento"),
            RecommendedAction::InsertText
        );

        let tab = VoiceCommand::new(
            "struct_tab",
            "tabulação",
            CommandCategory::Structural,
            CommandAction::Structural(StructuralAction::Tab),
        );
        assert!(!guard.validate_system_command(&result(tab, 0.25, false), "coração").safe);
    }

    #[test]
    fn test_exact_hit_on_protected_word_is_safe() {
        let guard = SafetyGuard::default();
        let lateral = VoiceCommand::new(
            "lateral",
            "lateral",
            CommandCategory::Frase,
            CommandAction::InsertContent("lateral".to_string()),
        );
        assert!(guard.validate_system_command(&result(lateral, 0.0, true), "lateral").safe);
    }

    #[test]
    fn test_protected_words_veto() {
        let guard = SafetyGuard::default();
        let verdict = guard.validate_system_command(&result(align_right(), 0.1, false), "direita");
        assert!(!verdict.safe);
        assert!(verdict.reason.contains("direita"));
        assert_eq!(
            guard.recommended_action(Some(&result(align_right(), 0.1, false)), "direita"),
            RecommendedAction::InsertText
        );
    }

    #[test]
    fn test_threshold_is_strict() {
        let guard = SafetyGuard::default();
        assert!(guard.validate_system_command(&result(delete_line(), 0.19, false), "apagar linhas").safe);
        assert!(!guard.validate_system_command(&result(delete_line(), 0.2, false), "apagar linhas").safe);
    }

    #[test]
    fn test_recommended_action() {
        let guard = SafetyGuard::default();
        assert_eq!(guard.recommended_action(None, "qualquer coisa"), RecommendedAction::InsertText);
        assert_eq!(
            guard.recommended_action(Some(&result(delete_line(), 0.0, true)), "apagar linha"),
            RecommendedAction::Execute
        );
        assert_eq!(
            guard.recommended_action(Some(&result(delete_line(), 0.25, false)), "apagar linhaz"),
            RecommendedAction::InsertText
        );
    }
}
