// src/config.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;

use crate::error::ConfigError;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EngineSettings {
    #[serde(default)]
    pub matcher: MatcherSettings,
    #[serde(default)]
    pub intent: IntentSettings,
    #[serde(default)]
    pub phonetic: PhoneticSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub lookup: LookupSettings,
    #[serde(default)]
    pub formats: FormatSettings,
}

/// Thresholds for fuzzy matching and the safety guard.
///
/// All scores are on the matcher scale: 0.0 perfect, 1.0 unrelated. Each
/// threshold is tuned on its own.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MatcherSettings {
    /// Worst score the approximate index will return at all
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f32,
    /// Worst non-exact score the engine will act on (inclusive)
    #[serde(default = "default_acceptance_threshold")]
    pub acceptance_threshold: f32,
    /// Non-exact system commands must score strictly below this
    #[serde(default = "default_safety_threshold")]
    pub safety_threshold: f32,
    #[serde(default = "default_min_match_length")]
    pub min_match_length: usize,
    /// Utterances up to this many words made only of medical terms never run
    /// a fuzzy-matched command
    #[serde(default = "default_protected_max_words")]
    pub protected_max_words: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct IntentSettings {
    /// Prefix followed by a query
    #[serde(default = "default_prefixed_confidence")]
    pub prefixed_confidence: f32,
    /// Prefix spoken alone
    #[serde(default = "default_bare_prefix_confidence")]
    pub bare_prefix_confidence: f32,
    #[serde(default = "default_text_confidence")]
    pub text_confidence: f32,
    /// Tried before the built-in template prefixes
    #[serde(default)]
    pub extra_template_prefixes: Vec<String>,
    /// Tried before the built-in frase prefixes
    #[serde(default)]
    pub extra_frase_prefixes: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct PhoneticSettings {
    /// Heard form -> intended form, merged over the built-in table
    #[serde(default)]
    pub extra_rules: HashMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct CatalogSettings {
    /// TOML or JSON command catalog. Built-in commands are used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_reload_interval_secs: Option<u64>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LookupSettings {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// JSON file for template/phrase usage history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_file: Option<PathBuf>,
}

/// chrono format strings for date/time insertion
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FormatSettings {
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_time_format")]
    pub time_format: String,
}

fn default_match_threshold() -> f32 {
    0.4
}

fn default_acceptance_threshold() -> f32 {
    0.3
}

fn default_safety_threshold() -> f32 {
    0.2
}

fn default_min_match_length() -> usize {
    2
}

fn default_protected_max_words() -> usize {
    2
}

fn default_prefixed_confidence() -> f32 {
    0.95
}

fn default_bare_prefix_confidence() -> f32 {
    0.7
}

fn default_text_confidence() -> f32 {
    1.0
}

fn default_max_results() -> usize {
    10
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

fn default_time_format() -> String {
    "%H:%M".to_string()
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            acceptance_threshold: default_acceptance_threshold(),
            safety_threshold: default_safety_threshold(),
            min_match_length: default_min_match_length(),
            protected_max_words: default_protected_max_words(),
        }
    }
}

impl Default for IntentSettings {
    fn default() -> Self {
        Self {
            prefixed_confidence: default_prefixed_confidence(),
            bare_prefix_confidence: default_bare_prefix_confidence(),
            text_confidence: default_text_confidence(),
            extra_template_prefixes: Vec::new(),
            extra_frase_prefixes: Vec::new(),
        }
    }
}

impl Default for LookupSettings {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            usage_file: None,
        }
    }
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            date_format: default_date_format(),
            time_format: default_time_format(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            matcher: MatcherSettings::default(),
            intent: IntentSettings::default(),
            phonetic: PhoneticSettings::default(),
            catalog: CatalogSettings::default(),
            lookup: LookupSettings::default(),
            formats: FormatSettings::default(),
        }
    }
}

// Helper function to get project directories
fn get_project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("br", "laudo", "LaudoVoice")
}

fn get_config_path() -> Option<PathBuf> {
    get_project_dirs().map(|proj_dirs| proj_dirs.config_dir().join("config.toml"))
}

impl EngineSettings {
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        get_config_path().ok_or(ConfigError::NoConfigDir)
    }

    /// Load from the platform config dir, writing defaults when the file is missing
    pub fn load() -> Self {
        match get_config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                log::error!("[Config] Could not determine project directories. Using default settings.");
                Self::default()
            }
        }
    }

    /// Load from an explicit path.
    ///
    /// A missing file is created with defaults; an unreadable or invalid one
    /// is logged and replaced by defaults in memory only.
    pub fn load_from(path: &Path) -> Self {
        log::info!("[Config] Trying to load settings from: {}", path.display());
        match fs::read_to_string(path) {
            Ok(contents) => match Self::from_toml_str(&contents) {
                Ok(settings) => {
                    log::info!(
                        "[Config] Settings loaded: match={}, accept={}, safety={}",
                        settings.matcher.match_threshold,
                        settings.matcher.acceptance_threshold,
                        settings.matcher.safety_threshold
                    );
                    return settings;
                }
                Err(e) => {
                    log::error!("[Config] Failed to parse config file '{}': {}", path.display(), e);
                    return Self::default();
                }
            },
            Err(ref e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("[Config] Config file not found. Creating default.");
            }
            Err(e) => {
                log::error!("[Config] Failed to read config file '{}': {}", path.display(), e);
                return Self::default();
            }
        }

        let defaults = Self::default();
        if let Err(e) = defaults.save_to(path) {
            log::error!("[Config] Failed to write default config file: {}", e);
        }
        defaults
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        log::info!("[Config] Settings saved to {}", path.display());
        Ok(())
    }
}
