// src/error.rs
//
// Error types for the voice command engine. None of these ever reach the host
// as a panic: the engine turns them into failed results or error callbacks.

use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a `DocumentEditor` implementation
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("invalid range {start}..{end} (document size {size})")]
    InvalidRange { start: usize, end: usize, size: usize },
    #[error("operation not supported by this editor: {0}")]
    Unsupported(&'static str),
    #[error("editor operation failed: {0}")]
    Failed(String),
}

/// Failure while loading a command catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML catalog: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse JSON catalog: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate command id '{0}' in catalog")]
    DuplicateId(String),
    #[error("unsupported catalog format for '{0}' (expected .toml or .json)")]
    UnsupportedFormat(PathBuf),
    #[error("command source unavailable: {0}")]
    Unavailable(String),
}

/// Failure from a dynamic template/phrase search
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    #[error("catalog search failed: {0}")]
    SearchFailed(String),
    #[error("no catalog search backend configured")]
    NoBackend,
}

/// Failure while loading or saving engine settings
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("config io error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Failure while loading or saving template/phrase usage history
#[derive(Debug, Error)]
pub enum UsageError {
    #[error("usage file io error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid usage data: {0}")]
    Json(#[from] serde_json::Error),
}

/// Top-level error surfaced through the engine's error callback
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Usage(#[from] UsageError),
}
