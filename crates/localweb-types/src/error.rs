//! Error types for localweb.

use std::io;

/// Errors produced by the localweb crates.
#[derive(Debug, thiserror::Error)]
pub enum LocalWebError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("unsupported by provider: {0}")]
    Unsupported(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid document uri: {0}")]
    InvalidUri(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML write error: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}

impl LocalWebError {
    /// True when a provider rejected an optional capability (e.g. a
    /// display-name filter) rather than failing outright.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, LocalWebError::Unsupported(_))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, LocalWebError>;
