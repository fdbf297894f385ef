//! Persisted session preferences.
//!
//! The last selection survives restarts as a small TOML document. Nothing
//! here validates the stored identifiers: a stale or revoked identifier
//! simply fails folder-context derivation later and the session starts
//! with no context.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What the browser pane shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentMode {
    /// An HTML file from the selected storage tree.
    #[default]
    Local,
    /// A plain network URL.
    Url,
}

/// Last selection, restored at session start.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionPrefs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_folder_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_file_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_url: Option<String>,
    pub last_mode: ContentMode,
}

impl SessionPrefs {
    /// Parse a prefs document. Unknown keys are ignored.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a prefs document.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Remember a local file selection and switch to local mode.
    pub fn record_local_selection(&mut self, file_uri: &str, folder_uri: Option<&str>) {
        log::debug!("prefs: local selection file={file_uri} folder={folder_uri:?}");
        self.last_file_uri = Some(file_uri.to_string());
        self.last_folder_uri = folder_uri.map(str::to_string);
        self.last_mode = ContentMode::Local;
    }

    /// Remember a URL and switch to URL mode.
    pub fn record_url(&mut self, url: &str) {
        self.last_url = Some(url.to_string());
        self.last_mode = ContentMode::Url;
    }

    /// Drop a folder whose grant is gone.
    pub fn forget_folder(&mut self) {
        self.last_folder_uri = None;
    }
}
