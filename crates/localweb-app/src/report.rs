//! JSON summaries printed by the command line.

use serde::Serialize;

use localweb_serve::{FolderEntry, HttpResponseDescriptor, MainDocument};

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MainDocumentReport {
    Html { base_url: String, bytes: usize },
    Direct { uri: String },
}

impl From<&MainDocument> for MainDocumentReport {
    fn from(doc: &MainDocument) -> Self {
        match doc {
            MainDocument::Html { base_url, html } => Self::Html {
                base_url: base_url.clone(),
                bytes: html.len(),
            },
            MainDocument::Direct { uri } => Self::Direct { uri: uri.clone() },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EntryReport {
    pub name: String,
    pub directory: bool,
    pub uri: String,
}

impl From<&FolderEntry> for EntryReport {
    fn from(entry: &FolderEntry) -> Self {
        Self {
            name: entry.name.clone(),
            directory: entry.is_directory,
            uri: entry.uri.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResponseReport {
    pub url: String,
    pub method: String,
    /// `None` when the request was passed through to the network.
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charset: Option<&'static str>,
    pub headers: Vec<(String, String)>,
    pub body_bytes: usize,
}

impl ResponseReport {
    pub fn passed_through(url: &str, method: &str) -> Self {
        Self {
            url: url.to_string(),
            method: method.to_string(),
            status: None,
            reason: None,
            mime_type: None,
            charset: None,
            headers: Vec::new(),
            body_bytes: 0,
        }
    }

    /// Summarize a response, draining and closing its body.
    pub fn consume(url: &str, method: &str, response: HttpResponseDescriptor) -> std::io::Result<Self> {
        let body = response.body.read_to_vec()?;
        Ok(Self {
            url: url.to_string(),
            method: method.to_string(),
            status: Some(response.status_code),
            reason: Some(response.reason_phrase),
            mime_type: Some(response.mime_type),
            charset: response.charset,
            headers: response.headers,
            body_bytes: body.len(),
        })
    }
}
