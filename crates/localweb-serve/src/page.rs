//! Main document loading and folder listing.
//!
//! The main document is not intercepted: it is read up front and handed to
//! the engine together with the synthetic base URL, so its relative links
//! land on the interceptor.

use std::io::Read;
use std::time::Instant;

use localweb_provider::{DocumentProvider, DocumentUri};
use localweb_types::config::ServeConfig;
use localweb_types::error::Result;

/// How the engine should load the selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainDocument {
    /// Load `html` as if it had been fetched from `base_url`.
    Html { base_url: String, html: String },
    /// Reading failed; load the document identifier directly.
    Direct { uri: String },
}

/// Read the selected HTML file for loading under the synthetic origin.
pub fn load_main_document<P: DocumentProvider + ?Sized>(
    provider: &P,
    file_uri: &str,
    config: &ServeConfig,
) -> MainDocument {
    let started = Instant::now();
    match read_text(provider, file_uri) {
        Ok(html) => {
            log::debug!(
                "main document base={} uri={file_uri} bytes={} read={}ms",
                config.base_url(),
                html.len(),
                started.elapsed().as_millis()
            );
            MainDocument::Html {
                base_url: config.base_url(),
                html,
            }
        },
        Err(e) => {
            log::warn!("falling back to direct load for {file_uri}: {e}");
            MainDocument::Direct {
                uri: file_uri.to_string(),
            }
        },
    }
}

fn read_text<P: DocumentProvider + ?Sized>(provider: &P, file_uri: &str) -> Result<String> {
    let uri = DocumentUri::parse(file_uri)?;
    let mut bytes = Vec::new();
    provider.open_input_stream(&uri)?.read_to_end(&mut bytes)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// One entry of a folder listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderEntry {
    pub name: String,
    pub uri: DocumentUri,
    pub is_directory: bool,
}

/// `.html` or `.htm`, any case.
pub fn is_html_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

/// Sub-folders and HTML files of `folder`, folders first, then by name
/// ignoring case.
pub fn list_folder<P: DocumentProvider + ?Sized>(
    provider: &P,
    folder: &DocumentUri,
) -> Result<Vec<FolderEntry>> {
    let mut entries: Vec<FolderEntry> = provider
        .query_children(folder, None)?
        .into_iter()
        .filter(|row| row.is_directory() || is_html_name(&row.display_name))
        .map(|row| {
            let uri = match folder.tree_id() {
                Some(tree) => DocumentUri::document_in_tree(folder.authority(), tree, &row.document_id),
                None => DocumentUri::document(folder.authority(), &row.document_id),
            };
            FolderEntry {
                is_directory: row.is_directory(),
                name: row.display_name,
                uri,
            }
        })
        .collect();
    entries.sort_by_cached_key(|entry| (!entry.is_directory, entry.name.to_lowercase()));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use localweb_provider::MemoryProvider;

    use super::*;

    fn provider() -> MemoryProvider {
        let mut p = MemoryProvider::new("auth", "primary:");
        p.mkdir("site/zeta").unwrap();
        p.mkdir("site/Alpha").unwrap();
        p.write("site/index.html", b"<h1>caf\xc3\xa9</h1>").unwrap();
        p.write("site/About.HTM", b"about").unwrap();
        p.write("site/style.css", b"body{}").unwrap();
        p.write("site/bad.html", b"\xff\xfeok").unwrap();
        p
    }

    #[test]
    fn html_names() {
        assert!(is_html_name("index.html"));
        assert!(is_html_name("PAGE.HTM"));
        assert!(!is_html_name("style.css"));
        assert!(!is_html_name("html"));
    }

    #[test]
    fn main_document_uses_synthetic_base() {
        let p = provider();
        let uri = p.document_uri("site/index.html").unwrap().to_string();
        let doc = load_main_document(&p, &uri, &ServeConfig::default());
        assert_eq!(
            doc,
            MainDocument::Html {
                base_url: "https://local.web/".to_string(),
                html: "<h1>café</h1>".to_string(),
            }
        );
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let p = provider();
        let uri = p.document_uri("site/bad.html").unwrap().to_string();
        match load_main_document(&p, &uri, &ServeConfig::default()) {
            MainDocument::Html { html, .. } => assert!(html.ends_with("ok")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unreadable_document_loads_directly() {
        let p = provider();
        let uri = p.document_uri("site/index.html").unwrap().to_string();
        p.revoke();
        assert_eq!(
            load_main_document(&p, &uri, &ServeConfig::default()),
            MainDocument::Direct { uri }
        );
        assert!(matches!(
            load_main_document(&p, "bogus", &ServeConfig::default()),
            MainDocument::Direct { .. }
        ));
    }

    #[test]
    fn listing_sorts_folders_first() {
        let p = provider();
        let folder = p.document_uri("site").unwrap();
        let names: Vec<String> = list_folder(&p, &folder)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["Alpha", "zeta", "About.HTM", "bad.html", "index.html"]);
    }

    #[test]
    fn listing_entries_stay_in_tree() {
        let p = provider();
        let folder = p.document_uri("site").unwrap();
        let entries = list_folder(&p, &folder).unwrap();
        let index = entries.iter().find(|e| e.name == "index.html").unwrap();
        assert_eq!(index.uri.tree_id(), Some("primary:"));
        assert_eq!(index.uri.document_id(), Some("primary:site/index.html"));
        assert!(!index.is_directory);
    }
}
