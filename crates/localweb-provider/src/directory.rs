//! Host-directory document provider.
//!
//! Exposes one host directory as a single tree. Document ids are
//! `{volume}:{relative/path}`, the same path-shaped scheme external storage
//! uses, so direct id concatenation usually resolves in one lookup.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use localweb_types::error::{LocalWebError, Result};

use crate::{DIRECTORY_MIME_TYPE, DocumentProvider, DocumentRow, DocumentUri, SeekableStream};

/// Authority reported by [`DirectoryProvider`].
pub const DIRECTORY_AUTHORITY: &str = "localweb.directory";

/// Volume name used as the id prefix.
pub const DEFAULT_VOLUME: &str = "primary";

/// A provider backed by a directory on the host filesystem.
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    root: PathBuf,
    volume: String,
}

impl DirectoryProvider {
    /// Serve `root` as volume [`DEFAULT_VOLUME`].
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(LocalWebError::Provider(format!(
                "not a directory: {}",
                root.display()
            )));
        }
        Ok(Self {
            root,
            volume: DEFAULT_VOLUME.to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Tree id of the volume root (`primary:`).
    pub fn root_id(&self) -> String {
        format!("{}:", self.volume)
    }

    /// Tree handle granting the whole volume.
    pub fn tree_uri(&self) -> DocumentUri {
        DocumentUri::tree(DIRECTORY_AUTHORITY, &self.root_id())
    }

    /// Document id for a path relative to the root.
    pub fn document_id_for(&self, relative: &str) -> String {
        let relative = relative.trim_matches('/');
        format!("{}:{relative}", self.volume)
    }

    /// In-tree handle for a path relative to the root.
    pub fn document_uri_for(&self, relative: &str) -> DocumentUri {
        DocumentUri::document_in_tree(
            DIRECTORY_AUTHORITY,
            &self.root_id(),
            &self.document_id_for(relative),
        )
    }

    /// Map a handle to a host path, refusing anything outside the grant.
    fn host_path(&self, uri: &DocumentUri) -> Result<PathBuf> {
        if uri.authority() != DIRECTORY_AUTHORITY {
            return Err(LocalWebError::PermissionDenied(format!("foreign authority: {uri}")));
        }
        let tree_id = uri
            .tree_id()
            .ok_or_else(|| LocalWebError::PermissionDenied(format!("no tree grant: {uri}")))?;
        let id = uri
            .target_id()
            .ok_or_else(|| LocalWebError::InvalidUri(uri.to_string()))?;
        if !within_tree(tree_id, id) {
            return Err(LocalWebError::PermissionDenied(format!(
                "{id} is outside tree {tree_id}"
            )));
        }

        let relative = id
            .strip_prefix(&self.volume)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(|| LocalWebError::NotFound(id.to_string()))?;
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(LocalWebError::PermissionDenied(format!("path escapes root: {id}")));
        }
        Ok(self.root.join(relative))
    }

    fn row_for(&self, id: String, path: &Path, metadata: &fs::Metadata) -> DocumentRow {
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.volume.clone());
        if metadata.is_dir() {
            DocumentRow {
                document_id: id,
                display_name,
                mime_type: DIRECTORY_MIME_TYPE.to_string(),
                size: None,
            }
        } else {
            DocumentRow {
                document_id: id,
                mime_type: mime_guess::from_path(path).first_or_octet_stream().to_string(),
                display_name,
                size: Some(metadata.len()),
            }
        }
    }

    fn open(&self, uri: &DocumentUri) -> Result<File> {
        let path = self.host_path(uri)?;
        if path.is_dir() {
            return Err(LocalWebError::Provider(format!("is a directory: {uri}")));
        }
        Ok(File::open(path)?)
    }
}

impl DocumentProvider for DirectoryProvider {
    fn query_document(&self, uri: &DocumentUri) -> Result<Option<DocumentRow>> {
        let path = self.host_path(uri)?;
        match fs::metadata(&path) {
            Ok(metadata) => {
                let id = uri.target_id().unwrap_or_default().to_string();
                Ok(Some(self.row_for(id, &path, &metadata)))
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn query_children(
        &self,
        parent: &DocumentUri,
        display_name: Option<&str>,
    ) -> Result<Vec<DocumentRow>> {
        let dir = self.host_path(parent)?;
        let parent_id = parent.target_id().unwrap_or_default();

        let mut rows = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if display_name.is_some_and(|wanted| wanted != name) {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("skipping unreadable entry {}: {e}", entry.path().display());
                    continue;
                },
            };
            let id = child_id(parent_id, &name);
            rows.push(self.row_for(id, &entry.path(), &metadata));
        }
        rows.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(rows)
    }

    fn open_input_stream(&self, uri: &DocumentUri) -> Result<Box<dyn Read + Send>> {
        Ok(Box::new(self.open(uri)?))
    }

    fn open_file_descriptor(&self, uri: &DocumentUri) -> Result<Box<dyn SeekableStream>> {
        Ok(Box::new(self.open(uri)?))
    }
}

/// `id` is the tree root itself or a descendant of it.
fn within_tree(tree_id: &str, id: &str) -> bool {
    if id == tree_id {
        return true;
    }
    match id.strip_prefix(tree_id) {
        Some(rest) => tree_id.ends_with(':') || tree_id.ends_with('/') || rest.starts_with('/'),
        None => false,
    }
}

fn child_id(parent_id: &str, name: &str) -> String {
    if parent_id.ends_with(':') || parent_id.ends_with('/') {
        format!("{parent_id}{name}")
    } else {
        format!("{parent_id}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Seek, SeekFrom};

    use super::*;

    fn fixture() -> (tempfile::TempDir, DirectoryProvider) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("site/css")).unwrap();
        fs::write(dir.path().join("site/index.html"), "<html></html>").unwrap();
        fs::write(dir.path().join("site/css/main.css"), "body{}").unwrap();
        let provider = DirectoryProvider::new(dir.path()).unwrap();
        (dir, provider)
    }

    #[test]
    fn rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(DirectoryProvider::new(dir.path().join("nope")).is_err());
    }

    #[test]
    fn ids_are_path_shaped() {
        let (_dir, p) = fixture();
        assert_eq!(p.root_id(), "primary:");
        assert_eq!(p.document_id_for("/site/css/"), "primary:site/css");
    }

    #[test]
    fn query_document_file_and_dir() {
        let (_dir, p) = fixture();
        let css = p.query_document(&p.document_uri_for("site/css/main.css")).unwrap().unwrap();
        assert_eq!(css.document_id, "primary:site/css/main.css");
        assert_eq!(css.display_name, "main.css");
        assert_eq!(css.mime_type, "text/css");
        assert_eq!(css.size, Some(6));

        let site = p.query_document(&p.document_uri_for("site")).unwrap().unwrap();
        assert!(site.is_directory());
    }

    #[test]
    fn query_missing_is_none() {
        let (_dir, p) = fixture();
        assert!(p.query_document(&p.document_uri_for("site/missing.js")).unwrap().is_none());
    }

    #[test]
    fn traversal_is_refused() {
        let (_dir, p) = fixture();
        let uri = p.document_uri_for("site/../../etc/passwd");
        assert!(matches!(
            p.query_document(&uri),
            Err(LocalWebError::PermissionDenied(_))
        ));
    }

    #[test]
    fn document_outside_tree_is_refused() {
        let (_dir, p) = fixture();
        let uri = DocumentUri::document_in_tree(DIRECTORY_AUTHORITY, "primary:site", "primary:sitex/a");
        assert!(p.query_document(&uri).is_err());
    }

    #[test]
    fn children_with_and_without_filter() {
        let (_dir, p) = fixture();
        let site = p.document_uri_for("site");
        let all = p.query_children(&site, None).unwrap();
        let names: Vec<_> = all.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(names, ["css", "index.html"]);
        assert_eq!(all[0].document_id, "primary:site/css");

        let one = p.query_children(&site, Some("index.html")).unwrap();
        assert_eq!(one.len(), 1);
        assert!(p.query_children(&site, Some("INDEX.HTML")).unwrap().is_empty());
    }

    #[test]
    fn children_of_tree_root() {
        let (_dir, p) = fixture();
        let rows = p.query_children(&p.tree_uri(), None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].document_id, "primary:site");
    }

    #[test]
    fn descriptor_seeks() {
        let (_dir, p) = fixture();
        let mut fd = p.open_file_descriptor(&p.document_uri_for("site/css/main.css")).unwrap();
        fd.seek(SeekFrom::Start(4)).unwrap();
        let mut rest = String::new();
        fd.read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "{}");
    }

    #[test]
    fn opening_directory_fails() {
        let (_dir, p) = fixture();
        assert!(p.open_input_stream(&p.document_uri_for("site")).is_err());
    }

    #[test]
    fn within_tree_rules() {
        assert!(within_tree("primary:", "primary:a/b"));
        assert!(within_tree("primary:site", "primary:site"));
        assert!(within_tree("primary:site", "primary:site/x"));
        assert!(!within_tree("primary:site", "primary:sitex"));
        assert!(!within_tree("primary:site", "other:site/x"));
    }
}
