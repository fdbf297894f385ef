//! Folder context derivation.
//!
//! Runs once per selection. The selection UI hands over an optional folder
//! identifier and an optional file identifier; the folder context pins the
//! provider authority, the granted tree, and the document id that acts as
//! the root of the synthetic origin.

use localweb_provider::DocumentUri;
use localweb_types::error::{LocalWebError, Result};

/// The `(authority, tree, base folder)` triple every path resolves against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderContext {
    root_authority: String,
    root_tree_id: String,
    base_document_id: String,
}

impl FolderContext {
    pub fn new(authority: &str, tree_id: &str, base_document_id: &str) -> Self {
        Self {
            root_authority: authority.to_string(),
            root_tree_id: tree_id.to_string(),
            base_document_id: base_document_id.to_string(),
        }
    }

    /// Derive a context from a selection.
    ///
    /// Any failure (blank input, malformed identifier, missing tree) yields
    /// `None`, which callers treat exactly like "no folder selected".
    pub fn derive(folder_uri: Option<&str>, file_uri: Option<&str>) -> Option<Self> {
        match Self::try_derive(folder_uri, file_uri) {
            Ok(context) => Some(context),
            Err(e) => {
                log::debug!("no folder context (folder={folder_uri:?} file={file_uri:?}): {e}");
                None
            },
        }
    }

    /// Derivation with the failure reason kept.
    pub fn try_derive(folder_uri: Option<&str>, file_uri: Option<&str>) -> Result<Self> {
        let folder_uri = folder_uri.filter(|s| !s.trim().is_empty());
        let file_uri = file_uri.filter(|s| !s.trim().is_empty());

        let base = match (folder_uri, file_uri) {
            (Some(folder), _) => DocumentUri::parse(folder)?,
            (None, Some(file)) => DocumentUri::parse(file)?,
            (None, None) => {
                return Err(LocalWebError::InvalidUri("nothing selected".to_string()));
            },
        };

        let tree_id = base
            .tree_id()
            .ok_or_else(|| LocalWebError::InvalidUri(format!("{base} is not inside a tree")))?;
        let tree = DocumentUri::tree(base.authority(), tree_id);

        let base_document_id = if folder_uri.is_some() {
            // A folder may be the tree root itself or a sub-folder in it.
            base.document_id().unwrap_or(tree_id).to_string()
        } else {
            let file_id = base.document_id().ok_or_else(|| {
                LocalWebError::InvalidUri(format!("{base} does not name a document"))
            })?;
            parent_document_id(file_id).to_string()
        };

        log::debug!("folder context tree={tree} base={base_document_id}");
        Ok(Self::new(base.authority(), tree_id, &base_document_id))
    }

    pub fn authority(&self) -> &str {
        &self.root_authority
    }

    pub fn tree_id(&self) -> &str {
        &self.root_tree_id
    }

    pub fn base_document_id(&self) -> &str {
        &self.base_document_id
    }

    /// Canonical tree handle.
    pub fn tree_uri(&self) -> DocumentUri {
        DocumentUri::tree(&self.root_authority, &self.root_tree_id)
    }

    /// Handle for a document reached through this context's tree grant.
    pub fn document_uri(&self, document_id: &str) -> DocumentUri {
        DocumentUri::document_in_tree(&self.root_authority, &self.root_tree_id, document_id)
    }
}

/// Parent folder id of a path-shaped file id.
///
/// `primary:site/index.html` -> `primary:site`, and a file at the volume
/// root (`primary:index.html`) -> `primary:`. Ids with neither separator are
/// returned unchanged.
fn parent_document_id(file_id: &str) -> &str {
    if let Some(i) = file_id.rfind('/') {
        return &file_id[..i];
    }
    match file_id.find(':') {
        Some(i) => &file_id[..=i],
        None => file_id,
    }
}
