//! Document identifiers.
//!
//! Three shapes exist:
//!
//! - tree handle: `content://{authority}/tree/{treeId}`
//! - document in tree: `content://{authority}/tree/{treeId}/document/{docId}`
//! - bare document: `content://{authority}/document/{docId}`
//!
//! Ids are opaque strings. They are percent-encoded in the string form and
//! decoded on parse, so an id such as `primary:site/index.html` travels as
//! `primary%3Asite%2Findex.html`.

use std::fmt;

use localweb_types::error::{LocalWebError, Result};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use url::Url;

/// Scheme of every document identifier.
pub const CONTENT_SCHEME: &str = "content";

/// Characters left unescaped inside an encoded id.
const ID_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// A parsed document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentUri {
    authority: String,
    tree_id: Option<String>,
    document_id: Option<String>,
}

impl DocumentUri {
    /// Canonical tree handle for `(authority, tree_id)`.
    pub fn tree(authority: &str, tree_id: &str) -> Self {
        Self {
            authority: authority.to_string(),
            tree_id: Some(tree_id.to_string()),
            document_id: None,
        }
    }

    /// Handle for `document_id` reached through the grant on `tree_id`.
    pub fn document_in_tree(authority: &str, tree_id: &str, document_id: &str) -> Self {
        Self {
            authority: authority.to_string(),
            tree_id: Some(tree_id.to_string()),
            document_id: Some(document_id.to_string()),
        }
    }

    /// Handle for a single document granted without a tree.
    pub fn document(authority: &str, document_id: &str) -> Self {
        Self {
            authority: authority.to_string(),
            tree_id: None,
            document_id: Some(document_id.to_string()),
        }
    }

    /// Parse an identifier string.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        let parsed = Url::parse(input)
            .map_err(|e| LocalWebError::InvalidUri(format!("`{input}`: {e}")))?;

        if parsed.scheme() != CONTENT_SCHEME {
            return Err(LocalWebError::InvalidUri(format!(
                "`{input}`: scheme `{}` is not `{CONTENT_SCHEME}`",
                parsed.scheme()
            )));
        }

        let authority = parsed
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| LocalWebError::InvalidUri(format!("`{input}` carries no authority")))?
            .to_string();

        let mut segments = match parsed.path_segments() {
            Some(raw) => raw.map(decode_id).collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };
        if segments.last().is_some_and(String::is_empty) {
            segments.pop();
        }
        if segments.iter().any(String::is_empty) {
            return Err(LocalWebError::InvalidUri(format!("`{input}`: empty id")));
        }

        let parts: Vec<&str> = segments.iter().map(String::as_str).collect();
        match parts.as_slice() {
            ["tree", tree_id] => Ok(Self::tree(&authority, tree_id)),
            ["tree", tree_id, "document", document_id] => {
                Ok(Self::document_in_tree(&authority, tree_id, document_id))
            },
            ["document", document_id] => Ok(Self::document(&authority, document_id)),
            _ => Err(LocalWebError::InvalidUri(format!(
                "`{input}`: not a tree or document path"
            ))),
        }
    }

    /// Provider authority.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Id of the granted tree, if this handle was reached through one.
    pub fn tree_id(&self) -> Option<&str> {
        self.tree_id.as_deref()
    }

    /// Id of the specific document, absent for a bare tree handle.
    pub fn document_id(&self) -> Option<&str> {
        self.document_id.as_deref()
    }

    /// True when this names a specific document (in a tree or bare).
    pub fn is_document(&self) -> bool {
        self.document_id.is_some()
    }

    /// True when this is a bare tree handle.
    pub fn is_tree(&self) -> bool {
        self.tree_id.is_some() && self.document_id.is_none()
    }

    /// The document this handle addresses: the explicit document, or the
    /// tree root for a tree handle.
    pub fn target_id(&self) -> Option<&str> {
        self.document_id().or(self.tree_id())
    }

    /// Canonical tree handle of the grant this handle belongs to.
    pub fn tree_root(&self) -> Option<DocumentUri> {
        self.tree_id
            .as_deref()
            .map(|tree_id| Self::tree(&self.authority, tree_id))
    }
}

impl fmt::Display for DocumentUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CONTENT_SCHEME}://{}", self.authority)?;
        if let Some(ref tree_id) = self.tree_id {
            write!(f, "/tree/{}", utf8_percent_encode(tree_id, ID_ENCODE_SET))?;
        }
        if let Some(ref document_id) = self.document_id {
            write!(f, "/document/{}", utf8_percent_encode(document_id, ID_ENCODE_SET))?;
        }
        Ok(())
    }
}

fn decode_id(segment: &str) -> Result<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .map(|id| id.into_owned())
        .map_err(|e| LocalWebError::InvalidUri(format!("id `{segment}` is not UTF-8: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTHORITY: &str = "com.android.externalstorage.documents";

    #[test]
    fn parse_tree_handle() {
        let uri = DocumentUri::parse(
            "content://com.android.externalstorage.documents/tree/primary%3ASites",
        )
        .unwrap();
        assert_eq!(uri.authority(), AUTHORITY);
        assert_eq!(uri.tree_id(), Some("primary:Sites"));
        assert_eq!(uri.document_id(), None);
        assert!(uri.is_tree());
        assert!(!uri.is_document());
        assert_eq!(uri.target_id(), Some("primary:Sites"));
    }

    #[test]
    fn parse_document_in_tree() {
        let uri = DocumentUri::parse(
            "content://com.android.externalstorage.documents/tree/primary%3ASites/document/primary%3ASites%2Fdemo%2Findex.html",
        )
        .unwrap();
        assert_eq!(uri.tree_id(), Some("primary:Sites"));
        assert_eq!(uri.document_id(), Some("primary:Sites/demo/index.html"));
        assert!(uri.is_document());
        assert!(!uri.is_tree());
    }

    #[test]
    fn parse_bare_document() {
        let uri = DocumentUri::parse("content://media/document/image%3A42").unwrap();
        assert_eq!(uri.tree_id(), None);
        assert_eq!(uri.document_id(), Some("image:42"));
        assert!(uri.tree_root().is_none());
    }

    #[test]
    fn parse_accepts_trailing_slash() {
        let uri = DocumentUri::parse("content://a/tree/t/").unwrap();
        assert_eq!(uri.tree_id(), Some("t"));
    }

    #[test]
    fn parse_rejects_other_scheme() {
        let err = DocumentUri::parse("https://local.web/index.html").unwrap_err();
        assert!(err.to_string().contains("scheme"));
    }

    #[test]
    fn parse_rejects_missing_authority() {
        assert!(DocumentUri::parse("content:///tree/primary%3A").is_err());
    }

    #[test]
    fn parse_rejects_unknown_shape() {
        assert!(DocumentUri::parse("content://a/children/x").is_err());
        assert!(DocumentUri::parse("content://a/tree").is_err());
        assert!(DocumentUri::parse("content://a/tree//document/x").is_err());
    }

    #[test]
    fn display_encodes_ids() {
        let uri = DocumentUri::document_in_tree(AUTHORITY, "primary:", "primary:a b/c.css");
        assert_eq!(
            uri.to_string(),
            "content://com.android.externalstorage.documents/tree/primary%3A/document/primary%3Aa%20b%2Fc.css"
        );
    }

    #[test]
    fn tree_root_drops_document() {
        let uri = DocumentUri::document_in_tree(AUTHORITY, "primary:Sites", "primary:Sites/x");
        let root = uri.tree_root().unwrap();
        assert!(root.is_tree());
        assert_eq!(root.to_string(), format!("content://{AUTHORITY}/tree/primary%3ASites"));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn display_then_parse_preserves_ids(
                tree in "[a-zA-Z0-9:/ %._-]{1,24}",
                doc in "[a-zA-Z0-9:/ %._~-]{1,40}",
            ) {
                let uri = DocumentUri::document_in_tree(AUTHORITY, &tree, &doc);
                let parsed = DocumentUri::parse(&uri.to_string()).unwrap();
                prop_assert_eq!(parsed, uri);
            }
        }
    }
}
