//! In-memory document provider.
//!
//! Useful for unit tests and benchmarks. The whole tree lives in a
//! `BTreeMap` keyed by document id, with a side index from normalized
//! relative path to id used only while building the tree. Provider quirks
//! that matter to the resolver (id shape, filter support, seekability,
//! unknown sizes, revoked grants) are switchable, and every query and open
//! handle is counted so tests can assert on provider traffic.

use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use localweb_types::error::{LocalWebError, Result};

use crate::{DIRECTORY_MIME_TYPE, DocumentProvider, DocumentRow, DocumentUri, SeekableStream};

/// How child document ids are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdScheme {
    /// Ids are the root id plus the relative path (`primary:site/a/b.css`).
    PathLike,
    /// Ids are unrelated to paths (`doc:17`).
    Opaque,
}

/// What the provider does with a display-name filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSupport {
    /// Only matching children are returned.
    Honoured,
    /// The filter is dropped and every child is returned.
    Ignored,
    /// Filtered queries fail with `Unsupported`.
    Unsupported,
}

#[derive(Debug, Clone)]
enum NodeKind {
    Dir,
    File { data: Arc<[u8]>, size_known: bool },
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<String>,
    name: String,
    kind: NodeKind,
}

/// A fully in-memory document tree.
#[derive(Debug)]
pub struct MemoryProvider {
    authority: String,
    tree_id: String,
    /// Document id -> node.
    nodes: BTreeMap<String, Node>,
    /// Normalized relative path -> document id. Root is `""`.
    paths: BTreeMap<String, String>,
    id_scheme: IdScheme,
    filter_support: FilterSupport,
    seekable: bool,
    next_opaque: u64,
    revoked: AtomicBool,
    document_queries: AtomicUsize,
    child_queries: AtomicUsize,
    opened: AtomicUsize,
    open_handles: Arc<AtomicUsize>,
}

impl MemoryProvider {
    /// Create a provider whose tree root has id `tree_id`.
    pub fn new(authority: &str, tree_id: &str) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            tree_id.to_string(),
            Node {
                parent: None,
                name: root_name(tree_id),
                kind: NodeKind::Dir,
            },
        );
        let mut paths = BTreeMap::new();
        paths.insert(String::new(), tree_id.to_string());
        Self {
            authority: authority.to_string(),
            tree_id: tree_id.to_string(),
            nodes,
            paths,
            id_scheme: IdScheme::PathLike,
            filter_support: FilterSupport::Honoured,
            seekable: true,
            next_opaque: 1,
            revoked: AtomicBool::new(false),
            document_queries: AtomicUsize::new(0),
            child_queries: AtomicUsize::new(0),
            opened: AtomicUsize::new(0),
            open_handles: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Choose the id scheme for nodes created afterwards.
    pub fn with_id_scheme(mut self, scheme: IdScheme) -> Self {
        self.id_scheme = scheme;
        self
    }

    pub fn with_filter_support(mut self, support: FilterSupport) -> Self {
        self.filter_support = support;
        self
    }

    /// When false, descriptors refuse to seek.
    pub fn with_seek_support(mut self, seekable: bool) -> Self {
        self.seekable = seekable;
        self
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn tree_id(&self) -> &str {
        &self.tree_id
    }

    /// Tree handle for the whole provider.
    pub fn tree_uri(&self) -> DocumentUri {
        DocumentUri::tree(&self.authority, &self.tree_id)
    }

    /// Id of the node at a relative path.
    pub fn document_id(&self, path: &str) -> Option<&str> {
        self.paths.get(&normalize(path)).map(String::as_str)
    }

    /// In-tree handle of the node at a relative path.
    pub fn document_uri(&self, path: &str) -> Option<DocumentUri> {
        self.document_id(path)
            .map(|id| DocumentUri::document_in_tree(&self.authority, &self.tree_id, id))
    }

    /// Create a directory and any missing parents. Returns its id.
    pub fn mkdir(&mut self, path: &str) -> Result<String> {
        let path = normalize(path);
        if let Some(id) = self.paths.get(&path) {
            return match self.nodes.get(id).map(|n| &n.kind) {
                Some(NodeKind::Dir) => Ok(id.clone()),
                _ => Err(LocalWebError::Provider(format!("not a directory: {path}"))),
            };
        }
        let (parent_path, name) = split_parent(&path);
        let parent_id = self.mkdir(parent_path)?;
        Ok(self.insert_node(&path, parent_id, name, NodeKind::Dir))
    }

    /// Write a file whose size the provider reports. The parent must exist.
    pub fn write(&mut self, path: &str, data: &[u8]) -> Result<String> {
        self.write_file(path, data, true)
    }

    /// Write a file the provider reports without a size.
    pub fn write_unsized(&mut self, path: &str, data: &[u8]) -> Result<String> {
        self.write_file(path, data, false)
    }

    fn write_file(&mut self, path: &str, data: &[u8], size_known: bool) -> Result<String> {
        let path = normalize(path);
        if path.is_empty() {
            return Err(LocalWebError::Provider("cannot overwrite root".to_string()));
        }
        let (parent_path, name) = split_parent(&path);
        let parent_id = match self.paths.get(parent_path) {
            Some(id) if matches!(self.nodes.get(id).map(|n| &n.kind), Some(NodeKind::Dir)) => {
                id.clone()
            },
            _ => {
                return Err(LocalWebError::Provider(format!(
                    "parent directory does not exist: {parent_path}"
                )));
            },
        };
        let kind = NodeKind::File {
            data: Arc::from(data),
            size_known,
        };
        if let Some(id) = self.paths.get(&path).cloned() {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.kind = kind;
            }
            return Ok(id);
        }
        Ok(self.insert_node(&path, parent_id, name, kind))
    }

    fn insert_node(&mut self, path: &str, parent_id: String, name: &str, kind: NodeKind) -> String {
        let id = match self.id_scheme {
            IdScheme::PathLike => join_id(&self.tree_id, path),
            IdScheme::Opaque => {
                let id = format!("doc:{}", self.next_opaque);
                self.next_opaque += 1;
                id
            },
        };
        self.nodes.insert(
            id.clone(),
            Node {
                parent: Some(parent_id),
                name: name.to_string(),
                kind,
            },
        );
        self.paths.insert(path.to_string(), id.clone());
        id
    }

    /// Simulate the user revoking the grant: every call fails afterwards.
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::SeqCst);
    }

    /// Number of `query_document` calls so far.
    pub fn document_queries(&self) -> usize {
        self.document_queries.load(Ordering::SeqCst)
    }

    /// Number of `query_children` calls so far.
    pub fn child_queries(&self) -> usize {
        self.child_queries.load(Ordering::SeqCst)
    }

    /// Number of streams and descriptors opened so far.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Streams and descriptors currently alive.
    pub fn open_handles(&self) -> usize {
        self.open_handles.load(Ordering::SeqCst)
    }

    pub fn reset_counters(&self) {
        self.document_queries.store(0, Ordering::SeqCst);
        self.child_queries.store(0, Ordering::SeqCst);
        self.opened.store(0, Ordering::SeqCst);
    }

    fn check_grant(&self, uri: &DocumentUri) -> Result<()> {
        if self.revoked.load(Ordering::SeqCst) {
            return Err(LocalWebError::PermissionDenied(format!("grant revoked: {uri}")));
        }
        if uri.authority() != self.authority || uri.tree_id() != Some(self.tree_id.as_str()) {
            return Err(LocalWebError::PermissionDenied(format!("no grant for {uri}")));
        }
        Ok(())
    }

    fn row(&self, id: &str, node: &Node) -> DocumentRow {
        let (mime_type, size) = match &node.kind {
            NodeKind::Dir => (DIRECTORY_MIME_TYPE.to_string(), None),
            NodeKind::File { data, size_known } => (
                mime_guess::from_path(&node.name)
                    .first_or_octet_stream()
                    .to_string(),
                size_known.then_some(data.len() as u64),
            ),
        };
        DocumentRow {
            document_id: id.to_string(),
            display_name: node.name.clone(),
            mime_type,
            size,
        }
    }

    fn file_data(&self, uri: &DocumentUri) -> Result<Arc<[u8]>> {
        self.check_grant(uri)?;
        let id = uri
            .target_id()
            .ok_or_else(|| LocalWebError::InvalidUri(uri.to_string()))?;
        match self.nodes.get(id).map(|n| &n.kind) {
            Some(NodeKind::File { data, .. }) => Ok(Arc::clone(data)),
            Some(NodeKind::Dir) => Err(LocalWebError::Provider(format!("is a directory: {id}"))),
            None => Err(LocalWebError::NotFound(id.to_string())),
        }
    }

    fn track<R>(&self, inner: R) -> Tracked<R> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.open_handles.fetch_add(1, Ordering::SeqCst);
        Tracked {
            inner,
            seekable: self.seekable,
            handles: Arc::clone(&self.open_handles),
        }
    }
}

impl DocumentProvider for MemoryProvider {
    fn query_document(&self, uri: &DocumentUri) -> Result<Option<DocumentRow>> {
        self.document_queries.fetch_add(1, Ordering::SeqCst);
        self.check_grant(uri)?;
        let Some(id) = uri.target_id() else {
            return Ok(None);
        };
        Ok(self.nodes.get(id).map(|node| self.row(id, node)))
    }

    fn query_children(
        &self,
        parent: &DocumentUri,
        display_name: Option<&str>,
    ) -> Result<Vec<DocumentRow>> {
        self.child_queries.fetch_add(1, Ordering::SeqCst);
        self.check_grant(parent)?;
        let parent_id = parent
            .target_id()
            .ok_or_else(|| LocalWebError::InvalidUri(parent.to_string()))?;
        match self.nodes.get(parent_id).map(|n| &n.kind) {
            Some(NodeKind::Dir) => {},
            Some(NodeKind::File { .. }) => {
                return Err(LocalWebError::Provider(format!("not a directory: {parent_id}")));
            },
            None => return Err(LocalWebError::NotFound(parent_id.to_string())),
        }

        let filter = match (display_name, self.filter_support) {
            (Some(_), FilterSupport::Unsupported) => {
                return Err(LocalWebError::Unsupported("display name selection".to_string()));
            },
            (Some(name), FilterSupport::Honoured) => Some(name),
            _ => None,
        };

        let mut rows: Vec<DocumentRow> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.parent.as_deref() == Some(parent_id))
            .filter(|(_, node)| filter.is_none_or(|name| node.name == name))
            .map(|(id, node)| self.row(id, node))
            .collect();
        rows.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(rows)
    }

    fn open_input_stream(&self, uri: &DocumentUri) -> Result<Box<dyn Read + Send>> {
        let data = self.file_data(uri)?;
        Ok(Box::new(self.track(Cursor::new(data))))
    }

    fn open_file_descriptor(&self, uri: &DocumentUri) -> Result<Box<dyn SeekableStream>> {
        let data = self.file_data(uri)?;
        Ok(Box::new(self.track(Cursor::new(data))))
    }
}

/// Open handle that reports its release and optionally refuses to seek.
struct Tracked<R> {
    inner: R,
    seekable: bool,
    handles: Arc<AtomicUsize>,
}

impl<R: Read> Read for Tracked<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl<R: Seek> Seek for Tracked<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        if !self.seekable {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "descriptor is not seekable",
            ));
        }
        self.inner.seek(pos)
    }
}

impl<R> Drop for Tracked<R> {
    fn drop(&mut self) {
        self.handles.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Strip leading, trailing and repeated slashes. Root is `""`.
fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|seg| !seg.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Split a normalized path into parent path and final name.
fn split_parent(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    }
}

/// Path-like child id: `root` joined with `path`, avoiding a doubled
/// separator when the root id already ends in one.
fn join_id(root: &str, path: &str) -> String {
    if root.ends_with('/') || root.ends_with(':') {
        format!("{root}{path}")
    } else {
        format!("{root}/{path}")
    }
}

fn root_name(tree_id: &str) -> String {
    tree_id
        .rsplit(['/', ':'])
        .find(|seg| !seg.is_empty())
        .unwrap_or(tree_id)
        .to_string()
}
