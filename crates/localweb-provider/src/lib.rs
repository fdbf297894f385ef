//! Document provider abstraction.
//!
//! A storage tree is reachable only through opaque document ids: a provider
//! can look a document up by id, enumerate the children of a directory, and
//! open a document for reading. There is no path lookup. Every operation
//! addresses documents through a [`DocumentUri`].

pub mod directory;
pub mod memory;
pub mod uri;

use std::io::{Read, Seek};

pub use directory::DirectoryProvider;
pub use memory::{FilterSupport, IdScheme, MemoryProvider};
pub use uri::DocumentUri;

use localweb_types::error::Result;

/// MIME type providers report for directories.
pub const DIRECTORY_MIME_TYPE: &str = "vnd.android.document/directory";

/// One row of a provider query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRow {
    /// Provider-assigned id, unique within the tree.
    pub document_id: String,
    /// Name shown to the user; matched byte-for-byte during resolution.
    pub display_name: String,
    /// Provider MIME type, [`DIRECTORY_MIME_TYPE`] for directories.
    pub mime_type: String,
    /// Size in bytes, when the provider knows it.
    pub size: Option<u64>,
}

impl DocumentRow {
    pub fn is_directory(&self) -> bool {
        self.mime_type == DIRECTORY_MIME_TYPE
    }
}

/// A readable stream that can also be positioned.
///
/// Seeking is allowed to fail at runtime (pipes, some network-backed
/// descriptors); callers must be ready to skip forward by reading instead.
pub trait SeekableStream: Read + Seek + Send {}

impl<T: Read + Seek + Send> SeekableStream for T {}

/// Capabilities of a tree-structured document provider.
///
/// Implementations are shared across the rendering engine's request
/// threads and must be callable concurrently.
pub trait DocumentProvider: Send + Sync {
    /// Look up a single document. `Ok(None)` when the id does not exist.
    fn query_document(&self, uri: &DocumentUri) -> Result<Option<DocumentRow>>;

    /// Enumerate the children of a directory.
    ///
    /// `display_name` is a best-effort equality filter: a provider may
    /// honour it, ignore it and return every child, or refuse it with
    /// [`LocalWebError::Unsupported`](localweb_types::error::LocalWebError::Unsupported).
    fn query_children(
        &self,
        parent: &DocumentUri,
        display_name: Option<&str>,
    ) -> Result<Vec<DocumentRow>>;

    /// Open a document as a sequential stream.
    fn open_input_stream(&self, uri: &DocumentUri) -> Result<Box<dyn Read + Send>>;

    /// Open a document as a seekable descriptor.
    fn open_file_descriptor(&self, uri: &DocumentUri) -> Result<Box<dyn SeekableStream>>;
}
