//! Local resource serving core.
//!
//! Serves a user-selected folder of a document provider under a synthetic
//! HTTPS origin: folder context derivation, path resolution with a
//! directory id cache, byte ranges, response building and request
//! interception. Platform glue (engine hooks, pickers) lives elsewhere.

pub mod body;
pub mod cache;
pub mod context;
pub mod interceptor;
pub mod mime;
pub mod page;
pub mod range;
pub mod resolver;
pub mod responder;

pub use body::ResponseBody;
pub use cache::DirectoryIdCache;
pub use context::FolderContext;
pub use interceptor::{InterceptRequest, LocalServer, ServeStats};
pub use page::{FolderEntry, MainDocument, list_folder, load_main_document};
pub use range::{ByteRange, parse_range};
pub use resolver::{PathResolver, ResolvedDocument};
pub use responder::{HttpResponseDescriptor, Responder};
