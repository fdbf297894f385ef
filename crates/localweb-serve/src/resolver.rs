//! Relative path resolution over a document provider.
//!
//! Providers expose no path lookup, only "children of a directory". A
//! request path is resolved in two tiers:
//!
//! 1. **Fast path**: concatenate the base document id and the cleaned path
//!    and look that id up directly. Providers with path-shaped ids answer
//!    in one round trip.
//! 2. **Walk**: split the path into percent-decoded segments and descend
//!    one directory at a time, consulting the [`DirectoryIdCache`] before
//!    every provider enumeration.
//!
//! Child lookup asks the provider for a display-name filter first and
//! falls back to a full scan when the filter is refused or fails. Names
//! match byte-for-byte.

use percent_encoding::percent_decode_str;

use localweb_provider::{DocumentProvider, DocumentRow, DocumentUri};
use localweb_types::error::Result;

use crate::cache::DirectoryIdCache;
use crate::context::FolderContext;

/// A document reached from a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDocument {
    pub uri: DocumentUri,
    pub document_id: String,
    pub is_directory: bool,
    pub size_bytes: Option<u64>,
}

impl ResolvedDocument {
    fn from_row(context: &FolderContext, row: DocumentRow) -> Self {
        let is_directory = row.is_directory();
        Self {
            uri: context.document_uri(&row.document_id),
            document_id: row.document_id,
            is_directory,
            size_bytes: row.size,
        }
    }
}

/// Resolves request paths against one folder context.
pub struct PathResolver<'a, P: DocumentProvider + ?Sized> {
    provider: &'a P,
    context: &'a FolderContext,
    cache: &'a DirectoryIdCache,
    fast_path: bool,
}

impl<'a, P: DocumentProvider + ?Sized> PathResolver<'a, P> {
    pub fn new(provider: &'a P, context: &'a FolderContext, cache: &'a DirectoryIdCache) -> Self {
        Self {
            provider,
            context,
            cache,
            fast_path: true,
        }
    }

    /// Enable or disable the id-concatenation fast path.
    pub fn with_fast_path(mut self, enabled: bool) -> Self {
        self.fast_path = enabled;
        self
    }

    /// Resolve a URL-encoded relative path.
    ///
    /// Returns `None` when the path is empty, any segment is missing, an
    /// intermediate segment is not a directory, or the provider fails.
    pub fn resolve(&self, encoded_path: &str) -> Option<ResolvedDocument> {
        let clean = clean_path(encoded_path);
        if clean.is_empty() {
            return None;
        }

        if self.fast_path {
            match self.lookup_direct(clean) {
                Ok(Some(doc)) => return Some(doc),
                Ok(None) => {},
                Err(e) => log::debug!("fast path failed for {clean}: {e}"),
            }
        }

        match self.walk(clean) {
            Ok(found) => found,
            Err(e) => {
                log::debug!("resolution failed for {clean}: {e}");
                None
            },
        }
    }

    fn lookup_direct(&self, clean: &str) -> Result<Option<ResolvedDocument>> {
        let candidate = join_document_id(self.context.base_document_id(), clean);
        let uri = self.context.document_uri(&candidate);
        Ok(self
            .provider
            .query_document(&uri)?
            .map(|row| ResolvedDocument::from_row(self.context, row)))
    }

    fn walk(&self, clean: &str) -> Result<Option<ResolvedDocument>> {
        let segments: Vec<String> = clean
            .split('/')
            .filter(|seg| !seg.trim().is_empty())
            .map(|seg| percent_decode_str(seg).decode_utf8_lossy().into_owned())
            .collect();
        let Some((leaf, dirs)) = segments.split_last() else {
            return Ok(None);
        };

        let mut parent_id = self.cache.base_document_id();
        let mut prefix = String::new();
        for segment in dirs {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);

            if let Some(cached) = self.cache.get(&prefix) {
                parent_id = cached;
                continue;
            }
            let Some(row) = self.find_child(&parent_id, segment)? else {
                return Ok(None);
            };
            if !row.is_directory() {
                return Ok(None);
            }
            self.cache.insert(&prefix, &row.document_id);
            parent_id = row.document_id;
        }

        Ok(self
            .find_child(&parent_id, leaf)?
            .map(|row| ResolvedDocument::from_row(self.context, row)))
    }

    fn find_child(&self, parent_id: &str, name: &str) -> Result<Option<DocumentRow>> {
        let parent = self.context.document_uri(parent_id);
        let rows = match self.provider.query_children(&parent, Some(name)) {
            Ok(rows) => rows,
            Err(e) => {
                if !e.is_unsupported() {
                    log::debug!("filtered child query failed under {parent_id}: {e}");
                }
                self.provider.query_children(&parent, None)?
            },
        };
        Ok(rows.into_iter().find(|row| row.display_name == name))
    }
}

/// Strip the leading slash and any query or fragment.
fn clean_path(path: &str) -> &str {
    let path = path.strip_prefix('/').unwrap_or(path);
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

/// Candidate id for the fast path.
fn join_document_id(base: &str, path: &str) -> String {
    if base.ends_with('/') || base.ends_with(':') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    }
}

#[cfg(test)]
mod tests {
    use localweb_provider::{FilterSupport, IdScheme, MemoryProvider};

    use super::*;

    fn site(scheme: IdScheme, filter: FilterSupport) -> MemoryProvider {
        let mut p = MemoryProvider::new("auth", "primary:")
            .with_id_scheme(scheme)
            .with_filter_support(filter);
        p.mkdir("site/img").unwrap();
        p.mkdir("site/my docs").unwrap();
        p.write("site/index.html", b"<html></html>").unwrap();
        p.write("site/style.css", b"body{}").unwrap();
        p.write("site/img/logo.png", &[0x89, b'P', b'N', b'G']).unwrap();
        p.write("site/my docs/a b.txt", b"spaced").unwrap();
        p
    }

    fn context(p: &MemoryProvider) -> FolderContext {
        FolderContext::new("auth", "primary:", p.document_id("site").unwrap())
    }

    #[test]
    fn clean_path_rules() {
        assert_eq!(clean_path("/a/b.css?v=1"), "a/b.css");
        assert_eq!(clean_path("a.js#top"), "a.js");
        assert_eq!(clean_path("/"), "");
        assert_eq!(clean_path("/?x"), "");
    }

    #[test]
    fn join_respects_trailing_separator() {
        assert_eq!(join_document_id("primary:", "a.css"), "primary:a.css");
        assert_eq!(join_document_id("primary:site", "a.css"), "primary:site/a.css");
        assert_eq!(join_document_id("primary:site/", "a.css"), "primary:site/a.css");
    }

    #[test]
    fn fast_path_hits_with_path_like_ids() {
        let p = site(IdScheme::PathLike, FilterSupport::Honoured);
        let ctx = context(&p);
        let cache = DirectoryIdCache::new(ctx.base_document_id());
        let doc = PathResolver::new(&p, &ctx, &cache)
            .resolve("/img/logo.png")
            .unwrap();
        assert_eq!(doc.document_id, "primary:site/img/logo.png");
        assert_eq!(doc.size_bytes, Some(4));
        assert_eq!(p.child_queries(), 0);
        assert!(cache.prefixes().is_empty());
    }

    #[test]
    fn walk_resolves_opaque_ids() {
        let p = site(IdScheme::Opaque, FilterSupport::Honoured);
        let ctx = context(&p);
        let cache = DirectoryIdCache::new(ctx.base_document_id());
        let doc = PathResolver::new(&p, &ctx, &cache)
            .resolve("/img/logo.png")
            .unwrap();
        assert_eq!(Some(doc.document_id.as_str()), p.document_id("site/img/logo.png"));
        assert!(!doc.is_directory);
        assert_eq!(cache.prefixes(), ["img"]);
    }

    #[test]
    fn directory_leaf_is_reported_as_directory() {
        let p = site(IdScheme::Opaque, FilterSupport::Honoured);
        let ctx = context(&p);
        let cache = DirectoryIdCache::new(ctx.base_document_id());
        let doc = PathResolver::new(&p, &ctx, &cache).resolve("img").unwrap();
        assert!(doc.is_directory);
        // Leaves are never cached, directory or not.
        assert!(cache.prefixes().is_empty());
    }

    #[test]
    fn percent_encoded_segments_are_decoded_for_the_walk() {
        let p = site(IdScheme::PathLike, FilterSupport::Honoured);
        let ctx = context(&p);
        let cache = DirectoryIdCache::new(ctx.base_document_id());
        let doc = PathResolver::new(&p, &ctx, &cache)
            .resolve("/my%20docs/a%20b.txt")
            .unwrap();
        assert_eq!(doc.document_id, "primary:site/my docs/a b.txt");
        assert_eq!(cache.prefixes(), ["my docs"]);
    }

    #[test]
    fn names_match_case_sensitively() {
        let p = site(IdScheme::Opaque, FilterSupport::Ignored);
        let ctx = context(&p);
        let cache = DirectoryIdCache::new(ctx.base_document_id());
        assert!(PathResolver::new(&p, &ctx, &cache).resolve("Style.css").is_none());
    }

    #[test]
    fn file_used_as_directory_is_not_found() {
        let p = site(IdScheme::Opaque, FilterSupport::Honoured);
        let ctx = context(&p);
        let cache = DirectoryIdCache::new(ctx.base_document_id());
        assert!(PathResolver::new(&p, &ctx, &cache)
            .resolve("style.css/x.png")
            .is_none());
        assert!(cache.prefixes().is_empty());
    }

    #[test]
    fn unsupported_filter_falls_back_to_scan() {
        let p = site(IdScheme::Opaque, FilterSupport::Unsupported);
        let ctx = context(&p);
        let cache = DirectoryIdCache::new(ctx.base_document_id());
        let doc = PathResolver::new(&p, &ctx, &cache).resolve("img/logo.png");
        assert!(doc.is_some());
        // Filtered attempt plus full scan, per level.
        assert_eq!(p.child_queries(), 4);
    }

    #[test]
    fn empty_path_is_not_found() {
        let p = site(IdScheme::PathLike, FilterSupport::Honoured);
        let ctx = context(&p);
        let cache = DirectoryIdCache::new(ctx.base_document_id());
        let resolver = PathResolver::new(&p, &ctx, &cache);
        assert!(resolver.resolve("").is_none());
        assert!(resolver.resolve("/").is_none());
        assert!(resolver.resolve("/?query").is_none());
        assert_eq!(p.document_queries() + p.child_queries(), 0);
    }

    #[test]
    fn revoked_grant_is_not_found() {
        let p = site(IdScheme::PathLike, FilterSupport::Honoured);
        let ctx = context(&p);
        let cache = DirectoryIdCache::new(ctx.base_document_id());
        p.revoke();
        assert!(PathResolver::new(&p, &ctx, &cache).resolve("style.css").is_none());
    }

    #[test]
    fn fast_path_can_be_disabled() {
        let p = site(IdScheme::PathLike, FilterSupport::Honoured);
        let ctx = context(&p);
        let cache = DirectoryIdCache::new(ctx.base_document_id());
        let doc = PathResolver::new(&p, &ctx, &cache)
            .with_fast_path(false)
            .resolve("img/logo.png")
            .unwrap();
        assert_eq!(doc.document_id, "primary:site/img/logo.png");
        assert_eq!(p.document_queries(), 0);
        assert_eq!(cache.prefixes(), ["img"]);
    }
}
