//! Request interception for the synthetic origin.
//!
//! The rendering engine calls [`LocalServer::intercept`] from its own
//! worker threads, once per sub-resource, many at a time. Requests for
//! `https://{host}/...` are answered from the selected folder; everything
//! else passes through to normal networking.
//!
//! The active selection is an immutable session swapped in whole by
//! [`LocalServer::select`]. In-flight requests keep the session they
//! started with, so a selection change never mixes two folders' caches.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

use url::Url;

use localweb_provider::DocumentProvider;
use localweb_types::config::ServeConfig;

use crate::cache::DirectoryIdCache;
use crate::context::FolderContext;
use crate::mime::guess_mime_type;
use crate::resolver::{PathResolver, ResolvedDocument};
use crate::responder::{HttpResponseDescriptor, Responder};

// ---------------------------------------------------------------------------
// Requests and statistics
// ---------------------------------------------------------------------------

/// A request as handed over by the rendering engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptRequest {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
}

impl InterceptRequest {
    pub fn get(url: &str) -> Self {
        Self {
            url: url.to_string(),
            method: "GET".to_string(),
            headers: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Served-response counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    /// 200 and 206 responses built.
    pub served: u64,
    /// Bytes promised by those responses (range length or document size).
    pub bytes: u64,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

struct ActiveFolder {
    context: FolderContext,
    cache: DirectoryIdCache,
}

struct Session {
    folder: Option<ActiveFolder>,
    folder_uri: Option<String>,
    file_uri: Option<String>,
    /// Set once the context (or its absence) has been logged.
    announced: AtomicBool,
}

impl Session {
    fn new(folder_uri: Option<&str>, file_uri: Option<&str>) -> Self {
        let folder = FolderContext::derive(folder_uri, file_uri).map(|context| ActiveFolder {
            cache: DirectoryIdCache::new(context.base_document_id()),
            context,
        });
        Self {
            folder,
            folder_uri: folder_uri.map(str::to_string),
            file_uri: file_uri.map(str::to_string),
            announced: AtomicBool::new(false),
        }
    }

    fn empty() -> Self {
        Self::new(None, None)
    }
}

// ---------------------------------------------------------------------------
// LocalServer
// ---------------------------------------------------------------------------

/// Serves the selected folder on the synthetic origin.
pub struct LocalServer<P: DocumentProvider + ?Sized> {
    provider: Arc<P>,
    config: ServeConfig,
    session: RwLock<Arc<Session>>,
    served: AtomicU64,
    served_bytes: AtomicU64,
    last_stats: Mutex<Instant>,
}

impl<P: DocumentProvider + ?Sized> LocalServer<P> {
    /// A server with nothing selected.
    pub fn new(provider: Arc<P>, config: ServeConfig) -> Self {
        Self {
            provider,
            config,
            session: RwLock::new(Arc::new(Session::empty())),
            served: AtomicU64::new(0),
            served_bytes: AtomicU64::new(0),
            last_stats: Mutex::new(Instant::now()),
        }
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    pub fn config(&self) -> &ServeConfig {
        &self.config
    }

    /// Start a new session for a folder and/or file selection.
    ///
    /// Returns whether a folder context could be derived. Without one,
    /// every local request answers 404 until the next selection.
    pub fn select(&self, folder_uri: Option<&str>, file_uri: Option<&str>) -> bool {
        let session = Arc::new(Session::new(folder_uri, file_uri));
        let derived = session.folder.is_some();
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = session;
        derived
    }

    /// Drop the selection and its directory cache.
    pub fn clear(&self) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(Session::empty());
    }

    /// Context of the current session.
    pub fn context(&self) -> Option<FolderContext> {
        self.current_session()
            .folder
            .as_ref()
            .map(|folder| folder.context.clone())
    }

    /// Directory prefixes cached by the current session.
    pub fn cached_prefixes(&self) -> Vec<String> {
        self.current_session()
            .folder
            .as_ref()
            .map(|folder| folder.cache.prefixes())
            .unwrap_or_default()
    }

    pub fn stats(&self) -> ServeStats {
        ServeStats {
            served: self.served.load(Ordering::Relaxed),
            bytes: self.served_bytes.load(Ordering::Relaxed),
        }
    }

    /// Answer a request, or `None` to let the engine fetch it normally.
    ///
    /// Never panics and never returns an error: every failure inside the
    /// pipeline becomes a 404 or 500 descriptor.
    pub fn intercept(&self, request: &InterceptRequest) -> Option<HttpResponseDescriptor> {
        let url = Url::parse(&request.url).ok()?;
        let is_local = url.scheme() == "https"
            && url
                .host_str()
                .is_some_and(|host| host.eq_ignore_ascii_case(&self.config.host));
        if !is_local {
            return None;
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.serve(&url, request)));
        Some(outcome.unwrap_or_else(|_| {
            log::error!("panic while serving {url}");
            HttpResponseDescriptor::server_error("Exception while serving resource: provider panicked")
        }))
    }

    fn current_session(&self) -> Arc<Session> {
        Arc::clone(&self.session.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn serve(&self, url: &Url, request: &InterceptRequest) -> HttpResponseDescriptor {
        let started = Instant::now();
        let session = self.current_session();

        let Some(folder) = session.folder.as_ref() else {
            if !session.announced.swap(true, Ordering::Relaxed) {
                log::error!(
                    "no folder context (folder={:?} file={:?})",
                    session.folder_uri,
                    session.file_uri
                );
            }
            return HttpResponseDescriptor::not_found(url.as_str());
        };
        if !session.announced.swap(true, Ordering::Relaxed) {
            log::debug!(
                "folder context tree={} base={}",
                folder.context.tree_uri(),
                folder.context.base_document_id()
            );
        }

        let path = url.path();
        let resolve_started = Instant::now();
        let resolved = PathResolver::new(self.provider.as_ref(), &folder.context, &folder.cache)
            .with_fast_path(self.config.fast_path)
            .resolve(path);
        let resolve_time = resolve_started.elapsed();

        let document = match resolved {
            Some(document) if !document.is_directory => document,
            Some(_) => return HttpResponseDescriptor::not_found(url.as_str()),
            None => {
                log::error!(
                    "missing local resource: {url} (base={})",
                    folder.context.base_document_id()
                );
                return HttpResponseDescriptor::not_found(url.as_str());
            },
        };

        let mime_type = guess_mime_type(path);
        let open_started = Instant::now();
        let response = Responder::new(self.provider.as_ref())
            .with_stream_logging(self.config.log_media_streams)
            .respond(
                url.as_str(),
                &document,
                &mime_type,
                &request.method,
                request.header("Range"),
            );
        let open_time = open_started.elapsed();

        self.record(&response, &document);

        let slow = Duration::from_millis(self.config.slow_request_ms);
        let total_time = started.elapsed();
        if total_time >= slow || open_time >= slow {
            log::warn!(
                "slow local: {}ms (resolve={}ms open={}ms) {url}",
                total_time.as_millis(),
                resolve_time.as_millis(),
                open_time.as_millis()
            );
        }
        response
    }

    fn record(&self, response: &HttpResponseDescriptor, document: &ResolvedDocument) {
        let bytes = match response.status_code {
            206 => response
                .header("Content-Length")
                .and_then(|len| len.parse::<u64>().ok()),
            200 => document.size_bytes,
            _ => return,
        };
        let served = self.served.fetch_add(1, Ordering::Relaxed) + 1;
        let total_bytes = match bytes.filter(|&b| b > 0) {
            Some(b) => self.served_bytes.fetch_add(b, Ordering::Relaxed) + b,
            None => self.served_bytes.load(Ordering::Relaxed),
        };

        let interval = Duration::from_millis(self.config.stats_interval_ms);
        let mut last = self.last_stats.lock().unwrap_or_else(PoisonError::into_inner);
        if last.elapsed() > interval {
            log::debug!("local served: count={served} bytes={total_bytes}");
            *last = Instant::now();
        }
    }
}
