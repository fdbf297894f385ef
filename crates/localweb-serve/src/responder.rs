//! HTTP-semantics responses for resolved documents.
//!
//! The responder turns a resolved document into a status line, headers and
//! a lazy body. It never fails past its boundary: an error while opening or
//! positioning a stream becomes a 500 descriptor with the message as a
//! plain-text body.

use std::io::{self, Read, Seek, SeekFrom};

use localweb_provider::DocumentProvider;
use localweb_types::error::Result;

use crate::body::ResponseBody;
use crate::mime::{charset_for, is_media};
use crate::range::{ByteRange, parse_range};
use crate::resolver::ResolvedDocument;

/// Everything the rendering engine needs to answer one request.
#[derive(Debug)]
pub struct HttpResponseDescriptor {
    pub status_code: u16,
    pub reason_phrase: &'static str,
    pub mime_type: String,
    pub charset: Option<&'static str>,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl HttpResponseDescriptor {
    /// 404 with a diagnostic body naming the requested URL.
    pub fn not_found(url: &str) -> Self {
        Self::plain_text(404, "Not Found", format!("Not Found: {url}"))
    }

    /// 500 with `message` as the body.
    pub fn server_error(message: &str) -> Self {
        Self::plain_text(500, "Internal Server Error", message.to_string())
    }

    fn plain_text(status_code: u16, reason_phrase: &'static str, text: String) -> Self {
        Self {
            status_code,
            reason_phrase,
            mime_type: "text/plain".to_string(),
            charset: Some("utf-8"),
            headers: vec![("Cache-Control".to_string(), "no-store".to_string())],
            body: ResponseBody::from_bytes(text.into_bytes()),
        }
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Builds responses from one provider.
pub struct Responder<'a, P: DocumentProvider + ?Sized> {
    provider: &'a P,
    log_streams: bool,
}

impl<'a, P: DocumentProvider + ?Sized> Responder<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        Self {
            provider,
            log_streams: true,
        }
    }

    /// Toggle media/range logging, close logging included.
    pub fn with_stream_logging(mut self, enabled: bool) -> Self {
        self.log_streams = enabled;
        self
    }

    /// Respond to `method` on a resolved, non-directory document.
    ///
    /// A valid `Range` against a known size yields 206; any other range
    /// header is ignored and the whole document is served with 200. `HEAD`
    /// carries the same headers with an empty body.
    pub fn respond(
        &self,
        url: &str,
        document: &ResolvedDocument,
        mime_type: &str,
        method: &str,
        range_header: Option<&str>,
    ) -> HttpResponseDescriptor {
        match self.try_respond(url, document, mime_type, method, range_header) {
            Ok(response) => response,
            Err(e) => {
                log::error!("failed to serve {url}: {e}");
                HttpResponseDescriptor::server_error(&format!(
                    "Exception while serving resource: {e}"
                ))
            },
        }
    }

    fn try_respond(
        &self,
        url: &str,
        document: &ResolvedDocument,
        mime_type: &str,
        method: &str,
        range_header: Option<&str>,
    ) -> Result<HttpResponseDescriptor> {
        let is_head = method.eq_ignore_ascii_case("HEAD");
        let range_header = range_header.filter(|h| !h.trim().is_empty());
        // Providers report 0 when they do not know the size.
        let total_size = document.size_bytes.filter(|&size| size > 0);
        let should_log =
            self.log_streams && (is_media(mime_type) || range_header.is_some() || is_head);

        let range = range_header
            .zip(total_size)
            .and_then(|(header, size)| parse_range(header, size));

        let response = match range {
            Some(range) => {
                let headers = vec![
                    header("Accept-Ranges", "bytes"),
                    header("Content-Range", &range.content_range()),
                    header("Content-Length", &range.len().to_string()),
                    header("Cache-Control", "no-store"),
                ];
                let body = if is_head {
                    ResponseBody::empty()
                } else {
                    let body = ResponseBody::from_reader(self.open_range(document, &range)?);
                    if should_log {
                        let label = format!("range={}-{}", range.start_inclusive, range.end_inclusive);
                        body.with_close_log(url, &label, Some(range.len()))
                    } else {
                        body
                    }
                };
                HttpResponseDescriptor {
                    status_code: 206,
                    reason_phrase: "Partial Content",
                    mime_type: mime_type.to_string(),
                    charset: charset_for(mime_type),
                    headers,
                    body,
                }
            },
            None => {
                let mut headers = vec![
                    header("Accept-Ranges", "bytes"),
                    header("Cache-Control", "no-store"),
                ];
                if let Some(size) = total_size {
                    headers.push(header("Content-Length", &size.to_string()));
                }
                let body = if is_head {
                    ResponseBody::empty()
                } else {
                    let body = ResponseBody::from_reader(self.provider.open_input_stream(&document.uri)?);
                    if should_log {
                        body.with_close_log(url, "full", total_size)
                    } else {
                        body
                    }
                };
                HttpResponseDescriptor {
                    status_code: 200,
                    reason_phrase: "OK",
                    mime_type: mime_type.to_string(),
                    charset: charset_for(mime_type),
                    headers,
                    body,
                }
            },
        };

        if should_log {
            log::debug!(
                "serve: {} mime={mime_type} size={} range={} -> {} cr={} cl={} url={url}",
                method.to_ascii_uppercase(),
                total_size.map_or(-1, |s| s as i64),
                range_header.unwrap_or(""),
                response.status_code,
                response.header("Content-Range").unwrap_or(""),
                response.header("Content-Length").unwrap_or(""),
            );
        }
        Ok(response)
    }

    /// Open a descriptor positioned at the range start and capped to its
    /// length. Descriptors that refuse to seek are skipped forward.
    fn open_range(
        &self,
        document: &ResolvedDocument,
        range: &ByteRange,
    ) -> Result<Box<dyn Read + Send>> {
        let mut fd = self.provider.open_file_descriptor(&document.uri)?;
        if let Err(e) = fd.seek(SeekFrom::Start(range.start_inclusive)) {
            log::debug!("seek failed ({e}), skipping {} bytes", range.start_inclusive);
            io::copy(&mut (&mut fd).take(range.start_inclusive), &mut io::sink())?;
        }
        Ok(Box::new(fd.take(range.len())))
    }
}

fn header(name: &str, value: &str) -> (String, String) {
    (name.to_string(), value.to_string())
}
