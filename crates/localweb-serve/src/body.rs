//! Response bodies.
//!
//! A body owns the provider handle it reads from. Closing it, explicitly or
//! by dropping it, releases the handle no matter how much was read: the
//! engine abandons media streams mid-read whenever the user seeks or
//! navigates away. Closing twice is a no-op, and a closed body reads as
//! end-of-stream.

use std::fmt;
use std::io::{self, Read};

/// Summary logged when a tracked body closes.
#[derive(Debug, Clone)]
struct CloseLog {
    url: String,
    label: String,
    expected: Option<u64>,
}

/// A lazy, single-consumer response body.
pub struct ResponseBody {
    inner: Option<Box<dyn Read + Send>>,
    read_bytes: u64,
    close_log: Option<CloseLog>,
}

impl ResponseBody {
    /// A body with no bytes (HEAD responses).
    pub fn empty() -> Self {
        Self::from_bytes(Vec::new())
    }

    /// An in-memory body (diagnostic pages).
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::from_reader(Box::new(io::Cursor::new(bytes)))
    }

    /// A body streaming from a provider handle.
    pub fn from_reader(reader: Box<dyn Read + Send>) -> Self {
        Self {
            inner: Some(reader),
            read_bytes: 0,
            close_log: None,
        }
    }

    /// Log read progress against `expected` bytes when the body closes.
    pub fn with_close_log(mut self, url: &str, label: &str, expected: Option<u64>) -> Self {
        self.close_log = Some(CloseLog {
            url: url.to_string(),
            label: label.to_string(),
            expected,
        });
        self
    }

    /// Release the underlying handle. Safe to call any number of times.
    pub fn close(&mut self) {
        let Some(reader) = self.inner.take() else {
            return;
        };
        drop(reader);

        if let Some(ref log) = self.close_log {
            match log.expected {
                Some(expected) if expected > 0 && self.read_bytes < expected => log::warn!(
                    "media stream closed early: read={} expected={expected} {} url={}",
                    self.read_bytes,
                    log.label,
                    log.url
                ),
                expected => log::debug!(
                    "media stream closed: read={} expected={} {} url={}",
                    self.read_bytes,
                    expected.map_or(-1, |e| e as i64),
                    log.label,
                    log.url
                ),
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Bytes handed out so far.
    pub fn bytes_read(&self) -> u64 {
        self.read_bytes
    }

    /// Drain the body and close it.
    pub fn read_to_vec(mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        self.read_to_end(&mut out)?;
        self.close();
        Ok(out)
    }
}

impl Read for ResponseBody {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(reader) = self.inner.as_mut() else {
            return Ok(0);
        };
        let n = reader.read(buf)?;
        self.read_bytes += n as u64;
        Ok(n)
    }
}

impl Drop for ResponseBody {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("closed", &self.is_closed())
            .field("read_bytes", &self.read_bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Reader that counts how many times it has been dropped.
    struct DropCounter {
        data: io::Cursor<Vec<u8>>,
        drops: Arc<AtomicUsize>,
    }

    impl Read for DropCounter {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.data.read(buf)
        }
    }

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn counted(len: usize) -> (ResponseBody, Arc<AtomicUsize>) {
        let drops = Arc::new(AtomicUsize::new(0));
        let reader = DropCounter {
            data: io::Cursor::new(vec![7u8; len]),
            drops: Arc::clone(&drops),
        };
        (ResponseBody::from_reader(Box::new(reader)), drops)
    }

    #[test]
    fn empty_body_reads_nothing() {
        assert!(ResponseBody::empty().read_to_vec().unwrap().is_empty());
    }

    #[test]
    fn from_bytes_round_trip() {
        let body = ResponseBody::from_bytes(b"Not Found".to_vec());
        assert_eq!(body.read_to_vec().unwrap(), b"Not Found");
    }

    #[test]
    fn close_is_idempotent_and_releases_once() {
        let (mut body, drops) = counted(16);
        body.close();
        body.close();
        assert!(body.is_closed());
        drop(body);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn abandoned_body_releases_on_drop() {
        let (mut body, drops) = counted(1024);
        let mut buf = [0u8; 10];
        body.read_exact(&mut buf).unwrap();
        assert_eq!(body.bytes_read(), 10);
        drop(body);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closed_body_reads_eof() {
        let (mut body, _drops) = counted(8);
        body.close();
        let mut buf = [0u8; 4];
        assert_eq!(body.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn close_log_does_not_change_content() {
        let (body, drops) = counted(5);
        let body = body.with_close_log("https://local.web/a.mp4", "full", Some(5));
        assert_eq!(body.read_to_vec().unwrap(), vec![7u8; 5]);
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_shows_state() {
        let body = ResponseBody::empty();
        assert!(format!("{body:?}").contains("closed: false"));
    }
}
