//! Byte-range header parsing.
//!
//! Browsers send `Range` while seeking audio and video. Only a single range
//! is supported: `bytes=A-B`, `bytes=A-` and the suffix form `bytes=-N`.
//! Results are clamped to the document size before any header is built, so
//! a `Content-Range` produced from a [`ByteRange`] is always valid.

/// A validated inclusive byte interval within a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start_inclusive: u64,
    pub end_inclusive: u64,
    pub total_size: u64,
}

impl ByteRange {
    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end_inclusive - self.start_inclusive + 1
    }

    /// Never true: a parsed range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value for the `Content-Range` header.
    pub fn content_range(&self) -> String {
        format!(
            "bytes {}-{}/{}",
            self.start_inclusive, self.end_inclusive, self.total_size
        )
    }
}

/// Parse a `Range` header against a known total size.
///
/// Returns `None` for anything that cannot be served as a single satisfiable
/// range; the caller then serves the whole document.
pub fn parse_range(header: &str, total_size: u64) -> Option<ByteRange> {
    let raw = header.trim();
    let prefix = raw.get(..6)?;
    if !prefix.eq_ignore_ascii_case("bytes=") {
        return None;
    }
    let spec = raw[6..].trim();
    if spec.is_empty() || spec.contains(',') {
        return None;
    }
    let (start_part, end_part) = spec.split_once('-')?;
    let (start_part, end_part) = (start_part.trim(), end_part.trim());

    if total_size == 0 {
        return None;
    }

    let (start, end) = if start_part.is_empty() {
        // Suffix form: the last N bytes, whole document if N overshoots.
        let suffix: u64 = end_part.parse().ok()?;
        if suffix == 0 {
            return None;
        }
        let suffix = suffix.min(total_size);
        (total_size - suffix, total_size - 1)
    } else {
        let start: u64 = start_part.parse().ok()?;
        let end = if end_part.is_empty() {
            total_size - 1
        } else {
            end_part.parse().ok()?
        };
        (start, end)
    };

    if start >= total_size {
        return None;
    }
    let end = end.min(total_size - 1);
    if end < start {
        return None;
    }
    Some(ByteRange {
        start_inclusive: start,
        end_inclusive: end,
        total_size,
    })
}
