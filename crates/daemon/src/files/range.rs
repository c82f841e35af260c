//! HTTP `Range` header resolution.
//!
//! Parsing is lenient: a malformed header never fails the
//! request. Unparseable starts reset to 0 and out-of-bounds ends are clamped
//! to the last byte, so the worst case is serving the whole file.

/// Prefix of the only range unit understood.
const BYTES_PREFIX: &str = "bytes=";

/// A resolved, serviceable byte interval of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset (inclusive).
    pub start: u64,
    /// Last byte offset (inclusive). Meaningless when `total == 0`.
    pub end: u64,
    /// Full length of the resource.
    pub total: u64,
    /// Whether the client sent a `Range` header.
    pub partial: bool,
}

impl ByteRange {
    /// Number of bytes to deliver.
    pub fn len(&self) -> u64 {
        if self.total == 0 {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value for the `Content-Range` response header.
    pub fn content_range(&self) -> String {
        if self.total == 0 {
            "bytes */0".to_string()
        } else {
            format!("bytes {}-{}/{}", self.start, self.end, self.total)
        }
    }

    /// 206 when a range was requested, 200 otherwise.
    pub fn status_code(&self) -> u16 {
        if self.partial {
            206
        } else {
            200
        }
    }
}

/// Resolve an optional `Range` header against a known content length.
pub fn resolve(range_header: Option<&str>, total: u64) -> ByteRange {
    let last = total.saturating_sub(1);
    let mut start = 0;
    let mut end = last;

    if let Some(spec) = range_header.and_then(|h| h.strip_prefix(BYTES_PREFIX)) {
        let (start_token, end_token) = match spec.split_once('-') {
            Some((s, e)) => (s, Some(e)),
            None => (spec, None),
        };

        match start_token.trim().parse::<u64>() {
            Ok(parsed) => {
                start = parsed;
                if let Some(token) = end_token.map(str::trim).filter(|t| !t.is_empty()) {
                    match token.parse::<u64>() {
                        Ok(parsed_end) => end = parsed_end,
                        Err(_) => start = 0,
                    }
                }
            }
            Err(_) => start = 0,
        }
    }

    if end > last {
        end = last;
    }
    if start > end {
        start = 0;
    }

    ByteRange {
        start,
        end,
        total,
        partial: range_header.is_some(),
    }
}
