//! HTTP Range header grammar for the relay.
//!
//! Accepted forms, resolved against the known total length:
//! - absent header        -> the whole resource
//! - `bytes=START-`       -> START through the last byte
//! - `bytes=START-END`    -> as given, inclusive
//!
//! Suffix ranges (`bytes=-500`) are not part of the grammar and fail as
//! malformed. Multi-range requests (`bytes=0-10,20-30`) are rejected as
//! unsupported rather than silently truncated to the first span.

use crate::error::{Error, Result};

/// Inclusive byte span into a resource of known total length.
///
/// Invariant: `start <= end < total_length`, enforced by [`ByteRange::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Resolve a raw `Range` header value against `total_length`.
    pub fn parse(header: Option<&str>, total_length: u64) -> Result<Self> {
        if total_length == 0 {
            return Err(Error::MalformedRange(
                "no satisfiable range in an empty resource".into(),
            ));
        }

        let value = match header {
            None => {
                return Ok(Self {
                    start: 0,
                    end: total_length - 1,
                })
            }
            Some(v) => v.trim(),
        };

        let ranges = value
            .strip_prefix("bytes=")
            .ok_or_else(|| Error::MalformedRange(format!("missing bytes= unit in {value:?}")))?;

        if ranges.contains(',') {
            return Err(Error::UnsupportedRange(format!(
                "multi-range request {value:?}"
            )));
        }

        let (start_str, end_str) = ranges
            .split_once('-')
            .ok_or_else(|| Error::MalformedRange(format!("missing - separator in {value:?}")))?;

        // Suffix form `bytes=-N` is a documented limitation of this relay.
        if start_str.is_empty() {
            return Err(Error::MalformedRange(format!(
                "suffix ranges are not supported: {value:?}"
            )));
        }

        let start: u64 = start_str
            .trim()
            .parse()
            .map_err(|_| Error::MalformedRange(format!("bad start bound in {value:?}")))?;

        let end: u64 = if end_str.trim().is_empty() {
            total_length - 1
        } else {
            end_str
                .trim()
                .parse()
                .map_err(|_| Error::MalformedRange(format!("bad end bound in {value:?}")))?
        };

        if start > end {
            return Err(Error::MalformedRange(format!(
                "start {start} past end {end}"
            )));
        }
        if end >= total_length {
            return Err(Error::MalformedRange(format!(
                "end {end} out of bounds for length {total_length}"
            )));
        }

        Ok(Self { start, end })
    }

    /// Number of bytes in the span.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }
}
