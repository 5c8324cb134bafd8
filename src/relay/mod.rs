//! Range-aware relay between the upstream stream host and the client.
//!
//! The relay opens exactly one upstream connection per request, scoped to
//! the resolved byte span, and hands the byte stream to the response body.
//! Hyper pulls chunks on demand, so the upstream read rate follows the
//! client's consumption rate instead of buffering the transfer in memory.
//! Dropping the response body (client disconnect) drops the upstream
//! stream with it, cancelling the transfer; an upstream error after
//! headers are sent aborts the connection without synthesizing bytes.
//! There is no retry or resume; a dropped relay is the client's cue to
//! re-request from the offset it already has.

mod range;

pub use range::ByteRange;

use axum::body::Body;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::resolver::Encoding;

/// Connection timeout for opening the upstream stream.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// The byte stream of one relay session.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Opens an upstream byte stream scoped to one span of one encoding.
///
/// Behind a trait so tests can observe stream lifetime with a double.
#[async_trait::async_trait]
pub trait ByteSource: Send + Sync {
    async fn open(&self, encoding: &Encoding, range: ByteRange) -> Result<ByteStream>;
}

/// Byte source that issues a ranged GET against the encoding's stream URL.
pub struct HttpByteSource {
    http: reqwest::Client,
}

impl HttpByteSource {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECTION_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("failed to build HTTP client with timeout: {e}");
                reqwest::Client::new()
            });
        Self { http }
    }
}

impl Default for HttpByteSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ByteSource for HttpByteSource {
    async fn open(&self, encoding: &Encoding, range: ByteRange) -> Result<ByteStream> {
        let resp = self
            .http
            .get(&encoding.url)
            .header(
                reqwest::header::RANGE,
                format!("bytes={}-{}", range.start, range.end),
            )
            .send()
            .await
            .map_err(|e| Error::upstream(format!("stream open failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::upstream(format!(
                "stream host answered {} for itag {}",
                resp.status(),
                encoding.itag
            )));
        }

        let stream = resp
            .bytes_stream()
            .map_err(|e| Error::StreamAborted(e.to_string()));

        Ok(Box::pin(stream))
    }
}

/// Build the 206 response for a resolved span.
///
/// Headers are fully constructed before the body is attached; nothing
/// mutates them once streaming starts. A span covering the whole resource
/// still answers 206; this relay never falls back to 200.
pub fn partial_content(
    range: ByteRange,
    total_length: u64,
    content_type: &str,
    stream: ByteStream,
) -> Response {
    let body = Body::from_stream(stream);
    (
        StatusCode::PARTIAL_CONTENT,
        [
            (header::CONTENT_TYPE.as_str(), content_type.to_string()),
            (
                header::CONTENT_RANGE.as_str(),
                format!("bytes {}-{}/{}", range.start, range.end, total_length),
            ),
            (header::CONTENT_LENGTH.as_str(), range.len().to_string()),
            (header::ACCEPT_RANGES.as_str(), "bytes".to_string()),
        ],
        body,
    )
        .into_response()
}
