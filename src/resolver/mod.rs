//! Media id resolution against the upstream metadata service.
//!
//! One player-metadata request per resolve; no retries and no caching.
//! Transient upstream failures surface as [`Error::UpstreamUnavailable`]
//! and retry policy is left to the caller.

mod types;

pub use types::{AudioQuality, Encoding, MediaId, MediaInfo};

use serde::Deserialize;
use std::time::Duration;

use crate::error::{Error, Result};

/// Connection timeout for metadata requests.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolves a validated [`MediaId`] to playable metadata.
#[async_trait::async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, id: &MediaId) -> Result<MediaInfo>;
}

/// HTTP resolver backed by the upstream player endpoint.
pub struct UpstreamResolver {
    http: reqwest::Client,
    base_url: String,
}

impl UpstreamResolver {
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECTION_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("failed to build HTTP client with timeout: {e}");
                reqwest::Client::new()
            });

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Resolver for UpstreamResolver {
    async fn resolve(&self, id: &MediaId) -> Result<MediaInfo> {
        let url = format!("{}/player/{id}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::upstream(format!("player request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::upstream(format!(
                "player endpoint answered {} for {id}",
                resp.status()
            )));
        }

        let player: PlayerResponse = resp
            .json()
            .await
            .map_err(|e| Error::upstream(format!("player response parse error: {e}")))?;

        let encodings = player
            .adaptive_formats
            .into_iter()
            .map(WireFormat::into_encoding)
            .collect();

        MediaInfo::from_encodings(id, encodings)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerResponse {
    #[serde(default)]
    adaptive_formats: Vec<WireFormat>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFormat {
    itag: u32,
    mime_type: String,
    #[serde(default)]
    audio_quality: Option<String>,
    #[serde(default)]
    bitrate: u64,
    /// Decimal string on the wire, e.g. `"4320123"`.
    #[serde(default)]
    content_length: Option<String>,
    url: String,
}

impl WireFormat {
    fn into_encoding(self) -> Encoding {
        Encoding {
            itag: self.itag,
            quality: AudioQuality::from_tag(self.audio_quality.as_deref()),
            bitrate: self.bitrate,
            content_length: self.content_length.and_then(|s| s.parse().ok()),
            mime_type: self.mime_type,
            url: self.url,
        }
    }
}
