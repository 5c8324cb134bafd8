use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Length of an upstream media id.
const MEDIA_ID_LEN: usize = 11;

/// Opaque identifier for a streamable item on the upstream video service.
///
/// The upstream id format is fixed: exactly 11 characters from
/// `[A-Za-z0-9_-]`. Validation happens at construction so that nothing
/// downstream ever touches the network with a bad id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    /// Validate and wrap a raw id.
    pub fn parse(raw: &str) -> Result<Self> {
        let well_formed = raw.len() == MEDIA_ID_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if well_formed {
            Ok(Self(raw.to_string()))
        } else {
            Err(Error::InvalidIdentifier(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Audio quality tag reported by the upstream metadata service.
///
/// Ordered so that `max()` picks the best rendition; tags the service has
/// not documented rank lowest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AudioQuality {
    Low,
    Medium,
    High,
}

impl AudioQuality {
    /// Parse the upstream tag. Unknown tags rank as [`AudioQuality::Low`].
    pub fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("AUDIO_QUALITY_HIGH") => AudioQuality::High,
            Some("AUDIO_QUALITY_MEDIUM") => AudioQuality::Medium,
            _ => AudioQuality::Low,
        }
    }
}

/// One available rendition of a media item.
#[derive(Debug, Clone)]
pub struct Encoding {
    /// Upstream format selector token.
    pub itag: u32,
    /// Full mime type including codec parameters,
    /// e.g. `audio/webm; codecs="opus"`.
    pub mime_type: String,
    pub quality: AudioQuality,
    pub bitrate: u64,
    /// Byte length of this rendition, when the upstream reports one.
    pub content_length: Option<u64>,
    /// Direct stream URL scoped to this rendition.
    pub url: String,
}

impl Encoding {
    /// Whether this rendition carries audio only (no video track).
    pub fn is_audio_only(&self) -> bool {
        self.mime_type.starts_with("audio/")
    }

    /// The container mime type with codec parameters stripped,
    /// suitable for a `Content-Type` header.
    pub fn container_mime(&self) -> &str {
        self.mime_type
            .split(';')
            .next()
            .unwrap_or(&self.mime_type)
            .trim()
    }
}

/// Resolved metadata for one media id: every rendition the upstream
/// reported plus the audio rendition the relay will serve.
///
/// Built once per request and never cached.
#[derive(Debug, Clone)]
pub struct MediaInfo {
    pub encodings: Vec<Encoding>,
    /// Index into `encodings` of the selected audio rendition.
    audio: usize,
    /// Byte length of the selected rendition.
    pub total_length: u64,
}

impl MediaInfo {
    /// Select the best audio-only rendition and fix the total length.
    ///
    /// Highest quality wins; bitrate breaks ties. A rendition without a
    /// known byte length cannot be range-served, so a winner missing one
    /// surfaces as an upstream failure rather than a silent fallback.
    pub fn from_encodings(id: &MediaId, encodings: Vec<Encoding>) -> Result<Self> {
        let audio = encodings
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_audio_only())
            .max_by_key(|(_, e)| (e.quality, e.bitrate))
            .map(|(i, _)| i)
            .ok_or_else(|| Error::NoAudioEncoding(id.to_string()))?;

        let total_length = encodings[audio].content_length.ok_or_else(|| {
            Error::upstream(format!(
                "no content length for itag {} of {id}",
                encodings[audio].itag
            ))
        })?;

        Ok(Self {
            encodings,
            audio,
            total_length,
        })
    }

    /// The rendition the relay streams from.
    pub fn audio_encoding(&self) -> &Encoding {
        &self.encodings[self.audio]
    }
}
