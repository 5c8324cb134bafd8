//! Unified error type for the tunerelay application.
//!
//! Every failure mode funnels into [`Error`], which carries enough context
//! for the API layer to derive an HTTP status code via [`Error::http_status`].
//! Failures that occur after response headers have been sent cannot change
//! the status anymore; the relay simply terminates the connection and the
//! client detects the short body through its own length bookkeeping.

use std::fmt;

/// Unified error type covering all failure modes in tunerelay.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The media id does not match the upstream id format.
    #[error("invalid media id: {0}")]
    InvalidIdentifier(String),

    /// The item resolved, but none of its encodings is audio-only.
    #[error("no audio-only encoding for media id: {0}")]
    NoAudioEncoding(String),

    /// An upstream collaborator failed or answered with garbage.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The Range header does not fit the accepted grammar or bounds.
    #[error("malformed range: {0}")]
    MalformedRange(String),

    /// The Range header is syntactically valid but asks for something the
    /// relay deliberately does not serve (multi-range requests).
    #[error("unsupported range: {0}")]
    UnsupportedRange(String),

    /// The upstream byte stream died after headers were already sent.
    #[error("stream aborted: {0}")]
    StreamAborted(String),

    /// The credential lease holds no valid token yet.
    #[error("auth not ready: {0}")]
    AuthNotReady(String),

    /// Request data failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "video", "playlist").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Catch-all for unexpected internal errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    ///
    /// Only meaningful for failures that happen before headers are sent;
    /// [`Error::StreamAborted`] maps to 502 for completeness but is never
    /// turned into a response in practice.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidIdentifier(_) => 400,
            Error::MalformedRange(_) => 400,
            Error::UnsupportedRange(_) => 400,
            Error::Validation(_) => 400,
            Error::NoAudioEncoding(_) => 404,
            Error::NotFound { .. } => 404,
            Error::UpstreamUnavailable(_) => 502,
            Error::StreamAborted(_) => 502,
            Error::AuthNotReady(_) => 503,
            Error::Internal(_) => 500,
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::UpstreamUnavailable`].
    pub fn upstream(message: impl fmt::Display) -> Self {
        Error::UpstreamUnavailable(message.to_string())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
