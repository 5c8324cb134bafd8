//! The range-aware audio relay endpoint.
//!
//! `GET /stream/:media_id` resolves the id upstream, bounds the requested
//! span against the selected encoding's length, sends the 206 header set,
//! and pipes the upstream bytes through. Every failure up to the header
//! write maps to a JSON error response; afterwards the connection is the
//! only signal left.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;

use crate::relay::{self, ByteRange};
use crate::resolver::MediaId;
use crate::server::error::AppError;
use crate::server::AppContext;

pub async fn stream_audio(
    State(ctx): State<AppContext>,
    Path(media_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    // Id validation short-circuits before any upstream call.
    let id = MediaId::parse(&media_id)?;

    let info = ctx.resolver.resolve(&id).await?;

    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let range = ByteRange::parse(range_header, info.total_length)?;

    let encoding = info.audio_encoding();
    tracing::debug!(
        %id,
        itag = encoding.itag,
        start = range.start,
        end = range.end,
        total = info.total_length,
        "relaying audio span"
    );

    let stream = ctx.source.open(encoding, range).await?;

    Ok(relay::partial_content(
        range,
        info.total_length,
        encoding.container_mime(),
        stream,
    ))
}
