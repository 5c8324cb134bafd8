//! Playlist proxy endpoint.

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::catalog::{extract_playlist_id, Playlist};
use crate::error::Error;
use crate::server::error::AppError;
use crate::server::AppContext;

#[derive(Deserialize)]
pub struct PlaylistRequest {
    url: Option<String>,
}

/// `POST /api/playlist` with `{ "url": "<share url>" }`.
pub async fn fetch_playlist(
    State(ctx): State<AppContext>,
    Json(req): Json<PlaylistRequest>,
) -> Result<Json<Playlist>, AppError> {
    let url = req
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| Error::Validation("missing playlist URL".into()))?;

    let id = extract_playlist_id(&url)
        .ok_or_else(|| Error::Validation("invalid playlist URL format".into()))?;

    let playlist = ctx.catalog.playlist(&id).await?;

    tracing::debug!(playlist = %id, tracks = playlist.tracks.len(), "playlist fetched");
    Ok(Json(playlist))
}
