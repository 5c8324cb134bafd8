//! Keyword search endpoint.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::resolver::MediaId;
use crate::server::error::AppError;
use crate::server::AppContext;

#[derive(Deserialize)]
pub struct SearchRequest {
    query: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub media_id: MediaId,
    pub title: String,
}

/// `POST /api/search` with `{ "query": "<free text>" }`.
/// Answers the top candidate or 404 when nothing playable matches.
pub async fn search_video(
    State(ctx): State<AppContext>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = req
        .query
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| Error::Validation("missing query".into()))?;

    let hit = ctx
        .search
        .top_hit(&query)
        .await?
        .ok_or_else(|| Error::not_found("video", &query))?;

    Ok(Json(SearchResponse {
        media_id: hit.media_id,
        title: hit.title,
    }))
}
