//! Keyword search against the video service.
//!
//! Free text in, top candidate out. Candidates whose id does not pass the
//! [`MediaId`] predicate are skipped so the relay never receives an id it
//! would reject anyway.

use serde::Deserialize;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::resolver::MediaId;

/// Connection timeout for search requests.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// One search candidate.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub media_id: MediaId,
    pub title: String,
}

pub struct SearchClient {
    http: reqwest::Client,
    base_url: String,
}

impl SearchClient {
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

    /// The first candidate with a usable media id, if any.
    pub async fn top_hit(&self, query: &str) -> Result<Option<SearchHit>> {
        let url = format!("{}/search", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .map_err(|e| Error::upstream(format!("search request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::upstream(format!(
                "search endpoint answered {}",
                resp.status()
            )));
        }

        let results: SearchResponse = resp
            .json()
            .await
            .map_err(|e| Error::upstream(format!("search response parse error: {e}")))?;

        let hit = results.items.into_iter().find_map(|item| {
            let media_id = MediaId::parse(&item.video_id).ok()?;
            Some(SearchHit {
                media_id,
                title: item.title,
            })
        });

        Ok(hit)
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    video_id: String,
    #[serde(default)]
    title: String,
}
