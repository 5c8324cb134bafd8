//! Catalog (playlist metadata) client.
//!
//! Fetches playlist metadata and tracks from the music catalog service,
//! paginating through the track listing in pages of 100. Every request
//! carries a bearer token from the [`CredentialLease`]; while no valid
//! lease is held the client fails fast without touching the network.
//! Rate-limited because pagination can burst.

mod lease;

pub use lease::CredentialLease;

use governor::{Quota, RateLimiter};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::config::CatalogConfig;
use crate::error::{Error, Result};

/// Page size for track listing requests.
const TRACK_PAGE_SIZE: u64 = 100;

/// Connection timeout for catalog requests.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Extract the playlist id from a share URL like
/// `https://music.example.com/playlist/37i9dQZF1DXcBWIGoYBM5M?si=abc`.
pub fn extract_playlist_id(url: &str) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)playlist/([A-Za-z0-9]+)").expect("valid regex"));
    re.captures(url).map(|c| c[1].to_string())
}

/// A playlist as served to the browser client.
#[derive(Debug, Clone, Serialize)]
pub struct Playlist {
    pub name: String,
    pub tracks: Vec<Track>,
}

/// One track row of the playlist table.
#[derive(Debug, Clone, Serialize)]
pub struct Track {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Date the track was added, `YYYY-MM-DD`.
    pub added: String,
    /// Duration formatted `m:ss`.
    pub duration: String,
}

pub struct CatalogClient {
    http: reqwest::Client,
    base_url: String,
    lease: Arc<CredentialLease>,
    limiter: Arc<
        RateLimiter<
            governor::state::NotKeyed,
            governor::state::InMemoryState,
            governor::clock::DefaultClock,
        >,
    >,
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig, lease: Arc<CredentialLease>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECTION_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("failed to build HTTP client with timeout: {e}");
                reqwest::Client::new()
            });

        let quota = Quota::per_second(NonZeroU32::new(10).unwrap());

        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            lease,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        // Fail before the rate limiter so a missing lease never queues.
        let token = self.lease.bearer()?;
        self.limiter.until_ready().await;

        let url = format!("{}{path}", self.base_url);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .query(query)
            .send()
            .await
            .map_err(|e| Error::upstream(format!("catalog request failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(Error::upstream(format!(
                "catalog answered {} for {path}",
                resp.status()
            )));
        }

        resp.json()
            .await
            .map_err(|e| Error::upstream(format!("catalog response parse error: {e}")))
    }

    /// Fetch playlist metadata plus every track, page by page.
    pub async fn playlist(&self, id: &str) -> Result<Playlist> {
        let meta: WirePlaylist = self.get(&format!("/playlists/{id}"), &[]).await?;
        let name = meta.name.unwrap_or_else(|| "Untitled Playlist".to_string());

        let mut tracks = Vec::new();
        let mut offset = 0;
        let mut total = 1;
        while offset < total {
            let page: WireTrackPage = self
                .get(
                    &format!("/playlists/{id}/tracks"),
                    &[
                        ("offset", offset.to_string()),
                        ("limit", TRACK_PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            total = page.total;
            tracks.extend(page.items.into_iter().filter_map(WireItem::into_track));
            offset += TRACK_PAGE_SIZE;
        }

        Ok(Playlist { name, tracks })
    }
}

/// Format milliseconds as `m:ss`.
fn format_duration(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    format!("{minutes}:{seconds:02}")
}

#[derive(Deserialize)]
struct WirePlaylist {
    name: Option<String>,
}

#[derive(Deserialize)]
struct WireTrackPage {
    total: u64,
    #[serde(default)]
    items: Vec<WireItem>,
}

#[derive(Deserialize)]
struct WireItem {
    added_at: Option<String>,
    /// Absent for entries the catalog no longer serves.
    track: Option<WireTrack>,
}

#[derive(Deserialize)]
struct WireTrack {
    name: String,
    #[serde(default)]
    artists: Vec<WireArtist>,
    album: WireAlbum,
    duration_ms: u64,
}

#[derive(Deserialize)]
struct WireArtist {
    name: String,
}

#[derive(Deserialize)]
struct WireAlbum {
    name: String,
}

impl WireItem {
    fn into_track(self) -> Option<Track> {
        let track = self.track?;
        let added = self
            .added_at
            .as_deref()
            .and_then(|ts| ts.split('T').next())
            .unwrap_or("")
            .to_string();

        Some(Track {
            title: track.name,
            artist: track
                .artists
                .into_iter()
                .map(|a| a.name)
                .collect::<Vec<_>>()
                .join(", "),
            album: track.album.name,
            added,
            duration: format_duration(track.duration_ms),
        })
    }
}
