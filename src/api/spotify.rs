use super::{retry_after_secs, Provider};
use crate::models::{Playlist, ProviderKind, SearchResult, Track};
use crate::util::truncate_body;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::env;

/// Spotify provider backed by the Spotify Web API.
/// The access token is supplied by the caller; refresh is the auth collaborator's job.
/// The API base may be overridden via the SPOTIFY_API_BASE env var or `with_api_base` (tests).
pub struct SpotifyProvider {
    client: Client,
    access_token: String,
    api_base: String,
    user_id: tokio::sync::Mutex<Option<String>>,
}

impl SpotifyProvider {
    pub fn new(access_token: String) -> Self {
        Self::with_api_base(access_token, Self::default_api_base())
    }

    pub fn with_api_base(access_token: String, api_base: String) -> Self {
        Self::with_client(Client::new(), access_token, api_base)
    }

    pub fn with_client(client: Client, access_token: String, api_base: String) -> Self {
        Self {
            client,
            access_token,
            api_base: api_base.trim_end_matches('/').to_string(),
            user_id: tokio::sync::Mutex::new(None),
        }
    }

    fn default_api_base() -> String {
        // include v1 path by default
        env::var("SPOTIFY_API_BASE").unwrap_or_else(|_| "https://api.spotify.com/v1".into())
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    /// GET a Spotify endpoint and decode the JSON body, mapping error statuses.
    async fn get_json(&self, url: &str, what: &str) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(url)
            .header(AUTHORIZATION, self.bearer())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_for(what, resp).await);
        }
        Ok(resp.json().await?)
    }

    /// Map a non-2xx response to an error carrying Spotify's `error.message`
    /// rather than the raw body.
    async fn error_for(what: &str, resp: reqwest::Response) -> anyhow::Error {
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry_after_secs(&resp);
            return anyhow!("{} rate_limited: retry_after={:?}", what, retry_after);
        }
        let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
        match body["error"]["message"].as_str().or_else(|| body["error"].as_str()) {
            Some(msg) => anyhow!("{} failed: {} => {}", what, status, truncate_body(msg, 200)),
            None => anyhow!("{} failed: {}", what, status),
        }
    }

    async fn get_user_id(&self) -> Result<String> {
        let mut g = self.user_id.lock().await;
        if let Some(u) = g.as_ref() {
            return Ok(u.clone());
        }
        let url = format!("{}/me", self.api_base);
        let j = self.get_json(&url, "fetch /me").await?;
        let id = j["id"]
            .as_str()
            .ok_or_else(|| anyhow!("no id in /me response"))?
            .to_string();
        *g = Some(id.clone());
        Ok(id)
    }

    /// Convert one `items[].track` object into a Track. Returns None for
    /// removed entries (null track) and podcast episodes.
    fn track_from_json(t: &serde_json::Value) -> Option<Track> {
        if t.is_null() {
            return None;
        }
        if t["type"].as_str().map_or(false, |ty| ty == "episode") {
            return None;
        }
        let title = t["name"].as_str().unwrap_or("").trim().to_string();
        if title.is_empty() {
            return None;
        }
        // Local files have no id but keep a spotify:local: uri.
        let source_id = t["id"]
            .as_str()
            .or_else(|| t["uri"].as_str())
            .unwrap_or("")
            .to_string();
        let artists = t["artists"]
            .as_array()
            .map(|a| {
                a.iter()
                    .filter_map(|ar| ar["name"].as_str())
                    .filter(|n| !n.trim().is_empty())
                    .map(|n| n.to_string())
                    .collect()
            })
            .unwrap_or_default();
        Some(Track {
            title,
            artists,
            duration_ms: t["duration_ms"].as_u64().unwrap_or(0),
            source_id,
        })
    }

    fn search_result_from_json(t: &serde_json::Value) -> Option<SearchResult> {
        let uri = t["uri"].as_str()?;
        Some(SearchResult {
            destination_id: uri.to_string(),
            title: t["name"].as_str().unwrap_or("").to_string(),
            artists: t["artists"]
                .as_array()
                .map(|a| {
                    a.iter()
                        .filter_map(|ar| ar["name"].as_str())
                        .map(|n| n.to_string())
                        .collect()
                })
                .unwrap_or_default(),
            duration_ms: t["duration_ms"].as_u64().unwrap_or(0),
        })
    }
}

#[async_trait]
impl Provider for SpotifyProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Spotify
    }

    fn is_authenticated(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    /// List all playlists for the authenticated user
    async fn list_playlists(&self) -> Result<Vec<Playlist>> {
        let mut playlists = Vec::new();
        let mut next_url = Some(format!("{}/me/playlists?limit=50", self.api_base));
        while let Some(url) = next_url {
            let j = self.get_json(&url, "list playlists").await?;
            if let Some(items) = j["items"].as_array() {
                for pl in items {
                    let id = pl["id"].as_str().unwrap_or("").to_string();
                    if id.is_empty() {
                        continue;
                    }
                    let track_count = pl["tracks"]["total"]
                        .as_u64()
                        .or_else(|| pl["items"]["total"].as_u64())
                        .unwrap_or(0);
                    playlists.push(Playlist {
                        id,
                        name: pl["name"].as_str().unwrap_or("").to_string(),
                        track_count,
                        owner_provider: ProviderKind::Spotify,
                    });
                }
            }
            next_url = j["next"].as_str().map(|s| s.to_string());
        }
        debug!("Spotify: listed {} playlists", playlists.len());
        Ok(playlists)
    }

    /// List all tracks for a given Spotify playlist, keeping duplicates.
    /// Source ids are `<track id>#<playlist position>` so repeated tracks stay distinct.
    async fn list_tracks(&self, playlist_id: &str) -> Result<Vec<Track>> {
        let mut tracks = Vec::new();
        let mut next: Option<String> = Some(format!(
            "{}/playlists/{}/tracks?fields=items(track(id,uri,name,type,duration_ms,artists(name))),next&limit=100",
            self.api_base,
            urlencoding::encode(playlist_id)
        ));
        let mut skipped = 0usize;
        let mut position = 0usize;
        while let Some(url) = next {
            let j = self.get_json(&url, "list playlist tracks").await?;
            if let Some(items) = j["items"].as_array() {
                for it in items {
                    match Self::track_from_json(&it["track"]) {
                        Some(mut t) => {
                            t.source_id = format!("{}#{}", t.source_id, position);
                            tracks.push(t);
                        }
                        None => skipped += 1,
                    }
                    position += 1;
                }
            }
            next = j["next"].as_str().map(|s| s.to_string());
        }
        if skipped > 0 {
            debug!(
                "Spotify playlist {}: skipped {} unavailable or non-music entries",
                playlist_id, skipped
            );
        }
        Ok(tracks)
    }

    async fn create_playlist(&self, name: &str, description: &str) -> Result<String> {
        let user_id = self.get_user_id().await?;
        let url = format!(
            "{}/users/{}/playlists",
            self.api_base,
            url::form_urlencoded::byte_serialize(user_id.as_bytes()).collect::<String>()
        );
        let body = json!({
            "name": name,
            "description": description,
            "public": false
        });
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.bearer())
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_for("create playlist", resp).await);
        }
        let j: serde_json::Value = resp.json().await?;
        let id = j["id"]
            .as_str()
            .ok_or_else(|| anyhow!("no id"))?
            .to_string();
        Ok(id)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let url = format!(
            "{}/search?q={}&type=track&limit={}",
            self.api_base,
            urlencoding::encode(query),
            limit.clamp(1, 50)
        );
        let j = self.get_json(&url, "search").await?;
        let results: Vec<SearchResult> = j["tracks"]["items"]
            .as_array()
            .map(|items| items.iter().filter_map(Self::search_result_from_json).collect())
            .unwrap_or_default();
        debug!("Spotify search '{}' returned {} results", query, results.len());
        Ok(results)
    }

    async fn add_track(&self, playlist_id: &str, candidate_id: &str) -> Result<()> {
        let url = format!(
            "{}/playlists/{}/tracks",
            self.api_base,
            urlencoding::encode(playlist_id)
        );
        let body = json!({ "uris": [candidate_id] });
        let resp = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.bearer())
            .json(&body)
            .send()
            .await?;
        if resp.status() == StatusCode::TOO_MANY_REQUESTS {
            warn!("Spotify rate limited adding to {}", playlist_id);
        }
        if !resp.status().is_success() {
            return Err(Self::error_for("add tracks", resp).await);
        }
        Ok(())
    }
}
