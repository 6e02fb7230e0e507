use super::{retry_after_secs, Provider};
use crate::matcher::strip_title_noise;
use crate::models::{Playlist, ProviderKind, SearchResult, Track};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::collections::HashMap;
use std::env;
use url::Url;

static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?)?$").unwrap()
});
static ARTIST_SEPARATORS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*(?:,|\s&\s|\s(?:feat\.?|ft\.?|featuring)\s)\s*").unwrap());
static CHANNEL_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\s+-\s+topic|\s*vevo|\s+official)$").unwrap());

/// Titles YouTube reports for entries the user can no longer play.
const UNAVAILABLE_TITLES: [&str; 2] = ["Deleted video", "Private video"];

/// Parse an ISO-8601 duration ("PT3M45S") into milliseconds.
pub fn parse_iso8601_duration(s: &str) -> Option<u64> {
    let caps = ISO_DURATION.captures(s.trim())?;
    let num = |i: usize| -> f64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    let secs = num(1) * 86_400.0 + num(2) * 3_600.0 + num(3) * 60.0 + num(4);
    Some((secs * 1000.0).round() as u64)
}

/// Undo the HTML escaping YouTube applies to search snippet titles.
fn unescape_html(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

fn clean_channel_name(channel: &str) -> String {
    CHANNEL_SUFFIX.replace(channel.trim(), "").trim().to_string()
}

fn split_artists(s: &str) -> Vec<String> {
    ARTIST_SEPARATORS
        .split(s)
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .map(|a| a.to_string())
        .collect()
}

/// Derive (artists, title) from video metadata.
///
/// "Artist - Title (Official Video)" splits on the first dash; otherwise
/// the uploading channel is taken as the artist ("Artist - Topic" channels
/// carry plain song titles).
pub fn split_video_title(video_title: &str, channel: &str) -> (Vec<String>, String) {
    let title = unescape_html(video_title);
    for sep in [" - ", " – ", " — "] {
        if let Some((left, right)) = title.split_once(sep) {
            let artists = split_artists(left);
            let song = strip_title_noise(right);
            if !artists.is_empty() && !song.is_empty() {
                return (artists, song);
            }
        }
    }
    let channel = clean_channel_name(&unescape_html(channel));
    let artists = if channel.is_empty() { Vec::new() } else { vec![channel] };
    (artists, strip_title_noise(&title))
}

/// YouTube provider backed by the YouTube Data API v3.
/// The API base may be overridden via the YOUTUBE_API_BASE env var or `with_api_base` (tests).
pub struct YoutubeProvider {
    client: Client,
    access_token: String,
    api_base: String,
}

impl YoutubeProvider {
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
        }
    }

    fn default_api_base() -> String {
        env::var("YOUTUBE_API_BASE").unwrap_or_else(|_| "https://www.googleapis.com/youtube/v3".into())
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<Url> {
        let url = Url::parse_with_params(&format!("{}/{}", self.api_base, path), params)?;
        Ok(url)
    }

    /// Turn a non-2xx response into an error carrying the API's reason code
    /// (e.g. quotaExceeded) but not the raw body.
    async fn error_for(what: &str, resp: reqwest::Response) -> anyhow::Error {
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = retry_after_secs(&resp);
            return anyhow!("youtube {} rate_limited: retry_after={:?}", what, retry_after);
        }
        let body: serde_json::Value = resp.json().await.unwrap_or(serde_json::Value::Null);
        match body["error"]["errors"][0]["reason"].as_str() {
            Some(reason) => anyhow!("youtube {} failed: {} ({})", what, status, reason),
            None => anyhow!("youtube {} failed: {}", what, status),
        }
    }

    async fn get_json(&self, url: Url, what: &str) -> Result<serde_json::Value> {
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

    /// Look up durations for up to 50 video ids per request.
    async fn video_durations(&self, ids: &[String]) -> Result<HashMap<String, u64>> {
        let mut out = HashMap::new();
        for chunk in ids.chunks(50) {
            let joined = chunk.join(",");
            let url = self.endpoint(
                "videos",
                &[("part", "contentDetails"), ("id", joined.as_str()), ("maxResults", "50")],
            )?;
            let j = self.get_json(url, "video lookup").await?;
            if let Some(items) = j["items"].as_array() {
                for v in items {
                    let id = v["id"].as_str().unwrap_or("");
                    let dur = v["contentDetails"]["duration"]
                        .as_str()
                        .and_then(parse_iso8601_duration);
                    if let Some(d) = dur.filter(|_| !id.is_empty()) {
                        out.insert(id.to_string(), d);
                    }
                }
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl Provider for YoutubeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Youtube
    }

    fn is_authenticated(&self) -> bool {
        !self.access_token.trim().is_empty()
    }

    async fn list_playlists(&self) -> Result<Vec<Playlist>> {
        let mut playlists = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params = vec![
                ("part", "snippet,contentDetails"),
                ("mine", "true"),
                ("maxResults", "50"),
            ];
            if let Some(tok) = page_token.as_deref() {
                params.push(("pageToken", tok));
            }
            let url = self.endpoint("playlists", &params)?;
            let j = self.get_json(url, "list playlists").await?;
            if let Some(items) = j["items"].as_array() {
                for pl in items {
                    let id = pl["id"].as_str().unwrap_or("").to_string();
                    if id.is_empty() {
                        continue;
                    }
                    playlists.push(Playlist {
                        id,
                        name: pl["snippet"]["title"].as_str().unwrap_or("").to_string(),
                        track_count: pl["contentDetails"]["itemCount"].as_u64().unwrap_or(0),
                        owner_provider: ProviderKind::Youtube,
                    });
                }
            }
            page_token = j["nextPageToken"].as_str().map(|s| s.to_string());
            if page_token.is_none() {
                break;
            }
        }
        debug!("YouTube: listed {} playlists", playlists.len());
        Ok(playlists)
    }

    async fn list_tracks(&self, playlist_id: &str) -> Result<Vec<Track>> {
        // (playlist item id, video id, title, channel)
        let mut entries: Vec<(String, String, String, String)> = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params = vec![
                ("part", "snippet,contentDetails"),
                ("playlistId", playlist_id),
                ("maxResults", "50"),
            ];
            if let Some(tok) = page_token.as_deref() {
                params.push(("pageToken", tok));
            }
            let url = self.endpoint("playlistItems", &params)?;
            let j = self.get_json(url, "list playlist items").await?;
            if let Some(items) = j["items"].as_array() {
                for it in items {
                    let title = it["snippet"]["title"].as_str().unwrap_or("");
                    if title.is_empty() || UNAVAILABLE_TITLES.contains(&title) {
                        debug!("YouTube playlist {}: skipping unavailable entry", playlist_id);
                        continue;
                    }
                    let video_id = it["contentDetails"]["videoId"]
                        .as_str()
                        .or_else(|| it["snippet"]["resourceId"]["videoId"].as_str())
                        .unwrap_or("")
                        .to_string();
                    let item_id = it["id"].as_str().map(|s| s.to_string()).unwrap_or_else(|| video_id.clone());
                    let channel = it["snippet"]["videoOwnerChannelTitle"].as_str().unwrap_or("");
                    entries.push((item_id, video_id, title.to_string(), channel.to_string()));
                }
            }
            page_token = j["nextPageToken"].as_str().map(|s| s.to_string());
            if page_token.is_none() {
                break;
            }
        }

        let ids: Vec<String> = entries
            .iter()
            .filter(|e| !e.1.is_empty())
            .map(|e| e.1.clone())
            .collect();
        let durations = match self.video_durations(&ids).await {
            Ok(d) => d,
            // scoring copes with unknown durations
            Err(e) => {
                warn!("YouTube duration lookup for playlist {} failed: {:#}", playlist_id, e);
                HashMap::new()
            }
        };

        Ok(entries
            .into_iter()
            .map(|(item_id, video_id, title, channel)| {
                let (artists, song) = split_video_title(&title, &channel);
                Track {
                    title: song,
                    artists,
                    duration_ms: durations.get(&video_id).copied().unwrap_or(0),
                    source_id: item_id,
                }
            })
            .collect())
    }

    async fn create_playlist(&self, name: &str, description: &str) -> Result<String> {
        let url = self.endpoint("playlists", &[("part", "snippet,status")])?;
        let body = json!({
            "snippet": { "title": name, "description": description },
            "status": { "privacyStatus": "private" }
        });
        let resp = self
            .client
            .post(url)
            .header(AUTHORIZATION, self.bearer())
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_for("create playlist", resp).await);
        }
        let j: serde_json::Value = resp.json().await?;
        let id = j["id"]
            .as_str()
            .ok_or_else(|| anyhow!("no id in created playlist"))?
            .to_string();
        Ok(id)
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        let max = limit.clamp(1, 50).to_string();
        let url = self.endpoint(
            "search",
            &[
                ("part", "snippet"),
                ("type", "video"),
                ("videoCategoryId", "10"),
                ("maxResults", max.as_str()),
                ("q", query),
            ],
        )?;
        let j = self.get_json(url, "search").await?;
        let mut results: Vec<SearchResult> = j["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|it| {
                        let video_id = it["id"]["videoId"].as_str()?;
                        let (artists, title) = split_video_title(
                            it["snippet"]["title"].as_str().unwrap_or(""),
                            it["snippet"]["channelTitle"].as_str().unwrap_or(""),
                        );
                        Some(SearchResult {
                            destination_id: video_id.to_string(),
                            title,
                            artists,
                            duration_ms: 0,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        if results.is_empty() {
            return Ok(results);
        }
        let ids: Vec<String> = results.iter().map(|r| r.destination_id.clone()).collect();
        match self.video_durations(&ids).await {
            Ok(durations) => {
                for r in results.iter_mut() {
                    r.duration_ms = durations.get(&r.destination_id).copied().unwrap_or(0);
                }
            }
            // scoring copes with unknown durations
            Err(e) => warn!("YouTube duration lookup for '{}' failed: {:#}", query, e),
        }
        Ok(results)
    }

    async fn add_track(&self, playlist_id: &str, candidate_id: &str) -> Result<()> {
        let url = self.endpoint("playlistItems", &[("part", "snippet")])?;
        let body = json!({
            "snippet": {
                "playlistId": playlist_id,
                "resourceId": { "kind": "youtube#video", "videoId": candidate_id }
            }
        });
        let resp = self
            .client
            .post(url)
            .header(AUTHORIZATION, self.bearer())
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_for("add playlist item", resp).await);
        }
        Ok(())
    }
}
