pub mod spotify;
pub mod mock;
pub mod youtube;

use crate::models::{Playlist, ProviderKind, SearchResult, Track};
use anyhow::Result;

/// Provider trait: the capability set the transfer needs from a streaming service.
/// Implementations: spotify::SpotifyProvider, youtube::YoutubeProvider, mock::MockProvider.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// List playlists owned or followed by the current user.
    async fn list_playlists(&self) -> Result<Vec<Playlist>>;

    /// All tracks of a playlist in playlist order (pagination merged).
    async fn list_tracks(&self, playlist_id: &str) -> Result<Vec<Track>>;

    /// Create an empty playlist and return its remote id.
    async fn create_playlist(&self, name: &str, description: &str) -> Result<String>;

    /// Free-text search. Results keep the platform's ordering.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>>;

    /// Append one item (a `SearchResult::destination_id`) to a playlist.
    async fn add_track(&self, playlist_id: &str, candidate_id: &str) -> Result<()>;

    fn kind(&self) -> ProviderKind;

    /// Return the provider's name (for logging, UI, etc)
    fn name(&self) -> &str {
        self.kind().name()
    }

    /// Return true if the provider holds an access token
    fn is_authenticated(&self) -> bool;
}

/// Build a reqwest client with the configured timeout.
pub fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|e| {
            log::warn!("building HTTP client with {}s timeout failed, using defaults: {}", timeout_secs, e);
            reqwest::Client::new()
        })
}

/// Pull `retry-after` seconds off a 429 response.
pub(crate) fn retry_after_secs(resp: &reqwest::Response) -> Option<u64> {
    resp.headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
}
