use super::Provider;
use crate::models::{Playlist, ProviderKind, SearchResult, Track};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::info;

/// A recorded call against a MockProvider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ListPlaylists,
    ListTracks(String),
    CreatePlaylist(String),
    Search(String),
    AddTrack { playlist_id: String, candidate_id: String },
}

/// A scripted provider used in tests and dry runs.
/// It logs operations, records every call, and returns deterministic fake IDs.
pub struct MockProvider {
    kind: ProviderKind,
    authenticated: bool,
    playlists: Vec<Playlist>,
    tracks: HashMap<String, Vec<Track>>,
    search_results: HashMap<String, Vec<SearchResult>>,
    search_errors: HashMap<String, String>,
    add_errors: HashMap<String, String>,
    create_error: Option<String>,
    list_tracks_error: Option<String>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            authenticated: true,
            playlists: Vec::new(),
            tracks: HashMap::new(),
            search_results: HashMap::new(),
            search_errors: HashMap::new(),
            add_errors: HashMap::new(),
            create_error: None,
            list_tracks_error: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    pub fn with_playlist(mut self, playlist: Playlist) -> Self {
        self.playlists.push(playlist);
        self
    }

    pub fn with_tracks(mut self, playlist_id: &str, tracks: Vec<Track>) -> Self {
        self.tracks.insert(playlist_id.to_string(), tracks);
        self
    }

    /// Results returned for an exact query string. Unscripted queries return nothing.
    pub fn with_search_results(mut self, query: &str, results: Vec<SearchResult>) -> Self {
        self.search_results.insert(query.to_string(), results);
        self
    }

    pub fn failing_search(mut self, query: &str, error: &str) -> Self {
        self.search_errors.insert(query.to_string(), error.to_string());
        self
    }

    pub fn failing_add(mut self, candidate_id: &str, error: &str) -> Self {
        self.add_errors.insert(candidate_id.to_string(), error.to_string());
        self
    }

    pub fn failing_create(mut self, error: &str) -> Self {
        self.create_error = Some(error.to_string());
        self
    }

    pub fn failing_list_tracks(mut self, error: &str) -> Self {
        self.list_tracks_error = Some(error.to_string());
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn search_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Search(_)))
            .count()
    }

    /// (playlist id, candidate id) pairs successfully added, in call order.
    pub fn added(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                MockCall::AddTrack { playlist_id, candidate_id }
                    if !self.add_errors.contains_key(&candidate_id) =>
                {
                    Some((playlist_id, candidate_id))
                }
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: MockCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn list_playlists(&self) -> Result<Vec<Playlist>> {
        info!("MockProvider: list_playlists");
        self.record(MockCall::ListPlaylists);
        Ok(self.playlists.clone())
    }

    async fn list_tracks(&self, playlist_id: &str) -> Result<Vec<Track>> {
        info!("MockProvider: list_tracks {}", playlist_id);
        self.record(MockCall::ListTracks(playlist_id.to_string()));
        if let Some(e) = &self.list_tracks_error {
            return Err(anyhow!("{}", e));
        }
        self.tracks
            .get(playlist_id)
            .cloned()
            .ok_or_else(|| anyhow!("playlist {} not found", playlist_id))
    }

    async fn create_playlist(&self, name: &str, _description: &str) -> Result<String> {
        info!("MockProvider: create_playlist {}", name);
        self.record(MockCall::CreatePlaylist(name.to_string()));
        if let Some(e) = &self.create_error {
            return Err(anyhow!("{}", e));
        }
        Ok(format!("mock-playlist-{}", name))
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>> {
        info!("MockProvider: search {}", query);
        self.record(MockCall::Search(query.to_string()));
        if let Some(e) = self.search_errors.get(query) {
            return Err(anyhow!("{}", e));
        }
        let mut results = self.search_results.get(query).cloned().unwrap_or_default();
        results.truncate(limit);
        Ok(results)
    }

    async fn add_track(&self, playlist_id: &str, candidate_id: &str) -> Result<()> {
        info!("MockProvider: add_track {} -> {}", playlist_id, candidate_id);
        self.record(MockCall::AddTrack {
            playlist_id: playlist_id.to_string(),
            candidate_id: candidate_id.to_string(),
        });
        if let Some(e) = self.add_errors.get(candidate_id) {
            return Err(anyhow!("{}", e));
        }
        Ok(())
    }
}
