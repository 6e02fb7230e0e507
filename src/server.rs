//! HTTP routes consumed by the web UI.
//!
//! Access tokens come from the auth collaborator in front of this service,
//! one header per provider. A missing header means the account is not
//! linked; routes answer `401 {"error": ...}` instead of failing hard.

use crate::api::spotify::SpotifyProvider;
use crate::api::youtube::YoutubeProvider;
use crate::api::{http_client, Provider};
use crate::config::Config;
use crate::error::TransferError;
use crate::matcher::TrackMatcher;
use crate::models::{FailedTrack, Playlist, PlaylistRef, ProviderKind, TransferResult};
use anyhow::Context;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const SPOTIFY_TOKEN_HEADER: &str = "x-spotify-access-token";
pub const GOOGLE_TOKEN_HEADER: &str = "x-google-access-token";

/// Per-request view of the user's linked accounts.
#[derive(Debug, Clone, Default)]
pub struct Session {
    spotify: Option<String>,
    google: Option<String>,
}

impl Session {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        Self {
            spotify: read(SPOTIFY_TOKEN_HEADER),
            google: read(GOOGLE_TOKEN_HEADER),
        }
    }

    pub fn token(&self, kind: ProviderKind) -> Option<&str> {
        match kind {
            ProviderKind::Spotify => self.spotify.as_deref(),
            ProviderKind::Youtube => self.google.as_deref(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    matcher: TrackMatcher,
    http: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let matcher = TrackMatcher::new(config.matching.clone());
        let http = http_client(config.http_timeout_secs);
        Self {
            config: Arc::new(config),
            matcher,
            http,
        }
    }

    /// Build a provider client for `kind`. An empty token yields an
    /// unauthenticated client.
    fn provider(&self, kind: ProviderKind, token: Option<&str>) -> Arc<dyn Provider> {
        let token = token.unwrap_or_default().to_string();
        match kind {
            ProviderKind::Spotify => Arc::new(SpotifyProvider::with_client(
                self.http.clone(),
                token,
                self.config.spotify_api_base.clone(),
            )),
            ProviderKind::Youtube => Arc::new(YoutubeProvider::with_client(
                self.http.clone(),
                token,
                self.config.youtube_api_base.clone(),
            )),
        }
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("no {0} token in session")]
    Unauthorized(ProviderKind),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("{provider} request failed: {cause:#}")]
    Upstream {
        provider: ProviderKind,
        cause: anyhow::Error,
    },

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::Unauthorized(kind) => (
                StatusCode::UNAUTHORIZED,
                format!("Connect {} first", kind.display_name()),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Upstream { provider, .. } => (
                StatusCode::BAD_GATEWAY,
                format!("{} request failed", provider.display_name()),
            ),
            ApiError::Transfer(e) => {
                let status = match e {
                    TransferError::AuthMissing(_) => StatusCode::UNAUTHORIZED,
                    TransferError::SourceUnreadable(_) | TransferError::DestinationCreateFailed(_) => {
                        StatusCode::BAD_GATEWAY
                    }
                };
                (status, e.user_message())
            }
        };
        if status.is_server_error() {
            warn!("{}", self);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    #[serde(default)]
    pub playlist_id: String,
    #[serde(default)]
    pub playlist_name: Option<String>,
}

#[derive(Serialize)]
struct SpotifyPlaylistView {
    id: String,
    name: String,
    tracks: SpotifyTrackCount,
}

#[derive(Serialize)]
struct SpotifyTrackCount {
    total: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GooglePlaylistView {
    id: String,
    snippet: GoogleSnippet,
    content_details: GoogleContentDetails,
}

#[derive(Serialize)]
struct GoogleSnippet {
    title: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GoogleContentDetails {
    item_count: u64,
}

impl From<Playlist> for SpotifyPlaylistView {
    fn from(p: Playlist) -> Self {
        Self {
            id: p.id,
            name: p.name,
            tracks: SpotifyTrackCount { total: p.track_count },
        }
    }
}

impl From<Playlist> for GooglePlaylistView {
    fn from(p: Playlist) -> Self {
        Self {
            id: p.id,
            snippet: GoogleSnippet { title: p.name },
            content_details: GoogleContentDetails { item_count: p.track_count },
        }
    }
}

/// Response shape of `/api/transfer-from-youtube`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct YoutubeTransferResponse {
    added: usize,
    total_videos: usize,
    created_playlist_id: String,
    failed: Vec<FailedTrack>,
}

impl From<TransferResult> for YoutubeTransferResponse {
    fn from(r: TransferResult) -> Self {
        Self {
            added: r.success,
            total_videos: r.total,
            created_playlist_id: r.created_playlist_id,
            failed: r.failed,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/spotify/playlists", get(spotify_playlists))
        .route("/api/google/playlists", get(google_playlists))
        .route("/api/transfer", post(transfer_to_youtube))
        .route("/api/transfer-from-youtube", post(transfer_to_spotify))
        .with_state(state)
}

/// Bind `cfg.bind_addr` and serve until Ctrl-C.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("parsing bind_addr {}", config.bind_addr))?;
    let app = build_router(AppState::new(config));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    info!("BeatBridge listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn list_playlists(state: &AppState, headers: &HeaderMap, kind: ProviderKind) -> Result<Vec<Playlist>, ApiError> {
    let session = Session::from_headers(headers);
    let token = session.token(kind).ok_or(ApiError::Unauthorized(kind))?;
    state
        .provider(kind, Some(token))
        .list_playlists()
        .await
        .map_err(|cause| ApiError::Upstream { provider: kind, cause })
}

async fn spotify_playlists(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let playlists: Vec<SpotifyPlaylistView> = list_playlists(&state, &headers, ProviderKind::Spotify)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(json!({ "playlists": playlists })))
}

async fn google_playlists(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Value>, ApiError> {
    let playlists: Vec<GooglePlaylistView> = list_playlists(&state, &headers, ProviderKind::Youtube)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(json!({ "playlists": playlists })))
}

async fn run_transfer(
    state: &AppState,
    headers: &HeaderMap,
    payload: Result<Json<TransferRequest>, JsonRejection>,
    from: ProviderKind,
    to: ProviderKind,
) -> Result<TransferResult, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let playlist_id = req.playlist_id.trim().to_string();
    if playlist_id.is_empty() {
        return Err(ApiError::BadRequest("playlistId is required".into()));
    }
    let name = req
        .playlist_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| playlist_id.clone());

    let session = Session::from_headers(headers);
    let transfer = crate::transfer::Transfer::new(
        state.provider(from, session.token(from)),
        state.provider(to, session.token(to)),
        state.matcher.clone(),
    )
    .with_description_template(state.config.playlist_description_template.clone());

    let playlist = PlaylistRef {
        id: playlist_id,
        name,
        owner_provider: from,
    };
    info!("Transfer requested: {} '{}' -> {}", from, playlist.name, to);
    Ok(transfer.run(&playlist).await?)
}

async fn transfer_to_youtube(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<TransferResult>, ApiError> {
    let result = run_transfer(&state, &headers, payload, ProviderKind::Spotify, ProviderKind::Youtube).await?;
    Ok(Json(result))
}

async fn transfer_to_spotify(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<Json<YoutubeTransferResponse>, ApiError> {
    let result = run_transfer(&state, &headers, payload, ProviderKind::Youtube, ProviderKind::Spotify).await?;
    Ok(Json(result.into()))
}
