use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Spotify,
    Youtube,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Spotify => "spotify",
            ProviderKind::Youtube => "youtube",
        }
    }

    /// Key under `session.providers` that carries this provider's token.
    pub fn session_key(&self) -> &'static str {
        match self {
            ProviderKind::Spotify => "spotify",
            ProviderKind::Youtube => "google",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderKind::Spotify => "Spotify",
            ProviderKind::Youtube => "YouTube",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spotify" => Some(ProviderKind::Spotify),
            "youtube" | "google" | "ytmusic" => Some(ProviderKind::Youtube),
            _ => None,
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One item read from a source playlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub title: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
    pub source_id: String,
}

impl Track {
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(|a| a.as_str())
    }
}

/// A raw search hit, in the order the platform returned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub destination_id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchCandidate {
    pub destination_id: String,
    pub title: String,
    pub artists: Vec<String>,
    pub duration_ms: u64,
    pub score: f64,
}

impl MatchCandidate {
    pub fn from_result(result: SearchResult, score: f64) -> Self {
        Self {
            destination_id: result.destination_id,
            title: result.title,
            artists: result.artists,
            duration_ms: result.duration_ms,
            score,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(MatchCandidate),
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    NoMatch,
    AddFailed(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoMatch => f.write_str("no match found"),
            FailureReason::AddFailed(e) => write!(f, "add failed: {}", e),
        }
    }
}

impl Serialize for FailureReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedTrack {
    pub track: Track,
    pub reason: FailureReason,
}

/// Summary of one finished transfer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    pub total: usize,
    pub success: usize,
    pub failed: Vec<FailedTrack>,
    pub created_playlist_id: String,
}

impl TransferResult {
    pub fn new(created_playlist_id: String, total: usize) -> Self {
        Self {
            total,
            success: 0,
            failed: Vec::new(),
            created_playlist_id,
        }
    }

    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_failure(&mut self, track: Track, reason: FailureReason) {
        self.failed.push(FailedTrack { track, reason });
    }

    pub fn is_complete(&self) -> bool {
        self.success + self.failed.len() == self.total
    }
}

/// Caller-supplied reference to the playlist being copied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistRef {
    pub id: String,
    pub name: String,
    pub owner_provider: ProviderKind,
}

/// A playlist as listed for the current user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub track_count: u64,
    pub owner_provider: ProviderKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_reasons_render_as_plain_strings() {
        assert_eq!(FailureReason::NoMatch.to_string(), "no match found");
        assert_eq!(
            FailureReason::AddFailed("403 Forbidden".into()).to_string(),
            "add failed: 403 Forbidden"
        );
        let j = serde_json::to_value(FailureReason::NoMatch).unwrap();
        assert_eq!(j, serde_json::json!("no match found"));
    }

    #[test]
    fn transfer_result_serializes_camel_case() {
        let mut r = TransferResult::new("PL1".into(), 1);
        r.record_failure(
            Track {
                title: "Song".into(),
                artists: vec!["Band".into()],
                duration_ms: 1000,
                source_id: "t1".into(),
            },
            FailureReason::NoMatch,
        );
        let j = serde_json::to_value(&r).unwrap();
        assert_eq!(j["createdPlaylistId"], "PL1");
        assert_eq!(j["failed"][0]["track"]["sourceId"], "t1");
        assert_eq!(j["failed"][0]["reason"], "no match found");
        assert!(r.is_complete());
    }

    #[test]
    fn provider_kind_parse_accepts_google_alias() {
        assert_eq!(ProviderKind::parse("Google"), Some(ProviderKind::Youtube));
        assert_eq!(ProviderKind::parse("spotify"), Some(ProviderKind::Spotify));
        assert_eq!(ProviderKind::parse("tidal"), None);
    }
}
