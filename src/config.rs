use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    #[serde(default = "default_http_timeout")]
    pub http_timeout_secs: u64,
    /// Description given to created playlists. Supports `${source}` and
    /// `${playlist_name}` placeholders.
    #[serde(default = "default_description_template")]
    pub playlist_description_template: String,

    // API base URLs; overridable for tests or proxies
    #[serde(default = "default_spotify_api_base")]
    pub spotify_api_base: String,
    #[serde(default = "default_youtube_api_base")]
    pub youtube_api_base: String,

    #[serde(default)]
    pub matching: MatchConfig,
}

/// Tuning knobs for the track matcher.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MatchConfig {
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,
    #[serde(default = "default_acceptance_threshold")]
    pub acceptance_threshold: f64,
    #[serde(default = "default_duration_window")]
    pub duration_window_ms: u64,
    #[serde(default = "default_title_weight")]
    pub title_weight: f64,
    #[serde(default = "default_artist_weight")]
    pub artist_weight: f64,
    #[serde(default = "default_duration_weight")]
    pub duration_weight: f64,
}

fn default_bind_addr() -> String { "127.0.0.1:3000".into() }
fn default_log_dir() -> PathBuf { "/var/log/beatbridge".into() }
fn default_http_timeout() -> u64 { 30 }
fn default_description_template() -> String { "Transferred from ${source} with BeatBridge".into() }
fn default_spotify_api_base() -> String { "https://api.spotify.com/v1".into() }
fn default_youtube_api_base() -> String { "https://www.googleapis.com/youtube/v3".into() }
fn default_search_limit() -> usize { 10 }
fn default_acceptance_threshold() -> f64 { 0.5 }
fn default_duration_window() -> u64 { 5000 }
fn default_title_weight() -> f64 { 0.5 }
fn default_artist_weight() -> f64 { 0.3 }
fn default_duration_weight() -> f64 { 0.2 }

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            search_limit: default_search_limit(),
            acceptance_threshold: default_acceptance_threshold(),
            duration_window_ms: default_duration_window(),
            title_weight: default_title_weight(),
            artist_weight: default_artist_weight(),
            duration_weight: default_duration_weight(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            log_dir: default_log_dir(),
            http_timeout_secs: default_http_timeout(),
            playlist_description_template: default_description_template(),
            spotify_api_base: default_spotify_api_base(),
            youtube_api_base: default_youtube_api_base(),
            matching: MatchConfig::default(),
        }
    }
}

impl Config {
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.bind_addr
            .parse::<std::net::SocketAddr>()
            .map_err(|e| anyhow!("invalid bind_addr '{}': {}", self.bind_addr, e))?;
        if self.http_timeout_secs == 0 {
            return Err(anyhow!("http_timeout_secs must be greater than zero"));
        }
        for (key, base) in [
            ("spotify_api_base", &self.spotify_api_base),
            ("youtube_api_base", &self.youtube_api_base),
        ] {
            url::Url::parse(base).map_err(|e| anyhow!("invalid {} '{}': {}", key, base, e))?;
        }
        self.matching.validate()
    }
}

impl MatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.search_limit == 0 || self.search_limit > 50 {
            return Err(anyhow!(
                "matching.search_limit must be between 1 and 50, got {}",
                self.search_limit
            ));
        }
        if !(0.0..=1.0).contains(&self.acceptance_threshold) {
            return Err(anyhow!(
                "matching.acceptance_threshold must be within [0, 1], got {}",
                self.acceptance_threshold
            ));
        }
        let weights = [self.title_weight, self.artist_weight, self.duration_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(anyhow!("matching weights must be finite and non-negative"));
        }
        if self.title_weight + self.artist_weight <= 0.0 {
            return Err(anyhow!("matching.title_weight + matching.artist_weight must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.bind_addr, "127.0.0.1:3000");
        assert_eq!(cfg.matching, MatchConfig::default());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let mut m = MatchConfig::default();
        m.acceptance_threshold = 1.5;
        assert!(m.validate().is_err());
    }
}
