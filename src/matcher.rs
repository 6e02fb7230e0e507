use crate::api::Provider;
use crate::config::MatchConfig;
use crate::models::{MatchCandidate, MatchOutcome, SearchResult, Track};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

// Bracketed decorations: "(Official Video)", "[Remastered 2011]", "(feat. X)".
static BRACKET_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*[\(\[][^\)\]]*\b(official|video|audio|lyrics?|visuali[sz]er|remaster(ed)?|hd|hq|4k|explicit|clean|radio edit|feat\.?|ft\.?|featuring|prod\.?)\b[^\)\]]*[\)\]]",
    )
    .unwrap()
});
// Spotify-style suffixes: "Song - Remastered 2009", "Song - Radio Edit".
static DASH_SUFFIX_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+-\s+(\d{4}\s+)?(remaster(ed)?|radio edit|single version|album version|mono|stereo)\b.*$")
        .unwrap()
});
static TRAILING_FEAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(feat\.?|ft\.?|featuring)\s+.*$").unwrap());

/// Remove edition/video decorations from a title. Falls back to the input
/// when stripping would leave nothing.
pub fn strip_title_noise(title: &str) -> String {
    let s = BRACKET_NOISE.replace_all(title, "");
    let s = DASH_SUFFIX_NOISE.replace(&s, "");
    let s = TRAILING_FEAT.replace(&s, "");
    let s = s.trim();
    if s.is_empty() {
        title.trim().to_string()
    } else {
        s.to_string()
    }
}

/// Case, diacritic and punctuation insensitive form of `s`.
pub fn normalize(s: &str) -> String {
    let folded: String = s
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(|c| c.to_lowercase())
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    let out = folded.split_whitespace().collect::<Vec<_>>().join(" ");
    if out.is_empty() {
        // all-punctuation titles ("!!!") still need something to compare
        s.trim().to_lowercase()
    } else {
        out
    }
}

fn normalize_title(s: &str) -> String {
    normalize(&strip_title_noise(s))
}

fn normalize_artist(s: &str) -> String {
    let n = normalize(s);
    match n.strip_prefix("the ") {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => n,
    }
}

fn title_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&normalize_title(a), &normalize_title(b))
}

/// Overlap coefficient over normalized artist names. Credits such as
/// "Simon & Garfunkel" may arrive split on one side and whole on the other,
/// so the joined names also count as a full match.
fn artist_overlap(a: &[String], b: &[String]) -> f64 {
    let joined_a = normalize_artist(&a.join(" "));
    if !joined_a.is_empty() && joined_a == normalize_artist(&b.join(" ")) {
        return 1.0;
    }
    let set_a: HashSet<String> = a.iter().map(|s| normalize_artist(s)).filter(|s| !s.is_empty()).collect();
    let set_b: HashSet<String> = b.iter().map(|s| normalize_artist(s)).filter(|s| !s.is_empty()).collect();
    if set_a.is_empty() || set_b.is_empty() {
        return 0.0;
    }
    let inter = set_a.intersection(&set_b).count();
    inter as f64 / set_a.len().min(set_b.len()) as f64
}

/// Scores search results against a source track and picks the best one.
#[derive(Debug, Clone)]
pub struct TrackMatcher {
    config: MatchConfig,
}

impl Default for TrackMatcher {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}

impl TrackMatcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    /// Search string sent to the destination: cleaned title plus primary artist.
    pub fn build_query(track: &Track) -> String {
        let title = strip_title_noise(&track.title);
        match track.primary_artist() {
            Some(artist) if !artist.trim().is_empty() => format!("{} {}", title, artist.trim()),
            _ => title,
        }
    }

    /// Combined similarity in [0, 1].
    ///
    /// When either duration is unknown (0) the duration term is left out
    /// and the remaining weights are renormalized.
    pub fn score(&self, track: &Track, result: &SearchResult) -> f64 {
        let cfg = &self.config;
        let title = title_similarity(&track.title, &result.title);
        let artist = artist_overlap(&track.artists, &result.artists);

        let mut weighted = cfg.title_weight * title + cfg.artist_weight * artist;
        let mut total_weight = cfg.title_weight + cfg.artist_weight;
        if track.duration_ms > 0 && result.duration_ms > 0 {
            let diff = track.duration_ms.abs_diff(result.duration_ms);
            let closeness = if diff <= cfg.duration_window_ms { 1.0 } else { 0.0 };
            weighted += cfg.duration_weight * closeness;
            total_weight += cfg.duration_weight;
        }
        if total_weight <= 0.0 {
            return 0.0;
        }
        (weighted / total_weight).clamp(0.0, 1.0)
    }

    /// Pick the highest scoring result; earlier results win ties.
    pub fn best_candidate(&self, track: &Track, results: Vec<SearchResult>) -> MatchOutcome {
        let mut best: Option<(f64, SearchResult)> = None;
        for result in results {
            let score = self.score(track, &result);
            let better = match &best {
                Some((best_score, _)) => score > *best_score,
                None => true,
            };
            if better {
                best = Some((score, result));
            }
        }
        match best {
            Some((score, result)) if score >= self.config.acceptance_threshold => {
                MatchOutcome::Matched(MatchCandidate::from_result(result, score))
            }
            Some((score, result)) => {
                log::debug!(
                    "Best candidate '{}' for '{}' scored {:.3}, below threshold {:.3}",
                    result.title,
                    track.title,
                    score,
                    self.config.acceptance_threshold
                );
                MatchOutcome::NotFound
            }
            None => MatchOutcome::NotFound,
        }
    }

    /// Search the destination for `track` and return the accepted candidate.
    /// A failing search counts as no match.
    pub async fn find_match(&self, track: &Track, destination: &dyn Provider) -> MatchOutcome {
        let query = Self::build_query(track);
        if query.trim().is_empty() {
            return MatchOutcome::NotFound;
        }
        match destination.search(&query, self.config.search_limit).await {
            Ok(results) => self.best_candidate(track, results),
            Err(e) => {
                log::warn!(
                    "Search on {} for '{}' failed: {:#}",
                    destination.name(),
                    query,
                    e
                );
                MatchOutcome::NotFound
            }
        }
    }
}
