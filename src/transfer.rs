use crate::api::Provider;
use crate::error::TransferError;
use crate::matcher::TrackMatcher;
use crate::models::{FailureReason, MatchOutcome, PlaylistRef, TransferResult};
use std::sync::Arc;
use uuid::Uuid;

pub const DEFAULT_DESCRIPTION_TEMPLATE: &str = "Transferred from ${source} with BeatBridge";

/// Copies one playlist from `source` to `destination`.
///
/// Runs as a strict sequence: create the destination playlist, read the
/// source tracks, then match and add each track in source order. Only the
/// first two steps can fail the whole transfer; per-track problems are
/// collected in the result.
pub struct Transfer {
    source: Arc<dyn Provider>,
    destination: Arc<dyn Provider>,
    matcher: TrackMatcher,
    description_template: String,
}

impl Transfer {
    pub fn new(source: Arc<dyn Provider>, destination: Arc<dyn Provider>, matcher: TrackMatcher) -> Self {
        Self {
            source,
            destination,
            matcher,
            description_template: DEFAULT_DESCRIPTION_TEMPLATE.to_string(),
        }
    }

    pub fn with_description_template(mut self, template: impl Into<String>) -> Self {
        self.description_template = template.into();
        self
    }

    pub async fn run(&self, playlist: &PlaylistRef) -> Result<TransferResult, TransferError> {
        let transfer_id = Uuid::new_v4();
        if !self.destination.is_authenticated() {
            return Err(TransferError::AuthMissing(self.destination.kind()));
        }
        if !self.source.is_authenticated() {
            return Err(TransferError::AuthMissing(self.source.kind()));
        }
        if playlist.owner_provider != self.source.kind() {
            log::warn!(
                "[{}] playlist {} is owned by {} but the source provider is {}",
                transfer_id,
                playlist.id,
                playlist.owner_provider,
                self.source.kind()
            );
        }

        log::info!(
            "[{}] Transferring '{}' ({}) from {} to {}",
            transfer_id,
            playlist.name,
            playlist.id,
            self.source.kind(),
            self.destination.kind()
        );

        // Create destination
        let description = crate::util::expand_template(
            &self.description_template,
            self.source.kind().display_name(),
            &playlist.name,
        );
        let created_id = self
            .destination
            .create_playlist(&playlist.name, &description)
            .await
            .map_err(|e| {
                log::error!("[{}] Failed to create destination playlist: {:#}", transfer_id, e);
                TransferError::DestinationCreateFailed(e)
            })?;
        log::info!("[{}] Created {} playlist {}", transfer_id, self.destination.kind(), created_id);

        // Iterate tracks
        let tracks = self.source.list_tracks(&playlist.id).await.map_err(|e| {
            log::error!(
                "[{}] Failed to read source playlist {} (destination {} left empty): {:#}",
                transfer_id,
                playlist.id,
                created_id,
                e
            );
            TransferError::SourceUnreadable(e)
        })?;

        let mut result = TransferResult::new(created_id, tracks.len());
        for (idx, track) in tracks.into_iter().enumerate() {
            match self.matcher.find_match(&track, self.destination.as_ref()).await {
                MatchOutcome::Matched(candidate) => {
                    match self
                        .destination
                        .add_track(&result.created_playlist_id, &candidate.destination_id)
                        .await
                    {
                        Ok(()) => {
                            log::debug!(
                                "[{}] {}/{} '{}' -> {} (score {:.2})",
                                transfer_id,
                                idx + 1,
                                result.total,
                                track.title,
                                candidate.destination_id,
                                candidate.score
                            );
                            result.record_success();
                        }
                        Err(e) => {
                            log::warn!("[{}] Adding '{}' failed: {:#}", transfer_id, track.title, e);
                            result.record_failure(track, FailureReason::AddFailed(format!("{:#}", e)));
                        }
                    }
                }
                MatchOutcome::NotFound => {
                    log::info!("[{}] No match for '{}'", transfer_id, track.title);
                    result.record_failure(track, FailureReason::NoMatch);
                }
            }
        }

        // Finalize
        log::info!(
            "[{}] Done: {}/{} added, {} failed",
            transfer_id,
            result.success,
            result.total,
            result.failed.len()
        );
        debug_assert!(result.is_complete());
        Ok(result)
    }
}
