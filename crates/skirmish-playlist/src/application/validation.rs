//! Validation of playlist configuration edits.

use serde::Deserialize;
use skirmish_core::error::DomainError;
use skirmish_core::host::PlaylistDeck;
use skirmish_core::model::PlaylistMode;
use skirmish_core::settings::PlaylistEntry;
use uuid::Uuid;

/// One row of a playlist configuration edit, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlaylistEntryDraft {
    /// Selected playlist; `None` when left blank.
    #[serde(default)]
    pub playlist_id: Option<Uuid>,
    /// Optional scene filter.
    #[serde(default)]
    pub scene_id: Option<Uuid>,
    /// Victory playlist flag.
    #[serde(default)]
    pub fanfare: bool,
}

/// Validates an edited playlist list as a whole. A fanfare must be in
/// soundboard-only mode so it plays once; a combat playlist must not be.
///
/// # Errors
///
/// Returns `DomainError::Validation` for the first offending row, in which
/// case nothing should be saved.
pub fn validate_playlist_entries(
    drafts: &[PlaylistEntryDraft],
    deck: &dyn PlaylistDeck,
) -> Result<Vec<PlaylistEntry>, DomainError> {
    drafts
        .iter()
        .enumerate()
        .map(|(index, draft)| {
            let row = index + 1;
            let playlist_id = draft.playlist_id.ok_or_else(|| {
                DomainError::Validation(format!("playlist entry {row} has no playlist selected"))
            })?;
            let info = deck.playlist(playlist_id).ok_or_else(|| {
                DomainError::Validation(format!(
                    "playlist entry {row} refers to unknown playlist {playlist_id}"
                ))
            })?;

            let soundboard_only = info.mode == PlaylistMode::Disabled;
            if draft.fanfare && !soundboard_only {
                return Err(DomainError::Validation(format!(
                    "fanfare playlist '{}' must be in soundboard-only mode",
                    info.name
                )));
            }
            if !draft.fanfare && soundboard_only {
                return Err(DomainError::Validation(format!(
                    "combat playlist '{}' must not be in soundboard-only mode",
                    info.name
                )));
            }

            Ok(PlaylistEntry {
                playlist_id,
                scene_id: draft.scene_id,
                fanfare: draft.fanfare,
            })
        })
        .collect()
}
