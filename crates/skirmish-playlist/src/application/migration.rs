//! Migration of name-based playlist settings from older releases.
//!
//! Older releases stored the combat, boss and fanfare playlists by name and
//! had a separate "roll for NPCs only" switch. On startup those values are
//! folded into the playlist configuration and the initiative mode, then
//! cleared so the migration runs once.

use skirmish_core::error::DomainError;
use skirmish_core::host::PlaylistDeck;
use skirmish_core::settings::{CombatSettings, InitiativeMode, PlaylistEntry, SettingsStore};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// What a migration pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Anything was changed and needs saving.
    pub migrated: bool,
    /// Playlists appended to the configuration.
    pub added: Vec<Uuid>,
    /// Legacy names that matched no playlist. Cleared anyway.
    pub unresolved: Vec<String>,
    /// The legacy NPC-roll switch was turned into mode `npc`.
    pub npc_mode_applied: bool,
}

/// Folds legacy values into `settings` and clears them.
pub fn migrate_legacy_settings(
    settings: &mut CombatSettings,
    deck: &dyn PlaylistDeck,
) -> MigrationReport {
    let mut report = MigrationReport::default();

    if settings.legacy.npc_roll {
        debug!("migrating legacy NPC roll setting to initiative mode npc");
        settings.initiative = InitiativeMode::Npc;
        settings.legacy.npc_roll = false;
        report.npc_mode_applied = true;
        report.migrated = true;
    }

    let legacy = [
        (std::mem::take(&mut settings.legacy.playlist), false),
        (std::mem::take(&mut settings.legacy.boss_playlist), false),
        (std::mem::take(&mut settings.legacy.fanfare_playlist), true),
    ];
    for (name, fanfare) in legacy {
        if name.is_empty() {
            continue;
        }
        report.migrated = true;

        let Some(info) = deck.playlist_by_name(&name) else {
            error!(playlist = %name, "could not locate legacy playlist");
            report.unresolved.push(name);
            continue;
        };
        if settings.playlists.iter().any(|e| e.playlist_id == info.id) {
            debug!(playlist = %name, "legacy playlist already configured");
            continue;
        }
        debug!(playlist = %name, playlist_id = %info.id, fanfare, "migrating legacy playlist");
        settings.playlists.push(PlaylistEntry {
            playlist_id: info.id,
            scene_id: None,
            fanfare,
        });
        report.added.push(info.id);
    }

    report
}

/// Loads settings, migrates them and saves the result when anything changed.
///
/// # Errors
///
/// Returns `DomainError` if the settings store fails to load or save.
pub async fn run_settings_migration(
    store: &dyn SettingsStore,
    deck: &dyn PlaylistDeck,
) -> Result<MigrationReport, DomainError> {
    let mut settings = store.load().await?;
    if settings.legacy.is_empty() {
        return Ok(MigrationReport::default());
    }

    let report = migrate_legacy_settings(&mut settings, deck);
    if report.migrated {
        store.save(&settings).await?;
        warn!(
            added = report.added.len(),
            unresolved = report.unresolved.len(),
            "legacy playlist settings migrated, review the playlist configuration"
        );
    }
    Ok(report)
}
