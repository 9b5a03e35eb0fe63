//! Combat playlist selection.

use serde::Serialize;
use skirmish_core::host::PlaylistDeck;
use skirmish_core::rng::DeterministicRng;
use skirmish_core::settings::PlaylistEntry;
use tracing::debug;
use uuid::Uuid;

/// One option offered when the GM is asked which playlist to play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistChoice {
    /// Playlist reference.
    pub playlist_id: Uuid,
    /// Display name.
    pub name: String,
    /// Shown with the boss icon.
    pub boss: bool,
}

fn resolvable<'a>(
    entries: &'a [PlaylistEntry],
    deck: &'a dyn PlaylistDeck,
) -> impl Iterator<Item = &'a PlaylistEntry> {
    entries.iter().filter(|e| !e.fanfare).filter(move |e| {
        let found = deck.playlist(e.playlist_id).is_some();
        if !found {
            debug!(playlist_id = %e.playlist_id, "configured playlist not found, skipping");
        }
        found
    })
}

/// Picks a combat playlist without asking: a random entry filtered to the
/// active scene if there is one, otherwise a random entry without a scene
/// filter. Fanfares and dangling references never qualify.
pub fn auto_select(
    entries: &[PlaylistEntry],
    deck: &dyn PlaylistDeck,
    active_scene: Option<Uuid>,
    rng: &mut dyn DeterministicRng,
) -> Option<Uuid> {
    let candidates: Vec<&PlaylistEntry> = resolvable(entries, deck).collect();

    let on_scene: Vec<Uuid> = candidates
        .iter()
        .filter(|e| active_scene.is_some() && e.scene_id == active_scene)
        .map(|e| e.playlist_id)
        .collect();
    let pool = if on_scene.is_empty() {
        candidates
            .iter()
            .filter(|e| e.scene_id.is_none())
            .map(|e| e.playlist_id)
            .collect()
    } else {
        on_scene
    };

    let picked = rng.pick_index(pool.len()).map(|i| pool[i]);
    debug!(candidates = pool.len(), picked = ?picked, "automatic playlist selection");
    picked
}

/// The options for the selection prompt, in configured order.
#[must_use]
pub fn combat_choices(entries: &[PlaylistEntry], deck: &dyn PlaylistDeck) -> Vec<PlaylistChoice> {
    resolvable(entries, deck)
        .filter_map(|e| deck.playlist(e.playlist_id))
        .map(|info| PlaylistChoice {
            playlist_id: info.id,
            boss: info.name.to_lowercase().contains("boss"),
            name: info.name,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_core::model::PlaylistMode;
    use skirmish_test_support::{FakeHost, MockRng, SequenceRng};

    fn entry(playlist_id: Uuid, scene_id: Option<Uuid>, fanfare: bool) -> PlaylistEntry {
        PlaylistEntry {
            playlist_id,
            scene_id,
            fanfare,
        }
    }

    #[test]
    fn test_auto_select_prefers_active_scene() {
        // Arrange
        let mut host = FakeHost::new();
        let general = host.add_playlist("Battle", PlaylistMode::Sequential);
        let crypt = host.add_playlist("Crypt", PlaylistMode::Sequential);
        let scene = Uuid::new_v4();
        let entries = [entry(general, None, false), entry(crypt, Some(scene), false)];

        // Act
        let picked = auto_select(&entries, &host, Some(scene), &mut MockRng);

        // Assert
        assert_eq!(picked, Some(crypt));
    }

    #[test]
    fn test_auto_select_falls_back_to_unfiltered_entries() {
        let mut host = FakeHost::new();
        let general = host.add_playlist("Battle", PlaylistMode::Sequential);
        let crypt = host.add_playlist("Crypt", PlaylistMode::Sequential);
        let entries = [
            entry(crypt, Some(Uuid::new_v4()), false),
            entry(general, None, false),
        ];

        let picked = auto_select(&entries, &host, Some(Uuid::new_v4()), &mut MockRng);

        assert_eq!(picked, Some(general));
    }

    #[test]
    fn test_auto_select_picks_randomly_among_matches() {
        let mut host = FakeHost::new();
        let a = host.add_playlist("A", PlaylistMode::Sequential);
        let b = host.add_playlist("B", PlaylistMode::Sequential);
        let entries = [entry(a, None, false), entry(b, None, false)];

        let picked = auto_select(&entries, &host, None, &mut SequenceRng::new(vec![1]));

        assert_eq!(picked, Some(b));
    }

    #[test]
    fn test_auto_select_skips_fanfare_and_missing() {
        let mut host = FakeHost::new();
        let victory = host.add_playlist("Victory", PlaylistMode::Disabled);
        let entries = [entry(Uuid::new_v4(), None, false), entry(victory, None, true)];

        assert_eq!(auto_select(&entries, &host, None, &mut MockRng), None);
    }

    #[test]
    fn test_combat_choices_flag_boss_playlists() {
        // Arrange
        let mut host = FakeHost::new();
        let battle = host.add_playlist("Battle", PlaylistMode::Sequential);
        let boss = host.add_playlist("Dragon BOSS theme", PlaylistMode::Shuffle);
        let victory = host.add_playlist("Victory", PlaylistMode::Disabled);
        let entries = [
            entry(battle, None, false),
            entry(boss, None, false),
            entry(victory, None, true),
            entry(Uuid::new_v4(), None, false),
        ];

        // Act
        let choices = combat_choices(&entries, &host);

        // Assert
        assert_eq!(choices.len(), 2);
        assert_eq!(choices[0].name, "Battle");
        assert!(!choices[0].boss);
        assert_eq!(choices[1].playlist_id, boss);
        assert!(choices[1].boss);
    }
}
