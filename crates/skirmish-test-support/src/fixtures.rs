//! Roster and playlist fixtures.

use std::collections::BTreeSet;

use skirmish_core::model::{
    CombatPhase, CombatSession, Combatant, Disposition, PlaylistInfo, PlaylistMode,
};
use uuid::Uuid;

/// A player character with its own actor and token.
#[must_use]
pub fn pc(name: &str) -> Combatant {
    Combatant {
        id: Uuid::new_v4(),
        name: name.to_owned(),
        actor_id: Uuid::new_v4(),
        token_id: Uuid::new_v4(),
        is_npc: false,
        initiative: None,
        is_defeated: false,
        disposition: Disposition::Friendly,
        token_tags: BTreeSet::new(),
    }
}

/// A neutral NPC backed by `actor_id`.
#[must_use]
pub fn npc(name: &str, actor_id: Uuid) -> Combatant {
    Combatant {
        id: Uuid::new_v4(),
        name: name.to_owned(),
        actor_id,
        token_id: Uuid::new_v4(),
        is_npc: true,
        initiative: None,
        is_defeated: false,
        disposition: Disposition::Neutral,
        token_tags: BTreeSet::new(),
    }
}

/// A hostile NPC backed by `actor_id`.
#[must_use]
pub fn hostile(name: &str, actor_id: Uuid) -> Combatant {
    Combatant {
        disposition: Disposition::Hostile,
        ..npc(name, actor_id)
    }
}

/// Adds a token tag to `combatant`.
#[must_use]
pub fn tagged(mut combatant: Combatant, tag: &str) -> Combatant {
    combatant.token_tags.insert(tag.to_owned());
    combatant
}

/// A session in round 1 on a fresh scene.
#[must_use]
pub fn active_session(combatants: Vec<Combatant>) -> CombatSession {
    CombatSession {
        id: Uuid::new_v4(),
        scene_id: Uuid::new_v4(),
        phase: CombatPhase::Active,
        round: 1,
        turn: 0,
        combatants,
    }
}

/// A session still in round 0.
#[must_use]
pub fn preparing_session(combatants: Vec<Combatant>) -> CombatSession {
    CombatSession {
        phase: CombatPhase::Preparing,
        round: 0,
        ..active_session(combatants)
    }
}

/// A stopped playlist with a handful of sounds.
#[must_use]
pub fn playlist(name: &str, mode: PlaylistMode) -> PlaylistInfo {
    PlaylistInfo {
        id: Uuid::new_v4(),
        name: name.to_owned(),
        mode,
        playing: false,
        sound_count: 3,
    }
}
