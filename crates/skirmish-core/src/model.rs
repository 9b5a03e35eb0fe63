//! Encounter data model shared by every orchestration crate.
//!
//! Sessions and combatants are owned by the host; the orchestrator works on
//! snapshots returned by [`crate::host::SessionHost::session`] and never keeps
//! a copy beyond the call that read it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token disposition towards the party.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Hidden from players.
    Secret,
    /// Hostile to the party.
    Hostile,
    /// Neither friend nor foe.
    #[default]
    Neutral,
    /// Allied with the party.
    Friendly,
}

/// Combat session lifecycle phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatPhase {
    /// Created, round 0, roster still being assembled.
    #[default]
    Preparing,
    /// Round 1 or later.
    Active,
    /// Ended or deleted.
    Ended,
}

/// One participant's roster entry within a single encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    /// Combatant identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// The underlying actor this combatant was created from.
    pub actor_id: Uuid,
    /// The token representing this combatant on the scene.
    pub token_id: Uuid,
    /// Whether the combatant is controlled by the game master.
    pub is_npc: bool,
    /// Turn-order value, `None` until rolled.
    pub initiative: Option<f64>,
    /// Whether the combatant has been marked defeated.
    pub is_defeated: bool,
    /// Token disposition.
    pub disposition: Disposition,
    /// Tags carried by the token.
    #[serde(default)]
    pub token_tags: BTreeSet<String>,
}

impl Combatant {
    /// Returns `true` once an initiative value has been recorded.
    #[must_use]
    pub fn has_initiative(&self) -> bool {
        self.initiative.is_some()
    }

    /// Returns `true` for hostile NPCs.
    #[must_use]
    pub fn is_hostile_npc(&self) -> bool {
        self.is_npc && self.disposition == Disposition::Hostile
    }
}

/// A combat encounter as seen by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatSession {
    /// Session identifier.
    pub id: Uuid,
    /// Scene the encounter takes place on.
    pub scene_id: Uuid,
    /// Current phase.
    pub phase: CombatPhase,
    /// Round counter, 0 before the encounter starts.
    pub round: u32,
    /// Index of the combatant whose turn it is.
    pub turn: usize,
    /// Roster, in turn order.
    pub combatants: Vec<Combatant>,
}

impl CombatSession {
    /// Looks up a combatant by id.
    #[must_use]
    pub fn combatant(&self, combatant_id: Uuid) -> Option<&Combatant> {
        self.combatants.iter().find(|c| c.id == combatant_id)
    }

    /// Returns `true` while the encounter is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.phase == CombatPhase::Active
    }

    /// Returns `true` if any combatant is backed by `token_id`.
    #[must_use]
    pub fn has_token(&self, token_id: Uuid) -> bool {
        self.combatants.iter().any(|c| c.token_id == token_id)
    }
}

/// One pending initiative roll, consumed by a rule-set strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitiativeRequest {
    /// Session the combatant belongs to.
    pub session_id: Uuid,
    /// Combatant that needs a value.
    pub combatant_id: Uuid,
    /// User the roll is requested on behalf of.
    pub requested_by: Uuid,
    /// Value copied from a group leader instead of rolling.
    pub inherited: Option<f64>,
}

impl InitiativeRequest {
    /// A request for a real roll.
    #[must_use]
    pub fn roll(session_id: Uuid, combatant_id: Uuid, requested_by: Uuid) -> Self {
        Self {
            session_id,
            combatant_id,
            requested_by,
            inherited: None,
        }
    }

    /// A synthetic assignment of a leader's already-resolved value.
    #[must_use]
    pub fn inherit(session_id: Uuid, combatant_id: Uuid, requested_by: Uuid, value: f64) -> Self {
        Self {
            session_id,
            combatant_id,
            requested_by,
            inherited: Some(value),
        }
    }
}

/// Fire-and-forget roll dispatched to the host. The host fulfils it later,
/// possibly through a human answering a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollRequest {
    /// Session the combatant belongs to.
    pub session_id: Uuid,
    /// Combatant to roll for.
    pub combatant_id: Uuid,
    /// User the roll is requested on behalf of.
    pub requested_by: Uuid,
    /// Roll without showing the roll-configuration dialog.
    pub skip_dialog: bool,
}

/// Payload for the host's experience-distribution side channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceAward {
    /// Session that just ended.
    pub session_id: Uuid,
    /// User that ended the encounter.
    pub triggered_by: Uuid,
    /// Player-character combatants receiving the award.
    pub recipients: Vec<Uuid>,
    /// Actors of the defeated hostile NPCs the award is computed from.
    pub defeated: Vec<Uuid>,
    /// Whisper the award summary to the game master only.
    pub gm_only: bool,
}

/// Host playlist play mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistMode {
    /// Soundboard only: sounds play individually, the playlist does not loop.
    Disabled,
    /// Tracks in order.
    #[default]
    Sequential,
    /// Tracks shuffled.
    Shuffle,
    /// All tracks at once.
    Simultaneous,
}

/// Host view of a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistInfo {
    /// Playlist identifier.
    pub id: Uuid,
    /// Playlist name.
    pub name: String,
    /// Play mode.
    pub mode: PlaylistMode,
    /// Whether the playlist is currently running.
    pub playing: bool,
    /// Number of sounds in the playlist.
    pub sound_count: usize,
}

/// The user this orchestrator instance acts for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    /// User identifier.
    pub user_id: Uuid,
    /// Whether the user is the game master.
    pub is_gm: bool,
}

impl UserContext {
    /// A game-master context.
    #[must_use]
    pub fn gm(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_gm: true,
        }
    }

    /// A player context.
    #[must_use]
    pub fn player(user_id: Uuid) -> Self {
        Self {
            user_id,
            is_gm: false,
        }
    }
}

/// Tabletop rule-set family governing roll and reward mechanics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSetFamily {
    /// Any system without dedicated support.
    #[default]
    Generic,
    /// Dungeons & Dragons fifth edition.
    Dnd5e,
    /// Pathfinder second edition.
    Pf2e,
    /// Old-School Essentials.
    Ose,
}

impl RuleSetFamily {
    /// Resolves the active family from host capability flags. The first
    /// match wins in the order `pf2e`, `dnd5e`, `ose`.
    pub fn detect<'a>(flags: impl IntoIterator<Item = &'a str>) -> Self {
        let flags: Vec<String> = flags
            .into_iter()
            .map(|flag| flag.trim().to_ascii_lowercase())
            .collect();
        let has = |name: &str| flags.iter().any(|flag| flag == name);

        if has("pf2e") {
            Self::Pf2e
        } else if has("dnd5e") {
            Self::Dnd5e
        } else if has("ose") {
            Self::Ose
        } else {
            Self::Generic
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn combatant(is_npc: bool, disposition: Disposition) -> Combatant {
        Combatant {
            id: Uuid::new_v4(),
            name: "Goblin".to_owned(),
            actor_id: Uuid::new_v4(),
            token_id: Uuid::new_v4(),
            is_npc,
            initiative: None,
            is_defeated: false,
            disposition,
            token_tags: BTreeSet::new(),
        }
    }

    #[test]
    fn test_detect_prefers_pf2e_over_dnd5e() {
        assert_eq!(RuleSetFamily::detect(["dnd5e", "PF2E"]), RuleSetFamily::Pf2e);
    }

    #[test]
    fn test_detect_falls_back_to_generic() {
        assert_eq!(RuleSetFamily::detect(["swade"]), RuleSetFamily::Generic);
        assert_eq!(
            RuleSetFamily::detect(std::iter::empty()),
            RuleSetFamily::Generic
        );
    }

    #[test]
    fn test_detect_ose() {
        assert_eq!(RuleSetFamily::detect([" ose "]), RuleSetFamily::Ose);
    }

    #[test]
    fn test_hostile_npc_requires_both_flags() {
        assert!(combatant(true, Disposition::Hostile).is_hostile_npc());
        assert!(!combatant(false, Disposition::Hostile).is_hostile_npc());
        assert!(!combatant(true, Disposition::Neutral).is_hostile_npc());
    }

    #[test]
    fn test_session_lookup_by_token_and_id() {
        let goblin = combatant(true, Disposition::Hostile);
        let session = CombatSession {
            id: Uuid::new_v4(),
            scene_id: Uuid::new_v4(),
            phase: CombatPhase::Active,
            round: 1,
            turn: 0,
            combatants: vec![goblin.clone()],
        };

        assert!(session.is_active());
        assert!(session.has_token(goblin.token_id));
        assert_eq!(session.combatant(goblin.id), Some(&goblin));
        assert!(session.combatant(Uuid::new_v4()).is_none());
    }

    #[test]
    fn test_disposition_serializes_snake_case() {
        let json = serde_json::to_value(Disposition::Hostile).unwrap();
        assert_eq!(json, "hostile");
    }
}
