//! Admission, grouping and post-combat cleanup rules.

use std::collections::{BTreeSet, HashMap};

use skirmish_core::model::{CombatSession, Combatant};
use skirmish_core::settings::CombatSettings;
use tracing::debug;
use uuid::Uuid;

/// NPCs sharing one actor that roll initiative as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitiativeGroup {
    /// Actor shared by every member.
    pub actor_id: Uuid,
    /// First member in roster order; the only one that rolls.
    pub leader: Uuid,
    /// Remaining members, in roster order.
    pub followers: Vec<Uuid>,
}

/// Participant admission, grouping and removal policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantPolicy {
    ignore_tags: BTreeSet<String>,
    group_npcs: bool,
    remove_defeated: bool,
}

impl ParticipantPolicy {
    /// Creates a policy from explicit switches.
    #[must_use]
    pub fn new(ignore_tags: BTreeSet<String>, group_npcs: bool, remove_defeated: bool) -> Self {
        Self {
            ignore_tags,
            group_npcs,
            remove_defeated,
        }
    }

    /// Reads the policy switches out of the combat settings.
    #[must_use]
    pub fn from_settings(settings: &CombatSettings) -> Self {
        Self::new(
            settings.ignore_tag_set(),
            settings.group_npcs,
            settings.remove_defeated,
        )
    }

    /// Returns `true` when any of the combatant's token tags is ignored.
    /// Matching is exact and case-sensitive.
    #[must_use]
    pub fn should_exclude(&self, combatant: &Combatant) -> bool {
        combatant
            .token_tags
            .iter()
            .any(|tag| self.ignore_tags.contains(tag))
    }

    /// Whether same-actor NPCs roll as a group.
    #[must_use]
    pub fn grouping_enabled(&self) -> bool {
        self.group_npcs
    }

    /// Whether defeated hostile NPCs are removed at combat end.
    #[must_use]
    pub fn removal_enabled(&self) -> bool {
        self.remove_defeated
    }

    /// Groups NPCs by actor. Single-member groups are left out; groups come
    /// back in order of their leader's roster position. Empty when grouping
    /// is off.
    #[must_use]
    pub fn group_for_initiative(&self, session: &CombatSession) -> Vec<InitiativeGroup> {
        if !self.group_npcs {
            return Vec::new();
        }

        let mut groups: Vec<InitiativeGroup> = Vec::new();
        let mut by_actor: HashMap<Uuid, usize> = HashMap::new();
        for combatant in session.combatants.iter().filter(|c| c.is_npc) {
            if let Some(&index) = by_actor.get(&combatant.actor_id) {
                groups[index].followers.push(combatant.id);
            } else {
                by_actor.insert(combatant.actor_id, groups.len());
                groups.push(InitiativeGroup {
                    actor_id: combatant.actor_id,
                    leader: combatant.id,
                    followers: Vec::new(),
                });
            }
        }
        groups.retain(|group| !group.followers.is_empty());
        groups
    }

    /// The earliest other NPC in the roster backed by the newcomer's actor.
    /// `None` when grouping is off or the newcomer is a player character.
    #[must_use]
    pub fn group_leader_for<'a>(
        &self,
        session: &'a CombatSession,
        newcomer: &Combatant,
    ) -> Option<&'a Combatant> {
        if !self.group_npcs || !newcomer.is_npc {
            return None;
        }
        session
            .combatants
            .iter()
            .find(|c| c.is_npc && c.id != newcomer.id && c.actor_id == newcomer.actor_id)
    }

    /// Combatants whose tokens are deleted at combat end: defeated hostile
    /// NPCs whose token is still on the active scene. Empty when removal is
    /// off.
    #[must_use]
    pub fn select_for_removal(
        &self,
        session: &CombatSession,
        on_active_scene: impl Fn(&Combatant) -> bool,
    ) -> BTreeSet<Uuid> {
        if !self.remove_defeated {
            return BTreeSet::new();
        }
        session
            .combatants
            .iter()
            .filter(|c| c.is_hostile_npc() && c.is_defeated)
            .filter(|c| {
                let present = on_active_scene(c);
                if !present {
                    debug!(combatant = %c.name, "defeated token not on active scene");
                }
                present
            })
            .map(|c| c.id)
            .collect()
    }
}
