//! Rule-set strategy variants.

use skirmish_core::error::DomainError;
use skirmish_core::host::SessionHost;
use skirmish_core::model::{CombatSession, Combatant, RollRequest, RuleSetFamily};
use skirmish_core::settings::{AutoInitMode, InitiativeMode, RewardSettings};
use tracing::{debug, info};
use uuid::Uuid;

use super::strategy::{RuleSetStrategy, experience_award};

/// Fallback for rule sets without dedicated support: plain roll requests,
/// no group roll, no rewards.
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericRules;

impl RuleSetStrategy for GenericRules {
    fn family(&self) -> RuleSetFamily {
        RuleSetFamily::Generic
    }
}

/// Dungeons & Dragons fifth edition.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dnd5eRules;

impl RuleSetStrategy for Dnd5eRules {
    fn family(&self) -> RuleSetFamily {
        RuleSetFamily::Dnd5e
    }

    fn award_reward(
        &self,
        host: &mut dyn SessionHost,
        session: &CombatSession,
        triggered_by: Uuid,
        rewards: RewardSettings,
    ) -> Result<bool, DomainError> {
        send_award(host, session, triggered_by, rewards)
    }
}

/// Old-School Essentials. Awards experience like 5e.
#[derive(Debug, Clone, Copy, Default)]
pub struct OseRules;

impl RuleSetStrategy for OseRules {
    fn family(&self) -> RuleSetFamily {
        RuleSetFamily::Ose
    }

    fn award_reward(
        &self,
        host: &mut dyn SessionHost,
        session: &CombatSession,
        triggered_by: Uuid,
        rewards: RewardSettings,
    ) -> Result<bool, DomainError> {
        send_award(host, session, triggered_by, rewards)
    }
}

/// Pathfinder second edition: NPCs get a batch roll when combat starts and
/// the auto-init mode decides who sees the roll dialog.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pf2eRules {
    auto_init: AutoInitMode,
}

impl Pf2eRules {
    /// Creates the strategy for the given roll-dialog mode.
    #[must_use]
    pub fn new(auto_init: AutoInitMode) -> Self {
        Self { auto_init }
    }

    /// The configured roll-dialog mode.
    #[must_use]
    pub fn auto_init(&self) -> AutoInitMode {
        self.auto_init
    }
}

impl RuleSetStrategy for Pf2eRules {
    fn family(&self) -> RuleSetFamily {
        RuleSetFamily::Pf2e
    }

    fn skip_dialog(&self, combatant: &Combatant) -> bool {
        match self.auto_init {
            AutoInitMode::Fast => true,
            AutoInitMode::FastPrompt => combatant.is_npc,
            AutoInitMode::Default | AutoInitMode::Prompt => false,
        }
    }

    fn roll_group_initiatives(
        &self,
        host: &mut dyn SessionHost,
        session: &CombatSession,
        mode: InitiativeMode,
        requested_by: Uuid,
        followers: &[Uuid],
    ) -> Result<Vec<Uuid>, DomainError> {
        if !matches!(mode, InitiativeMode::Enabled | InitiativeMode::Npc) {
            return Ok(Vec::new());
        }

        let mut requested = Vec::new();
        for combatant in session
            .combatants
            .iter()
            .filter(|c| c.is_npc && !c.has_initiative() && !followers.contains(&c.id))
        {
            host.request_initiative_roll(RollRequest {
                session_id: session.id,
                combatant_id: combatant.id,
                requested_by,
                skip_dialog: true,
            })?;
            requested.push(combatant.id);
        }
        debug!(session_id = %session.id, count = requested.len(), "requested NPC batch roll");
        Ok(requested)
    }
}

fn send_award(
    host: &mut dyn SessionHost,
    session: &CombatSession,
    triggered_by: Uuid,
    rewards: RewardSettings,
) -> Result<bool, DomainError> {
    let Some(award) = experience_award(session, triggered_by, rewards) else {
        return Ok(false);
    };
    info!(
        session_id = %session.id,
        recipients = award.recipients.len(),
        defeated = award.defeated.len(),
        "awarding experience"
    );
    host.award_experience(award)?;
    Ok(true)
}
