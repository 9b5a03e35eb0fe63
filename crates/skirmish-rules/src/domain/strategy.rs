//! The rule-set strategy seam.

use skirmish_core::error::DomainError;
use skirmish_core::host::SessionHost;
use skirmish_core::model::{
    CombatSession, Combatant, ExperienceAward, InitiativeRequest, RollRequest, RuleSetFamily,
};
use skirmish_core::settings::{InitiativeMode, RewardSettings};
use tracing::debug;
use uuid::Uuid;

/// Rule-set specific initiative and reward policy.
///
/// No method blocks: rolls are handed to the host and fulfilled later, the
/// coordinator finds the results on its next tick.
pub trait RuleSetStrategy: Send + Sync + std::fmt::Debug {
    /// The family this strategy implements.
    fn family(&self) -> RuleSetFamily;

    /// Whether a real roll for `combatant` skips the roll-configuration dialog.
    fn skip_dialog(&self, _combatant: &Combatant) -> bool {
        false
    }

    /// Resolves one initiative request. Returns `Ok(false)` without touching
    /// the host when the session or combatant no longer exists.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the host rejects the write or the roll request.
    fn roll_initiative(
        &self,
        host: &mut dyn SessionHost,
        request: &InitiativeRequest,
    ) -> Result<bool, DomainError> {
        dispatch_roll(host, request, |combatant| self.skip_dialog(combatant))
    }

    /// Batch pre-roll run once when combat starts. Returns the combatants a
    /// roll was requested for; they count as already offered. `followers`
    /// are left out: they take their group leader's value instead.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the host rejects a roll request.
    fn roll_group_initiatives(
        &self,
        _host: &mut dyn SessionHost,
        _session: &CombatSession,
        _mode: InitiativeMode,
        _requested_by: Uuid,
        _followers: &[Uuid],
    ) -> Result<Vec<Uuid>, DomainError> {
        Ok(Vec::new())
    }

    /// Post-combat reward hook. Returns `Ok(true)` when an award was sent.
    ///
    /// # Errors
    ///
    /// Returns `DomainError` if the host rejects the award.
    fn award_reward(
        &self,
        _host: &mut dyn SessionHost,
        _session: &CombatSession,
        _triggered_by: Uuid,
        _rewards: RewardSettings,
    ) -> Result<bool, DomainError> {
        Ok(false)
    }
}

/// Shared roll dispatch: inherited values are written directly, everything
/// else becomes a fire-and-forget [`RollRequest`].
///
/// # Errors
///
/// Returns `DomainError` if the host rejects the write or the roll request.
pub fn dispatch_roll(
    host: &mut dyn SessionHost,
    request: &InitiativeRequest,
    skip_dialog: impl Fn(&Combatant) -> bool,
) -> Result<bool, DomainError> {
    let Some(session) = host.session(request.session_id) else {
        debug!(session_id = %request.session_id, "session gone, skipping initiative roll");
        return Ok(false);
    };
    let Some(combatant) = session.combatant(request.combatant_id) else {
        debug!(
            session_id = %request.session_id,
            combatant_id = %request.combatant_id,
            "combatant gone, skipping initiative roll"
        );
        return Ok(false);
    };

    if let Some(value) = request.inherited {
        debug!(combatant = %combatant.name, value, "assigning inherited initiative");
        host.set_initiative(session.id, combatant.id, value)?;
    } else {
        debug!(combatant = %combatant.name, "requesting initiative roll");
        host.request_initiative_roll(RollRequest {
            session_id: session.id,
            combatant_id: combatant.id,
            requested_by: request.requested_by,
            skip_dialog: skip_dialog(combatant),
        })?;
    }
    Ok(true)
}

/// Builds the experience award for a finished encounter: every player
/// character receives a share of the defeated hostile NPCs. `None` when
/// rewards are off or nothing was defeated.
#[must_use]
pub fn experience_award(
    session: &CombatSession,
    triggered_by: Uuid,
    rewards: RewardSettings,
) -> Option<ExperienceAward> {
    if !rewards.enabled {
        return None;
    }
    let defeated: Vec<Uuid> = session
        .combatants
        .iter()
        .filter(|c| c.is_hostile_npc() && c.is_defeated)
        .map(|c| c.actor_id)
        .collect();
    if defeated.is_empty() {
        return None;
    }
    let recipients = session
        .combatants
        .iter()
        .filter(|c| !c.is_npc)
        .map(|c| c.id)
        .collect();

    Some(ExperienceAward {
        session_id: session.id,
        triggered_by,
        recipients,
        defeated,
        gm_only: rewards.gm_only,
    })
}
