//! The combat lifecycle controller.

use std::sync::Arc;

use skirmish_core::clock::Clock;
use skirmish_core::error::DomainError;
use skirmish_core::host::CombatHost;
use skirmish_core::model::{CombatSession, RuleSetFamily, UserContext};
use skirmish_core::notification::HostNotification;
use skirmish_core::rng::DeterministicRng;
use skirmish_core::settings::CombatSettings;
use skirmish_initiative::{CoordinatorState, InitiativeCoordinator, PollerRegistry, TickOutcome};
use skirmish_playlist::{PlaylistHandler, auto_select, combat_choices};
use skirmish_roster::ParticipantPolicy;
use skirmish_rules::{RuleSetStrategy, select_strategy};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::outcomes::{
    Admission, CombatStart, EndReport, ParticipantsAdded, Reaction, StartTransition,
};

/// Orchestrates rule set, participant policy, initiative pollers and the
/// playlist handler around the host session's lifecycle.
///
/// One controller runs per connected client. Only the client of the user
/// that added a combatant admits it; start, combat-start and end pipelines
/// run on the GM's client only.
pub struct CombatLifecycleController {
    strategy: Box<dyn RuleSetStrategy>,
    settings: CombatSettings,
    policy: ParticipantPolicy,
    user: UserContext,
    playlists: PlaylistHandler,
    pollers: PollerRegistry,
    awaiting_selection: Option<Uuid>,
    clock: Arc<dyn Clock>,
    rng: Box<dyn DeterministicRng>,
}

impl std::fmt::Debug for CombatLifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombatLifecycleController")
            .field("strategy", &self.strategy)
            .field("user", &self.user)
            .field("playlists", &self.playlists)
            .field("pollers", &self.pollers.len())
            .field("awaiting_selection", &self.awaiting_selection)
            .finish_non_exhaustive()
    }
}

impl CombatLifecycleController {
    /// Creates a controller with an already selected strategy.
    #[must_use]
    pub fn new(
        strategy: Box<dyn RuleSetStrategy>,
        settings: CombatSettings,
        user: UserContext,
        clock: Arc<dyn Clock>,
        rng: Box<dyn DeterministicRng>,
    ) -> Self {
        Self {
            strategy,
            policy: ParticipantPolicy::from_settings(&settings),
            playlists: PlaylistHandler::new(settings.restart_resumed_playlist),
            settings,
            user,
            pollers: PollerRegistry::new(),
            awaiting_selection: None,
            clock,
            rng,
        }
    }

    /// Creates a controller for a rule-set family.
    #[must_use]
    pub fn for_family(
        family: RuleSetFamily,
        settings: CombatSettings,
        user: UserContext,
        clock: Arc<dyn Clock>,
        rng: Box<dyn DeterministicRng>,
    ) -> Self {
        let strategy = select_strategy(family, &settings);
        Self::new(strategy, settings, user, clock, rng)
    }

    /// Settings in force.
    #[must_use]
    pub fn settings(&self) -> &CombatSettings {
        &self.settings
    }

    /// The user this controller acts for.
    #[must_use]
    pub fn user(&self) -> UserContext {
        self.user
    }

    /// Rule-set family of the injected strategy.
    #[must_use]
    pub fn family(&self) -> RuleSetFamily {
        self.strategy.family()
    }

    /// Playlist handler state.
    #[must_use]
    pub fn playlists(&self) -> &PlaylistHandler {
        &self.playlists
    }

    /// Running initiative pollers.
    #[must_use]
    pub fn pollers(&self) -> &PollerRegistry {
        &self.pollers
    }

    /// Session whose start is waiting on a playlist selection.
    #[must_use]
    pub fn awaiting_selection(&self) -> Option<Uuid> {
        self.awaiting_selection
    }

    /// Applies edited settings. The strategy is rebuilt for the same family
    /// so rule-set options take effect.
    pub fn replace_settings(&mut self, settings: CombatSettings) {
        self.policy = ParticipantPolicy::from_settings(&settings);
        self.playlists
            .set_restart_on_resume(settings.restart_resumed_playlist);
        self.strategy = select_strategy(self.strategy.family(), &settings);
        self.settings = settings;
        info!("combat settings updated");
    }

    /// Dispatches a host notification to its pipeline.
    pub fn handle<H: CombatHost>(&mut self, host: &mut H, notification: &HostNotification) -> Reaction {
        debug!(
            notification_type = notification.notification_type(),
            payload = %notification.to_payload(),
            "host notification"
        );
        match notification {
            HostNotification::CombatantAdded {
                session_id,
                combatant_id,
                added_by,
            } => Reaction::Admission(self.admit(host, *session_id, *combatant_id, *added_by)),
            HostNotification::RoundChanged {
                session_id,
                from,
                to,
            } => match self.on_round_changed(host, *session_id, *from, *to) {
                StartTransition::Skipped => Reaction::Ignored,
                transition => Reaction::Start(transition),
            },
            HostNotification::CombatStarted { session_id } => self
                .on_combat_started(host, *session_id)
                .map_or(Reaction::Ignored, Reaction::InitiativeStarted),
            HostNotification::CombatEnded { session, ended_by } => self
                .on_combat_ended(host, session, *ended_by)
                .map_or(Reaction::Ignored, Reaction::Ended),
            HostNotification::PlaylistStopped { playlist_id } => {
                if self.on_playlist_stopped(host, *playlist_id) {
                    Reaction::FanfareFinished
                } else {
                    Reaction::Ignored
                }
            }
        }
    }

    /// Admission pipeline for a combatant that just joined: exclusion by tag,
    /// then, while combat runs, one initiative request respecting grouping.
    pub fn admit<H: CombatHost>(
        &mut self,
        host: &mut H,
        session_id: Uuid,
        combatant_id: Uuid,
        added_by: Uuid,
    ) -> Admission {
        if added_by != self.user.user_id {
            return Admission::Ignored;
        }
        let Some(session) = host.session(session_id) else {
            return Admission::Ignored;
        };
        let Some(combatant) = session.combatant(combatant_id).cloned() else {
            return Admission::Ignored;
        };
        if combatant.has_initiative() {
            return Admission::Ignored;
        }

        if self.policy.should_exclude(&combatant) {
            info!(combatant = %combatant.name, "combatant carries an ignored tag, removing");
            if let Err(e) = host.remove_combatant(session_id, combatant_id) {
                warn!(combatant = %combatant.name, error = %e, "failed to remove ignored combatant");
            }
            return Admission::Excluded;
        }

        if !session.is_active() || self.settings.initiative.is_disabled() {
            return Admission::Deferred;
        }
        if !self.settings.initiative.admits(&combatant) {
            return Admission::NotRequired;
        }

        if !self.pollers.is_polling(session_id) {
            debug!(session_id = %session_id, "starting poller for mid-fight admission");
            self.pollers.install(self.coordinator_for(session_id));
        }
        let Some(poller) = self.pollers.get_mut(session_id) else {
            return Admission::Deferred;
        };
        poller
            .admit(host, self.strategy.as_ref(), &self.policy, &combatant)
            .into()
    }

    /// Start transition (round 0 to 1): prompt for a playlist or pick one.
    pub fn on_round_changed<H: CombatHost>(
        &mut self,
        host: &mut H,
        session_id: Uuid,
        from: u32,
        to: u32,
    ) -> StartTransition {
        if !self.user.is_gm || from != 0 || to != 1 {
            return StartTransition::Skipped;
        }
        info!(session_id = %session_id, "combat starting");

        if self.settings.choose_playlist {
            let choices = combat_choices(&self.settings.playlists, &*host);
            if !choices.is_empty() {
                self.awaiting_selection = Some(session_id);
                return StartTransition::AwaitingSelection(choices);
            }
            debug!("no playlists to choose from, selecting automatically");
        }

        let active_scene = host.active_scene();
        let selection = auto_select(
            &self.settings.playlists,
            &*host,
            active_scene,
            self.rng.as_mut(),
        );
        let started = self.playlists.start_combat(host, selection);
        StartTransition::Started(selection.filter(|_| started))
    }

    /// Feeds back the answer to the playlist prompt; `None` plays nothing.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Forbidden` for non-GM users and
    /// `DomainError::Validation` when no prompt is outstanding.
    pub fn select_playlist<H: CombatHost>(
        &mut self,
        host: &mut H,
        selection: Option<Uuid>,
    ) -> Result<StartTransition, DomainError> {
        self.require_gm()?;
        let Some(session_id) = self.awaiting_selection.take() else {
            return Err(DomainError::Validation(
                "no combat start is waiting for a playlist selection".into(),
            ));
        };
        debug!(session_id = %session_id, selection = ?selection, "combat playlist selected");
        let started = self.playlists.start_combat(host, selection);
        Ok(StartTransition::Started(selection.filter(|_| started)))
    }

    /// Combat-start side effects: begin initiative resolution and install the
    /// coordinator as the session's only poller.
    pub fn on_combat_started<H: CombatHost>(
        &mut self,
        host: &mut H,
        session_id: Uuid,
    ) -> Option<CoordinatorState> {
        if !self.user.is_gm || self.settings.initiative.is_disabled() {
            return None;
        }
        let mut coordinator = self.coordinator_for(session_id);
        let state = coordinator.begin(host, self.strategy.as_ref(), &self.policy);
        if state.is_terminal() {
            self.pollers.cancel(session_id);
        } else {
            self.pollers.install(coordinator);
        }
        Some(state)
    }

    /// End pipeline: stop marker effects, award rewards, clear defeated
    /// hostiles off the active scene, cancel the poller and hand the audio
    /// over to the fanfare or the previous playlist. Failing steps are logged
    /// and skipped.
    pub fn on_combat_ended<H: CombatHost>(
        &mut self,
        host: &mut H,
        session: &CombatSession,
        ended_by: Uuid,
    ) -> Option<EndReport> {
        if !self.user.is_gm {
            return None;
        }
        info!(session_id = %session.id, "combat ended");
        self.pollers.cancel(session.id);
        if self.awaiting_selection == Some(session.id) {
            self.awaiting_selection = None;
        }

        host.end_marker_effects();

        let rewards = self.settings.rewards();
        let rewarded = rewards.enabled
            && self
                .strategy
                .award_reward(host, session, ended_by, rewards)
                .unwrap_or_else(|e| {
                    warn!(session_id = %session.id, error = %e, "experience award failed");
                    false
                });

        let mut removed_tokens = Vec::new();
        if let Some(scene_id) = host.active_scene() {
            let selected = self
                .policy
                .select_for_removal(session, |c| host.scene_has_token(scene_id, c.token_id));
            removed_tokens = session
                .combatants
                .iter()
                .filter(|c| selected.contains(&c.id))
                .map(|c| c.token_id)
                .collect();
            if !removed_tokens.is_empty() {
                info!(count = removed_tokens.len(), "removing defeated hostile tokens");
                if let Err(e) = host.delete_tokens(scene_id, &removed_tokens) {
                    warn!(error = %e, "failed to remove defeated tokens");
                    removed_tokens.clear();
                }
            }
        }

        let fanfare = self.playlists.end_combat(host, &self.settings.playlists);

        Some(EndReport {
            session_id: session.id,
            rewarded,
            removed_tokens,
            fanfare,
        })
    }

    /// Forwards a playlist stop to the handler. Returns `true` when it was the
    /// fanfare.
    pub fn on_playlist_stopped<H: CombatHost>(&mut self, host: &mut H, playlist_id: Uuid) -> bool {
        self.playlists.on_playlist_stopped(host, playlist_id)
    }

    /// Runs one polling tick for every live poller.
    pub fn tick<H: CombatHost>(&mut self, host: &mut H) -> Vec<(Uuid, TickOutcome)> {
        self.pollers
            .tick_all(host, self.strategy.as_ref(), self.clock.as_ref())
    }

    /// Adds the active scene's player tokens that are not in combat yet,
    /// creating the session first if there is none, and admits each.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Forbidden` for non-GM users,
    /// `DomainError::Validation` without an active scene, or the host's error.
    pub fn add_participants<H: CombatHost>(
        &mut self,
        host: &mut H,
        requested_by: Uuid,
    ) -> Result<ParticipantsAdded, DomainError> {
        self.require_gm()?;
        let scene_id = host
            .active_scene()
            .ok_or_else(|| DomainError::Validation("no active scene".into()))?;

        let (session_id, created) = match host.current_session() {
            Some(session) => (session.id, false),
            None => (host.create_session(scene_id)?, true),
        };
        let session = host
            .session(session_id)
            .ok_or(DomainError::SessionNotFound(session_id))?;

        let tokens: Vec<Uuid> = host
            .player_tokens(scene_id)
            .into_iter()
            .filter(|token| !session.has_token(*token))
            .collect();
        let added = if tokens.is_empty() {
            Vec::new()
        } else {
            host.add_tokens(session_id, &tokens)?
        };
        info!(session_id = %session_id, added = added.len(), created, "participants added");

        let admissions = added
            .into_iter()
            .map(|combatant_id| {
                let admission = self.admit(host, session_id, combatant_id, requested_by);
                (combatant_id, admission)
            })
            .collect();

        Ok(ParticipantsAdded {
            session_id,
            created,
            admissions,
        })
    }

    /// Starts combat: nothing when it already runs, otherwise moves the
    /// current session (created with participants if missing) to round 1.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Forbidden` for non-GM users or the host's error.
    pub fn start_combat<H: CombatHost>(
        &mut self,
        host: &mut H,
        requested_by: Uuid,
    ) -> Result<CombatStart, DomainError> {
        self.require_gm()?;
        let session_id = match host.current_session() {
            Some(session) if session.is_active() => {
                debug!(session_id = %session.id, "combat already running");
                return Ok(CombatStart::AlreadyActive(session.id));
            }
            Some(session) => session.id,
            None => self.add_participants(host, requested_by)?.session_id,
        };
        host.begin_session(session_id)?;
        Ok(CombatStart::Began(session_id))
    }

    /// Ends the current combat. `Ok(None)` when there is none.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Forbidden` for non-GM users or the host's error.
    pub fn end_combat<H: CombatHost>(&mut self, host: &mut H) -> Result<Option<Uuid>, DomainError> {
        self.require_gm()?;
        let Some(session) = host.current_session() else {
            debug!("no combat to end");
            return Ok(None);
        };
        host.end_session(session.id)?;
        Ok(Some(session.id))
    }

    fn coordinator_for(&self, session_id: Uuid) -> InitiativeCoordinator {
        InitiativeCoordinator::new(
            session_id,
            self.settings.initiative,
            self.user.user_id,
            self.settings.max_poll_ticks,
            self.clock.as_ref(),
        )
    }

    fn require_gm(&self) -> Result<(), DomainError> {
        if self.user.is_gm {
            Ok(())
        } else {
            Err(DomainError::Forbidden(
                "only the game master can run combat operations".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use skirmish_core::host::SceneHost;
    use skirmish_core::model::PlaylistMode;
    use skirmish_core::settings::{InitiativeMode, PlaylistEntry};
    use skirmish_playlist::FanfareOutcome;
    use skirmish_rules::{Dnd5eRules, GenericRules};
    use skirmish_test_support::fixtures::{active_session, hostile, npc, pc, preparing_session, tagged};
    use skirmish_test_support::{FakeHost, FixedClock, MockRng};

    use super::*;

    fn gm() -> UserContext {
        UserContext::gm(Uuid::new_v4())
    }

    fn controller_with(
        strategy: Box<dyn RuleSetStrategy>,
        settings: CombatSettings,
        user: UserContext,
    ) -> CombatLifecycleController {
        CombatLifecycleController::new(
            strategy,
            settings,
            user,
            Arc::new(FixedClock(Utc::now())),
            Box::new(MockRng),
        )
    }

    fn controller(settings: CombatSettings, user: UserContext) -> CombatLifecycleController {
        controller_with(Box::new(GenericRules), settings, user)
    }

    fn entry(playlist_id: Uuid, fanfare: bool) -> PlaylistEntry {
        PlaylistEntry {
            playlist_id,
            scene_id: None,
            fanfare,
        }
    }

    #[test]
    fn test_grouped_npcs_resolve_to_one_shared_roll() {
        // Arrange
        let user = gm();
        let actor = Uuid::new_v4();
        let a = pc("Aria");
        let b = npc("Goblin", actor);
        let c = npc("Goblin", actor);
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        let session = active_session(vec![a, b, c]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session);
        let settings = CombatSettings {
            group_npcs: true,
            ..CombatSettings::default()
        };
        let mut controller = controller(settings, user);

        // Act
        let reaction = controller.handle(&mut host, &HostNotification::CombatStarted { session_id });
        host.fulfill(session_id, a_id, 18.0);
        host.fulfill(session_id, b_id, 9.0);
        let outcomes = controller.tick(&mut host);

        // Assert
        assert_eq!(reaction, Reaction::InitiativeStarted(CoordinatorState::Polling));
        assert_eq!(outcomes, vec![(session_id, TickOutcome::Settled)]);
        assert_eq!(host.roll_requests_for(b_id), 1);
        assert_eq!(host.roll_requests_for(c_id), 0);
        assert_eq!(host.initiative_of(session_id, b_id), host.initiative_of(session_id, c_id));
        assert!(host.initiative_of(session_id, a_id).is_some());
        assert!(controller.pollers().is_empty());
    }

    #[test]
    fn test_combat_start_with_disabled_initiative_does_nothing() {
        let session = active_session(vec![pc("Aria")]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session);
        let settings = CombatSettings {
            initiative: InitiativeMode::Disabled,
            ..CombatSettings::default()
        };
        let mut controller = controller(settings, gm());

        let reaction = controller.handle(&mut host, &HostNotification::CombatStarted { session_id });

        assert_eq!(reaction, Reaction::Ignored);
        assert!(host.roll_requests.is_empty());
    }

    #[test]
    fn test_combat_start_on_player_client_does_nothing() {
        let session = active_session(vec![pc("Aria")]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session);
        let mut controller = controller(CombatSettings::default(), UserContext::player(Uuid::new_v4()));

        let reaction = controller.handle(&mut host, &HostNotification::CombatStarted { session_id });

        assert_eq!(reaction, Reaction::Ignored);
        assert!(controller.pollers().is_empty());
    }

    #[test]
    fn test_tagged_combatant_is_removed_without_roll() {
        // Arrange
        let user = gm();
        let session = active_session(vec![pc("Aria")]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session);
        let summon = tagged(npc("Imp", Uuid::new_v4()), "summon");
        let summon_id = summon.id;
        host.push_combatant(session_id, summon);
        let settings = CombatSettings {
            ignore_tags: "summon".to_owned(),
            ..CombatSettings::default()
        };
        let mut controller = controller(settings, user);

        // Act
        let reaction = controller.handle(
            &mut host,
            &HostNotification::CombatantAdded {
                session_id,
                combatant_id: summon_id,
                added_by: user.user_id,
            },
        );

        // Assert
        assert_eq!(reaction, Reaction::Admission(Admission::Excluded));
        assert_eq!(host.removed, vec![(session_id, summon_id)]);
        assert_eq!(host.roll_requests_for(summon_id), 0);
        assert!(host.sessions[&session_id].combatant(summon_id).is_none());
    }

    #[test]
    fn test_combatant_added_by_other_user_is_ignored() {
        let session = active_session(vec![]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session);
        let aria = pc("Aria");
        let aria_id = aria.id;
        host.push_combatant(session_id, aria);
        let mut controller = controller(CombatSettings::default(), gm());

        let admission = controller.admit(&mut host, session_id, aria_id, Uuid::new_v4());

        assert_eq!(admission, Admission::Ignored);
        assert!(host.roll_requests.is_empty());
    }

    #[test]
    fn test_admission_before_combat_is_deferred() {
        let user = gm();
        let session = preparing_session(vec![]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session);
        let aria = pc("Aria");
        let aria_id = aria.id;
        host.push_combatant(session_id, aria);
        let mut controller = controller(CombatSettings::default(), user);

        let admission = controller.admit(&mut host, session_id, aria_id, user.user_id);

        assert_eq!(admission, Admission::Deferred);
        assert!(controller.pollers().is_empty());
    }

    #[test]
    fn test_mid_fight_admission_keeps_a_poller_alive() {
        // Arrange
        let user = gm();
        let mut settled = pc("Aria");
        settled.initiative = Some(12.0);
        let session = active_session(vec![settled]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session);
        let late = pc("Bram");
        let late_id = late.id;
        host.push_combatant(session_id, late);
        let mut controller = controller(CombatSettings::default(), user);

        // Act
        let admission = controller.admit(&mut host, session_id, late_id, user.user_id);
        host.fulfill(session_id, late_id, 7.0);
        let outcomes = controller.tick(&mut host);

        // Assert
        assert_eq!(admission, Admission::Requested);
        assert_eq!(outcomes, vec![(session_id, TickOutcome::Settled)]);
        assert_eq!(host.roll_requests_for(late_id), 1);
    }

    #[test]
    fn test_mid_fight_arrival_outside_mode_starts_no_poller() {
        // Arrange
        let user = gm();
        let session = active_session(vec![]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session);
        let late = pc("Bram");
        let late_id = late.id;
        host.push_combatant(session_id, late);
        let settings = CombatSettings {
            initiative: InitiativeMode::Npc,
            ..CombatSettings::default()
        };
        let mut controller = controller(settings, user);

        // Act
        let admission = controller.admit(&mut host, session_id, late_id, user.user_id);

        // Assert
        assert_eq!(admission, Admission::NotRequired);
        assert!(controller.pollers().is_empty());
        assert_eq!(host.roll_requests_for(late_id), 0);
    }

    #[test]
    fn test_mid_fight_group_member_inherits_leader_value() {
        let user = gm();
        let actor = Uuid::new_v4();
        let mut leader = npc("Goblin", actor);
        leader.initiative = Some(14.0);
        let session = active_session(vec![leader]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session);
        let newcomer = npc("Goblin", actor);
        let newcomer_id = newcomer.id;
        host.push_combatant(session_id, newcomer);
        let settings = CombatSettings {
            group_npcs: true,
            ..CombatSettings::default()
        };
        let mut controller = controller(settings, user);

        let admission = controller.admit(&mut host, session_id, newcomer_id, user.user_id);

        assert_eq!(admission, Admission::Inherited(14.0));
        assert_eq!(host.initiative_of(session_id, newcomer_id), Some(14.0));
    }

    #[test]
    fn test_round_change_selects_playlist_automatically() {
        // Arrange
        let session = preparing_session(vec![pc("Aria")]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session);
        let ambient = host.add_playlist("Tavern", PlaylistMode::Shuffle);
        let battle = host.add_playlist("Battle", PlaylistMode::Sequential);
        host.set_playing(ambient, true);
        let settings = CombatSettings {
            playlists: vec![entry(battle, false)],
            ..CombatSettings::default()
        };
        let mut controller = controller(settings, gm());

        // Act
        let reaction = controller.handle(
            &mut host,
            &HostNotification::RoundChanged {
                session_id,
                from: 0,
                to: 1,
            },
        );

        // Assert
        assert_eq!(reaction, Reaction::Start(StartTransition::Started(Some(battle))));
        assert!(host.is_playing(battle));
        assert!(!host.is_playing(ambient));
        assert_eq!(controller.playlists().state().previous, Some(ambient));
    }

    #[test]
    fn test_later_round_changes_are_ignored() {
        let session = active_session(vec![]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session);
        let mut controller = controller(CombatSettings::default(), gm());

        let reaction = controller.handle(
            &mut host,
            &HostNotification::RoundChanged {
                session_id,
                from: 1,
                to: 2,
            },
        );

        assert_eq!(reaction, Reaction::Ignored);
    }

    #[test]
    fn test_prompted_selection_waits_for_answer() {
        // Arrange
        let session = preparing_session(vec![]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session);
        let battle = host.add_playlist("Battle", PlaylistMode::Sequential);
        let boss = host.add_playlist("Boss Fight", PlaylistMode::Sequential);
        let settings = CombatSettings {
            choose_playlist: true,
            playlists: vec![entry(battle, false), entry(boss, false)],
            ..CombatSettings::default()
        };
        let mut controller = controller(settings, gm());

        // Act
        let transition = controller.on_round_changed(&mut host, session_id, 0, 1);
        let waiting = controller.awaiting_selection();
        let answer = controller.select_playlist(&mut host, Some(boss)).unwrap();

        // Assert
        let StartTransition::AwaitingSelection(choices) = transition else {
            panic!("expected a prompt, got {transition:?}");
        };
        assert_eq!(choices.len(), 2);
        assert!(choices[1].boss);
        assert_eq!(waiting, Some(session_id));
        assert!(host.play_log.iter().all(|(id, _)| *id == boss));
        assert_eq!(answer, StartTransition::Started(Some(boss)));
        assert_eq!(controller.awaiting_selection(), None);
    }

    #[test]
    fn test_prompt_answered_with_none_plays_nothing() {
        let session = preparing_session(vec![]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session);
        let battle = host.add_playlist("Battle", PlaylistMode::Sequential);
        let settings = CombatSettings {
            choose_playlist: true,
            playlists: vec![entry(battle, false)],
            ..CombatSettings::default()
        };
        let mut controller = controller(settings, gm());
        controller.on_round_changed(&mut host, session_id, 0, 1);

        let answer = controller.select_playlist(&mut host, None).unwrap();

        assert_eq!(answer, StartTransition::Started(None));
        assert!(host.play_log.is_empty());
    }

    #[test]
    fn test_end_pipeline_runs_every_step() {
        // Arrange
        let user = gm();
        let mut ogre = hostile("Ogre", Uuid::new_v4());
        ogre.is_defeated = true;
        let ogre_token = ogre.token_id;
        let session = active_session(vec![pc("Aria"), ogre]);
        let session_id = session.id;
        let scene_id = session.scene_id;
        let mut host = FakeHost::new().with_session(session.clone());
        let battle = host.add_playlist("Battle", PlaylistMode::Sequential);
        let victory = host.add_playlist("Victory", PlaylistMode::Disabled);
        let settings = CombatSettings {
            remove_defeated: true,
            award_experience: true,
            playlists: vec![entry(battle, false), entry(victory, true)],
            ..CombatSettings::default()
        };
        let mut controller = controller_with(Box::new(Dnd5eRules), settings, user);
        controller.handle(&mut host, &HostNotification::CombatStarted { session_id });
        controller.playlists.start_combat(&mut host, Some(battle));
        host.drop_session(session_id);

        // Act
        let reaction = controller.handle(
            &mut host,
            &HostNotification::CombatEnded {
                session,
                ended_by: user.user_id,
            },
        );

        // Assert
        assert_eq!(
            reaction,
            Reaction::Ended(EndReport {
                session_id,
                rewarded: true,
                removed_tokens: vec![ogre_token],
                fanfare: FanfareOutcome::Started,
            })
        );
        assert_eq!(host.marker_effects_ended, 1);
        assert_eq!(host.awards.len(), 1);
        assert_eq!(host.deleted_tokens, vec![(scene_id, vec![ogre_token])]);
        assert!(!host.scene_has_token(scene_id, ogre_token));
        assert!(controller.pollers().is_empty());
        assert!(host.is_playing(victory));
        assert!(!host.is_playing(battle));
    }

    #[test]
    fn test_end_without_rewards_or_removal() {
        let user = gm();
        let mut ogre = hostile("Ogre", Uuid::new_v4());
        ogre.is_defeated = true;
        let session = active_session(vec![pc("Aria"), ogre]);
        let mut host = FakeHost::new().with_session(session.clone());
        let mut controller = controller_with(Box::new(Dnd5eRules), CombatSettings::default(), user);

        let report = controller
            .on_combat_ended(&mut host, &session, user.user_id)
            .unwrap();

        assert!(!report.rewarded);
        assert!(report.removed_tokens.is_empty());
        assert_eq!(report.fanfare, FanfareOutcome::NotStarted);
        assert!(host.awards.is_empty());
        assert!(host.deleted_tokens.is_empty());
    }

    #[test]
    fn test_end_on_player_client_is_ignored() {
        let session = active_session(vec![pc("Aria")]);
        let mut host = FakeHost::new().with_session(session.clone());
        let mut controller = controller(CombatSettings::default(), UserContext::player(Uuid::new_v4()));

        let reaction = controller.handle(
            &mut host,
            &HostNotification::CombatEnded {
                session,
                ended_by: Uuid::new_v4(),
            },
        );

        assert_eq!(reaction, Reaction::Ignored);
        assert_eq!(host.marker_effects_ended, 0);
    }

    #[test]
    fn test_start_then_end_resumes_previous_playlist() {
        // Arrange
        let user = gm();
        let session = preparing_session(vec![pc("Aria")]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session.clone());
        let ambient = host.add_playlist("Tavern", PlaylistMode::Shuffle);
        let battle = host.add_playlist("Battle", PlaylistMode::Sequential);
        host.set_playing(ambient, true);
        let settings = CombatSettings {
            playlists: vec![entry(battle, false)],
            ..CombatSettings::default()
        };
        let mut controller = controller(settings, user);

        // Act
        controller.on_round_changed(&mut host, session_id, 0, 1);
        controller.on_combat_ended(&mut host, &session, user.user_id);

        // Assert
        assert!(host.is_playing(ambient));
        assert!(!host.is_playing(battle));
    }

    #[test]
    fn test_fanfare_stop_resumes_previous_playlist() {
        // Arrange
        let user = gm();
        let session = preparing_session(vec![]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session.clone());
        let ambient = host.add_playlist("Tavern", PlaylistMode::Shuffle);
        let battle = host.add_playlist("Battle", PlaylistMode::Sequential);
        let victory = host.add_playlist("Victory", PlaylistMode::Disabled);
        host.set_playing(ambient, true);
        let settings = CombatSettings {
            playlists: vec![entry(battle, false), entry(victory, true)],
            ..CombatSettings::default()
        };
        let mut controller = controller(settings, user);
        controller.on_round_changed(&mut host, session_id, 0, 1);
        controller.on_combat_ended(&mut host, &session, user.user_id);

        // Act
        host.set_playing(victory, false);
        let other = controller.handle(&mut host, &HostNotification::PlaylistStopped { playlist_id: battle });
        let fanfare = controller.handle(&mut host, &HostNotification::PlaylistStopped { playlist_id: victory });

        // Assert
        assert_eq!(other, Reaction::Ignored);
        assert_eq!(fanfare, Reaction::FanfareFinished);
        assert!(host.is_playing(ambient));
        assert_eq!(controller.playlists().state().fanfare, None);
    }

    #[test]
    fn test_replace_settings_updates_policy() {
        let user = gm();
        let session = active_session(vec![]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session);
        let familiar = tagged(npc("Owl", Uuid::new_v4()), "familiar");
        let familiar_id = familiar.id;
        host.push_combatant(session_id, familiar);
        let mut controller = controller(CombatSettings::default(), user);

        controller.replace_settings(CombatSettings {
            ignore_tags: "familiar".to_owned(),
            ..CombatSettings::default()
        });
        let admission = controller.admit(&mut host, session_id, familiar_id, user.user_id);

        assert_eq!(admission, Admission::Excluded);
        assert_eq!(controller.settings().ignore_tags, "familiar");
    }
}
