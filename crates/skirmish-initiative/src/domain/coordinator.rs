//! The per-session initiative state machine.
//!
//! `Idle -> Requesting -> Polling -> Settled | TimedOut`, or `Cancelled` as
//! soon as the session disappears. Every decision re-reads the roster
//! snapshot; the coordinator only remembers who it already asked.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use skirmish_core::clock::Clock;
use skirmish_core::host::SessionHost;
use skirmish_core::model::{CombatPhase, CombatSession, Combatant, InitiativeRequest};
use skirmish_core::settings::InitiativeMode;
use skirmish_roster::ParticipantPolicy;
use skirmish_rules::RuleSetStrategy;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Coordinator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinatorState {
    /// Created, nothing requested yet.
    Idle,
    /// Dispatching the initial requests.
    Requesting,
    /// Waiting for results.
    Polling,
    /// Every required combatant has a value.
    Settled,
    /// The tick budget ran out first.
    TimedOut,
    /// The session went away.
    Cancelled,
}

impl CoordinatorState {
    /// Returns `true` once the coordinator will not tick again.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Settled | Self::TimedOut | Self::Cancelled)
    }
}

/// Result of one polling tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still waiting on these combatants.
    Waiting {
        /// Combatants without a value.
        missing: Vec<Uuid>,
    },
    /// Nothing left to wait for.
    Settled,
    /// Gave up; these combatants never got a value.
    TimedOut {
        /// Combatants without a value.
        missing: Vec<Uuid>,
    },
    /// The session is gone.
    Cancelled,
}

/// What happened to a single combatant admitted mid-fight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AdmissionRoll {
    /// Already has a value, or the mode does not roll for it.
    NotRequired,
    /// A request went out earlier.
    AlreadyOffered,
    /// A roll was requested.
    Requested,
    /// Copied from a resolved group leader.
    Inherited(f64),
    /// Waits for the given group leader's roll.
    Following(Uuid),
    /// Gone from the roster, or the host rejected the request. A later tick
    /// retries the latter.
    Skipped,
}

/// Drives roll requests for one session and polls until they resolve.
#[derive(Debug, Clone)]
pub struct InitiativeCoordinator {
    session_id: Uuid,
    mode: InitiativeMode,
    requested_by: Uuid,
    state: CoordinatorState,
    ticks: u32,
    max_ticks: u32,
    offered: HashSet<Uuid>,
    followers: HashMap<Uuid, Uuid>,
    started_at: DateTime<Utc>,
}

impl InitiativeCoordinator {
    /// Creates an idle coordinator.
    #[must_use]
    pub fn new(
        session_id: Uuid,
        mode: InitiativeMode,
        requested_by: Uuid,
        max_ticks: u32,
        clock: &dyn Clock,
    ) -> Self {
        Self {
            session_id,
            mode,
            requested_by,
            state: CoordinatorState::Idle,
            ticks: 0,
            max_ticks: max_ticks.max(1),
            offered: HashSet::new(),
            followers: HashMap::new(),
            started_at: clock.now(),
        }
    }

    /// Session this coordinator works on.
    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Mode filter in force.
    #[must_use]
    pub fn mode(&self) -> InitiativeMode {
        self.mode
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    /// Ticks run so far.
    #[must_use]
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Tick budget.
    #[must_use]
    pub fn max_ticks(&self) -> u32 {
        self.max_ticks
    }

    /// When the coordinator was created.
    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns `true` if a request already went out for the combatant.
    #[must_use]
    pub fn has_offered(&self, combatant_id: Uuid) -> bool {
        self.offered.contains(&combatant_id)
    }

    /// The leader a follower is waiting on.
    #[must_use]
    pub fn leader_of(&self, follower_id: Uuid) -> Option<Uuid> {
        self.followers.get(&follower_id).copied()
    }

    /// Number of followers still waiting for their leader.
    #[must_use]
    pub fn pending_followers(&self) -> usize {
        self.followers.len()
    }

    /// Marks the coordinator cancelled.
    pub fn cancel(&mut self) {
        if !self.state.is_terminal() {
            debug!(session_id = %self.session_id, "initiative coordinator cancelled");
        }
        self.state = CoordinatorState::Cancelled;
    }

    /// Sends the initial requests: the rule set's batch roll first, then one
    /// roll per NPC group (followers wait for their leader), then everyone
    /// else the mode admits. Moves to `Polling`.
    pub fn begin(
        &mut self,
        host: &mut dyn SessionHost,
        strategy: &dyn RuleSetStrategy,
        policy: &ParticipantPolicy,
    ) -> CoordinatorState {
        if self.state != CoordinatorState::Idle {
            debug!(session_id = %self.session_id, state = ?self.state, "coordinator already started");
            return self.state;
        }
        self.state = CoordinatorState::Requesting;

        let Some(session) = self.live_session(&*host) else {
            return self.state;
        };
        if self.mode.is_disabled() {
            self.state = CoordinatorState::Settled;
            return self.state;
        }

        let groups = policy.group_for_initiative(&session);
        let followers: Vec<Uuid> = groups
            .iter()
            .flat_map(|g| g.followers.iter().copied())
            .collect();
        match strategy.roll_group_initiatives(
            host,
            &session,
            self.mode,
            self.requested_by,
            &followers,
        ) {
            Ok(requested) => self.offered.extend(requested),
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "group initiative roll failed");
            }
        }

        for group in groups {
            let Some(leader) = session.combatant(group.leader) else {
                continue;
            };
            if !self.mode.admits(leader) {
                continue;
            }
            if !leader.has_initiative() {
                self.offer(host, strategy, self.roll_for(leader.id));
            }
            for follower in group.followers.iter().filter_map(|id| session.combatant(*id)) {
                if follower.has_initiative() || self.offered.contains(&follower.id) {
                    continue;
                }
                if let Some(value) = leader.initiative {
                    self.offer(host, strategy, self.inherit_for(follower.id, value));
                } else {
                    self.followers.insert(follower.id, leader.id);
                }
            }
        }

        for combatant in &session.combatants {
            if self.needs_offer(combatant) {
                self.offer(host, strategy, self.roll_for(combatant.id));
            }
        }

        self.state = CoordinatorState::Polling;
        info!(
            session_id = %self.session_id,
            offered = self.offered.len(),
            followers = self.followers.len(),
            "initiative requested, polling for results"
        );
        self.state
    }

    /// One polling step. Copies resolved leader values to their followers,
    /// then checks who is still missing and asks anyone never asked before.
    pub fn tick(
        &mut self,
        host: &mut dyn SessionHost,
        strategy: &dyn RuleSetStrategy,
        clock: &dyn Clock,
    ) -> TickOutcome {
        match self.state {
            CoordinatorState::Settled => return TickOutcome::Settled,
            CoordinatorState::TimedOut => return TickOutcome::TimedOut { missing: Vec::new() },
            CoordinatorState::Cancelled => return TickOutcome::Cancelled,
            CoordinatorState::Idle | CoordinatorState::Requesting | CoordinatorState::Polling => {}
        }
        self.state = CoordinatorState::Polling;
        self.ticks = self.ticks.saturating_add(1);

        let Some(session) = self.live_session(&*host) else {
            return TickOutcome::Cancelled;
        };
        if !self.followers.is_empty() {
            self.propagate_group_values(host, strategy, &session);
        }

        let Some(session) = self.live_session(&*host) else {
            return TickOutcome::Cancelled;
        };
        let missing: Vec<Uuid> = session
            .combatants
            .iter()
            .filter(|c| self.mode.admits(c) && !c.has_initiative())
            .map(|c| c.id)
            .collect();

        if missing.is_empty() {
            self.state = CoordinatorState::Settled;
            info!(session_id = %self.session_id, ticks = self.ticks, "initiative settled");
            return TickOutcome::Settled;
        }

        if self.ticks >= self.max_ticks {
            self.state = CoordinatorState::TimedOut;
            warn!(
                session_id = %self.session_id,
                missing = missing.len(),
                ticks = self.ticks,
                elapsed_ms = clock.elapsed_ms(self.started_at),
                "initiative polling timed out"
            );
            return TickOutcome::TimedOut { missing };
        }

        for combatant in &session.combatants {
            if self.needs_offer(combatant) {
                self.offer(host, strategy, self.roll_for(combatant.id));
            }
        }
        debug!(session_id = %self.session_id, missing = missing.len(), "waiting for initiative");
        TickOutcome::Waiting { missing }
    }

    /// Single-arrival path for a combatant added mid-fight: inherit from a
    /// resolved group leader, follow a pending one, or request a roll.
    pub fn admit(
        &mut self,
        host: &mut dyn SessionHost,
        strategy: &dyn RuleSetStrategy,
        policy: &ParticipantPolicy,
        combatant: &Combatant,
    ) -> AdmissionRoll {
        if self.state == CoordinatorState::Idle {
            self.state = CoordinatorState::Polling;
        }
        if combatant.has_initiative() || !self.mode.admits(combatant) {
            return AdmissionRoll::NotRequired;
        }
        if self.offered.contains(&combatant.id) {
            return AdmissionRoll::AlreadyOffered;
        }
        if let Some(leader) = self.leader_of(combatant.id) {
            return AdmissionRoll::Following(leader);
        }
        let Some(session) = host.session(self.session_id) else {
            return AdmissionRoll::Skipped;
        };

        if let Some(leader) = policy.group_leader_for(&session, combatant) {
            if let Some(value) = leader.initiative {
                return if self.offer(host, strategy, self.inherit_for(combatant.id, value)) {
                    AdmissionRoll::Inherited(value)
                } else {
                    AdmissionRoll::Skipped
                };
            }
            let root = self.leader_of(leader.id).unwrap_or(leader.id);
            self.followers.insert(combatant.id, root);
            debug!(combatant = %combatant.name, leader = %root, "following group leader");
            return AdmissionRoll::Following(root);
        }

        if self.offer(host, strategy, self.roll_for(combatant.id)) {
            AdmissionRoll::Requested
        } else {
            AdmissionRoll::Skipped
        }
    }

    fn propagate_group_values(
        &mut self,
        host: &mut dyn SessionHost,
        strategy: &dyn RuleSetStrategy,
        session: &CombatSession,
    ) {
        self.followers.retain(|follower, _| {
            session
                .combatant(*follower)
                .is_some_and(|c| !c.has_initiative())
        });

        for combatant in &session.combatants {
            let Some(leader_id) = self.leader_of(combatant.id) else {
                continue;
            };
            match session.combatant(leader_id) {
                Some(leader) => {
                    if let Some(value) = leader.initiative {
                        self.followers.remove(&combatant.id);
                        self.offer(host, strategy, self.inherit_for(combatant.id, value));
                    }
                }
                None => {
                    self.followers.remove(&combatant.id);
                    for leader in self.followers.values_mut() {
                        if *leader == leader_id {
                            *leader = combatant.id;
                        }
                    }
                    info!(
                        session_id = %self.session_id,
                        combatant = %combatant.name,
                        "group leader left, promoting follower"
                    );
                    self.offer(host, strategy, self.roll_for(combatant.id));
                }
            }
        }
    }

    fn live_session(&mut self, host: &dyn SessionHost) -> Option<CombatSession> {
        let session = host
            .session(self.session_id)
            .filter(|s| s.phase != CombatPhase::Ended);
        if session.is_none() {
            info!(session_id = %self.session_id, "session gone, cancelling initiative polling");
            self.state = CoordinatorState::Cancelled;
        }
        session
    }

    fn needs_offer(&self, combatant: &Combatant) -> bool {
        self.mode.admits(combatant)
            && !combatant.has_initiative()
            && !self.offered.contains(&combatant.id)
            && !self.followers.contains_key(&combatant.id)
    }

    fn roll_for(&self, combatant_id: Uuid) -> InitiativeRequest {
        InitiativeRequest::roll(self.session_id, combatant_id, self.requested_by)
    }

    fn inherit_for(&self, combatant_id: Uuid, value: f64) -> InitiativeRequest {
        InitiativeRequest::inherit(self.session_id, combatant_id, self.requested_by, value)
    }

    fn offer(
        &mut self,
        host: &mut dyn SessionHost,
        strategy: &dyn RuleSetStrategy,
        request: InitiativeRequest,
    ) -> bool {
        if self.offered.contains(&request.combatant_id) {
            return false;
        }
        match strategy.roll_initiative(host, &request) {
            Ok(dispatched) => {
                self.offered.insert(request.combatant_id);
                dispatched
            }
            Err(e) => {
                warn!(
                    session_id = %self.session_id,
                    combatant_id = %request.combatant_id,
                    error = %e,
                    "initiative request failed"
                );
                false
            }
        }
    }
}
