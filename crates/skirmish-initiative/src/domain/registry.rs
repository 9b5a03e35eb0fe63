//! Running pollers, one per session.

use std::collections::BTreeMap;

use skirmish_core::clock::Clock;
use skirmish_core::host::SessionHost;
use skirmish_rules::RuleSetStrategy;
use tracing::{debug, info};
use uuid::Uuid;

use super::coordinator::{InitiativeCoordinator, TickOutcome};

/// Owns every live [`InitiativeCoordinator`], keyed by session id.
#[derive(Debug, Default)]
pub struct PollerRegistry {
    pollers: BTreeMap<Uuid, InitiativeCoordinator>,
}

impl PollerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `coordinator` as its session's only poller. A poller already
    /// registered for the session is cancelled and returned.
    pub fn install(&mut self, coordinator: InitiativeCoordinator) -> Option<InitiativeCoordinator> {
        let session_id = coordinator.session_id();
        let mut replaced = self.pollers.insert(session_id, coordinator);
        if let Some(previous) = replaced.as_mut() {
            info!(session_id = %session_id, "replacing running initiative poller");
            previous.cancel();
        }
        replaced
    }

    /// The session's poller, if any.
    #[must_use]
    pub fn get(&self, session_id: Uuid) -> Option<&InitiativeCoordinator> {
        self.pollers.get(&session_id)
    }

    /// The session's poller, if any.
    pub fn get_mut(&mut self, session_id: Uuid) -> Option<&mut InitiativeCoordinator> {
        self.pollers.get_mut(&session_id)
    }

    /// Returns `true` while the session has a poller that will tick again.
    #[must_use]
    pub fn is_polling(&self, session_id: Uuid) -> bool {
        self.pollers
            .get(&session_id)
            .is_some_and(|p| !p.state().is_terminal())
    }

    /// Cancels and removes the session's poller. Returns `true` if one existed.
    pub fn cancel(&mut self, session_id: Uuid) -> bool {
        match self.pollers.remove(&session_id) {
            Some(mut poller) => {
                poller.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of registered pollers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pollers.len()
    }

    /// Returns `true` when no poller is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pollers.is_empty()
    }

    /// Iterates over registered pollers.
    pub fn iter(&self) -> impl Iterator<Item = &InitiativeCoordinator> {
        self.pollers.values()
    }

    /// Ticks every poller once and drops those that reached a terminal state.
    pub fn tick_all(
        &mut self,
        host: &mut dyn SessionHost,
        strategy: &dyn RuleSetStrategy,
        clock: &dyn Clock,
    ) -> Vec<(Uuid, TickOutcome)> {
        let mut outcomes = Vec::with_capacity(self.pollers.len());
        for (session_id, poller) in &mut self.pollers {
            outcomes.push((*session_id, poller.tick(host, strategy, clock)));
        }
        self.pollers.retain(|session_id, poller| {
            let keep = !poller.state().is_terminal();
            if !keep {
                debug!(session_id = %session_id, state = ?poller.state(), "removing finished poller");
            }
            keep
        });
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use skirmish_core::settings::InitiativeMode;
    use skirmish_roster::ParticipantPolicy;
    use skirmish_rules::GenericRules;
    use skirmish_test_support::fixtures::{active_session, pc};
    use skirmish_test_support::{FakeHost, FixedClock};

    use crate::domain::coordinator::CoordinatorState;

    fn poller(session_id: Uuid, clock: &FixedClock) -> InitiativeCoordinator {
        InitiativeCoordinator::new(session_id, InitiativeMode::Enabled, Uuid::new_v4(), 5, clock)
    }

    #[test]
    fn test_install_replaces_and_cancels_previous_poller() {
        let clock = FixedClock(Utc::now());
        let session_id = Uuid::new_v4();
        let mut registry = PollerRegistry::new();

        assert!(registry.install(poller(session_id, &clock)).is_none());
        let replaced = registry.install(poller(session_id, &clock)).unwrap();

        assert_eq!(replaced.state(), CoordinatorState::Cancelled);
        assert_eq!(registry.len(), 1);
        assert!(registry.is_polling(session_id));
    }

    #[test]
    fn test_cancel_removes_poller() {
        let clock = FixedClock(Utc::now());
        let session_id = Uuid::new_v4();
        let mut registry = PollerRegistry::new();
        registry.install(poller(session_id, &clock));

        assert!(registry.cancel(session_id));
        assert!(!registry.cancel(session_id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_tick_all_drops_settled_pollers() {
        // Arrange
        let clock = FixedClock(Utc::now());
        let aria = pc("Aria");
        let aria_id = aria.id;
        let session = active_session(vec![aria]);
        let session_id = session.id;
        let mut host = FakeHost::new().with_session(session);
        let mut registry = PollerRegistry::new();
        let mut coordinator = poller(session_id, &clock);
        coordinator.begin(&mut host, &GenericRules, &ParticipantPolicy::default());
        registry.install(coordinator);

        // Act
        let first = registry.tick_all(&mut host, &GenericRules, &clock);
        host.fulfill(session_id, aria_id, 10.0);
        let second = registry.tick_all(&mut host, &GenericRules, &clock);

        // Assert
        assert_eq!(
            first,
            vec![(session_id, TickOutcome::Waiting { missing: vec![aria_id] })]
        );
        assert_eq!(second, vec![(session_id, TickOutcome::Settled)]);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_tick_all_drops_pollers_of_deleted_sessions() {
        let clock = FixedClock(Utc::now());
        let mut host = FakeHost::new();
        let mut registry = PollerRegistry::new();
        let session_id = Uuid::new_v4();
        registry.install(poller(session_id, &clock));

        let outcomes = registry.tick_all(&mut host, &GenericRules, &clock);

        assert_eq!(outcomes, vec![(session_id, TickOutcome::Cancelled)]);
        assert!(!registry.is_polling(session_id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_tick_all_reports_sessions_in_id_order() {
        // Arrange
        let clock = FixedClock(Utc::now());
        let mut host = FakeHost::new();
        let mut registry = PollerRegistry::new();
        let mut ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            registry.install(poller(*id, &clock));
        }
        ids.sort();

        // Act
        let listed: Vec<Uuid> = registry.iter().map(InitiativeCoordinator::session_id).collect();
        let ticked: Vec<Uuid> = registry
            .tick_all(&mut host, &GenericRules, &clock)
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        // Assert
        assert_eq!(listed, ids);
        assert_eq!(ticked, ids);
    }
}
