//! Shared application state.

use std::sync::Arc;

use skirmish_core::settings::SettingsStore;
use skirmish_initiative::TickOutcome;
use skirmish_lifecycle::application::controller::CombatLifecycleController;
use skirmish_lifecycle::domain::outcomes::Reaction;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::table::Table;

/// The table and the controller acting on it, locked together.
#[derive(Debug)]
pub struct Engine {
    /// In-memory host.
    pub table: Table,
    /// Orchestrator for the configured GM.
    pub controller: CombatLifecycleController,
}

impl Engine {
    /// Pairs a table with a controller.
    #[must_use]
    pub fn new(table: Table, controller: CombatLifecycleController) -> Self {
        Self { table, controller }
    }

    /// Feeds every queued host notification to the controller, including
    /// those raised while handling earlier ones. Returns what the
    /// controller did, ignored notifications left out.
    pub fn drain(&mut self) -> Vec<Reaction> {
        let mut reactions = Vec::new();
        while let Some(notification) = self.table.next_notification() {
            let reaction = self.controller.handle(&mut self.table, &notification);
            if reaction != Reaction::Ignored {
                reactions.push(reaction);
            }
        }
        reactions
    }

    /// One polling step: the table rolls what needs no player, then every
    /// live poller checks its session.
    pub fn tick(&mut self) -> Vec<(Uuid, TickOutcome)> {
        let rolled = self.table.resolve_automatic_rolls();
        let outcomes = self.controller.tick(&mut self.table);
        let reactions = self.drain();
        if rolled > 0 || !reactions.is_empty() {
            debug!(rolled, reactions = reactions.len(), "tick processed");
        }
        outcomes
    }
}

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Table and controller.
    pub engine: Arc<Mutex<Engine>>,
    /// Where combat settings are persisted.
    pub settings_store: Arc<dyn SettingsStore>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(engine: Engine, settings_store: Arc<dyn SettingsStore>) -> Self {
        Self {
            engine: Arc::new(Mutex::new(engine)),
            settings_store,
        }
    }
}
