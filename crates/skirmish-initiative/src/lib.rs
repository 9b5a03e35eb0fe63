//! Initiative resolution and per-session pollers.
//!
//! Roll requests are fire-and-forget: the host fulfils them whenever a dice
//! roll (or a player answering a prompt) completes. The coordinator therefore
//! requests, then polls the roster snapshot until every combatant that needs
//! a value has one or the tick budget runs out.

pub mod domain;

pub use domain::coordinator::{AdmissionRoll, CoordinatorState, InitiativeCoordinator, TickOutcome};
pub use domain::registry::PollerRegistry;
