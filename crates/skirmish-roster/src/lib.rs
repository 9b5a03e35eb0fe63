//! Who takes part in a fight, who rolls together, who is cleared away.
//!
//! Decides which combatants are kept out of an encounter, which NPCs roll
//! initiative as a group, and which defeated combatants are cleared off the
//! scene once the encounter ends. Every decision is a pure function of a
//! roster snapshot and the configured switches.

pub mod domain;

pub use domain::policy::{InitiativeGroup, ParticipantPolicy};
