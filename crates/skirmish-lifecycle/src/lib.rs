//! Combat lifecycle controller and the commands that drive it.
//!
//! The root of the orchestrator. Reacts to roster and phase notifications
//! from the host session, runs the admission, start, combat-start and end
//! pipelines over the rule-set strategy, participant policy, initiative
//! pollers and playlist handler, and exposes the externally triggerable
//! operations as commands.

pub mod application;
pub mod domain;
