//! Shared combat-orchestration abstractions.
//!
//! This crate defines the encounter data model, the settings read from the
//! configuration store, and the traits through which the orchestrator talks
//! to its host tabletop. It contains no infrastructure code.

pub mod clock;
pub mod command;
pub mod error;
pub mod host;
pub mod model;
pub mod notification;
pub mod rng;
pub mod settings;
