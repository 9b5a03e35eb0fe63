//! Handoff state machine and playlist selection.

pub mod handler;
pub mod selection;
