//! Coordinator state machine and the registry that owns running pollers.

pub mod coordinator;
pub mod registry;
