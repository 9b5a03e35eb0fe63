//! Commands and pipeline outcomes.

pub mod commands;
pub mod outcomes;
