//! Settings upkeep: legacy migration and playlist-edit validation.

pub mod migration;
pub mod validation;
