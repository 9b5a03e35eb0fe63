//! HTTP command surface and in-memory tabletop for the combat orchestrator.
//!
//! Hosts the combat orchestrator behind an axum router, next to an in-memory
//! tabletop that plays the host's part: sessions, scenes, playlists and the
//! dice rolls the orchestrator requests.

pub mod config;
pub mod error;
pub mod routes;
pub mod settings_file;
pub mod state;
pub mod table;
pub mod ticker;
