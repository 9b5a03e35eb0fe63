//! Combat audio: handing the table over to combat music and back.
//!
//! Owns the playlist handoff around combat: which playlist plays when the
//! fight starts, the fanfare when it ends, and the ambient playlist that
//! comes back afterwards. Also validates playlist configuration edits and
//! migrates name-based settings from older releases.

pub mod application;
pub mod domain;

pub use domain::handler::{FanfareOutcome, PlaylistHandler, PlaylistPhase, PlaylistRuntimeState};
pub use domain::selection::{PlaylistChoice, auto_select, combat_choices};
