//! Domain error types.

use thiserror::Error;
use uuid::Uuid;

/// Top-level domain error type.
///
/// No variant is fatal to the host: orchestration steps that hit one log a
/// diagnostic and move on to the next step.
#[derive(Debug, Error)]
pub enum DomainError {
    /// The combat session does not exist (or no longer exists).
    #[error("combat session not found: {0}")]
    SessionNotFound(Uuid),

    /// The combatant is not part of the session roster.
    #[error("combatant not found: {0}")]
    CombatantNotFound(Uuid),

    /// A playlist reference does not resolve to a live playlist.
    #[error("playlist not found: {0}")]
    PlaylistNotFound(Uuid),

    /// The acting user may not perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A user-supplied value was rejected.
    #[error("validation error: {0}")]
    Validation(String),

    /// The host or configuration store failed.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
}
