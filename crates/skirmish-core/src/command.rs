//! Command abstractions for the externally triggerable operations.

use uuid::Uuid;

/// Trait implemented by every operation other extensions or a command
/// surface may trigger (add participants, start combat, end combat).
pub trait Command: Send + Sync + std::fmt::Debug {
    /// Name logged with the command.
    fn command_type(&self) -> &'static str;

    /// Ties the command's log lines together.
    fn correlation_id(&self) -> Uuid;

    /// The user on whose behalf the command runs.
    fn issued_by(&self) -> Uuid;
}
