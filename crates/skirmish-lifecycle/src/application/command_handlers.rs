//! Command handlers for the externally triggerable operations.
//!
//! Each handler logs the command against its correlation ID and delegates to
//! the controller. The host reports the resulting phase changes back as
//! notifications, which drive the rest of the lifecycle.

use skirmish_core::command::Command;
use skirmish_core::error::DomainError;
use skirmish_core::host::CombatHost;
use tracing::info;
use uuid::Uuid;

use crate::application::controller::CombatLifecycleController;
use crate::domain::commands::{AddParticipants, EndCombat, SelectCombatPlaylist, StartCombat};
use crate::domain::outcomes::{CombatStart, ParticipantsAdded, StartTransition};

/// Handles the `AddParticipants` command.
///
/// # Errors
///
/// Returns `DomainError` if the controller refuses or the host fails.
pub fn handle_add_participants<H: CombatHost>(
    command: &AddParticipants,
    controller: &mut CombatLifecycleController,
    host: &mut H,
) -> Result<ParticipantsAdded, DomainError> {
    info!(
        correlation_id = %command.correlation_id(),
        command_type = command.command_type(),
        "handling command"
    );
    controller.add_participants(host, command.issued_by())
}

/// Handles the `StartCombat` command.
///
/// # Errors
///
/// Returns `DomainError` if the controller refuses or the host fails.
pub fn handle_start_combat<H: CombatHost>(
    command: &StartCombat,
    controller: &mut CombatLifecycleController,
    host: &mut H,
) -> Result<CombatStart, DomainError> {
    info!(
        correlation_id = %command.correlation_id(),
        command_type = command.command_type(),
        "handling command"
    );
    controller.start_combat(host, command.issued_by())
}

/// Handles the `EndCombat` command. Returns the ended session, if any.
///
/// # Errors
///
/// Returns `DomainError` if the controller refuses or the host fails.
pub fn handle_end_combat<H: CombatHost>(
    command: &EndCombat,
    controller: &mut CombatLifecycleController,
    host: &mut H,
) -> Result<Option<Uuid>, DomainError> {
    info!(
        correlation_id = %command.correlation_id(),
        command_type = command.command_type(),
        "handling command"
    );
    controller.end_combat(host)
}

/// Handles the `SelectCombatPlaylist` command.
///
/// # Errors
///
/// Returns `DomainError` if no selection is outstanding or the user is not
/// the GM.
pub fn handle_select_combat_playlist<H: CombatHost>(
    command: &SelectCombatPlaylist,
    controller: &mut CombatLifecycleController,
    host: &mut H,
) -> Result<StartTransition, DomainError> {
    info!(
        correlation_id = %command.correlation_id(),
        command_type = command.command_type(),
        playlist_id = ?command.playlist_id,
        "handling command"
    );
    controller.select_playlist(host, command.playlist_id)
}
