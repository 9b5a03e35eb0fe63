//! Routes for the combat lifecycle.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use skirmish_core::error::DomainError;
use skirmish_core::host::SessionHost;
use skirmish_core::model::{CombatSession, RuleSetFamily, UserContext};
use skirmish_initiative::CoordinatorState;
use skirmish_lifecycle::application::command_handlers;
use skirmish_lifecycle::application::controller::CombatLifecycleController;
use skirmish_lifecycle::domain::commands;
use skirmish_lifecycle::domain::outcomes::{
    CombatStart, ParticipantsAdded, Reaction, StartTransition,
};
use skirmish_playlist::{PlaylistPhase, PlaylistRuntimeState};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::{AppState, Engine};
use crate::table::Table;

/// Response body returned after a command is handled.
#[derive(Debug, Serialize)]
pub struct CommandResponse<T> {
    /// Correlation ID the command was logged under.
    pub correlation_id: Uuid,
    /// What the command did.
    pub result: T,
    /// What the controller did with the host notifications that followed.
    pub reactions: Vec<Reaction>,
}

/// One running initiative poller.
#[derive(Debug, Serialize)]
pub struct PollerView {
    /// Session it watches.
    pub session_id: Uuid,
    /// Coordinator state.
    pub state: CoordinatorState,
    /// Ticks so far.
    pub ticks: u32,
    /// Tick budget.
    pub max_ticks: u32,
}

/// Response body for GET /.
#[derive(Debug, Serialize)]
pub struct CombatView {
    /// User the orchestrator acts for.
    pub user: UserContext,
    /// Rule-set family in use.
    pub family: RuleSetFamily,
    /// Current session, if any.
    pub session: Option<CombatSession>,
    /// Running pollers.
    pub pollers: Vec<PollerView>,
    /// Playlists tracked by the playlist handler.
    pub playlists: PlaylistRuntimeState,
    /// Audio phase.
    pub playlist_phase: PlaylistPhase,
    /// Session waiting for a playlist selection.
    pub awaiting_selection: Option<Uuid>,
    /// Combatants with an unanswered roll request.
    pub pending_rolls: Vec<Uuid>,
}

/// Request body for POST /playlist-selection.
#[derive(Debug, Deserialize)]
pub struct PlaylistSelectionRequest {
    /// Chosen playlist; `null` plays nothing.
    #[serde(default)]
    pub playlist_id: Option<Uuid>,
}

/// Request body for POST /combatants/{id}/initiative.
#[derive(Debug, Deserialize)]
pub struct InitiativeSubmission {
    /// The rolled value.
    pub value: f64,
}

/// Response body for POST /combatants/{id}/initiative.
#[derive(Debug, Serialize)]
pub struct InitiativeRecorded {
    /// Session the combatant belongs to.
    pub session_id: Uuid,
    /// Combatant that rolled.
    pub combatant_id: Uuid,
    /// Recorded value.
    pub value: f64,
}

/// GET /
#[instrument(skip(state))]
async fn get_combat(State(state): State<AppState>) -> Json<CombatView> {
    let engine = state.engine.lock().await;
    let controller = &engine.controller;
    let pollers = controller
        .pollers()
        .iter()
        .map(|poller| PollerView {
            session_id: poller.session_id(),
            state: poller.state(),
            ticks: poller.ticks(),
            max_ticks: poller.max_ticks(),
        })
        .collect();

    Json(CombatView {
        user: controller.user(),
        family: controller.family(),
        session: engine.table.current_session(),
        pollers,
        playlists: controller.playlists().state(),
        playlist_phase: controller.playlists().phase(),
        awaiting_selection: controller.awaiting_selection(),
        pending_rolls: engine
            .table
            .pending_rolls()
            .iter()
            .map(|r| r.combatant_id)
            .collect(),
    })
}

/// Runs one controller command against the table, then lets the controller
/// react to whatever the table reported while it ran.
fn dispatch<T>(
    engine: &mut Engine,
    correlation_id: Uuid,
    run: impl FnOnce(&mut CombatLifecycleController, &mut Table) -> Result<T, DomainError>,
) -> Result<Json<CommandResponse<T>>, ApiError> {
    let Engine { table, controller } = &mut *engine;
    let result = run(controller, table)?;
    let reactions = engine.drain();
    Ok(Json(CommandResponse {
        correlation_id,
        result,
        reactions,
    }))
}

/// POST /participants
#[instrument(skip(state))]
async fn add_participants(
    State(state): State<AppState>,
) -> Result<Json<CommandResponse<ParticipantsAdded>>, ApiError> {
    let mut engine = state.engine.lock().await;
    let command = commands::AddParticipants {
        correlation_id: Uuid::new_v4(),
        issued_by: engine.controller.user().user_id,
    };
    dispatch(&mut engine, command.correlation_id, |controller, table| {
        command_handlers::handle_add_participants(&command, controller, table)
    })
}

/// POST /start
#[instrument(skip(state))]
async fn start_combat(
    State(state): State<AppState>,
) -> Result<Json<CommandResponse<CombatStart>>, ApiError> {
    let mut engine = state.engine.lock().await;
    let command = commands::StartCombat {
        correlation_id: Uuid::new_v4(),
        issued_by: engine.controller.user().user_id,
    };
    dispatch(&mut engine, command.correlation_id, |controller, table| {
        command_handlers::handle_start_combat(&command, controller, table)
    })
}

/// POST /end
///
/// `result` is the ended session, or `null` when nothing was running.
#[instrument(skip(state))]
async fn end_combat(
    State(state): State<AppState>,
) -> Result<Json<CommandResponse<Option<Uuid>>>, ApiError> {
    let mut engine = state.engine.lock().await;
    let command = commands::EndCombat {
        correlation_id: Uuid::new_v4(),
        issued_by: engine.controller.user().user_id,
    };
    dispatch(&mut engine, command.correlation_id, |controller, table| {
        command_handlers::handle_end_combat(&command, controller, table)
    })
}

/// POST /playlist-selection
#[instrument(skip(state, request), fields(playlist_id = ?request.playlist_id))]
async fn select_playlist(
    State(state): State<AppState>,
    Json(request): Json<PlaylistSelectionRequest>,
) -> Result<Json<CommandResponse<StartTransition>>, ApiError> {
    let mut engine = state.engine.lock().await;
    let command = commands::SelectCombatPlaylist {
        correlation_id: Uuid::new_v4(),
        issued_by: engine.controller.user().user_id,
        playlist_id: request.playlist_id,
    };
    dispatch(&mut engine, command.correlation_id, |controller, table| {
        command_handlers::handle_select_combat_playlist(&command, controller, table)
    })
}

/// POST /combatants/{id}/initiative
#[instrument(skip(state, request), fields(value = request.value))]
async fn submit_initiative(
    State(state): State<AppState>,
    Path(combatant_id): Path<Uuid>,
    Json(request): Json<InitiativeSubmission>,
) -> Result<Json<InitiativeRecorded>, ApiError> {
    if !request.value.is_finite() {
        return Err(DomainError::Validation("initiative must be a finite number".into()).into());
    }
    let mut engine = state.engine.lock().await;
    let session_id = engine.table.submit_initiative(combatant_id, request.value)?;
    info!(combatant_id = %combatant_id, "initiative recorded");

    Ok(Json(InitiativeRecorded {
        session_id,
        combatant_id,
        value: request.value,
    }))
}

/// Returns the router for the combat lifecycle.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_combat))
        .route("/participants", post(add_participants))
        .route("/start", post(start_combat))
        .route("/end", post(end_combat))
        .route("/playlist-selection", post(select_playlist))
        .route("/combatants/{id}/initiative", post(submit_initiative))
}
