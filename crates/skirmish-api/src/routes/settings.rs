//! Routes for combat settings.

use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use skirmish_core::settings::CombatSettings;
use skirmish_playlist::application::validation::{PlaylistEntryDraft, validate_playlist_entries};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for PUT /playlists.
#[derive(Debug, Deserialize)]
pub struct PlaylistConfigurationRequest {
    /// The full edited list, in order.
    pub entries: Vec<PlaylistEntryDraft>,
}

/// GET /
#[instrument(skip(state))]
async fn get_settings(State(state): State<AppState>) -> Json<CombatSettings> {
    let engine = state.engine.lock().await;
    Json(engine.controller.settings().clone())
}

/// PUT /playlists
///
/// Validates the whole list against the table's playlists; nothing is saved
/// when any row fails.
#[instrument(skip(state, request), fields(entries = request.entries.len()))]
async fn put_playlists(
    State(state): State<AppState>,
    Json(request): Json<PlaylistConfigurationRequest>,
) -> Result<Json<CombatSettings>, ApiError> {
    let mut engine = state.engine.lock().await;
    let playlists = validate_playlist_entries(&request.entries, &engine.table)?;

    let mut settings = engine.controller.settings().clone();
    settings.playlists = playlists;
    state.settings_store.save(&settings).await?;
    engine.controller.replace_settings(settings.clone());
    info!(entries = settings.playlists.len(), "playlist configuration saved");

    Ok(Json(settings))
}

/// Returns the router for settings.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_settings))
        .route("/playlists", put(put_playlists))
}
