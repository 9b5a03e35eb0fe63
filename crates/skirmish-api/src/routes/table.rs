//! Routes for the in-memory tabletop.

use std::collections::BTreeSet;

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use skirmish_core::host::PlaylistDeck;
use skirmish_core::model::{Disposition, PlaylistInfo, PlaylistMode};
use skirmish_lifecycle::domain::outcomes::Reaction;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;
use crate::table::Token;

/// Request body for POST /tokens.
#[derive(Debug, Deserialize)]
pub struct PlaceTokenRequest {
    /// Display name.
    pub name: String,
    /// Actor to link; tokens sharing one group together. A fresh actor when
    /// omitted.
    #[serde(default)]
    pub actor_id: Option<Uuid>,
    /// Controlled by the game master.
    #[serde(default)]
    pub is_npc: bool,
    /// Owned by a player.
    #[serde(default)]
    pub player_owned: bool,
    /// Disposition towards the party.
    #[serde(default)]
    pub disposition: Disposition,
    /// Token tags.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Marked defeated.
    #[serde(default)]
    pub defeated: bool,
    /// Also add it to the current combat.
    #[serde(default)]
    pub join_combat: bool,
}

/// Response body for POST /tokens.
#[derive(Debug, Serialize)]
pub struct PlaceTokenResponse {
    /// New token.
    pub token_id: Uuid,
    /// Combatant created when the token joined combat.
    pub combatant_id: Option<Uuid>,
    /// What the controller did with the resulting notifications.
    pub reactions: Vec<Reaction>,
}

/// Request body for POST /playlists.
#[derive(Debug, Deserialize)]
pub struct RegisterPlaylistRequest {
    /// Playlist name.
    pub name: String,
    /// Play mode.
    #[serde(default)]
    pub mode: PlaylistMode,
    /// Number of sounds.
    #[serde(default = "default_sound_count")]
    pub sound_count: usize,
    /// Start it right away.
    #[serde(default)]
    pub playing: bool,
}

fn default_sound_count() -> usize {
    1
}

/// Response body for POST /playlists/{id}/stop.
#[derive(Debug, Serialize)]
pub struct StopPlaylistResponse {
    /// Stopped playlist.
    pub playlist_id: Uuid,
    /// What the controller did with the resulting notifications.
    pub reactions: Vec<Reaction>,
}

/// POST /tokens
#[instrument(skip(state, request), fields(name = %request.name, join_combat = request.join_combat))]
async fn place_token(
    State(state): State<AppState>,
    Json(request): Json<PlaceTokenRequest>,
) -> Result<Json<PlaceTokenResponse>, ApiError> {
    let mut engine = state.engine.lock().await;
    let token_id = engine.table.place_token(Token {
        id: Uuid::nil(),
        name: request.name,
        actor_id: request.actor_id.unwrap_or_else(Uuid::new_v4),
        is_npc: request.is_npc,
        player_owned: request.player_owned,
        disposition: request.disposition,
        tags: request.tags,
        defeated: request.defeated,
    })?;

    let combatant_id = if request.join_combat {
        Some(engine.table.join_combat(token_id)?)
    } else {
        None
    };
    let reactions = engine.drain();

    Ok(Json(PlaceTokenResponse {
        token_id,
        combatant_id,
        reactions,
    }))
}

/// POST /playlists
#[instrument(skip(state, request), fields(name = %request.name))]
async fn register_playlist(
    State(state): State<AppState>,
    Json(request): Json<RegisterPlaylistRequest>,
) -> Result<Json<PlaylistInfo>, ApiError> {
    let mut engine = state.engine.lock().await;
    let info = engine
        .table
        .register_playlist(&request.name, request.mode, request.sound_count);
    if request.playing {
        engine.table.play_playlist(info.id, true)?;
    }
    let info = engine.table.playlist(info.id).unwrap_or(info);
    info!(playlist_id = %info.id, "playlist registered");

    Ok(Json(info))
}

/// POST /playlists/{id}/stop
#[instrument(skip(state))]
async fn stop_playlist(
    State(state): State<AppState>,
    Path(playlist_id): Path<Uuid>,
) -> Result<Json<StopPlaylistResponse>, ApiError> {
    let mut engine = state.engine.lock().await;
    engine.table.stop_playlist(playlist_id)?;
    let reactions = engine.drain();

    Ok(Json(StopPlaylistResponse {
        playlist_id,
        reactions,
    }))
}

/// Returns the router for the tabletop.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tokens", post(place_token))
        .route("/playlists", post(register_playlist))
        .route("/playlists/{id}/stop", post(stop_playlist))
}
