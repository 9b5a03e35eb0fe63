//! Host tabletop collaborator traits.
//!
//! The host owns sessions, scenes and playlists. Every mutation requested
//! through these traits is fire-and-forget from the orchestrator's point of
//! view: results show up in later snapshots, never as callbacks.

use uuid::Uuid;

use crate::error::DomainError;
use crate::model::{CombatSession, ExperienceAward, PlaylistInfo, RollRequest};

/// Combat session roster access and mutation.
pub trait SessionHost {
    /// Snapshot of a session, `None` once it is gone.
    fn session(&self, session_id: Uuid) -> Option<CombatSession>;

    /// Snapshot of the session currently shown in the combat tracker.
    fn current_session(&self) -> Option<CombatSession>;

    /// Records an initiative value directly.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` or `DomainError::CombatantNotFound`
    /// when the target no longer exists.
    fn set_initiative(
        &mut self,
        session_id: Uuid,
        combatant_id: Uuid,
        value: f64,
    ) -> Result<(), DomainError>;

    /// Dispatches a roll the host fulfils later.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` when the host cannot queue it.
    fn request_initiative_roll(&mut self, request: RollRequest) -> Result<(), DomainError>;

    /// Removes a combatant from the roster.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` when the session is gone.
    fn remove_combatant(&mut self, session_id: Uuid, combatant_id: Uuid)
    -> Result<(), DomainError>;

    /// Sends an award through the experience side channel.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` when the award cannot be posted.
    fn award_experience(&mut self, award: ExperienceAward) -> Result<(), DomainError>;

    /// Creates an empty session on a scene.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` when the host refuses.
    fn create_session(&mut self, scene_id: Uuid) -> Result<Uuid, DomainError>;

    /// Adds combatants for the given tokens, returning the new combatant ids.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` when the session is gone.
    fn add_tokens(&mut self, session_id: Uuid, token_ids: &[Uuid]) -> Result<Vec<Uuid>, DomainError>;

    /// Moves a preparing session to round 1.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` when the session is gone.
    fn begin_session(&mut self, session_id: Uuid) -> Result<(), DomainError>;

    /// Ends and deletes a session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::SessionNotFound` when the session is gone.
    fn end_session(&mut self, session_id: Uuid) -> Result<(), DomainError>;
}

/// Scene and token access.
pub trait SceneHost {
    /// The scene currently active for players.
    fn active_scene(&self) -> Option<Uuid>;

    /// Returns `true` if the token is placed on the scene.
    fn scene_has_token(&self, scene_id: Uuid, token_id: Uuid) -> bool;

    /// Player-owned tokens placed on the scene.
    fn player_tokens(&self, scene_id: Uuid) -> Vec<Uuid>;

    /// Deletes tokens from a scene.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` when the deletion fails.
    fn delete_tokens(&mut self, scene_id: Uuid, token_ids: &[Uuid]) -> Result<(), DomainError>;

    /// Stops any turn-marker effects attached to tokens.
    fn end_marker_effects(&mut self);
}

/// Playlist lookup and playback commands.
pub trait PlaylistDeck {
    /// Resolves a playlist reference.
    fn playlist(&self, playlist_id: Uuid) -> Option<PlaylistInfo>;

    /// Resolves a playlist by its display name.
    fn playlist_by_name(&self, name: &str) -> Option<PlaylistInfo>;

    /// Playlists currently running.
    fn playing_playlists(&self) -> Vec<Uuid>;

    /// Starts a playlist; `restart` begins from the first track.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PlaylistNotFound` or `DomainError::Infrastructure`.
    fn play_playlist(&mut self, playlist_id: Uuid, restart: bool) -> Result<(), DomainError>;

    /// Stops a playlist.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::PlaylistNotFound` or `DomainError::Infrastructure`.
    fn stop_playlist(&mut self, playlist_id: Uuid) -> Result<(), DomainError>;
}

/// Everything the lifecycle controller needs from the host.
pub trait CombatHost: SessionHost + SceneHost + PlaylistDeck {}

impl<T: SessionHost + SceneHost + PlaylistDeck> CombatHost for T {}
