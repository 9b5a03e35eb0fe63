//! A recording `CombatHost` for tests.

use std::collections::{HashMap, HashSet};

use skirmish_core::error::DomainError;
use skirmish_core::host::{PlaylistDeck, SceneHost, SessionHost};
use skirmish_core::model::{
    CombatPhase, CombatSession, Combatant, ExperienceAward, PlaylistInfo, PlaylistMode,
    RollRequest,
};
use uuid::Uuid;

use crate::fixtures;

/// An in-memory host that applies every mutation to its own state and
/// records it for later assertions. Rolls are never fulfilled on their own;
/// tests call [`FakeHost::fulfill`] to simulate the result arriving.
#[derive(Debug, Default)]
pub struct FakeHost {
    /// Sessions by id.
    pub sessions: HashMap<Uuid, CombatSession>,
    /// Session shown in the combat tracker.
    pub current: Option<Uuid>,
    /// Scene active for players.
    pub active_scene: Option<Uuid>,
    /// Tokens placed on each scene.
    pub scene_tokens: HashMap<Uuid, Vec<Uuid>>,
    /// Player-owned tokens on each scene.
    pub player_tokens: HashMap<Uuid, Vec<Uuid>>,
    /// Combatant templates used when a token joins a session.
    pub token_templates: HashMap<Uuid, Combatant>,
    /// Playlists in creation order.
    pub playlists: Vec<PlaylistInfo>,
    /// Playlists whose play command fails.
    pub failing_playlists: HashSet<Uuid>,
    /// Makes every roll request fail.
    pub fail_rolls: bool,
    /// Roll requests received.
    pub roll_requests: Vec<RollRequest>,
    /// Direct initiative writes as `(session, combatant, value)`.
    pub initiative_writes: Vec<(Uuid, Uuid, f64)>,
    /// Removed combatants as `(session, combatant)`.
    pub removed: Vec<(Uuid, Uuid)>,
    /// Token deletions as `(scene, tokens)`.
    pub deleted_tokens: Vec<(Uuid, Vec<Uuid>)>,
    /// Experience awards received.
    pub awards: Vec<ExperienceAward>,
    /// Play commands as `(playlist, restart)`.
    pub play_log: Vec<(Uuid, bool)>,
    /// Stop commands.
    pub stop_log: Vec<Uuid>,
    /// Number of marker-effect shutdowns.
    pub marker_effects_ended: usize,
}

impl FakeHost {
    /// Creates an empty host.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `session`, makes it current and activates its scene with every
    /// combatant's token placed on it.
    #[must_use]
    pub fn with_session(mut self, session: CombatSession) -> Self {
        self.insert_session(session);
        self
    }

    /// Adds `session`, makes it current and activates its scene with every
    /// combatant's token placed on it.
    pub fn insert_session(&mut self, session: CombatSession) {
        let tokens = self.scene_tokens.entry(session.scene_id).or_default();
        tokens.extend(session.combatants.iter().map(|c| c.token_id));
        self.active_scene = Some(session.scene_id);
        self.current = Some(session.id);
        self.sessions.insert(session.id, session);
    }

    /// Appends a combatant directly to a session's roster.
    ///
    /// # Panics
    ///
    /// Panics if the session does not exist.
    pub fn push_combatant(&mut self, session_id: Uuid, combatant: Combatant) {
        let session = self.sessions.get_mut(&session_id).unwrap();
        self.scene_tokens
            .entry(session.scene_id)
            .or_default()
            .push(combatant.token_id);
        session.combatants.push(combatant);
    }

    /// Places a player-owned token on `scene_id`. When it joins a session it
    /// becomes `template` (with a fresh combatant id).
    pub fn place_player_token(&mut self, scene_id: Uuid, template: Combatant) {
        self.scene_tokens
            .entry(scene_id)
            .or_default()
            .push(template.token_id);
        self.player_tokens
            .entry(scene_id)
            .or_default()
            .push(template.token_id);
        self.token_templates.insert(template.token_id, template);
    }

    /// Deletes a session without going through `end_session`.
    pub fn drop_session(&mut self, session_id: Uuid) -> Option<CombatSession> {
        if self.current == Some(session_id) {
            self.current = None;
        }
        self.sessions.remove(&session_id)
    }

    /// Adds a stopped playlist and returns its id.
    pub fn add_playlist(&mut self, name: &str, mode: PlaylistMode) -> Uuid {
        let info = fixtures::playlist(name, mode);
        let id = info.id;
        self.playlists.push(info);
        id
    }

    /// Flips a playlist's running flag without logging a command.
    pub fn set_playing(&mut self, playlist_id: Uuid, playing: bool) {
        if let Some(info) = self.playlists.iter_mut().find(|p| p.id == playlist_id) {
            info.playing = playing;
        }
    }

    /// Returns `true` if the playlist exists and is running.
    #[must_use]
    pub fn is_playing(&self, playlist_id: Uuid) -> bool {
        self.playlists
            .iter()
            .any(|p| p.id == playlist_id && p.playing)
    }

    /// Simulates a roll result arriving.
    pub fn fulfill(&mut self, session_id: Uuid, combatant_id: Uuid, value: f64) {
        if let Some(combatant) = self
            .sessions
            .get_mut(&session_id)
            .and_then(|s| s.combatants.iter_mut().find(|c| c.id == combatant_id))
        {
            combatant.initiative = Some(value);
        }
    }

    /// Fulfils every requested roll that is still unresolved with `value`.
    pub fn fulfill_pending(&mut self, value: f64) {
        let pending: Vec<(Uuid, Uuid)> = self
            .roll_requests
            .iter()
            .map(|r| (r.session_id, r.combatant_id))
            .collect();
        for (session_id, combatant_id) in pending {
            if self.initiative_of(session_id, combatant_id).is_none() {
                self.fulfill(session_id, combatant_id, value);
            }
        }
    }

    /// Current initiative of a combatant.
    #[must_use]
    pub fn initiative_of(&self, session_id: Uuid, combatant_id: Uuid) -> Option<f64> {
        self.sessions
            .get(&session_id)
            .and_then(|s| s.combatant(combatant_id))
            .and_then(|c| c.initiative)
    }

    /// Number of roll requests received for a combatant.
    #[must_use]
    pub fn roll_requests_for(&self, combatant_id: Uuid) -> usize {
        self.roll_requests
            .iter()
            .filter(|r| r.combatant_id == combatant_id)
            .count()
    }
}

impl SessionHost for FakeHost {
    fn session(&self, session_id: Uuid) -> Option<CombatSession> {
        self.sessions.get(&session_id).cloned()
    }

    fn current_session(&self) -> Option<CombatSession> {
        self.current.and_then(|id| self.sessions.get(&id).cloned())
    }

    fn set_initiative(
        &mut self,
        session_id: Uuid,
        combatant_id: Uuid,
        value: f64,
    ) -> Result<(), DomainError> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(DomainError::SessionNotFound(session_id))?;
        let combatant = session
            .combatants
            .iter_mut()
            .find(|c| c.id == combatant_id)
            .ok_or(DomainError::CombatantNotFound(combatant_id))?;
        combatant.initiative = Some(value);
        self.initiative_writes.push((session_id, combatant_id, value));
        Ok(())
    }

    fn request_initiative_roll(&mut self, request: RollRequest) -> Result<(), DomainError> {
        if self.fail_rolls {
            return Err(DomainError::Infrastructure("roll queue unavailable".into()));
        }
        self.roll_requests.push(request);
        Ok(())
    }

    fn remove_combatant(
        &mut self,
        session_id: Uuid,
        combatant_id: Uuid,
    ) -> Result<(), DomainError> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(DomainError::SessionNotFound(session_id))?;
        session.combatants.retain(|c| c.id != combatant_id);
        self.removed.push((session_id, combatant_id));
        Ok(())
    }

    fn award_experience(&mut self, award: ExperienceAward) -> Result<(), DomainError> {
        self.awards.push(award);
        Ok(())
    }

    fn create_session(&mut self, scene_id: Uuid) -> Result<Uuid, DomainError> {
        let session = CombatSession {
            id: Uuid::new_v4(),
            scene_id,
            phase: CombatPhase::Preparing,
            round: 0,
            turn: 0,
            combatants: Vec::new(),
        };
        let id = session.id;
        self.sessions.insert(id, session);
        self.current = Some(id);
        Ok(id)
    }

    fn add_tokens(&mut self, session_id: Uuid, token_ids: &[Uuid]) -> Result<Vec<Uuid>, DomainError> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(DomainError::SessionNotFound(session_id))?;
        let mut added = Vec::with_capacity(token_ids.len());
        for token_id in token_ids {
            let mut combatant = self
                .token_templates
                .get(token_id)
                .cloned()
                .unwrap_or_else(|| fixtures::pc("Adventurer"));
            combatant.id = Uuid::new_v4();
            combatant.token_id = *token_id;
            added.push(combatant.id);
            session.combatants.push(combatant);
        }
        Ok(added)
    }

    fn begin_session(&mut self, session_id: Uuid) -> Result<(), DomainError> {
        let session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(DomainError::SessionNotFound(session_id))?;
        session.phase = CombatPhase::Active;
        session.round = 1;
        Ok(())
    }

    fn end_session(&mut self, session_id: Uuid) -> Result<(), DomainError> {
        self.drop_session(session_id)
            .map(|_| ())
            .ok_or(DomainError::SessionNotFound(session_id))
    }
}

impl SceneHost for FakeHost {
    fn active_scene(&self) -> Option<Uuid> {
        self.active_scene
    }

    fn scene_has_token(&self, scene_id: Uuid, token_id: Uuid) -> bool {
        self.scene_tokens
            .get(&scene_id)
            .is_some_and(|tokens| tokens.contains(&token_id))
    }

    fn player_tokens(&self, scene_id: Uuid) -> Vec<Uuid> {
        self.player_tokens.get(&scene_id).cloned().unwrap_or_default()
    }

    fn delete_tokens(&mut self, scene_id: Uuid, token_ids: &[Uuid]) -> Result<(), DomainError> {
        if let Some(tokens) = self.scene_tokens.get_mut(&scene_id) {
            tokens.retain(|t| !token_ids.contains(t));
        }
        self.deleted_tokens.push((scene_id, token_ids.to_vec()));
        Ok(())
    }

    fn end_marker_effects(&mut self) {
        self.marker_effects_ended += 1;
    }
}

impl PlaylistDeck for FakeHost {
    fn playlist(&self, playlist_id: Uuid) -> Option<PlaylistInfo> {
        self.playlists.iter().find(|p| p.id == playlist_id).cloned()
    }

    fn playlist_by_name(&self, name: &str) -> Option<PlaylistInfo> {
        self.playlists.iter().find(|p| p.name == name).cloned()
    }

    fn playing_playlists(&self) -> Vec<Uuid> {
        self.playlists
            .iter()
            .filter(|p| p.playing)
            .map(|p| p.id)
            .collect()
    }

    fn play_playlist(&mut self, playlist_id: Uuid, restart: bool) -> Result<(), DomainError> {
        if self.failing_playlists.contains(&playlist_id) {
            return Err(DomainError::Infrastructure(format!(
                "playlist {playlist_id} failed to start"
            )));
        }
        let info = self
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or(DomainError::PlaylistNotFound(playlist_id))?;
        info.playing = true;
        self.play_log.push((playlist_id, restart));
        Ok(())
    }

    fn stop_playlist(&mut self, playlist_id: Uuid) -> Result<(), DomainError> {
        let info = self
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or(DomainError::PlaylistNotFound(playlist_id))?;
        info.playing = false;
        self.stop_log.push(playlist_id);
        Ok(())
    }
}
