//! In-memory tabletop host.
//!
//! Plays the host's part for the orchestrator: sessions, one active scene,
//! playlists and dice. Roll requests queue up like real prompts would. NPC
//! rolls and rolls that skip the dialog are resolved by the table's own dice
//! on the next tick; the rest wait until a player submits a value.
//!
//! Phase and playlist changes are queued as [`HostNotification`]s in an
//! outbox that the engine drains into the controller.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::{Deserialize, Serialize};
use skirmish_core::error::DomainError;
use skirmish_core::host::{PlaylistDeck, SceneHost, SessionHost};
use skirmish_core::model::{
    CombatPhase, CombatSession, Combatant, Disposition, ExperienceAward, PlaylistInfo,
    PlaylistMode, RollRequest,
};
use skirmish_core::notification::HostNotification;
use skirmish_core::rng::DeterministicRng;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Die rolled for automatic initiative.
const INITIATIVE_DIE: u32 = 20;

/// A token placed on a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token identifier.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Actor the token was created from.
    pub actor_id: Uuid,
    /// Controlled by the game master.
    pub is_npc: bool,
    /// Owned by a player.
    pub player_owned: bool,
    /// Disposition towards the party.
    pub disposition: Disposition,
    /// Token tags.
    pub tags: BTreeSet<String>,
    /// Marked defeated.
    pub defeated: bool,
}

impl Token {
    fn to_combatant(&self) -> Combatant {
        Combatant {
            id: Uuid::new_v4(),
            name: self.name.clone(),
            actor_id: self.actor_id,
            token_id: self.id,
            is_npc: self.is_npc,
            initiative: None,
            is_defeated: self.defeated,
            disposition: self.disposition,
            token_tags: self.tags.clone(),
        }
    }
}

/// One playlist in a table seed file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlaylistSeed {
    /// Playlist name.
    pub name: String,
    /// Play mode.
    #[serde(default)]
    pub mode: PlaylistMode,
    /// Number of sounds; a playlist without sounds cannot play.
    #[serde(default = "default_sound_count")]
    pub sound_count: usize,
}

fn default_sound_count() -> usize {
    1
}

/// Playlists registered on startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TableSeed {
    /// Playlists to register.
    #[serde(default)]
    pub playlists: Vec<PlaylistSeed>,
}

/// The in-memory host.
pub struct Table {
    acting_user: Uuid,
    sessions: HashMap<Uuid, CombatSession>,
    current: Option<Uuid>,
    active_scene: Option<Uuid>,
    scenes: HashMap<Uuid, Vec<Token>>,
    playlists: Vec<PlaylistInfo>,
    pending_rolls: Vec<RollRequest>,
    awards: Vec<ExperienceAward>,
    marker_effects_ended: usize,
    outbox: VecDeque<HostNotification>,
    dice: Box<dyn DeterministicRng>,
}

impl std::fmt::Debug for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("acting_user", &self.acting_user)
            .field("sessions", &self.sessions.len())
            .field("current", &self.current)
            .field("active_scene", &self.active_scene)
            .field("playlists", &self.playlists.len())
            .field("pending_rolls", &self.pending_rolls.len())
            .finish_non_exhaustive()
    }
}

impl Table {
    /// Creates a table with one empty, active scene. Phase changes are
    /// reported as made by `acting_user`.
    #[must_use]
    pub fn new(acting_user: Uuid, dice: Box<dyn DeterministicRng>) -> Self {
        let scene_id = Uuid::new_v4();
        Self {
            acting_user,
            sessions: HashMap::new(),
            current: None,
            active_scene: Some(scene_id),
            scenes: HashMap::from([(scene_id, Vec::new())]),
            playlists: Vec::new(),
            pending_rolls: Vec::new(),
            awards: Vec::new(),
            marker_effects_ended: 0,
            outbox: VecDeque::new(),
            dice,
        }
    }

    /// Registers the playlists listed in `seed`, stopped.
    pub fn seed(&mut self, seed: &TableSeed) {
        for playlist in &seed.playlists {
            self.register_playlist(&playlist.name, playlist.mode, playlist.sound_count);
        }
        info!(playlists = seed.playlists.len(), "table seeded");
    }

    /// Adds a stopped playlist.
    pub fn register_playlist(
        &mut self,
        name: &str,
        mode: PlaylistMode,
        sound_count: usize,
    ) -> PlaylistInfo {
        let info = PlaylistInfo {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            mode,
            playing: false,
            sound_count,
        };
        debug!(playlist = %info.name, playlist_id = %info.id, "playlist registered");
        self.playlists.push(info.clone());
        info
    }

    /// All playlists in registration order.
    #[must_use]
    pub fn playlists(&self) -> &[PlaylistInfo] {
        &self.playlists
    }

    /// Places a token on the active scene and returns its id.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if no scene is active.
    pub fn place_token(&mut self, mut token: Token) -> Result<Uuid, DomainError> {
        let scene_id = self
            .active_scene
            .ok_or_else(|| DomainError::Validation("no active scene".into()))?;
        token.id = Uuid::new_v4();
        let token_id = token.id;
        debug!(token = %token.name, token_id = %token_id, "token placed");
        self.scenes.entry(scene_id).or_default().push(token);
        Ok(token_id)
    }

    /// Tokens on a scene.
    #[must_use]
    pub fn tokens(&self, scene_id: Uuid) -> &[Token] {
        self.scenes
            .get(&scene_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Adds a placed token to the current session and reports the addition
    /// as made by the acting user.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` without a current session or when
    /// the token is not on the session's scene.
    pub fn join_combat(&mut self, token_id: Uuid) -> Result<Uuid, DomainError> {
        let session_id = self
            .current
            .ok_or_else(|| DomainError::Validation("no combat to join".into()))?;
        let combatant_id = self
            .add_tokens(session_id, &[token_id])?
            .pop()
            .ok_or_else(|| {
                DomainError::Validation(format!("token {token_id} is not on the combat's scene"))
            })?;
        self.outbox.push_back(HostNotification::CombatantAdded {
            session_id,
            combatant_id,
            added_by: self.acting_user,
        });
        Ok(combatant_id)
    }

    /// Takes the oldest queued notification.
    pub fn next_notification(&mut self) -> Option<HostNotification> {
        self.outbox.pop_front()
    }

    /// Roll requests still waiting for a value.
    #[must_use]
    pub fn pending_rolls(&self) -> &[RollRequest] {
        &self.pending_rolls
    }

    /// Experience awards received.
    #[must_use]
    pub fn awards(&self) -> &[ExperienceAward] {
        &self.awards
    }

    /// Number of marker-effect shutdowns.
    #[must_use]
    pub fn marker_effects_ended(&self) -> usize {
        self.marker_effects_ended
    }

    /// Rolls for every pending request that needs no player input: NPCs and
    /// requests that skip the dialog. Returns how many were resolved.
    pub fn resolve_automatic_rolls(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending_rolls);
        let mut resolved = 0;
        for request in pending {
            let is_npc = self
                .sessions
                .get(&request.session_id)
                .and_then(|s| s.combatant(request.combatant_id))
                .map(|c| c.is_npc);
            match is_npc {
                None => {}
                Some(is_npc) if is_npc || request.skip_dialog => {
                    let value = f64::from(self.dice.roll_die(INITIATIVE_DIE));
                    if self
                        .write_initiative(request.session_id, request.combatant_id, value)
                        .is_ok()
                    {
                        resolved += 1;
                    }
                }
                Some(_) => self.pending_rolls.push(request),
            }
        }
        if resolved > 0 {
            debug!(resolved, waiting = self.pending_rolls.len(), "automatic rolls resolved");
        }
        resolved
    }

    /// Records a player's roll for a combatant of the current session.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` without a current session or
    /// `DomainError::CombatantNotFound` for an unknown combatant.
    pub fn submit_initiative(&mut self, combatant_id: Uuid, value: f64) -> Result<Uuid, DomainError> {
        let session_id = self
            .current
            .ok_or_else(|| DomainError::Validation("no combat in progress".into()))?;
        self.write_initiative(session_id, combatant_id, value)?;
        info!(combatant_id = %combatant_id, value, "initiative submitted");
        Ok(session_id)
    }

    fn write_initiative(
        &mut self,
        session_id: Uuid,
        combatant_id: Uuid,
        value: f64,
    ) -> Result<(), DomainError> {
        let combatant = self
            .sessions
            .get_mut(&session_id)
            .ok_or(DomainError::SessionNotFound(session_id))?
            .combatants
            .iter_mut()
            .find(|c| c.id == combatant_id)
            .ok_or(DomainError::CombatantNotFound(combatant_id))?;
        combatant.initiative = Some(value);
        self.pending_rolls.retain(|r| r.combatant_id != combatant_id);
        Ok(())
    }

    fn session_mut(&mut self, session_id: Uuid) -> Result<&mut CombatSession, DomainError> {
        self.sessions
            .get_mut(&session_id)
            .ok_or(DomainError::SessionNotFound(session_id))
    }

    fn find_token(&self, scene_id: Uuid, token_id: Uuid) -> Option<&Token> {
        self.scenes
            .get(&scene_id)
            .and_then(|tokens| tokens.iter().find(|t| t.id == token_id))
    }
}

impl SessionHost for Table {
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
        self.write_initiative(session_id, combatant_id, value)
    }

    fn request_initiative_roll(&mut self, request: RollRequest) -> Result<(), DomainError> {
        let session = self
            .sessions
            .get(&request.session_id)
            .ok_or(DomainError::SessionNotFound(request.session_id))?;
        if session.combatant(request.combatant_id).is_none() {
            return Err(DomainError::CombatantNotFound(request.combatant_id));
        }
        self.pending_rolls
            .retain(|r| r.combatant_id != request.combatant_id);
        debug!(
            combatant_id = %request.combatant_id,
            skip_dialog = request.skip_dialog,
            "initiative roll requested"
        );
        self.pending_rolls.push(request);
        Ok(())
    }

    fn remove_combatant(
        &mut self,
        session_id: Uuid,
        combatant_id: Uuid,
    ) -> Result<(), DomainError> {
        let session = self.session_mut(session_id)?;
        let before = session.combatants.len();
        session.combatants.retain(|c| c.id != combatant_id);
        if session.combatants.len() == before {
            return Err(DomainError::CombatantNotFound(combatant_id));
        }
        self.pending_rolls.retain(|r| r.combatant_id != combatant_id);
        Ok(())
    }

    fn award_experience(&mut self, award: ExperienceAward) -> Result<(), DomainError> {
        info!(
            session_id = %award.session_id,
            recipients = award.recipients.len(),
            defeated = award.defeated.len(),
            gm_only = award.gm_only,
            "experience awarded"
        );
        self.awards.push(award);
        Ok(())
    }

    fn create_session(&mut self, scene_id: Uuid) -> Result<Uuid, DomainError> {
        if !self.scenes.contains_key(&scene_id) {
            return Err(DomainError::Validation(format!("unknown scene {scene_id}")));
        }
        let session = CombatSession {
            id: Uuid::new_v4(),
            scene_id,
            phase: CombatPhase::Preparing,
            round: 0,
            turn: 0,
            combatants: Vec::new(),
        };
        let session_id = session.id;
        info!(session_id = %session_id, "combat session created");
        self.sessions.insert(session_id, session);
        self.current = Some(session_id);
        Ok(session_id)
    }

    fn add_tokens(&mut self, session_id: Uuid, token_ids: &[Uuid]) -> Result<Vec<Uuid>, DomainError> {
        let scene_id = self
            .sessions
            .get(&session_id)
            .ok_or(DomainError::SessionNotFound(session_id))?
            .scene_id;
        let combatants: Vec<Combatant> = token_ids
            .iter()
            .filter_map(|token_id| {
                let token = self.find_token(scene_id, *token_id);
                if token.is_none() {
                    debug!(token_id = %token_id, "token not on the session's scene, skipping");
                }
                token.map(Token::to_combatant)
            })
            .collect();
        let ids = combatants.iter().map(|c| c.id).collect();
        self.session_mut(session_id)?.combatants.extend(combatants);
        Ok(ids)
    }

    fn begin_session(&mut self, session_id: Uuid) -> Result<(), DomainError> {
        let session = self.session_mut(session_id)?;
        if session.is_active() {
            return Ok(());
        }
        let from = session.round;
        session.phase = CombatPhase::Active;
        session.round = 1;
        info!(session_id = %session_id, "combat session began");
        self.outbox.push_back(HostNotification::RoundChanged {
            session_id,
            from,
            to: 1,
        });
        self.outbox
            .push_back(HostNotification::CombatStarted { session_id });
        Ok(())
    }

    fn end_session(&mut self, session_id: Uuid) -> Result<(), DomainError> {
        let mut session = self
            .sessions
            .remove(&session_id)
            .ok_or(DomainError::SessionNotFound(session_id))?;
        if self.current == Some(session_id) {
            self.current = None;
        }
        self.pending_rolls.retain(|r| r.session_id != session_id);
        session.phase = CombatPhase::Ended;
        info!(session_id = %session_id, "combat session ended");
        self.outbox.push_back(HostNotification::CombatEnded {
            session,
            ended_by: self.acting_user,
        });
        Ok(())
    }
}

impl SceneHost for Table {
    fn active_scene(&self) -> Option<Uuid> {
        self.active_scene
    }

    fn scene_has_token(&self, scene_id: Uuid, token_id: Uuid) -> bool {
        self.find_token(scene_id, token_id).is_some()
    }

    fn player_tokens(&self, scene_id: Uuid) -> Vec<Uuid> {
        self.tokens(scene_id)
            .iter()
            .filter(|t| t.player_owned)
            .map(|t| t.id)
            .collect()
    }

    fn delete_tokens(&mut self, scene_id: Uuid, token_ids: &[Uuid]) -> Result<(), DomainError> {
        let tokens = self
            .scenes
            .get_mut(&scene_id)
            .ok_or_else(|| DomainError::Validation(format!("unknown scene {scene_id}")))?;
        tokens.retain(|t| !token_ids.contains(&t.id));
        Ok(())
    }

    fn end_marker_effects(&mut self) {
        self.marker_effects_ended += 1;
    }
}

impl PlaylistDeck for Table {
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
        let playlist = self
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or(DomainError::PlaylistNotFound(playlist_id))?;
        if playlist.sound_count == 0 {
            warn!(playlist = %playlist.name, "playlist has no sounds");
            return Err(DomainError::Validation(format!(
                "playlist '{}' has no sounds",
                playlist.name
            )));
        }
        playlist.playing = true;
        debug!(playlist = %playlist.name, restart, "playlist playing");
        Ok(())
    }

    fn stop_playlist(&mut self, playlist_id: Uuid) -> Result<(), DomainError> {
        let playlist = self
            .playlists
            .iter_mut()
            .find(|p| p.id == playlist_id)
            .ok_or(DomainError::PlaylistNotFound(playlist_id))?;
        if playlist.playing {
            playlist.playing = false;
            debug!(playlist = %playlist.name, "playlist stopped");
            self.outbox
                .push_back(HostNotification::PlaylistStopped { playlist_id });
        }
        Ok(())
    }
}
