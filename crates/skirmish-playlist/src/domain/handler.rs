//! Playlist handoff state machine.
//!
//! `Stopped -> PlayingMain -> PlayingFanfare -> PlayingResumed -> Stopped`.
//! Unresolvable references never surface as errors: the handler logs and
//! falls through to the next fallback.

use serde::Serialize;
use skirmish_core::host::PlaylistDeck;
use skirmish_core::settings::PlaylistEntry;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Playlists the handler is tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlaylistRuntimeState {
    /// Combat playlist started for the current fight.
    pub active: Option<Uuid>,
    /// Playlist that was running before combat, resumed afterwards.
    pub previous: Option<Uuid>,
    /// Fanfare currently playing. Set only while it plays.
    pub fanfare: Option<Uuid>,
}

/// Coarse audio phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistPhase {
    /// Nothing started by the handler is playing.
    #[default]
    Stopped,
    /// The combat playlist is playing.
    PlayingMain,
    /// The victory fanfare is playing.
    PlayingFanfare,
    /// Audio from before (or during) combat is playing again.
    PlayingResumed,
}

/// Whether the end-of-combat fanfare started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FanfareOutcome {
    /// A fanfare is playing.
    Started,
    /// No fanfare; the fallback playlist (if any) was resumed instead.
    NotStarted,
}

/// Drives playlist transitions around combat start and end.
#[derive(Debug, Clone, Default)]
pub struct PlaylistHandler {
    state: PlaylistRuntimeState,
    phase: PlaylistPhase,
    restart_on_resume: bool,
}

impl PlaylistHandler {
    /// Creates a stopped handler.
    #[must_use]
    pub fn new(restart_on_resume: bool) -> Self {
        Self {
            state: PlaylistRuntimeState::default(),
            phase: PlaylistPhase::Stopped,
            restart_on_resume,
        }
    }

    /// Tracked playlists.
    #[must_use]
    pub fn state(&self) -> PlaylistRuntimeState {
        self.state
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> PlaylistPhase {
        self.phase
    }

    /// Changes whether resumed playlists restart from the first track.
    pub fn set_restart_on_resume(&mut self, restart: bool) {
        self.restart_on_resume = restart;
    }

    /// Starts the combat playlist. `None` plays nothing. Everything else
    /// playing is stopped and the first of it remembered for later. Returns
    /// `true` if the selection is now playing.
    pub fn start_combat(&mut self, deck: &mut dyn PlaylistDeck, selection: Option<Uuid>) -> bool {
        let Some(playlist_id) = selection else {
            debug!("no combat playlist selected");
            return false;
        };
        let Some(info) = deck.playlist(playlist_id) else {
            warn!(playlist_id = %playlist_id, "combat playlist not found, not starting");
            return false;
        };

        let fanfare = self.state.fanfare.take();
        let playing = deck.playing_playlists();
        let interrupted = playing
            .iter()
            .copied()
            .find(|id| *id != playlist_id && Some(*id) != fanfare);
        if interrupted.is_some() || fanfare.is_none() {
            self.state.previous = interrupted;
        }

        for other in playing.into_iter().filter(|id| *id != playlist_id) {
            if let Err(e) = deck.stop_playlist(other) {
                warn!(playlist_id = %other, error = %e, "failed to stop playlist");
            }
        }

        match deck.play_playlist(playlist_id, true) {
            Ok(()) => {
                info!(playlist = %info.name, previous = ?self.state.previous, "combat playlist started");
                self.state.active = Some(playlist_id);
                self.phase = PlaylistPhase::PlayingMain;
                true
            }
            Err(e) => {
                warn!(playlist = %info.name, error = %e, "combat playlist failed to start");
                self.state.active = None;
                self.phase = PlaylistPhase::Stopped;
                self.resume_previous(deck);
                false
            }
        }
    }

    /// Ends combat audio. Plays the first resolvable fanfare entry after
    /// stopping the combat playlist; without one, resumes the playlist from
    /// before combat, or failing that lets the combat playlist carry on.
    pub fn end_combat(&mut self, deck: &mut dyn PlaylistDeck, entries: &[PlaylistEntry]) -> FanfareOutcome {
        let combat = self.state.active.take();
        let mut combat_stopped = false;

        let fanfare = entries.iter().filter(|e| e.fanfare).find_map(|entry| {
            let info = deck.playlist(entry.playlist_id);
            if info.is_none() {
                debug!(playlist_id = %entry.playlist_id, "fanfare playlist not found, skipping");
            }
            info
        });

        if let Some(fanfare) = fanfare {
            if let Some(combat) = combat.filter(|id| *id != fanfare.id) {
                combat_stopped = stop(deck, combat);
            }
            match deck.play_playlist(fanfare.id, true) {
                Ok(()) => {
                    info!(playlist = %fanfare.name, "fanfare started");
                    self.state.fanfare = Some(fanfare.id);
                    self.phase = PlaylistPhase::PlayingFanfare;
                    return FanfareOutcome::Started;
                }
                Err(e) => warn!(playlist = %fanfare.name, error = %e, "fanfare failed to start"),
            }
        }

        if self.state.previous.is_some() {
            if let Some(combat) = combat.filter(|_| !combat_stopped) {
                stop(deck, combat);
            }
            if self.resume_previous(deck).is_none() {
                self.phase = PlaylistPhase::Stopped;
            }
        } else if let Some(combat) = combat {
            if combat_stopped {
                self.resume(deck, combat);
            } else {
                debug!(playlist_id = %combat, "no playlist to resume, combat playlist keeps playing");
                self.phase = PlaylistPhase::PlayingResumed;
            }
        } else {
            self.phase = PlaylistPhase::Stopped;
        }
        FanfareOutcome::NotStarted
    }

    /// Resumes the playlist from before combat. Clears it first, so a second
    /// call does nothing.
    pub fn resume_previous(&mut self, deck: &mut dyn PlaylistDeck) -> Option<Uuid> {
        let previous = self.state.previous.take()?;
        if deck.playlist(previous).is_none() {
            warn!(playlist_id = %previous, "previous playlist no longer exists");
            return None;
        }
        self.resume(deck, previous).then_some(previous)
    }

    /// Reacts to a playlist's running flag turning false. Only the fanfare
    /// matters: it is cleared and the previous playlist resumed. Returns
    /// `true` if the notification was acted on.
    pub fn on_playlist_stopped(&mut self, deck: &mut dyn PlaylistDeck, playlist_id: Uuid) -> bool {
        if self.state.fanfare != Some(playlist_id) {
            return false;
        }
        debug!(playlist_id = %playlist_id, "fanfare finished");
        self.state.fanfare = None;
        if self.resume_previous(deck).is_none() {
            self.phase = PlaylistPhase::Stopped;
        }
        true
    }

    fn resume(&mut self, deck: &mut dyn PlaylistDeck, playlist_id: Uuid) -> bool {
        match deck.play_playlist(playlist_id, self.restart_on_resume) {
            Ok(()) => {
                info!(playlist_id = %playlist_id, "playlist resumed");
                self.phase = PlaylistPhase::PlayingResumed;
                true
            }
            Err(e) => {
                warn!(playlist_id = %playlist_id, error = %e, "failed to resume playlist");
                self.phase = PlaylistPhase::Stopped;
                false
            }
        }
    }
}

fn stop(deck: &mut dyn PlaylistDeck, playlist_id: Uuid) -> bool {
    match deck.stop_playlist(playlist_id) {
        Ok(()) => true,
        Err(e) => {
            warn!(playlist_id = %playlist_id, error = %e, "failed to stop playlist");
            false
        }
    }
}
