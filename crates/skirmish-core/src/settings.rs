//! Combat settings read from the external configuration store.
//!
//! The orchestrator treats these as read-only input. Only the legacy
//! migration and the playlist editor write them back, through
//! [`SettingsStore`].

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;
use crate::model::{Combatant, RuleSetFamily};

/// Interval between initiative polling ticks.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1500;

/// Tick budget before a poller gives up (five minutes at the default interval).
pub const DEFAULT_MAX_POLL_TICKS: u32 = 200;

/// Tags ignored out of the box.
pub const DEFAULT_IGNORE_TAGS: &str = "pet, summon";

/// Which combatants get an initiative roll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitiativeMode {
    /// Everyone rolls.
    #[default]
    Enabled,
    /// Nobody is rolled for automatically.
    Disabled,
    /// Only NPCs.
    Npc,
    /// Only player characters.
    Pc,
}

impl InitiativeMode {
    /// Returns `true` if automatic rolling is switched off.
    #[must_use]
    pub fn is_disabled(self) -> bool {
        self == Self::Disabled
    }

    /// Returns `true` if `combatant` must end up with an initiative value.
    #[must_use]
    pub fn admits(self, combatant: &Combatant) -> bool {
        match self {
            Self::Enabled => true,
            Self::Disabled => false,
            Self::Npc => combatant.is_npc,
            Self::Pc => !combatant.is_npc,
        }
    }
}

/// Pathfinder 2e roll-dialog behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoInitMode {
    /// Host default.
    #[default]
    Default,
    /// Skip the roll dialog for everyone.
    Fast,
    /// Always show the roll dialog.
    Prompt,
    /// Skip the dialog for NPCs, show it to players.
    FastPrompt,
}

/// One configured combat or fanfare playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// Playlist reference.
    pub playlist_id: Uuid,
    /// Only auto-select this entry on the given scene.
    #[serde(default)]
    pub scene_id: Option<Uuid>,
    /// Victory playlist played once at combat end.
    #[serde(default)]
    pub fanfare: bool,
}

/// Name-based playlist settings from older releases, migrated on startup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyPlaylistSettings {
    /// Combat playlist name.
    pub playlist: String,
    /// Boss combat playlist name.
    pub boss_playlist: String,
    /// Fanfare playlist name.
    pub fanfare_playlist: String,
    /// Old "roll for NPCs only" toggle.
    pub npc_roll: bool,
}

impl LegacyPlaylistSettings {
    /// Returns `true` when nothing is left to migrate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.playlist.is_empty()
            && self.boss_playlist.is_empty()
            && self.fanfare_playlist.is_empty()
            && !self.npc_roll
    }
}

/// Post-combat reward switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewardSettings {
    /// Award experience at combat end.
    pub enabled: bool,
    /// Whisper the award to the game master only.
    pub gm_only: bool,
}

/// Everything the orchestrator reads from the configuration store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatSettings {
    /// Automatic initiative mode.
    pub initiative: InitiativeMode,
    /// Roll once for NPCs sharing an actor.
    pub group_npcs: bool,
    /// Comma-separated token tags excluded from combat.
    pub ignore_tags: String,
    /// Delete defeated hostile NPC tokens at combat end.
    pub remove_defeated: bool,
    /// Award experience at combat end.
    pub award_experience: bool,
    /// Whisper experience awards to the game master only.
    pub experience_gm_only: bool,
    /// Ask which playlist to play when combat starts.
    pub choose_playlist: bool,
    /// Restart a resumed playlist from its first track.
    pub restart_resumed_playlist: bool,
    /// Pathfinder 2e roll-dialog behavior.
    pub auto_init: AutoInitMode,
    /// Milliseconds between initiative polling ticks.
    pub poll_interval_ms: u64,
    /// Ticks before an initiative poller times out.
    pub max_poll_ticks: u32,
    /// Configured combat and fanfare playlists.
    pub playlists: Vec<PlaylistEntry>,
    /// Settings awaiting migration.
    pub legacy: LegacyPlaylistSettings,
}

impl Default for CombatSettings {
    fn default() -> Self {
        Self::defaults_for(RuleSetFamily::Generic)
    }
}

impl CombatSettings {
    /// Defaults for a rule-set family. OSE handles initiative by side, so
    /// automatic rolling starts disabled there; experience tracking is on
    /// for the families that award it.
    #[must_use]
    pub fn defaults_for(family: RuleSetFamily) -> Self {
        let awards = matches!(family, RuleSetFamily::Dnd5e | RuleSetFamily::Ose);
        Self {
            initiative: if family == RuleSetFamily::Ose {
                InitiativeMode::Disabled
            } else {
                InitiativeMode::Enabled
            },
            group_npcs: false,
            ignore_tags: DEFAULT_IGNORE_TAGS.to_owned(),
            remove_defeated: false,
            award_experience: awards,
            experience_gm_only: false,
            choose_playlist: false,
            restart_resumed_playlist: true,
            auto_init: AutoInitMode::Default,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_poll_ticks: DEFAULT_MAX_POLL_TICKS,
            playlists: Vec::new(),
            legacy: LegacyPlaylistSettings::default(),
        }
    }

    /// Parses the free-text ignore list: comma-separated, trimmed, empty
    /// items dropped. Matching stays case-sensitive.
    #[must_use]
    pub fn ignore_tag_set(&self) -> BTreeSet<String> {
        self.ignore_tags
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_owned)
            .collect()
    }

    /// Polling interval as a [`Duration`], never zero.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Reward switches.
    #[must_use]
    pub fn rewards(&self) -> RewardSettings {
        RewardSettings {
            enabled: self.award_experience,
            gm_only: self.experience_gm_only,
        }
    }

    /// Non-fanfare entries, in configured order.
    pub fn combat_playlists(&self) -> impl Iterator<Item = &PlaylistEntry> {
        self.playlists.iter().filter(|entry| !entry.fanfare)
    }

    /// Fanfare entries, in configured order.
    pub fn fanfare_playlists(&self) -> impl Iterator<Item = &PlaylistEntry> {
        self.playlists.iter().filter(|entry| entry.fanfare)
    }
}

/// Read/write access to the external configuration store.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Loads the current settings.
    async fn load(&self) -> Result<CombatSettings, DomainError>;

    /// Replaces the stored settings.
    async fn save(&self, settings: &CombatSettings) -> Result<(), DomainError>;
}
