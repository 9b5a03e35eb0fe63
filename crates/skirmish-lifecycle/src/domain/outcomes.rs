//! What each lifecycle pipeline did.

use serde::Serialize;
use skirmish_initiative::{AdmissionRoll, CoordinatorState};
use skirmish_playlist::{FanfareOutcome, PlaylistChoice};
use uuid::Uuid;

/// Result of the admission pipeline for one new combatant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum Admission {
    /// Added by another user, already rolled, or no longer on the roster.
    Ignored,
    /// Carried an ignored tag and was removed.
    Excluded,
    /// Combat not running yet, or automatic initiative is off.
    Deferred,
    /// The initiative mode does not roll for this combatant.
    NotRequired,
    /// A request for it went out earlier.
    AlreadyOffered,
    /// A roll was requested.
    Requested,
    /// Copied from a resolved group leader.
    Inherited(f64),
    /// Waits for the given group leader.
    Following(Uuid),
    /// The roll could not be dispatched now; the poller retries.
    Skipped,
}

impl From<AdmissionRoll> for Admission {
    fn from(roll: AdmissionRoll) -> Self {
        match roll {
            AdmissionRoll::NotRequired => Self::NotRequired,
            AdmissionRoll::AlreadyOffered => Self::AlreadyOffered,
            AdmissionRoll::Requested => Self::Requested,
            AdmissionRoll::Inherited(value) => Self::Inherited(value),
            AdmissionRoll::Following(leader) => Self::Following(leader),
            AdmissionRoll::Skipped => Self::Skipped,
        }
    }
}

/// Result of the round 0 to 1 transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum StartTransition {
    /// Not the GM, or not the first round.
    Skipped,
    /// Waiting for the GM to pick one of these.
    AwaitingSelection(Vec<PlaylistChoice>),
    /// Selection done; the playlist now playing, if any.
    Started(Option<Uuid>),
}

/// Result of the end-of-combat pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EndReport {
    /// Session that ended.
    pub session_id: Uuid,
    /// An experience award was sent.
    pub rewarded: bool,
    /// Tokens deleted from the active scene.
    pub removed_tokens: Vec<Uuid>,
    /// Whether a fanfare started.
    pub fanfare: FanfareOutcome,
}

/// Result of `add_participants`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParticipantsAdded {
    /// Session the tokens joined.
    pub session_id: Uuid,
    /// Whether the session was created for this call.
    pub created: bool,
    /// Admission outcome for each new combatant.
    pub admissions: Vec<(Uuid, Admission)>,
}

/// Result of `start_combat`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "session_id", rename_all = "snake_case")]
pub enum CombatStart {
    /// The current session was already running.
    AlreadyActive(Uuid),
    /// The session moved to round 1.
    Began(Uuid),
}

impl CombatStart {
    /// The session concerned, whichever way it went.
    #[must_use]
    pub fn session_id(self) -> Uuid {
        match self {
            Self::AlreadyActive(id) | Self::Began(id) => id,
        }
    }
}

/// What the controller did with a host notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reaction", content = "detail", rename_all = "snake_case")]
pub enum Reaction {
    /// Admission pipeline ran.
    Admission(Admission),
    /// Start transition ran.
    Start(StartTransition),
    /// Initiative coordinator began, in the given state.
    InitiativeStarted(CoordinatorState),
    /// End pipeline ran.
    Ended(EndReport),
    /// A fanfare stop resumed the previous playlist.
    FanfareFinished,
    /// Nothing to do for this client.
    Ignored,
}
