//! Change notifications raised by the host session.

use serde::Serialize;
use uuid::Uuid;

use crate::model::CombatSession;

/// A roster, phase or playlist change reported by the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostNotification {
    /// A combatant joined a session's roster.
    CombatantAdded {
        /// Session the combatant joined.
        session_id: Uuid,
        /// The new combatant.
        combatant_id: Uuid,
        /// User that added it.
        added_by: Uuid,
    },
    /// The round counter changed.
    RoundChanged {
        /// Session whose round changed.
        session_id: Uuid,
        /// Round before the change.
        from: u32,
        /// Round after the change.
        to: u32,
    },
    /// The session entered the active phase.
    CombatStarted {
        /// Session that started.
        session_id: Uuid,
    },
    /// The session was ended or deleted. Carries the final snapshot since the
    /// host no longer has it.
    CombatEnded {
        /// Final roster snapshot.
        session: CombatSession,
        /// User that ended it.
        ended_by: Uuid,
    },
    /// A playlist's running flag became false.
    PlaylistStopped {
        /// Playlist that stopped.
        playlist_id: Uuid,
    },
}

impl HostNotification {
    /// Returns the notification type name (for logging).
    #[must_use]
    pub fn notification_type(&self) -> &'static str {
        match self {
            Self::CombatantAdded { .. } => "host.combatant_added",
            Self::RoundChanged { .. } => "host.round_changed",
            Self::CombatStarted { .. } => "host.combat_started",
            Self::CombatEnded { .. } => "host.combat_ended",
            Self::PlaylistStopped { .. } => "host.playlist_stopped",
        }
    }

    /// Serializes the notification for structured logs.
    #[must_use]
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Session the notification concerns, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            Self::CombatantAdded { session_id, .. }
            | Self::RoundChanged { session_id, .. }
            | Self::CombatStarted { session_id } => Some(*session_id),
            Self::CombatEnded { session, .. } => Some(session.id),
            Self::PlaylistStopped { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_is_tagged() {
        let playlist_id = Uuid::new_v4();
        let notification = HostNotification::PlaylistStopped { playlist_id };

        let payload = notification.to_payload();

        assert_eq!(payload["type"], "playlist_stopped");
        assert_eq!(payload["playlist_id"], playlist_id.to_string());
        assert_eq!(notification.notification_type(), "host.playlist_stopped");
        assert!(notification.session_id().is_none());
    }

    #[test]
    fn test_session_id_for_round_change() {
        let session_id = Uuid::new_v4();
        let notification = HostNotification::RoundChanged {
            session_id,
            from: 0,
            to: 1,
        };

        assert_eq!(notification.session_id(), Some(session_id));
    }
}
