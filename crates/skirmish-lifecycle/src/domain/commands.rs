//! Commands for the externally triggerable operations.

use serde::Deserialize;
use skirmish_core::command::Command;
use uuid::Uuid;

/// Implements `Command` for a struct with `correlation_id` and `issued_by`.
macro_rules! combat_command {
    ($name:ident, $kind:literal) => {
        impl Command for $name {
            fn command_type(&self) -> &'static str {
                $kind
            }

            fn correlation_id(&self) -> Uuid {
                self.correlation_id
            }

            fn issued_by(&self) -> Uuid {
                self.issued_by
            }
        }
    };
}

/// Pulls the active scene's player tokens into combat.
#[derive(Debug, Clone, Deserialize)]
pub struct AddParticipants {
    pub correlation_id: Uuid,
    pub issued_by: Uuid,
}

/// Starts combat, creating it first if needed.
#[derive(Debug, Clone, Deserialize)]
pub struct StartCombat {
    pub correlation_id: Uuid,
    pub issued_by: Uuid,
}

/// Ends the current combat.
#[derive(Debug, Clone, Deserialize)]
pub struct EndCombat {
    pub correlation_id: Uuid,
    pub issued_by: Uuid,
}

/// Answers the combat playlist prompt.
#[derive(Debug, Clone, Deserialize)]
pub struct SelectCombatPlaylist {
    pub correlation_id: Uuid,
    pub issued_by: Uuid,
    /// `None` plays nothing.
    pub playlist_id: Option<Uuid>,
}

combat_command!(AddParticipants, "combat.add_participants");
combat_command!(StartCombat, "combat.start");
combat_command!(EndCombat, "combat.end");
combat_command!(SelectCombatPlaylist, "combat.select_playlist");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_types_are_namespaced() {
        let id = Uuid::new_v4();
        let end = EndCombat {
            correlation_id: id,
            issued_by: id,
        };
        let select = SelectCombatPlaylist {
            correlation_id: id,
            issued_by: id,
            playlist_id: None,
        };

        assert_eq!(end.command_type(), "combat.end");
        assert_eq!(select.command_type(), "combat.select_playlist");
        assert_eq!(select.correlation_id(), id);
    }
}
