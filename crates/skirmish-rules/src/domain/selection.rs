//! Family-based strategy selection.

use skirmish_core::model::RuleSetFamily;
use skirmish_core::settings::CombatSettings;
use tracing::info;

use super::strategy::RuleSetStrategy;
use super::variants::{Dnd5eRules, GenericRules, OseRules, Pf2eRules};

/// Builds the strategy for `family`. Called once at setup; the result is
/// injected and never re-resolved.
#[must_use]
pub fn select_strategy(
    family: RuleSetFamily,
    settings: &CombatSettings,
) -> Box<dyn RuleSetStrategy> {
    info!(?family, "selecting rule-set strategy");
    match family {
        RuleSetFamily::Pf2e => Box::new(Pf2eRules::new(settings.auto_init)),
        RuleSetFamily::Dnd5e => Box::new(Dnd5eRules),
        RuleSetFamily::Ose => Box::new(OseRules),
        RuleSetFamily::Generic => Box::new(GenericRules),
    }
}
