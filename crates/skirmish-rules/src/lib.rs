//! Rule-set strategies: how initiative is rolled and what a win is worth.
//!
//! One strategy per supported tabletop rule-set family decides how an
//! initiative roll is dispatched to the host and what happens to rewards
//! when an encounter ends. The family is resolved once at setup and the
//! chosen strategy is injected into the lifecycle controller.

pub mod domain;

pub use domain::selection::select_strategy;
pub use domain::strategy::RuleSetStrategy;
pub use domain::variants::{Dnd5eRules, GenericRules, OseRules, Pf2eRules};
