//! Shared test fakes and fixtures for the Skirmish combat orchestrator.

mod clock;
pub mod fixtures;
mod host;
mod rng;
mod settings;

pub use clock::{FixedClock, ManualClock};
pub use host::FakeHost;
pub use rng::{MockRng, SequenceRng};
pub use settings::{FailingSettingsStore, InMemorySettingsStore};
