//! In-memory and failing `SettingsStore`s.

use std::sync::Mutex;

use async_trait::async_trait;
use skirmish_core::error::DomainError;
use skirmish_core::settings::{CombatSettings, SettingsStore};

/// A settings store held in memory that records every save.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    current: Mutex<CombatSettings>,
    saves: Mutex<usize>,
}

impl InMemorySettingsStore {
    /// Creates a store holding `settings`.
    #[must_use]
    pub fn new(settings: CombatSettings) -> Self {
        Self {
            current: Mutex::new(settings),
            saves: Mutex::new(0),
        }
    }

    /// Returns a snapshot of the stored settings.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn snapshot(&self) -> CombatSettings {
        self.current.lock().unwrap().clone()
    }

    /// Number of successful `save` calls.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load(&self) -> Result<CombatSettings, DomainError> {
        Ok(self.current.lock().unwrap().clone())
    }

    async fn save(&self, settings: &CombatSettings) -> Result<(), DomainError> {
        *self.current.lock().unwrap() = settings.clone();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

/// A settings store that always returns an infrastructure error. Useful for
/// testing error-handling paths.
#[derive(Debug)]
pub struct FailingSettingsStore;

#[async_trait]
impl SettingsStore for FailingSettingsStore {
    async fn load(&self) -> Result<CombatSettings, DomainError> {
        Err(DomainError::Infrastructure("settings store unavailable".into()))
    }

    async fn save(&self, _settings: &CombatSettings) -> Result<(), DomainError> {
        Err(DomainError::Infrastructure("settings store unavailable".into()))
    }
}
