//! File-backed settings store.
//!
//! The format follows the file extension: `.yaml`/`.yml` is YAML, anything
//! else JSON. A missing file reads as the rule-set family's defaults.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use skirmish_core::error::DomainError;
use skirmish_core::model::RuleSetFamily;
use skirmish_core::settings::{CombatSettings, SettingsStore};
use tracing::{debug, info};

/// Serialization format of a configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// JSON.
    Json,
    /// YAML.
    Yaml,
}

impl DocumentFormat {
    /// Picks the format from `path`'s extension.
    #[must_use]
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Json,
        }
    }

    /// Parses `text`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if the document is malformed.
    pub fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T, DomainError> {
        match self {
            Self::Json => serde_json::from_str(text)
                .map_err(|e| DomainError::Infrastructure(format!("invalid JSON document: {e}"))),
            Self::Yaml => serde_yaml::from_str(text)
                .map_err(|e| DomainError::Infrastructure(format!("invalid YAML document: {e}"))),
        }
    }

    /// Renders `value`.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Infrastructure` if serialization fails.
    pub fn render<T: Serialize>(self, value: &T) -> Result<String, DomainError> {
        match self {
            Self::Json => serde_json::to_string_pretty(value)
                .map_err(|e| DomainError::Infrastructure(e.to_string())),
            Self::Yaml => {
                serde_yaml::to_string(value).map_err(|e| DomainError::Infrastructure(e.to_string()))
            }
        }
    }
}

/// Reads and parses a JSON or YAML document.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if the file cannot be read or parsed.
pub async fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T, DomainError> {
    let text = tokio::fs::read_to_string(path).await.map_err(|e| {
        DomainError::Infrastructure(format!("failed to read {}: {e}", path.display()))
    })?;
    DocumentFormat::for_path(path).parse(&text)
}

/// Settings kept in a single JSON or YAML file.
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
    family: RuleSetFamily,
}

impl FileSettingsStore {
    /// Creates a store over `path`; a missing file yields `family`'s defaults.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, family: RuleSetFamily) -> Self {
        Self {
            path: path.into(),
            family,
        }
    }

    /// Backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn load(&self) -> Result<CombatSettings, DomainError> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            debug!(path = %self.path.display(), family = ?self.family, "no settings file, using defaults");
            return Ok(CombatSettings::defaults_for(self.family));
        }
        read_document(&self.path).await
    }

    async fn save(&self, settings: &CombatSettings) -> Result<(), DomainError> {
        let text = DocumentFormat::for_path(&self.path).render(settings)?;
        tokio::fs::write(&self.path, text).await.map_err(|e| {
            DomainError::Infrastructure(format!("failed to write {}: {e}", self.path.display()))
        })?;
        info!(path = %self.path.display(), "combat settings saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use skirmish_core::settings::InitiativeMode;
    use uuid::Uuid;

    use super::*;

    fn temp_path(extension: &str) -> PathBuf {
        std::env::temp_dir().join(format!("skirmish-settings-{}.{extension}", Uuid::new_v4()))
    }

    #[test]
    fn test_format_follows_extension() {
        assert_eq!(DocumentFormat::for_path(Path::new("a.yaml")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::for_path(Path::new("a.YML")), DocumentFormat::Yaml);
        assert_eq!(DocumentFormat::for_path(Path::new("a.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::for_path(Path::new("settings")), DocumentFormat::Json);
    }

    #[test]
    fn test_partial_yaml_fills_in_defaults() {
        let settings: CombatSettings = DocumentFormat::Yaml
            .parse("initiative: npc\ngroup_npcs: true\n")
            .unwrap();

        assert_eq!(settings.initiative, InitiativeMode::Npc);
        assert!(settings.group_npcs);
        assert_eq!(settings.max_poll_ticks, CombatSettings::default().max_poll_ticks);
    }

    #[test]
    fn test_malformed_json_is_infrastructure_error() {
        let result: Result<CombatSettings, _> = DocumentFormat::Json.parse("{ not json");

        assert!(matches!(result, Err(DomainError::Infrastructure(_))));
    }

    #[tokio::test]
    async fn test_missing_file_loads_family_defaults() {
        let store = FileSettingsStore::new(temp_path("json"), RuleSetFamily::Ose);

        let settings = store.load().await.unwrap();

        assert_eq!(settings, CombatSettings::defaults_for(RuleSetFamily::Ose));
    }

    #[tokio::test]
    async fn test_saved_settings_load_back() {
        for extension in ["json", "yaml"] {
            // Arrange
            let path = temp_path(extension);
            let store = FileSettingsStore::new(&path, RuleSetFamily::Generic);
            let settings = CombatSettings {
                ignore_tags: "familiar".to_owned(),
                choose_playlist: true,
                ..CombatSettings::default()
            };

            // Act
            store.save(&settings).await.unwrap();
            let loaded = store.load().await.unwrap();

            // Assert
            assert_eq!(loaded, settings);
            tokio::fs::remove_file(&path).await.unwrap();
        }
    }
}
