//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use skirmish_core::model::RuleSetFamily;
use uuid::Uuid;

use crate::error::AppError;

/// Settings file used when `SKIRMISH_SETTINGS_PATH` is unset.
pub const DEFAULT_SETTINGS_PATH: &str = "skirmish-settings.yaml";

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Combat settings file (JSON or YAML by extension).
    pub settings_path: PathBuf,
    /// Optional table seed file listing the playlists to register.
    pub table_path: Option<PathBuf>,
    /// Rule-set family, detected from `SKIRMISH_RULESET`.
    pub family: RuleSetFamily,
    /// User the server acts for as game master.
    pub gm_user: Uuid,
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a value is present but malformed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a value is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_owned());
        let port = match lookup("PORT") {
            Some(port) => port
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => 3000,
        };
        let settings_path = lookup("SKIRMISH_SETTINGS_PATH")
            .map_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH), PathBuf::from);
        let table_path = lookup("SKIRMISH_TABLE_PATH").map(PathBuf::from);
        let family = lookup("SKIRMISH_RULESET")
            .map_or(RuleSetFamily::Generic, |flags| {
                RuleSetFamily::detect(flags.split(','))
            });
        let gm_user = match lookup("SKIRMISH_GM_USER") {
            Some(id) => id
                .parse()
                .map_err(|e| AppError::Config(format!("SKIRMISH_GM_USER must be a UUID: {e}")))?,
            None => Uuid::new_v4(),
        };

        Ok(Self {
            host,
            port,
            settings_path,
            table_path,
            family,
            gm_user,
        })
    }

    /// Socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` for an invalid host/port combination.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_environment_is_empty() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.family, RuleSetFamily::Generic);
        assert_eq!(config.settings_path, PathBuf::from(DEFAULT_SETTINGS_PATH));
        assert!(config.table_path.is_none());
        assert!(config.bind_addr().is_ok());
    }

    #[test]
    fn test_ruleset_flags_are_detected() {
        let config = config_from(&[("SKIRMISH_RULESET", "dnd5e, pf2e")]).unwrap();

        assert_eq!(config.family, RuleSetFamily::Pf2e);
    }

    #[test]
    fn test_gm_user_is_parsed() {
        let gm = Uuid::new_v4();

        let config = config_from(&[("SKIRMISH_GM_USER", &gm.to_string())]).unwrap();

        assert_eq!(config.gm_user, gm);
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = config_from(&[("PORT", "eighty")]);

        assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("PORT")));
    }

    #[test]
    fn test_invalid_gm_user_is_rejected() {
        let result = config_from(&[("SKIRMISH_GM_USER", "gm")]);

        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
