//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `duolight.toml` in the working directory, or at the path in
//! `DUOLIGHT_CONFIG`. Every section has a sensible default so the file is
//! optional; a hub without `[[lights]]` simply runs its integrations.
//! Environment variables take precedence over file values.

use serde::Deserialize;

use duolight_app::platform::PlatformConfig;
use duolight_domain::error::{HubError, ValidationError};

const DEFAULT_PATH: &str = "duolight.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Integration toggles.
    pub integrations: IntegrationsConfig,
    /// Dual entity lights to set up.
    pub lights: Vec<PlatformConfig>,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Per-integration toggles.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct IntegrationsConfig {
    /// Enable the virtual/demo integration.
    pub virtual_enabled: bool,
}

impl Config {
    /// Load configuration from `duolight.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if a
    /// light is misconfigured.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("DUOLIGHT_CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_string());
        let mut config = Self::from_file(&path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DUOLIGHT_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for light in &self.lights {
            light
                .validate()
                .map_err(|err| ConfigError::Validation(err.into()))?;
        }
        let entity_ids = self
            .lights
            .iter()
            .map(|light| light.identity().map(|identity| identity.entity_id))
            .collect::<Result<Vec<_>, _>>()
            .map_err(ConfigError::Validation)?;
        for (index, entity_id) in entity_ids.iter().enumerate() {
            if entity_ids[..index].contains(entity_id) {
                return Err(ConfigError::DuplicateLight(entity_id.to_string()));
            }
            // a light fed by another light's output would republish in a loop
            let is_source = self.lights.iter().any(|other| {
                &other.onoff_entity == entity_id || &other.feature_entity == entity_id
            });
            if is_source {
                return Err(ConfigError::Validation(
                    ValidationError::SelfReference(entity_id.to_string()).into(),
                ));
            }
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "duolightd=info,duolight_app=info,duolight_adapter_virtual=info".to_string(),
        }
    }
}

impl Default for IntegrationsConfig {
    fn default() -> Self {
        Self {
            virtual_enabled: true,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration")]
    Validation(#[source] HubError),
    /// Two lights would publish under the same entity id.
    #[error("light {0} is configured twice")]
    DuplicateLight(String),
}
