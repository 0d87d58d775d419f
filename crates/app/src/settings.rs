use std::fmt;

use config::{ConfigError, Environment, File};
use journey_core::model::{EngineSettings, EngineSettingsDraft, SettingsError};

pub const DEFAULT_CONFIG_PATH: &str = "journey.toml";

#[derive(Debug)]
pub enum SettingsLoadError {
    Config(ConfigError),
    Invalid(SettingsError),
}

impl fmt::Display for SettingsLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsLoadError::Config(e) => write!(f, "failed to load settings: {e}"),
            SettingsLoadError::Invalid(e) => write!(f, "invalid settings: {e}"),
        }
    }
}

impl std::error::Error for SettingsLoadError {}

/// Loads engine settings from an optional TOML file overlaid with
/// `JOURNEY__<KEY>` environment variables.
///
/// The path comes from `--config`, then `JOURNEY_CONFIG`, then
/// `journey.toml`; a missing file is not an error.
///
/// # Errors
///
/// Returns `SettingsLoadError` if a source cannot be parsed or the merged
/// values fail validation.
pub fn load_settings(path: Option<&str>) -> Result<EngineSettings, SettingsLoadError> {
    let path = path.map_or_else(
        || std::env::var("JOURNEY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_owned()),
        str::to_owned,
    );

    let draft: EngineSettingsDraft = config::Config::builder()
        .add_source(File::with_name(&path).required(false))
        .add_source(
            Environment::with_prefix("JOURNEY")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .and_then(|built| built.try_deserialize())
        .map_err(SettingsLoadError::Config)?;

    tracing::debug!(path = %path, ?draft, "loaded settings draft");
    draft.validate().map_err(SettingsLoadError::Invalid)
}
