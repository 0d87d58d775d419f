use chrono::format::{Item, StrftimeItems};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::DEFAULT_DATE_FORMAT;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("date format cannot be empty")]
    EmptyDateFormat,

    #[error("invalid date format: {0}")]
    InvalidDateFormat(String),

    #[error("leaderboard limit must be > 0")]
    ZeroLeaderboardLimit,
}

/// Secondary ordering for learners with the same step count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Whoever reached their step count first ranks higher.
    #[default]
    EarliestCompletion,
    /// Keep the order the learners were fetched in.
    FetchOrder,
}

/// Engine knobs that are not part of the curriculum itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    tie_break: TieBreak,
    date_format: String,
    leaderboard_limit: Option<usize>,
}

/// Unvalidated settings as they come out of a config file or environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineSettingsDraft {
    #[serde(default)]
    pub tie_break: Option<TieBreak>,
    #[serde(default)]
    pub date_format: Option<String>,
    #[serde(default)]
    pub leaderboard_limit: Option<usize>,
}

impl EngineSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and fill defaults.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the date format is blank or not a valid
    /// strftime pattern, or if the leaderboard limit is zero.
    pub fn validate(self) -> Result<EngineSettings, SettingsError> {
        let date_format = match self.date_format {
            None => DEFAULT_DATE_FORMAT.to_owned(),
            Some(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(SettingsError::EmptyDateFormat);
                }
                if StrftimeItems::new(trimmed).any(|item| matches!(item, Item::Error)) {
                    return Err(SettingsError::InvalidDateFormat(trimmed.to_owned()));
                }
                trimmed.to_owned()
            }
        };

        if self.leaderboard_limit == Some(0) {
            return Err(SettingsError::ZeroLeaderboardLimit);
        }

        Ok(EngineSettings {
            tie_break: self.tie_break.unwrap_or_default(),
            date_format,
            leaderboard_limit: self.leaderboard_limit,
        })
    }
}

impl EngineSettings {
    #[must_use]
    pub fn tie_break(&self) -> TieBreak {
        self.tie_break
    }

    #[must_use]
    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    #[must_use]
    pub fn leaderboard_limit(&self) -> Option<usize> {
        self.leaderboard_limit
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::default(),
            date_format: DEFAULT_DATE_FORMAT.to_owned(),
            leaderboard_limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_yields_defaults() {
        let settings = EngineSettingsDraft::new().validate().unwrap();
        assert_eq!(settings, EngineSettings::default());
        assert_eq!(settings.tie_break(), TieBreak::EarliestCompletion);
        assert_eq!(settings.date_format(), DEFAULT_DATE_FORMAT);
    }

    #[test]
    fn rejects_blank_and_broken_formats() {
        let draft = EngineSettingsDraft {
            date_format: Some("  ".into()),
            ..EngineSettingsDraft::default()
        };
        assert_eq!(draft.validate().unwrap_err(), SettingsError::EmptyDateFormat);

        let draft = EngineSettingsDraft {
            date_format: Some("%Q".into()),
            ..EngineSettingsDraft::default()
        };
        assert!(matches!(
            draft.validate().unwrap_err(),
            SettingsError::InvalidDateFormat(_)
        ));
    }

    #[test]
    fn rejects_zero_leaderboard_limit() {
        let draft = EngineSettingsDraft {
            leaderboard_limit: Some(0),
            ..EngineSettingsDraft::default()
        };
        assert_eq!(draft.validate().unwrap_err(), SettingsError::ZeroLeaderboardLimit);
    }

    #[test]
    fn tie_break_deserializes_snake_case() {
        let parsed: TieBreak = serde_json::from_str("\"fetch_order\"").unwrap();
        assert_eq!(parsed, TieBreak::FetchOrder);
    }
}
