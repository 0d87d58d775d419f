use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::LearnerId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum LearnerError {
    #[error("learner name cannot be empty")]
    EmptyName,
}

/// A participant on the journey, as shown on the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Learner {
    id: LearnerId,
    name: String,
}

impl Learner {
    /// Creates a learner with a trimmed display name.
    ///
    /// # Errors
    ///
    /// Returns `LearnerError::EmptyName` if name is empty or whitespace-only.
    pub fn new(id: LearnerId, name: impl Into<String>) -> Result<Self, LearnerError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(LearnerError::EmptyName);
        }
        Ok(Self {
            id,
            name: trimmed.to_owned(),
        })
    }

    #[must_use]
    pub fn id(&self) -> LearnerId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}
