use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{MiniQuestionId, ModuleId, SectionId, TopicId};

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Flat module row as delivered by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleRecord {
    pub id: ModuleId,
    #[serde(default)]
    pub number: Option<u32>,
    pub title: String,
    #[serde(default)]
    pub is_released: bool,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

impl ModuleRecord {
    #[must_use]
    pub fn new(id: ModuleId, number: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            number: Some(number),
            title: title.into(),
            is_released: false,
            deadline: None,
        }
    }

    #[must_use]
    pub fn released(mut self, is_released: bool) -> Self {
        self.is_released = is_released;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Flat topic (main assignment) row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub id: TopicId,
    pub module_id: ModuleId,
    #[serde(default)]
    pub number: Option<u32>,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(default)]
    pub points: u32,
    #[serde(default)]
    pub bonus_points: u32,
    #[serde(default)]
    pub is_released: bool,
}

impl TopicRecord {
    #[must_use]
    pub fn new(id: TopicId, module_id: ModuleId, number: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            module_id,
            number: Some(number),
            title: title.into(),
            body: String::new(),
            deadline: None,
            points: 0,
            bonus_points: 0,
            is_released: false,
        }
    }

    #[must_use]
    pub fn released(mut self, is_released: bool) -> Self {
        self.is_released = is_released;
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Flat content section row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRecord {
    pub id: SectionId,
    pub topic_id: TopicId,
    pub title: String,
    #[serde(default)]
    pub material: String,
    #[serde(default)]
    pub position: u32,
}

impl SectionRecord {
    #[must_use]
    pub fn new(id: SectionId, topic_id: TopicId, position: u32, title: impl Into<String>) -> Self {
        Self {
            id,
            topic_id,
            title: title.into(),
            material: String::new(),
            position,
        }
    }
}

/// Flat mini-question (self-learning activity) row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniQuestionRecord {
    pub id: MiniQuestionId,
    pub section_id: SectionId,
    pub title: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub resource_url: Option<String>,
    #[serde(default)]
    pub release_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_released: bool,
    #[serde(default)]
    pub position: u32,
}

impl MiniQuestionRecord {
    #[must_use]
    pub fn new(
        id: MiniQuestionId,
        section_id: SectionId,
        position: u32,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id,
            section_id,
            title: title.into(),
            prompt: String::new(),
            resource_url: None,
            release_at: None,
            is_released: false,
            position,
        }
    }

    #[must_use]
    pub fn released(mut self, is_released: bool) -> Self {
        self.is_released = is_released;
        self
    }

    #[must_use]
    pub fn release_at(mut self, at: DateTime<Utc>) -> Self {
        self.release_at = Some(at);
        self
    }
}

//
// ─── SNAPSHOT ──────────────────────────────────────────────────────────────────
//

/// Everything the engine needs to know about the curriculum at one instant.
///
/// Parents are referenced by id, so a snapshot may contain dangling rows;
/// `Curriculum::assemble` drops those instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurriculumSnapshot {
    #[serde(default)]
    pub modules: Vec<ModuleRecord>,
    #[serde(default)]
    pub topics: Vec<TopicRecord>,
    #[serde(default)]
    pub sections: Vec<SectionRecord>,
    #[serde(default)]
    pub mini_questions: Vec<MiniQuestionRecord>,
}

impl CurriculumSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
            && self.topics.is_empty()
            && self.sections.is_empty()
            && self.mini_questions.is_empty()
    }
}
