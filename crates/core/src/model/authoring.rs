use chrono::{DateTime, Utc};
use thiserror::Error;
use url::Url;

use crate::model::ids::{MiniQuestionId, ModuleId, SectionId, TopicId};
use crate::model::snapshot::{MiniQuestionRecord, ModuleRecord, SectionRecord, TopicRecord};
use crate::temporal::{ScheduledSection, validate_deadline_with_format};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModuleError {
    #[error("module title cannot be empty")]
    EmptyTitle,

    #[error("module number must be > 0")]
    InvalidNumber,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MiniQuestionError {
    #[error("mini-question title cannot be empty")]
    EmptyTitle,

    #[error("invalid resource URL: {0}")]
    InvalidResourceUrl(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TopicError {
    #[error("topic title cannot be empty")]
    EmptyTitle,

    #[error("topic number must be > 0")]
    InvalidNumber,

    #[error("content section {section} title cannot be empty")]
    EmptySectionTitle { section: usize },

    #[error("content section {section}, mini-question {index}: {source}")]
    MiniQuestion {
        section: usize,
        index: usize,
        #[source]
        source: MiniQuestionError,
    },

    #[error("{message}")]
    DeadlineConflict {
        message: String,
        conflicting_sections: Vec<usize>,
    },
}

//
// ─── MODULE DRAFT ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDraft {
    pub number: u32,
    pub title: String,
    pub deadline: Option<DateTime<Utc>>,
    pub is_released: bool,
}

impl ModuleDraft {
    /// # Errors
    ///
    /// Returns `ModuleError` for a blank title or a zero number.
    pub fn validate(self, id: ModuleId) -> Result<ModuleRecord, ModuleError> {
        if self.number == 0 {
            return Err(ModuleError::InvalidNumber);
        }
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ModuleError::EmptyTitle);
        }
        Ok(ModuleRecord {
            id,
            number: Some(self.number),
            title: title.to_owned(),
            is_released: self.is_released,
            deadline: self.deadline,
        })
    }
}

//
// ─── TOPIC DRAFT ───────────────────────────────────────────────────────────────
//

/// Mini-question as edited in the topic form. `id` is set when editing an
/// existing activity so learners' answers stay attached to it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MiniQuestionDraft {
    pub id: Option<MiniQuestionId>,
    pub title: String,
    pub prompt: String,
    pub resource_url: Option<String>,
    pub release_at: Option<DateTime<Utc>>,
    pub is_released: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionDraft {
    pub id: Option<SectionId>,
    pub title: String,
    pub material: String,
    pub mini_questions: Vec<MiniQuestionDraft>,
}

impl ScheduledSection for SectionDraft {
    fn release_dates(&self) -> impl Iterator<Item = Option<DateTime<Utc>>> + '_ {
        self.mini_questions.iter().map(|mq| mq.release_at)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDraft {
    pub module_id: ModuleId,
    pub number: u32,
    pub title: String,
    pub body: String,
    pub deadline: Option<DateTime<Utc>>,
    pub points: u32,
    pub bonus_points: u32,
    pub is_released: bool,
    pub sections: Vec<SectionDraft>,
}

impl TopicDraft {
    #[must_use]
    pub fn new(module_id: ModuleId, number: u32, title: impl Into<String>) -> Self {
        Self {
            module_id,
            number,
            title: title.into(),
            body: String::new(),
            deadline: None,
            points: 0,
            bonus_points: 0,
            is_released: false,
            sections: Vec::new(),
        }
    }

    /// Validate the whole form, deadline consistency included.
    ///
    /// # Errors
    ///
    /// Returns `TopicError::DeadlineConflict` when a mini-question is released
    /// after the topic deadline, or another `TopicError` for blank titles,
    /// zero numbers and unparsable resource URLs.
    pub fn validate(self, date_format: &str) -> Result<ValidatedTopic, TopicError> {
        if self.number == 0 {
            return Err(TopicError::InvalidNumber);
        }
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(TopicError::EmptyTitle);
        }

        let check = validate_deadline_with_format(self.deadline, &self.sections, date_format);
        if let (false, Some(message)) = (check.valid, check.message) {
            return Err(TopicError::DeadlineConflict {
                message,
                conflicting_sections: check.conflicting_sections,
            });
        }

        let sections = self
            .sections
            .into_iter()
            .enumerate()
            .map(|(section_idx, section)| validate_section(section_idx, section))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ValidatedTopic {
            module_id: self.module_id,
            number: self.number,
            title,
            body: self.body.trim().to_owned(),
            deadline: self.deadline,
            points: self.points,
            bonus_points: self.bonus_points,
            is_released: self.is_released,
            sections,
        })
    }
}

fn validate_section(
    section_idx: usize,
    section: SectionDraft,
) -> Result<ValidatedSection, TopicError> {
    let title = section.title.trim().to_owned();
    if title.is_empty() {
        return Err(TopicError::EmptySectionTitle {
            section: section_idx + 1,
        });
    }
    let mini_questions = section
        .mini_questions
        .into_iter()
        .enumerate()
        .map(|(idx, mq)| {
            validate_mini_question(mq).map_err(|source| TopicError::MiniQuestion {
                section: section_idx + 1,
                index: idx + 1,
                source,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValidatedSection {
        id: section.id,
        title,
        material: section.material.trim().to_owned(),
        mini_questions,
    })
}

fn validate_mini_question(
    draft: MiniQuestionDraft,
) -> Result<ValidatedMiniQuestion, MiniQuestionError> {
    let title = draft.title.trim().to_owned();
    if title.is_empty() {
        return Err(MiniQuestionError::EmptyTitle);
    }
    let resource_url = draft
        .resource_url
        .map(|raw| raw.trim().to_owned())
        .filter(|raw| !raw.is_empty())
        .map(|raw| Url::parse(&raw).map_err(|_| MiniQuestionError::InvalidResourceUrl(raw)))
        .transpose()?;

    Ok(ValidatedMiniQuestion {
        id: draft.id,
        title,
        prompt: draft.prompt.trim().to_owned(),
        resource_url,
        release_at: draft.release_at,
        is_released: draft.is_released,
    })
}

//
// ─── VALIDATED TOPIC ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMiniQuestion {
    pub id: Option<MiniQuestionId>,
    pub title: String,
    pub prompt: String,
    pub resource_url: Option<Url>,
    pub release_at: Option<DateTime<Utc>>,
    pub is_released: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSection {
    pub id: Option<SectionId>,
    pub title: String,
    pub material: String,
    pub mini_questions: Vec<ValidatedMiniQuestion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTopic {
    pub module_id: ModuleId,
    pub number: u32,
    pub title: String,
    pub body: String,
    pub deadline: Option<DateTime<Utc>>,
    pub points: u32,
    pub bonus_points: u32,
    pub is_released: bool,
    pub sections: Vec<ValidatedSection>,
}

/// Rows produced for one topic, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRecords {
    pub topic: TopicRecord,
    pub sections: Vec<SectionRecord>,
    pub mini_questions: Vec<MiniQuestionRecord>,
}

impl ValidatedTopic {
    /// Flatten into snapshot rows. New sections and mini-questions take ids
    /// from the given allocators; existing ones keep theirs.
    pub fn into_records(
        self,
        topic_id: TopicId,
        mut next_section_id: impl FnMut() -> SectionId,
        mut next_mini_question_id: impl FnMut() -> MiniQuestionId,
    ) -> TopicRecords {
        let mut sections = Vec::with_capacity(self.sections.len());
        let mut mini_questions = Vec::new();

        for (position, section) in (0u32..).zip(self.sections) {
            let section_id = section.id.unwrap_or_else(&mut next_section_id);
            for (mq_position, mq) in (0u32..).zip(section.mini_questions) {
                mini_questions.push(MiniQuestionRecord {
                    id: mq.id.unwrap_or_else(&mut next_mini_question_id),
                    section_id,
                    title: mq.title,
                    prompt: mq.prompt,
                    resource_url: mq.resource_url.map(String::from),
                    release_at: mq.release_at,
                    is_released: mq.is_released,
                    position: mq_position,
                });
            }
            sections.push(SectionRecord {
                id: section_id,
                topic_id,
                title: section.title,
                material: section.material,
                position,
            });
        }

        TopicRecords {
            topic: TopicRecord {
                id: topic_id,
                module_id: self.module_id,
                number: Some(self.number),
                title: self.title,
                body: self.body,
                deadline: self.deadline,
                points: self.points,
                bonus_points: self.bonus_points,
                is_released: self.is_released,
            },
            sections,
            mini_questions,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
