//! One-time migration of answers that referenced topics by number.
//!
//! Older exports identified a topic by `(module number, question number)`.
//! Those pairs are resolved to stable topic ids once, at import; the engine
//! itself only ever matches by id.

use chrono::{DateTime, Utc};
use journey_core::model::{
    AnswerId, CurriculumSnapshot, LearnerId, ReviewStatus, TopicAnswer, TopicId,
};
use serde::{Deserialize, Serialize};

/// A topic answer keyed by numbers instead of a topic id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyTopicAnswer {
    pub learner_id: LearnerId,
    pub module_number: u32,
    pub question_number: u32,
    pub content: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyMigration {
    /// Converted answers. Their IDs are placeholders; the repository assigns
    /// real ones on insert.
    pub answers: Vec<TopicAnswer>,
    pub unmatched: Vec<LegacyTopicAnswer>,
}

/// Resolves every legacy answer against the curriculum rows.
///
/// A pair that names no topic, or more than one, is left unmatched rather
/// than guessed.
#[must_use]
pub fn migrate(curriculum: &CurriculumSnapshot, legacy: Vec<LegacyTopicAnswer>) -> LegacyMigration {
    let mut migration = LegacyMigration::default();

    for answer in legacy {
        match resolve(curriculum, answer.module_number, answer.question_number) {
            Some(topic_id) => migration.answers.push(TopicAnswer {
                id: AnswerId::new(0),
                learner_id: answer.learner_id,
                topic_id,
                content: answer.content,
                notes: answer.notes,
                submitted_at: answer.submitted_at,
                status: answer.status,
                reviewed_at: answer.reviewed_at,
            }),
            None => {
                tracing::warn!(
                    learner_id = %answer.learner_id,
                    module_number = answer.module_number,
                    question_number = answer.question_number,
                    "legacy answer matches no single topic"
                );
                migration.unmatched.push(answer);
            }
        }
    }

    tracing::info!(
        migrated = migration.answers.len(),
        unmatched = migration.unmatched.len(),
        "migrated legacy topic answers"
    );
    migration
}

fn resolve(
    curriculum: &CurriculumSnapshot,
    module_number: u32,
    topic_number: u32,
) -> Option<TopicId> {
    let mut modules = curriculum
        .modules
        .iter()
        .filter(|m| m.number == Some(module_number));
    let module = modules.next()?;
    if modules.next().is_some() {
        return None;
    }

    let mut topics = curriculum
        .topics
        .iter()
        .filter(|t| t.module_id == module.id && t.number == Some(topic_number));
    let topic = topics.next()?;
    if topics.next().is_some() {
        return None;
    }
    Some(topic.id)
}
