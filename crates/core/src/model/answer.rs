use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{AnswerId, LearnerId, MiniQuestionId, TopicId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("answer content cannot be empty")]
    EmptyContent,

    #[error("a review must approve or reject the answer")]
    ReviewToPending,
}

//
// ─── REVIEW STATUS ─────────────────────────────────────────────────────────────
//

/// Administrator review state of a topic answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

//
// ─── DRAFTS ────────────────────────────────────────────────────────────────────
//

/// Learner input for either kind of answer, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerDraft {
    pub content: String,
    pub notes: Option<String>,
}

impl AnswerDraft {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            notes: None,
        }
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Trim content and drop blank notes.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::EmptyContent` if the content is blank.
    pub fn validate(self) -> Result<(String, Option<String>), AnswerError> {
        let content = self.content.trim().to_owned();
        if content.is_empty() {
            return Err(AnswerError::EmptyContent);
        }
        let notes = self
            .notes
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty());
        Ok((content, notes))
    }
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// A learner's submission for a topic's main assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicAnswer {
    pub id: AnswerId,
    pub learner_id: LearnerId,
    pub topic_id: TopicId,
    pub content: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub status: ReviewStatus,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
}

impl TopicAnswer {
    /// Build a pending answer from a validated draft.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::EmptyContent` if the content is blank.
    pub fn submit(
        id: AnswerId,
        learner_id: LearnerId,
        topic_id: TopicId,
        draft: AnswerDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, AnswerError> {
        let (content, notes) = draft.validate()?;
        Ok(Self {
            id,
            learner_id,
            topic_id,
            content,
            notes,
            submitted_at: now,
            status: ReviewStatus::Pending,
            reviewed_at: None,
        })
    }

    /// Record an administrator decision.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError::ReviewToPending` if `status` is `Pending`.
    pub fn review(&mut self, status: ReviewStatus, at: DateTime<Utc>) -> Result<(), AnswerError> {
        if status == ReviewStatus::Pending {
            return Err(AnswerError::ReviewToPending);
        }
        self.status = status;
        self.reviewed_at = Some(at);
        Ok(())
    }

    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == ReviewStatus::Approved
    }

    /// When this answer turned into progress, if it did.
    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.is_approved()
            .then(|| self.reviewed_at.unwrap_or(self.submitted_at))
    }
}

/// A learner's link/answer for a mini-question. No review step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniQuestionAnswer {
    pub learner_id: LearnerId,
    pub mini_question_id: MiniQuestionId,
    pub content: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl MiniQuestionAnswer {
    /// # Errors
    ///
    /// Returns `AnswerError::EmptyContent` if the content is blank.
    pub fn submit(
        learner_id: LearnerId,
        mini_question_id: MiniQuestionId,
        draft: AnswerDraft,
        now: DateTime<Utc>,
    ) -> Result<Self, AnswerError> {
        let (content, notes) = draft.validate()?;
        Ok(Self {
            learner_id,
            mini_question_id,
            content,
            notes,
            submitted_at: now,
        })
    }
}

//
// ─── PER-LEARNER HISTORY ───────────────────────────────────────────────────────
//

/// Everything one learner has submitted, as fetched for a single evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerAnswers {
    pub learner_id: LearnerId,
    #[serde(default)]
    pub topic_answers: Vec<TopicAnswer>,
    #[serde(default)]
    pub mini_question_answers: Vec<MiniQuestionAnswer>,
}

impl LearnerAnswers {
    #[must_use]
    pub fn empty(learner_id: LearnerId) -> Self {
        Self {
            learner_id,
            topic_answers: Vec::new(),
            mini_question_answers: Vec::new(),
        }
    }

    /// The answer that decides a topic's status.
    ///
    /// An approved answer wins; otherwise the latest submission.
    #[must_use]
    pub fn topic_answer(&self, topic_id: TopicId) -> Option<&TopicAnswer> {
        let mut for_topic = self
            .topic_answers
            .iter()
            .filter(|a| a.topic_id == topic_id && a.learner_id == self.learner_id);
        let mut best: Option<&TopicAnswer> = for_topic.next();
        for answer in for_topic {
            best = match best {
                Some(current) if current.is_approved() => Some(current),
                Some(_) if answer.is_approved() => Some(answer),
                Some(current) if answer.submitted_at < current.submitted_at => Some(current),
                _ => Some(answer),
            };
        }
        best
    }

    #[must_use]
    pub fn has_answered_mini_question(&self, id: MiniQuestionId) -> bool {
        self.mini_question_answers
            .iter()
            .any(|a| a.mini_question_id == id && a.learner_id == self.learner_id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
