//! Per-learner topic status resolution.
//!
//! Statuses are recomputed on every evaluation; nothing here is stored.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregation, MiniQuestionCounts, MiniQuestionView};
use crate::model::{
    AnswerId, Curriculum, LearnerAnswers, MiniQuestionId, Module, ModuleId, ReviewStatus, Topic,
    TopicId,
};

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicStatus {
    /// Module or topic unreleased; omitted from learner listings.
    NotVisible,
    /// Locked until every gating mini-question is answered.
    #[serde(alias = "locked")]
    MiniQuestionsRequired,
    Available,
    /// Answer pending review, or rejected.
    Submitted,
    /// Answer approved. Counts as one step.
    Completed,
}

impl TopicStatus {
    #[must_use]
    pub fn is_visible(self) -> bool {
        self != TopicStatus::NotVisible
    }

    #[must_use]
    pub fn is_locked(self) -> bool {
        self == TopicStatus::MiniQuestionsRequired
    }
}

/// Why a topic is still locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LockReason {
    pub completed: usize,
    pub total: usize,
    /// Gating mini-questions not released yet.
    pub not_yet_released: usize,
}

impl fmt::Display for LockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "answer all mini-questions to unlock this topic ({} of {} done)",
            self.completed, self.total
        )?;
        if self.not_yet_released > 0 {
            write!(
                f,
                "; {} more will be released later",
                self.not_yet_released
            )?;
        }
        Ok(())
    }
}

/// Mini-question progress of one learner within one topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MiniQuestionProgress {
    pub current: usize,
    pub future: usize,
    pub completed_current: usize,
    pub completed_all: usize,
}

impl MiniQuestionProgress {
    #[must_use]
    pub fn total_all(&self) -> usize {
        self.current + self.future
    }
}

/// One topic as seen by one learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedTopic {
    pub topic_id: TopicId,
    pub module_id: ModuleId,
    pub module_number: u32,
    pub topic_number: u32,
    pub title: String,
    pub deadline: Option<DateTime<Utc>>,
    pub points: u32,
    pub bonus_points: u32,
    pub status: TopicStatus,
    pub mini_questions: MiniQuestionProgress,
    pub lock: Option<LockReason>,
    pub answer_id: Option<AnswerId>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ResolvedTopic {
    #[must_use]
    pub fn order_key(&self) -> (u32, u32) {
        (self.module_number, self.topic_number)
    }
}

//
// ─── RESOLUTION ────────────────────────────────────────────────────────────────
//

/// Resolves one topic for one learner.
///
/// Priority: visibility, then an existing answer, then outstanding
/// mini-questions (future ones included), then available.
#[must_use]
pub fn resolve_topic(
    module: &Module,
    topic: &Topic,
    counts: &MiniQuestionCounts,
    answers: &LearnerAnswers,
) -> ResolvedTopic {
    let mut resolved = ResolvedTopic {
        topic_id: topic.id,
        module_id: module.id,
        module_number: module.number,
        topic_number: topic.number,
        title: topic.title.clone(),
        deadline: topic.deadline,
        points: topic.points,
        bonus_points: topic.bonus_points,
        status: TopicStatus::NotVisible,
        mini_questions: MiniQuestionProgress::default(),
        lock: None,
        answer_id: None,
        completed_at: None,
    };

    if !module.shows(topic) {
        return resolved;
    }

    let answered = |ids: &[MiniQuestionId]| {
        ids.iter()
            .filter(|&&id| answers.has_answered_mini_question(id))
            .count()
    };
    let completed_current = answered(&counts.current);
    let completed_all = completed_current + answered(&counts.future);
    resolved.mini_questions = MiniQuestionProgress {
        current: counts.total_current(),
        future: counts.total_future(),
        completed_current,
        completed_all,
    };

    if let Some(answer) = answers.topic_answer(topic.id) {
        resolved.answer_id = Some(answer.id);
        resolved.status = match answer.status {
            ReviewStatus::Approved => {
                resolved.completed_at = answer.completed_at();
                TopicStatus::Completed
            }
            ReviewStatus::Pending | ReviewStatus::Rejected => TopicStatus::Submitted,
        };
        return resolved;
    }

    let total_all = counts.total_all();
    if total_all > 0 && completed_all < total_all {
        resolved.status = TopicStatus::MiniQuestionsRequired;
        resolved.lock = Some(LockReason {
            completed: completed_all,
            total: total_all,
            not_yet_released: counts.total_future(),
        });
        return resolved;
    }

    resolved.status = TopicStatus::Available;
    resolved
}

/// Resolves every topic of the curriculum, in progression order.
#[must_use]
pub fn resolve_topics(
    curriculum: &Curriculum,
    aggregation: &Aggregation,
    answers: &LearnerAnswers,
) -> Vec<ResolvedTopic> {
    curriculum
        .topics()
        .map(|(module, topic)| resolve_topic(module, topic, &aggregation.counts(topic.id), answers))
        .collect()
}

/// The single topic offered for submission: the first `Available` one by
/// (module number, topic number). Later available topics are ignored.
#[must_use]
pub fn target_topic(resolved: &[ResolvedTopic]) -> Option<&ResolvedTopic> {
    resolved
        .iter()
        .filter(|t| t.status == TopicStatus::Available)
        .min_by_key(|t| t.order_key())
}

//
// ─── MINI-QUESTION STATUS ──────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MiniQuestionStatus {
    Open,
    Answered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedMiniQuestion {
    #[serde(flatten)]
    pub view: MiniQuestionView,
    pub status: MiniQuestionStatus,
}

/// Status of every visible mini-question for one learner.
#[must_use]
pub fn resolve_mini_questions(
    aggregation: &Aggregation,
    answers: &LearnerAnswers,
) -> Vec<ResolvedMiniQuestion> {
    aggregation
        .views()
        .iter()
        .map(|view| ResolvedMiniQuestion {
            status: if answers.has_answered_mini_question(view.id) {
                MiniQuestionStatus::Answered
            } else {
                MiniQuestionStatus::Open
            },
            view: view.clone(),
        })
        .collect()
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
