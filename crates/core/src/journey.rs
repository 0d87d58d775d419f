//! The composed read path for one learner.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::aggregate::{Aggregation, aggregate};
use crate::eligibility::{
    ResolvedMiniQuestion, ResolvedTopic, TopicStatus, resolve_mini_questions, resolve_topics,
    target_topic,
};
use crate::model::{Curriculum, LearnerAnswers, LearnerId, TopicId};
use crate::progress::{Progress, compute_progress};

/// Everything the learner view renders, computed for one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnerJourney {
    pub learner_id: LearnerId,
    pub evaluated_at: DateTime<Utc>,
    /// Every topic in progression order, hidden ones included. Only visible
    /// topics are serialized.
    #[serde(serialize_with = "serialize_visible")]
    pub topics: Vec<ResolvedTopic>,
    pub target: Option<TopicId>,
    pub progress: Progress,
    pub mini_questions: Vec<ResolvedMiniQuestion>,
    /// Answers referencing topics or mini-questions that no longer exist.
    pub orphaned_answers: usize,
}

impl LearnerJourney {
    /// Topics the learner may see.
    pub fn visible_topics(&self) -> impl Iterator<Item = &ResolvedTopic> {
        self.topics.iter().filter(|t| t.status.is_visible())
    }

    #[must_use]
    pub fn topic(&self, id: TopicId) -> Option<&ResolvedTopic> {
        self.topics.iter().find(|t| t.topic_id == id)
    }

    #[must_use]
    pub fn status_of(&self, id: TopicId) -> TopicStatus {
        self.topic(id).map_or(TopicStatus::NotVisible, |t| t.status)
    }

    /// When the most recent approved step was reached.
    #[must_use]
    pub fn last_completed_at(&self) -> Option<DateTime<Utc>> {
        self.topics
            .iter()
            .filter(|t| t.status == TopicStatus::Completed)
            .filter_map(|t| t.completed_at)
            .max()
    }
}

/// Evaluates one learner against a curriculum at `now`.
#[must_use]
pub fn evaluate_learner(
    curriculum: &Curriculum,
    answers: &LearnerAnswers,
    now: DateTime<Utc>,
) -> LearnerJourney {
    let aggregation = aggregate(curriculum, now);
    evaluate_with(curriculum, &aggregation, answers, now)
}

/// Evaluates many learners against one aggregation of the curriculum.
#[must_use]
pub fn evaluate_cohort(
    curriculum: &Curriculum,
    cohort: &[LearnerAnswers],
    now: DateTime<Utc>,
) -> Vec<LearnerJourney> {
    let aggregation = aggregate(curriculum, now);
    cohort
        .iter()
        .map(|answers| evaluate_with(curriculum, &aggregation, answers, now))
        .collect()
}

fn evaluate_with(
    curriculum: &Curriculum,
    aggregation: &Aggregation,
    answers: &LearnerAnswers,
    now: DateTime<Utc>,
) -> LearnerJourney {
    let topics = resolve_topics(curriculum, aggregation, answers);
    let target = target_topic(&topics).map(|t| t.topic_id);
    let progress = compute_progress(&topics);
    let mini_questions = resolve_mini_questions(aggregation, answers);
    let orphaned_answers = count_orphans(curriculum, answers);

    if orphaned_answers > 0 {
        tracing::warn!(
            learner_id = %answers.learner_id,
            orphaned_answers,
            "ignoring answers that match no known topic or mini-question"
        );
    }
    tracing::debug!(
        learner_id = %answers.learner_id,
        current_step = progress.current_step,
        total_steps = progress.total_steps,
        target = ?target,
        "evaluated learner journey"
    );

    LearnerJourney {
        learner_id: answers.learner_id,
        evaluated_at: now,
        topics,
        target,
        progress,
        mini_questions,
        orphaned_answers,
    }
}

fn serialize_visible<S: Serializer>(topics: &[ResolvedTopic], s: S) -> Result<S::Ok, S::Error> {
    s.collect_seq(topics.iter().filter(|t| t.status.is_visible()))
}

fn count_orphans(curriculum: &Curriculum, answers: &LearnerAnswers) -> usize {
    let topic_orphans = answers
        .topic_answers
        .iter()
        .filter(|a| !curriculum.contains_topic(a.topic_id))
        .count();
    let mini_orphans = answers
        .mini_question_answers
        .iter()
        .filter(|a| !curriculum.contains_mini_question(a.mini_question_id))
        .count();
    topic_orphans + mini_orphans
}
