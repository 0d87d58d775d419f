use std::sync::Arc;

use journey_core::aggregate::aggregate;
use journey_core::journey::evaluate_learner;
use journey_core::model::{
    AnswerDraft, AnswerId, Curriculum, LearnerId, MiniQuestionAnswer, MiniQuestionId,
    ReviewStatus, TopicAnswer, TopicId,
};
use storage::repository::{AnswerRepository, CurriculumRepository, LearnerRepository, Storage};

use crate::Clock;
use crate::error::SubmissionError;

/// Learner submissions and administrator reviews.
#[derive(Clone)]
pub struct SubmissionService {
    clock: Clock,
    curriculum: Arc<dyn CurriculumRepository>,
    answers: Arc<dyn AnswerRepository>,
    learners: Arc<dyn LearnerRepository>,
}

impl SubmissionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        curriculum: Arc<dyn CurriculumRepository>,
        answers: Arc<dyn AnswerRepository>,
        learners: Arc<dyn LearnerRepository>,
    ) -> Self {
        Self {
            clock,
            curriculum,
            answers,
            learners,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, storage: &Storage) -> Self {
        Self::new(
            clock,
            Arc::clone(&storage.curriculum),
            Arc::clone(&storage.answers),
            Arc::clone(&storage.learners),
        )
    }

    /// Submit the main assignment of the learner's current target topic.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::NotTargetTopic` unless `topic_id` is the
    /// learner's target right now.
    /// Returns `SubmissionError::Answer` if the content is blank.
    /// Returns `SubmissionError::UnknownLearner` or `Storage` otherwise.
    pub async fn submit_topic_answer(
        &self,
        learner_id: LearnerId,
        topic_id: TopicId,
        draft: AnswerDraft,
    ) -> Result<AnswerId, SubmissionError> {
        self.ensure_learner(learner_id).await?;
        let now = self.clock.now();
        let snapshot = self.curriculum.snapshot().await?;
        let answers = self.answers.learner_answers(learner_id).await?;

        let journey = evaluate_learner(&Curriculum::assemble(&snapshot), &answers, now);
        if journey.target != Some(topic_id) {
            return Err(SubmissionError::NotTargetTopic {
                topic_id,
                target: journey.target,
            });
        }

        let answer = TopicAnswer::submit(AnswerId::new(0), learner_id, topic_id, draft, now)?;
        let answer_id = self.answers.insert_topic_answer(&answer).await?;
        tracing::info!(
            learner_id = %learner_id,
            topic_id = %topic_id,
            answer_id = %answer_id,
            "submitted topic answer"
        );
        Ok(answer_id)
    }

    /// Answer a visible mini-question. A second submission replaces the first.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::MiniQuestionNotVisible` if the mini-question
    /// is unknown, unreleased or scheduled later.
    /// Returns `SubmissionError::Answer` if the content is blank.
    /// Returns `SubmissionError::UnknownLearner` or `Storage` otherwise.
    pub async fn submit_mini_question_answer(
        &self,
        learner_id: LearnerId,
        mini_question_id: MiniQuestionId,
        draft: AnswerDraft,
    ) -> Result<(), SubmissionError> {
        self.ensure_learner(learner_id).await?;
        let now = self.clock.now();
        let snapshot = self.curriculum.snapshot().await?;

        let aggregation = aggregate(&Curriculum::assemble(&snapshot), now);
        if !aggregation.views().iter().any(|v| v.id == mini_question_id) {
            return Err(SubmissionError::MiniQuestionNotVisible(mini_question_id));
        }

        let answer = MiniQuestionAnswer::submit(learner_id, mini_question_id, draft, now)?;
        self.answers.upsert_mini_question_answer(&answer).await?;
        tracing::info!(
            learner_id = %learner_id,
            mini_question_id = %mini_question_id,
            "submitted mini-question answer"
        );
        Ok(())
    }

    /// Approve or reject a topic answer.
    ///
    /// # Errors
    ///
    /// Returns `SubmissionError::AnswerNotFound` if no answer has this ID.
    /// Returns `SubmissionError::Answer` if `status` is `Pending`.
    /// Returns `SubmissionError::Storage` if persistence fails.
    pub async fn review_topic_answer(
        &self,
        answer_id: AnswerId,
        status: ReviewStatus,
    ) -> Result<TopicAnswer, SubmissionError> {
        let mut answer = self
            .answers
            .get_topic_answer(answer_id)
            .await?
            .ok_or(SubmissionError::AnswerNotFound(answer_id))?;
        answer.review(status, self.clock.now())?;
        self.answers.update_topic_answer(&answer).await?;
        tracing::info!(answer_id = %answer_id, ?status, "reviewed topic answer");
        Ok(answer)
    }

    async fn ensure_learner(&self, learner_id: LearnerId) -> Result<(), SubmissionError> {
        match self.learners.get_learner(learner_id).await? {
            Some(_) => Ok(()),
            None => Err(SubmissionError::UnknownLearner(learner_id)),
        }
    }
}
