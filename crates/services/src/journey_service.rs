use std::sync::Arc;

use journey_core::journey::{LearnerJourney, evaluate_learner};
use journey_core::model::{Curriculum, LearnerId};
use journey_core::progress::Progress;
use storage::repository::{AnswerRepository, CurriculumRepository, LearnerRepository, Storage};

use crate::Clock;
use crate::error::JourneyError;

/// Evaluates one learner's journey against the stored curriculum.
#[derive(Clone)]
pub struct JourneyService {
    clock: Clock,
    curriculum: Arc<dyn CurriculumRepository>,
    answers: Arc<dyn AnswerRepository>,
    learners: Arc<dyn LearnerRepository>,
}

impl JourneyService {
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

    /// Statuses, target topic and progress for one learner, evaluated now.
    ///
    /// # Errors
    ///
    /// Returns `JourneyError::UnknownLearner` if the learner is not registered.
    /// Returns `JourneyError::Storage` if repository access fails.
    pub async fn learner_journey(
        &self,
        learner_id: LearnerId,
    ) -> Result<LearnerJourney, JourneyError> {
        if self.learners.get_learner(learner_id).await?.is_none() {
            return Err(JourneyError::UnknownLearner(learner_id));
        }

        let now = self.clock.now();
        let snapshot = self.curriculum.snapshot().await?;
        let answers = self.answers.learner_answers(learner_id).await?;
        let curriculum = Curriculum::assemble(&snapshot);

        Ok(evaluate_learner(&curriculum, &answers, now))
    }

    /// Step count and denominator only.
    ///
    /// # Errors
    ///
    /// Same as [`JourneyService::learner_journey`].
    pub async fn progress(&self, learner_id: LearnerId) -> Result<Progress, JourneyError> {
        Ok(self.learner_journey(learner_id).await?.progress)
    }
}
