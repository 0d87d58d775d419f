use std::sync::Arc;

use journey_core::model::Curriculum;
use journey_core::overview::{TopicOverview, overview};
use storage::repository::{AnswerRepository, CurriculumRepository, LearnerRepository, Storage};

use crate::Clock;
use crate::error::JourneyError;

/// Cohort statistics for the grading dashboard.
#[derive(Clone)]
pub struct OverviewService {
    clock: Clock,
    curriculum: Arc<dyn CurriculumRepository>,
    answers: Arc<dyn AnswerRepository>,
    learners: Arc<dyn LearnerRepository>,
}

impl OverviewService {
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

    /// # Errors
    ///
    /// Returns `JourneyError::Storage` if repository access fails.
    pub async fn overview(&self) -> Result<Vec<TopicOverview>, JourneyError> {
        let now = self.clock.now();
        let snapshot = self.curriculum.snapshot().await?;
        let mut cohort = Vec::new();
        for learner in self.learners.list_learners().await? {
            cohort.push(self.answers.learner_answers(learner.id()).await?);
        }

        Ok(overview(&Curriculum::assemble(&snapshot), &cohort, now))
    }
}
