use std::sync::Arc;

use journey_core::journey::evaluate_cohort;
use journey_core::leaderboard::{LeaderboardEntry, RankedLearner, rank};
use journey_core::model::{Curriculum, EngineSettings};
use storage::repository::{AnswerRepository, CurriculumRepository, LearnerRepository, Storage};

use crate::Clock;
use crate::error::JourneyError;

/// Ranks every registered learner by completed steps.
#[derive(Clone)]
pub struct LeaderboardService {
    clock: Clock,
    settings: EngineSettings,
    curriculum: Arc<dyn CurriculumRepository>,
    answers: Arc<dyn AnswerRepository>,
    learners: Arc<dyn LearnerRepository>,
}

impl LeaderboardService {
    #[must_use]
    pub fn new(
        clock: Clock,
        settings: EngineSettings,
        curriculum: Arc<dyn CurriculumRepository>,
        answers: Arc<dyn AnswerRepository>,
        learners: Arc<dyn LearnerRepository>,
    ) -> Self {
        Self {
            clock,
            settings,
            curriculum,
            answers,
            learners,
        }
    }

    #[must_use]
    pub fn from_storage(clock: Clock, settings: EngineSettings, storage: &Storage) -> Self {
        Self::new(
            clock,
            settings,
            Arc::clone(&storage.curriculum),
            Arc::clone(&storage.answers),
            Arc::clone(&storage.learners),
        )
    }

    /// The ranked board, capped at the configured limit.
    ///
    /// All learners are evaluated against one snapshot read at one instant.
    ///
    /// # Errors
    ///
    /// Returns `JourneyError::Storage` if repository access fails.
    pub async fn leaderboard(&self) -> Result<Vec<RankedLearner>, JourneyError> {
        let now = self.clock.now();
        let snapshot = self.curriculum.snapshot().await?;
        let learners = self.learners.list_learners().await?;

        let mut cohort = Vec::with_capacity(learners.len());
        for learner in &learners {
            cohort.push(self.answers.learner_answers(learner.id()).await?);
        }

        let curriculum = Curriculum::assemble(&snapshot);
        let journeys = evaluate_cohort(&curriculum, &cohort, now);
        let entries = learners
            .iter()
            .zip(&journeys)
            .map(|(learner, journey)| LeaderboardEntry::from_journey(learner, journey))
            .collect();

        let mut ranked = rank(entries, self.settings.tie_break());
        if let Some(limit) = self.settings.leaderboard_limit() {
            ranked.truncate(limit);
        }
        tracing::debug!(learners = learners.len(), rows = ranked.len(), "ranked leaderboard");
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use journey_core::model::{
        AnswerDraft, AnswerId, CurriculumSnapshot, EngineSettingsDraft, Learner, LearnerId,
        ModuleId, ModuleRecord, ReviewStatus, TieBreak, TopicAnswer, TopicId, TopicRecord,
    };
    use journey_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    async fn seeded() -> Storage {
        let storage = Storage::from_repository(InMemoryRepository::with_curriculum(
            CurriculumSnapshot {
                modules: vec![ModuleRecord::new(ModuleId::new(1), 1, "Basics").released(true)],
                topics: vec![
                    TopicRecord::new(TopicId::new(1), ModuleId::new(1), 1, "One").released(true),
                    TopicRecord::new(TopicId::new(2), ModuleId::new(1), 2, "Two").released(true),
                ],
                ..CurriculumSnapshot::default()
            },
        ));

        // (learner, approved topics, hours after fixed_now of the approval)
        let plan: [(u64, &str, &[u64], i64); 3] = [
            (1, "Ada", &[1], 5),
            (2, "Grace", &[1, 2], 9),
            (3, "Linus", &[1], 2),
        ];
        for (id, name, topics, hours) in plan {
            let learner_id = LearnerId::new(id);
            storage
                .learners
                .upsert_learner(&Learner::new(learner_id, name).unwrap())
                .await
                .unwrap();
            for topic in topics {
                let mut answer = TopicAnswer::submit(
                    AnswerId::new(0),
                    learner_id,
                    TopicId::new(*topic),
                    AnswerDraft::new("work"),
                    fixed_now(),
                )
                .unwrap();
                answer
                    .review(ReviewStatus::Approved, fixed_now() + chrono::Duration::hours(hours))
                    .unwrap();
                storage.answers.insert_topic_answer(&answer).await.unwrap();
            }
        }
        storage
    }

    fn ids(board: &[RankedLearner]) -> Vec<(u64, usize)> {
        board
            .iter()
            .map(|r| (r.entry.learner_id.value(), r.rank))
            .collect()
    }

    #[tokio::test]
    async fn earliest_completion_orders_ties() {
        let storage = seeded().await;
        let service =
            LeaderboardService::from_storage(fixed_clock(), EngineSettings::default(), &storage);
        let board = service.leaderboard().await.unwrap();
        assert_eq!(ids(&board), vec![(2, 1), (3, 2), (1, 2)]);
        assert_eq!(board[0].entry.name, "Grace");
    }

    #[tokio::test]
    async fn fetch_order_and_limit_from_settings() {
        let settings = EngineSettingsDraft {
            tie_break: Some(TieBreak::FetchOrder),
            leaderboard_limit: Some(2),
            ..EngineSettingsDraft::default()
        }
        .validate()
        .unwrap();
        let service = LeaderboardService::from_storage(fixed_clock(), settings, &seeded().await);
        let board = service.leaderboard().await.unwrap();
        assert_eq!(ids(&board), vec![(2, 1), (1, 2)]);
    }
}
