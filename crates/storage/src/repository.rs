use async_trait::async_trait;
use journey_core::model::{
    AnswerId, CurriculumSnapshot, Learner, LearnerAnswers, LearnerId, MiniQuestionAnswer,
    MiniQuestionId, ModuleId, ModuleRecord, SectionId, TopicAnswer, TopicId, TopicRecord,
    TopicRecords,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// First unused id of each curriculum entity, for allocating new rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextIds {
    pub module: ModuleId,
    pub topic: TopicId,
    pub section: SectionId,
    pub mini_question: MiniQuestionId,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for the curriculum tree.
#[async_trait]
pub trait CurriculumRepository: Send + Sync {
    /// Read every curriculum row at once.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be read.
    async fn snapshot(&self) -> Result<CurriculumSnapshot, StorageError>;

    /// Fetch a module by ID.
    ///
    /// Returns `Ok(None)` when the module does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn get_module(&self, id: ModuleId) -> Result<Option<ModuleRecord>, StorageError>;

    /// Persist or update a module row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the module cannot be stored.
    async fn upsert_module(&self, module: &ModuleRecord) -> Result<(), StorageError>;

    /// Fetch a topic row by ID.
    ///
    /// Returns `Ok(None)` when the topic does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn get_topic(&self, id: TopicId) -> Result<Option<TopicRecord>, StorageError>;

    /// List a module's topics ordered by number, then ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn list_topics(&self, module_id: ModuleId) -> Result<Vec<TopicRecord>, StorageError>;

    /// Update an existing topic row only, leaving its content untouched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the topic does not exist.
    async fn update_topic_row(&self, topic: &TopicRecord) -> Result<(), StorageError>;

    /// Store a topic together with its sections and mini-questions.
    ///
    /// Content previously stored under the topic is replaced.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the rows cannot be stored.
    async fn save_topic(&self, records: &TopicRecords) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn next_ids(&self) -> Result<NextIds, StorageError>;
}

/// Repository contract for learner submissions.
#[async_trait]
pub trait AnswerRepository: Send + Sync {
    /// Everything one learner has submitted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn learner_answers(&self, learner_id: LearnerId) -> Result<LearnerAnswers, StorageError>;

    /// Fetch a topic answer by ID.
    ///
    /// Returns `Ok(None)` when the answer does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn get_topic_answer(&self, id: AnswerId) -> Result<Option<TopicAnswer>, StorageError>;

    /// Insert a new topic answer; the stored ID is assigned by the repository
    /// and the one on `answer` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the answer cannot be stored.
    async fn insert_topic_answer(&self, answer: &TopicAnswer) -> Result<AnswerId, StorageError>;

    /// Overwrite a stored topic answer, e.g. after review.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no answer has this ID.
    async fn update_topic_answer(&self, answer: &TopicAnswer) -> Result<(), StorageError>;

    /// Store a mini-question answer, replacing the learner's earlier one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the answer cannot be stored.
    async fn upsert_mini_question_answer(
        &self,
        answer: &MiniQuestionAnswer,
    ) -> Result<(), StorageError>;
}

/// Repository contract for learners.
#[async_trait]
pub trait LearnerRepository: Send + Sync {
    /// All learners in the order they were registered.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn list_learners(&self) -> Result<Vec<Learner>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    async fn get_learner(&self, id: LearnerId) -> Result<Option<Learner>, StorageError>;

    /// Persist or update a learner, keeping its registration position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the learner cannot be stored.
    async fn upsert_learner(&self, learner: &Learner) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and snapshot files.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    curriculum: Arc<Mutex<CurriculumSnapshot>>,
    topic_answers: Arc<Mutex<Vec<TopicAnswer>>>,
    mini_question_answers: Arc<Mutex<Vec<MiniQuestionAnswer>>>,
    learners: Arc<Mutex<Vec<Learner>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-filled with curriculum rows.
    #[must_use]
    pub fn with_curriculum(snapshot: CurriculumSnapshot) -> Self {
        Self {
            curriculum: Arc::new(Mutex::new(snapshot)),
            ..Self::default()
        }
    }

    /// Replace all stored topic answers, keeping their IDs.
    pub(crate) fn replace_topic_answers(
        &self,
        answers: Vec<TopicAnswer>,
    ) -> Result<(), StorageError> {
        *lock(&self.topic_answers)? = answers;
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

/// One past the largest id in use, or 1 for an empty table.
///
/// An id space that is already exhausted is a `Conflict`.
fn next_id(ids: impl Iterator<Item = u64>) -> Result<u64, StorageError> {
    match ids.max() {
        None => Ok(1),
        Some(max) => max.checked_add(1).ok_or(StorageError::Conflict),
    }
}

#[async_trait]
impl CurriculumRepository for InMemoryRepository {
    async fn snapshot(&self) -> Result<CurriculumSnapshot, StorageError> {
        Ok(lock(&self.curriculum)?.clone())
    }

    async fn get_module(&self, id: ModuleId) -> Result<Option<ModuleRecord>, StorageError> {
        let guard = lock(&self.curriculum)?;
        Ok(guard.modules.iter().find(|m| m.id == id).cloned())
    }

    async fn upsert_module(&self, module: &ModuleRecord) -> Result<(), StorageError> {
        let mut guard = lock(&self.curriculum)?;
        match guard.modules.iter_mut().find(|m| m.id == module.id) {
            Some(existing) => *existing = module.clone(),
            None => guard.modules.push(module.clone()),
        }
        Ok(())
    }

    async fn get_topic(&self, id: TopicId) -> Result<Option<TopicRecord>, StorageError> {
        let guard = lock(&self.curriculum)?;
        Ok(guard.topics.iter().find(|t| t.id == id).cloned())
    }

    async fn list_topics(&self, module_id: ModuleId) -> Result<Vec<TopicRecord>, StorageError> {
        let guard = lock(&self.curriculum)?;
        let mut topics: Vec<_> = guard
            .topics
            .iter()
            .filter(|t| t.module_id == module_id)
            .cloned()
            .collect();
        topics.sort_by_key(|t| (t.number, t.id));
        Ok(topics)
    }

    async fn update_topic_row(&self, topic: &TopicRecord) -> Result<(), StorageError> {
        let mut guard = lock(&self.curriculum)?;
        let existing = guard
            .topics
            .iter_mut()
            .find(|t| t.id == topic.id)
            .ok_or(StorageError::NotFound)?;
        *existing = topic.clone();
        Ok(())
    }

    async fn save_topic(&self, records: &TopicRecords) -> Result<(), StorageError> {
        let mut guard = lock(&self.curriculum)?;
        let topic_id = records.topic.id;

        let old_sections: HashSet<SectionId> = guard
            .sections
            .iter()
            .filter(|s| s.topic_id == topic_id)
            .map(|s| s.id)
            .collect();
        guard.sections.retain(|s| s.topic_id != topic_id);
        guard
            .mini_questions
            .retain(|mq| !old_sections.contains(&mq.section_id));

        match guard.topics.iter_mut().find(|t| t.id == topic_id) {
            Some(existing) => *existing = records.topic.clone(),
            None => guard.topics.push(records.topic.clone()),
        }
        guard.sections.extend(records.sections.iter().cloned());
        guard
            .mini_questions
            .extend(records.mini_questions.iter().cloned());
        Ok(())
    }

    async fn next_ids(&self) -> Result<NextIds, StorageError> {
        let guard = lock(&self.curriculum)?;
        Ok(NextIds {
            module: ModuleId::new(next_id(guard.modules.iter().map(|m| m.id.value()))?),
            topic: TopicId::new(next_id(guard.topics.iter().map(|t| t.id.value()))?),
            section: SectionId::new(next_id(guard.sections.iter().map(|s| s.id.value()))?),
            mini_question: MiniQuestionId::new(next_id(
                guard.mini_questions.iter().map(|mq| mq.id.value()),
            )?),
        })
    }
}

#[async_trait]
impl AnswerRepository for InMemoryRepository {
    async fn learner_answers(&self, learner_id: LearnerId) -> Result<LearnerAnswers, StorageError> {
        let topic_answers = lock(&self.topic_answers)?
            .iter()
            .filter(|a| a.learner_id == learner_id)
            .cloned()
            .collect();
        let mini_question_answers = lock(&self.mini_question_answers)?
            .iter()
            .filter(|a| a.learner_id == learner_id)
            .cloned()
            .collect();
        Ok(LearnerAnswers {
            learner_id,
            topic_answers,
            mini_question_answers,
        })
    }

    async fn get_topic_answer(&self, id: AnswerId) -> Result<Option<TopicAnswer>, StorageError> {
        let guard = lock(&self.topic_answers)?;
        Ok(guard.iter().find(|a| a.id == id).cloned())
    }

    async fn insert_topic_answer(&self, answer: &TopicAnswer) -> Result<AnswerId, StorageError> {
        let mut guard = lock(&self.topic_answers)?;
        let id = AnswerId::new(next_id(guard.iter().map(|a| a.id.value()))?);
        let mut stored = answer.clone();
        stored.id = id;
        guard.push(stored);
        Ok(id)
    }

    async fn update_topic_answer(&self, answer: &TopicAnswer) -> Result<(), StorageError> {
        let mut guard = lock(&self.topic_answers)?;
        let existing = guard
            .iter_mut()
            .find(|a| a.id == answer.id)
            .ok_or(StorageError::NotFound)?;
        *existing = answer.clone();
        Ok(())
    }

    async fn upsert_mini_question_answer(
        &self,
        answer: &MiniQuestionAnswer,
    ) -> Result<(), StorageError> {
        let mut guard = lock(&self.mini_question_answers)?;
        match guard.iter_mut().find(|a| {
            a.learner_id == answer.learner_id && a.mini_question_id == answer.mini_question_id
        }) {
            Some(existing) => *existing = answer.clone(),
            None => guard.push(answer.clone()),
        }
        Ok(())
    }
}

#[async_trait]
impl LearnerRepository for InMemoryRepository {
    async fn list_learners(&self) -> Result<Vec<Learner>, StorageError> {
        Ok(lock(&self.learners)?.clone())
    }

    async fn get_learner(&self, id: LearnerId) -> Result<Option<Learner>, StorageError> {
        let guard = lock(&self.learners)?;
        Ok(guard.iter().find(|l| l.id() == id).cloned())
    }

    async fn upsert_learner(&self, learner: &Learner) -> Result<(), StorageError> {
        let mut guard = lock(&self.learners)?;
        match guard.iter_mut().find(|l| l.id() == learner.id()) {
            Some(existing) => *existing = learner.clone(),
            None => guard.push(learner.clone()),
        }
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub curriculum: Arc<dyn CurriculumRepository>,
    pub answers: Arc<dyn AnswerRepository>,
    pub learners: Arc<dyn LearnerRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    #[must_use]
    pub fn from_repository(repo: InMemoryRepository) -> Self {
        let curriculum: Arc<dyn CurriculumRepository> = Arc::new(repo.clone());
        let answers: Arc<dyn AnswerRepository> = Arc::new(repo.clone());
        let learners: Arc<dyn LearnerRepository> = Arc::new(repo);
        Self {
            curriculum,
            answers,
            learners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use journey_core::model::{
        AnswerDraft, MiniQuestionRecord, ReviewStatus, SectionRecord,
    };
    use journey_core::time::fixed_now;

    fn topic_records(topic: u64, sections: &[(u64, &[u64])]) -> TopicRecords {
        let topic_id = TopicId::new(topic);
        let mut out = TopicRecords {
            topic: TopicRecord::new(topic_id, ModuleId::new(1), 1, "Intro"),
            sections: Vec::new(),
            mini_questions: Vec::new(),
        };
        for (position, (section, minis)) in (0u32..).zip(sections) {
            let section_id = SectionId::new(*section);
            out.sections
                .push(SectionRecord::new(section_id, topic_id, position, "S"));
            for (mq_position, mq) in (0u32..).zip(*minis) {
                out.mini_questions.push(MiniQuestionRecord::new(
                    MiniQuestionId::new(*mq),
                    section_id,
                    mq_position,
                    "q",
                ));
            }
        }
        out
    }

    #[tokio::test]
    async fn save_topic_replaces_previous_content() {
        let repo = InMemoryRepository::new();
        repo.save_topic(&topic_records(1, &[(1, &[1, 2]), (2, &[3])]))
            .await
            .unwrap();
        repo.save_topic(&topic_records(1, &[(4, &[5])])).await.unwrap();

        let snapshot = repo.snapshot().await.unwrap();
        assert_eq!(snapshot.topics.len(), 1);
        let sections: Vec<_> = snapshot.sections.iter().map(|s| s.id.value()).collect();
        assert_eq!(sections, vec![4]);
        let minis: Vec<_> = snapshot.mini_questions.iter().map(|m| m.id.value()).collect();
        assert_eq!(minis, vec![5]);

        let next = repo.next_ids().await.unwrap();
        assert_eq!(next.module, ModuleId::new(1));
        assert_eq!(next.topic, TopicId::new(2));
        assert_eq!(next.section, SectionId::new(5));
        assert_eq!(next.mini_question, MiniQuestionId::new(6));
    }

    #[tokio::test]
    async fn exhausted_id_space_is_a_conflict() {
        let repo = InMemoryRepository::new();
        repo.save_topic(&topic_records(u64::MAX, &[])).await.unwrap();
        assert!(matches!(repo.next_ids().await, Err(StorageError::Conflict)));

        let mut answer = TopicAnswer::submit(
            AnswerId::new(u64::MAX),
            LearnerId::new(1),
            TopicId::new(1),
            AnswerDraft::new("work"),
            fixed_now(),
        )
        .unwrap();
        repo.replace_topic_answers(vec![answer.clone()]).unwrap();
        answer.id = AnswerId::new(0);
        assert!(matches!(
            repo.insert_topic_answer(&answer).await,
            Err(StorageError::Conflict)
        ));
    }

    #[tokio::test]
    async fn update_topic_row_requires_existing_topic() {
        let repo = InMemoryRepository::new();
        let row = TopicRecord::new(TopicId::new(9), ModuleId::new(1), 1, "Missing");
        assert!(matches!(
            repo.update_topic_row(&row).await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_update_persists_review() {
        let repo = InMemoryRepository::new();
        let draft = TopicAnswer::submit(
            AnswerId::new(0),
            LearnerId::new(1),
            TopicId::new(1),
            AnswerDraft::new("work"),
            fixed_now(),
        )
        .unwrap();
        let first = repo.insert_topic_answer(&draft).await.unwrap();
        let second = repo.insert_topic_answer(&draft).await.unwrap();
        assert_eq!((first.value(), second.value()), (1, 2));

        let mut stored = repo.get_topic_answer(first).await.unwrap().unwrap();
        stored.review(ReviewStatus::Approved, fixed_now()).unwrap();
        repo.update_topic_answer(&stored).await.unwrap();

        let answers = repo.learner_answers(LearnerId::new(1)).await.unwrap();
        assert_eq!(answers.topic_answers.len(), 2);
        assert!(answers.topic_answers[0].is_approved());
        assert!(repo
            .learner_answers(LearnerId::new(2))
            .await
            .unwrap()
            .topic_answers
            .is_empty());
    }

    #[tokio::test]
    async fn mini_question_answer_resubmission_replaces() {
        let repo = InMemoryRepository::new();
        for content in ["first", "second"] {
            let answer = MiniQuestionAnswer::submit(
                LearnerId::new(1),
                MiniQuestionId::new(3),
                AnswerDraft::new(content),
                fixed_now(),
            )
            .unwrap();
            repo.upsert_mini_question_answer(&answer).await.unwrap();
        }

        let answers = repo.learner_answers(LearnerId::new(1)).await.unwrap();
        assert_eq!(answers.mini_question_answers.len(), 1);
        assert_eq!(answers.mini_question_answers[0].content, "second");
    }

    #[tokio::test]
    async fn learners_keep_registration_order() {
        let storage = Storage::in_memory();
        for (id, name) in [(3, "Cleo"), (1, "Ada"), (3, "Cleo B.")] {
            storage
                .learners
                .upsert_learner(&Learner::new(LearnerId::new(id), name).unwrap())
                .await
                .unwrap();
        }

        let learners = storage.learners.list_learners().await.unwrap();
        let names: Vec<_> = learners.iter().map(Learner::name).collect();
        assert_eq!(names, vec!["Cleo B.", "Ada"]);
        assert!(storage
            .learners
            .get_learner(LearnerId::new(2))
            .await
            .unwrap()
            .is_none());
    }
}
