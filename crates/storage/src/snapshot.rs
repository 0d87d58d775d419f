//! JSON snapshot files: a full curriculum plus learners and their answers.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use journey_core::model::{
    AnswerId, CurriculumSnapshot, Learner, LearnerError, LearnerId, MiniQuestionAnswer,
    TopicAnswer,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::legacy::{LegacyTopicAnswer, migrate};
use crate::repository::{
    AnswerRepository, InMemoryRepository, LearnerRepository, Storage, StorageError,
};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SnapshotError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid snapshot JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("learner {id}: {source}")]
    Learner {
        id: LearnerId,
        #[source]
        source: LearnerError,
    },
    #[error("answer id {0} appears more than once")]
    DuplicateAnswer(AnswerId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnerRecord {
    pub id: LearnerId,
    pub name: String,
}

/// On-disk shape of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub curriculum: CurriculumSnapshot,
    #[serde(default)]
    pub learners: Vec<LearnerRecord>,
    #[serde(default)]
    pub topic_answers: Vec<TopicAnswer>,
    #[serde(default)]
    pub mini_question_answers: Vec<MiniQuestionAnswer>,
    /// Answers from older exports, keyed by module and question number.
    #[serde(default)]
    pub legacy_topic_answers: Vec<LegacyTopicAnswer>,
}

/// What a load actually stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub learners: usize,
    pub topic_answers: usize,
    pub mini_question_answers: usize,
    pub legacy_migrated: usize,
    pub legacy_unmatched: usize,
}

impl SnapshotFile {
    /// # Errors
    ///
    /// Returns `SnapshotError::Parse` if the JSON does not match the snapshot shape.
    pub fn from_json(json: &str) -> Result<Self, SnapshotError> {
        Ok(serde_json::from_str(json)?)
    }

    /// # Errors
    ///
    /// Returns `SnapshotError::Io` if the file cannot be read, or
    /// `SnapshotError::Parse` if its content is not a snapshot.
    pub fn read(path: &Path) -> Result<Self, SnapshotError> {
        let json = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Seed an in-memory repository and wrap it as `Storage`.
    ///
    /// Legacy answers are resolved to topic IDs first; those that match no
    /// single topic are dropped and counted.
    ///
    /// # Errors
    ///
    /// Returns `SnapshotError` if a learner is invalid, an answer ID repeats,
    /// or the repository rejects a write.
    pub async fn into_storage(self) -> Result<(Storage, LoadReport), SnapshotError> {
        let mut report = LoadReport::default();
        let migration = migrate(&self.curriculum, self.legacy_topic_answers);
        report.legacy_migrated = migration.answers.len();
        report.legacy_unmatched = migration.unmatched.len();

        let mut seen = HashSet::new();
        if let Some(dup) = self.topic_answers.iter().find(|a| !seen.insert(a.id)) {
            return Err(SnapshotError::DuplicateAnswer(dup.id));
        }

        let repo = InMemoryRepository::with_curriculum(self.curriculum);

        for record in self.learners {
            let learner = Learner::new(record.id, record.name).map_err(|source| {
                SnapshotError::Learner {
                    id: record.id,
                    source,
                }
            })?;
            repo.upsert_learner(&learner).await?;
            report.learners += 1;
        }

        report.topic_answers = self.topic_answers.len();
        repo.replace_topic_answers(self.topic_answers)?;
        for answer in &migration.answers {
            repo.insert_topic_answer(answer).await?;
        }

        for answer in &self.mini_question_answers {
            repo.upsert_mini_question_answer(answer).await?;
        }
        report.mini_question_answers = self.mini_question_answers.len();

        tracing::debug!(?report, "loaded snapshot");
        Ok((Storage::from_repository(repo), report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "curriculum": {
            "modules": [{ "id": 1, "number": 1, "title": "Basics", "is_released": true }],
            "topics": [
                { "id": 10, "module_id": 1, "number": 1, "title": "Intro", "is_released": true }
            ]
        },
        "learners": [{ "id": 1, "name": "Ada" }, { "id": 2, "name": "Grace" }],
        "topic_answers": [{
            "id": 7, "learner_id": 1, "topic_id": 10, "content": "done",
            "submitted_at": "2025-03-01T09:00:00Z", "status": "approved"
        }],
        "legacy_topic_answers": [
            { "learner_id": 2, "module_number": 1, "question_number": 1,
              "content": "old", "submitted_at": "2024-03-01T09:00:00Z" },
            { "learner_id": 2, "module_number": 4, "question_number": 1,
              "content": "lost", "submitted_at": "2024-03-01T09:00:00Z" }
        ]
    }"#;

    #[tokio::test]
    async fn loads_learners_answers_and_legacy_rows() {
        let (storage, report) = SnapshotFile::from_json(SAMPLE)
            .unwrap()
            .into_storage()
            .await
            .unwrap();

        assert_eq!(report.learners, 2);
        assert_eq!(report.topic_answers, 1);
        assert_eq!((report.legacy_migrated, report.legacy_unmatched), (1, 1));

        let ada = storage.answers.learner_answers(LearnerId::new(1)).await.unwrap();
        assert_eq!(ada.topic_answers[0].id, AnswerId::new(7));

        let grace = storage.answers.learner_answers(LearnerId::new(2)).await.unwrap();
        assert_eq!(grace.topic_answers.len(), 1);
        assert_eq!(grace.topic_answers[0].id, AnswerId::new(8));
        assert_eq!(grace.topic_answers[0].topic_id.value(), 10);
    }

    #[tokio::test]
    async fn blank_learner_name_is_rejected() {
        let file = SnapshotFile {
            learners: vec![LearnerRecord {
                id: LearnerId::new(3),
                name: "  ".into(),
            }],
            ..SnapshotFile::default()
        };
        let err = file.into_storage().await.err().unwrap();
        assert!(matches!(err, SnapshotError::Learner { .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            SnapshotFile::from_json("{ not json"),
            Err(SnapshotError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = SnapshotFile::read(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
