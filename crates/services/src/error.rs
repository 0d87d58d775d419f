//! Shared error types for the services crate.

use thiserror::Error;

use journey_core::model::{
    AnswerError, AnswerId, LearnerId, MiniQuestionId, ModuleError, ModuleId, TopicError, TopicId,
};
use storage::repository::StorageError;

/// Errors emitted by the read-side services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JourneyError {
    #[error("unknown learner {0}")]
    UnknownLearner(LearnerId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AuthoringService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuthoringError {
    #[error("module {0} not found")]
    ModuleNotFound(ModuleId),
    #[error("topic {0} not found")]
    TopicNotFound(TopicId),
    #[error("module {0} is not released; release it before its topics")]
    ModuleNotReleased(ModuleId),
    #[error("module {module_id} already has topic {number} ({existing})")]
    DuplicateTopicNumber {
        module_id: ModuleId,
        number: u32,
        existing: TopicId,
    },
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error(transparent)]
    Topic(#[from] TopicError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SubmissionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SubmissionError {
    #[error("unknown learner {0}")]
    UnknownLearner(LearnerId),
    #[error("topic {topic_id} is not open for submission")]
    NotTargetTopic {
        topic_id: TopicId,
        target: Option<TopicId>,
    },
    #[error("mini-question {0} is not visible")]
    MiniQuestionNotVisible(MiniQuestionId),
    #[error("answer {0} not found")]
    AnswerNotFound(AnswerId),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
