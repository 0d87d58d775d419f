mod answer;
mod authoring;
mod curriculum;
mod ids;
mod learner;
mod settings;
mod snapshot;

pub use ids::{AnswerId, LearnerId, MiniQuestionId, ModuleId, ParseIdError, SectionId, TopicId};

pub use answer::{
    AnswerDraft, AnswerError, LearnerAnswers, MiniQuestionAnswer, ReviewStatus, TopicAnswer,
};
pub use authoring::{
    MiniQuestionDraft, MiniQuestionError, ModuleDraft, ModuleError, SectionDraft, TopicDraft,
    TopicError, TopicRecords, ValidatedMiniQuestion, ValidatedSection, ValidatedTopic,
};
pub use curriculum::{
    ContentSection, Curriculum, EntityKind, MiniQuestion, Module, SkipReason, Skipped, Topic,
};
pub use learner::{Learner, LearnerError};
pub use settings::{EngineSettings, EngineSettingsDraft, SettingsError, TieBreak};
pub use snapshot::{
    CurriculumSnapshot, MiniQuestionRecord, ModuleRecord, SectionRecord, TopicRecord,
};
