use std::collections::HashSet;
use std::sync::Arc;

use journey_core::model::{
    CurriculumSnapshot, Curriculum, EngineSettings, MiniQuestionId, ModuleDraft, ModuleId,
    SectionId, TopicDraft, TopicId, ValidatedTopic,
};
use journey_core::temporal::{
    DeadlineCheck, TopicDeadlineConflict, deadline_conflicts, validate_deadline_with_format,
};
use storage::repository::{CurriculumRepository, Storage, StorageError};

use crate::error::AuthoringError;

/// Administrator mutations of the curriculum.
///
/// Deadline conflicts are returned as errors and never corrected here.
#[derive(Clone)]
pub struct AuthoringService {
    settings: EngineSettings,
    curriculum: Arc<dyn CurriculumRepository>,
}

impl AuthoringService {
    #[must_use]
    pub fn new(settings: EngineSettings, curriculum: Arc<dyn CurriculumRepository>) -> Self {
        Self {
            settings,
            curriculum,
        }
    }

    #[must_use]
    pub fn from_storage(settings: EngineSettings, storage: &Storage) -> Self {
        Self::new(settings, Arc::clone(&storage.curriculum))
    }

    /// Inline form check; does not touch storage.
    #[must_use]
    pub fn check_topic_deadline(&self, draft: &TopicDraft) -> DeadlineCheck {
        validate_deadline_with_format(draft.deadline, &draft.sections, self.settings.date_format())
    }

    /// Read-time flags for stored topics that already violate the deadline rule.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::Storage` if repository access fails.
    pub async fn deadline_conflicts(&self) -> Result<Vec<TopicDeadlineConflict>, AuthoringError> {
        let snapshot = self.curriculum.snapshot().await?;
        let conflicts =
            deadline_conflicts(&Curriculum::assemble(&snapshot), self.settings.date_format());
        if !conflicts.is_empty() {
            tracing::warn!(count = conflicts.len(), "stored topics have deadline conflicts");
        }
        Ok(conflicts)
    }

    /// # Errors
    ///
    /// Returns `AuthoringError::Module` for validation failures.
    /// Returns `AuthoringError::Storage` if persistence fails.
    pub async fn create_module(&self, draft: ModuleDraft) -> Result<ModuleId, AuthoringError> {
        let id = self.curriculum.next_ids().await?.module;
        let record = draft.validate(id)?;
        self.curriculum.upsert_module(&record).await?;
        tracing::info!(module_id = %id, number = ?record.number, "created module");
        Ok(id)
    }

    /// Validate and store a new topic with its sections and mini-questions.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::Topic` for validation failures, deadline
    /// conflicts included.
    /// Returns `AuthoringError::ModuleNotFound` or `ModuleNotReleased` when the
    /// parent module is missing or hidden while the topic asks to be released.
    /// Returns `AuthoringError::DuplicateTopicNumber` if another topic in the
    /// module already uses the number.
    /// Returns `AuthoringError::Storage` if persistence fails, including an
    /// exhausted id space.
    pub async fn create_topic(&self, draft: TopicDraft) -> Result<TopicId, AuthoringError> {
        let snapshot = self.curriculum.snapshot().await?;
        let validated = self.validate_topic(&snapshot, None, draft)?;
        let topic_id = self.curriculum.next_ids().await?.topic;
        self.store_topic(&snapshot, topic_id, validated).await?;
        tracing::info!(topic_id = %topic_id, "created topic");
        Ok(topic_id)
    }

    /// Replace a topic and its content.
    ///
    /// Sections and mini-questions keep their IDs when the draft carries IDs
    /// that already belong to this topic; anything else gets a fresh ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::TopicNotFound` if the topic does not exist,
    /// otherwise the same errors as [`AuthoringService::create_topic`].
    pub async fn update_topic(
        &self,
        topic_id: TopicId,
        draft: TopicDraft,
    ) -> Result<(), AuthoringError> {
        let snapshot = self.curriculum.snapshot().await?;
        if !snapshot.topics.iter().any(|t| t.id == topic_id) {
            return Err(AuthoringError::TopicNotFound(topic_id));
        }
        let validated = self.validate_topic(&snapshot, Some(topic_id), draft)?;
        self.store_topic(&snapshot, topic_id, validated).await?;
        tracing::info!(topic_id = %topic_id, "updated topic");
        Ok(())
    }

    /// Toggle a module. Turning it off also turns off every topic under it.
    ///
    /// Returns the topics that were unreleased by the cascade.
    ///
    /// # Errors
    ///
    /// Returns `AuthoringError::ModuleNotFound` if the module does not exist.
    /// Returns `AuthoringError::Storage` if persistence fails.
    pub async fn set_module_released(
        &self,
        module_id: ModuleId,
        released: bool,
    ) -> Result<Vec<TopicId>, AuthoringError> {
        let mut module = self
            .curriculum
            .get_module(module_id)
            .await?
            .ok_or(AuthoringError::ModuleNotFound(module_id))?;
        module.is_released = released;
        self.curriculum.upsert_module(&module).await?;

        let mut cascaded = Vec::new();
        if !released {
            for mut topic in self.curriculum.list_topics(module_id).await? {
                if topic.is_released {
                    topic.is_released = false;
                    self.curriculum.update_topic_row(&topic).await?;
                    cascaded.push(topic.id);
                }
            }
        }
        tracing::info!(
            module_id = %module_id,
            released,
            cascaded = cascaded.len(),
            "changed module release"
        );
        Ok(cascaded)
    }

    /// # Errors
    ///
    /// Returns `AuthoringError::TopicNotFound` if the topic does not exist.
    /// Returns `AuthoringError::ModuleNotReleased` when releasing a topic whose
    /// module is not released.
    /// Returns `AuthoringError::Storage` if persistence fails.
    pub async fn set_topic_released(
        &self,
        topic_id: TopicId,
        released: bool,
    ) -> Result<(), AuthoringError> {
        let mut topic = self
            .curriculum
            .get_topic(topic_id)
            .await?
            .ok_or(AuthoringError::TopicNotFound(topic_id))?;

        if released {
            let module_released = self
                .curriculum
                .get_module(topic.module_id)
                .await?
                .is_some_and(|m| m.is_released);
            if !module_released {
                return Err(AuthoringError::ModuleNotReleased(topic.module_id));
            }
        }

        topic.is_released = released;
        self.curriculum.update_topic_row(&topic).await?;
        tracing::info!(topic_id = %topic_id, released, "changed topic release");
        Ok(())
    }

    /// `editing` is the topic being replaced, which may keep its own number.
    fn validate_topic(
        &self,
        snapshot: &CurriculumSnapshot,
        editing: Option<TopicId>,
        draft: TopicDraft,
    ) -> Result<ValidatedTopic, AuthoringError> {
        let module = snapshot
            .modules
            .iter()
            .find(|m| m.id == draft.module_id)
            .ok_or(AuthoringError::ModuleNotFound(draft.module_id))?;
        if let Some(existing) = snapshot.topics.iter().find(|t| {
            t.module_id == draft.module_id
                && t.number == Some(draft.number)
                && Some(t.id) != editing
        }) {
            return Err(AuthoringError::DuplicateTopicNumber {
                module_id: draft.module_id,
                number: draft.number,
                existing: existing.id,
            });
        }
        let validated = draft.validate(self.settings.date_format())?;
        if validated.is_released && !module.is_released {
            return Err(AuthoringError::ModuleNotReleased(module.id));
        }
        Ok(validated)
    }

    async fn store_topic(
        &self,
        snapshot: &CurriculumSnapshot,
        topic_id: TopicId,
        mut validated: ValidatedTopic,
    ) -> Result<(), AuthoringError> {
        detach_foreign_ids(snapshot, topic_id, &mut validated);

        let next = self.curriculum.next_ids().await?;
        let fresh_sections = validated.sections.iter().filter(|s| s.id.is_none()).count();
        let fresh_minis = validated
            .sections
            .iter()
            .flat_map(|s| &s.mini_questions)
            .filter(|mq| mq.id.is_none())
            .count();
        let mut section_seq = next.section.value();
        let mut mini_seq = next.mini_question.value();
        // Both counters must stay representable through their last increment.
        if section_seq.checked_add(fresh_sections as u64).is_none()
            || mini_seq.checked_add(fresh_minis as u64).is_none()
        {
            return Err(StorageError::Conflict.into());
        }
        let records = validated.into_records(
            topic_id,
            || {
                let id = SectionId::new(section_seq);
                section_seq += 1;
                id
            },
            || {
                let id = MiniQuestionId::new(mini_seq);
                mini_seq += 1;
                id
            },
        );
        self.curriculum.save_topic(&records).await?;
        Ok(())
    }
}

/// Clears section and mini-question IDs that do not already belong to
/// `topic_id`, so a draft can never take over another topic's rows.
fn detach_foreign_ids(
    snapshot: &CurriculumSnapshot,
    topic_id: TopicId,
    topic: &mut ValidatedTopic,
) {
    let owned_sections: HashSet<SectionId> = snapshot
        .sections
        .iter()
        .filter(|s| s.topic_id == topic_id)
        .map(|s| s.id)
        .collect();
    let owned_minis: HashSet<MiniQuestionId> = snapshot
        .mini_questions
        .iter()
        .filter(|mq| owned_sections.contains(&mq.section_id))
        .map(|mq| mq.id)
        .collect();

    let mut used_sections = HashSet::new();
    let mut used_minis = HashSet::new();
    for section in &mut topic.sections {
        section.id = section
            .id
            .filter(|id| owned_sections.contains(id) && used_sections.insert(*id));
        for mq in &mut section.mini_questions {
            mq.id = mq
                .id
                .filter(|id| owned_minis.contains(id) && used_minis.insert(*id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{Duration, TimeZone, Utc};
    use journey_core::model::{
        MiniQuestionDraft, ModuleRecord, SectionDraft, TopicError, TopicRecord,
    };
    use storage::repository::InMemoryRepository;

    fn storage(module_released: bool) -> Storage {
        Storage::from_repository(InMemoryRepository::with_curriculum(CurriculumSnapshot {
            modules: vec![
                ModuleRecord::new(ModuleId::new(1), 1, "Basics").released(module_released),
            ],
            ..CurriculumSnapshot::default()
        }))
    }

    fn draft(deadline_day: u32, release_day: u32) -> TopicDraft {
        let at = |d| Utc.with_ymd_and_hms(2025, 6, d, 0, 0, 0).unwrap();
        TopicDraft {
            deadline: Some(at(deadline_day)),
            sections: vec![SectionDraft {
                title: "Read".into(),
                mini_questions: vec![MiniQuestionDraft {
                    title: "Warm-up".into(),
                    release_at: Some(at(release_day)),
                    is_released: true,
                    ..MiniQuestionDraft::default()
                }],
                ..SectionDraft::default()
            }],
            ..TopicDraft::new(ModuleId::new(1), 1, "Intro")
        }
    }

    #[tokio::test]
    async fn deadline_conflict_blocks_create() {
        let storage = storage(true);
        let service = AuthoringService::from_storage(EngineSettings::default(), &storage);

        let check = service.check_topic_deadline(&draft(1, 2));
        assert!(!check.valid);
        assert_eq!(check.conflicting_sections, vec![0]);

        let err = service.create_topic(draft(1, 2)).await.unwrap_err();
        assert!(matches!(
            err,
            AuthoringError::Topic(TopicError::DeadlineConflict { .. })
        ));
        assert!(storage.curriculum.snapshot().await.unwrap().topics.is_empty());

        let id = service.create_topic(draft(1, 1)).await.unwrap();
        let snapshot = storage.curriculum.snapshot().await.unwrap();
        assert_eq!(snapshot.topics[0].id, id);
        assert_eq!(snapshot.sections.len(), 1);
        assert_eq!(snapshot.mini_questions.len(), 1);
    }

    #[tokio::test]
    async fn update_keeps_owned_ids_and_replaces_content() {
        let storage = storage(true);
        let service = AuthoringService::from_storage(EngineSettings::default(), &storage);
        let id = service.create_topic(draft(3, 1)).await.unwrap();
        let before = storage.curriculum.snapshot().await.unwrap();
        let mq_id = before.mini_questions[0].id;
        let section_id = before.sections[0].id;

        let mut edited = draft(3, 2);
        edited.sections[0].id = Some(section_id);
        edited.sections[0].mini_questions[0].id = Some(mq_id);
        edited.sections[0].mini_questions.push(MiniQuestionDraft {
            id: Some(MiniQuestionId::new(999)),
            title: "Extra".into(),
            ..MiniQuestionDraft::default()
        });
        service.update_topic(id, edited).await.unwrap();

        let after = storage.curriculum.snapshot().await.unwrap();
        assert_eq!(after.sections[0].id, section_id);
        let ids: Vec<_> = after.mini_questions.iter().map(|m| m.id).collect();
        assert_eq!(ids.len(), 2);
        assert_eq!(ids[0], mq_id);
        assert_ne!(ids[1], MiniQuestionId::new(999));

        let missing = service.update_topic(TopicId::new(77), draft(3, 1)).await;
        assert!(matches!(missing, Err(AuthoringError::TopicNotFound(_))));
    }

    #[tokio::test]
    async fn releasing_topic_requires_released_module() {
        let storage = storage(false);
        let service = AuthoringService::from_storage(EngineSettings::default(), &storage);
        let id = service.create_topic(draft(3, 1)).await.unwrap();

        let err = service.set_topic_released(id, true).await.unwrap_err();
        assert!(matches!(err, AuthoringError::ModuleNotReleased(m) if m == ModuleId::new(1)));

        let mut released = draft(3, 1);
        released.number = 2;
        released.is_released = true;
        assert!(matches!(
            service.create_topic(released).await,
            Err(AuthoringError::ModuleNotReleased(_))
        ));
    }

    #[tokio::test]
    async fn topic_numbers_are_unique_within_a_module() {
        let storage = storage(true);
        let service = AuthoringService::from_storage(EngineSettings::default(), &storage);
        let first = service.create_topic(draft(3, 1)).await.unwrap();

        let err = service.create_topic(draft(3, 1)).await.unwrap_err();
        assert!(matches!(
            err,
            AuthoringError::DuplicateTopicNumber { number: 1, existing, .. } if existing == first
        ));
        assert_eq!(storage.curriculum.snapshot().await.unwrap().topics.len(), 1);

        // Editing a topic may keep its number but not take another's.
        service.update_topic(first, draft(4, 1)).await.unwrap();
        let second = service
            .create_topic(TopicDraft {
                number: 2,
                ..draft(3, 1)
            })
            .await
            .unwrap();
        assert!(matches!(
            service.update_topic(second, draft(3, 1)).await,
            Err(AuthoringError::DuplicateTopicNumber { .. })
        ));
    }

    #[tokio::test]
    async fn exhausted_section_ids_fail_without_writing() {
        let storage = storage(true);
        storage
            .curriculum
            .save_topic(&journey_core::model::TopicRecords {
                topic: TopicRecord::new(TopicId::new(5), ModuleId::new(1), 9, "Full"),
                sections: vec![journey_core::model::SectionRecord::new(
                    SectionId::new(u64::MAX - 1),
                    TopicId::new(5),
                    0,
                    "S",
                )],
                mini_questions: Vec::new(),
            })
            .await
            .unwrap();
        let service = AuthoringService::from_storage(EngineSettings::default(), &storage);

        let err = service.create_topic(draft(3, 1)).await.unwrap_err();
        assert!(matches!(err, AuthoringError::Storage(StorageError::Conflict)));
        assert_eq!(storage.curriculum.snapshot().await.unwrap().topics.len(), 1);
    }

    #[tokio::test]
    async fn unreleasing_module_cascades_to_topics() {
        let storage = storage(true);
        let service = AuthoringService::from_storage(EngineSettings::default(), &storage);
        let first = service.create_topic(draft(3, 1)).await.unwrap();
        let second = service
            .create_topic(TopicDraft {
                number: 2,
                ..draft(3, 1)
            })
            .await
            .unwrap();
        service.set_topic_released(first, true).await.unwrap();
        service.set_topic_released(second, true).await.unwrap();

        let cascaded = service
            .set_module_released(ModuleId::new(1), false)
            .await
            .unwrap();
        assert_eq!(cascaded.len(), 2);
        let snapshot = storage.curriculum.snapshot().await.unwrap();
        assert!(snapshot.topics.iter().all(|t| !t.is_released));
        assert!(!snapshot.modules[0].is_released);
    }

    #[tokio::test]
    async fn stored_conflicts_are_flagged_on_read() {
        let deadline = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let storage = storage(true);
        storage
            .curriculum
            .save_topic(&journey_core::model::TopicRecords {
                topic: TopicRecord::new(TopicId::new(5), ModuleId::new(1), 1, "Old")
                    .with_deadline(deadline),
                sections: vec![journey_core::model::SectionRecord::new(
                    SectionId::new(1),
                    TopicId::new(5),
                    0,
                    "S",
                )],
                mini_questions: vec![journey_core::model::MiniQuestionRecord::new(
                    MiniQuestionId::new(1),
                    SectionId::new(1),
                    0,
                    "late",
                )
                .release_at(deadline + Duration::days(1))],
            })
            .await
            .unwrap();

        let service = AuthoringService::from_storage(EngineSettings::default(), &storage);
        let conflicts = service.deadline_conflicts().await.unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].topic_id, TopicId::new(5));
        assert!(conflicts[0].check.message.as_deref().unwrap().contains("2025-06-01"));

        let module = service.create_module(ModuleDraft {
            number: 2,
            title: "Next".into(),
            deadline: None,
            is_released: false,
        });
        assert_eq!(module.await.unwrap(), ModuleId::new(2));
    }
}
