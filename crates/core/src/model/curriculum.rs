use std::collections::{HashMap, HashSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::ids::{MiniQuestionId, ModuleId, SectionId, TopicId};
use crate::model::snapshot::{
    CurriculumSnapshot, MiniQuestionRecord, ModuleRecord, SectionRecord, TopicRecord,
};

//
// ─── TREE ──────────────────────────────────────────────────────────────────────
//

/// A self-learning activity nested under a content section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiniQuestion {
    pub id: MiniQuestionId,
    pub title: String,
    pub prompt: String,
    pub resource_url: Option<String>,
    pub release_at: Option<DateTime<Utc>>,
    pub is_released: bool,
    pub position: u32,
}

impl MiniQuestion {
    /// Visible to learners: flagged released AND its release instant has arrived.
    #[must_use]
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        self.is_released && crate::time::has_arrived(self.release_at, now)
    }

    /// Scheduled for later; counts as "more coming" whatever its flag says.
    #[must_use]
    pub fn is_future_at(&self, now: DateTime<Utc>) -> bool {
        crate::time::is_future(self.release_at, now)
    }
}

/// Learning material grouping under a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSection {
    pub id: SectionId,
    pub title: String,
    pub material: String,
    pub position: u32,
    pub mini_questions: Vec<MiniQuestion>,
}

/// A gradeable main assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: TopicId,
    pub module_id: ModuleId,
    pub number: u32,
    pub title: String,
    pub body: String,
    pub deadline: Option<DateTime<Utc>>,
    pub points: u32,
    pub bonus_points: u32,
    pub is_released: bool,
    pub sections: Vec<ContentSection>,
}

impl Topic {
    pub fn mini_questions(&self) -> impl Iterator<Item = (usize, &MiniQuestion)> {
        self.sections
            .iter()
            .enumerate()
            .flat_map(|(idx, section)| section.mini_questions.iter().map(move |mq| (idx, mq)))
    }
}

/// Top-level curriculum grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub id: ModuleId,
    pub number: u32,
    pub title: String,
    pub is_released: bool,
    pub deadline: Option<DateTime<Utc>>,
    pub topics: Vec<Topic>,
}

impl Module {
    /// Effective topic visibility: the module flag AND the topic flag.
    #[must_use]
    pub fn shows(&self, topic: &Topic) -> bool {
        self.is_released && topic.is_released
    }
}

//
// ─── SKIPPED RECORDS ───────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Module,
    Topic,
    Section,
    MiniQuestion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    MissingNumber,
    DanglingParent,
    DuplicateId,
    DuplicateNumber,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingNumber => write!(f, "missing sequence number"),
            SkipReason::DanglingParent => write!(f, "parent does not exist"),
            SkipReason::DuplicateId => write!(f, "duplicate id"),
            SkipReason::DuplicateNumber => write!(f, "sequence number already used in module"),
        }
    }
}

/// A snapshot row left out of the assembled tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Skipped {
    pub kind: EntityKind,
    pub id: u64,
    pub reason: SkipReason,
}

//
// ─── CURRICULUM ────────────────────────────────────────────────────────────────
//

/// Ordered curriculum tree assembled from a flat snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Curriculum {
    modules: Vec<Module>,
    skipped: Vec<Skipped>,
}

impl Curriculum {
    /// Builds the ordered tree, dropping malformed rows.
    ///
    /// Never fails: a module or topic without a number, a row whose parent is
    /// missing (or was itself dropped), repeated ids and a topic number reused
    /// within its module are all recorded in `skipped()` and logged.
    #[must_use]
    pub fn assemble(snapshot: &CurriculumSnapshot) -> Self {
        let mut skipped = Vec::new();

        let mut mini_by_section: HashMap<SectionId, Vec<&MiniQuestionRecord>> = HashMap::new();
        let mut seen_mini = HashSet::new();
        for mq in &snapshot.mini_questions {
            if !seen_mini.insert(mq.id) {
                let id = mq.id.value();
                skip(&mut skipped, EntityKind::MiniQuestion, id, SkipReason::DuplicateId);
                continue;
            }
            mini_by_section.entry(mq.section_id).or_default().push(mq);
        }

        let mut sections_by_topic: HashMap<TopicId, Vec<&SectionRecord>> = HashMap::new();
        let mut seen_sections = HashSet::new();
        for section in &snapshot.sections {
            if !seen_sections.insert(section.id) {
                let id = section.id.value();
                skip(&mut skipped, EntityKind::Section, id, SkipReason::DuplicateId);
                continue;
            }
            sections_by_topic.entry(section.topic_id).or_default().push(section);
        }

        let mut topics_by_module: HashMap<ModuleId, Vec<&TopicRecord>> = HashMap::new();
        let mut seen_topics = HashSet::new();
        for topic in &snapshot.topics {
            if !seen_topics.insert(topic.id) {
                skip(&mut skipped, EntityKind::Topic, topic.id.value(), SkipReason::DuplicateId);
                continue;
            }
            topics_by_module.entry(topic.module_id).or_default().push(topic);
        }

        let mut modules = Vec::with_capacity(snapshot.modules.len());
        let mut seen_modules = HashSet::new();
        for record in &snapshot.modules {
            if !seen_modules.insert(record.id) {
                skip(&mut skipped, EntityKind::Module, record.id.value(), SkipReason::DuplicateId);
                continue;
            }
            let Some(number) = record.number else {
                let id = record.id.value();
                skip(&mut skipped, EntityKind::Module, id, SkipReason::MissingNumber);
                continue;
            };
            let topic_rows = topics_by_module.remove(&record.id).unwrap_or_default();
            let topics = topic_rows
                .into_iter()
                .filter_map(|row| {
                    build_topic(row, &mut sections_by_topic, &mut mini_by_section, &mut skipped)
                })
                .collect();
            modules.push(build_module(record, number, topics, &mut skipped));
        }

        // Whatever is still grouped has no surviving parent.
        for rows in topics_by_module.into_values() {
            for row in rows {
                skip(&mut skipped, EntityKind::Topic, row.id.value(), SkipReason::DanglingParent);
            }
        }
        for rows in sections_by_topic.into_values() {
            for row in rows {
                skip(&mut skipped, EntityKind::Section, row.id.value(), SkipReason::DanglingParent);
            }
        }
        for rows in mini_by_section.into_values() {
            for row in rows {
                skip(
                    &mut skipped,
                    EntityKind::MiniQuestion,
                    row.id.value(),
                    SkipReason::DanglingParent,
                );
            }
        }

        modules.sort_by_key(|m| (m.number, m.id));
        skipped.sort_by_key(|s| (s.kind as u8, s.id));

        Self { modules, skipped }
    }

    #[must_use]
    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    #[must_use]
    pub fn skipped(&self) -> &[Skipped] {
        &self.skipped
    }

    /// All topics in progression order, paired with their module.
    pub fn topics(&self) -> impl Iterator<Item = (&Module, &Topic)> {
        self.modules
            .iter()
            .flat_map(|module| module.topics.iter().map(move |topic| (module, topic)))
    }

    /// Topics a learner can see: module and topic both released.
    pub fn visible_topics(&self) -> impl Iterator<Item = (&Module, &Topic)> {
        self.topics().filter(|(module, topic)| module.shows(topic))
    }

    #[must_use]
    pub fn find_topic(&self, id: TopicId) -> Option<(&Module, &Topic)> {
        self.topics().find(|(_, topic)| topic.id == id)
    }

    #[must_use]
    pub fn find_mini_question(
        &self,
        id: MiniQuestionId,
    ) -> Option<(&Module, &Topic, &MiniQuestion)> {
        self.topics().find_map(|(module, topic)| {
            topic
                .mini_questions()
                .find(|(_, mq)| mq.id == id)
                .map(|(_, mq)| (module, topic, mq))
        })
    }

    #[must_use]
    pub fn contains_topic(&self, id: TopicId) -> bool {
        self.find_topic(id).is_some()
    }

    #[must_use]
    pub fn contains_mini_question(&self, id: MiniQuestionId) -> bool {
        self.find_mini_question(id).is_some()
    }
}

fn skip(skipped: &mut Vec<Skipped>, kind: EntityKind, id: u64, reason: SkipReason) {
    tracing::warn!(?kind, id, %reason, "skipping malformed curriculum record");
    skipped.push(Skipped { kind, id, reason });
}

fn build_module(
    record: &ModuleRecord,
    number: u32,
    mut topics: Vec<Topic>,
    skipped: &mut Vec<Skipped>,
) -> Module {
    topics.sort_by_key(|t| (t.number, t.id));
    // The lowest id keeps a contested number.
    let mut taken = HashSet::new();
    topics.retain(|topic| {
        if taken.insert(topic.number) {
            return true;
        }
        skip(skipped, EntityKind::Topic, topic.id.value(), SkipReason::DuplicateNumber);
        false
    });
    Module {
        id: record.id,
        number,
        title: record.title.clone(),
        is_released: record.is_released,
        deadline: record.deadline,
        topics,
    }
}

fn build_topic(
    row: &TopicRecord,
    sections_by_topic: &mut HashMap<TopicId, Vec<&SectionRecord>>,
    mini_by_section: &mut HashMap<SectionId, Vec<&MiniQuestionRecord>>,
    skipped: &mut Vec<Skipped>,
) -> Option<Topic> {
    let Some(number) = row.number else {
        skip(skipped, EntityKind::Topic, row.id.value(), SkipReason::MissingNumber);
        return None;
    };

    let mut section_rows = sections_by_topic.remove(&row.id).unwrap_or_default();
    section_rows.sort_by_key(|s| (s.position, s.id));
    let sections = section_rows
        .into_iter()
        .map(|section| {
            let mut mini_rows = mini_by_section.remove(&section.id).unwrap_or_default();
            mini_rows.sort_by_key(|mq| (mq.position, mq.id));
            ContentSection {
                id: section.id,
                title: section.title.clone(),
                material: section.material.clone(),
                position: section.position,
                mini_questions: mini_rows.into_iter().map(build_mini_question).collect(),
            }
        })
        .collect();

    Some(Topic {
        id: row.id,
        module_id: row.module_id,
        number,
        title: row.title.clone(),
        body: row.body.clone(),
        deadline: row.deadline,
        points: row.points,
        bonus_points: row.bonus_points,
        is_released: row.is_released,
        sections,
    })
}

fn build_mini_question(row: &MiniQuestionRecord) -> MiniQuestion {
    MiniQuestion {
        id: row.id,
        title: row.title.clone(),
        prompt: row.prompt.clone(),
        resource_url: row.resource_url.clone(),
        release_at: row.release_at,
        is_released: row.is_released,
        position: row.position,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
