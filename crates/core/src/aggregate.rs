use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{Curriculum, MiniQuestionId, SectionId, TopicId};

/// A currently visible mini-question with a back-reference to its topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MiniQuestionView {
    pub id: MiniQuestionId,
    pub title: String,
    pub prompt: String,
    pub resource_url: Option<String>,
    pub release_at: Option<DateTime<Utc>>,
    pub module_number: u32,
    pub topic_id: TopicId,
    pub topic_number: u32,
    pub topic_title: String,
    pub section_id: SectionId,
    pub section_index: usize,
}

/// Mini-questions that gate one topic, in curriculum order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MiniQuestionCounts {
    /// Released and already due.
    pub current: Vec<MiniQuestionId>,
    /// Scheduled after `now`, whatever their released flag says.
    pub future: Vec<MiniQuestionId>,
}

impl MiniQuestionCounts {
    #[must_use]
    pub fn total_current(&self) -> usize {
        self.current.len()
    }

    #[must_use]
    pub fn total_future(&self) -> usize {
        self.future.len()
    }

    #[must_use]
    pub fn total_all(&self) -> usize {
        self.current.len() + self.future.len()
    }

    #[must_use]
    pub fn has_future(&self) -> bool {
        !self.future.is_empty()
    }

    /// Every mini-question the topic waits on, visible or not.
    pub fn gating(&self) -> impl Iterator<Item = MiniQuestionId> + '_ {
        self.current.iter().chain(&self.future).copied()
    }
}

/// Result of flattening the curriculum tree at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregation {
    views: Vec<MiniQuestionView>,
    counts: HashMap<TopicId, MiniQuestionCounts>,
}

impl Aggregation {
    /// Visible mini-questions in curriculum order.
    #[must_use]
    pub fn views(&self) -> &[MiniQuestionView] {
        &self.views
    }

    /// Counts for a visible topic; empty for anything else.
    #[must_use]
    pub fn counts(&self, topic_id: TopicId) -> MiniQuestionCounts {
        self.counts.get(&topic_id).cloned().unwrap_or_default()
    }
}

/// Walks released modules → released topics → sections → mini-questions.
///
/// A mini-question is listed only when flagged released AND due at `now`.
/// Mini-questions scheduled after `now` are counted as `future` for their
/// topic even if not yet flagged, so the topic stays gated until they exist
/// and are answered.
#[must_use]
pub fn aggregate(curriculum: &Curriculum, now: DateTime<Utc>) -> Aggregation {
    let mut views = Vec::new();
    let mut counts = HashMap::new();

    for (module, topic) in curriculum.visible_topics() {
        let mut topic_counts = MiniQuestionCounts::default();
        for (section_index, section) in topic.sections.iter().enumerate() {
            for mq in &section.mini_questions {
                if mq.is_visible_at(now) {
                    topic_counts.current.push(mq.id);
                    views.push(MiniQuestionView {
                        id: mq.id,
                        title: mq.title.clone(),
                        prompt: mq.prompt.clone(),
                        resource_url: mq.resource_url.clone(),
                        release_at: mq.release_at,
                        module_number: module.number,
                        topic_id: topic.id,
                        topic_number: topic.number,
                        topic_title: topic.title.clone(),
                        section_id: section.id,
                        section_index,
                    });
                } else if mq.is_future_at(now) {
                    topic_counts.future.push(mq.id);
                }
            }
        }
        counts.insert(topic.id, topic_counts);
    }

    Aggregation {
        views,
        counts,
    }
}
