//! Deadline vs. release-date consistency.
//!
//! A topic's deadline must not precede the release instant of any
//! mini-question nested under it. The check is pure: the authoring layer uses
//! it to block a create/update, and read paths use it to flag stored topics
//! that already violate the rule.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{ContentSection, Curriculum, ModuleId, TopicId};
use crate::time::{DEFAULT_DATE_FORMAT, format_instant};

/// Anything that groups mini-questions with release instants.
pub trait ScheduledSection {
    fn release_dates(&self) -> impl Iterator<Item = Option<DateTime<Utc>>> + '_;
}

impl ScheduledSection for ContentSection {
    fn release_dates(&self) -> impl Iterator<Item = Option<DateTime<Utc>>> + '_ {
        self.mini_questions.iter().map(|mq| mq.release_at)
    }
}

/// Outcome of a deadline check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadlineCheck {
    pub valid: bool,
    /// Indices of the sections holding a conflicting mini-question, ascending.
    pub conflicting_sections: Vec<usize>,
    pub message: Option<String>,
}

impl DeadlineCheck {
    fn ok() -> Self {
        Self {
            valid: true,
            conflicting_sections: Vec::new(),
            message: None,
        }
    }
}

/// Single pair check. Equal instants are allowed; a missing date never conflicts.
#[must_use]
pub fn release_date_ok(
    topic_deadline: Option<DateTime<Utc>>,
    mini_release: Option<DateTime<Utc>>,
) -> bool {
    match (topic_deadline, mini_release) {
        (Some(deadline), Some(release)) => release <= deadline,
        _ => true,
    }
}

/// Checks every mini-question across `sections` against `topic_deadline`.
#[must_use]
pub fn validate_deadline<S: ScheduledSection>(
    topic_deadline: Option<DateTime<Utc>>,
    sections: &[S],
) -> DeadlineCheck {
    validate_deadline_with_format(topic_deadline, sections, DEFAULT_DATE_FORMAT)
}

/// Same as [`validate_deadline`], quoting dates with `date_format`.
#[must_use]
pub fn validate_deadline_with_format<S: ScheduledSection>(
    topic_deadline: Option<DateTime<Utc>>,
    sections: &[S],
    date_format: &str,
) -> DeadlineCheck {
    let Some(deadline) = topic_deadline else {
        return DeadlineCheck::ok();
    };

    let mut conflicting_sections = Vec::new();
    let mut first: Option<(usize, DateTime<Utc>)> = None;
    for (idx, section) in sections.iter().enumerate() {
        for release in section.release_dates() {
            if release_date_ok(Some(deadline), release) {
                continue;
            }
            if conflicting_sections.last() != Some(&idx) {
                conflicting_sections.push(idx);
            }
            if first.is_none() {
                first = release.map(|at| (idx, at));
            }
        }
    }

    match first {
        None => DeadlineCheck::ok(),
        Some((idx, release)) => DeadlineCheck {
            valid: false,
            conflicting_sections,
            message: Some(format!(
                "the topic deadline ({}) is earlier than the release date ({}) of a mini-question in content section {}",
                format_instant(deadline, date_format),
                format_instant(release, date_format),
                idx + 1
            )),
        },
    }
}

/// A stored topic whose deadline precedes one of its mini-question releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicDeadlineConflict {
    pub module_id: ModuleId,
    pub module_number: u32,
    pub topic_id: TopicId,
    pub topic_number: u32,
    pub check: DeadlineCheck,
}

/// Read-time flagging of every topic in the curriculum, released or not.
#[must_use]
pub fn deadline_conflicts(
    curriculum: &Curriculum,
    date_format: &str,
) -> Vec<TopicDeadlineConflict> {
    curriculum
        .topics()
        .filter_map(|(module, topic)| {
            let check = validate_deadline_with_format(topic.deadline, &topic.sections, date_format);
            (!check.valid).then(|| TopicDeadlineConflict {
                module_id: module.id,
                module_number: module.number,
                topic_id: topic.id,
                topic_number: topic.number,
                check,
            })
        })
        .collect()
}
