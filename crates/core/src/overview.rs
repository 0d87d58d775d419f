use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::aggregate::aggregate;
use crate::eligibility::{TopicStatus, resolve_topic};
use crate::model::{Curriculum, LearnerAnswers, ReviewStatus, TopicId};

/// Cohort-wide counters for one visible topic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopicOverview {
    pub topic_id: TopicId,
    pub module_number: u32,
    pub topic_number: u32,
    pub title: String,
    pub completed: usize,
    pub submitted: usize,
    pub available: usize,
    pub locked: usize,
    /// Learners whose deciding answer still waits for review.
    pub pending_reviews: usize,
    pub current_mini_questions: usize,
    pub future_mini_questions: usize,
}

impl TopicOverview {
    #[must_use]
    pub fn learners(&self) -> usize {
        self.completed + self.submitted + self.available + self.locked
    }
}

/// Status counts for every visible topic, in progression order.
#[must_use]
pub fn overview(
    curriculum: &Curriculum,
    cohort: &[LearnerAnswers],
    now: DateTime<Utc>,
) -> Vec<TopicOverview> {
    let aggregation = aggregate(curriculum, now);

    curriculum
        .visible_topics()
        .map(|(module, topic)| {
            let counts = aggregation.counts(topic.id);
            let mut row = TopicOverview {
                topic_id: topic.id,
                module_number: module.number,
                topic_number: topic.number,
                title: topic.title.clone(),
                current_mini_questions: counts.total_current(),
                future_mini_questions: counts.total_future(),
                ..TopicOverview::default()
            };

            for answers in cohort {
                match resolve_topic(module, topic, &counts, answers).status {
                    TopicStatus::Completed => row.completed += 1,
                    TopicStatus::Submitted => row.submitted += 1,
                    TopicStatus::Available => row.available += 1,
                    TopicStatus::MiniQuestionsRequired => row.locked += 1,
                    TopicStatus::NotVisible => {}
                }
                if answers
                    .topic_answer(topic.id)
                    .is_some_and(|a| a.status == ReviewStatus::Pending)
                {
                    row.pending_reviews += 1;
                }
            }
            row
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AnswerDraft, AnswerId, CurriculumSnapshot, LearnerId, MiniQuestionAnswer, MiniQuestionId,
        MiniQuestionRecord, ModuleId, ModuleRecord, SectionId, SectionRecord, TopicAnswer,
        TopicRecord,
    };
    use crate::time::fixed_now;
    use chrono::Duration;

    fn curriculum() -> Curriculum {
        Curriculum::assemble(&CurriculumSnapshot {
            modules: vec![
                ModuleRecord::new(ModuleId::new(1), 1, "Basics").released(true),
                ModuleRecord::new(ModuleId::new(2), 2, "Later"),
            ],
            topics: vec![
                TopicRecord::new(TopicId::new(10), ModuleId::new(1), 1, "Intro").released(true),
                TopicRecord::new(TopicId::new(20), ModuleId::new(2), 1, "Hidden").released(true),
            ],
            sections: vec![SectionRecord::new(SectionId::new(1), TopicId::new(10), 0, "S")],
            mini_questions: vec![
                MiniQuestionRecord::new(MiniQuestionId::new(1), SectionId::new(1), 0, "a")
                    .release_at(fixed_now() - Duration::days(1))
                    .released(true),
            ],
        })
    }

    fn learner(id: u64, mini: bool, topic: Option<ReviewStatus>) -> LearnerAnswers {
        let learner_id = LearnerId::new(id);
        let mut answers = LearnerAnswers::empty(learner_id);
        if mini {
            answers.mini_question_answers.push(
                MiniQuestionAnswer::submit(
                    learner_id,
                    MiniQuestionId::new(1),
                    AnswerDraft::new("link"),
                    fixed_now(),
                )
                .unwrap(),
            );
        }
        if let Some(status) = topic {
            let mut answer = TopicAnswer::submit(
                AnswerId::new(id),
                learner_id,
                TopicId::new(10),
                AnswerDraft::new("work"),
                fixed_now(),
            )
            .unwrap();
            if status != ReviewStatus::Pending {
                answer.review(status, fixed_now()).unwrap();
            }
            answers.topic_answers.push(answer);
        }
        answers
    }

    #[test]
    fn counts_each_learner_once_per_visible_topic() {
        let cohort = vec![
            learner(1, false, None),
            learner(2, true, None),
            learner(3, true, Some(ReviewStatus::Pending)),
            learner(4, true, Some(ReviewStatus::Rejected)),
            learner(5, true, Some(ReviewStatus::Approved)),
        ];
        let rows = overview(&curriculum(), &cohort, fixed_now());

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.topic_id, TopicId::new(10));
        assert_eq!(
            (row.locked, row.available, row.submitted, row.completed),
            (1, 1, 2, 1)
        );
        assert_eq!(row.pending_reviews, 1);
        assert_eq!(row.learners(), cohort.len());
        assert_eq!(row.current_mini_questions, 1);
        assert_eq!(row.future_mini_questions, 0);
    }

    #[test]
    fn empty_cohort_still_lists_topics() {
        let rows = overview(&curriculum(), &[], fixed_now());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].learners(), 0);
    }
}
