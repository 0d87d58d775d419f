use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::journey::LearnerJourney;
use crate::model::{Learner, LearnerId};
use crate::progress::Progress;

pub use crate::model::TieBreak;

/// One learner's standing before ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub learner_id: LearnerId,
    pub name: String,
    pub progress: Progress,
    /// When the latest approved step was reached.
    pub last_completed_at: Option<DateTime<Utc>>,
}

impl LeaderboardEntry {
    #[must_use]
    pub fn from_journey(learner: &Learner, journey: &LearnerJourney) -> Self {
        Self {
            learner_id: learner.id(),
            name: learner.name().to_owned(),
            progress: journey.progress,
            last_completed_at: journey.last_completed_at(),
        }
    }

    #[must_use]
    pub fn current_step(&self) -> usize {
        self.progress.current_step
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedLearner {
    /// Competition rank: equal step counts share a rank.
    pub rank: usize,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

/// Orders learners by step count, descending.
///
/// The sort is stable, so whatever `tie_break` leaves equal keeps input
/// order and repeated calls give the same result.
#[must_use]
pub fn rank(mut entries: Vec<LeaderboardEntry>, tie_break: TieBreak) -> Vec<RankedLearner> {
    entries.sort_by(|a, b| {
        b.current_step()
            .cmp(&a.current_step())
            .then_with(|| match tie_break {
                TieBreak::EarliestCompletion => {
                    earliest_first(a.last_completed_at, b.last_completed_at)
                }
                TieBreak::FetchOrder => Ordering::Equal,
            })
    });

    let mut ranked = Vec::with_capacity(entries.len());
    let mut rank = 0;
    let mut previous_step = None;
    for (idx, entry) in entries.into_iter().enumerate() {
        if previous_step != Some(entry.current_step()) {
            rank = idx + 1;
            previous_step = Some(entry.current_step());
        }
        ranked.push(RankedLearner { rank, entry });
    }
    ranked
}

/// Earlier completion first; learners who never completed go last.
fn earliest_first(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn entry(id: u64, steps: usize, completed_h: Option<i64>) -> LeaderboardEntry {
        LeaderboardEntry {
            learner_id: LearnerId::new(id),
            name: format!("learner-{id}"),
            progress: Progress {
                current_step: steps,
                total_steps: 5,
                released_topics: 5,
            },
            last_completed_at: completed_h.map(|h| fixed_now() + Duration::hours(h)),
        }
    }

    fn order(ranked: &[RankedLearner]) -> Vec<(u64, usize)> {
        ranked
            .iter()
            .map(|r| (r.entry.learner_id.value(), r.rank))
            .collect()
    }

    #[test]
    fn sorts_descending_by_steps() {
        let ranked = rank(
            vec![entry(1, 1, Some(1)), entry(2, 3, Some(1)), entry(3, 2, Some(1))],
            TieBreak::FetchOrder,
        );
        assert_eq!(order(&ranked), vec![(2, 1), (3, 2), (1, 3)]);
    }

    #[test]
    fn fetch_order_keeps_ties_stable_and_shares_rank() {
        let input = vec![
            entry(1, 2, Some(5)),
            entry(2, 2, Some(1)),
            entry(3, 4, None),
            entry(4, 0, None),
        ];
        let ranked = rank(input.clone(), TieBreak::FetchOrder);
        assert_eq!(order(&ranked), vec![(3, 1), (1, 2), (2, 2), (4, 4)]);
        assert_eq!(rank(input, TieBreak::FetchOrder), ranked);
    }

    #[test]
    fn earliest_completion_breaks_ties() {
        let ranked = rank(
            vec![
                entry(1, 2, Some(5)),
                entry(2, 2, Some(1)),
                entry(3, 0, None),
                entry(4, 0, None),
            ],
            TieBreak::EarliestCompletion,
        );
        assert_eq!(order(&ranked), vec![(2, 1), (1, 1), (3, 3), (4, 3)]);
    }

    #[test]
    fn empty_input_gives_empty_board() {
        assert!(rank(Vec::new(), TieBreak::default()).is_empty());
    }
}
