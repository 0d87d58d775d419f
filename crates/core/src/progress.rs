use serde::Serialize;

use crate::eligibility::{ResolvedTopic, TopicStatus};

/// A learner's position on the journey.
///
/// `total_steps` is never zero so percentage math stays defined; use
/// `released_topics` when the true count matters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current_step: usize,
    pub total_steps: usize,
    pub released_topics: usize,
}

impl Progress {
    /// Completion in percent, 0 when nothing is released.
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.released_topics == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let ratio = self.current_step as f64 / self.total_steps as f64;
        (ratio * 100.0).clamp(0.0, 100.0)
    }

    #[must_use]
    pub fn steps_remaining(&self) -> usize {
        self.released_topics.saturating_sub(self.current_step)
    }
}

/// Counts approved topics against currently visible topics.
///
/// Submitted (pending or rejected) topics are not progress yet.
#[must_use]
pub fn compute_progress(resolved: &[ResolvedTopic]) -> Progress {
    let released_topics = resolved.iter().filter(|t| t.status.is_visible()).count();
    let current_step = resolved
        .iter()
        .filter(|t| t.status == TopicStatus::Completed)
        .count();

    Progress {
        current_step,
        total_steps: released_topics.max(1),
        released_topics,
    }
}
