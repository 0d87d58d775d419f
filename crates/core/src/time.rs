use chrono::{DateTime, Utc};

/// Evaluation clock shared by services and tests.
///
/// Every read path takes `now` from the clock exactly once, so a single
/// request never observes two different release horizons.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }
}

/// True when a scheduled instant has been reached at `now`.
///
/// An absent schedule counts as already reached.
#[must_use]
pub fn has_arrived(scheduled: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    scheduled.is_none_or(|at| at <= now)
}

/// True when a scheduled instant lies strictly after `now`.
#[must_use]
pub fn is_future(scheduled: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    scheduled.is_some_and(|at| at > now)
}

/// Default format for instants quoted in user-facing messages.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M UTC";

/// Formats an instant for a user-facing message.
#[must_use]
pub fn format_instant(at: DateTime<Utc>, format: &str) -> String {
    at.format(format).to_string()
}

/// Deterministic timestamp for tests and examples (2025-03-01T09:00:00Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_740_819_600;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
