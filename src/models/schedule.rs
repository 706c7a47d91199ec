use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ease factor every card starts with.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;

/// Ease factor never falls below this value.
pub const MIN_EASE_FACTOR: f64 = 1.3;

/// Numeric scheduling state of a card, the part SM-2 reads and rewrites.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    /// Days until the next review, always at least 1.
    pub interval: u32,
    /// Consecutive passing reviews since creation or the last failure.
    pub repetitions: u32,
    pub ease_factor: f64,
    pub next_review_date: DateTime<Utc>,
}

impl Schedule {
    /// Schedule of a freshly created card: due one day after `now`.
    pub fn initial(now: DateTime<Utc>) -> Self {
        Self {
            interval: 1,
            repetitions: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            next_review_date: super::sm2::add_days(now, 1),
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.next_review_date
    }
}
