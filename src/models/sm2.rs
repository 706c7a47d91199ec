//! SM-2 (SuperMemo 2) spaced repetition algorithm implementation.
//!
//! - Quality 3-5 is a pass: interval climbs the ladder 1 day → 6 days → interval × EF
//! - Quality 0-2 is a fail: repetitions reset and the card is due again tomorrow
//! - EF is adjusted after every review, pass or fail, and never drops below 1.3
//! - The adjustment is quadratic in (5 - quality), so a bare pass (3) lowers EF
//!   while a perfect answer (5) raises it

use super::{MIN_EASE_FACTOR, Quality, Schedule};
use chrono::{DateTime, Days, Utc};

/// Intervals are capped at roughly a century so date arithmetic cannot overflow.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Calculates the schedule that follows a review of `quality` at `now`.
/// Pure: persistence and the clock belong to the caller.
pub fn calculate_next_review(
    schedule: &Schedule,
    quality: Quality,
    now: DateTime<Utc>,
) -> Schedule {
    let (interval, repetitions) = if quality.is_pass() {
        let interval = match schedule.repetitions {
            0 => 1,
            1 => 6,
            _ => scaled_interval(schedule.interval, schedule.ease_factor),
        };
        (interval, schedule.repetitions.saturating_add(1))
    } else {
        (1, 0)
    };

    Schedule {
        interval,
        repetitions,
        ease_factor: next_ease_factor(schedule.ease_factor, quality),
        next_review_date: add_days(now, interval),
    }
}

/// EF' = EF + (0.1 - (5-q) * (0.08 + (5-q) * 0.02)), floored at 1.3
pub fn next_ease_factor(ease_factor: f64, quality: Quality) -> f64 {
    let deficit = f64::from(Quality::MAX - quality.value());
    let ef = ease_factor + (0.1 - deficit * (0.08 + deficit * 0.02));
    ef.max(MIN_EASE_FACTOR)
}

fn scaled_interval(interval: u32, ease_factor: f64) -> u32 {
    // f64::round rounds half away from zero
    let scaled = (f64::from(interval) * ease_factor).round();
    (scaled as u32).clamp(1, MAX_INTERVAL_DAYS)
}

/// Advances the calendar date by `days`, keeping the time of day.
pub fn add_days(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Interval each quality rating would produce, indexed by quality 0-5.
pub fn preview_intervals(schedule: &Schedule, now: DateTime<Utc>) -> [u32; 6] {
    let mut intervals = [0; 6];
    for quality in Quality::all() {
        intervals[usize::from(quality.value())] =
            calculate_next_review(schedule, quality, now).interval;
    }
    intervals
}
