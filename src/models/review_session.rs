//! Review session management for spaced repetition practice.
//! Walks a learner through the cards due at session start, applying SM-2 to each rating.

use super::{CardId, Quality, ReviewCard, Schedule, sm2};
use crate::database::db;
use crate::error::{Result, ReviewError};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    AwaitingReveal(usize),
    AwaitingRating(usize),
    Complete,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AwaitingReveal(i) => write!(f, "awaiting reveal of card {i}"),
            Self::AwaitingRating(i) => write!(f, "awaiting rating of card {i}"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// What a single rating did. `passed` is all the points subsystem needs.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RatingOutcome {
    pub card_id: CardId,
    pub quality: Quality,
    pub passed: bool,
    pub schedule: Schedule,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub rated: usize,
    pub correct: usize,
}

impl SessionStats {
    pub fn accuracy(&self) -> f64 {
        if self.rated == 0 {
            0.0
        } else {
            self.correct as f64 / self.rated as f64
        }
    }
}

/// Applies a rating to `card` and persists it, guarded by the card's
/// `last_review_date` as it was when fetched. Returns the updated card.
pub fn apply_rating(
    card: &ReviewCard,
    quality: Quality,
    now: DateTime<Utc>,
    conn: &Connection,
) -> Result<ReviewCard> {
    let mut updated = card.clone();
    updated.schedule = sm2::calculate_next_review(&card.schedule, quality, now);
    updated.last_review_date = Some(now);
    updated.last_quality = Some(quality);

    db::update_reviewed_card(&updated, card.last_review_date, conn)?;
    info!(
        owner = %card.owner_id,
        card = %card.id,
        quality = quality.value(),
        interval = updated.schedule.interval,
        ease_factor = updated.schedule.ease_factor,
        "card rated"
    );
    Ok(updated)
}

/// Rates one card outside of a session.
pub fn rate_card(
    owner_id: &str,
    card_id: CardId,
    quality: Quality,
    now: DateTime<Utc>,
    conn: &Connection,
) -> Result<RatingOutcome> {
    let card = db::get_card(owner_id, card_id, conn)?;
    let updated = apply_rating(&card, quality, now, conn)?;
    Ok(RatingOutcome {
        card_id,
        quality,
        passed: quality.is_pass(),
        schedule: updated.schedule,
    })
}

/// A batch of due cards fixed at session start.
/// Cards that come due while the session runs are not added.
pub struct ReviewSession {
    pub owner_id: String,
    cards: Vec<ReviewCard>,
    state: SessionState,
    stats: SessionStats,
    outcomes: Vec<RatingOutcome>,
    conn: Arc<Mutex<Connection>>,
}

impl ReviewSession {
    /// Starts a session over the cards due for `owner_id` at `now`.
    pub fn start(owner_id: &str, now: DateTime<Utc>, conn: Arc<Mutex<Connection>>) -> Result<Self> {
        let cards = db::select_due(owner_id, now, &conn.lock())?;
        Ok(Self::from_cards(owner_id, cards, conn))
    }

    pub fn from_cards(
        owner_id: &str,
        cards: Vec<ReviewCard>,
        conn: Arc<Mutex<Connection>>,
    ) -> Self {
        let state = if cards.is_empty() {
            SessionState::Complete
        } else {
            SessionState::AwaitingReveal(0)
        };
        Self {
            owner_id: owner_id.to_string(),
            cards,
            state,
            stats: SessionStats::default(),
            outcomes: Vec::new(),
            conn,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn outcomes(&self) -> &[RatingOutcome] {
        &self.outcomes
    }

    pub fn cards(&self) -> &[ReviewCard] {
        &self.cards
    }

    pub fn total_count(&self) -> usize {
        self.cards.len()
    }

    pub fn remaining_count(&self) -> usize {
        self.cards.len() - self.stats.rated
    }

    pub fn is_completed(&self) -> bool {
        self.state == SessionState::Complete
    }

    pub fn current_card(&self) -> Option<&ReviewCard> {
        match self.state {
            SessionState::AwaitingReveal(i) | SessionState::AwaitingRating(i) => self.cards.get(i),
            SessionState::Complete => None,
        }
    }

    /// Shows the answer of the current card. The card itself is not touched.
    pub fn reveal(&mut self) -> Result<&ReviewCard> {
        let SessionState::AwaitingReveal(i) = self.state else {
            return Err(self.invalid("reveal"));
        };
        self.state = SessionState::AwaitingRating(i);
        Ok(&self.cards[i])
    }

    /// Grades the revealed card, persists its new schedule, and moves on.
    ///
    /// On error the session stays on the same card. A `StaleCard` error means
    /// the card was reviewed elsewhere; start a fresh session to continue.
    pub fn rate(&mut self, quality: Quality, now: DateTime<Utc>) -> Result<RatingOutcome> {
        let SessionState::AwaitingRating(i) = self.state else {
            return Err(self.invalid("rate"));
        };

        let updated = {
            let conn = self.conn.lock();
            apply_rating(&self.cards[i], quality, now, &conn)?
        };

        let outcome = RatingOutcome {
            card_id: updated.id,
            quality,
            passed: quality.is_pass(),
            schedule: updated.schedule.clone(),
        };
        self.cards[i] = updated;
        self.stats.rated += 1;
        if outcome.passed {
            self.stats.correct += 1;
        }
        self.outcomes.push(outcome.clone());

        self.state = if i + 1 < self.cards.len() {
            SessionState::AwaitingReveal(i + 1)
        } else {
            SessionState::Complete
        };
        Ok(outcome)
    }

    pub fn phase_message(&self) -> String {
        match self.state {
            SessionState::AwaitingReveal(i) | SessionState::AwaitingRating(i) => {
                format!("Card {} of {}", i + 1, self.total_count())
            }
            SessionState::Complete => format!(
                "Session complete: {} of {} correct",
                self.stats.correct, self.stats.rated
            ),
        }
    }

    fn invalid(&self, action: &'static str) -> ReviewError {
        ReviewError::InvalidTransition {
            action,
            state: self.state.to_string(),
        }
    }
}
