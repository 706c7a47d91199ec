//! ReviewCard is a question/answer pair owned by one learner, plus its SM-2 schedule.
use super::{Quality, Schedule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CardId = Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReviewCard {
    pub id: CardId,
    pub owner_id: String,
    pub topic: String,
    pub question: String,
    pub answer: String,
    #[serde(flatten)]
    pub schedule: Schedule,
    pub last_review_date: Option<DateTime<Utc>>,
    pub last_quality: Option<Quality>,
    pub created_at: DateTime<Utc>,
}

impl ReviewCard {
    /// Builds a never-reviewed card due one day after `now`.
    pub fn new(owner_id: &str, content: NewCard, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id: owner_id.to_string(),
            topic: content.topic,
            question: content.question,
            answer: content.answer,
            schedule: Schedule::initial(now),
            last_review_date: None,
            last_quality: None,
            created_at: now,
        }
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.schedule.is_due(now)
    }
}

/// Immutable content of a card, fixed at creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCard {
    pub topic: String,
    pub question: String,
    pub answer: String,
}

impl NewCard {
    pub fn new(
        topic: impl Into<String>,
        question: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            topic: topic.into(),
            question: question.into(),
            answer: answer.into(),
        }
    }
}
