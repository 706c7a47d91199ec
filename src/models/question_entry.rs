//! An asked question as recorded by the question-answering subsystem.
use super::NewCard;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionEntry {
    pub topic: String,
    pub question: String,
    pub answer: String,
    pub created_at: DateTime<Utc>,
}

impl QuestionEntry {
    pub fn to_new_card(&self) -> NewCard {
        NewCard::new(&self.topic, &self.question, &self.answer)
    }
}
