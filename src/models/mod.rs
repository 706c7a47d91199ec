pub mod quality;
pub mod question_entry;
pub mod review_card;
pub mod review_session;
pub mod schedule;
pub mod sm2;

pub use quality::Quality;
pub use question_entry::QuestionEntry;
pub use review_card::{CardId, NewCard, ReviewCard};
pub use review_session::{RatingOutcome, ReviewSession, SessionState, SessionStats};
pub use schedule::{INITIAL_EASE_FACTOR, MIN_EASE_FACTOR, Schedule};
