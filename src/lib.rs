pub mod auto_create;
pub mod config;
pub mod database;
pub mod error;
pub mod export;
pub mod models;

pub use error::{Result, ReviewError};
pub use models::{Quality, QuestionEntry, ReviewCard, ReviewSession, Schedule};
