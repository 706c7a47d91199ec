pub mod db;
pub mod question_log;

pub use question_log::{QuestionLog, SqliteQuestionLog};
