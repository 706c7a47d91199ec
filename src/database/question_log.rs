//! Read access to the questions a learner has asked.
//!
//! The question-answering subsystem owns this log; the scheduler only reads it.
//! `SqliteQuestionLog` keeps the log in the same database so the CLI can
//! record questions itself.

use super::db::{from_millis, to_millis};
use crate::error::Result;
use crate::models::QuestionEntry;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

pub trait QuestionLog {
    /// Entries for `owner_id` created at or after `since`, newest first, at most `limit`.
    fn recent_questions(
        &self,
        owner_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QuestionEntry>>;
}

pub struct SqliteQuestionLog<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteQuestionLog<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl QuestionLog for SqliteQuestionLog<'_> {
    fn recent_questions(
        &self,
        owner_id: &str,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<QuestionEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT topic, question, answer, created_at FROM questions
             WHERE owner_id = ?1 AND created_at >= ?2
             ORDER BY created_at DESC, id DESC
             LIMIT ?3",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map(params![owner_id, to_millis(since), limit], |row| {
                Ok(QuestionEntry {
                    topic: row.get(0)?,
                    question: row.get(1)?,
                    answer: row.get(2)?,
                    created_at: from_millis(3, row.get(3)?)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

/// Appends an answered question to the log.
pub fn log_question(owner_id: &str, entry: &QuestionEntry, conn: &Connection) -> Result<()> {
    conn.execute(
        "INSERT INTO questions (owner_id, topic, question, answer, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            owner_id,
            entry.topic,
            entry.question,
            entry.answer,
            to_millis(entry.created_at)
        ],
    )?;
    Ok(())
}
