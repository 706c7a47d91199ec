//! Promotes recently asked questions into review cards.
//!
//! Entries are walked newest first. An entry whose question already has a card
//! for the same owner (exact string match) is skipped, so running the pipeline
//! twice over the same log creates nothing the second time.

use crate::config::AutoCreateConfig;
use crate::database::QuestionLog;
use crate::database::db::{find_card_by_question, insert_card};
use crate::error::{Result, ReviewError};
use crate::models::ReviewCard;
use chrono::{DateTime, Days, Utc};
use rusqlite::Connection;
use tracing::{debug, info, warn};

/// Creates cards for `owner_id` from the question log and returns how many were created.
///
/// Each card is written independently. If a write fails midway, the cards
/// already written stay and the error is returned.
pub fn auto_create(
    owner_id: &str,
    log: &impl QuestionLog,
    settings: &AutoCreateConfig,
    now: DateTime<Utc>,
    conn: &Connection,
) -> Result<usize> {
    let since = window_start(now, settings.window_days);
    let entries = log
        .recent_questions(owner_id, since, settings.max_entries)
        .map_err(|e| match e {
            ReviewError::UpstreamUnavailable(_) => e,
            other => ReviewError::UpstreamUnavailable(format!("question log: {other}")),
        })?;
    debug!(owner = owner_id, candidates = entries.len(), "auto-create candidates");

    let mut created = 0;
    for entry in &entries {
        let outcome = find_card_by_question(owner_id, &entry.question, conn).and_then(|existing| {
            if existing.is_some() {
                return Ok(false);
            }
            let card = ReviewCard::new(owner_id, entry.to_new_card(), now);
            insert_card(&card, conn)
        });
        match outcome {
            Ok(true) => created += 1,
            Ok(false) => {
                debug!(owner = owner_id, question = %entry.question, "card exists, skipping")
            }
            Err(e) => {
                warn!(
                    owner = owner_id,
                    created,
                    candidates = entries.len(),
                    error = %e,
                    "auto-create interrupted"
                );
                return Err(e);
            }
        }
    }

    info!(owner = owner_id, created, candidates = entries.len(), "auto-create finished");
    Ok(created)
}

/// Oldest creation time still inside the window, saturating at the earliest date.
fn window_start(now: DateTime<Utc>, window_days: u32) -> DateTime<Utc> {
    now.checked_sub_days(Days::new(u64::from(window_days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::SqliteQuestionLog;
    use crate::database::db::{add_card, list_cards, open_in_memory};
    use crate::database::question_log::log_question;
    use crate::models::{NewCard, QuestionEntry};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 18, 45, 0).unwrap()
    }

    fn ask(conn: &Connection, owner: &str, topic: &str, question: &str, hours_ago: i64) {
        let entry = QuestionEntry {
            topic: topic.to_string(),
            question: question.to_string(),
            answer: format!("answer to {question}"),
            created_at: now() - Duration::hours(hours_ago),
        };
        log_question(owner, &entry, conn).unwrap();
    }

    fn run(owner: &str, conn: &Connection) -> Result<usize> {
        let settings = AutoCreateConfig::default();
        auto_create(owner, &SqliteQuestionLog::new(conn), &settings, now(), conn)
    }

    struct OfflineLog;

    impl QuestionLog for OfflineLog {
        fn recent_questions(
            &self,
            _: &str,
            _: DateTime<Utc>,
            _: usize,
        ) -> Result<Vec<QuestionEntry>> {
            Err(ReviewError::UpstreamUnavailable("connection refused".into()))
        }
    }

    #[test]
    fn test_creates_cards_with_defaults() {
        let conn = open_in_memory().unwrap();
        ask(&conn, "alice", "Physics", "What is Newton's second law?", 2);
        ask(&conn, "alice", "Biology", "What is photosynthesis?", 1);

        assert_eq!(run("alice", &conn).unwrap(), 2);

        let cards = list_cards("alice", &conn).unwrap();
        assert_eq!(cards.len(), 2);
        for card in &cards {
            assert_eq!(card.schedule.interval, 1);
            assert_eq!(card.schedule.repetitions, 0);
            assert_eq!(card.schedule.ease_factor, 2.5);
            assert_eq!(card.schedule.next_review_date, now() + Duration::days(1));
            assert_eq!(card.answer, format!("answer to {}", card.question));
        }
        let physics = cards.iter().find(|c| c.topic == "Physics").unwrap();
        assert_eq!(physics.question, "What is Newton's second law?");
    }

    #[test]
    fn test_second_run_creates_nothing() {
        let conn = open_in_memory().unwrap();
        ask(&conn, "alice", "Math", "d/dx x^2?", 3);

        assert_eq!(run("alice", &conn).unwrap(), 1);
        assert_eq!(run("alice", &conn).unwrap(), 0);
        assert_eq!(list_cards("alice", &conn).unwrap().len(), 1);
    }

    #[test]
    fn test_existing_card_is_skipped() {
        let conn = open_in_memory().unwrap();
        add_card("alice", NewCard::new("Math", "d/dx x^2?", "2x"), now(), &conn).unwrap();
        ask(&conn, "alice", "Math", "d/dx x^2?", 1);

        assert_eq!(run("alice", &conn).unwrap(), 0);
    }

    #[test]
    fn test_repeated_question_in_log_creates_one_card() {
        let conn = open_in_memory().unwrap();
        ask(&conn, "alice", "Math", "What is pi?", 5);
        ask(&conn, "alice", "Math", "What is pi?", 1);

        assert_eq!(run("alice", &conn).unwrap(), 1);
    }

    #[test]
    fn test_respects_window_and_owner() {
        let conn = open_in_memory().unwrap();
        ask(&conn, "alice", "History", "Too old?", 24 * 8);
        ask(&conn, "bob", "History", "Bob's question", 1);

        assert_eq!(run("alice", &conn).unwrap(), 0);
        assert!(list_cards("alice", &conn).unwrap().is_empty());
    }

    #[test]
    fn test_respects_max_entries() {
        let conn = open_in_memory().unwrap();
        for i in 0..15 {
            ask(&conn, "alice", "Trivia", &format!("question {i}"), i);
        }
        assert_eq!(run("alice", &conn).unwrap(), 10);
    }

    #[test]
    fn test_no_entries_creates_nothing() {
        let conn = open_in_memory().unwrap();
        assert_eq!(run("alice", &conn).unwrap(), 0);
    }

    #[test]
    fn test_huge_window_reaches_back_to_the_earliest_date() {
        let conn = open_in_memory().unwrap();
        ask(&conn, "alice", "History", "Asked last year?", 24 * 365);
        let settings: AutoCreateConfig = toml::from_str("window_days = 4000000000").unwrap();

        let log = SqliteQuestionLog::new(&conn);
        let created = auto_create("alice", &log, &settings, now(), &conn).unwrap();
        assert_eq!(created, 1);
        assert_eq!(window_start(now(), u32::MAX), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn test_unreachable_log_is_retryable() {
        let conn = open_in_memory().unwrap();
        let settings = AutoCreateConfig::default();
        let err = auto_create("alice", &OfflineLog, &settings, now(), &conn).unwrap_err();
        assert!(matches!(err, ReviewError::UpstreamUnavailable(_)));
        assert!(err.is_retryable());
        assert!(list_cards("alice", &conn).unwrap().is_empty());
    }
}
