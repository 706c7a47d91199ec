//! Database operations for the review scheduler
//!
//! Handles SQLite initialization, review card storage, the due-card selector,
//! and the simulated clock used to fast-forward through review days.

use crate::error::{Result, ReviewError};
use crate::models::{CardId, NewCard, Quality, ReviewCard, Schedule};
use chrono::{DateTime, Days, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use tracing::{debug, info, warn};
use uuid::Uuid;

const CARD_COLUMNS: &str = "id, owner_id, topic, question, answer, interval, repetitions, \
     ease_factor, next_review_date, last_review_date, last_quality, created_at";

/// Opens (or creates) the SQLite database at `path` and ensures the schema exists.
pub fn init_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    debug!(path = %path.display(), "database opened");
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Creates tables for review cards, the question log, and app state.
///
/// `(owner_id, question)` is unique, so a duplicate insert racing past the
/// pipeline's existence check becomes a no-op.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS review_cards (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            topic TEXT NOT NULL,
            question TEXT NOT NULL,
            answer TEXT NOT NULL,
            interval INTEGER NOT NULL DEFAULT 1 CHECK (interval >= 1),
            repetitions INTEGER NOT NULL DEFAULT 0 CHECK (repetitions >= 0),
            ease_factor REAL NOT NULL DEFAULT 2.5 CHECK (ease_factor >= 1.3),
            next_review_date INTEGER NOT NULL,
            last_review_date INTEGER,
            last_quality INTEGER CHECK (last_quality BETWEEN 0 AND 5),
            created_at INTEGER NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_review_cards_owner_question
            ON review_cards (owner_id, question);

        CREATE INDEX IF NOT EXISTS idx_review_cards_owner_due
            ON review_cards (owner_id, next_review_date);

        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id TEXT NOT NULL,
            topic TEXT NOT NULL,
            question TEXT NOT NULL,
            answer TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_questions_owner_created
            ON questions (owner_id, created_at);

        CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        INSERT OR IGNORE INTO app_state (key, value) VALUES ('clock_offset_days', '0');",
    )?;
    Ok(())
}

pub(crate) fn to_millis(time: DateTime<Utc>) -> i64 {
    time.timestamp_millis()
}

pub(crate) fn from_millis(idx: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}

// ==================== Clock ====================

/// Days the simulated clock runs ahead of the wall clock.
pub fn clock_offset_days(conn: &Connection) -> Result<u32> {
    let offset = conn.query_row(
        "SELECT value FROM app_state WHERE key = 'clock_offset_days'",
        [],
        |row| {
            let value: String = row.get(0)?;
            value.trim().parse::<u32>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
            })
        },
    )?;
    Ok(offset)
}

/// Current time as seen by the scheduler: wall clock plus the simulated offset.
pub fn current_time(conn: &Connection) -> Result<DateTime<Utc>> {
    let offset = clock_offset_days(conn)?;
    Ok(Utc::now()
        .checked_add_days(Days::new(u64::from(offset)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC))
}

/// Moves the simulated clock one day forward and returns the new offset.
pub fn advance_day(conn: &Connection) -> Result<u32> {
    let offset = clock_offset_days(conn)?.saturating_add(1);
    conn.execute(
        "UPDATE app_state SET value = ?1 WHERE key = 'clock_offset_days'",
        params![offset.to_string()],
    )?;
    info!(offset, "advanced simulated clock");
    Ok(offset)
}

pub fn reset_clock(conn: &Connection) -> Result<()> {
    conn.execute(
        "UPDATE app_state SET value = '0' WHERE key = 'clock_offset_days'",
        [],
    )?;
    Ok(())
}

// ==================== Cards ====================

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<ReviewCard> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, Type::Text, Box::new(e))
    })?;
    let last_review_date = match row.get::<_, Option<i64>>(9)? {
        Some(ms) => Some(from_millis(9, ms)?),
        None => None,
    };
    let last_quality = match row.get::<_, Option<i64>>(10)? {
        Some(q) => Some(
            Quality::new(q).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(10, q))?,
        ),
        None => None,
    };

    Ok(ReviewCard {
        id,
        owner_id: row.get(1)?,
        topic: row.get(2)?,
        question: row.get(3)?,
        answer: row.get(4)?,
        schedule: Schedule {
            interval: row.get(5)?,
            repetitions: row.get(6)?,
            ease_factor: row.get(7)?,
            next_review_date: from_millis(8, row.get(8)?)?,
        },
        last_review_date,
        last_quality,
        created_at: from_millis(11, row.get(11)?)?,
    })
}

/// Stores `card` unless its owner already has a card with the same question.
///
/// Returns `true` when a row was written.
pub fn insert_card(card: &ReviewCard, conn: &Connection) -> Result<bool> {
    let written = conn.execute(
        "INSERT OR IGNORE INTO review_cards
            (id, owner_id, topic, question, answer, interval, repetitions, ease_factor,
             next_review_date, last_review_date, last_quality, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            card.id.to_string(),
            card.owner_id,
            card.topic,
            card.question,
            card.answer,
            card.schedule.interval,
            card.schedule.repetitions,
            card.schedule.ease_factor,
            to_millis(card.schedule.next_review_date),
            card.last_review_date.map(to_millis),
            card.last_quality.map(u8::from),
            to_millis(card.created_at),
        ],
    )?;
    Ok(written == 1)
}

/// Learner-initiated card creation.
///
/// If the owner already has a card for this question, that card is returned untouched.
pub fn add_card(
    owner_id: &str,
    content: NewCard,
    now: DateTime<Utc>,
    conn: &Connection,
) -> Result<ReviewCard> {
    let question = content.question.clone();
    let card = ReviewCard::new(owner_id, content, now);
    if insert_card(&card, conn)? {
        info!(owner = owner_id, card = %card.id, topic = %card.topic, "card created");
        return Ok(card);
    }
    debug!(owner = owner_id, "card already exists for question");
    find_card_by_question(owner_id, &question, conn)?
        .ok_or_else(|| ReviewError::UpstreamUnavailable("card vanished after insert".into()))
}

/// Exact-match lookup used for deduplication.
pub fn find_card_by_question(
    owner_id: &str,
    question: &str,
    conn: &Connection,
) -> Result<Option<ReviewCard>> {
    let sql =
        format!("SELECT {CARD_COLUMNS} FROM review_cards WHERE owner_id = ?1 AND question = ?2");
    let card = conn
        .query_row(&sql, params![owner_id, question], card_from_row)
        .optional()?;
    Ok(card)
}

/// Fetches a card, failing with `CardNotFound` if it is missing or owned by someone else.
pub fn get_card(owner_id: &str, id: CardId, conn: &Connection) -> Result<ReviewCard> {
    let sql = format!("SELECT {CARD_COLUMNS} FROM review_cards WHERE id = ?1 AND owner_id = ?2");
    conn.query_row(&sql, params![id.to_string(), owner_id], card_from_row)
        .optional()?
        .ok_or(ReviewError::CardNotFound(id))
}

/// All cards of an owner, oldest first.
pub fn list_cards(owner_id: &str, conn: &Connection) -> Result<Vec<ReviewCard>> {
    let sql = format!(
        "SELECT {CARD_COLUMNS} FROM review_cards
         WHERE owner_id = ?1
         ORDER BY created_at ASC, id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let cards = stmt
        .query_map(params![owner_id], card_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(cards)
}

/// Retrieves the owner's cards due for review
///
/// Returns cards where next_review_date <= now, most overdue first.
pub fn select_due(
    owner_id: &str,
    now: DateTime<Utc>,
    conn: &Connection,
) -> Result<Vec<ReviewCard>> {
    let sql = format!(
        "SELECT {CARD_COLUMNS} FROM review_cards
         WHERE owner_id = ?1 AND next_review_date <= ?2
         ORDER BY next_review_date ASC, created_at ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let cards = stmt
        .query_map(params![owner_id, to_millis(now)], card_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    debug!(owner = owner_id, due = cards.len(), "selected due cards");
    Ok(cards)
}

pub fn count_due(owner_id: &str, now: DateTime<Utc>, conn: &Connection) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM review_cards WHERE owner_id = ?1 AND next_review_date <= ?2",
        params![owner_id, to_millis(now)],
        |row| row.get(0),
    )?;
    Ok(usize::try_from(count).unwrap_or(0))
}

/// Writes a reviewed card's schedule back as one atomic read-modify-write.
///
/// The write only lands if the stored `last_review_date` still equals
/// `fetched_last_review`, the value seen when the card was loaded.
pub fn update_reviewed_card(
    card: &ReviewCard,
    fetched_last_review: Option<DateTime<Utc>>,
    conn: &Connection,
) -> Result<()> {
    let updated = conn.execute(
        "UPDATE review_cards
         SET interval = ?1, repetitions = ?2, ease_factor = ?3, next_review_date = ?4,
             last_review_date = ?5, last_quality = ?6
         WHERE id = ?7 AND owner_id = ?8 AND last_review_date IS ?9",
        params![
            card.schedule.interval,
            card.schedule.repetitions,
            card.schedule.ease_factor,
            to_millis(card.schedule.next_review_date),
            card.last_review_date.map(to_millis),
            card.last_quality.map(u8::from),
            card.id.to_string(),
            card.owner_id,
            fetched_last_review.map(to_millis),
        ],
    )?;
    if updated == 1 {
        return Ok(());
    }

    let exists = conn
        .query_row(
            "SELECT 1 FROM review_cards WHERE id = ?1 AND owner_id = ?2",
            params![card.id.to_string(), card.owner_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if exists {
        warn!(card = %card.id, "card changed since it was fetched");
        Err(ReviewError::StaleCard(card.id))
    } else {
        Err(ReviewError::CardNotFound(card.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
    }

    fn card_due_at(owner: &str, question: &str, due: DateTime<Utc>) -> ReviewCard {
        let mut card = ReviewCard::new(owner, NewCard::new("Topic", question, "answer"), t0());
        card.schedule.next_review_date = due;
        card
    }

    #[test]
    fn test_insert_and_get_roundtrip() {
        let conn = open_in_memory().unwrap();
        let card = ReviewCard::new("alice", NewCard::new("Physics", "F?", "ma"), t0());
        assert!(insert_card(&card, &conn).unwrap());

        let loaded = get_card("alice", card.id, &conn).unwrap();
        assert_eq!(loaded, card);
    }

    #[test]
    fn test_get_card_of_other_owner_is_not_found() {
        let conn = open_in_memory().unwrap();
        let card = ReviewCard::new("alice", NewCard::new("Physics", "F?", "ma"), t0());
        insert_card(&card, &conn).unwrap();

        let err = get_card("bob", card.id, &conn).unwrap_err();
        assert!(matches!(err, ReviewError::CardNotFound(id) if id == card.id));
        assert!(matches!(
            get_card("alice", Uuid::new_v4(), &conn),
            Err(ReviewError::CardNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_question_is_ignored() {
        let conn = open_in_memory().unwrap();
        let math = NewCard::new("Math", "d/dx x^2?", "2x");
        let first = add_card("alice", math, t0(), &conn).unwrap();
        let other = NewCard::new("Other", "d/dx x^2?", "different");
        let again = add_card("alice", other, t0(), &conn).unwrap();
        assert_eq!(first.id, again.id);
        assert_eq!(again.answer, "2x");

        // same question for another learner is a separate card
        let bobs = add_card("bob", NewCard::new("Math", "d/dx x^2?", "2x"), t0(), &conn).unwrap();
        assert_ne!(bobs.id, first.id);
        assert_eq!(list_cards("alice", &conn).unwrap().len(), 1);
    }

    #[test]
    fn test_select_due_filters_and_orders() {
        let conn = open_in_memory().unwrap();
        let now = t0() + Duration::days(10);
        insert_card(&card_due_at("alice", "b", now - Duration::days(1)), &conn).unwrap();
        insert_card(&card_due_at("alice", "a", now - Duration::days(5)), &conn).unwrap();
        insert_card(&card_due_at("alice", "exact", now), &conn).unwrap();
        insert_card(&card_due_at("alice", "future", now + Duration::seconds(1)), &conn).unwrap();
        insert_card(&card_due_at("bob", "bobs", now - Duration::days(9)), &conn).unwrap();

        let due = select_due("alice", now, &conn).unwrap();
        let questions: Vec<_> = due.iter().map(|c| c.question.as_str()).collect();
        assert_eq!(questions, vec!["a", "b", "exact"]);
        assert!(due.iter().all(|c| c.schedule.next_review_date <= now));
        assert_eq!(count_due("alice", now, &conn).unwrap(), 3);
    }

    #[test]
    fn test_select_due_empty() {
        let conn = open_in_memory().unwrap();
        assert!(select_due("nobody", t0(), &conn).unwrap().is_empty());
        assert_eq!(count_due("nobody", t0(), &conn).unwrap(), 0);
    }

    #[test]
    fn test_update_detects_stale_card() {
        let conn = open_in_memory().unwrap();
        let card = card_due_at("alice", "q", t0());
        insert_card(&card, &conn).unwrap();

        let mut first = card.clone();
        first.last_review_date = Some(t0() + Duration::hours(1));
        first.last_quality = Some(Quality::new(4).unwrap());
        update_reviewed_card(&first, None, &conn).unwrap();

        let mut second = card.clone();
        second.last_review_date = Some(t0() + Duration::hours(2));
        second.last_quality = Some(Quality::new(1).unwrap());
        let err = update_reviewed_card(&second, None, &conn).unwrap_err();
        assert!(matches!(err, ReviewError::StaleCard(_)));
        assert!(err.is_retryable());

        let stored = get_card("alice", card.id, &conn).unwrap();
        assert_eq!(stored.last_quality, Some(Quality::new(4).unwrap()));
    }

    #[test]
    fn test_update_missing_card_is_not_found() {
        let conn = open_in_memory().unwrap();
        let card = card_due_at("alice", "q", t0());
        let err = update_reviewed_card(&card, None, &conn).unwrap_err();
        assert!(matches!(err, ReviewError::CardNotFound(_)));
    }

    #[test]
    fn test_clock_advances_by_days() {
        let conn = open_in_memory().unwrap();
        assert_eq!(clock_offset_days(&conn).unwrap(), 0);
        let before = current_time(&conn).unwrap();

        assert_eq!(advance_day(&conn).unwrap(), 1);
        assert_eq!(advance_day(&conn).unwrap(), 2);
        let after = current_time(&conn).unwrap();
        assert!(after - before >= Duration::days(2));

        reset_clock(&conn).unwrap();
        assert_eq!(clock_offset_days(&conn).unwrap(), 0);
    }

    #[test]
    fn test_corrupt_clock_offset_is_an_error() {
        let conn = open_in_memory().unwrap();
        conn.execute(
            "UPDATE app_state SET value = 'abc' WHERE key = 'clock_offset_days'",
            [],
        )
        .unwrap();

        assert!(matches!(clock_offset_days(&conn), Err(ReviewError::Database(_))));
        assert!(current_time(&conn).is_err());
        assert!(advance_day(&conn).is_err());
    }

    proptest! {
        #[test]
        fn prop_select_due_never_returns_future_cards(
            offsets in prop::collection::vec(-20_000i64..20_000, 0..40),
        ) {
            let conn = open_in_memory().unwrap();
            let now = t0() + Duration::days(30);
            for (i, minutes) in offsets.iter().enumerate() {
                let due = now + Duration::minutes(*minutes);
                insert_card(&card_due_at("alice", &format!("q{i}"), due), &conn).unwrap();
            }

            let due = select_due("alice", now, &conn).unwrap();
            prop_assert_eq!(due.len(), offsets.iter().filter(|m| **m <= 0).count());
            prop_assert!(due.iter().all(|c| c.schedule.next_review_date <= now));
            prop_assert!(due
                .windows(2)
                .all(|w| w[0].schedule.next_review_date <= w[1].schedule.next_review_date));
        }
    }
}
