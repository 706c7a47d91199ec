//! JSON import/export of a learner's review cards.
//! Exports carry the schedule, so cards keep their place on the ladder when moved.

use crate::database::db::{find_card_by_question, insert_card};
use crate::error::Result;
use crate::models::{MIN_EASE_FACTOR, ReviewCard};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct CardExport {
    pub owner_id: String,
    pub exported_at: DateTime<Utc>,
    pub cards: Vec<ReviewCard>,
}

/// Writes the cards to a pretty-printed JSON file at `path`.
pub fn export_json_to_path(export: &CardExport, path: &Path) -> Result<()> {
    let json_string = serde_json::to_string_pretty(export)?;
    let mut file = File::create(path)?;
    file.write_all(json_string.as_bytes())?;
    info!(path = %path.display(), cards = export.cards.len(), "cards exported");
    Ok(())
}

/// Reads an export file.
pub fn import_json(path: &Path) -> Result<CardExport> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    let export: CardExport = serde_json::from_str(&contents)?;
    Ok(export)
}

/// Adds exported cards to `owner_id`, skipping questions the owner already has.
/// Returns the number of cards created.
pub fn import_cards(owner_id: &str, export: CardExport, conn: &Connection) -> Result<usize> {
    let mut created = 0;
    for mut card in export.cards {
        if find_card_by_question(owner_id, &card.question, conn)?.is_some() {
            continue;
        }
        card.id = Uuid::new_v4();
        card.owner_id = owner_id.to_string();
        card.schedule.interval = card.schedule.interval.max(1);
        card.schedule.ease_factor = card.schedule.ease_factor.max(MIN_EASE_FACTOR);
        if insert_card(&card, conn)? {
            created += 1;
        }
    }
    info!(owner = owner_id, created, "cards imported");
    Ok(created)
}
