//! SQLite persistence for card state
//!
//! Handles database initialization, card CRUD keyed by `(user_id, item_id)`,
//! and the simulated current date the CLI schedules against.

use super::CardRepository;
use crate::error::{Error, Result};
use crate::models::{Card, ItemId};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;

const CARD_COLUMNS: &str = "user_id, item_id, ease_factor, interval_days, repetitions, next_review_date, last_reviewed_at";

/// Opens (or creates) the database file and makes sure the schema exists.
///
/// `initial_date` seeds the simulated current date on first use only.
pub fn init_database(path: &Path, initial_date: DateTime<Utc>) -> Result<Connection> {
    let conn = Connection::open(path)?;
    create_schema(&conn, initial_date)?;
    log::info!("Opened card database at '{}'", path.display());
    Ok(conn)
}

/// Creates the card and app state tables if they are missing.
pub fn create_schema(conn: &Connection, initial_date: DateTime<Utc>) -> Result<()> {
    // Card scheduling state, timestamps as RFC 3339 UTC text with nanoseconds
    conn.execute(
        "CREATE TABLE IF NOT EXISTS cards (
            user_id TEXT NOT NULL,
            item_id INTEGER NOT NULL,
            ease_factor REAL NOT NULL DEFAULT 2.5,
            interval_days INTEGER NOT NULL DEFAULT 0,
            repetitions INTEGER NOT NULL DEFAULT 0,
            next_review_date TEXT NOT NULL,
            last_reviewed_at TEXT,
            PRIMARY KEY (user_id, item_id)
        )",
        (),
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS cards_due ON cards (user_id, next_review_date)",
        (),
    )?;

    // Key/value table holding the current date
    conn.execute(
        "CREATE TABLE IF NOT EXISTS app_state (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        (),
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO app_state (key, value) VALUES ('current_date', ?1)",
        params![encode_date(initial_date)],
    )?;

    Ok(())
}

/// Retrieves the simulated current date
pub fn get_current_date(conn: &Connection) -> Result<DateTime<Utc>> {
    let value: String = conn.query_row(
        "SELECT value FROM app_state WHERE key = 'current_date'",
        [],
        |row| row.get(0),
    )?;

    decode_date(&value)
}

pub fn set_current_date(conn: &Connection, date: DateTime<Utc>) -> Result<()> {
    conn.execute(
        "UPDATE app_state SET value = ?1 WHERE key = 'current_date'",
        params![encode_date(date)],
    )?;
    log::info!("Current date set to {}", date.format("%Y-%m-%d %H:%M"));
    Ok(())
}

/// Moves the simulated current date forward by whole days
pub fn advance_day(conn: &Connection, days: u32) -> Result<DateTime<Utc>> {
    let current = get_current_date(conn)?;
    let next = current
        .checked_add_signed(Duration::days(i64::from(days)))
        .ok_or_else(|| Error::invalid(format!("cannot advance {} days past {}", days, current)))?;
    set_current_date(conn, next)?;
    Ok(next)
}

/// Inserts a card unless one already exists for its `(user_id, item_id)`.
///
/// Returns false when the card was already present.
pub fn insert_new_card(card: &Card, conn: &Connection) -> Result<bool> {
    card.validate()?;
    let inserted = conn.execute(
        &format!("INSERT OR IGNORE INTO cards ({CARD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
        params![
            card.user_id,
            card.item_id,
            card.ease_factor,
            card.interval_days,
            card.repetition_count,
            encode_date(card.next_review_date),
            card.last_reviewed_at.map(encode_date),
        ],
    )?;
    Ok(inserted == 1)
}

/// Writes the card's scheduling state, inserting it if needed
pub fn save_card(card: &Card, conn: &Connection) -> Result<()> {
    card.validate()?;
    conn.execute(
        &format!(
            "INSERT INTO cards ({CARD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT (user_id, item_id) DO UPDATE SET
                ease_factor = excluded.ease_factor,
                interval_days = excluded.interval_days,
                repetitions = excluded.repetitions,
                next_review_date = excluded.next_review_date,
                last_reviewed_at = excluded.last_reviewed_at"
        ),
        params![
            card.user_id,
            card.item_id,
            card.ease_factor,
            card.interval_days,
            card.repetition_count,
            encode_date(card.next_review_date),
            card.last_reviewed_at.map(encode_date),
        ],
    )?;
    Ok(())
}

pub fn load_card(user_id: &str, item_id: ItemId, conn: &Connection) -> Result<Option<Card>> {
    let row = conn
        .query_row(
            &format!("SELECT {CARD_COLUMNS} FROM cards WHERE user_id = ?1 AND item_id = ?2"),
            params![user_id, item_id],
            CardRow::from_row,
        )
        .optional()?;

    row.map(CardRow::into_card).transpose()
}

/// Retrieves all cards of a user
///
/// Ordered by next_review_date (oldest first), then item id.
pub fn list_cards(user_id: &str, conn: &Connection) -> Result<Vec<Card>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CARD_COLUMNS} FROM cards WHERE user_id = ?1
         ORDER BY next_review_date ASC, item_id ASC"
    ))?;

    let rows = stmt
        .query_map(params![user_id], CardRow::from_row)?
        .collect::<rusqlite::Result<Vec<CardRow>>>()?;

    rows.into_iter().map(CardRow::into_card).collect()
}

/// Removes a card, returning false when it did not exist
pub fn delete_card(user_id: &str, item_id: ItemId, conn: &Connection) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM cards WHERE user_id = ?1 AND item_id = ?2",
        params![user_id, item_id],
    )?;
    Ok(deleted == 1)
}

/// Raw column values, converted to a validated `Card` outside the rusqlite callback.
struct CardRow {
    user_id: String,
    item_id: ItemId,
    ease_factor: f64,
    interval_days: u32,
    repetitions: u32,
    next_review_date: String,
    last_reviewed_at: Option<String>,
}

impl CardRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user_id: row.get(0)?,
            item_id: row.get(1)?,
            ease_factor: row.get(2)?,
            interval_days: row.get(3)?,
            repetitions: row.get(4)?,
            next_review_date: row.get(5)?,
            last_reviewed_at: row.get(6)?,
        })
    }

    fn into_card(self) -> Result<Card> {
        let card = Card {
            user_id: self.user_id,
            item_id: self.item_id,
            ease_factor: self.ease_factor,
            interval_days: self.interval_days,
            repetition_count: self.repetitions,
            next_review_date: decode_date(&self.next_review_date)?,
            last_reviewed_at: self.last_reviewed_at.as_deref().map(decode_date).transpose()?,
        };
        card.validate()?;
        Ok(card)
    }
}

/// Fixed-width text keeps full precision and sorts in chronological order.
fn encode_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_date(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|date| date.with_timezone(&Utc))
        .map_err(|e| Error::invalid(format!("stored date '{}' is not RFC 3339: {}", value, e)))
}

/// [`CardRepository`] over a SQLite connection.
pub struct SqliteCardRepository {
    conn: Connection,
}

impl SqliteCardRepository {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(path: &Path, initial_date: DateTime<Utc>) -> Result<Self> {
        Ok(Self::new(init_database(path, initial_date)?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl CardRepository for SqliteCardRepository {
    fn load(&self, user_id: &str, item_id: ItemId) -> Result<Option<Card>> {
        load_card(user_id, item_id, &self.conn)
    }

    fn save(&mut self, card: &Card) -> Result<()> {
        save_card(card, &self.conn)
    }

    fn list(&self, user_id: &str) -> Result<Vec<Card>> {
        list_cards(user_id, &self.conn)
    }
}
