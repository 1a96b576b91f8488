//! Card store and dictionary boundaries, with a SQLite implementation
//!
//! Schema:
//! ```text
//! cards          one row per (user_id, word_id, reading_index)
//! review_logs    append-only, cascades with its card
//! user_settings  present only when a user deviates from the defaults
//! readings       reading variants per dictionary word (kanji / kana / other)
//! ```
//!
//! Timestamps are stored as Unix seconds.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use thiserror::Error;

use super::models::{
    Card, CardId, CardKey, CardState, ReadingKind, Rating, ReviewLog, UserSettings, WordId,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Corrupt row: {0}")]
    CorruptRow(String),

    #[error("Card not saved yet: {0}")]
    UnsavedCard(CardKey),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// Persistence for cards, review logs and per-user settings
pub trait CardStore {
    fn get_card(&self, key: &CardKey) -> Result<Option<Card>>;

    /// Insert or update by natural key; returns the card with its id
    fn upsert_card(&self, card: &Card) -> Result<Card>;

    /// Upsert many cards in a single transaction
    fn upsert_cards(&self, cards: &[Card]) -> Result<Vec<Card>>;

    /// Delete a card and its logs. Returns whether a card existed.
    fn delete_card(&self, key: &CardKey) -> Result<bool>;

    fn append_review_log(&self, card_id: CardId, log: &ReviewLog) -> Result<ReviewLog>;

    /// Upsert a reviewed card and append its log atomically
    fn commit_review(&self, card: &Card, log: &ReviewLog) -> Result<(Card, ReviewLog)>;

    /// Logs of one card in insertion order
    fn list_review_logs(&self, card_id: CardId) -> Result<Vec<ReviewLog>>;

    /// Upsert a card and replace its whole log history atomically
    fn overwrite_card(&self, card: &Card, logs: &[ReviewLog]) -> Result<(Card, Vec<ReviewLog>)>;

    /// Cards of a user with id greater than `after`, ascending by id
    fn list_cards_page(&self, user_id: &str, after: Option<CardId>, limit: usize)
        -> Result<Vec<Card>>;

    fn get_settings(&self, user_id: &str) -> Result<Option<UserSettings>>;

    fn put_settings(&self, settings: &UserSettings) -> Result<()>;

    /// Returns whether a row existed
    fn delete_settings(&self, user_id: &str) -> Result<bool>;
}

/// Reading variant lookups for dictionary words
pub trait Dictionary {
    fn reading_kind(&self, word_id: WordId, reading_index: u32) -> Result<ReadingKind>;

    /// Lowest-index kana reading of the word, if any
    fn kana_variant_index(&self, word_id: WordId) -> Result<Option<u32>>;
}

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS cards (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        word_id INTEGER NOT NULL,
        reading_index INTEGER NOT NULL,
        state TEXT NOT NULL,
        step INTEGER,
        stability REAL,
        difficulty REAL,
        due INTEGER NOT NULL,
        last_review INTEGER,
        created_at INTEGER NOT NULL,
        UNIQUE (user_id, word_id, reading_index)
    );

    CREATE TABLE IF NOT EXISTS review_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        card_id INTEGER NOT NULL REFERENCES cards(id) ON DELETE CASCADE,
        rating INTEGER NOT NULL,
        reviewed_at INTEGER NOT NULL,
        duration_ms INTEGER
    );

    CREATE TABLE IF NOT EXISTS user_settings (
        user_id TEXT PRIMARY KEY,
        weights TEXT NOT NULL,
        desired_retention REAL NOT NULL
    );

    CREATE TABLE IF NOT EXISTS readings (
        word_id INTEGER NOT NULL,
        reading_index INTEGER NOT NULL,
        kind TEXT NOT NULL,
        PRIMARY KEY (word_id, reading_index)
    );

    CREATE INDEX IF NOT EXISTS idx_cards_user_id ON cards(user_id, id);
    CREATE INDEX IF NOT EXISTS idx_review_logs_card_id ON review_logs(card_id);
"#;

const CARD_COLUMNS: &str = "id, user_id, word_id, reading_index, state, step, stability, \
                            difficulty, due, last_review, created_at";

/// SQLite-backed card store and dictionary
pub struct SqliteCardStore {
    conn: Mutex<Connection>,
}

impl SqliteCardStore {
    /// Open (or create) a database file
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Describe one reading variant of a word
    pub fn register_reading(&self, word_id: WordId, reading_index: u32, kind: ReadingKind) -> Result<()> {
        self.conn()?.execute(
            "INSERT OR REPLACE INTO readings (word_id, reading_index, kind) VALUES (?1, ?2, ?3)",
            params![word_id, reading_index, kind.as_str()],
        )?;
        Ok(())
    }

    /// Number of cards a user has
    pub fn count_cards(&self, user_id: &str) -> Result<u64> {
        let count: i64 = self.conn()?.query_row(
            "SELECT COUNT(*) FROM cards WHERE user_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn upsert_card_in(conn: &Connection, card: &Card) -> Result<Card> {
    let id: CardId = conn.query_row(
        "INSERT INTO cards (user_id, word_id, reading_index, state, step, stability, difficulty, \
                            due, last_review, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT (user_id, word_id, reading_index) DO UPDATE SET
            state = excluded.state,
            step = excluded.step,
            stability = excluded.stability,
            difficulty = excluded.difficulty,
            due = excluded.due,
            last_review = excluded.last_review
         RETURNING id",
        params![
            card.key.user_id,
            card.key.word_id,
            card.key.reading_index,
            card.state.as_str(),
            card.step,
            card.stability,
            card.difficulty,
            card.due.timestamp(),
            card.last_review.map(|t| t.timestamp()),
            card.created_at.timestamp(),
        ],
        |row| row.get(0),
    )?;

    let mut saved = card.clone();
    saved.id = Some(id);
    Ok(saved)
}

fn append_log_in(conn: &Connection, card_id: CardId, log: &ReviewLog) -> Result<ReviewLog> {
    let id: i64 = conn.query_row(
        "INSERT INTO review_logs (card_id, rating, reviewed_at, duration_ms)
         VALUES (?1, ?2, ?3, ?4)
         RETURNING id",
        params![
            card_id,
            log.rating.value(),
            log.reviewed_at.timestamp(),
            log.duration_ms,
        ],
        |row| row.get(0),
    )?;

    let mut saved = log.clone();
    saved.id = Some(id);
    saved.card_id = Some(card_id);
    Ok(saved)
}

/// Raw column values; converted outside the rusqlite row closure
struct CardRow {
    id: i64,
    user_id: String,
    word_id: i64,
    reading_index: i64,
    state: String,
    step: Option<i64>,
    stability: Option<f64>,
    difficulty: Option<f64>,
    due: i64,
    last_review: Option<i64>,
    created_at: i64,
}

impl CardRow {
    fn read(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            word_id: row.get(2)?,
            reading_index: row.get(3)?,
            state: row.get(4)?,
            step: row.get(5)?,
            stability: row.get(6)?,
            difficulty: row.get(7)?,
            due: row.get(8)?,
            last_review: row.get(9)?,
            created_at: row.get(10)?,
        })
    }

    fn into_card(self) -> Result<Card> {
        let reading_index = u32::try_from(self.reading_index)
            .map_err(|_| corrupt(format!("card {} reading index {}", self.id, self.reading_index)))?;
        let step = self
            .step
            .map(u32::try_from)
            .transpose()
            .map_err(|_| corrupt(format!("card {} step", self.id)))?;
        let state = self
            .state
            .parse::<CardState>()
            .map_err(|e| corrupt(format!("card {}: {}", self.id, e)))?;

        Ok(Card {
            id: Some(self.id),
            key: CardKey::new(self.user_id, self.word_id, reading_index),
            state,
            step,
            stability: self.stability,
            difficulty: self.difficulty,
            due: timestamp(self.due)?,
            last_review: self.last_review.map(timestamp).transpose()?,
            created_at: timestamp(self.created_at)?,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or_else(|| corrupt(format!("timestamp {}", secs)))
}

fn corrupt(message: String) -> StoreError {
    StoreError::CorruptRow(message)
}

fn read_log(row: &rusqlite::Row) -> rusqlite::Result<(i64, i64, i64, i64, Option<i64>)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

fn into_log((id, card_id, rating, reviewed_at, duration_ms): (i64, i64, i64, i64, Option<i64>)) -> Result<ReviewLog> {
    let rating = Rating::from_value(rating)
        .ok_or_else(|| corrupt(format!("review log {} rating {}", id, rating)))?;
    let duration_ms = duration_ms
        .map(u32::try_from)
        .transpose()
        .map_err(|_| corrupt(format!("review log {} duration", id)))?;

    Ok(ReviewLog {
        id: Some(id),
        card_id: Some(card_id),
        rating,
        reviewed_at: timestamp(reviewed_at)?,
        duration_ms,
    })
}

fn require_id(card: &Card) -> Result<CardId> {
    card.id.ok_or_else(|| StoreError::UnsavedCard(card.key.clone()))
}

fn commit(tx: Transaction<'_>) -> Result<()> {
    tx.commit()?;
    Ok(())
}

impl CardStore for SqliteCardStore {
    fn get_card(&self, key: &CardKey) -> Result<Option<Card>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM cards WHERE user_id = ?1 AND word_id = ?2 AND reading_index = ?3",
                    CARD_COLUMNS
                ),
                params![key.user_id, key.word_id, key.reading_index],
                CardRow::read,
            )
            .optional()?;
        row.map(CardRow::into_card).transpose()
    }

    fn upsert_card(&self, card: &Card) -> Result<Card> {
        let conn = self.conn()?;
        upsert_card_in(&conn, card)
    }

    fn upsert_cards(&self, cards: &[Card]) -> Result<Vec<Card>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let saved = cards
            .iter()
            .map(|card| upsert_card_in(&tx, card))
            .collect::<Result<Vec<_>>>()?;
        commit(tx)?;
        Ok(saved)
    }

    fn delete_card(&self, key: &CardKey) -> Result<bool> {
        let deleted = self.conn()?.execute(
            "DELETE FROM cards WHERE user_id = ?1 AND word_id = ?2 AND reading_index = ?3",
            params![key.user_id, key.word_id, key.reading_index],
        )?;
        Ok(deleted > 0)
    }

    fn append_review_log(&self, card_id: CardId, log: &ReviewLog) -> Result<ReviewLog> {
        let conn = self.conn()?;
        append_log_in(&conn, card_id, log)
    }

    fn commit_review(&self, card: &Card, log: &ReviewLog) -> Result<(Card, ReviewLog)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let saved_card = upsert_card_in(&tx, card)?;
        let saved_log = append_log_in(&tx, require_id(&saved_card)?, log)?;
        commit(tx)?;
        Ok((saved_card, saved_log))
    }

    fn list_review_logs(&self, card_id: CardId) -> Result<Vec<ReviewLog>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, card_id, rating, reviewed_at, duration_ms
             FROM review_logs WHERE card_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![card_id], read_log)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(into_log).collect()
    }

    fn overwrite_card(&self, card: &Card, logs: &[ReviewLog]) -> Result<(Card, Vec<ReviewLog>)> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let saved_card = upsert_card_in(&tx, card)?;
        let card_id = require_id(&saved_card)?;
        tx.execute("DELETE FROM review_logs WHERE card_id = ?1", params![card_id])?;
        let saved_logs = logs
            .iter()
            .map(|log| append_log_in(&tx, card_id, log))
            .collect::<Result<Vec<_>>>()?;
        commit(tx)?;
        Ok((saved_card, saved_logs))
    }

    fn list_cards_page(
        &self,
        user_id: &str,
        after: Option<CardId>,
        limit: usize,
    ) -> Result<Vec<Card>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM cards WHERE user_id = ?1 AND id > ?2 ORDER BY id LIMIT ?3",
            CARD_COLUMNS
        ))?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt
            .query_map(params![user_id, after.unwrap_or(0), limit], CardRow::read)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(CardRow::into_card).collect()
    }

    fn get_settings(&self, user_id: &str) -> Result<Option<UserSettings>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT weights, desired_retention FROM user_settings WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
            )
            .optional()?;

        // Unreadable weights are kept as an empty vector; the resolver falls back per field
        Ok(row.map(|(weights, desired_retention)| UserSettings {
            user_id: user_id.to_string(),
            weights: serde_json::from_str(&weights).unwrap_or_else(|e| {
                log::warn!("Unreadable stored weights for user {}: {}", user_id, e);
                Vec::new()
            }),
            desired_retention,
        }))
    }

    fn put_settings(&self, settings: &UserSettings) -> Result<()> {
        let weights = serde_json::to_string(&settings.weights)?;
        self.conn()?.execute(
            "INSERT OR REPLACE INTO user_settings (user_id, weights, desired_retention)
             VALUES (?1, ?2, ?3)",
            params![settings.user_id, weights, settings.desired_retention],
        )?;
        Ok(())
    }

    fn delete_settings(&self, user_id: &str) -> Result<bool> {
        let deleted = self.conn()?.execute(
            "DELETE FROM user_settings WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(deleted > 0)
    }
}

impl Dictionary for SqliteCardStore {
    fn reading_kind(&self, word_id: WordId, reading_index: u32) -> Result<ReadingKind> {
        let kind: Option<String> = self
            .conn()?
            .query_row(
                "SELECT kind FROM readings WHERE word_id = ?1 AND reading_index = ?2",
                params![word_id, reading_index],
                |row| row.get(0),
            )
            .optional()?;

        match kind {
            None => Ok(ReadingKind::Other),
            Some(kind) => kind
                .parse()
                .map_err(|e| corrupt(format!("reading {}#{}: {}", word_id, reading_index, e))),
        }
    }

    fn kana_variant_index(&self, word_id: WordId) -> Result<Option<u32>> {
        let index: Option<i64> = self
            .conn()?
            .query_row(
                "SELECT reading_index FROM readings WHERE word_id = ?1 AND kind = 'kana'
                 ORDER BY reading_index LIMIT 1",
                params![word_id],
                |row| row.get(0),
            )
            .optional()?;

        index
            .map(|i| u32::try_from(i).map_err(|_| corrupt(format!("reading index {}", i))))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use tempfile::TempDir;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 8, 30, 0).unwrap()
    }

    fn reviewed_card(key: CardKey) -> Card {
        let mut card = Card::new(key, now() - Duration::days(3));
        card.state = CardState::Review;
        card.stability = Some(12.5);
        card.difficulty = Some(4.25);
        card.last_review = Some(now());
        card.due = now() + Duration::days(12);
        card
    }

    #[test]
    fn test_card_round_trip_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("nested").join("cards.db");
        let key = CardKey::new("u1", 1001, 0);

        let saved = {
            let store = SqliteCardStore::open(&db_path).unwrap();
            store.upsert_card(&reviewed_card(key.clone())).unwrap()
        };
        assert!(saved.id.is_some());

        let store = SqliteCardStore::open(&db_path).unwrap();
        let loaded = store.get_card(&key).unwrap().unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_upsert_keeps_id() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let key = CardKey::new("u1", 1, 0);
        let first = store.upsert_card(&Card::new(key.clone(), now())).unwrap();

        let mut changed = first.clone();
        changed.state = CardState::Blacklisted;
        changed.id = None;
        let second = store.upsert_card(&changed).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.get_card(&key).unwrap().unwrap().state, CardState::Blacklisted);
    }

    #[test]
    fn test_commit_review_and_cascade_delete() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let key = CardKey::new("u1", 2, 0);
        let log = ReviewLog::new(None, Rating::Good, now(), Some(1200));

        let (card, saved_log) = store.commit_review(&reviewed_card(key.clone()), &log).unwrap();
        assert_eq!(saved_log.card_id, card.id);

        let logs = store.list_review_logs(card.id.unwrap()).unwrap();
        assert_eq!(logs, vec![saved_log]);

        assert!(store.delete_card(&key).unwrap());
        assert!(!store.delete_card(&key).unwrap());
        assert!(store.list_review_logs(card.id.unwrap()).unwrap().is_empty());
    }

    #[test]
    fn test_overwrite_replaces_logs() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        let key = CardKey::new("u1", 3, 0);
        let (card, _) = store
            .commit_review(&reviewed_card(key.clone()), &ReviewLog::new(None, Rating::Again, now(), None))
            .unwrap();

        let imported = vec![
            ReviewLog::new(None, Rating::Good, now() - Duration::days(2), None),
            ReviewLog::new(None, Rating::Easy, now(), Some(800)),
        ];
        let (_, saved) = store.overwrite_card(&card, &imported).unwrap();
        assert_eq!(saved.len(), 2);

        let ratings: Vec<Rating> = store
            .list_review_logs(card.id.unwrap())
            .unwrap()
            .into_iter()
            .map(|l| l.rating)
            .collect();
        assert_eq!(ratings, vec![Rating::Good, Rating::Easy]);
    }

    #[test]
    fn test_pages_are_ascending_and_per_user() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        for word in 0..5 {
            store.upsert_card(&Card::new(CardKey::new("u1", word, 0), now())).unwrap();
            store.upsert_card(&Card::new(CardKey::new("u2", word, 0), now())).unwrap();
        }

        let first = store.list_cards_page("u1", None, 2).unwrap();
        assert_eq!(first.len(), 2);
        let rest = store.list_cards_page("u1", first[1].id, 10).unwrap();
        assert_eq!(rest.len(), 3);
        assert!(rest.iter().all(|c| c.key.user_id == "u1"));
        assert!(rest.windows(2).all(|w| w[0].id < w[1].id));
        assert!(first[1].id < rest[0].id);
        assert_eq!(store.count_cards("u2").unwrap(), 5);
    }

    #[test]
    fn test_settings_crud() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        assert_eq!(store.get_settings("u1").unwrap(), None);

        let settings = UserSettings {
            user_id: "u1".to_string(),
            weights: vec![0.5; 19],
            desired_retention: 0.85,
        };
        store.put_settings(&settings).unwrap();
        assert_eq!(store.get_settings("u1").unwrap(), Some(settings));

        assert!(store.delete_settings("u1").unwrap());
        assert!(!store.delete_settings("u1").unwrap());
    }

    #[test]
    fn test_dictionary_lookups() {
        let store = SqliteCardStore::open_in_memory().unwrap();
        store.register_reading(77, 0, ReadingKind::Kanji).unwrap();
        store.register_reading(77, 2, ReadingKind::Kana).unwrap();
        store.register_reading(77, 1, ReadingKind::Kana).unwrap();

        assert_eq!(store.reading_kind(77, 0).unwrap(), ReadingKind::Kanji);
        assert_eq!(store.reading_kind(77, 9).unwrap(), ReadingKind::Other);
        assert_eq!(store.kana_variant_index(77).unwrap(), Some(1));
        assert_eq!(store.kana_variant_index(78).unwrap(), None);
    }
}
