use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::archive::{rank_by_relevance, CardRecord, MemoryArchive};
use crate::error::DispatchError;
use crate::syntax::CardRef;

/// Minimum schema version we know how to handle.
///
/// `0` means "no schema yet" (fresh DB).
const MIN_SUPPORTED_SCHEMA_VERSION: i32 = 0;

/// Latest schema version this crate knows about.
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Error type for archive database operations.
#[derive(Debug, Error)]
pub enum DbError {
    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The database was created with a newer schema version than we support.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },

    /// A card with this id already exists.
    #[error("memory card '{0}' already exists")]
    DuplicateCard(String),
}

/// Convenience result type for DB operations.
pub type DbResult<T> = Result<T, DbError>;

/// SQLite-backed memory archive.
///
/// Thin wrapper around `rusqlite::Connection` that opens the file, applies
/// schema migrations and answers card lookups.
#[derive(Debug)]
pub struct ArchiveDb {
    conn: Connection,
}

impl ArchiveDb {
    /// Open (or create) an archive database at the given path and ensure the schema exists.
    pub fn open(path: &Path) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        apply_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Expose a reference to the underlying connection for advanced callers.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Insert a card and return its row id.
    pub fn insert_card(&self, card: &CardRecord) -> DbResult<i64> {
        if self.get_card(&card.id)?.is_some() {
            return Err(DbError::DuplicateCard(card.id.clone()));
        }
        self.conn.execute(
            r#"
            INSERT INTO cards (card_id, topic, content, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![card.id, card.topic, card.content, card.created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Fetch one card by id.
    pub fn get_card(&self, id: &str) -> DbResult<Option<CardRecord>> {
        let card = self
            .conn
            .query_row(
                "SELECT card_id, topic, content, created_at FROM cards WHERE card_id = ?1",
                params![id],
                card_from_row,
            )
            .optional()?;
        Ok(card)
    }

    /// List all cards in insertion order.
    pub fn list_cards(&self) -> DbResult<Vec<CardRecord>> {
        self.query_cards(
            "SELECT card_id, topic, content, created_at FROM cards ORDER BY id",
            params![],
        )
    }

    /// The `limit` most recently inserted cards, newest first.
    pub fn latest_cards(&self, limit: usize) -> DbResult<Vec<CardRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.query_cards(
            "SELECT card_id, topic, content, created_at FROM cards ORDER BY id DESC LIMIT ?1",
            params![limit],
        )
    }

    fn query_cards(&self, sql: &str, args: &[&dyn rusqlite::ToSql]) -> DbResult<Vec<CardRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(args, card_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn lookup_db(&self, selector: &CardRef, topic: &str) -> DbResult<Vec<CardRecord>> {
        match selector {
            CardRef::Id(id) => Ok(self.get_card(id)?.into_iter().collect()),
            CardRef::Latest(n) => self.latest_cards(*n),
            CardRef::TopicRelevant => Ok(rank_by_relevance(self.list_cards()?, topic)),
            CardRef::TopRelevant(k) => {
                Ok(rank_by_relevance(self.list_cards()?, topic).into_iter().take(*k).collect())
            }
        }
    }
}

impl MemoryArchive for ArchiveDb {
    fn lookup(&self, selector: &CardRef, topic: &str) -> Result<Vec<CardRecord>, DispatchError> {
        self.lookup_db(selector, topic).map_err(|err| DispatchError::Failed(err.to_string()))
    }
}

fn card_from_row(row: &Row<'_>) -> rusqlite::Result<CardRecord> {
    Ok(CardRecord {
        id: row.get(0)?,
        topic: row.get(1)?,
        content: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn apply_migrations(conn: &Connection) -> DbResult<()> {
    let mut current_version = current_schema_version(conn)?;

    // Reject DBs created with a newer schema than we support.
    if current_version > CURRENT_SCHEMA_VERSION {
        return Err(DbError::UnsupportedSchemaVersion {
            found: current_version,
            min_supported: MIN_SUPPORTED_SCHEMA_VERSION,
            max_supported: CURRENT_SCHEMA_VERSION,
        });
    }

    if current_version == 0 {
        // Initial schema.
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE TABLE IF NOT EXISTS cards (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                card_id    TEXT NOT NULL UNIQUE,
                topic      TEXT NOT NULL,
                content    TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            PRAGMA user_version = 1;
            COMMIT;
            "#,
        )?;
        current_version = 1;
    }

    if current_version < 2 {
        conn.execute_batch(
            r#"
            BEGIN;
            CREATE INDEX IF NOT EXISTS idx_cards_topic ON cards (topic);
            PRAGMA user_version = 2;
            COMMIT;
            "#,
        )?;
    }

    Ok(())
}

/// Read `PRAGMA user_version` from the connection.
pub fn current_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    Ok(version)
}
