//! SQLite-backed archive store.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::warn;

use crate::ticket::Ticket;

use super::{ArchiveError, ArchiveStore};

/// SQLite-backed archive store.
pub struct SqliteArchiveStore {
    conn: Mutex<Connection>,
}

impl SqliteArchiveStore {
    /// Create a new SQLite archive store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, ArchiveError> {
        let conn = Connection::open(path).map_err(|e| ArchiveError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite archive store (useful for testing).
    pub fn in_memory() -> Result<Self, ArchiveError> {
        let conn =
            Connection::open_in_memory().map_err(|e| ArchiveError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), ArchiveError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS archived_tickets (
                submitted_by_email TEXT NOT NULL,
                ticket_id TEXT NOT NULL,
                record TEXT NOT NULL,
                archived_at TEXT NOT NULL,
                PRIMARY KEY (submitted_by_email, ticket_id)
            );

            CREATE INDEX IF NOT EXISTS idx_archived_tickets_archived_at
                ON archived_tickets(archived_at);
            "#,
        )
        .map_err(|e| ArchiveError::Database(e.to_string()))
    }
}

#[async_trait]
impl ArchiveStore for SqliteArchiveStore {
    async fn put(&self, email: &str, id: &str, ticket: &Ticket) -> Result<(), ArchiveError> {
        let record =
            serde_json::to_string(ticket).map_err(|e| ArchiveError::Encode(e.to_string()))?;
        let archived_at = Utc::now().to_rfc3339();

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO archived_tickets (submitted_by_email, ticket_id, record, archived_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(submitted_by_email, ticket_id)
                DO UPDATE SET record = excluded.record, archived_at = excluded.archived_at
            "#,
            params![email, id, record, archived_at],
        )
        .map_err(|e| ArchiveError::Database(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, email: &str, id: &str) -> Result<Option<Ticket>, ArchiveError> {
        let conn = self.conn.lock().unwrap();
        let record: Option<String> = conn
            .query_row(
                "SELECT record FROM archived_tickets WHERE submitted_by_email = ?1 AND ticket_id = ?2",
                params![email, id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ArchiveError::Database(e.to_string()))?;

        match record {
            Some(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| ArchiveError::Database(format!("Corrupt archive record: {}", e))),
            None => Ok(None),
        }
    }

    async fn list_for_user(&self, email: &str) -> Result<Vec<Ticket>, ArchiveError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                r#"
                SELECT ticket_id, record FROM archived_tickets
                WHERE submitted_by_email = ?1
                ORDER BY archived_at ASC, ticket_id ASC
                "#,
            )
            .map_err(|e| ArchiveError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![email], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .map_err(|e| ArchiveError::Database(e.to_string()))?;

        let mut tickets = Vec::new();
        for row in rows {
            let (id, json) = row.map_err(|e| ArchiveError::Database(e.to_string()))?;
            match serde_json::from_str::<Ticket>(&json) {
                Ok(ticket) => tickets.push(ticket),
                Err(e) => warn!(ticket_id = %id, error = %e, "Skipping corrupt archive record"),
            }
        }
        Ok(tickets)
    }
}
