//! SQLite-backed store.

use crate::error::{StorageError, StorageResult};
use crate::store::DocumentStore;
use braid_crdt::{CausalityVector, Operation, SequenceSnapshot};
use braid_types::{DocumentId, SiteId};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

/// A [`DocumentStore`] in a single SQLite file.
///
/// The operation log carries a `UNIQUE(document_id, origin_site, counter)`
/// constraint and is written with `INSERT OR IGNORE`, so replays are free.
/// Only the latest snapshot per document is kept.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened document store");
        Self::with_connection(conn)
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StorageResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS snapshots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id TEXT NOT NULL,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_snapshots_document
                ON snapshots(document_id, id);

            CREATE TABLE IF NOT EXISTS operations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                document_id TEXT NOT NULL,
                origin_site TEXT NOT NULL,
                counter INTEGER NOT NULL,
                data TEXT NOT NULL,
                UNIQUE(document_id, origin_site, counter)
            );
            ",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn to_sql_counter(counter: u64) -> StorageResult<i64> {
    i64::try_from(counter)
        .map_err(|_| StorageError::InvalidData(format!("counter {counter} out of range")))
}

impl<T> DocumentStore<T> for SqliteStore
where
    T: Serialize + DeserializeOwned + Send + Sync,
{
    fn save_snapshot(
        &self,
        document: &DocumentId,
        snapshot: &SequenceSnapshot<T>,
    ) -> StorageResult<()> {
        let data = serde_json::to_string(snapshot)?;
        let mut conn = self.conn.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO snapshots (document_id, data) VALUES (?1, ?2)",
            params![document.to_string(), data],
        )?;
        let latest = tx.last_insert_rowid();
        tx.execute(
            "DELETE FROM snapshots WHERE document_id = ?1 AND id < ?2",
            params![document.to_string(), latest],
        )?;
        tx.commit()?;
        debug!(%document, elements = snapshot.elements.len(), "saved snapshot");
        Ok(())
    }

    fn load_latest_snapshot(
        &self,
        document: &DocumentId,
    ) -> StorageResult<Option<SequenceSnapshot<T>>> {
        let conn = self.conn.lock()?;
        let data: Option<String> = conn
            .query_row(
                "SELECT data FROM snapshots WHERE document_id = ?1 ORDER BY id DESC LIMIT 1",
                params![document.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        match data {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn append_operation(&self, document: &DocumentId, op: &Operation<T>) -> StorageResult<bool> {
        let data = serde_json::to_string(op)?;
        let conn = self.conn.lock()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO operations (document_id, origin_site, counter, data)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                document.to_string(),
                op.origin_site().to_string(),
                to_sql_counter(op.counter())?,
                data,
            ],
        )?;
        Ok(inserted == 1)
    }

    fn operations_since(
        &self,
        document: &DocumentId,
        vector: &CausalityVector,
    ) -> StorageResult<Vec<Operation<T>>> {
        let conn = self.conn.lock()?;
        let mut stmt = conn.prepare(
            "SELECT origin_site, counter, data FROM operations WHERE document_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![document.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut operations = Vec::new();
        for row in rows {
            let (site, counter, data) = row?;
            let site = SiteId::parse(&site)
                .map_err(|e| StorageError::InvalidData(format!("bad origin site {site}: {e}")))?;
            let counter = u64::try_from(counter)
                .map_err(|_| StorageError::InvalidData(format!("negative counter {counter}")))?;
            if vector.covers(&site, counter) {
                continue;
            }
            operations.push(serde_json::from_str(&data)?);
        }
        Ok(operations)
    }
}
