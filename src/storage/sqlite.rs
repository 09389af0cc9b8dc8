//! SQLite thread table.

use rusqlite::{Connection, params};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::ThreadStore;
use crate::domain::Thread;
use crate::error::{Result, SchedulerError};

const DB_FILE: &str = "threads.db";

/// One row per thread, full record kept as JSON.
///
/// `rusqlite::Connection` is not `Sync`, so it sits behind a mutex.
pub struct SqliteThreadStore {
    db: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteThreadStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteThreadStore").finish_non_exhaustive()
    }
}

impl SqliteThreadStore {
    /// Open or create the database inside `dir`.
    pub fn open_at(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let db = Connection::open(dir.join(DB_FILE))?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    #[cfg(test)]
    pub(crate) fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db: Mutex::new(db) })
    }

    fn init_schema(db: &Connection) -> Result<()> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS threads (
                id INTEGER PRIMARY KEY,
                status TEXT NOT NULL,
                progress INTEGER NOT NULL,
                importance INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                json_data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_threads_status ON threads(status);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|e| SchedulerError::Storage(e.to_string()))
    }

    fn upsert(db: &Connection, thread: &Thread) -> Result<()> {
        let json_data = serde_json::to_string(thread)?;
        let id = i64::try_from(thread.id().get())
            .map_err(|_| SchedulerError::Storage(format!("Thread id {} out of range", thread.id())))?;

        db.execute(
            r#"
            INSERT OR REPLACE INTO threads
            (id, status, progress, importance, updated_at, json_data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                id,
                thread.status().as_str(),
                thread.progress(),
                thread.importance(),
                thread.updated_at(),
                json_data,
            ],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn count_by_status(&self, status: crate::domain::ThreadStatus) -> Result<usize> {
        let db = self.lock()?;
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM threads WHERE status = ?1",
            [status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

impl ThreadStore for SqliteThreadStore {
    fn load_all(&self) -> Result<Vec<Thread>> {
        let db = self.lock()?;
        let mut stmt = db.prepare("SELECT json_data FROM threads ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            let json: String = row.get(0)?;
            Ok(json)
        })?;

        let mut threads = Vec::new();
        for row in rows {
            let json = row?;
            threads.push(serde_json::from_str(&json)?);
        }
        Ok(threads)
    }

    fn save(&self, thread: &Thread) -> Result<()> {
        let db = self.lock()?;
        Self::upsert(&db, thread)
    }

    fn save_all(&self, threads: &[Thread]) -> Result<()> {
        let mut db = self.lock()?;
        let tx = db.transaction()?;
        for thread in threads {
            Self::upsert(&tx, thread)?;
        }
        tx.commit()?;
        Ok(())
    }
}
