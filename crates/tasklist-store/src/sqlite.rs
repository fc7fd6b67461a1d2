//! Local SQLite task store.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags, Row, params};
use tasklist_types::{SubjectId, Task, TaskId};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::store::{TaskStore, validate_text};

/// Current schema version for migrations.
const SCHEMA_VERSION: i32 = 1;

const SELECT_COLUMNS: &str = "id, text, completed, created_at, owner_id";

/// Task store backed by SQLite.
///
/// The connection is serialized behind a mutex; statements are short and
/// run inline on the calling task.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|_| StoreError::Database(rusqlite::Error::InvalidPath(path.into())))?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_FULL_MUTEX,
        )?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;

        info!("Task store opened at {:?}", path);
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;

        debug!("In-memory task store created");
        Ok(store)
    }

    /// Count all rows for an owner.
    pub fn count_for_owner(&self, owner: &SubjectId) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE owner_id = ?1",
            params![owner.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        let current_version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if current_version >= SCHEMA_VERSION {
            debug!("Schema up to date (version {})", current_version);
            return Ok(());
        }

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                text TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tasks_owner_created
                ON tasks(owner_id, created_at);
            "#,
        )?;

        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        info!("Schema created (version {})", SCHEMA_VERSION);
        Ok(())
    }

    fn row_to_task(row: &Row<'_>) -> Result<Task> {
        let id: String = row.get(0)?;
        let text: String = row.get(1)?;
        let completed: bool = row.get(2)?;
        let created_at: String = row.get(3)?;
        let owner_id: String = row.get(4)?;

        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StoreError::InvalidData(format!("created_at for task {}: {}", id, e)))?
            .with_timezone(&Utc);

        Ok(Task {
            id: TaskId::new(id),
            text,
            completed,
            created_at,
            owner_id: SubjectId::new(owner_id),
        })
    }

    fn fetch_one(conn: &Connection, owner: &SubjectId, id: &TaskId) -> Result<Option<Task>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tasks WHERE id = ?1 AND owner_id = ?2",
            SELECT_COLUMNS
        ))?;
        let mut rows = stmt.query(params![id.as_str(), owner.as_str()])?;
        match rows.next()? {
            Some(row) => Ok(Some(Self::row_to_task(row)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl TaskStore for SqliteStore {
    async fn list_tasks(&self, owner: &SubjectId) -> Result<Vec<Task>> {
        let conn = self.conn.lock();

        // rowid breaks ties between tasks created in the same instant.
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tasks WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
            SELECT_COLUMNS
        ))?;
        let mut rows = stmt.query(params![owner.as_str()])?;

        let mut tasks = Vec::new();
        while let Some(row) = rows.next()? {
            tasks.push(Self::row_to_task(row)?);
        }
        Ok(tasks)
    }

    async fn create_task(&self, owner: &SubjectId, text: &str) -> Result<Task> {
        let text = validate_text(text)?;

        let task = Task {
            id: TaskId::generate(),
            text: text.to_string(),
            completed: false,
            created_at: Utc::now(),
            owner_id: owner.clone(),
        };

        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO tasks (id, owner_id, text, completed, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                task.id.as_str(),
                task.owner_id.as_str(),
                task.text,
                task.completed,
                task.created_at.to_rfc3339_opts(SecondsFormat::Nanos, true),
            ],
        )?;

        debug!(task_id = %task.id, owner = %owner, "Inserted task");
        Ok(task)
    }

    async fn delete_task(&self, owner: &SubjectId, id: &TaskId) -> Result<bool> {
        let conn = self.conn.lock();
        let rows_affected = conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND owner_id = ?2",
            params![id.as_str(), owner.as_str()],
        )?;

        debug!(task_id = %id, owner = %owner, rows_affected, "Deleted task");
        Ok(rows_affected > 0)
    }

    async fn set_completed(
        &self,
        owner: &SubjectId,
        id: &TaskId,
        completed: bool,
    ) -> Result<Option<Task>> {
        let conn = self.conn.lock();
        let rows_affected = conn.execute(
            "UPDATE tasks SET completed = ?3 WHERE id = ?1 AND owner_id = ?2",
            params![id.as_str(), owner.as_str(), completed],
        )?;

        if rows_affected == 0 {
            return Ok(None);
        }
        Self::fetch_one(&conn, owner, id)
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
