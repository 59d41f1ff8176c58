use super::{
    FileRecord, NewProject, Project, ProjectChanges, ProjectFilter, ProjectStore, StoreError, StoreResult,
};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;
    CREATE TABLE IF NOT EXISTS projects (
        id TEXT PRIMARY KEY,
        name TEXT UNIQUE NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        entry_file TEXT NOT NULL DEFAULT 'index.html'
    );
    CREATE TABLE IF NOT EXISTS files (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
        filename TEXT NOT NULL,
        size INTEGER NOT NULL,
        uploaded_at TEXT NOT NULL,
        UNIQUE(project_id, filename)
    );
    CREATE INDEX IF NOT EXISTS idx_projects_name ON projects(name);
    CREATE INDEX IF NOT EXISTS idx_files_project ON files(project_id);
"#;

const PROJECT_COLUMNS: &str = "id, name, created_at, updated_at, entry_file";

/// SQLite-backed metadata store. One connection, shared behind a mutex;
/// queries run on the blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Task("connection mutex poisoned".into()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        entry_file: row.get("entry_file")?,
    })
}

fn fetch_project(conn: &Connection, column: &str, value: &str) -> StoreResult<Option<Project>> {
    let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE {column} = ?1");
    Ok(conn.query_row(&sql, params![value], project_from_row).optional()?)
}

fn like_pattern(search: &str) -> String {
    let mut out = String::with_capacity(search.len() + 2);
    out.push('%');
    for c in search.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[async_trait]
impl ProjectStore for SqliteStore {
    async fn create_project(&self, new: NewProject) -> StoreResult<Project> {
        self.run(move |conn| {
            let now = Utc::now();
            conn.execute(
                "INSERT INTO projects (id, name, created_at, updated_at, entry_file) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![new.id, new.name, now, now, new.entry_file],
            )?;
            Ok(Project {
                id: new.id,
                name: new.name,
                created_at: now,
                updated_at: now,
                entry_file: new.entry_file,
            })
        })
        .await
    }

    async fn project_by_id(&self, id: &str) -> StoreResult<Option<Project>> {
        let id = id.to_string();
        self.run(move |conn| fetch_project(conn, "id", &id)).await
    }

    async fn project_by_name(&self, name: &str) -> StoreResult<Option<Project>> {
        let name = name.to_string();
        self.run(move |conn| fetch_project(conn, "name", &name)).await
    }

    async fn list_projects(&self, filter: ProjectFilter) -> StoreResult<Vec<Project>> {
        self.run(move |conn| {
            let pattern = filter.search.as_deref().map(like_pattern);
            // LIMIT -1 is unbounded in SQLite.
            let limit = filter.limit.map(i64::from).unwrap_or(-1);
            let sql = format!(
                "SELECT {PROJECT_COLUMNS} FROM projects \
                 WHERE ?1 IS NULL OR name LIKE ?1 ESCAPE '\\' \
                 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![pattern, limit], project_from_row)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }

    async fn update_project(&self, id: &str, changes: ProjectChanges) -> StoreResult<Option<Project>> {
        let id = id.to_string();
        self.run(move |conn| {
            if !changes.is_empty() {
                conn.execute(
                    "UPDATE projects SET name = COALESCE(?1, name), entry_file = COALESCE(?2, entry_file), \
                     updated_at = ?3 WHERE id = ?4",
                    params![changes.name, changes.entry_file, Utc::now(), id],
                )?;
            }
            fetch_project(conn, "id", &id)
        })
        .await
    }

    async fn delete_project(&self, id: &str) -> StoreResult<bool> {
        let id = id.to_string();
        self.run(move |conn| Ok(conn.execute("DELETE FROM projects WHERE id = ?1", params![id])? > 0))
            .await
    }

    async fn upsert_file(&self, project_id: &str, filename: &str, size: u64) -> StoreResult<FileRecord> {
        let (project_id, filename) = (project_id.to_string(), filename.to_string());
        self.run(move |conn| {
            let now = Utc::now();
            let stored_size = i64::try_from(size).map_err(|_| StoreError::Task(format!("size {size} out of range")))?;
            conn.execute(
                "INSERT INTO files (project_id, filename, size, uploaded_at) VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT(project_id, filename) DO UPDATE SET size = excluded.size, uploaded_at = excluded.uploaded_at",
                params![project_id, filename, stored_size, now],
            )?;
            Ok(FileRecord { project_id, filename, size, uploaded_at: now })
        })
        .await
    }

    async fn list_files(&self, project_id: &str) -> StoreResult<Vec<FileRecord>> {
        let project_id = project_id.to_string();
        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT project_id, filename, size, uploaded_at FROM files WHERE project_id = ?1 ORDER BY filename",
            )?;
            let rows = stmt.query_map(params![project_id], |row| {
                let size: i64 = row.get("size")?;
                Ok(FileRecord {
                    project_id: row.get("project_id")?,
                    filename: row.get("filename")?,
                    size: size.max(0) as u64,
                    uploaded_at: row.get("uploaded_at")?,
                })
            })?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
        .await
    }
}
