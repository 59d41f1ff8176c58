pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub use sqlite::SqliteStore;

pub const DEFAULT_ENTRY_FILE: &str = "index.html";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Project {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub entry_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileRecord {
    #[serde(skip)]
    pub project_id: String,
    pub filename: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub id: String,
    pub name: String,
    pub entry_file: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub entry_file: Option<String>,
}

impl ProjectChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.entry_file.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    /// Case-insensitive substring of the project name.
    pub search: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("constraint violated: {0}")]
    Conflict(String),
    #[error("database error: {0}")]
    Database(rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store task failed: {0}")]
    Task(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, msg) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
                StoreError::Conflict(msg.clone().unwrap_or_else(|| e.to_string()))
            }
            _ => StoreError::Database(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

pub type DynStore = Arc<dyn ProjectStore + Send + Sync + 'static>;

/// Project and file metadata persistence. Each call commits on its own.
#[async_trait]
pub trait ProjectStore {
    async fn create_project(&self, new: NewProject) -> StoreResult<Project>;
    async fn project_by_id(&self, id: &str) -> StoreResult<Option<Project>>;
    async fn project_by_name(&self, name: &str) -> StoreResult<Option<Project>>;
    /// Newest first.
    async fn list_projects(&self, filter: ProjectFilter) -> StoreResult<Vec<Project>>;
    /// `None` when no project has this id.
    async fn update_project(&self, id: &str, changes: ProjectChanges) -> StoreResult<Option<Project>>;
    /// Cascades to the project's file records. Returns whether a row was removed.
    async fn delete_project(&self, id: &str) -> StoreResult<bool>;
    /// Insert or refresh size and timestamp for `(project_id, filename)`.
    async fn upsert_file(&self, project_id: &str, filename: &str, size: u64) -> StoreResult<FileRecord>;
    /// Ordered by filename.
    async fn list_files(&self, project_id: &str) -> StoreResult<Vec<FileRecord>>;
}
