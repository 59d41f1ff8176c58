//! Project hosting operations on top of the metadata store and the
//! sandboxed file layer.

pub mod projects;
pub mod resolve;
pub mod upload;

use crate::{
    config::Config,
    errors::{AppError, AppResult},
    files::UploadLimit,
    store::{DynStore, Project},
};
use std::path::PathBuf;

pub use projects::{CreateProject, ProjectList, UpdateProject};
pub use resolve::Served;
pub use upload::{UploadSummary, UploadedFile};

pub struct HostingService {
    store: DynStore,
    projects_dir: PathBuf,
    limit: UploadLimit,
    id_length: usize,
    id_attempts: u32,
}

impl HostingService {
    pub fn new(cfg: &Config, store: DynStore) -> Self {
        Self {
            store,
            projects_dir: cfg.storage.projects_dir(),
            limit: UploadLimit::new(cfg.limits.max_upload_bytes),
            id_length: cfg.projects.id_length,
            id_attempts: cfg.projects.id_attempts,
        }
    }

    pub fn upload_limit(&self) -> UploadLimit {
        self.limit
    }

    /// Sandbox directory owned by project `id`.
    pub fn project_root(&self, id: &str) -> PathBuf {
        self.projects_dir.join(id)
    }

    /// Find a project by id or by name. Keys with the id length try the id
    /// first; everything falls back to the name.
    pub async fn lookup(&self, id_or_name: &str) -> AppResult<Option<Project>> {
        if id_or_name.chars().count() == self.id_length {
            if let Some(project) = self.store.project_by_id(id_or_name).await? {
                return Ok(Some(project));
            }
        }
        Ok(self.store.project_by_name(id_or_name).await?)
    }

    async fn require_lookup(&self, id_or_name: &str) -> AppResult<Project> {
        self.lookup(id_or_name)
            .await?
            .ok_or_else(|| not_found(id_or_name))
    }

    async fn require_by_id(&self, id: &str) -> AppResult<Project> {
        self.store.project_by_id(id).await?.ok_or_else(|| not_found(id))
    }
}

fn not_found(key: &str) -> AppError {
    AppError::NotFound(format!("project '{key}' not found"))
}
