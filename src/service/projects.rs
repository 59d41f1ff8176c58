use super::HostingService;
use crate::{
    errors::{AppError, AppResult},
    files::{sandbox, sanitize},
    ids,
    store::{FileRecord, NewProject, Project, ProjectChanges, ProjectFilter, DEFAULT_ENTRY_FILE},
};
use serde::{Deserialize, Serialize};

const MAX_NAME_CHARS: usize = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateProject {
    pub name: String,
    #[serde(default)]
    pub entry_file: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProject {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub entry_file: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProjectList {
    pub projects: Vec<Project>,
    pub total: usize,
}

fn validate_name(name: &str) -> AppResult<()> {
    let len = name.chars().count();
    if len == 0 || len > MAX_NAME_CHARS {
        return Err(AppError::BadRequest(format!(
            "project name must be 1-{MAX_NAME_CHARS} characters"
        )));
    }
    Ok(())
}

// The entry file is joined onto the project root without a sandbox check
// when served, so it has to be a clean relative path before it is stored.
fn normalize_entry_file(entry: &str) -> AppResult<String> {
    sanitize(entry)
        .map(|p| p.into_string())
        .map_err(|r| AppError::BadRequest(format!("invalid entry file: {r}")))
}

impl HostingService {
    pub async fn create_project(&self, req: CreateProject) -> AppResult<Project> {
        validate_name(&req.name)?;
        let entry_file = normalize_entry_file(req.entry_file.as_deref().unwrap_or(DEFAULT_ENTRY_FILE))?;

        if self.store.project_by_name(&req.name).await?.is_some() {
            return Err(AppError::Conflict(format!("project with name '{}' already exists", req.name)));
        }

        let id = ids::generate_unique_id(&*self.store, self.id_length, self.id_attempts)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!("no unique project id after {} attempts", self.id_attempts))
            })?;

        let project = self
            .store
            .create_project(NewProject { id, name: req.name, entry_file })
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => AppError::Conflict("project name already exists".into()),
                other => other,
            })?;

        tokio::fs::create_dir_all(self.project_root(&project.id))
            .await
            .map_err(|e| AppError::Internal(format!("creating project directory: {e}")))?;

        tracing::info!(project_id = %project.id, name = %project.name, "project created");
        Ok(project)
    }

    pub async fn list_projects(&self, search: Option<String>, limit: Option<u32>) -> AppResult<ProjectList> {
        let filter = ProjectFilter {
            search: search.filter(|s| !s.is_empty()),
            limit: limit.filter(|l| *l > 0),
        };
        let projects = self.store.list_projects(filter).await?;
        Ok(ProjectList { total: projects.len(), projects })
    }

    pub async fn get_project(&self, id_or_name: &str) -> AppResult<Project> {
        self.require_lookup(id_or_name).await
    }

    pub async fn update_project(&self, id: &str, req: UpdateProject) -> AppResult<Project> {
        self.require_by_id(id).await?;

        if let Some(name) = &req.name {
            validate_name(name)?;
            if let Some(other) = self.store.project_by_name(name).await? {
                if other.id != id {
                    return Err(AppError::Conflict(format!("project with name '{name}' already exists")));
                }
            }
        }
        let entry_file = req.entry_file.as_deref().map(normalize_entry_file).transpose()?;

        let changes = ProjectChanges { name: req.name, entry_file };
        self.store
            .update_project(id, changes)
            .await?
            .ok_or_else(|| super::not_found(id))
    }

    pub async fn delete_project(&self, id: &str) -> AppResult<()> {
        self.require_by_id(id).await?;
        self.store.delete_project(id).await?;

        let root = self.project_root(id);
        if let Err(e) = sandbox::remove_root(&root).await {
            tracing::warn!(project_id = %id, error = %e, "project directory cleanup failed");
        }
        tracing::info!(project_id = %id, "project deleted");
        Ok(())
    }

    pub async fn list_files(&self, id: &str) -> AppResult<Vec<FileRecord>> {
        self.require_by_id(id).await?;
        Ok(self.store.list_files(id).await?)
    }
}
