use super::HostingService;
use crate::{
    errors::{AppError, AppResult},
    files::{sandbox, SandboxError},
};
use std::path::{Path, PathBuf};

/// A file ready to be streamed back, with its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Served {
    pub path: PathBuf,
    pub content_type: String,
}

impl Served {
    fn new(path: PathBuf) -> Self {
        let content_type = mime_guess::from_path(&path).first_or_octet_stream().essence_str().to_string();
        Self { path, content_type }
    }
}

impl HostingService {
    pub async fn resolve_entry(&self, id_or_name: &str) -> AppResult<Served> {
        let project = self.require_lookup(id_or_name).await?;
        let path = self.project_root(&project.id).join(&project.entry_file);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(Served::new(path)),
            _ => Err(AppError::NotFound(format!("entry file '{}' not found", project.entry_file))),
        }
    }

    pub async fn resolve_file(&self, id_or_name: &str, sub_path: &str) -> AppResult<Served> {
        let project = self.require_lookup(id_or_name).await?;
        let root = self.project_root(&project.id);
        let requested = sub_path.to_string();
        let resolved = tokio::task::spawn_blocking(move || sandbox::resolve(&root, Path::new(&requested))).await?;
        match resolved {
            Ok(path) => Ok(Served::new(path)),
            Err(SandboxError::NotFound) => Err(AppError::NotFound(format!("file '{sub_path}' not found"))),
            Err(SandboxError::Escape) => {
                tracing::warn!(project_id = %project.id, sub_path = %sub_path, "sandbox escape blocked");
                Err(AppError::Forbidden)
            }
            Err(e) => Err(e.into()),
        }
    }
}
