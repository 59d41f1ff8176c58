use super::HostingService;
use crate::{
    errors::{AppError, AppResult},
    files::{sandbox, sanitize},
};
use bytes::Bytes;
use serde::Serialize;

/// One part of a multipart batch: client filename plus payload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Bytes,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct UploadSummary {
    pub uploaded: Vec<String>,
    pub total_size: u64,
}

impl HostingService {
    /// Store a batch of files under the project's root.
    ///
    /// The size ceiling is checked against the whole batch before anything is
    /// written. Filenames are checked one at a time: a bad name aborts the rest
    /// of the batch, and files already stored by this call stay in place.
    pub async fn upload(&self, project_id: &str, files: Vec<UploadedFile>) -> AppResult<UploadSummary> {
        self.require_by_id(project_id).await?;

        let total_size: u64 = files.iter().map(|f| f.bytes.len() as u64).sum();
        self.limit.check_total(total_size)?;

        let root = self.project_root(project_id);
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| AppError::Internal(format!("creating project directory: {e}")))?;

        let mut uploaded = Vec::with_capacity(files.len());
        for file in files {
            let path = match sanitize(&file.filename) {
                Ok(path) => path,
                Err(reason) => {
                    tracing::warn!(
                        project_id = %project_id,
                        filename = ?file.filename,
                        reason = %reason,
                        stored_before_abort = uploaded.len(),
                        "upload batch aborted on invalid filename"
                    );
                    return Err(AppError::BadRequest(format!("invalid filename {:?}: {reason}", file.filename)));
                }
            };
            sandbox::write(&root, &path, &file.bytes).await?;
            self.store
                .upsert_file(project_id, path.as_str(), file.bytes.len() as u64)
                .await?;
            uploaded.push(path.into_string());
        }

        tracing::info!(project_id = %project_id, files = uploaded.len(), total_size, "files uploaded");
        Ok(UploadSummary { uploaded, total_size })
    }
}
