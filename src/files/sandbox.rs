use super::sanitize::SafePath;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("not found")]
    NotFound,
    #[error("path escapes root")]
    Escape,
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Resolve a client-requested path for serving. Both sides are canonicalized
/// (symlinks and dot segments resolved) and compared component-wise, so
/// `/data/p1` never admits `/data/p10/...`.
pub fn resolve(root: &Path, requested: &Path) -> Result<PathBuf, SandboxError> {
    let canon_path = dunce::canonicalize(root.join(requested)).map_err(|_| SandboxError::NotFound)?;
    let canon_root = dunce::canonicalize(root).map_err(|_| SandboxError::NotFound)?;
    if !canon_path.starts_with(&canon_root) {
        return Err(SandboxError::Escape);
    }
    if !canon_path.is_file() {
        return Err(SandboxError::NotFound);
    }
    Ok(canon_path)
}

/// Write `bytes` to `root/path`, creating intermediate directories. The bytes
/// land in a temporary sibling first and are renamed over the target, so a
/// dropped request never leaves a truncated file under the final name.
pub async fn write(root: &Path, path: &SafePath, bytes: &[u8]) -> Result<PathBuf, SandboxError> {
    let joined = root.join(path.as_str());
    let (Some(parent), Some(file_name)) = (joined.parent(), joined.file_name()) else {
        return Err(SandboxError::NotFound);
    };
    let target = parent.join(file_name);
    tokio::fs::create_dir_all(parent).await?;

    let (root_c, parent_c) = (root.to_path_buf(), parent.to_path_buf());
    let inside = tokio::task::spawn_blocking(move || -> io::Result<bool> {
        let canon_root = dunce::canonicalize(&root_c)?;
        let canon_parent = dunce::canonicalize(&parent_c)?;
        Ok(canon_parent.starts_with(&canon_root))
    })
    .await
    .map_err(io::Error::other)??;
    if !inside {
        return Err(SandboxError::Escape);
    }

    // Fixed-length name, so only the target's own length is limited by the filesystem.
    let tmp = parent.join(format!(".{}.part", uuid::Uuid::new_v4().simple()));
    if let Err(e) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    if let Err(e) = tokio::fs::rename(&tmp, &target).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(target)
}

/// Remove a project directory tree. A directory that is already gone is fine.
pub async fn remove_root(root: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(root).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
