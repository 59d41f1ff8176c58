use crate::files::limits::DEFAULT_MAX_UPLOAD_BYTES;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub storage: Storage,
    pub limits: Limits,
    pub projects: Projects,
    pub logging: Logging,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Server {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self { bind_addr: "0.0.0.0".to_string(), port: 8000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Storage {
    pub data_dir: PathBuf,
    /// Optional directory of web UI assets served for unmatched routes.
    pub ui_dir: Option<PathBuf>,
}

impl Default for Storage {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("./data"), ui_dir: None }
    }
}

impl Storage {
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("embedhost.db")
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.data_dir.join("projects")
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Limits {
    pub max_upload_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Projects {
    pub id_length: usize,
    pub id_attempts: u32,
}

impl Default for Projects {
    fn default() -> Self {
        Self { id_length: 6, id_attempts: 10 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Logging {
    pub format: LogFormat,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Ok(serde_json::from_str(&raw)?)
        } else {
            Ok(toml::from_str(&raw)?)
        }
    }

    /// Apply `EMBEDHOST_HOST`, `EMBEDHOST_PORT` and `EMBEDHOST_DATA_DIR`.
    pub fn apply_env(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(&mut self, get: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(host) = get("EMBEDHOST_HOST") {
            self.server.bind_addr = host;
        }
        if let Some(port) = get("EMBEDHOST_PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("EMBEDHOST_PORT={port:?}: {e}"))?;
        }
        if let Some(dir) = get("EMBEDHOST_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 { anyhow::bail!("port must be > 0"); }
        if self.limits.max_upload_bytes == 0 { anyhow::bail!("max_upload_bytes must be > 0"); }
        if !(4..=32).contains(&self.projects.id_length) { anyhow::bail!("id_length must be between 4 and 32"); }
        if self.projects.id_attempts == 0 { anyhow::bail!("id_attempts must be > 0"); }
        if let Some(ui) = &self.storage.ui_dir {
            if !ui.is_dir() {
                anyhow::bail!("ui_dir does not exist or is not a directory: {}", ui.display());
            }
        }
        Ok(())
    }
}
