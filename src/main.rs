mod config;
mod errors;
mod files;
mod ids;
mod logging;
mod server;
mod service;
mod store;

use crate::{config::Config, service::HostingService, store::SqliteStore};
use anyhow::Context;
use std::{path::PathBuf, sync::Arc};
use tracing::info;

const DEFAULT_CONFIG: &str = "embedhost.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                if i >= args.len() { eprintln!("--config requires a path"); std::process::exit(2); }
                config_path = Some(PathBuf::from(&args[i]));
            }
            other => { eprintln!("unknown argument: {other}"); std::process::exit(2); }
        }
        i += 1;
    }

    // An explicit --config must exist; the default file is optional.
    let mut cfg = match &config_path {
        Some(path) => Config::load(path).with_context(|| format!("loading config {}", path.display()))?,
        None if PathBuf::from(DEFAULT_CONFIG).is_file() => {
            Config::load(&PathBuf::from(DEFAULT_CONFIG)).context("loading config")?
        }
        None => Config::default(),
    };
    cfg.apply_env().context("applying environment overrides")?;
    cfg.validate().context("validating config")?;

    logging::init(cfg.logging.format);

    let db_path = cfg.storage.db_path();
    let store = SqliteStore::open(&db_path).with_context(|| format!("opening store {}", db_path.display()))?;
    let projects_dir = cfg.storage.projects_dir();
    std::fs::create_dir_all(&projects_dir)
        .with_context(|| format!("creating projects dir {}", projects_dir.display()))?;

    let service = HostingService::new(&cfg, Arc::new(store));
    info!(
        addr = %format!("{}:{}", cfg.server.bind_addr, cfg.server.port),
        data_dir = %cfg.storage.data_dir.display(),
        max_upload_bytes = cfg.limits.max_upload_bytes,
        "embedhost ready"
    );

    server::serve(server::AppState::new(cfg, service)).await?;
    info!("store closed, exiting");
    Ok(())
}
