//! Utility functions for CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use analyst_cluster::{Engine, RedbStore};
use anyhow::Context;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::Cli;
use crate::config::load_config;

/// Opens the engine over the configured database.
pub fn open_engine(cli: &Cli) -> anyhow::Result<Engine> {
    let cfg = load_config(cli.config.as_deref())?;
    let db = match &cli.db {
        Some(p) => PathBuf::from(p),
        None => cfg.db_path(),
    };
    if let Some(parent) = db.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let store = RedbStore::open(&db).with_context(|| format!("open {}", db.display()))?;
    debug!(db = %db.display(), "opened store");
    Ok(Engine::new(cfg.engine, Arc::new(store))?)
}

/// Loads a request from a YAML or JSON file.
pub fn load_request<T: DeserializeOwned>(path: &str) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read {path}"))?;
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("yaml");

    let result = match ext.to_lowercase().as_str() {
        "json" => serde_json::from_str(&content)?,
        _ => serde_yaml::from_str(&content)?,
    };
    Ok(result)
}

/// Requires input file to be provided.
pub fn require_input_file(cli: &Cli) -> anyhow::Result<&str> {
    cli.input
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("input file is required, use -f flag"))
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: Serialize>(result: &T, cli: &Cli) -> anyhow::Result<()> {
    let output = if cli.json {
        serde_json::to_string_pretty(result)?
    } else {
        serde_yaml::to_string(result)?
    };

    match cli.output.as_deref() {
        Some(path) => std::fs::write(path, output)?,
        None => print!("{output}"),
    }
    Ok(())
}
