//! Configuration for clusterctl.
//!
//! Stored in ~/.analyst/clusterctl/config.yaml:
//!
//! ```yaml
//! db: /var/lib/analyst/clusters.redb
//! engine:
//!   dim: 768
//!   duplicate_threshold: 0.9
//!   cluster_threshold: 0.75
//! ```
//!
//! Every key is optional. Without `db`, the database sits next to the
//! config file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".analyst";
/// Application directory under the base directory.
pub const APP_NAME: &str = "clusterctl";
/// Configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Database filename used when `db` is not set.
pub const DEFAULT_DB_FILE: &str = "clusters.redb";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Path to the redb database file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db: Option<PathBuf>,

    /// Engine settings.
    #[serde(default)]
    pub engine: analyst_cluster::Config,

    /// Path the config was loaded from (not serialized).
    #[serde(skip)]
    config_path: PathBuf,
}

impl Config {
    /// Gets the default config directory.
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(APP_NAME))
    }

    /// Gets the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        Self::default_config_dir().map(|dir| dir.join(DEFAULT_CONFIG_FILE))
    }

    /// The database path: `db` if set, otherwise beside the config file.
    pub fn db_path(&self) -> PathBuf {
        match &self.db {
            Some(db) => db.clone(),
            None => self
                .config_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join(DEFAULT_DB_FILE),
        }
    }
}

/// Loads the configuration from `custom_path` or the default location.
/// A missing file yields the defaults.
pub fn load_config(custom_path: Option<&str>) -> anyhow::Result<Config> {
    let config_path = match custom_path {
        Some(p) => PathBuf::from(p),
        None => Config::default_config_path()
            .ok_or_else(|| anyhow::anyhow!("cannot determine config path"))?,
    };

    let mut cfg: Config = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        serde_yaml::from_str(&content)?
    } else {
        Config::default()
    };
    cfg.config_path = config_path;
    cfg.engine.validate()?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::{NamedTempFile, tempdir};

    use super::*;

    #[test]
    fn test_load_partial_config() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(file, "db: /tmp/x.redb\nengine:\n  dim: 4\n  cluster_threshold: 0.8").unwrap();

        let cfg = load_config(file.path().to_str()).unwrap();
        assert_eq!(cfg.db_path(), PathBuf::from("/tmp/x.redb"));
        assert_eq!(cfg.engine.dim, 4);
        assert!((cfg.engine.cluster_threshold - 0.8).abs() < 1e-6);
        assert_eq!(cfg.engine.duplicate_limit, 10);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let cfg = load_config(path.to_str()).unwrap();
        assert_eq!(cfg.engine, analyst_cluster::Config::default());
        assert_eq!(cfg.db_path(), dir.path().join(DEFAULT_DB_FILE));
    }

    #[test]
    fn test_invalid_engine_config_rejected() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        writeln!(file, "engine:\n  duplicate_threshold: 0.5").unwrap();
        assert!(load_config(file.path().to_str()).is_err());
    }
}
