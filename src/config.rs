//! Server configuration.
//!
//! Loaded from a JSON file (path from `--config` or `MODSTACK_CONFIG`), then
//! adjusted by environment overrides. Relative paths in the file are resolved
//! against the file's directory so a config can travel with its data.

use crate::bootstrap::ReconcilePolicy;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "MODSTACK_CONFIG";
pub const STORE_DIR_ENV: &str = "MODSTACK_STORE_DIR";
pub const LOG_ENV: &str = "MODSTACK_LOG";

const DEFAULT_STORE_DIR: &str = "data";
const DEFAULT_LOG_FILTER: &str = "modstack=info";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Module manifests registered into the catalog at startup.
    pub module_manifests: Vec<PathBuf>,
    /// JSON list of issued client certificates.
    pub operators_file: Option<PathBuf>,
    /// JSON list of workspace records.
    pub workspaces_file: Option<PathBuf>,
    /// Root directory of the listener store.
    pub store_dir: PathBuf,
    pub reconcile_policy: ReconcilePolicy,
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            module_manifests: Vec::new(),
            operators_file: None,
            workspaces_file: None,
            store_dir: PathBuf::from(DEFAULT_STORE_DIR),
            reconcile_policy: ReconcilePolicy::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ServerConfig {
    /// Parse a config file and resolve its relative paths.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: ServerConfig = serde_json::from_str(&data)
            .with_context(|| format!("parsing config {}", path.display()))?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    /// Load from `explicit`, else from `MODSTACK_CONFIG`, else defaults; then apply env overrides.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        let from_env = env::var_os(CONFIG_ENV)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);
        let mut config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(dir) = env::var_os(STORE_DIR_ENV).filter(|v| !v.is_empty()) {
            self.store_dir = PathBuf::from(dir);
        }
        if let Ok(filter) = env::var(LOG_ENV) {
            if !filter.trim().is_empty() {
                self.log_filter = filter;
            }
        }
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        self.module_manifests.iter_mut().for_each(resolve);
        self.operators_file.iter_mut().for_each(resolve);
        self.workspaces_file.iter_mut().for_each(resolve);
        resolve(&mut self.store_dir);
    }
}
