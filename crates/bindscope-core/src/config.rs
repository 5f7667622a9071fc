//! Dashboard configuration. Load from TOML or env.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A plain configuration binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarBinding {
    pub name: String,
    pub value: serde_json::Value,
}

/// A storage binding backed by a local store under `storage_path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBinding {
    pub binding: String,
}

/// A connection-string configuration binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionBinding {
    pub binding: String,
    pub connection_string: String,
}

/// Global application configuration (gateway + bindings).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Shown in the status endpoint.
    pub app_name: String,
    /// HTTP port for the gateway.
    pub port: u16,
    /// Base directory for local stores; each binding gets its own file or directory.
    pub storage_path: String,
    /// URL prefix the dashboard is mounted under, e.g. `/_dash`. Empty mounts at `/`.
    #[serde(default)]
    pub base_path: String,
    /// Temporary sled stores and in-memory SQLite; nothing touches `storage_path`.
    #[serde(default)]
    pub ephemeral: bool,

    #[serde(default)]
    pub vars: Vec<VarBinding>,
    #[serde(default)]
    pub kv_namespaces: Vec<ResourceBinding>,
    #[serde(default)]
    pub r2_buckets: Vec<ResourceBinding>,
    #[serde(default)]
    pub d1_databases: Vec<ResourceBinding>,
    #[serde(default)]
    pub hyperdrive: Vec<ConnectionBinding>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            app_name: "Bindscope".to_string(),
            port: 8787,
            storage_path: "./data".to_string(),
            base_path: String::new(),
            ephemeral: false,
            vars: Vec::new(),
            kv_namespaces: Vec::new(),
            r2_buckets: Vec::new(),
            d1_databases: Vec::new(),
            hyperdrive: Vec::new(),
        }
    }
}

impl DashboardConfig {
    /// Load config from file and environment.
    /// Precedence: env `BINDSCOPE__*` > file (`BINDSCOPE_CONFIG` path, else `config/bindscope`) > defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("BINDSCOPE_CONFIG").unwrap_or_else(|_| "config/bindscope.toml".to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Like [`DashboardConfig::load`] with an explicit file path. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("app_name", "Bindscope")?
            .set_default("port", 8787_i64)?
            .set_default("storage_path", "./data")?
            .set_default("base_path", "")?
            .set_default("ephemeral", false)?;

        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("BINDSCOPE").separator("__"))
            .build()?;

        built.try_deserialize()
    }

    /// `base_path` normalised to either `""` or `/segment[/segment…]` without a trailing slash.
    pub fn mount_path(&self) -> String {
        let trimmed = self.base_path.trim_matches('/');
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("/{trimmed}")
        }
    }

    /// Number of declared bindings of every sort.
    pub fn binding_count(&self) -> usize {
        self.vars.len()
            + self.kv_namespaces.len()
            + self.r2_buckets.len()
            + self.d1_databases.len()
            + self.hyperdrive.len()
    }
}
