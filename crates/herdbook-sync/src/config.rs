//! # Sync Configuration
//!
//! Configuration management for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     HERDBOOK_FARM_ID=finca-la-esperanza                                │
//! │     HERDBOOK_AUTH_TOKEN=ya29...                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                    │
//! │     ~/.config/herdbook/sync.toml (Linux)                               │
//! │     ~/Library/Application Support/com.herdbook.herdbook/sync.toml      │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     all tables, root "farms", failure_policy = abort                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [farm]
//! id = "finca-la-esperanza"
//! name = "La Esperanza"
//!
//! [remote]
//! project_id = "herdbook-prod"
//! api_key = "AIza..."
//! timeout_secs = 30
//!
//! [sync]
//! root_collection = "farms"
//! tables = ["animals", "production", "expenses"]
//! failure_policy = "continue"
//!
//! [network]
//! probe_host = "firestore.googleapis.com"
//! probe_port = 443
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use herdbook_core::{EntityKind, DEFAULT_ROOT_COLLECTION};

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Failure Policy
// =============================================================================

/// What a sync pass does when one table's push fails.
///
/// ```text
/// ABORT (Default)                      │  CONTINUE
/// ───────────────                      │  ────────
/// • First failure ends the pass        │  • Failure recorded in the report
/// • Error returned to the caller       │  • Remaining tables still pushed
/// • Later tables stay dirty            │  • Pass returns Ok(report)
/// ```
///
/// Either way the failed table's rows stay dirty and are pushed again by the
/// next pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Abort,
    Continue,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Continue => write!(f, "continue"),
        }
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "abort" | "stop" => Ok(FailurePolicy::Abort),
            "continue" | "skip" => Ok(FailurePolicy::Continue),
            other => Err(SyncError::InvalidConfig(format!(
                "Unknown failure policy: '{}'. Valid options: abort, continue",
                other
            ))),
        }
    }
}

// =============================================================================
// Farm Configuration
// =============================================================================

/// The farm whose records this device keeps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FarmConfig {
    /// Farm identifier; becomes the scope segment of every remote path.
    #[serde(default)]
    pub id: String,

    /// Human-readable farm name.
    #[serde(default)]
    pub name: String,
}

// =============================================================================
// Remote Settings
// =============================================================================

/// Where the remote document store lives and how to authenticate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSettings {
    /// Firestore project id.
    #[serde(default)]
    pub project_id: String,

    /// REST endpoint; override to point at the emulator.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Firestore database id.
    #[serde(default = "default_database")]
    pub database: String,

    /// Web API key sent as `?key=`.
    #[serde(default)]
    pub api_key: Option<String>,

    /// OAuth / ID token sent as `Authorization: Bearer`.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Request timeout (seconds).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://firestore.googleapis.com".to_string()
}

fn default_database() -> String {
    "(default)".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for RemoteSettings {
    fn default() -> Self {
        RemoteSettings {
            project_id: String::new(),
            base_url: default_base_url(),
            database: default_database(),
            api_key: None,
            auth_token: None,
            timeout_secs: default_timeout(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Sync pass behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// First path segment of the remote scope (`{root}/{farm_id}`).
    #[serde(default = "default_root_collection")]
    pub root_collection: String,

    /// Tables pushed by a pass, in order.
    #[serde(default = "default_tables")]
    pub tables: Vec<EntityKind>,

    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

fn default_root_collection() -> String {
    DEFAULT_ROOT_COLLECTION.to_string()
}

fn default_tables() -> Vec<EntityKind> {
    EntityKind::ALL.to_vec()
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            root_collection: default_root_collection(),
            tables: default_tables(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

// =============================================================================
// Network Settings
// =============================================================================

/// Reachability probe used by [`crate::network::TcpProbe`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSettings {
    #[serde(default = "default_probe_host")]
    pub probe_host: String,

    #[serde(default = "default_probe_port")]
    pub probe_port: u16,

    /// Interval between probes (seconds).
    #[serde(default = "default_probe_interval")]
    pub probe_interval_secs: u64,

    /// Connect timeout of one probe (seconds).
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,
}

fn default_probe_host() -> String {
    "firestore.googleapis.com".to_string()
}

fn default_probe_port() -> u16 {
    443
}

fn default_probe_interval() -> u64 {
    15
}

fn default_probe_timeout() -> u64 {
    3
}

impl Default for NetworkSettings {
    fn default() -> Self {
        NetworkSettings {
            probe_host: default_probe_host(),
            probe_port: default_probe_port(),
            probe_interval_secs: default_probe_interval(),
            probe_timeout_secs: default_probe_timeout(),
        }
    }
}

impl NetworkSettings {
    /// Returns `host:port` of the probe target.
    pub fn probe_address(&self) -> String {
        format!("{}:{}", self.probe_host, self.probe_port)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

// =============================================================================
// Main Sync Configuration
// =============================================================================

/// Complete sync configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub farm: FarmConfig,

    #[serde(default)]
    pub remote: RemoteSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub network: NetworkSettings,
}

impl SyncConfig {
    /// Creates a config with defaults for the given farm.
    pub fn for_farm(farm_id: impl Into<String>) -> Self {
        SyncConfig {
            farm: FarmConfig {
                id: farm_id.into(),
                name: String::new(),
            },
            ..Default::default()
        }
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (sync.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading sync config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Sync config saved");
        Ok(())
    }

    /// Validates everything a sync pass needs regardless of the remote
    /// backend: farm scope and table list.
    pub fn validate_scope(&self) -> SyncResult<()> {
        if self.farm.id.trim().is_empty() {
            return Err(SyncError::MissingFarmId);
        }
        if self.farm.id.contains('/') {
            return Err(SyncError::InvalidConfig(format!(
                "farm id must not contain '/', got: {}",
                self.farm.id
            )));
        }

        let root = &self.sync.root_collection;
        if root.trim().is_empty() || root.contains('/') {
            return Err(SyncError::InvalidConfig(format!(
                "root_collection must be a single non-empty segment, got: '{}'",
                root
            )));
        }

        if self.sync.tables.is_empty() {
            return Err(SyncError::InvalidConfig(
                "sync.tables must name at least one table".into(),
            ));
        }
        for (idx, table) in self.sync.tables.iter().enumerate() {
            if self.sync.tables[..idx].contains(table) {
                return Err(SyncError::InvalidConfig(format!(
                    "table '{}' listed twice in sync.tables",
                    table
                )));
            }
        }

        Ok(())
    }

    /// Validates the full configuration, remote settings included.
    pub fn validate(&self) -> SyncResult<()> {
        self.validate_scope()?;

        if self.remote.project_id.trim().is_empty() {
            return Err(SyncError::InvalidConfig(
                "remote.project_id is required".into(),
            ));
        }

        let url = url::Url::parse(&self.remote.base_url)?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SyncError::InvalidUrl(format!(
                "Remote URL must start with http:// or https://, got: {}",
                self.remote.base_url
            )));
        }

        if self.remote.timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "remote.timeout_secs must be greater than 0".into(),
            ));
        }

        if self.network.probe_timeout_secs == 0 || self.network.probe_interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "network probe interval and timeout must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `HERDBOOK_*` overrides read through `lookup`.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("HERDBOOK_FARM_ID") {
            debug!(farm_id = %id, "Overriding farm ID from environment");
            self.farm.id = id;
        }

        if let Some(name) = lookup("HERDBOOK_FARM_NAME") {
            self.farm.name = name;
        }

        if let Some(project) = lookup("HERDBOOK_PROJECT_ID") {
            self.remote.project_id = project;
        }

        if let Some(url) = lookup("HERDBOOK_REMOTE_URL") {
            debug!(url = %url, "Overriding remote URL from environment");
            self.remote.base_url = url;
        }

        if let Some(database) = lookup("HERDBOOK_DATABASE") {
            self.remote.database = database;
        }

        if let Some(key) = lookup("HERDBOOK_API_KEY") {
            self.remote.api_key = Some(key);
        }

        if let Some(token) = lookup("HERDBOOK_AUTH_TOKEN") {
            self.remote.auth_token = Some(token);
        }

        if let Some(root) = lookup("HERDBOOK_ROOT_COLLECTION") {
            self.sync.root_collection = root;
        }

        if let Some(tables) = lookup("HERDBOOK_SYNC_TABLES") {
            let parsed: Result<Vec<EntityKind>, _> = tables
                .split(',')
                .filter(|t| !t.trim().is_empty())
                .map(str::parse)
                .collect();
            match parsed {
                Ok(parsed) => {
                    debug!(count = parsed.len(), "Overriding sync tables from environment");
                    self.sync.tables = parsed;
                }
                Err(e) => warn!(tables = %tables, error = %e, "Ignoring invalid HERDBOOK_SYNC_TABLES"),
            }
        }

        if let Some(policy) = lookup("HERDBOOK_FAILURE_POLICY") {
            match policy.parse() {
                Ok(parsed) => self.sync.failure_policy = parsed,
                Err(_) => warn!(policy = %policy, "Unknown failure policy in environment"),
            }
        }

        if let Some(host) = lookup("HERDBOOK_PROBE_HOST") {
            self.network.probe_host = host;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "herdbook", "herdbook")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn farm_id(&self) -> &str {
        &self.farm.id
    }

    /// Remote prefix holding every collection of this farm.
    pub fn scope(&self) -> String {
        format!("{}/{}", self.sync.root_collection, self.farm.id)
    }

    /// Remote collection path of one table.
    pub fn collection_path(&self, kind: EntityKind) -> String {
        format!("{}/{}", self.scope(), kind.collection())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.sync.failure_policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid() -> SyncConfig {
        let mut config = SyncConfig::for_farm("finca-1");
        config.remote.project_id = "herdbook-test".into();
        config
    }

    #[test]
    fn test_failure_policy_parsing() {
        assert_eq!("abort".parse::<FailurePolicy>().unwrap(), FailurePolicy::Abort);
        assert_eq!("Continue".parse::<FailurePolicy>().unwrap(), FailurePolicy::Continue);
        assert!("retry".parse::<FailurePolicy>().is_err());
    }

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert_eq!(config.sync.tables, EntityKind::ALL.to_vec());
        assert_eq!(config.sync.root_collection, "farms");
        assert_eq!(config.failure_policy(), FailurePolicy::Abort);
        assert!(matches!(config.validate(), Err(SyncError::MissingFarmId)));
    }

    #[test]
    fn test_config_validation() {
        let mut config = valid();
        assert!(config.validate().is_ok());

        config.remote.base_url = "ftp://example.com".into();
        assert!(config.validate().is_err());

        config = valid();
        config.sync.tables = vec![EntityKind::Animals, EntityKind::Animals];
        assert!(config.validate().is_err());

        config = valid();
        config.sync.root_collection = "a/b".into();
        assert!(config.validate().is_err());

        // Scope checks ignore the remote section
        config = SyncConfig::for_farm("finca-1");
        assert!(config.validate_scope().is_ok());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_paths() {
        let config = valid();
        assert_eq!(config.scope(), "farms/finca-1");
        assert_eq!(
            config.collection_path(EntityKind::ReproductiveEvents),
            "farms/finca-1/reproductive_events"
        );
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("HERDBOOK_FARM_ID", "finca-2"),
            ("HERDBOOK_SYNC_TABLES", "animals, production"),
            ("HERDBOOK_FAILURE_POLICY", "continue"),
        ]
        .into_iter()
        .collect();

        let mut config = valid();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.farm_id(), "finca-2");
        assert_eq!(
            config.sync.tables,
            vec![EntityKind::Animals, EntityKind::Production]
        );
        assert_eq!(config.failure_policy(), FailurePolicy::Continue);
    }

    #[test]
    fn test_invalid_table_override_is_ignored() {
        let mut config = valid();
        config.apply_overrides(|key| {
            (key == "HERDBOOK_SYNC_TABLES").then(|| "animals,cows".to_string())
        });
        assert_eq!(config.sync.tables, EntityKind::ALL.to_vec());
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
            [farm]
            id = "finca-1"

            [remote]
            project_id = "p"

            [sync]
            tables = ["animals", "animal_events"]
            failure_policy = "continue"
        "#;
        let config: SyncConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.remote.database, "(default)");
        assert_eq!(config.sync.tables, vec![EntityKind::Animals, EntityKind::AnimalEvents]);

        let out = toml::to_string_pretty(&config).unwrap();
        assert!(out.contains("[farm]"));
        assert!(out.contains("failure_policy = \"continue\""));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sync.toml");
        valid().save(Some(path.clone())).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let loaded: SyncConfig = toml::from_str(&text).unwrap();
        assert_eq!(loaded.farm_id(), "finca-1");
        assert_eq!(loaded.remote.project_id, "herdbook-test");
    }
}
