//! YAML configuration for the sync engine.
//!
//! # Storage layout
//!
//! ```text
//! ~/.sitesync/
//!   config.yaml   (mode 0600, written by `sitesync init`)
//! ```
//!
//! Every function touching the home directory takes it explicitly
//! (`fn_at(home: &Path, …)`); the CLI resolves `$HOME`, tests pass a `TempDir`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{SiteId, DOCUMENT_COLLECTION};

pub const DEFAULT_PATH_PREFIX: &str = "/blog";
pub const DEFAULT_EXTENSION: &str = "md";
/// Clock id folded into every record key. Changing it re-keys every record.
pub const DEFAULT_CLOCK_ID: u16 = 3;
pub const MAX_CLOCK_ID: u16 = 1023;
pub const DEFAULT_TOKEN_ENV: &str = "SITESYNC_ACCESS_TOKEN";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where records are published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StoreKind {
    /// Log the record instead of sending it.
    #[default]
    DryRun,
    /// `com.atproto.repo.putRecord` over HTTP.
    Xrpc,
}

/// Remote record store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub kind: StoreKind,
    /// Base URL of the PDS, e.g. `https://pds.example.dev`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Repository (DID or handle) that owns the records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    /// Environment variable holding a pre-issued access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            endpoint: None,
            repo: None,
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Root of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub site: SiteId,
    /// Directory holding the source documents. Relative paths resolve
    /// against the directory containing the config file.
    pub content_root: PathBuf,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,
    #[serde(default = "default_extension")]
    pub extension: String,
    #[serde(default = "default_clock_id")]
    pub clock_id: u16,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    pub fn new(site: SiteId, content_root: PathBuf) -> Self {
        Self {
            site,
            content_root,
            collection: default_collection(),
            path_prefix: default_path_prefix(),
            extension: default_extension(),
            clock_id: default_clock_id(),
            concurrency: default_concurrency(),
            store: StoreConfig::default(),
        }
    }

    /// Reject values that parse but cannot be run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Records carry `site` as a URI; `scheme:rest` is the minimum shape.
        match self.site.0.split_once(':') {
            Some((scheme, rest)) if !scheme.is_empty() && !rest.is_empty() => {}
            _ => {
                return Err(ConfigError::Invalid {
                    field: "site",
                    reason: format!("'{}' is not a URI", self.site),
                })
            }
        }
        if self.clock_id > MAX_CLOCK_ID {
            return Err(ConfigError::Invalid {
                field: "clock_id",
                reason: format!("{} exceeds {MAX_CLOCK_ID}", self.clock_id),
            });
        }
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid {
                field: "concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.extension.is_empty() || self.extension.starts_with('.') {
            return Err(ConfigError::Invalid {
                field: "extension",
                reason: format!("'{}' must be a bare extension like 'md'", self.extension),
            });
        }
        if !self.path_prefix.starts_with('/') {
            return Err(ConfigError::Invalid {
                field: "path_prefix",
                reason: format!("'{}' must start with '/'", self.path_prefix),
            });
        }
        if self.store.kind == StoreKind::Xrpc {
            if self.store.endpoint.is_none() {
                return Err(ConfigError::Invalid {
                    field: "store.endpoint",
                    reason: "required when store.kind is xrpc".to_string(),
                });
            }
            if self.store.repo.is_none() {
                return Err(ConfigError::Invalid {
                    field: "store.repo",
                    reason: "required when store.kind is xrpc".to_string(),
                });
            }
        }
        Ok(())
    }
}

fn default_collection() -> String {
    DOCUMENT_COLLECTION.to_string()
}
fn default_path_prefix() -> String {
    DEFAULT_PATH_PREFIX.to_string()
}
fn default_extension() -> String {
    DEFAULT_EXTENSION.to_string()
}
fn default_clock_id() -> u16 {
    DEFAULT_CLOCK_ID
}
fn default_concurrency() -> usize {
    1
}
fn default_token_env() -> String {
    DEFAULT_TOKEN_ENV.to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `<home>/.sitesync/`: pure, no I/O.
pub fn sitesync_root(home: &Path) -> PathBuf {
    home.join(".sitesync")
}

/// `<home>/.sitesync/config.yaml`: pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    sitesync_root(home).join("config.yaml")
}

// ---------------------------------------------------------------------------
// 2. Load
// ---------------------------------------------------------------------------

/// Load and validate a config file at an explicit location.
///
/// Returns `ConfigError::NotFound` if absent, `ConfigError::Parse` (with
/// path + line context) if malformed YAML.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path)?;
    let mut config: Config = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    if config.content_root.is_relative() {
        if let Some(dir) = path.parent() {
            config.content_root = dir.join(&config.content_root);
        }
    }
    config.validate()?;
    Ok(config)
}

/// Load `<home>/.sitesync/config.yaml`.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    load_from(&config_path_at(home))
}

// ---------------------------------------------------------------------------
// 3. Save (atomic)
// ---------------------------------------------------------------------------

/// Atomically save the config to `<home>/.sitesync/config.yaml`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &Config) -> Result<(), ConfigError> {
    let dir = sitesync_root(home);
    if !dir.exists() {
        std::fs::create_dir_all(&dir)?;
        set_dir_permissions(&dir)?;
    }
    let path = config_path_at(home);
    let tmp_path = path.with_file_name("config.yaml.tmp");

    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Init
// ---------------------------------------------------------------------------

/// Write a default config for `site` publishing from `content_root`.
///
/// Idempotent: if the file already exists, loads and returns it unchanged.
pub fn init_at(home: &Path, site: SiteId, content_root: PathBuf) -> Result<Config, ConfigError> {
    if config_path_at(home).exists() {
        return load_at(home);
    }
    let config = Config::new(site, content_root);
    config.validate()?;
    save_at(home, &config)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
