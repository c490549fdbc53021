//! Application configuration for crmbridge.
//!
//! User config lives at `~/.crmbridge/crmbridge.toml` unless `--config` points
//! elsewhere. CLI flags override config file values, which override defaults.
//! The CRM credential itself is never stored here, only the name of the
//! environment variable that holds it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CrmBridgeError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "crmbridge.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".crmbridge";

// ---------------------------------------------------------------------------
// Config structs (matching crmbridge.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// CRM object API settings.
    #[serde(default)]
    pub crm: CrmConfig,

    /// HTTP endpoint settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[crm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrmConfig {
    /// Base URL of the object-creation API; object types are appended to it.
    #[serde(default = "default_base_url")]
    pub base_url: Url,

    /// Name of the env var holding the bearer token (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-request timeout for outbound calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> Url {
    Url::parse("https://api.hubapi.com/crm/v3/objects").expect("static URL is valid")
}
fn default_api_key_env() -> String {
    "Hubspot_API_Key".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address the HTTP endpoint binds to.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Path of the submission endpoint.
    #[serde(default = "default_route")]
    pub route: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            route: default_route(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:7071".into()
}
fn default_route() -> String {
    "/api/Bridge2025".into()
}

// ---------------------------------------------------------------------------
// API key
// ---------------------------------------------------------------------------

/// Bearer token for the CRM. `Debug` never prints the value.
#[derive(Clone, Default)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            f.write_str("ApiKey(<unset>)")
        } else {
            f.write_str("ApiKey(<redacted>)")
        }
    }
}

/// Read the CRM bearer token from the env var named in the config.
///
/// Returns a config error when the variable is unset or empty. Callers decide
/// whether that is fatal.
pub fn load_api_key(config: &AppConfig) -> Result<ApiKey> {
    let var_name = &config.crm.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(ApiKey(val)),
        _ => Err(CrmBridgeError::config(format!(
            "CRM API key not found. Set the {var_name} environment variable."
        ))),
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.crmbridge/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CrmBridgeError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.crmbridge/crmbridge.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CrmBridgeError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CrmBridgeError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CrmBridgeError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CrmBridgeError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CrmBridgeError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
