//! Configuration management.
//!
//! Configuration lives at `~/.config/sessionward/config.json`. A missing file
//! means defaults; `SESSIONWARD_API_URL` and `SESSIONWARD_STORAGE` override
//! what the file says.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::{FileBackend, KeyringBackend, TokenStore};
use crate::session::DEFAULT_LOGIN_PATH;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "sessionward";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:4000/api";

/// HTTP request timeout in seconds. The transport owns all timeouts.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "SESSIONWARD_API_URL";
pub const ENV_STORAGE: &str = "SESSIONWARD_STORAGE";

/// Where the token store keeps its slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    #[default]
    File,
    Keyring,
}

impl FromStr for StorageKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StorageKind::Memory),
            "file" => Ok(StorageKind::File),
            "keyring" | "keychain" => Ok(StorageKind::Keyring),
            other => Err(anyhow::anyhow!(
                "Unknown storage '{}', expected memory, file or keyring",
                other
            )),
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StorageKind::Memory => "memory",
            StorageKind::File => "file",
            StorageKind::Keyring => "keyring",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub storage: StorageKind,
    /// Where the protected gate redirects unauthenticated users
    pub login_path: String,
    pub log_to_file: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            storage: StorageKind::default(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            log_to_file: false,
        }
    }
}

impl Config {
    /// Load from the default location, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup. Invalid values are ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(raw) = lookup(ENV_STORAGE) {
            match raw.parse() {
                Ok(storage) => self.storage = storage,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_STORAGE),
            }
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Open the token store this configuration selects
    pub fn token_store(&self) -> Result<TokenStore> {
        Ok(match self.storage {
            StorageKind::Memory => TokenStore::in_memory(),
            StorageKind::File => TokenStore::new(FileBackend::new(self.cache_dir()?)),
            StorageKind::Keyring => TokenStore::new(KeyringBackend::new()),
        })
    }
}
