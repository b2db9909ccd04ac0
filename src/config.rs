//! Configuration for the offline layer

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Default remote data service base URL
const DEFAULT_API_BASE: &str = "https://wildlife-guardians-backends.vercel.app/api";

/// Default origin the app shell is served from
const DEFAULT_SHELL_BASE: &str = "https://wildlife-guardians.app";

/// Offline-layer configuration
///
/// Cache namespace names embed `cache_version`; bumping the version is the
/// sole rotation mechanism. The next [`Gateway::activate`](crate::gateway::Gateway::activate)
/// deletes every namespace that doesn't carry the current version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfflineConfig {
    /// Remote data service base URL (no trailing slash)
    #[serde(default = "default_api_base")]
    pub api_base_url: String,

    /// Origin the static app-shell assets are served from
    #[serde(default = "default_shell_base")]
    pub shell_base_url: String,

    /// Version tag embedded in cache namespace names
    #[serde(default = "default_cache_version")]
    pub cache_version: u32,

    /// App-shell paths pre-seeded into the static cache at install
    #[serde(default = "default_static_assets")]
    pub static_assets: Vec<String>,

    /// Path of the document served as a generic offline fallback
    #[serde(default = "default_offline_document")]
    pub offline_document: String,

    /// Deadline for each network attempt (gateway fetches and queued delivery)
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Directory for the local store and response cache.
    /// Defaults to the platform data dir when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_shell_base() -> String {
    DEFAULT_SHELL_BASE.to_string()
}

fn default_cache_version() -> u32 {
    1
}

fn default_static_assets() -> Vec<String> {
    [
        "/",
        "/index.html",
        "/manifest.json",
        "/favicon.svg",
        "/wildlife-icon.svg",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_offline_document() -> String {
    "/index.html".to_string()
}

fn default_timeout() -> u64 {
    30
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base(),
            shell_base_url: default_shell_base(),
            cache_version: default_cache_version(),
            static_assets: default_static_assets(),
            offline_document: default_offline_document(),
            request_timeout_secs: default_timeout(),
            data_dir: None,
        }
    }
}

impl OfflineConfig {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".wildlife-offline").join("config.yaml"))
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: OfflineConfig = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(&path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Namespace holding pre-seeded app-shell responses
    pub fn static_cache_name(&self) -> String {
        format!("wildlife-static-v{}", self.cache_version)
    }

    /// Namespace holding write-through copies of live responses
    pub fn dynamic_cache_name(&self) -> String {
        format!("wildlife-dynamic-v{}", self.cache_version)
    }

    /// Directory for the local store and response cache
    pub fn data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("wildlife-offline")
        })
    }

    /// Full URL for an app-shell path
    pub fn shell_url(&self, path: &str) -> String {
        format!("{}{}", self.shell_base_url.trim_end_matches('/'), path)
    }
}
