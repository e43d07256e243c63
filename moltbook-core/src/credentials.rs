use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CoreError, CredentialsError};

pub const CREDENTIALS_DIR: &str = "moltbook";
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// Stored API credentials for one Moltbook agent.
///
/// Persisted as pretty-printed JSON under the per-user configuration
/// directory (`~/.config/moltbook/credentials.json` on Linux).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub agent_name: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            agent_name: agent_name.into(),
        }
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Default storage location, resolved against the platform config dir.
    pub fn default_path() -> Result<PathBuf, CoreError> {
        let base = dirs::config_dir().ok_or(CredentialsError::ConfigDirUnavailable)?;
        Ok(base.join(CREDENTIALS_DIR).join(CREDENTIALS_FILE))
    }

    /// Loads stored credentials, treating a missing or unreadable file as
    /// "not configured yet". A corrupt file is logged and ignored rather
    /// than surfaced, so a bad write never locks the user out of the UI.
    pub fn load(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to read credentials file {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(creds) => Some(creds),
            Err(e) => {
                warn!(
                    "Credentials file {} is not valid JSON, ignoring it: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Writes the full credential set, creating parent directories as
    /// needed and replacing any previous contents.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)?;
        Ok(())
    }
}
