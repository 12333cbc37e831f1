// Persisted player identity (identity.toml in the platform config directory).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::protocol::PlayerId;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("no platform config directory available")]
    NoConfigDir,

    #[error("failed to read identity file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse identity file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to write identity file {path}: {message}")]
    Write { path: PathBuf, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub player_id: PlayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// `<platform config dir>/identity.toml`.
pub fn default_identity_path() -> Result<PathBuf, IdentityError> {
    let dirs = ProjectDirs::from("org", "cardstories", "cardstories")
        .ok_or(IdentityError::NoConfigDir)?;
    Ok(dirs.config_dir().join("identity.toml"))
}

/// Read the stored identity. A missing file is not an error: the player
/// simply has not identified yet.
pub fn load_identity(path: &Path) -> Result<Option<Identity>, IdentityError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(IdentityError::Read {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };
    toml::from_str(&text)
        .map(Some)
        .map_err(|e| IdentityError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
}

/// Write the identity, creating parent directories as needed.
pub fn store_identity(path: &Path, identity: &Identity) -> Result<(), IdentityError> {
    let write_err = |message: String| IdentityError::Write {
        path: path.to_path_buf(),
        message,
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
    }
    let text = toml::to_string(identity).map_err(|e| write_err(e.to_string()))?;
    std::fs::write(path, text).map_err(|e| write_err(e.to_string()))
}
