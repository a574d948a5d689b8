//! Per-machine launcher preferences, stored as a JSON file.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{LauncherError, PipelineOptions, ValidationMode};

/// Settings the player controls on their own machine.
///
/// Missing fields in the file fall back to their defaults, so files
/// written by older launchers keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalPrefs {
    /// Where game files are installed.
    pub game_directory: PathBuf,
    /// Heap given to the game, in MiB.
    pub dedicated_ram_mb: u32,
    pub fullscreen: bool,
    pub validation_mode: ValidationMode,
    /// Per-stage preparation deadline in seconds. `None` means no deadline.
    pub stage_timeout_secs: Option<u64>,
}

impl Default for LocalPrefs {
    fn default() -> Self {
        Self {
            game_directory: PathBuf::from(".craftgate"),
            dedicated_ram_mb: 4096,
            fullscreen: false,
            validation_mode: ValidationMode::default(),
            stage_timeout_secs: None,
        }
    }
}

impl LocalPrefs {
    /// Reads preferences from `path`.
    ///
    /// # Errors
    /// - [`LauncherError::Io`] if the file cannot be read
    /// - [`LauncherError::Prefs`] if it is not valid preferences JSON
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LauncherError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| LauncherError::Prefs {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Like [`load`](Self::load), but a missing file yields the defaults.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, LauncherError> {
        match Self::load(path).await {
            Err(LauncherError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("no preferences file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Writes preferences to `path` as pretty JSON, creating parent
    /// directories as needed.
    pub async fn save(&self, path: impl AsRef<Path>) -> Result<(), LauncherError> {
        let path = path.as_ref();
        let io_err = |source| LauncherError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(|source| LauncherError::Prefs {
            path: path.to_path_buf(),
            source,
        })?;
        tokio::fs::write(path, json).await.map_err(io_err)?;
        tracing::debug!(path = ?path, "preferences saved");
        Ok(())
    }

    /// Pipeline settings derived from these preferences.
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            validation_mode: self.validation_mode,
            stage_timeout: self.stage_timeout_secs.map(Duration::from_secs),
        }
    }
}
