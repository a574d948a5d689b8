//! What the launcher prepares and starts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A resolved game version, as the runtime knows it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameVersion {
    /// Version id, for example `"1.19.2"` or `"1.19.2-forge-43.2.0"`.
    pub id: String,
    /// The version this one extends, if it is a loader profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,
}

impl GameVersion {
    /// A plain version that inherits from nothing.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            inherits_from: None,
        }
    }
}

impl fmt::Display for GameVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// How thoroughly installed files are checked before reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Trust whatever is on disk.
    None,
    /// Compare file sizes only.
    Size,
    /// Compare sizes and hashes.
    #[default]
    Full,
}

/// A mod loader build to install on top of a vanilla version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForgeDescriptor {
    /// Name of the installed version profile the installer produces.
    pub name: String,
    /// Installer build to fetch.
    pub installer_version: String,
}

/// A named set of mods.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModPack {
    pub name: String,
    pub mods: Vec<String>,
}

/// The modded part of a configuration: always a loader plus a pack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModSetup {
    pub forge: ForgeDescriptor,
    pub mod_pack: ModPack,
}

/// Everything the pipeline needs to know about what to install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfiguration {
    /// Vanilla version name.
    pub vanilla: String,
    /// Loader and mods; `None` means vanilla only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modding: Option<ModSetup>,
}

impl GameConfiguration {
    /// A vanilla-only configuration.
    pub fn vanilla(version: impl Into<String>) -> Self {
        Self {
            vanilla: version.into(),
            modding: None,
        }
    }

    /// A modded configuration.
    pub fn modded(version: impl Into<String>, forge: ForgeDescriptor, mod_pack: ModPack) -> Self {
        Self {
            vanilla: version.into(),
            modding: Some(ModSetup { forge, mod_pack }),
        }
    }

    pub fn is_modded(&self) -> bool {
        self.modding.is_some()
    }
}

/// Everything needed to start the game process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    /// Offline-session player name.
    pub nickname: String,
    /// The version to run (the forge profile for modded setups).
    pub version: GameVersion,
    /// Maximum heap for the game, in MiB.
    pub dedicated_ram_mb: u32,
    pub fullscreen: bool,
}
