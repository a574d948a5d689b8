//! The flat-file repository.
//!
//! ```text
//! <root>/Users/<nickname>.xml
//! <root>/Skins/<nickname>.png
//! <root>/LaunchConfiguration.xml
//! <root>/Version.xml
//! ```

use std::collections::BTreeSet;
use std::io;
use std::path::{Component, Path, PathBuf};

use craftgate_protocol::{ConfigurationVersion, LaunchConfiguration, User};

use crate::files::{is_temp_file, read_bytes, read_xml, write_atomic, write_xml};
use crate::locks::{EntityKey, EntityLocks};
use crate::{RepositoryError, validate_nickname};

const USERS_DIR: &str = "Users";
const SKINS_DIR: &str = "Skins";
const LAUNCH_CONFIG_FILE: &str = "LaunchConfiguration.xml";
const VERSION_FILE: &str = "Version.xml";

/// First eight bytes of every PNG file.
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Server-side store for users, skins and the two configuration singletons.
///
/// Safe to share between connection tasks behind an `Arc`. Writes to one
/// entity are serialized; everything else runs concurrently.
pub struct Repository {
    root: PathBuf,
    users_dir: PathBuf,
    skins_dir: PathBuf,
    locks: EntityLocks,
}

impl Repository {
    /// Opens (and if needed lays out) a repository rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let root = root.into();
        let users_dir = root.join(USERS_DIR);
        let skins_dir = root.join(SKINS_DIR);

        for dir in [&users_dir, &skins_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| RepositoryError::io(dir.as_path(), e))?;
        }

        tracing::info!(root = ?root, "repository opened");
        Ok(Self {
            root,
            users_dir,
            skins_dir,
            locks: EntityLocks::default(),
        })
    }

    /// The repository root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_path(&self, nickname: &str) -> PathBuf {
        self.users_dir.join(format!("{nickname}.xml"))
    }

    /// Where the skin for `nickname` lives (whether or not it exists).
    pub fn skin_path(&self, nickname: &str) -> PathBuf {
        self.skins_dir.join(format!("{nickname}.png"))
    }

    // -----------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------

    /// Returns `true` if a record exists for `nickname`. Never fails:
    /// an invalid nickname or an unreadable directory simply means "no".
    pub async fn user_exists(&self, nickname: &str) -> bool {
        if validate_nickname(nickname).is_err() {
            return false;
        }
        tokio::fs::try_exists(self.user_path(nickname))
            .await
            .unwrap_or(false)
    }

    /// Loads the record for `nickname`.
    ///
    /// # Errors
    /// `NotFound` if there is no record, `CorruptData` if it does not parse
    /// or names a different user than its file.
    pub async fn get_user(&self, nickname: &str) -> Result<User, RepositoryError> {
        validate_nickname(nickname)?;
        let path = self.user_path(nickname);
        let user: User = read_xml(&path, &format!("user {nickname}")).await?;

        if user.nickname != nickname {
            return Err(RepositoryError::CorruptData {
                path,
                reason: format!("record belongs to {:?}", user.nickname),
            });
        }
        Ok(user)
    }

    /// Creates the record, or replaces it entirely if it exists.
    pub async fn upsert_user(&self, user: &User) -> Result<(), RepositoryError> {
        validate_nickname(&user.nickname)?;
        let _guard = self
            .locks
            .lock(EntityKey::User(user.nickname.clone()))
            .await;

        let path = self.user_path(&user.nickname);
        let existed = tokio::fs::try_exists(&path).await.unwrap_or(false);
        write_xml(&path, user).await?;

        if existed {
            tracing::debug!(nickname = %user.nickname, "user record replaced");
        } else {
            tracing::info!(nickname = %user.nickname, "user record created");
        }
        Ok(())
    }

    /// Deletes the record for `nickname`.
    pub async fn remove_user(&self, nickname: &str) -> Result<(), RepositoryError> {
        validate_nickname(nickname)?;
        let _guard = self.locks.lock(EntityKey::User(nickname.to_string())).await;

        let path = self.user_path(nickname);
        remove_file(&path, &format!("user {nickname}")).await?;
        tracing::info!(%nickname, "user record removed");
        Ok(())
    }

    /// All nicknames that have a record. In-flight temp files and stray
    /// files are skipped.
    pub async fn list_nicknames(&self) -> Result<BTreeSet<String>, RepositoryError> {
        let mut dir = tokio::fs::read_dir(&self.users_dir)
            .await
            .map_err(|e| RepositoryError::io(&self.users_dir, e))?;

        let mut nicknames = BTreeSet::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| RepositoryError::io(&self.users_dir, e))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if is_temp_file(name) {
                continue;
            }
            if let Some(stem) = name.strip_suffix(".xml") {
                if validate_nickname(stem).is_ok() {
                    nicknames.insert(stem.to_string());
                }
            }
        }
        Ok(nicknames)
    }

    // -----------------------------------------------------------------
    // Skins
    // -----------------------------------------------------------------

    /// Stores (or fully replaces) the skin for `nickname` and returns its
    /// path.
    ///
    /// # Errors
    /// `InvalidInput` if the nickname is invalid or `data` is not a PNG.
    pub async fn save_skin(
        &self,
        nickname: &str,
        data: &[u8],
    ) -> Result<PathBuf, RepositoryError> {
        validate_nickname(nickname)?;
        if !data.starts_with(&PNG_SIGNATURE) {
            return Err(RepositoryError::InvalidInput(
                "skin is not a PNG image".into(),
            ));
        }

        let _guard = self.locks.lock(EntityKey::Skin(nickname.to_string())).await;
        let path = self.skin_path(nickname);
        write_atomic(&path, data).await?;

        tracing::info!(%nickname, bytes = data.len(), "skin saved");
        Ok(path)
    }

    /// Reads the skin for `nickname`.
    pub async fn load_skin(&self, nickname: &str) -> Result<Vec<u8>, RepositoryError> {
        validate_nickname(nickname)?;
        read_bytes(&self.skin_path(nickname), &format!("skin for {nickname}")).await
    }

    /// Deletes a skin file given its path relative to the skins directory
    /// (for example `"bob.png"`).
    ///
    /// # Errors
    /// `NotFound` if the file does not exist; `InvalidInput` if the path
    /// is not a single plain file name.
    pub async fn remove_skin(&self, skin_path: impl AsRef<Path>) -> Result<(), RepositoryError> {
        let rel = skin_path.as_ref();
        let mut components = rel.components();
        let file_name = match (components.next(), components.next()) {
            (Some(Component::Normal(name)), None) => name.to_string_lossy().into_owned(),
            _ => {
                return Err(RepositoryError::InvalidInput(format!(
                    "{rel:?} is not a file name inside the skins directory"
                )));
            }
        };

        let owner = file_name
            .strip_suffix(".png")
            .unwrap_or(&file_name)
            .to_string();
        let _guard = self.locks.lock(EntityKey::Skin(owner)).await;

        remove_file(&self.skins_dir.join(&file_name), &format!("skin {file_name}")).await?;
        tracing::info!(file = %file_name, "skin removed");
        Ok(())
    }

    // -----------------------------------------------------------------
    // Singletons
    // -----------------------------------------------------------------

    /// The deployment's launch configuration.
    pub async fn get_launch_config(&self) -> Result<LaunchConfiguration, RepositoryError> {
        read_xml(&self.root.join(LAUNCH_CONFIG_FILE), "launch configuration").await
    }

    /// The current configuration version stamp.
    pub async fn get_config_version(&self) -> Result<ConfigurationVersion, RepositoryError> {
        read_xml(&self.root.join(VERSION_FILE), "configuration version").await
    }

    /// Replaces the launch configuration. Operator-side provisioning.
    pub async fn store_launch_config(
        &self,
        config: &LaunchConfiguration,
    ) -> Result<(), RepositoryError> {
        let _guard = self.locks.lock(EntityKey::LaunchConfiguration).await;
        write_xml(&self.root.join(LAUNCH_CONFIG_FILE), config).await?;
        tracing::info!(?config, "launch configuration stored");
        Ok(())
    }

    /// Replaces the configuration version stamp. Operator-side provisioning.
    pub async fn store_config_version(
        &self,
        version: &ConfigurationVersion,
    ) -> Result<(), RepositoryError> {
        let _guard = self.locks.lock(EntityKey::ConfigurationVersion).await;
        write_xml(&self.root.join(VERSION_FILE), version).await?;
        tracing::info!(%version, "configuration version stored");
        Ok(())
    }
}

async fn remove_file(path: &Path, what: &str) -> Result<(), RepositoryError> {
    tokio::fs::remove_file(path).await.map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RepositoryError::NotFound(what.to_string()),
        _ => RepositoryError::io(path, e),
    })
}
