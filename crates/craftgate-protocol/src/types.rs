//! Records shared by the server, the repository and the launcher.
//!
//! These are the persisted entities (users, launch configuration, the
//! configuration version stamp) plus the user-facing profile that is safe
//! to send back over the wire. Field names serialize in PascalCase so the
//! on-disk XML reads `<User><Nickname>..</Nickname>..</User>`.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Hex-encoded SHA-256 digest of `nickname:password`.
///
/// Binding the nickname into the digest means two users with the same
/// password still store different credential material.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    /// Derives the digest for a nickname/password pair.
    pub fn derive(nickname: &str, password: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(nickname.as_bytes());
        hasher.update(b":");
        hasher.update(password.as_bytes());
        Self(hex::encode(hasher.finalize()))
    }

    /// Returns `true` if `password` is the one this digest was derived from.
    pub fn verify(&self, nickname: &str, password: &str) -> bool {
        *self == Self::derive(nickname, password)
    }

    /// Returns the hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Never print credential material, even in debug logs.
impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered player account. One record per nickname.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename = "User", rename_all = "PascalCase")]
pub struct User {
    /// Unique key of the record; also its file name on disk.
    pub nickname: String,
    /// Credential material, never the clear-text password.
    pub credentials: PasswordDigest,
    /// Paid-currency balance.
    pub balance: u64,
}

impl User {
    /// Creates a new user with a fresh digest for `password`.
    pub fn new(nickname: impl Into<String>, password: &str, balance: u64) -> Self {
        let nickname = nickname.into();
        let credentials = PasswordDigest::derive(&nickname, password);
        Self {
            nickname,
            credentials,
            balance,
        }
    }

    /// Checks a login attempt against the stored digest.
    pub fn verify_password(&self, password: &str) -> bool {
        self.credentials.verify(&self.nickname, password)
    }

    /// Returns `true` if the balance meets the configured threshold.
    pub fn can_play(&self, config: &LaunchConfiguration) -> bool {
        self.balance >= config.required_balance
    }

    /// The part of the record that may be sent to the client.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            nickname: self.nickname.clone(),
            balance: self.balance,
        }
    }
}

/// What a client learns about a user after logging in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserProfile {
    pub nickname: String,
    pub balance: u64,
}

// ---------------------------------------------------------------------------
// Global configuration
// ---------------------------------------------------------------------------

/// Deployment-wide launch settings. Singleton, provisioned by operators.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename = "LaunchConfiguration", rename_all = "PascalCase")]
pub struct LaunchConfiguration {
    /// Minimum balance a user needs before the launcher lets them play.
    pub required_balance: u64,
    /// RAM dedicated to the game process, in MiB.
    pub dedicated_ram_mb: u32,
    /// Whether the game starts fullscreen.
    pub fullscreen: bool,
}

/// Version stamp of the distributed configuration.
///
/// The server bumps it whenever the mod pack or launch configuration
/// changes; clients compare stamps to know their local copy is stale.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename = "ConfigurationVersion", rename_all = "PascalCase")]
pub struct ConfigurationVersion {
    pub stamp: u64,
}

impl ConfigurationVersion {
    /// Returns `true` if `self` supersedes `other`.
    pub fn is_newer_than(&self, other: &ConfigurationVersion) -> bool {
        self.stamp > other.stamp
    }

    /// The next stamp in sequence.
    pub fn next(self) -> Self {
        Self {
            stamp: self.stamp.saturating_add(1),
        }
    }
}

impl fmt::Display for ConfigurationVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.stamp)
    }
}
