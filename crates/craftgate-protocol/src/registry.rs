//! The key ↔ message-kind registry.
//!
//! Built once from a fixed table of `(key, kind, constructor)` entries.
//! Construction checks the table is a bijection and rejects it otherwise,
//! so a bad table fails at startup instead of corrupting traffic later.
//! After construction the registry is never mutated, and the process-wide
//! instance is read from any task without locking.

use std::collections::HashMap;
use std::sync::LazyLock;

use craftgate_transport::SKIN_FRAME_KEY;

use crate::{
    ConfigVersionRequest, ConfigVersionResponse, ForgeDownloadRequest,
    LaunchConfigurationRequest, LaunchConfigurationResponse, LoginRequest, LoginResponse,
    Message, MessageKind, ProtocolError, RegistrationRequest, RegistrationResponse,
};

/// Builds a fresh default-valued message.
pub type Constructor = fn() -> Message;

/// One row of the registry table.
#[derive(Debug, Clone, Copy)]
pub struct RegistryEntry {
    pub key: u8,
    pub kind: MessageKind,
    pub construct: Constructor,
}

impl RegistryEntry {
    pub fn new(key: u8, kind: MessageKind, construct: Constructor) -> Self {
        Self {
            key,
            kind,
            construct,
        }
    }
}

/// The standard wire table.
pub fn standard_entries() -> Vec<RegistryEntry> {
    vec![
        RegistryEntry::new(1, MessageKind::RegistrationRequest, || {
            RegistrationRequest::default().into()
        }),
        RegistryEntry::new(2, MessageKind::RegistrationResponse, || {
            RegistrationResponse::default().into()
        }),
        RegistryEntry::new(3, MessageKind::LoginRequest, || {
            LoginRequest::default().into()
        }),
        RegistryEntry::new(4, MessageKind::LoginResponse, || {
            LoginResponse::default().into()
        }),
        RegistryEntry::new(5, MessageKind::ForgeDownloadRequest, || {
            ForgeDownloadRequest::default().into()
        }),
        RegistryEntry::new(6, MessageKind::LaunchConfigurationRequest, || {
            LaunchConfigurationRequest::default().into()
        }),
        RegistryEntry::new(7, MessageKind::LaunchConfigurationResponse, || {
            LaunchConfigurationResponse::default().into()
        }),
        RegistryEntry::new(8, MessageKind::ConfigVersionRequest, || {
            ConfigVersionRequest::default().into()
        }),
        RegistryEntry::new(9, MessageKind::ConfigVersionResponse, || {
            ConfigVersionResponse::default().into()
        }),
    ]
}

static GLOBAL: LazyLock<MessageRegistry> = LazyLock::new(|| {
    MessageRegistry::standard()
        .unwrap_or_else(|e| panic!("standard message registry is invalid: {e}"))
});

/// Bidirectional, immutable mapping between message keys and kinds.
#[derive(Debug, Clone)]
pub struct MessageRegistry {
    by_key: HashMap<u8, (MessageKind, Constructor)>,
    by_kind: HashMap<MessageKind, u8>,
}

impl MessageRegistry {
    /// Builds a registry from `entries`, validating both directions.
    ///
    /// # Errors
    /// - [`ProtocolError::ReservedKey`] if an entry uses the skin key
    /// - [`ProtocolError::DuplicateKey`] / [`ProtocolError::DuplicateType`]
    ///   if the table is not a bijection
    /// - [`ProtocolError::ConstructorMismatch`] if a constructor builds a
    ///   different kind than its row declares
    pub fn new(
        entries: impl IntoIterator<Item = RegistryEntry>,
    ) -> Result<Self, ProtocolError> {
        let mut by_key = HashMap::new();
        let mut by_kind = HashMap::new();

        for entry in entries {
            if entry.key == SKIN_FRAME_KEY {
                return Err(ProtocolError::ReservedKey(entry.key));
            }
            if by_key.contains_key(&entry.key) {
                return Err(ProtocolError::DuplicateKey(entry.key));
            }
            if by_kind.contains_key(&entry.kind) {
                return Err(ProtocolError::DuplicateType(entry.kind));
            }

            let built = (entry.construct)().kind();
            if built != entry.kind {
                return Err(ProtocolError::ConstructorMismatch {
                    key: entry.key,
                    expected: entry.kind,
                    actual: built,
                });
            }

            by_key.insert(entry.key, (entry.kind, entry.construct));
            by_kind.insert(entry.kind, entry.key);
        }

        Ok(Self { by_key, by_kind })
    }

    /// Builds a registry from [`standard_entries`].
    pub fn standard() -> Result<Self, ProtocolError> {
        Self::new(standard_entries())
    }

    /// The process-wide registry built from the standard table.
    ///
    /// # Panics
    /// On first access, if the standard table is not a bijection. That is
    /// a build defect, not a runtime condition.
    pub fn global() -> &'static MessageRegistry {
        &GLOBAL
    }

    /// A fresh default-valued message of the kind registered under `key`.
    ///
    /// # Errors
    /// [`ProtocolError::UnknownKey`] if nothing is registered under `key`.
    pub fn message_for(&self, key: u8) -> Result<Message, ProtocolError> {
        self.by_key
            .get(&key)
            .map(|(_, construct)| construct())
            .ok_or(ProtocolError::UnknownKey(key))
    }

    /// Diagnostic type name for `key`.
    pub fn type_name_for(&self, key: u8) -> Result<&'static str, ProtocolError> {
        self.kind_for(key).map(MessageKind::name)
    }

    /// The kind registered under `key`.
    pub fn kind_for(&self, key: u8) -> Result<MessageKind, ProtocolError> {
        self.by_key
            .get(&key)
            .map(|(kind, _)| *kind)
            .ok_or(ProtocolError::UnknownKey(key))
    }

    /// Reverse lookup: the key for `kind`.
    ///
    /// # Errors
    /// [`ProtocolError::UnregisteredType`] if `kind` is not in the table.
    pub fn key_for(&self, kind: MessageKind) -> Result<u8, ProtocolError> {
        self.by_kind
            .get(&kind)
            .copied()
            .ok_or(ProtocolError::UnregisteredType(kind))
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// All registered keys in ascending order.
    pub fn keys(&self) -> Vec<u8> {
        let mut keys: Vec<u8> = self.by_key.keys().copied().collect();
        keys.sort_unstable();
        keys
    }
}
