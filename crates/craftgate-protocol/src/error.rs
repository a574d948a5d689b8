//! Error types for the protocol layer.

use crate::MessageKind;

/// Errors that can occur while building the registry or while encoding
/// and decoding messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serializing a payload failed.
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// The payload bytes did not match the shape of the message kind
    /// selected by the header key.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// No message kind is registered under this key.
    #[error("no message registered for key {0}")]
    UnknownKey(u8),

    /// The message kind was never registered.
    #[error("message type {0} is not registered")]
    UnregisteredType(MessageKind),

    /// Two registry entries claim the same key.
    #[error("duplicate registry key {0}")]
    DuplicateKey(u8),

    /// Two registry entries claim the same message kind.
    #[error("message type {0} registered twice")]
    DuplicateType(MessageKind),

    /// A registry entry uses a key reserved for the skin side-channel.
    #[error("key {0} is reserved")]
    ReservedKey(u8),

    /// A registry constructor builds a different kind than its entry says.
    #[error("constructor for key {key} builds {actual}, expected {expected}")]
    ConstructorMismatch {
        key: u8,
        expected: MessageKind,
        actual: MessageKind,
    },

    /// The message decoded but breaks a protocol rule.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
