//! Payload codecs.
//!
//! The frame layer only moves bytes; a [`Codec`] decides how a message
//! payload becomes those bytes. Every payload struct is plain serde, so
//! any self-describing format works. [`JsonCodec`] is the default because
//! payloads stay readable in packet captures and logs.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes payload values to bytes and decodes them back.
///
/// Implementations must be cheap to share between connection tasks, hence
/// `Send + Sync + 'static`. `decode` produces owned values so the receive
/// buffer can be dropped as soon as the message is decoded.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if the value cannot be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes exactly `data` into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// truncated, or describe a different shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`.
///
/// ```rust
/// use craftgate_protocol::{Codec, ConfigVersionResponse, ConfigurationVersion, JsonCodec};
///
/// let codec = JsonCodec;
/// let resp = ConfigVersionResponse {
///     version: ConfigurationVersion { stamp: 12 },
/// };
///
/// let bytes = codec.encode(&resp).unwrap();
/// let decoded: ConfigVersionResponse = codec.decode(&bytes).unwrap();
/// assert_eq!(resp, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
