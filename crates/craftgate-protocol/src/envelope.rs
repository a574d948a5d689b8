//! Envelopes: a typed message plus the header key it travels under.
//!
//! Encoding resolves the key through the registry and serializes the
//! payload with a [`Codec`]. Decoding goes the other way: the header key
//! picks a default instance from the registry, and exactly the framed
//! payload bytes are decoded into it.

use craftgate_transport::{Frame, MessageHeader};

use crate::{Codec, Message, MessageKind, MessageRegistry, ProtocolError};

/// A message ready to go on the wire, or just taken off it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub key: u8,
    pub message: Message,
}

impl Envelope {
    /// Wraps `message`, looking up its key.
    ///
    /// # Errors
    /// [`ProtocolError::UnregisteredType`] if the kind has no key.
    pub fn new(
        registry: &MessageRegistry,
        message: impl Into<Message>,
    ) -> Result<Self, ProtocolError> {
        let message = message.into();
        let key = registry.key_for(message.kind())?;
        Ok(Self { key, message })
    }

    /// The message kind inside.
    pub fn kind(&self) -> MessageKind {
        self.message.kind()
    }

    /// Serializes into a typed frame.
    pub fn to_frame<C: Codec>(&self, codec: &C) -> Result<Frame, ProtocolError> {
        Ok(Frame::Message {
            key: self.key,
            payload: self.message.encode_payload(codec)?,
        })
    }

    /// Decodes a typed frame's header key and payload.
    ///
    /// # Errors
    /// - [`ProtocolError::UnknownKey`] if the key is not registered
    /// - a decode error if the payload does not fit that kind
    pub fn from_parts<C: Codec>(
        registry: &MessageRegistry,
        codec: &C,
        key: u8,
        payload: &[u8],
    ) -> Result<Self, ProtocolError> {
        let template = registry.message_for(key)?;
        let message = template.decode_payload(codec, payload)?;
        Ok(Self { key, message })
    }

    /// The header this envelope would be framed with.
    pub fn header<C: Codec>(&self, codec: &C) -> Result<MessageHeader, ProtocolError> {
        let payload = self.message.encode_payload(codec)?;
        let length = u32::try_from(payload.len()).map_err(|_| {
            ProtocolError::InvalidMessage(format!(
                "{} payload of {} bytes does not fit a frame header",
                self.message.kind(),
                payload.len()
            ))
        })?;
        Ok(MessageHeader {
            key: self.key,
            length,
        })
    }
}

/// Encodes `message` into a frame with the global registry.
pub fn encode_message<C: Codec>(
    codec: &C,
    message: impl Into<Message>,
) -> Result<Frame, ProtocolError> {
    Envelope::new(MessageRegistry::global(), message)?.to_frame(codec)
}

/// Decodes a typed frame with the global registry.
///
/// Skin frames are not messages and are rejected with
/// [`ProtocolError::InvalidMessage`].
pub fn decode_frame<C: Codec>(codec: &C, frame: &Frame) -> Result<Message, ProtocolError> {
    match frame {
        Frame::Message { key, payload } => {
            Envelope::from_parts(MessageRegistry::global(), codec, *key, payload)
                .map(|env| env.message)
        }
        Frame::Skin { .. } => Err(ProtocolError::InvalidMessage(
            "skin frame is not a typed message".into(),
        )),
    }
}
