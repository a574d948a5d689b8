//! Frame encoding and decoding over any async byte stream.
//!
//! Every typed message is length-prefixed, so a receiver always knows
//! exactly how many payload bytes belong to the frame before it reads
//! them. Lengths are checked against [`FrameLimits`] before anything is
//! allocated.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::TransportError;

/// The reserved key byte that introduces a skin side-channel frame.
///
/// No registered message may use this key.
pub const SKIN_FRAME_KEY: u8 = 0;

/// Longest nickname accepted in a skin frame header, in bytes.
const MAX_NICKNAME_LEN: usize = 64;

/// The fixed-size header that precedes every typed message payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageHeader {
    /// The message key (never [`SKIN_FRAME_KEY`]).
    pub key: u8,
    /// Number of payload bytes that follow the header.
    pub length: u32,
}

/// Size limits enforced on both the sending and the receiving side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    /// Largest typed message payload, in bytes.
    pub max_message_len: usize,
    /// Largest skin image, in bytes.
    pub max_skin_len: usize,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_message_len: 1024 * 1024,
            max_skin_len: 4 * 1024 * 1024,
        }
    }
}

/// One unit of transfer on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A typed message: the key selects the message kind, the payload is
    /// its serialized body.
    Message { key: u8, payload: Vec<u8> },

    /// Out-of-band skin upload. Not a registered message.
    Skin { nickname: String, data: Vec<u8> },
}

impl Frame {
    /// Returns the header for a typed message frame, or `None` for the
    /// skin side-channel and for payloads too long to describe in a `u32`.
    pub fn header(&self) -> Option<MessageHeader> {
        match self {
            Frame::Message { key, payload } => Some(MessageHeader {
                key: *key,
                length: u32::try_from(payload.len()).ok()?,
            }),
            Frame::Skin { .. } => None,
        }
    }
}

/// Reads one frame.
///
/// Returns `Ok(None)` on a clean end of stream before the first byte of
/// a frame. End of stream anywhere inside a frame is
/// [`TransportError::Framing`].
pub async fn read_frame<R>(
    reader: &mut R,
    limits: &FrameLimits,
) -> Result<Option<Frame>, TransportError>
where
    R: AsyncRead + Unpin,
{
    let key = match reader.read_u8().await {
        Ok(key) => key,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(TransportError::ReceiveFailed(e)),
    };

    if key == SKIN_FRAME_KEY {
        return read_skin_body(reader, limits).await.map(Some);
    }

    let length = reader
        .read_u32()
        .await
        .map_err(|e| short_read(e, "message length"))?;
    let payload =
        read_exact_vec(reader, length as usize, limits.max_message_len, "message payload")
            .await?;

    Ok(Some(Frame::Message { key, payload }))
}

async fn read_skin_body<R>(
    reader: &mut R,
    limits: &FrameLimits,
) -> Result<Frame, TransportError>
where
    R: AsyncRead + Unpin,
{
    let nick_len = reader
        .read_u16()
        .await
        .map_err(|e| short_read(e, "skin nickname length"))?;
    if nick_len == 0 || nick_len as usize > MAX_NICKNAME_LEN {
        return Err(TransportError::Framing(format!(
            "skin nickname length {nick_len} out of range"
        )));
    }

    let raw = read_exact_vec(reader, nick_len as usize, MAX_NICKNAME_LEN, "skin nickname")
        .await?;
    let nickname = String::from_utf8(raw).map_err(|_| {
        TransportError::Framing("skin nickname is not valid UTF-8".into())
    })?;

    let length = reader
        .read_u32()
        .await
        .map_err(|e| short_read(e, "skin length"))?;
    let data =
        read_exact_vec(reader, length as usize, limits.max_skin_len, "skin data").await?;

    Ok(Frame::Skin { nickname, data })
}

/// Writes one frame and flushes it.
///
/// The frame is assembled in memory first so a failed size check never
/// leaves a partial header on the wire.
pub async fn write_frame<W>(
    writer: &mut W,
    frame: &Frame,
    limits: &FrameLimits,
) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let buf = encode_frame(frame, limits)?;
    writer
        .write_all(&buf)
        .await
        .map_err(TransportError::SendFailed)?;
    writer.flush().await.map_err(TransportError::SendFailed)
}

fn encode_frame(frame: &Frame, limits: &FrameLimits) -> Result<Vec<u8>, TransportError> {
    match frame {
        Frame::Message { key, payload } => {
            if *key == SKIN_FRAME_KEY {
                return Err(TransportError::Framing(
                    "key 0 is reserved for skin frames".into(),
                ));
            }
            let len = wire_len(payload.len(), limits.max_message_len)?;

            let mut buf = Vec::with_capacity(5 + payload.len());
            buf.push(*key);
            buf.extend_from_slice(&len.to_be_bytes());
            buf.extend_from_slice(payload);
            Ok(buf)
        }
        Frame::Skin { nickname, data } => {
            let nick = nickname.as_bytes();
            let nick_len = u16::try_from(nick.len())
                .ok()
                .filter(|&n| n != 0 && usize::from(n) <= MAX_NICKNAME_LEN)
                .ok_or_else(|| {
                    TransportError::Framing(format!(
                        "skin nickname length {} out of range",
                        nick.len()
                    ))
                })?;
            let len = wire_len(data.len(), limits.max_skin_len)?;

            let mut buf = Vec::with_capacity(7 + nick.len() + data.len());
            buf.push(SKIN_FRAME_KEY);
            buf.extend_from_slice(&nick_len.to_be_bytes());
            buf.extend_from_slice(nick);
            buf.extend_from_slice(&len.to_be_bytes());
            buf.extend_from_slice(data);
            Ok(buf)
        }
    }
}

/// Checks `len` against `max` and the `u32` length field.
fn wire_len(len: usize, max: usize) -> Result<u32, TransportError> {
    match u32::try_from(len) {
        Ok(wire) if len <= max => Ok(wire),
        _ => Err(TransportError::OversizedFrame { len, max }),
    }
}

async fn read_exact_vec<R>(
    reader: &mut R,
    len: usize,
    max: usize,
    what: &str,
) -> Result<Vec<u8>, TransportError>
where
    R: AsyncRead + Unpin,
{
    wire_len(len, max)?;
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|e| short_read(e, what))?;
    Ok(buf)
}

fn short_read(e: io::Error, what: &str) -> TransportError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        TransportError::Framing(format!("stream ended inside {what}"))
    } else {
        TransportError::ReceiveFailed(e)
    }
}
