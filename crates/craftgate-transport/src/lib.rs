//! Transport layer for Craftgate.
//!
//! Provides the [`Transport`] and [`Connection`] traits and a TCP
//! implementation that moves length-prefixed [`Frame`]s between the
//! launcher and the server.
//!
//! Two kinds of frame share one byte stream:
//!
//! ```text
//! typed message:  [key: u8 != 0][len: u32 BE][payload]
//! skin transfer:  [0x00][nick_len: u16 BE][nickname][len: u32 BE][png bytes]
//! ```
//!
//! The transport never interprets message payloads; it only knows the
//! key byte and how many bytes follow it.

#![allow(async_fn_in_trait)]

mod error;
mod frame;
mod tcp;

pub use error::TransportError;
pub use frame::{
    Frame, FrameLimits, MessageHeader, SKIN_FRAME_KEY, read_frame, write_frame,
};
pub use tcp::{TcpConnection, TcpTransport};

use std::fmt;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for and accepts the next incoming connection.
    async fn accept(&mut self) -> Result<Self::Connection, Self::Error>;

    /// Stops handing out new connections. Connections already accepted
    /// are unaffected.
    async fn shutdown(&self) -> Result<(), Self::Error>;
}

/// A single connection that exchanges whole frames.
///
/// Each connection owns its own read and write state; nothing about
/// framing is shared between connections.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Writes one frame to the remote peer.
    async fn send(&self, frame: &Frame) -> Result<(), Self::Error>;

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed between
    /// frames. A close in the middle of a frame is an error.
    async fn recv(&self) -> Result<Option<Frame>, Self::Error>;

    /// Closes the write side of the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
