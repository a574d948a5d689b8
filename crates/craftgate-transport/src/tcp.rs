//! TCP transport implementation using `tokio::net`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

use crate::frame::{read_frame, write_frame};
use crate::{Connection, ConnectionId, Frame, FrameLimits, Transport, TransportError};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A TCP-based [`Transport`] that listens for incoming connections.
pub struct TcpTransport {
    listener: TcpListener,
    limits: FrameLimits,
    shut_down: AtomicBool,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str, limits: FrameLimits) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self {
            listener,
            limits,
            shut_down: AtomicBool::new(false),
        })
    }

    /// Returns the address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Connection, Self::Error> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(TransportError::Shutdown);
        }

        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let conn = TcpConnection::from_stream(stream, addr, self.limits);
        tracing::debug!(id = %conn.id, %addr, "accepted TCP connection");
        Ok(conn)
    }

    async fn shutdown(&self) -> Result<(), Self::Error> {
        self.shut_down.store(true, Ordering::Release);
        tracing::info!("TCP transport shut down");
        Ok(())
    }
}

/// A single TCP connection.
///
/// The read and write halves are locked independently, so one task can
/// wait for the next frame while another sends.
pub struct TcpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    limits: FrameLimits,
    reader: Mutex<BufReader<OwnedReadHalf>>,
    writer: Mutex<OwnedWriteHalf>,
}

impl TcpConnection {
    /// Dials a server and wraps the stream as a connection.
    pub async fn connect(addr: &str, limits: FrameLimits) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(TransportError::ConnectFailed)?;
        let peer = stream.peer_addr().map_err(TransportError::ConnectFailed)?;
        let conn = Self::from_stream(stream, peer, limits);
        tracing::debug!(id = %conn.id, %peer, "connected");
        Ok(conn)
    }

    fn from_stream(stream: TcpStream, peer: SocketAddr, limits: FrameLimits) -> Self {
        // Request/response traffic is latency bound; a failure here only
        // costs throughput.
        let _ = stream.set_nodelay(true);
        let (read, write) = stream.into_split();
        Self {
            id: ConnectionId::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)),
            peer,
            limits,
            reader: Mutex::new(BufReader::new(read)),
            writer: Mutex::new(write),
        }
    }

    /// Returns the remote address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Returns the limits this connection enforces.
    pub fn limits(&self) -> FrameLimits {
        self.limits
    }
}

impl Connection for TcpConnection {
    type Error = TransportError;

    async fn send(&self, frame: &Frame) -> Result<(), Self::Error> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, frame, &self.limits).await
    }

    async fn recv(&self) -> Result<Option<Frame>, Self::Error> {
        let mut reader = self.reader.lock().await;
        read_frame(&mut *reader, &self.limits).await
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.writer
            .lock()
            .await
            .shutdown()
            .await
            .map_err(TransportError::SendFailed)
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
