/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Dialing the remote peer failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// The byte stream did not contain a well-formed frame: a short read
    /// inside a frame, a bad length, or a malformed side-channel header.
    #[error("framing error: {0}")]
    Framing(String),

    /// A frame announced (or tried to send) more bytes than the limits allow.
    #[error("frame of {len} bytes exceeds limit of {max} bytes")]
    OversizedFrame { len: usize, max: usize },

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}
