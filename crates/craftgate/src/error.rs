//! Unified error type for the Craftgate server.

use craftgate_protocol::ProtocolError;
use craftgate_repository::RepositoryError;
use craftgate_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CraftgateError {
    /// A transport-level error (bind, accept, framing).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (unknown key, decode, protocol violation).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A storage error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
