//! `CraftgateServer` builder and server loop.
//!
//! This is the entry point for running a Craftgate server. It ties
//! together the layers: transport → protocol → handler → repository.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use craftgate_protocol::{Codec, JsonCodec};
use craftgate_repository::Repository;
use craftgate_transport::{FrameLimits, TcpTransport, Transport, TransportError};
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{CraftgateError, ServerConfig};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks.
pub(crate) struct ServerState<C: Codec> {
    pub(crate) repository: Repository,
    pub(crate) codec: C,
    pub(crate) idle_timeout: Duration,
    /// Held across the "is this nickname free" check and the create.
    pub(crate) registration: Mutex<()>,
}

/// Builder for configuring and starting a Craftgate server.
///
/// # Example
///
/// ```rust,ignore
/// use craftgate::prelude::*;
///
/// let server = CraftgateServer::builder()
///     .bind("0.0.0.0:7000")
///     .repository_root("/srv/craftgate")
///     .build()
///     .await?;
/// server.run().await
/// ```
pub struct CraftgateServerBuilder {
    config: ServerConfig,
}

impl CraftgateServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets the repository root directory.
    pub fn repository_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.repository_root = root.into();
        self
    }

    /// Sets the frame size limits.
    pub fn frame_limits(mut self, limits: FrameLimits) -> Self {
        self.config.frame_limits = limits;
        self
    }

    /// Sets how long a connection may stay silent.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = timeout;
        self
    }

    /// Opens the repository and binds the listener, using `JsonCodec`.
    pub async fn build(self) -> Result<CraftgateServer<JsonCodec>, CraftgateError> {
        self.build_with_codec(JsonCodec).await
    }

    /// Opens the repository and binds the listener with a custom codec.
    pub async fn build_with_codec<C: Codec>(
        self,
        codec: C,
    ) -> Result<CraftgateServer<C>, CraftgateError> {
        let repository = Repository::open(&self.config.repository_root).await?;
        let transport =
            TcpTransport::bind(&self.config.bind_addr, self.config.frame_limits).await?;

        let state = Arc::new(ServerState {
            repository,
            codec,
            idle_timeout: self.config.idle_timeout,
            registration: Mutex::new(()),
        });

        Ok(CraftgateServer { transport, state })
    }
}

impl Default for CraftgateServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Craftgate server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct CraftgateServer<C: Codec = JsonCodec> {
    transport: TcpTransport,
    state: Arc<ServerState<C>>,
}

impl CraftgateServer<JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> CraftgateServerBuilder {
        CraftgateServerBuilder::new()
    }
}

impl<C: Codec> CraftgateServer<C> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// The repository this server serves from.
    pub fn repository(&self) -> &Repository {
        &self.state.repository
    }

    /// Runs the server accept loop until the process is terminated.
    ///
    /// Spawns a handler task for each accepted connection.
    pub async fn run(self) -> Result<(), CraftgateError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `signal` resolves, then shuts the
    /// transport down and returns. Connections already accepted keep
    /// running on their own tasks.
    pub async fn run_until<F>(mut self, signal: F) -> Result<(), CraftgateError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(addr = ?self.transport.local_addr().ok(), "Craftgate server running");
        tokio::pin!(signal);
        let mut stopping = false;

        loop {
            let accepted = tokio::select! {
                biased;
                () = &mut signal, if !stopping => None,
                accepted = self.transport.accept() => Some(accepted),
            };
            let Some(accepted) = accepted else {
                stopping = true;
                self.transport.shutdown().await?;
                continue;
            };

            match accepted {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(TransportError::Shutdown) => {
                    tracing::info!("Craftgate server stopped");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
