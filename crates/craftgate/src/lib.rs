//! # Craftgate
//!
//! Account, configuration and skin server for the Craftgate game launcher.
//!
//! Launchers connect over TCP and exchange length-prefixed typed frames:
//! registration, login, launch configuration and version-stamp requests,
//! plus an out-of-band channel for skin uploads. Everything the server
//! knows lives in a flat-file [`Repository`](craftgate_repository::Repository).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use craftgate::prelude::*;
//!
//! # async fn start() -> Result<(), CraftgateError> {
//! let server = CraftgateServer::builder()
//!     .bind("0.0.0.0:7000")
//!     .repository_root("/srv/craftgate")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ServerConfig;
pub use error::CraftgateError;
pub use server::{CraftgateServer, CraftgateServerBuilder};

/// Everything needed to run or talk to a server, in one import.
pub mod prelude {
    pub use crate::{CraftgateError, CraftgateServer, CraftgateServerBuilder, ServerConfig};
    pub use craftgate_protocol::{
        ConfigurationVersion, JsonCodec, LaunchConfiguration, Message, MessageKind,
        MessageRegistry, ProtocolError, User, UserProfile,
    };
    pub use craftgate_repository::{Repository, RepositoryError};
    pub use craftgate_transport::{FrameLimits, TransportError};
}
