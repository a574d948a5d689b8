//! Error types for the launcher.
//!
//! Three levels, innermost first:
//! - [`ProviderError`]: what a [`GameRuntime`](crate::GameRuntime) or
//!   [`ModInstaller`](crate::ModInstaller) implementation reports.
//! - [`StageError`] / [`PipelineError`]: why preparation stopped, and at
//!   which stage.
//! - [`LauncherError`]: everything the public launcher API can return.

use std::path::PathBuf;
use std::time::Duration;

use craftgate_protocol::{MessageKind, ProtocolError};
use craftgate_transport::TransportError;

use crate::Stage;

/// A failure reported by a collaborator (game runtime or mod installer).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The collaborator gave up with a message.
    #[error("{0}")]
    Failed(String),

    /// Underlying I/O failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Why a single preparation stage failed.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The game configuration itself is unusable (for example a blank
    /// version name).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The game runtime failed to resolve, verify or download a version.
    #[error("game runtime failed: {0}")]
    Provider(#[source] ProviderError),

    /// The mod installer failed.
    #[error("installer failed: {0}")]
    Installer(#[source] ProviderError),

    /// An installed version could not be found locally.
    #[error("version {0:?} not found")]
    VersionNotFound(String),
}

/// Why the preparation pipeline stopped. Always names the stage.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A stage returned an error.
    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: StageError,
    },

    /// The caller cancelled while this stage was running.
    #[error("{stage} stage cancelled")]
    Cancelled { stage: Stage },

    /// The stage ran past its deadline.
    #[error("{stage} stage timed out after {after:?}")]
    TimedOut { stage: Stage, after: Duration },
}

impl PipelineError {
    /// The stage the pipeline was in when it stopped.
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Stage { stage, .. }
            | PipelineError::Cancelled { stage }
            | PipelineError::TimedOut { stage, .. } => *stage,
        }
    }
}

/// Top-level launcher error.
#[derive(Debug, thiserror::Error)]
pub enum LauncherError {
    /// Connecting to or talking with the server failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A message could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Local preparation failed.
    #[error("preparation failed: {0}")]
    Preparation(#[from] PipelineError),

    /// The game runtime could not start the process.
    #[error("launch failed: {0}")]
    Launch(#[source] ProviderError),

    /// The user has not paid enough to play.
    #[error("balance {balance} is below the required {required}")]
    InsufficientBalance { balance: u64, required: u64 },

    /// The server answered with the wrong kind of message.
    #[error("expected {expected}, server sent {actual}")]
    UnexpectedResponse {
        expected: MessageKind,
        actual: MessageKind,
    },

    /// The server closed the connection before answering.
    #[error("server closed the connection before answering {0}")]
    NoResponse(MessageKind),

    /// An earlier exchange on this connection was dropped before it
    /// finished, so replies can no longer be matched to requests. The
    /// connection has been closed; reconnect to continue.
    #[error("connection out of step after an abandoned request")]
    Desynchronized,

    /// A local file could not be read or written.
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The local preferences file is not valid JSON for [`LocalPrefs`](crate::LocalPrefs).
    #[error("invalid preferences file {path:?}: {source}")]
    Prefs {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
