//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use craftgate_transport::FrameLimits;

/// Everything needed to start a [`CraftgateServer`](crate::CraftgateServer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: String,
    /// Directory holding `Users/`, `Skins/` and the configuration files.
    pub repository_root: PathBuf,
    /// Frame size limits for every connection.
    pub frame_limits: FrameLimits,
    /// A connection that sends nothing for this long is closed.
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:7000".to_string(),
            repository_root: PathBuf::from("data"),
            frame_limits: FrameLimits::default(),
            idle_timeout: Duration::from_secs(60),
        }
    }
}
