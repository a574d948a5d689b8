//! Client side of Craftgate.
//!
//! - [`LauncherClient`] talks to the server: registration, login, launch
//!   configuration, version stamps and skin uploads.
//! - [`PreparationPipeline`] installs what a [`GameConfiguration`] needs,
//!   stage by stage, through the [`GameRuntime`] and [`ModInstaller`]
//!   collaborators.
//! - [`Launcher`] ties preparation to [`LocalPrefs`] and starts the game.
//!
//! ```rust,ignore
//! let client = LauncherClient::connect("127.0.0.1:4000").await?;
//! let login = client.login("Alice", "hunter2").await?;
//! let config = client.fetch_launch_configuration().await?;
//! Launcher::<MyRuntime, MyInstaller>::check_entitlement(&login.profile.unwrap(), &config)?;
//!
//! let launcher = Launcher::new(runtime, installer, LocalPrefs::load_or_default(path).await?);
//! launcher.launch("Alice", &game, ProgressReporter::disabled(), token).await?;
//! ```

mod client;
mod error;
mod game;
mod launcher;
mod pipeline;
mod prefs;
mod runtime;

pub use client::LauncherClient;
pub use error::{LauncherError, PipelineError, ProviderError, StageError};
pub use game::{
    ForgeDescriptor, GameConfiguration, GameVersion, LaunchSpec, ModPack, ModSetup,
    ValidationMode,
};
pub use launcher::Launcher;
pub use pipeline::{PipelineOptions, PipelineRun, PreparationPipeline, Stage};
pub use prefs::LocalPrefs;
pub use runtime::{GameRuntime, ModInstaller, Progress, ProgressReporter};

pub use tokio_util::sync::CancellationToken;
