//! Collaborator traits and the progress side channel.
//!
//! The launcher does not install or run the game itself. It drives two
//! collaborators:
//!
//! - [`GameRuntime`]: resolves, downloads and verifies game versions, and
//!   starts the game process.
//! - [`ModInstaller`]: installs the mod loader and the mod pack.
//!
//! Production code plugs in real implementations; tests plug in stubs.

use std::future::Future;

use tokio::sync::mpsc;

use crate::{
    ForgeDescriptor, GameVersion, LaunchSpec, ModPack, ProviderError, Stage, ValidationMode,
};

/// Resolves, downloads and starts game versions.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` so one runtime can be shared by the launcher
/// across tasks.
pub trait GameRuntime: Send + Sync + 'static {
    /// Looks up version metadata by name.
    fn fetch_version(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<GameVersion, ProviderError>> + Send;

    /// Makes sure every file of `version` is present and valid, fetching
    /// what is missing. Download progress goes to `progress`.
    fn verify_and_download(
        &self,
        version: &GameVersion,
        mode: ValidationMode,
        progress: &ProgressReporter,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Versions already installed locally, loader profiles included.
    fn list_local_versions(
        &self,
    ) -> impl Future<Output = Result<Vec<GameVersion>, ProviderError>> + Send;

    /// Starts the game. Returns once the process is spawned.
    fn launch_process(
        &self,
        spec: &LaunchSpec,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;
}

/// Installs the mod loader and mod packs.
pub trait ModInstaller: Send + Sync + 'static {
    /// Installs the loader so its version profile shows up locally.
    fn install_forge(
        &self,
        forge: &ForgeDescriptor,
        mode: ValidationMode,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;

    /// Installs (or refreshes) the mods of `pack`.
    fn install_mod_pack(
        &self,
        pack: &ModPack,
        mode: ValidationMode,
    ) -> impl Future<Output = Result<(), ProviderError>> + Send;
}

/// A progress event emitted while preparing a launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    StageStarted(Stage),
    /// Forwarded from the game runtime while it downloads.
    Download { completed: u64, total: u64 },
    StageFinished(Stage),
}

/// Sending half of the progress channel. Reporting never fails: with no
/// receiver, or after the receiver is dropped, events are discarded.
#[derive(Debug, Clone, Default)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<Progress>>,
}

impl ProgressReporter {
    /// Reports into `tx`.
    pub fn new(tx: mpsc::UnboundedSender<Progress>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A reporter that discards everything.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Creates a reporter together with the receiver for its events.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Progress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Reports download progress.
    pub fn download(&self, completed: u64, total: u64) {
        self.emit(Progress::Download { completed, total });
    }

    pub(crate) fn emit(&self, event: Progress) {
        if let Some(tx) = &self.tx {
            // A closed receiver just means nobody is watching any more.
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_delivers_in_order() {
        let (reporter, mut rx) = ProgressReporter::channel();
        reporter.emit(Progress::StageStarted(Stage::Vanilla));
        reporter.download(1, 4);
        reporter.emit(Progress::StageFinished(Stage::Vanilla));

        assert_eq!(rx.try_recv().unwrap(), Progress::StageStarted(Stage::Vanilla));
        assert_eq!(
            rx.try_recv().unwrap(),
            Progress::Download {
                completed: 1,
                total: 4
            }
        );
        assert_eq!(rx.try_recv().unwrap(), Progress::StageFinished(Stage::Vanilla));
    }

    #[test]
    fn test_reporting_after_receiver_dropped_is_silent() {
        let (reporter, rx) = ProgressReporter::channel();
        drop(rx);
        reporter.download(1, 1);
        ProgressReporter::disabled().download(1, 1);
    }
}
