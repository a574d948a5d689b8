//! Launch orchestration: entitlement check, preparation, process start.

use craftgate_protocol::{LaunchConfiguration, UserProfile};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    GameConfiguration, GameRuntime, LaunchSpec, LauncherError, LocalPrefs, ModInstaller,
    PreparationPipeline, ProgressReporter,
};

/// Prepares and starts the game for one installation target.
///
/// Launches through the same `Launcher` are serialized: two concurrent
/// calls never install into the same game directory at once.
pub struct Launcher<R, I> {
    runtime: R,
    installer: I,
    prefs: LocalPrefs,
    launch_lock: Mutex<()>,
}

impl<R, I> Launcher<R, I>
where
    R: GameRuntime,
    I: ModInstaller,
{
    pub fn new(runtime: R, installer: I, prefs: LocalPrefs) -> Self {
        Self {
            runtime,
            installer,
            prefs,
            launch_lock: Mutex::new(()),
        }
    }

    pub fn prefs(&self) -> &LocalPrefs {
        &self.prefs
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn installer(&self) -> &I {
        &self.installer
    }

    /// Refuses to play when the user's balance is below the deployment's
    /// threshold.
    pub fn check_entitlement(
        profile: &UserProfile,
        config: &LaunchConfiguration,
    ) -> Result<(), LauncherError> {
        if profile.balance < config.required_balance {
            return Err(LauncherError::InsufficientBalance {
                balance: profile.balance,
                required: config.required_balance,
            });
        }
        Ok(())
    }

    /// Prepares `game` and starts it for `nickname`.
    ///
    /// Returns the spec the process was started with.
    ///
    /// # Errors
    /// - [`LauncherError::Preparation`] naming the stage that failed, was
    ///   cancelled, or timed out
    /// - [`LauncherError::Launch`] if the runtime could not start the process
    pub async fn launch(
        &self,
        nickname: &str,
        game: &GameConfiguration,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> Result<LaunchSpec, LauncherError> {
        let _serial = self.launch_lock.lock().await;
        tracing::info!(
            %nickname,
            vanilla = %game.vanilla,
            modded = game.is_modded(),
            "launch requested"
        );

        let version = PreparationPipeline::new(
            &self.runtime,
            &self.installer,
            self.prefs.pipeline_options(),
        )
        .with_progress(progress)
        .with_cancellation(cancel)
        .prepare(game)
        .await?;

        let spec = LaunchSpec {
            nickname: nickname.to_string(),
            version,
            dedicated_ram_mb: self.prefs.dedicated_ram_mb,
            fullscreen: self.prefs.fullscreen,
        };
        self.runtime
            .launch_process(&spec)
            .await
            .map_err(LauncherError::Launch)?;

        tracing::info!(%nickname, version = %spec.version, "game process started");
        Ok(spec)
    }
}
