//! The launch preparation pipeline.
//!
//! Preparation runs as a small state machine:
//!
//! ```text
//! Vanilla ──(no mods)──────────────────────► Done(vanilla)
//!    │
//!    └──(modded)──► Forge ──► ModPack ─────► Done(forge)
//! ```
//!
//! Each transition is one [`step`](PreparationPipeline::run). The first
//! stage to fail stops the machine and the failure is reported with the
//! stage it happened in; later stages never run. Every stage runs under
//! the pipeline's [`CancellationToken`] and, if configured, a per-stage
//! deadline.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{
    ForgeDescriptor, GameConfiguration, GameRuntime, GameVersion, ModInstaller, ModPack,
    ModSetup, PipelineError, Progress, ProgressReporter, StageError, ValidationMode,
};

/// A named step of preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vanilla,
    Forge,
    ModPack,
    /// Terminal; nothing left to do.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Vanilla => "Vanilla",
            Stage::Forge => "Forge",
            Stage::ModPack => "ModPack",
            Stage::Done => "Done",
        };
        f.write_str(name)
    }
}

/// Tuning for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Passed through to every install and verify call.
    pub validation_mode: ValidationMode,
    /// Deadline for each stage. `None` lets stages run as long as they
    /// need; only cancellation stops them.
    pub stage_timeout: Option<Duration>,
}

/// Where the machine is, plus what the next stage needs.
enum Cursor<'c> {
    Vanilla,
    Forge { setup: &'c ModSetup },
    ModPack { pack: &'c ModPack, forge: GameVersion },
    Done(GameVersion),
}

impl Cursor<'_> {
    fn stage(&self) -> Stage {
        match self {
            Cursor::Vanilla => Stage::Vanilla,
            Cursor::Forge { .. } => Stage::Forge,
            Cursor::ModPack { .. } => Stage::ModPack,
            Cursor::Done(_) => Stage::Done,
        }
    }
}

#[derive(Default)]
struct Resolved {
    vanilla: Option<GameVersion>,
    forge: Option<GameVersion>,
}

/// The record of one pipeline run: which stages finished, what they
/// resolved, and how it ended.
#[derive(Debug)]
pub struct PipelineRun {
    completed: Vec<Stage>,
    vanilla: Option<GameVersion>,
    forge: Option<GameVersion>,
    outcome: Result<GameVersion, PipelineError>,
}

impl PipelineRun {
    fn finish(
        completed: Vec<Stage>,
        resolved: Resolved,
        outcome: Result<GameVersion, PipelineError>,
    ) -> Self {
        Self {
            completed,
            vanilla: resolved.vanilla,
            forge: resolved.forge,
            outcome,
        }
    }

    /// Stages that finished successfully, in order.
    pub fn completed(&self) -> &[Stage] {
        &self.completed
    }

    /// The vanilla version, once the vanilla stage has finished.
    pub fn vanilla_version(&self) -> Option<&GameVersion> {
        self.vanilla.as_ref()
    }

    /// The installed forge version, once the forge stage has finished.
    pub fn forge_version(&self) -> Option<&GameVersion> {
        self.forge.as_ref()
    }

    /// The stage that failed, if any.
    pub fn failed_stage(&self) -> Option<Stage> {
        self.outcome.as_ref().err().map(PipelineError::stage)
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The version to launch, or the first failure.
    pub fn outcome(&self) -> Result<&GameVersion, &PipelineError> {
        self.outcome.as_ref()
    }

    pub fn into_result(self) -> Result<GameVersion, PipelineError> {
        self.outcome
    }
}

/// Prepares a [`GameConfiguration`] for launch using the given
/// collaborators.
///
/// ```rust,ignore
/// let (progress, mut events) = ProgressReporter::channel();
/// let version = PreparationPipeline::new(&runtime, &installer, options)
///     .with_progress(progress)
///     .with_cancellation(token.child_token())
///     .prepare(&config)
///     .await?;
/// ```
pub struct PreparationPipeline<'a, R, I> {
    runtime: &'a R,
    installer: &'a I,
    options: PipelineOptions,
    progress: ProgressReporter,
    cancel: CancellationToken,
}

impl<'a, R, I> PreparationPipeline<'a, R, I>
where
    R: GameRuntime,
    I: ModInstaller,
{
    pub fn new(runtime: &'a R, installer: &'a I, options: PipelineOptions) -> Self {
        Self {
            runtime,
            installer,
            options,
            progress: ProgressReporter::disabled(),
            cancel: CancellationToken::new(),
        }
    }

    /// Sends stage and download events to `progress`.
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Stops the run at the current stage once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Runs every stage and returns the version to launch.
    pub async fn prepare(&self, config: &GameConfiguration) -> Result<GameVersion, PipelineError> {
        self.run(config).await.into_result()
    }

    /// Runs every stage and returns the full record of the run.
    pub async fn run(&self, config: &GameConfiguration) -> PipelineRun {
        let mut completed = Vec::new();
        let mut resolved = Resolved::default();
        let mut cursor = Cursor::Vanilla;

        loop {
            let current = match cursor {
                Cursor::Done(version) => {
                    tracing::info!(%version, stages = completed.len(), "preparation finished");
                    return PipelineRun::finish(completed, resolved, Ok(version));
                }
                other => other,
            };

            let stage = current.stage();
            tracing::info!(%stage, "stage started");
            self.progress.emit(Progress::StageStarted(stage));

            match self.step(current, config, &mut resolved).await {
                Ok(next) => {
                    tracing::info!(%stage, next = %next.stage(), "stage finished");
                    self.progress.emit(Progress::StageFinished(stage));
                    completed.push(stage);
                    cursor = next;
                }
                Err(error) => {
                    tracing::warn!(%stage, error = %error, "preparation stopped");
                    return PipelineRun::finish(completed, resolved, Err(error));
                }
            }
        }
    }

    async fn step<'c>(
        &self,
        cursor: Cursor<'c>,
        config: &'c GameConfiguration,
        resolved: &mut Resolved,
    ) -> Result<Cursor<'c>, PipelineError> {
        match cursor {
            Cursor::Vanilla => {
                let version = self
                    .guarded(Stage::Vanilla, self.prepare_vanilla(&config.vanilla))
                    .await?;
                resolved.vanilla = Some(version.clone());
                Ok(match &config.modding {
                    Some(setup) => Cursor::Forge { setup },
                    None => Cursor::Done(version),
                })
            }
            Cursor::Forge { setup } => {
                let forge = self
                    .guarded(Stage::Forge, self.prepare_forge(&setup.forge))
                    .await?;
                resolved.forge = Some(forge.clone());
                Ok(Cursor::ModPack {
                    pack: &setup.mod_pack,
                    forge,
                })
            }
            Cursor::ModPack { pack, forge } => {
                self.guarded(Stage::ModPack, self.prepare_mods(pack)).await?;
                Ok(Cursor::Done(forge))
            }
            done @ Cursor::Done(_) => Ok(done),
        }
    }

    async fn prepare_vanilla(&self, name: &str) -> Result<GameVersion, StageError> {
        if name.trim().is_empty() {
            return Err(StageError::InvalidInput("version name is empty".into()));
        }
        let version = self
            .runtime
            .fetch_version(name)
            .await
            .map_err(StageError::Provider)?;
        self.runtime
            .verify_and_download(&version, self.options.validation_mode, &self.progress)
            .await
            .map_err(StageError::Provider)?;
        Ok(version)
    }

    async fn prepare_forge(&self, forge: &ForgeDescriptor) -> Result<GameVersion, StageError> {
        self.installer
            .install_forge(forge, self.options.validation_mode)
            .await
            .map_err(StageError::Installer)?;

        // The installer writes a new local profile; pick it up by name.
        let local = self
            .runtime
            .list_local_versions()
            .await
            .map_err(StageError::Provider)?;
        local
            .into_iter()
            .find(|v| v.id == forge.name)
            .ok_or_else(|| StageError::VersionNotFound(forge.name.clone()))
    }

    async fn prepare_mods(&self, pack: &ModPack) -> Result<(), StageError> {
        self.installer
            .install_mod_pack(pack, self.options.validation_mode)
            .await
            .map_err(StageError::Installer)
    }

    /// Runs one stage's work under cancellation and the optional deadline.
    async fn guarded<T>(
        &self,
        stage: Stage,
        work: impl Future<Output = Result<T, StageError>>,
    ) -> Result<T, PipelineError> {
        let bounded = async {
            match self.options.stage_timeout {
                Some(after) => match tokio::time::timeout(after, work).await {
                    Ok(result) => result.map_err(|source| PipelineError::Stage { stage, source }),
                    Err(_) => Err(PipelineError::TimedOut { stage, after }),
                },
                None => work
                    .await
                    .map_err(|source| PipelineError::Stage { stage, source }),
            }
        };

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(PipelineError::Cancelled { stage }),
            result = bounded => result,
        }
    }
}
