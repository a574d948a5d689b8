//! Integration tests for the preparation pipeline and the launcher, using
//! stub collaborators that count their calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use craftgate_launcher::{
    CancellationToken, ForgeDescriptor, GameConfiguration, GameRuntime, GameVersion, LaunchSpec,
    Launcher, LauncherError, LocalPrefs, ModInstaller, ModPack, PipelineError, PipelineOptions,
    PreparationPipeline, Progress, ProgressReporter, ProviderError, Stage, StageError,
    ValidationMode,
};

const FORGE_PROFILE: &str = "1.19.2-forge-43.2.0";

// =========================================================================
// Stubs
// =========================================================================

#[derive(Default)]
struct StubRuntime {
    fetch_calls: AtomicUsize,
    download_calls: AtomicUsize,
    list_calls: AtomicUsize,
    launch_calls: AtomicUsize,
    active_downloads: AtomicUsize,
    peak_downloads: AtomicUsize,
    fail_fetch: bool,
    download_delay: Option<Duration>,
    /// Whether the forge profile shows up after installation.
    forge_listed: bool,
}

impl StubRuntime {
    fn new() -> Self {
        Self {
            forge_listed: true,
            ..Self::default()
        }
    }
}

impl GameRuntime for StubRuntime {
    async fn fetch_version(&self, name: &str) -> Result<GameVersion, ProviderError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_fetch {
            return Err(ProviderError::Failed(format!("no manifest for {name}")));
        }
        Ok(GameVersion::new(name))
    }

    async fn verify_and_download(
        &self,
        _version: &GameVersion,
        _mode: ValidationMode,
        progress: &ProgressReporter,
    ) -> Result<(), ProviderError> {
        self.download_calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active_downloads.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_downloads.fetch_max(active, Ordering::SeqCst);

        if let Some(delay) = self.download_delay {
            tokio::time::sleep(delay).await;
        }
        progress.download(3, 3);

        self.active_downloads.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_local_versions(&self) -> Result<Vec<GameVersion>, ProviderError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let mut versions = vec![GameVersion::new("1.19.2")];
        if self.forge_listed {
            versions.push(GameVersion {
                id: FORGE_PROFILE.into(),
                inherits_from: Some("1.19.2".into()),
            });
        }
        Ok(versions)
    }

    async fn launch_process(&self, _spec: &LaunchSpec) -> Result<(), ProviderError> {
        self.launch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct StubInstaller {
    forge_calls: AtomicUsize,
    pack_calls: AtomicUsize,
    fail_forge: bool,
    fail_pack: bool,
    forge_delay: Option<Duration>,
}

impl ModInstaller for StubInstaller {
    async fn install_forge(
        &self,
        _forge: &ForgeDescriptor,
        _mode: ValidationMode,
    ) -> Result<(), ProviderError> {
        self.forge_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.forge_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_forge {
            return Err(ProviderError::Failed("installer exited with 1".into()));
        }
        Ok(())
    }

    async fn install_mod_pack(
        &self,
        _pack: &ModPack,
        _mode: ValidationMode,
    ) -> Result<(), ProviderError> {
        self.pack_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_pack {
            return Err(ProviderError::Failed("checksum mismatch".into()));
        }
        Ok(())
    }
}

fn modded() -> GameConfiguration {
    GameConfiguration::modded(
        "1.19.2",
        ForgeDescriptor {
            name: FORGE_PROFILE.into(),
            installer_version: "43.2.0".into(),
        },
        ModPack {
            name: "survival".into(),
            mods: vec!["jei".into(), "waystones".into()],
        },
    )
}

fn calls(counter: &AtomicUsize) -> usize {
    counter.load(Ordering::SeqCst)
}

// =========================================================================
// Successful runs
// =========================================================================

#[tokio::test]
async fn test_vanilla_only_run() {
    let runtime = StubRuntime::new();
    let installer = StubInstaller::default();
    let pipeline = PreparationPipeline::new(&runtime, &installer, PipelineOptions::default());

    let run = pipeline.run(&GameConfiguration::vanilla("1.19.2")).await;

    assert!(run.is_success());
    assert_eq!(run.completed(), &[Stage::Vanilla]);
    assert_eq!(run.outcome().unwrap().id, "1.19.2");
    assert_eq!(calls(&runtime.fetch_calls), 1);
    assert_eq!(calls(&runtime.download_calls), 1);
    assert_eq!(calls(&installer.forge_calls), 0);
    assert_eq!(calls(&installer.pack_calls), 0);
}

#[tokio::test]
async fn test_modded_run_yields_forge_version() {
    let runtime = StubRuntime::new();
    let installer = StubInstaller::default();
    let pipeline = PreparationPipeline::new(&runtime, &installer, PipelineOptions::default());

    let run = pipeline.run(&modded()).await;

    assert_eq!(run.completed(), &[Stage::Vanilla, Stage::Forge, Stage::ModPack]);
    assert_eq!(run.vanilla_version().unwrap().id, "1.19.2");
    assert_eq!(run.forge_version().unwrap().id, FORGE_PROFILE);
    let version = run.into_result().unwrap();
    assert_eq!(version.id, FORGE_PROFILE);
    assert_eq!(version.inherits_from.as_deref(), Some("1.19.2"));
    assert_eq!(calls(&installer.forge_calls), 1);
    assert_eq!(calls(&installer.pack_calls), 1);
}

#[tokio::test]
async fn test_progress_events_follow_stages() {
    let runtime = StubRuntime::new();
    let installer = StubInstaller::default();
    let (progress, mut events) = ProgressReporter::channel();

    PreparationPipeline::new(&runtime, &installer, PipelineOptions::default())
        .with_progress(progress)
        .prepare(&modded())
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(
        seen,
        vec![
            Progress::StageStarted(Stage::Vanilla),
            Progress::Download {
                completed: 3,
                total: 3
            },
            Progress::StageFinished(Stage::Vanilla),
            Progress::StageStarted(Stage::Forge),
            Progress::StageFinished(Stage::Forge),
            Progress::StageStarted(Stage::ModPack),
            Progress::StageFinished(Stage::ModPack),
        ]
    );
}

// =========================================================================
// First failure wins
// =========================================================================

#[tokio::test]
async fn test_blank_version_fails_before_any_collaborator_call() {
    for blank in ["", "   "] {
        let runtime = StubRuntime::new();
        let installer = StubInstaller::default();
        let mut config = modded();
        config.vanilla = blank.to_string();

        let run = PreparationPipeline::new(&runtime, &installer, PipelineOptions::default())
            .run(&config)
            .await;

        assert!(matches!(
            run.outcome(),
            Err(PipelineError::Stage {
                stage: Stage::Vanilla,
                source: StageError::InvalidInput(_)
            })
        ));
        assert!(run.completed().is_empty());
        assert_eq!(calls(&runtime.fetch_calls), 0);
        assert_eq!(calls(&installer.forge_calls), 0);
        assert_eq!(calls(&installer.pack_calls), 0);
    }
}

#[tokio::test]
async fn test_provider_failure_stops_at_vanilla() {
    let runtime = StubRuntime {
        fail_fetch: true,
        ..StubRuntime::new()
    };
    let installer = StubInstaller::default();

    let err = PreparationPipeline::new(&runtime, &installer, PipelineOptions::default())
        .prepare(&modded())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Stage {
            stage: Stage::Vanilla,
            source: StageError::Provider(_)
        }
    ));
    assert_eq!(calls(&runtime.download_calls), 0);
    assert_eq!(calls(&installer.forge_calls), 0);
}

#[tokio::test]
async fn test_forge_failure_skips_mod_pack() {
    let runtime = StubRuntime::new();
    let installer = StubInstaller {
        fail_forge: true,
        ..StubInstaller::default()
    };

    let run = PreparationPipeline::new(&runtime, &installer, PipelineOptions::default())
        .run(&modded())
        .await;

    assert_eq!(run.failed_stage(), Some(Stage::Forge));
    assert!(matches!(
        run.outcome(),
        Err(PipelineError::Stage {
            source: StageError::Installer(_),
            ..
        })
    ));
    assert_eq!(run.completed(), &[Stage::Vanilla]);
    assert!(run.forge_version().is_none());
    assert_eq!(calls(&installer.pack_calls), 0);
    assert_eq!(calls(&runtime.list_calls), 0);
}

#[tokio::test]
async fn test_missing_forge_profile_is_version_not_found() {
    let runtime = StubRuntime {
        forge_listed: false,
        ..StubRuntime::new()
    };
    let installer = StubInstaller::default();

    let err = PreparationPipeline::new(&runtime, &installer, PipelineOptions::default())
        .prepare(&modded())
        .await
        .unwrap_err();

    match err {
        PipelineError::Stage {
            stage: Stage::Forge,
            source: StageError::VersionNotFound(name),
        } => assert_eq!(name, FORGE_PROFILE),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(calls(&installer.pack_calls), 0);
}

#[tokio::test]
async fn test_mod_pack_failure_keeps_earlier_results() {
    let runtime = StubRuntime::new();
    let installer = StubInstaller {
        fail_pack: true,
        ..StubInstaller::default()
    };

    let run = PreparationPipeline::new(&runtime, &installer, PipelineOptions::default())
        .run(&modded())
        .await;

    assert_eq!(run.failed_stage(), Some(Stage::ModPack));
    assert_eq!(run.completed(), &[Stage::Vanilla, Stage::Forge]);
    assert_eq!(run.forge_version().unwrap().id, FORGE_PROFILE);
}

// =========================================================================
// Timeouts and cancellation
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_stage_deadline() {
    let runtime = StubRuntime {
        download_delay: Some(Duration::from_secs(600)),
        ..StubRuntime::new()
    };
    let installer = StubInstaller::default();
    let options = PipelineOptions {
        stage_timeout: Some(Duration::from_secs(30)),
        ..PipelineOptions::default()
    };

    let err = PreparationPipeline::new(&runtime, &installer, options)
        .prepare(&modded())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::TimedOut {
            stage: Stage::Vanilla,
            after
        } if after == Duration::from_secs(30)
    ));
    assert_eq!(calls(&installer.forge_calls), 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_deadline_waits_for_slow_stage() {
    let runtime = StubRuntime {
        download_delay: Some(Duration::from_secs(3600)),
        ..StubRuntime::new()
    };
    let installer = StubInstaller::default();

    let version = PreparationPipeline::new(&runtime, &installer, PipelineOptions::default())
        .prepare(&GameConfiguration::vanilla("1.19.2"))
        .await
        .unwrap();
    assert_eq!(version.id, "1.19.2");
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let runtime = StubRuntime::new();
    let installer = StubInstaller::default();
    let token = CancellationToken::new();
    token.cancel();

    let err = PreparationPipeline::new(&runtime, &installer, PipelineOptions::default())
        .with_cancellation(token)
        .prepare(&modded())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Cancelled {
            stage: Stage::Vanilla
        }
    ));
    assert_eq!(calls(&runtime.fetch_calls), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_during_forge() {
    let runtime = StubRuntime::new();
    let installer = StubInstaller {
        forge_delay: Some(Duration::from_secs(600)),
        ..StubInstaller::default()
    };
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(5)).await;
        canceller.cancel();
    });

    let run = PreparationPipeline::new(&runtime, &installer, PipelineOptions::default())
        .with_cancellation(token)
        .run(&modded())
        .await;

    assert!(matches!(
        run.outcome(),
        Err(PipelineError::Cancelled {
            stage: Stage::Forge
        })
    ));
    assert_eq!(run.completed(), &[Stage::Vanilla]);
    assert_eq!(calls(&installer.pack_calls), 0);
}

// =========================================================================
// Launcher
// =========================================================================

#[tokio::test]
async fn test_launch_starts_forge_profile() {
    let launcher = Launcher::new(StubRuntime::new(), StubInstaller::default(), LocalPrefs::default());

    let spec = launcher
        .launch(
            "Alice",
            &modded(),
            ProgressReporter::disabled(),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(spec.version.id, FORGE_PROFILE);
    assert_eq!(spec.dedicated_ram_mb, LocalPrefs::default().dedicated_ram_mb);
    assert_eq!(calls(&launcher.runtime().launch_calls), 1);
}

#[tokio::test]
async fn test_failed_preparation_never_launches() {
    let installer = StubInstaller {
        fail_forge: true,
        ..StubInstaller::default()
    };
    let launcher = Launcher::new(StubRuntime::new(), installer, LocalPrefs::default());

    let err = launcher
        .launch(
            "Alice",
            &modded(),
            ProgressReporter::disabled(),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    match err {
        LauncherError::Preparation(inner) => assert_eq!(inner.stage(), Stage::Forge),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(calls(&launcher.runtime().launch_calls), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_launches_are_serialized() {
    let runtime = StubRuntime {
        download_delay: Some(Duration::from_secs(10)),
        ..StubRuntime::new()
    };
    let launcher = Launcher::new(runtime, StubInstaller::default(), LocalPrefs::default());
    let game = GameConfiguration::vanilla("1.19.2");

    let (first, second) = tokio::join!(
        launcher.launch(
            "Alice",
            &game,
            ProgressReporter::disabled(),
            CancellationToken::new()
        ),
        launcher.launch(
            "Bob",
            &game,
            ProgressReporter::disabled(),
            CancellationToken::new()
        ),
    );

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(calls(&launcher.runtime().download_calls), 2);
    assert_eq!(calls(&launcher.runtime().peak_downloads), 1);
    assert_eq!(calls(&launcher.runtime().launch_calls), 2);
}
