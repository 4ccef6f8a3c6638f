use std::time::{Duration, Instant};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{BuildConfiguration, assemble_configuration};
use crate::engine::{BuildEngine, BuildStats};
use crate::error::{BuildError, CleanError, PayloadError, StagehandError};
use crate::io::{CleanReport, as_overhead};
use crate::payload::{PayloadProvider, PluginPayload};
use crate::settings::Settings;

/// Runs one staging pass: clean and fetch the payload, assemble the
/// configuration, build once, report.
///
/// Every stage short-circuits on error, so a failed cleanup or a rejected
/// payload never reaches the engine, and the engine is never retried.
pub struct Orchestrator<P, E> {
    settings: Settings,
    provider: P,
    engine: E,
}

impl<P, E> Orchestrator<P, E>
where
    P: PayloadProvider,
    E: BuildEngine,
{
    pub fn new(settings: Settings, provider: P, engine: E) -> Self {
        Self {
            settings,
            provider,
            engine,
        }
    }

    /// Run the whole pipeline and print the engine's summary on success.
    pub async fn run(&self) -> Result<BuildStats, StagehandError> {
        eprintln!(
            "Running {} in {} mode.",
            style("stagehand").red(),
            style(format!("{:?}", self.settings.mode).to_lowercase()).blue()
        );

        let config = self.prepare().await?;
        let stats = self.run_build(config).await?;

        report(&stats);
        Ok(stats)
    }

    /// Everything up to, but not including, the engine: cleanup and payload
    /// resolution run side by side, then the configuration is assembled.
    ///
    /// The first error is returned without waiting for the other branch. A
    /// failed payload does not stop cleanup that is already running on the
    /// blocking pool; it finishes in the background and its result is dropped.
    pub async fn prepare(&self) -> Result<BuildConfiguration, StagehandError> {
        let (clean, payload) = tokio::try_join!(
            async { self.stage_clean_output().await.map_err(StagehandError::from) },
            async { self.await_plugin_payload().await.map_err(StagehandError::from) },
        )?;

        tracing::debug!(
            output_existed = clean.output_existed,
            purged = clean.purged.len(),
            "cleanup finished"
        );

        let config = self.assemble_configuration(&payload);
        match config.fingerprint() {
            Ok(fingerprint) => tracing::info!(%fingerprint, "assembled build configuration"),
            Err(e) => tracing::warn!("couldn't fingerprint build configuration: {e}"),
        }

        Ok(config)
    }

    pub async fn stage_clean_output(&self) -> Result<CleanReport, CleanError> {
        let settings = self.settings.clone();

        tokio::task::spawn_blocking(move || crate::io::stage_clean_output(&settings)).await?
    }

    pub async fn await_plugin_payload(&self) -> Result<PluginPayload, PayloadError> {
        let s = Instant::now();
        let payload = self.provider.fetch().await?;

        eprintln!(
            "Received plugin payload with {} plugins and {} sitemap paths {}",
            payload.plugins.len(),
            payload.sitemap_paths.len(),
            as_overhead(s)
        );

        Ok(payload)
    }

    pub fn assemble_configuration(&self, payload: &PluginPayload) -> BuildConfiguration {
        assemble_configuration(&self.settings, payload)
    }

    /// Hand the configuration to the engine. The configuration is consumed,
    /// so it cannot be built twice.
    pub async fn run_build(&self, config: BuildConfiguration) -> Result<BuildStats, BuildError> {
        let s = Instant::now();

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed}] {msg}")
                .expect("Error setting progress bar template"),
        );
        pb.set_message(format!("Building {}", config.entry()));
        pb.enable_steady_tick(Duration::from_millis(100));

        let result = self.engine.run(&config).await;
        pb.finish_and_clear();

        let stats = result?;

        for warning in &stats.warnings {
            tracing::warn!("{warning}");
        }

        if stats.has_errors() {
            return Err(BuildError::Compilation {
                errors: stats.errors,
            });
        }

        eprintln!(
            "Built {} assets into {} {}",
            stats.assets.len(),
            config.output().path,
            as_overhead(s)
        );

        Ok(stats)
    }
}

fn report(stats: &BuildStats) {
    println!("{stats}");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use camino::Utf8PathBuf;

    use super::*;
    use crate::engine::EmittedAsset;
    use crate::error::EngineError;
    use crate::payload::{ChannelProvider, StaticPayload};

    enum Outcome {
        Success,
        Fatal,
        Crash,
    }

    struct MockEngine {
        calls: AtomicUsize,
        seen: Mutex<Vec<BuildConfiguration>>,
        outcome: Outcome,
    }

    impl MockEngine {
        fn new(outcome: Outcome) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                outcome,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl BuildEngine for &MockEngine {
        async fn run(&self, config: &BuildConfiguration) -> Result<BuildStats, EngineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(config.clone());

            match self.outcome {
                Outcome::Success => Ok(BuildStats {
                    assets: vec![EmittedAsset {
                        name: "bundle-1a2b3c4d.js".into(),
                        size: 100,
                    }],
                    ..BuildStats::default()
                }),
                Outcome::Fatal => Ok(BuildStats {
                    errors: vec!["Module not found: ./missing.js".into()],
                    ..BuildStats::default()
                }),
                Outcome::Crash => Err(EngineError::Exited {
                    code: Some(2),
                    output: String::new(),
                }),
            }
        }
    }

    struct RejectingProvider;

    impl PayloadProvider for RejectingProvider {
        async fn fetch(&self) -> Result<PluginPayload, PayloadError> {
            Err(PayloadError::Rejected("no translations".into()))
        }
    }

    fn setup() -> (tempfile::TempDir, Settings) {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        (
            tmp,
            Settings {
                root,
                ..Settings::default()
            },
        )
    }

    #[tokio::test]
    async fn test_successful_run() {
        let (_tmp, settings) = setup();
        fs::write(settings.root.join("old.html"), "").unwrap();
        let engine = MockEngine::new(Outcome::Success);

        let orchestrator = Orchestrator::new(settings.clone(), StaticPayload::default(), &engine);
        let stats = orchestrator.run().await.unwrap();

        assert_eq!(stats.assets.len(), 1);
        assert_eq!(engine.calls(), 1);
        assert!(!settings.root.join("old.html").exists());
        assert!(settings.output_path().is_dir());

        let seen = engine.seen.lock().unwrap();
        assert_eq!(seen[0].output().path, settings.output_path());
    }

    #[tokio::test]
    async fn test_fatal_compilation_error_fails_the_run() {
        let (_tmp, settings) = setup();
        let engine = MockEngine::new(Outcome::Fatal);

        let orchestrator = Orchestrator::new(settings, StaticPayload::default(), &engine);
        let err = orchestrator.run().await.unwrap_err();

        assert!(matches!(
            err,
            StagehandError::Build(BuildError::Compilation { ref errors }) if errors.len() == 1
        ));
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn test_engine_failure_is_not_retried() {
        let (_tmp, settings) = setup();
        let engine = MockEngine::new(Outcome::Crash);

        let orchestrator = Orchestrator::new(settings, StaticPayload::default(), &engine);
        let err = orchestrator.run().await.unwrap_err();

        assert!(matches!(
            err,
            StagehandError::Build(BuildError::Engine(EngineError::Exited { .. }))
        ));
        assert_eq!(engine.calls(), 1);
    }

    #[tokio::test]
    async fn test_payload_rejection_halts_pipeline() {
        let (_tmp, settings) = setup();
        let engine = MockEngine::new(Outcome::Success);

        let orchestrator = Orchestrator::new(settings, RejectingProvider, &engine);
        let err = orchestrator.run().await.unwrap_err();

        assert!(matches!(
            err,
            StagehandError::Payload(PayloadError::Rejected(_))
        ));
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_dropped_producer_halts_pipeline() {
        let (_tmp, settings) = setup();
        let engine = MockEngine::new(Outcome::Success);
        let (tx, provider) = ChannelProvider::new();
        drop(tx);

        let orchestrator = Orchestrator::new(settings, provider, &engine);
        let err = orchestrator.run().await.unwrap_err();

        assert!(matches!(err, StagehandError::Payload(PayloadError::Closed)));
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_failure_halts_pipeline() {
        let (_tmp, settings) = setup();
        let settings = Settings {
            root: settings.root.join("missing"),
            out_dir: settings.root.join("bundles"),
            ..settings
        };
        let engine = MockEngine::new(Outcome::Success);

        let orchestrator = Orchestrator::new(settings, StaticPayload::default(), &engine);
        let err = orchestrator.run().await.unwrap_err();

        assert!(matches!(
            err,
            StagehandError::Clean(CleanError::Enumerate(..))
        ));
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_payload_reaches_configuration() {
        let (_tmp, settings) = setup();
        let engine = MockEngine::new(Outcome::Success);
        let (tx, provider) = ChannelProvider::new();

        let payload = PluginPayload {
            plugins: vec![],
            sitemap_paths: vec!["/".into(), "/de/".into()],
        };
        tx.ready(payload);

        let orchestrator = Orchestrator::new(settings, provider, &engine);
        let config = orchestrator.prepare().await.unwrap();

        assert!(config.plugins().iter().any(|p| matches!(
            p,
            crate::config::PluginDescriptor::Sitemap { paths, .. } if paths.len() == 2
        )));
        assert_eq!(engine.calls(), 0);
    }
}
