//! The build engine boundary.
//!
//! Bundling itself (module resolution, loaders, minification, emitting files)
//! belongs to an external engine. The orchestrator only hands it a
//! [`BuildConfiguration`] and reads back [`BuildStats`].

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use camino::Utf8PathBuf;
use console::style;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::config::BuildConfiguration;
use crate::error::EngineError;

/// Something that can turn a configuration into bundled output.
pub trait BuildEngine: Send + Sync {
    /// Run one build. Called exactly once per staging run.
    fn run(
        &self,
        config: &BuildConfiguration,
    ) -> impl Future<Output = Result<BuildStats, EngineError>> + Send;
}

/// A file written to the output directory by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EmittedAsset {
    pub name: String,
    #[serde(default)]
    pub size: u64,
}

/// What the engine reports back after a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildStats {
    /// Engine-specific hash of the compilation.
    #[serde(default)]
    pub hash: Option<String>,
    /// Build time in milliseconds.
    #[serde(default)]
    pub time: Option<u64>,
    #[serde(default)]
    pub assets: Vec<EmittedAsset>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl BuildStats {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.assets.iter().map(|a| a.size).sum()
    }
}

impl Display for BuildStats {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(hash) = &self.hash {
            writeln!(f, "Hash: {hash}")?;
        }

        if let Some(time) = self.time {
            writeln!(f, "Time: {:.2?}", Duration::from_millis(time))?;
        }

        let width = self
            .assets
            .iter()
            .map(|a| a.name.len())
            .max()
            .unwrap_or(0)
            .max("Asset".len());

        writeln!(f, "{:>width$}  {:>10}", "Asset", "Size")?;
        for asset in &self.assets {
            writeln!(
                f,
                "{:>width$}  {:>10}",
                style(&asset.name).green(),
                human_size(asset.size)
            )?;
        }
        writeln!(f, "{:>width$}  {:>10}", "", human_size(self.total_size()))?;

        for warning in &self.warnings {
            writeln!(f, "{} {warning}", style("WARNING").yellow())?;
        }

        for error in &self.errors {
            writeln!(f, "{} {error}", style("ERROR").red())?;
        }

        Ok(())
    }
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

    let mut value = bytes as f64;
    let mut unit = 0;

    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} {}", UNITS[0])
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// Runs an external program as the build engine.
///
/// The configuration is written as JSON to the program's stdin, and the
/// program is expected to print a JSON stats document on stdout, e.g.
/// `{"hash": "…", "time": 812, "assets": [{"name": "bundle-1a2b3c4d.js", "size": 10240}]}`.
/// Stderr is inherited so the engine's own diagnostics reach the terminal.
///
/// **Note:** the program must be available in the system PATH or given as a
/// path.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
    cwd: Option<Utf8PathBuf>,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Working directory of the engine process.
    pub fn current_dir(mut self, dir: impl Into<Utf8PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl BuildEngine for CommandEngine {
    async fn run(&self, config: &BuildConfiguration) -> Result<BuildStats, EngineError> {
        let input = config.to_json().map_err(EngineError::Serialize)?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }

        tracing::debug!(program = %self.program, args = ?self.args, "spawning build engine");

        let mut child = command
            .spawn()
            .map_err(|e| EngineError::Spawn(self.program.clone(), e))?;

        // Feed stdin while draining stdout, an engine may exit before it has
        // read the whole configuration.
        let stdin = child.stdin.take();
        let feed = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(&input).await {
                Ok(()) => stdin.shutdown().await,
                Err(e) => Err(e),
            }
        };

        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;

        if !output.status.success() {
            return Err(EngineError::Exited {
                code: output.status.code(),
                output: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            });
        }

        match fed {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                tracing::debug!("build engine closed stdin early");
            }
            Err(e) => return Err(e.into()),
        }

        serde_json::from_slice(&output.stdout).map_err(EngineError::Stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::assemble_configuration;
    use crate::payload::PluginPayload;
    use crate::settings::Settings;

    fn config() -> BuildConfiguration {
        assemble_configuration(&Settings::default(), &PluginPayload::default())
    }

    #[test]
    fn test_stats_parse_with_defaults() {
        let stats: BuildStats = serde_json::from_str(
            r#"{"assets": [{"name": "bundle-1a2b3c4d.js", "size": 2048}, {"name": "LICENSE.txt"}]}"#,
        )
        .unwrap();

        assert_eq!(stats.assets.len(), 2);
        assert_eq!(stats.assets[1].size, 0);
        assert_eq!(stats.total_size(), 2048);
        assert!(!stats.has_errors());
        assert!(stats.hash.is_none());
    }

    #[test]
    fn test_stats_display() {
        let stats = BuildStats {
            hash: Some("4f1c".into()),
            time: Some(1500),
            assets: vec![EmittedAsset {
                name: "bundle-1a2b3c4d.css".into(),
                size: 3 * 1024,
            }],
            warnings: vec!["unused export".into()],
            errors: vec![],
        };

        console::set_colors_enabled(false);
        let text = stats.to_string();
        assert!(text.contains("Hash: 4f1c"));
        assert!(text.contains("bundle-1a2b3c4d.css"));
        assert!(text.contains("3.00 KiB"));
        assert!(text.contains("WARNING unused export"));
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 B");
        assert_eq!(human_size(1536), "1.50 KiB");
        assert_eq!(human_size(5 * 1024 * 1024), "5.00 MiB");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_engine_reads_stats() {
        let engine = CommandEngine::new("sh").args([
            "-c",
            r#"cat > /dev/null; echo '{"hash": "abc", "assets": [{"name": "bundle.js", "size": 10}]}'"#,
        ]);

        let stats = engine.run(&config()).await.unwrap();
        assert_eq!(stats.hash.as_deref(), Some("abc"));
        assert_eq!(stats.assets[0].name, "bundle.js");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_engine_receives_configuration() {
        let engine = CommandEngine::new("sh").args([
            "-c",
            r#"grep -q '"bail":true' && echo '{}'"#,
        ]);

        assert!(engine.run(&config()).await.is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_engine_failure() {
        let engine = CommandEngine::new("sh").args(["-c", "cat > /dev/null; echo broken; exit 3"]);

        match engine.run(&config()).await {
            Err(EngineError::Exited { code, output }) => {
                assert_eq!(code, Some(3));
                assert_eq!(output, "broken");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_engine_early_exit_keeps_status() {
        let payload = PluginPayload {
            sitemap_paths: (0..20_000).map(|i| format!("/pages/{i}")).collect(),
            ..PluginPayload::default()
        };
        let config = assemble_configuration(&Settings::default(), &payload);
        let engine = CommandEngine::new("sh").args(["-c", "echo 'unknown flag'; exit 2"]);

        match engine.run(&config).await {
            Err(EngineError::Exited { code, output }) => {
                assert_eq!(code, Some(2));
                assert_eq!(output, "unknown flag");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_engine_bad_stats() {
        let engine = CommandEngine::new("sh").args(["-c", "cat > /dev/null; echo not-json"]);

        assert!(matches!(
            engine.run(&config()).await,
            Err(EngineError::Stats(_))
        ));
    }

    #[tokio::test]
    async fn test_command_engine_missing_program() {
        let engine = CommandEngine::new("stagehand-no-such-engine");

        assert!(matches!(
            engine.run(&config()).await,
            Err(EngineError::Spawn(..))
        ));
    }
}
