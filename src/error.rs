use camino::Utf8PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StagehandError {
    #[error("Error while clearing stale output:\n{0}")]
    Clean(#[from] CleanError),

    #[error("Error while waiting for the plugin payload:\n{0}")]
    Payload(#[from] PayloadError),

    #[error("Error while building the bundle:\n{0}")]
    Build(#[from] BuildError),
}

#[derive(Debug, Error)]
pub enum CleanError {
    #[error("Couldn't enumerate '{0}'.\n{1}")]
    Enumerate(Utf8PathBuf, #[source] std::io::Error),

    #[error("Couldn't compile pattern for generated files.\n{0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Couldn't remove '{0}'.\n{1}")]
    Remove(Utf8PathBuf, #[source] std::io::Error),

    #[error("Couldn't create '{0}'.\n{1}")]
    Create(Utf8PathBuf, #[source] std::io::Error),

    #[error("Refusing to wipe '{output}', it contains the project root '{root}'")]
    OutputContainsRoot { output: Utf8PathBuf, root: Utf8PathBuf },

    #[error("Couldn't convert path to UTF-8.\n{0}")]
    PathFormat(#[from] camino::FromPathBufError),

    #[error("Cleanup task did not finish.\n{0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Payload producer went away before signalling readiness")]
    Closed,

    #[error("Payload producer rejected: {0}")]
    Rejected(String),

    #[error("Couldn't read payload manifest '{0}'.\n{1}")]
    Read(Utf8PathBuf, #[source] std::io::Error),

    #[error("Couldn't parse payload manifest '{0}'.\n{1}")]
    Parse(Utf8PathBuf, #[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Couldn't start build engine '{0}'.\n{1}")]
    Spawn(String, #[source] std::io::Error),

    #[error("IO error while talking to the build engine: {0}")]
    Io(#[from] std::io::Error),

    #[error("Couldn't serialize build configuration: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Build engine exited with {}:\n{output}", .code.map_or("a signal".to_string(), |c| format!("status {c}")))]
    Exited { code: Option<i32>, output: String },

    #[error("Build engine produced unreadable stats: {0}")]
    Stats(#[source] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Compilation failed with {} error(s):\n{}", .errors.len(), .errors.join("\n"))]
    Compilation { errors: Vec<String> },
}
