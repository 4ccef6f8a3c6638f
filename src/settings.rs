//! Explicit run settings.
//!
//! Every option recognised by the orchestrator lives in [`Settings`]. The
//! environment is only consulted by [`Settings::from_env`] and
//! [`Settings::from_lookup`]; everything downstream receives a plain value.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

/// Environment variable overriding the public base path of built assets.
pub const ENV_ASSET_PATH: &str = "ASSET_PATH";

/// Environment variable carrying the build-mode indicator. Only decides
/// whether subresource integrity hashes are emitted.
pub const ENV_BUILD_MODE: &str = "NODE_ENV";

/// Public base path used when `ASSET_PATH` is not set.
pub const DEFAULT_PUBLIC_PATH: &str = "/bundles/";

/// Build mode forwarded to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Production,
    Development,
}

/// Settings for a single staging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Project root. Scanned for generated top-level files, and the working
    /// directory of the engine.
    pub root: Utf8PathBuf,
    /// Output directory, relative to `root` unless absolute. Wiped every run.
    pub out_dir: Utf8PathBuf,
    /// Suffix identifying generated top-level files under `root`.
    pub generated_suffix: String,
    /// File names under `root` that match `generated_suffix` but must be kept.
    pub preserve: Vec<String>,
    /// Entry point handed to the engine.
    pub entry: Utf8PathBuf,
    /// Public base path for referencing built assets.
    pub public_path: String,
    /// Build mode.
    pub mode: Mode,
    /// Whether the integrity plugin is enabled.
    pub integrity: bool,
    /// Base URL for sitemap entries.
    pub sitemap_base: String,
    /// Lint configuration file passed to the pre-loader.
    pub lint_config: Utf8PathBuf,
    /// Directory holding the style post-processor configuration.
    pub postcss_config: Utf8PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            out_dir: Utf8PathBuf::from("bundles"),
            generated_suffix: ".html".to_string(),
            preserve: vec!["faq.html".to_string()],
            entry: Utf8PathBuf::from("./src/main.js"),
            public_path: DEFAULT_PUBLIC_PATH.to_string(),
            mode: Mode::Production,
            integrity: false,
            sitemap_base: "https://cloverleaf.app".to_string(),
            lint_config: Utf8PathBuf::from("config/.eslintrc.json"),
            postcss_config: Utf8PathBuf::from("config/"),
        }
    }
}

impl Settings {
    /// Defaults overlaid with the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`, which stands in for the
    /// environment. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(path) = lookup(ENV_ASSET_PATH).filter(|v| !v.is_empty()) {
            settings.public_path = path;
        }

        settings.integrity = lookup(ENV_BUILD_MODE).as_deref() == Some("production");
        settings
    }

    /// Resolved location of the output directory.
    pub fn output_path(&self) -> Utf8PathBuf {
        resolve(&self.root, &self.out_dir)
    }

    /// Whether `name` is a generated top-level file that should be purged.
    pub fn is_generated(&self, name: &str) -> bool {
        name.len() > self.generated_suffix.len()
            && name.ends_with(self.generated_suffix.as_str())
            && !self.preserve.iter().any(|keep| keep == name)
    }
}

fn resolve(root: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}
