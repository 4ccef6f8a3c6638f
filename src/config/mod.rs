//! The build configuration handed to the engine.
//!
//! A [`BuildConfiguration`] is assembled exactly once per run from
//! [`Settings`] and the [`PluginPayload`], and never changes afterwards: all
//! fields are private and only readable. Assembly is a pure function, so the
//! same inputs always yield the same value and the same [`Fingerprint`].

mod optimization;
mod plugin;
mod rule;

use std::collections::BTreeMap;
use std::fmt::{Debug, Display};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

pub use optimization::{
    Compress, ExtractComments, Mangle, Minimizer, Optimization, RESERVED_NAMES, TerserOptions,
};
pub use plugin::{ExternalPlugin, PluginDescriptor, SitemapOptions};
pub use rule::{EXTRACT_CSS_LOADER, Enforce, LoaderUse, ModuleRule};

use crate::payload::PluginPayload;
use crate::settings::{Mode, Settings};

/// Naming pattern of the primary bundle.
pub const BUNDLE_FILENAME: &str = "bundle-[contenthash:8].js";

/// Naming pattern of the extracted stylesheet.
pub const STYLESHEET_FILENAME: &str = "bundle-[contenthash:8].css";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    Web,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDescriptor {
    pub filename: String,
    pub path: Utf8PathBuf,
    pub public_path: String,
    pub cross_origin_loading: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleRules {
    pub rules: Vec<ModuleRule>,
}

/// Everything the engine needs for one build.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildConfiguration {
    mode: Mode,
    target: Target,
    bail: bool,
    optimization: Optimization,
    plugins: Vec<PluginDescriptor>,
    module: ModuleRules,
    entry: Utf8PathBuf,
    output: OutputDescriptor,
}

impl BuildConfiguration {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// Whether the engine must abort on the first fatal compilation error.
    pub fn bail(&self) -> bool {
        self.bail
    }

    pub fn optimization(&self) -> &Optimization {
        &self.optimization
    }

    pub fn plugins(&self) -> &[PluginDescriptor] {
        &self.plugins
    }

    pub fn rules(&self) -> &[ModuleRule] {
        &self.module.rules
    }

    pub fn entry(&self) -> &Utf8Path {
        &self.entry
    }

    pub fn output(&self) -> &OutputDescriptor {
        &self.output
    }

    /// Canonical JSON encoding, as sent to the engine.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Digest of the canonical JSON encoding.
    pub fn fingerprint(&self) -> serde_json::Result<Fingerprint> {
        self.to_json().map(|json| Fingerprint::hash(&json))
    }
}

/// Build the configuration for one run. Payload plugins come first, in
/// payload order, followed by the fixed plugins; the sitemap lists the
/// payload's paths in payload order.
pub fn assemble_configuration(settings: &Settings, payload: &PluginPayload) -> BuildConfiguration {
    let mut plugins: Vec<PluginDescriptor> = payload
        .plugins
        .iter()
        .cloned()
        .map(PluginDescriptor::External)
        .collect();

    plugins.extend([
        PluginDescriptor::ExtractCss {
            filename: STYLESHEET_FILENAME.to_string(),
        },
        PluginDescriptor::SubresourceIntegrity {
            hash_func_names: vec!["sha256".to_string()],
            enabled: settings.integrity,
        },
        PluginDescriptor::Provide {
            definitions: BTreeMap::from([(
                "Component".to_string(),
                "exports-loader?Component!materialize-css/js/component.js".to_string(),
            )]),
        },
        PluginDescriptor::Sitemap {
            base: settings.sitemap_base.clone(),
            paths: payload.sitemap_paths.clone(),
            options: SitemapOptions { lastmod: true },
        },
    ]);

    let rules = vec![
        rule::lint(settings.lint_config.as_str()),
        rule::scripts(),
        rule::styles(settings.postcss_config.as_str()),
        rule::fonts(),
    ];

    BuildConfiguration {
        mode: settings.mode,
        target: Target::Web,
        bail: true,
        optimization: Optimization::default(),
        plugins,
        module: ModuleRules { rules },
        entry: settings.entry.clone(),
        output: OutputDescriptor {
            filename: BUNDLE_FILENAME.to_string(),
            path: settings.output_path(),
            public_path: settings.public_path.clone(),
            cross_origin_loading: "anonymous".to_string(),
        },
    }
}

/// 32 byte blake3 digest of a configuration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    fn hash(buffer: impl AsRef<[u8]>) -> Self {
        Fingerprint(*blake3::hash(buffer.as_ref()).as_bytes())
    }

    pub fn to_hex(self) -> String {
        const HEX: &[u8; 16] = b"0123456789abcdef";
        let mut acc = String::with_capacity(64);

        for byte in self.0 {
            acc.push(HEX[(byte >> 4) as usize] as char);
            acc.push(HEX[(byte & 0xF) as usize] as char);
        }

        acc
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex()[..12])
    }
}

impl Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}
