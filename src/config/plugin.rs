use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A unit of configuration asking the engine for an extra transformation or
/// side effect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "plugin", rename_all = "kebab-case")]
pub enum PluginDescriptor {
    /// Extract stylesheets into a standalone content-hashed file.
    ExtractCss { filename: String },

    /// Emit subresource integrity hashes for every output.
    #[serde(rename_all = "camelCase")]
    SubresourceIntegrity {
        hash_func_names: Vec<String>,
        enabled: bool,
    },

    /// Make free identifiers resolve to the given module requests.
    Provide { definitions: BTreeMap<String, String> },

    /// Emit a sitemap listing `paths` under `base`.
    Sitemap {
        base: String,
        paths: Vec<String>,
        options: SitemapOptions,
    },

    /// A plugin supplied by the payload provider. Opaque to the orchestrator.
    External(ExternalPlugin),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SitemapOptions {
    pub lastmod: bool,
}

/// An engine plugin identified by name, with engine-specific options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalPlugin {
    pub name: String,
    #[serde(default)]
    pub options: serde_json::Value,
}

impl ExternalPlugin {
    pub fn new(name: impl Into<String>, options: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }
}

impl PluginDescriptor {
    /// Short name used in logs.
    pub fn name(&self) -> &str {
        match self {
            PluginDescriptor::ExtractCss { .. } => "extract-css",
            PluginDescriptor::SubresourceIntegrity { .. } => "subresource-integrity",
            PluginDescriptor::Provide { .. } => "provide",
            PluginDescriptor::Sitemap { .. } => "sitemap",
            PluginDescriptor::External(plugin) => &plugin.name,
        }
    }
}
