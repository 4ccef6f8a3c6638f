//! Sources of the plugin payload.
//!
//! The payload is produced outside the orchestrator. A provider resolves
//! once the payload is ready; there is no fixed delay, readiness is signalled
//! by the provider itself.

use std::future::Future;
use std::sync::Mutex;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::config::ExternalPlugin;
use crate::error::PayloadError;

/// Plugins and sitemap entries contributed from outside the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginPayload {
    #[serde(default)]
    pub plugins: Vec<ExternalPlugin>,
    #[serde(default)]
    pub sitemap_paths: Vec<String>,
}

/// An asynchronous source of the [`PluginPayload`].
pub trait PayloadProvider: Send + Sync {
    /// Resolve the payload, suspending until the provider is ready.
    fn fetch(&self) -> impl Future<Output = Result<PluginPayload, PayloadError>> + Send;
}

/// A payload that is ready from the start.
#[derive(Debug, Clone, Default)]
pub struct StaticPayload(pub PluginPayload);

impl PayloadProvider for StaticPayload {
    async fn fetch(&self) -> Result<PluginPayload, PayloadError> {
        Ok(self.0.clone())
    }
}

/// Reads the payload from a JSON manifest written by an earlier step.
///
/// ```json
/// {
///   "plugins": [{ "name": "html", "options": { "filename": "index.html" } }],
///   "sitemapPaths": ["/", "/fr/"]
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ManifestProvider {
    path: Utf8PathBuf,
}

impl ManifestProvider {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl PayloadProvider for ManifestProvider {
    async fn fetch(&self) -> Result<PluginPayload, PayloadError> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|e| PayloadError::Read(self.path.clone(), e))?;

        let payload: PluginPayload =
            serde_json::from_slice(&data).map_err(|e| PayloadError::Parse(self.path.clone(), e))?;

        tracing::debug!(
            manifest = %self.path,
            plugins = payload.plugins.len(),
            paths = payload.sitemap_paths.len(),
            "read payload manifest"
        );

        Ok(payload)
    }
}

type Signal = Result<PluginPayload, String>;

/// Producer half of a [`ChannelProvider`]. Exactly one of [`ready`] or
/// [`reject`] can be called; dropping it unsignalled rejects the fetch.
///
/// [`ready`]: PayloadSender::ready
/// [`reject`]: PayloadSender::reject
#[derive(Debug)]
pub struct PayloadSender(oneshot::Sender<Signal>);

impl PayloadSender {
    /// Signal readiness with the finished payload.
    pub fn ready(self, payload: PluginPayload) {
        // a receiver that is already gone has nobody left to tell
        let _ = self.0.send(Ok(payload));
    }

    /// Signal that the payload could not be produced.
    pub fn reject(self, reason: impl Into<String>) {
        let _ = self.0.send(Err(reason.into()));
    }
}

/// A provider resolved by an explicit ready signal from its producer.
#[derive(Debug)]
pub struct ChannelProvider {
    receiver: Mutex<Option<oneshot::Receiver<Signal>>>,
}

impl ChannelProvider {
    pub fn new() -> (PayloadSender, Self) {
        let (tx, rx) = oneshot::channel();
        let provider = Self {
            receiver: Mutex::new(Some(rx)),
        };

        (PayloadSender(tx), provider)
    }
}

impl PayloadProvider for ChannelProvider {
    async fn fetch(&self) -> Result<PluginPayload, PayloadError> {
        let receiver = self
            .receiver
            .lock()
            .map_err(|_| PayloadError::Closed)?
            .take()
            .ok_or(PayloadError::Closed)?;

        match receiver.await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(reason)) => Err(PayloadError::Rejected(reason)),
            Err(_) => Err(PayloadError::Closed),
        }
    }
}
