#![forbid(unsafe_code)]
//! Deterministic staging of front-end bundle builds.
//!
//! A run wipes stale output, waits for a plugin payload, assembles one
//! immutable [`BuildConfiguration`], hands it to a [`BuildEngine`] exactly
//! once, and reports the outcome. Any failing stage stops the run.
//!
//! ```rust,ignore
//! let settings = Settings::from_env();
//! let engine = CommandEngine::new("bundle-engine").current_dir(&settings.root);
//! let provider = ManifestProvider::new("config/payload.json");
//!
//! let stats = Orchestrator::new(settings, provider, engine).run().await?;
//! ```

pub mod config;
pub mod engine;
mod error;
mod io;
mod orchestrator;
pub mod payload;
mod settings;

pub use crate::config::{BuildConfiguration, Fingerprint, PluginDescriptor, assemble_configuration};
pub use crate::engine::{BuildEngine, BuildStats, CommandEngine, EmittedAsset};
pub use crate::error::*;
pub use crate::io::{CleanReport, clear_output, purge_generated, stage_clean_output};
pub use crate::orchestrator::Orchestrator;
pub use crate::payload::{
    ChannelProvider, ManifestProvider, PayloadProvider, PayloadSender, PluginPayload,
    StaticPayload,
};
pub use crate::settings::{DEFAULT_PUBLIC_PATH, ENV_ASSET_PATH, ENV_BUILD_MODE, Mode, Settings};
