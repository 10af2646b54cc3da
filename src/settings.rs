use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Config, Environment, File, FileFormat};
use miette::{Context, IntoDiagnostic, Result};
use serde::Deserialize;

use crate::types::Extension;

/// Tunables of the grabbing pipeline.
///
/// Read from an optional TOML file, then from `SEGRAB__<KEY>` environment variables.
/// Every key has a default, so an empty configuration is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory under which one folder per article is created
    pub output_root: PathBuf,

    /// Substring a response URL must contain to be considered a video fragment
    pub fragment_marker: String,

    /// Container of the merged video
    pub extension: Extension,

    /// Pattern extracting the article identifier from the page address.
    /// The first captured group is used.
    pub catalog_pattern: String,

    /// Identifier used when the page address does not match `catalog_pattern`
    pub placeholder_id: String,

    /// Maximum number of fragments downloaded at the same time
    pub concurrency: usize,

    /// Timeout of a single fragment request, in seconds
    pub request_timeout_secs: u64,

    pub user_agent: String,

    /// Program called to remux the fragments
    pub ffmpeg: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("videos"),
            fragment_marker: ".ts".to_string(),
            extension: Extension::default(),
            catalog_pattern: r"/catalog/(\d+)".to_string(),
            placeholder_id: "unknown_article".to_string(),
            concurrency: 8,
            request_timeout_secs: 30,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            ffmpeg: "ffmpeg".to_string(),
        }
    }
}

impl Settings {
    /// Load the settings, layering the file (if any) and the environment over the defaults
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(
                File::from(file)
                    .format(FileFormat::Toml)
                    .required(true),
            );
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("SEGRAB")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .into_diagnostic()
            .wrap_err("Could not read the configuration")?
            .try_deserialize()
            .into_diagnostic()
            .wrap_err("Invalid configuration")?;

        if settings.concurrency == 0 {
            miette::bail!("concurrency must be at least 1");
        }

        Ok(settings)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
