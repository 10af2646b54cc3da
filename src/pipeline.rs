use std::{fmt::Display, path::PathBuf};

use miette::{IntoDiagnostic, Result, WrapErr};
use time::UtcOffset;
use tracing::{debug, error, info, warn};

use crate::{
    concat::{ConcatError, Concatenator},
    fetcher::Fetcher,
    location::{FolderResolver, LocationContext},
    locator::locate,
    outside::Remuxer,
    sequencer::sequence,
    settings::Settings,
    types::{NetworkEvent, OutputArtifact},
};

/// How a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// The video was written. `missing` lists the positions of the fragments
    /// that could not be downloaded and are absent from the video.
    Success {
        artifact: OutputArtifact,
        missing: Vec<usize>,
    },
    /// The network events did not contain any video fragment
    NoFragmentsFound,
    /// Every fragment download failed
    NoFragmentsFetched { attempted: usize },
    /// The fragments are downloaded in `folder` but could not be joined
    RemuxFailed { diagnostic: String, folder: PathBuf },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success { .. })
    }
}

impl Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Success { artifact, missing } if missing.is_empty() => {
                write!(f, "video saved to '{artifact}'")
            }
            RunOutcome::Success { artifact, missing } => write!(
                f,
                "video saved to '{artifact}', without fragments {missing:?}"
            ),
            RunOutcome::NoFragmentsFound => write!(f, "no video fragment found"),
            RunOutcome::NoFragmentsFetched { attempted } => {
                write!(f, "none of the {attempted} fragments could be downloaded")
            }
            RunOutcome::RemuxFailed { folder, .. } => write!(
                f,
                "fragments could not be merged, they are kept in '{}'",
                folder.display()
            ),
        }
    }
}

/// The whole grab: locate, sequence, fetch then concatenate the fragments.
///
/// Runs hold no state, the same pipeline is reused for every run.
#[derive(Debug)]
pub struct Pipeline<'a> {
    marker: String,
    resolver: FolderResolver,
    fetcher: Fetcher,
    concatenator: Concatenator<'a>,
    runtime: tokio::runtime::Runtime,
}

impl<'a> Pipeline<'a> {
    pub fn new(settings: &Settings, remuxer: &'a dyn Remuxer, offset: UtcOffset) -> Result<Self> {
        let resolver = FolderResolver::new(
            &settings.output_root,
            &settings.catalog_pattern,
            &settings.placeholder_id,
        )?;

        let fetcher = Fetcher::new(
            settings.request_timeout(),
            &settings.user_agent,
            settings.concurrency,
        )?;

        // Only the downloads need the runtime
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .thread_name("fetch")
            .enable_all()
            .build()
            .into_diagnostic()
            .wrap_err("Could not start the download runtime")?;

        Ok(Self {
            marker: settings.fragment_marker.clone(),
            resolver,
            fetcher,
            concatenator: Concatenator::new(remuxer, settings.extension, offset),
            runtime,
        })
    }

    /// Grab the video whose fragments appear in `events`.
    ///
    /// Expected failures are reported through the [`RunOutcome`],
    /// an error means the run could not even use its destination folder.
    pub fn run(&self, events: &[NetworkEvent], location: &LocationContext) -> Result<RunOutcome> {
        let folder = self.resolver.destination_folder(location);

        info!("Looking for video fragments in {} network events", events.len());
        let urls = locate(events, &self.marker);
        if urls.is_empty() {
            info!("No video fragment found in the network events");
            return Ok(RunOutcome::NoFragmentsFound);
        }

        let sequence = sequence(urls, &self.marker);
        info!("{} video fragments found", sequence.len());
        debug!("Fragments: {sequence}");

        let report = self
            .runtime
            .block_on(self.fetcher.fetch_all(&sequence, &folder))?;

        if report.fetched.is_empty() {
            error!("None of the {} fragments could be downloaded", sequence.len());
            return Ok(RunOutcome::NoFragmentsFetched {
                attempted: sequence.len(),
            });
        }

        let missing = report.missing_positions();
        if !missing.is_empty() {
            warn!(
                "{} of {} fragments are missing, the video will be incomplete. Missing: {missing:?}",
                missing.len(),
                sequence.len()
            );
            for failure in &report.failed {
                debug!(
                    "Fragment {} ({}) is missing: {}",
                    failure.position, failure.url, failure.error
                );
            }
        }

        match self.concatenator.concatenate(&report.fetched, &folder) {
            Ok(artifact) => Ok(RunOutcome::Success { artifact, missing }),
            Err(ConcatError::RemuxFailed { diagnostic }) => {
                Ok(RunOutcome::RemuxFailed { diagnostic, folder })
            }
            Err(ConcatError::NoFragments) => Ok(RunOutcome::NoFragmentsFetched {
                attempted: sequence.len(),
            }),
            Err(ConcatError::Io(report)) => {
                Err(report.wrap_err("Could not concatenate the fragments"))
            }
        }
    }
}
