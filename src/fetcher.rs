use std::{
    fmt::Display,
    path::{Path, PathBuf},
    time::Duration,
};

use futures::{stream, StreamExt};
use miette::{IntoDiagnostic, Result, WrapErr};
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info};

use crate::types::{FetchedFragment, FragmentSequence};

/// Why a single fragment could not be stored on disk
#[derive(Debug)]
pub enum FetchError {
    Status(StatusCode),
    Transport(reqwest::Error),
    Write(std::io::Error),
}

impl Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Status(status) => write!(f, "status {status}"),
            FetchError::Transport(err) => write!(f, "{err}"),
            FetchError::Write(err) => write!(f, "could not write the file: {err}"),
        }
    }
}

#[derive(Debug)]
pub struct FragmentFailure {
    pub position: usize,
    pub url: String,
    pub error: FetchError,
}

/// Result of a batch download. Both lists are sorted by position.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub fetched: Vec<FetchedFragment>,
    pub failed: Vec<FragmentFailure>,
}

impl FetchReport {
    pub fn missing_positions(&self) -> Vec<usize> {
        self.failed.iter().map(|failure| failure.position).collect()
    }
}

/// Path of the fragment at the given 1-based position
pub fn fragment_path(folder: &Path, position: usize) -> PathBuf {
    folder.join(format!("segment_{position}.ts"))
}

/// Downloads the fragments of a sequence, a bounded number at a time
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    concurrency: usize,
}

impl Fetcher {
    pub fn new(timeout: Duration, user_agent: &str, concurrency: usize) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .into_diagnostic()
            .wrap_err("Could not build the HTTP client")?;

        Ok(Self {
            client,
            concurrency: concurrency.max(1),
        })
    }

    /// Download every fragment of the sequence into `folder`.
    ///
    /// Each fragment gets exactly one attempt. A fragment that fails is logged
    /// and left out, the others are not affected.
    /// Only failing to create the folder aborts the batch.
    pub async fn fetch_all(
        &self,
        sequence: &FragmentSequence,
        folder: &Path,
    ) -> Result<FetchReport> {
        tokio::fs::create_dir_all(folder)
            .await
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not create folder {}", folder.display()))?;

        info!("Downloading {} fragments", sequence.len());

        let mut outcomes: Vec<_> = stream::iter(sequence.positioned())
            .map(move |(position, url)| async move {
                let path = fragment_path(folder, position);
                let outcome = self.fetch_one(url, &path).await;
                (position, url, path, outcome)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        // Completion order is arbitrary, the position is what matters
        outcomes.sort_by_key(|(position, ..)| *position);

        let mut report = FetchReport::default();
        for (position, url, path, outcome) in outcomes {
            match outcome {
                Ok(size) => {
                    info!("Fragment {position} downloaded: {} ({size} bytes)", path.display());
                    report.fetched.push(FetchedFragment { position, path });
                }
                Err(error) => {
                    error!("Could not download fragment {position} from {url}: {error}");
                    report.failed.push(FragmentFailure {
                        position,
                        url: url.to_string(),
                        error,
                    });
                }
            }
        }

        debug!(
            "{} fragments downloaded, {} failed",
            report.fetched.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Download one fragment to `path`, returning its size
    async fn fetch_one(&self, url: &str, path: &Path) -> std::result::Result<usize, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await.map_err(FetchError::Transport)?;
        if let Err(err) = tokio::fs::write(path, &body).await {
            discard_partial(path).await;
            return Err(FetchError::Write(err));
        }

        Ok(body.len())
    }
}

/// Remove what an interrupted write left at `path`, if anything
async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial fragment {}", path.display()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => debug!("Could not remove partial fragment {}: {err}", path.display()),
    }
}
