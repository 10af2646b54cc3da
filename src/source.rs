use std::{
    fmt::Debug,
    path::{Path, PathBuf},
};

use miette::{IntoDiagnostic, Result, WrapErr};
use tracing::{debug, trace};

use crate::{
    location::LocationContext,
    types::{NetworkEvent, Notification},
};

/// What the browser session looked like when the operator asked for a grab
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    pub events: Vec<NetworkEvent>,
    pub location: LocationContext,
}

/// Anything able to tell which network events a browser session went through
pub trait EventSource: Sync + Debug {
    /// Capture the current state of the session
    fn snapshot(&self) -> Result<SessionSnapshot>;
}

/// A Chrome performance log exported to a file.
///
/// The file is read again on every snapshot, so whatever keeps it updated
/// (the browser driver, a devtools script...) can keep running alongside.
///
/// Two layouts are accepted: a JSON array of log entries, as returned by the
/// WebDriver `get_log("performance")` call, or one log entry per line.
#[derive(Debug)]
pub struct PerformanceLog {
    path: PathBuf,
    page_url: Option<String>,
}

impl PerformanceLog {
    /// `page_url`, if given, takes precedence over the page found in the log
    pub fn new(path: &Path, page_url: Option<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            page_url,
        }
    }
}

impl EventSource for PerformanceLog {
    fn snapshot(&self) -> Result<SessionSnapshot> {
        let content = std::fs::read_to_string(&self.path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Could not read {}", self.path.display()))?;

        let events = parse_log(&content)
            .wrap_err_with(|| format!("Invalid performance log {}", self.path.display()))?;

        let page_url = self.page_url.clone().or_else(|| last_page(&events));
        debug!("{} events read, page: {page_url:?}", events.len());

        Ok(SessionSnapshot {
            events,
            location: LocationContext(page_url),
        })
    }
}

/// Read the log entries. Entries without a `message` are dropped here,
/// the content of the message is only checked later.
fn parse_log(content: &str) -> Result<Vec<NetworkEvent>> {
    let entries: Vec<serde_json::Value> = if content.trim_start().starts_with('[') {
        serde_json::from_str(content).into_diagnostic()?
    } else {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str(line) {
                Ok(entry) => Some(entry),
                Err(err) => {
                    trace!("Skipping unreadable log line: {err}");
                    None
                }
            })
            .collect()
    };

    Ok(entries
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

/// Address of the last document loaded in the top-level frame
fn last_page(events: &[NetworkEvent]) -> Option<String> {
    events.iter().rev().find_map(|event| match event.parse() {
        Ok(Notification::FrameNavigated {
            url,
            top_level: true,
        }) => Some(url),
        _ => None,
    })
}
