use std::collections::HashSet;

use tracing::{debug, trace};

use crate::types::{FragmentUrl, NetworkEvent, Notification};

/// Extract the video fragment URLs out of captured network events.
///
/// A URL is kept when it belongs to a received response and contains `marker`.
/// Duplicates are dropped, the first sighting giving the URL its place in the output.
///
/// Most captured events have nothing to do with the video, and some cannot even
/// be decoded: those are skipped, never reported as errors.
pub fn locate(events: &[NetworkEvent], marker: &str) -> Vec<FragmentUrl> {
    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    let mut skipped = 0usize;

    for event in events {
        let url = match event.parse() {
            Ok(Notification::ResponseReceived { url }) => url,
            Ok(Notification::Other { method }) => {
                trace!("Ignoring {method} notification");
                continue;
            }
            Ok(Notification::FrameNavigated { .. }) => continue,
            Err(reason) => {
                trace!("Skipping malformed record: {reason}");
                skipped += 1;
                continue;
            }
        };

        if url.contains(marker) && seen.insert(url.clone()) {
            urls.push(url);
        }
    }

    debug!(
        "{} fragment URLs located in {} events ({skipped} malformed)",
        urls.len(),
        events.len()
    );
    urls
}
