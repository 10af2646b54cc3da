use tracing::warn;
use url::Url;

use crate::types::{FragmentSequence, FragmentUrl};

/// Put the fragments in playback order.
///
/// Fragments are expected to be named after their index (`.../17.ts`).
/// When every URL follows that convention, the fragments are sorted by index,
/// fragments with the same index keeping their discovery order.
/// Otherwise the discovery order is kept as-is for the whole batch: sorting only
/// some of the fragments would silently scramble the video.
pub fn sequence(urls: Vec<FragmentUrl>, marker: &str) -> FragmentSequence {
    let keys: Option<Vec<i128>> = urls.iter().map(|url| ordering_key(url, marker)).collect();

    let Some(keys) = keys else {
        warn!("Could not sort the fragments by their number, keeping the discovery order");
        return FragmentSequence::new(urls);
    };

    let mut keyed: Vec<_> = keys.into_iter().zip(urls).collect();
    // Stable sort, ties keep their discovery order
    keyed.sort_by_key(|(key, _)| *key);

    FragmentSequence::new(keyed.into_iter().map(|(_, url)| url).collect())
}

/// Number of the fragment: the last path component, without the fragment suffix.
///
/// The query string and fragment of the URL are not part of the path and are ignored.
/// Any integer is accepted, negative ones included.
fn ordering_key(url: &str, marker: &str) -> Option<i128> {
    let url = Url::parse(url).ok()?;
    let name = url.path_segments()?.next_back()?;
    let name = name.strip_suffix(marker).unwrap_or(name);
    name.parse().ok()
}
