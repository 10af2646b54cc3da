use std::{fmt::Display, ops::Deref, path::PathBuf};

/// URL of a remote resource believed to hold one fragment of the video
pub type FragmentUrl = String;

/// Fragment URLs in playback order.
///
/// Built once per run by the sequencer and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentSequence(Vec<FragmentUrl>);

impl FragmentSequence {
    pub fn new(urls: Vec<FragmentUrl>) -> Self {
        Self(urls)
    }

    /// Iterate over the URLs along with their 1-based position
    pub fn positioned(&self) -> impl Iterator<Item = (usize, &str)> {
        self.0
            .iter()
            .enumerate()
            .map(|(i, url)| (i + 1, url.as_str()))
    }
}

impl Deref for FragmentSequence {
    type Target = Vec<FragmentUrl>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for FragmentSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "[")?;
        for (position, url) in self.positioned() {
            writeln!(f, "\t{position:>4} {url}")?;
        }
        writeln!(f, "]")?;
        Ok(())
    }
}

/// A fragment whose bytes are on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFragment {
    /// 1-based position in the [`FragmentSequence`]
    pub position: usize,
    pub path: PathBuf,
}

/// The merged video of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub path: PathBuf,
}

impl Display for OutputArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
