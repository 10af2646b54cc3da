use std::{
    fmt::Display,
    path::{Path, PathBuf},
};

use miette::{miette, IntoDiagnostic, WrapErr};
use time::{format_description::FormatItem, macros::format_description, OffsetDateTime, UtcOffset};
use tracing::{error, info, warn};

use crate::{
    io::{find_unused_prefix, remove_logged},
    outside::{ExitOutcome, Remuxer},
    types::{Extension, FetchedFragment, OutputArtifact},
};

/// Name of the manifest listing the fragments to join
pub const MANIFEST_NAME: &str = "segments.txt";

/// Output files are named after the instant they were merged
const ARTIFACT_NAME_FORMAT: &[FormatItem<'static>] =
    format_description!("[day].[month].[year] [hour];[minute];[second]");

#[derive(Debug)]
pub enum ConcatError {
    /// Nothing to join
    NoFragments,

    /// The remuxer failed, its diagnostic output is kept.
    /// The fragments and the manifest are left on disk.
    RemuxFailed { diagnostic: String },

    Io(miette::Report),
}

impl From<miette::Report> for ConcatError {
    fn from(err: miette::Report) -> Self {
        ConcatError::Io(err)
    }
}

impl From<ConcatError> for miette::Report {
    fn from(err: ConcatError) -> Self {
        match err {
            ConcatError::NoFragments => miette!("No fragment to concatenate"),
            ConcatError::RemuxFailed { diagnostic } => {
                miette!("Remuxing the fragments failed: {diagnostic}")
            }
            ConcatError::Io(err) => err,
        }
    }
}

impl Display for ConcatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConcatError::NoFragments => write!(f, "no fragment to concatenate"),
            ConcatError::RemuxFailed { diagnostic } => write!(f, "remux failed: {diagnostic}"),
            ConcatError::Io(err) => write!(f, "{err}"),
        }
    }
}

/// Joins downloaded fragments into a single video, without re-encoding
#[derive(Debug)]
pub struct Concatenator<'a> {
    remuxer: &'a dyn Remuxer,
    extension: Extension,
    offset: UtcOffset,
}

impl<'a> Concatenator<'a> {
    pub fn new(remuxer: &'a dyn Remuxer, extension: Extension, offset: UtcOffset) -> Self {
        Self {
            remuxer,
            extension,
            offset,
        }
    }

    /// Join the fragments, in position order, into a new file of `folder`.
    ///
    /// Once the video is written, the fragments and the manifest are deleted.
    /// If the remuxer fails they are all kept for inspection.
    pub fn concatenate(
        &self,
        fragments: &[FetchedFragment],
        folder: &Path,
    ) -> Result<OutputArtifact, ConcatError> {
        if fragments.is_empty() {
            return Err(ConcatError::NoFragments);
        }

        let mut fragments = fragments.to_vec();
        fragments.sort_by_key(|fragment| fragment.position);

        let manifest = folder.join(MANIFEST_NAME);
        write_manifest(&manifest, &fragments)?;
        info!(
            "Manifest '{}' written with {} fragments",
            manifest.display(),
            fragments.len()
        );

        let output = self.output_path(folder)?;
        info!("Remuxing the fragments into '{}'", output.display());

        match self.remuxer.concat_copy(&manifest, &output) {
            ExitOutcome::Success => {}
            ExitOutcome::Failed { code, stderr } => {
                error!("Remuxing failed (exit code {code:?}), fragments kept in {}", folder.display());
                error!("{stderr}");
                return Err(ConcatError::RemuxFailed { diagnostic: stderr });
            }
            ExitOutcome::SpawnFailed(diagnostic) => {
                error!("Could not start the remuxer: {diagnostic}");
                return Err(ConcatError::RemuxFailed { diagnostic });
            }
        }

        info!("Video saved to '{}'", output.display());

        let mut leftovers = 0;
        for path in fragments.iter().map(|f| f.path.as_path()).chain([manifest.as_path()]) {
            if !remove_logged(path) {
                leftovers += 1;
            }
        }
        if leftovers > 0 {
            warn!("{leftovers} intermediate files could not be removed");
        }

        Ok(OutputArtifact { path: output })
    }

    /// A path named after the current local time that does not exist yet
    fn output_path(&self, folder: &Path) -> miette::Result<PathBuf> {
        let now = OffsetDateTime::now_utc().to_offset(self.offset);
        let stem = now
            .format(ARTIFACT_NAME_FORMAT)
            .into_diagnostic()
            .wrap_err("Could not format the output file name")?;

        find_unused_prefix(folder, &stem, self.extension)
    }
}

/// Write the concat manifest: one `file '<absolute path>'` directive per fragment
fn write_manifest(manifest: &Path, fragments: &[FetchedFragment]) -> miette::Result<()> {
    let mut content = String::new();
    for fragment in fragments {
        let path = std::path::absolute(&fragment.path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Invalid fragment path {}", fragment.path.display()))?;
        content.push_str(&manifest_line(&path));
        content.push('\n');
    }

    std::fs::write(manifest, content)
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not write manifest {}", manifest.display()))
}

/// Single quotes end the quoted path, they have to be written `'\''`
fn manifest_line(path: &Path) -> String {
    let path = path.to_string_lossy().replace('\'', r"'\''");
    format!("file '{path}'")
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use regex::Regex;

    use super::*;
    use crate::outside::fake::FakeRemuxer;

    fn fragments_on_disk(folder: &Path, positions: &[usize]) -> Vec<FetchedFragment> {
        positions
            .iter()
            .map(|&position| {
                let path = folder.join(format!("segment_{position}.ts"));
                std::fs::write(&path, format!("fragment {position}")).unwrap();
                FetchedFragment { position, path }
            })
            .collect()
    }

    fn file_names(folder: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(folder)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn nothing_to_concatenate() {
        let dir = tempfile::tempdir().unwrap();
        let remuxer = FakeRemuxer::succeeding();
        let concatenator = Concatenator::new(&remuxer, Extension::Mp4, UtcOffset::UTC);

        assert_matches!(
            concatenator.concatenate(&[], dir.path()),
            Err(ConcatError::NoFragments)
        );
        assert!(!dir.path().join(MANIFEST_NAME).exists());
        assert!(remuxer.manifests().is_empty());
    }

    #[test]
    fn success_removes_intermediate_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut fragments = fragments_on_disk(dir.path(), &[1, 2, 4]);
        // Input order does not matter
        fragments.reverse();

        let remuxer = FakeRemuxer::succeeding();
        let concatenator = Concatenator::new(&remuxer, Extension::Mp4, UtcOffset::UTC);
        let artifact = concatenator.concatenate(&fragments, dir.path()).unwrap();

        let manifests = remuxer.manifests();
        assert_eq!(manifests.len(), 1);
        let expected: String = [1, 2, 4]
            .iter()
            .map(|p| {
                let path = std::path::absolute(dir.path().join(format!("segment_{p}.ts"))).unwrap();
                format!("file '{}'\n", path.display())
            })
            .collect();
        assert_eq!(manifests[0], expected);

        let names = file_names(dir.path());
        assert_eq!(names.len(), 1);
        let pattern = Regex::new(r"^\d{2}\.\d{2}\.\d{4} \d{2};\d{2};\d{2}\.mp4$").unwrap();
        assert!(pattern.is_match(&names[0]), "unexpected name {}", names[0]);
        assert_eq!(artifact.path, dir.path().join(&names[0]));
    }

    #[test]
    fn failure_keeps_intermediate_files() {
        let dir = tempfile::tempdir().unwrap();
        let fragments = fragments_on_disk(dir.path(), &[1, 2]);

        let remuxer = FakeRemuxer::failing("segments.txt: Invalid data found when processing input");
        let concatenator = Concatenator::new(&remuxer, Extension::Mkv, UtcOffset::UTC);

        assert_matches!(
            concatenator.concatenate(&fragments, dir.path()),
            Err(ConcatError::RemuxFailed { diagnostic }) if diagnostic.contains("Invalid data")
        );
        assert_eq!(
            file_names(dir.path()),
            ["segment_1.ts", "segment_2.ts", "segments.txt"]
        );
    }

    #[test]
    fn remuxer_not_started_keeps_intermediate_files() {
        let dir = tempfile::tempdir().unwrap();
        let fragments = fragments_on_disk(dir.path(), &[1, 2]);

        let remuxer = FakeRemuxer::not_started("No such file or directory (os error 2)");
        let concatenator = Concatenator::new(&remuxer, Extension::Mp4, UtcOffset::UTC);

        assert_matches!(
            concatenator.concatenate(&fragments, dir.path()),
            Err(ConcatError::RemuxFailed { diagnostic }) if diagnostic.contains("os error 2")
        );
        assert_eq!(
            file_names(dir.path()),
            ["segment_1.ts", "segment_2.ts", "segments.txt"]
        );
    }

    #[test]
    fn cleanup_failure_still_returns_the_video() {
        let dir = tempfile::tempdir().unwrap();
        let fragments = fragments_on_disk(dir.path(), &[1, 2, 3]);

        // Already gone when the cleanup tries to remove it
        let remuxer = FakeRemuxer::succeeding_removing(&fragments[1].path);
        let concatenator = Concatenator::new(&remuxer, Extension::Mp4, UtcOffset::UTC);
        let artifact = concatenator.concatenate(&fragments, dir.path()).unwrap();

        assert!(artifact.path.exists());
        let names = file_names(dir.path());
        assert_eq!(names.len(), 1);
        assert_eq!(artifact.path, dir.path().join(&names[0]));
    }

    #[test]
    fn quote_paths_in_manifest() {
        assert_eq!(
            manifest_line(Path::new("/videos/1/segment_1.ts")),
            "file '/videos/1/segment_1.ts'"
        );
        assert_eq!(
            manifest_line(Path::new("/home/o'neil/segment_1.ts")),
            r"file '/home/o'\''neil/segment_1.ts'"
        );
    }
}
