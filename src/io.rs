use std::path::{Path, PathBuf};

use miette::{bail, Result};
use tracing::{debug, error};

use crate::types::Extension;

/// Find a path `<out_dir>/<title><ext>` that is not taken yet.
///
/// Format for the 1st file: `<title><ext>`,
/// for the 2nd file and up: `<title> (<count>)<ext>`.
pub fn find_unused_prefix(out_dir: &Path, title: &str, extension: Extension) -> Result<PathBuf> {
    let mut output = out_dir.to_path_buf();
    let dot_ext = extension.with_dot();

    // Check filenames one by one until one does not exist
    output.push(format!("{title}{dot_ext}"));
    if !output.exists() {
        return Ok(output);
    }

    for n in 2u16.. {
        output.set_file_name(format!("{title} ({n}){dot_ext}"));
        if !output.exists() {
            return Ok(output);
        }
    }

    bail!("Too many files named '{title}' in {}", out_dir.display())
}

/// Remove a file, only logging a failure.
///
/// Returns whether the file was removed.
pub fn remove_logged(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!("Removed {}", path.display());
            true
        }
        Err(err) => {
            error!("Could not remove {}: {err}", path.display());
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unused_prefix_counts_up() {
        let dir = tempfile::tempdir().unwrap();
        let title = "01.02.2024 10;20;30";

        let first = find_unused_prefix(dir.path(), title, Extension::Mp4).unwrap();
        assert_eq!(first, dir.path().join("01.02.2024 10;20;30.mp4"));
        std::fs::write(&first, b"").unwrap();

        let second = find_unused_prefix(dir.path(), title, Extension::Mp4).unwrap();
        assert_eq!(second, dir.path().join("01.02.2024 10;20;30 (2).mp4"));
        std::fs::write(&second, b"").unwrap();

        let third = find_unused_prefix(dir.path(), title, Extension::Mp4).unwrap();
        assert_eq!(third, dir.path().join("01.02.2024 10;20;30 (3).mp4"));

        // Another container does not collide
        let mkv = find_unused_prefix(dir.path(), title, Extension::Mkv).unwrap();
        assert_eq!(mkv, dir.path().join("01.02.2024 10;20;30.mkv"));
    }

    #[test]
    fn remove_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("segment_1.ts");
        std::fs::write(&file, b"ts").unwrap();

        assert!(remove_logged(&file));
        assert!(!file.exists());
        assert!(!remove_logged(&file));
    }
}
