use std::path::{Path, PathBuf};

use miette::{IntoDiagnostic, Result, WrapErr};
use regex::Regex;
use tracing::info;

/// Where the grabbed video comes from, usually the address of the page
/// the operator had open in the browser
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LocationContext(pub Option<String>);

/// Turns a [`LocationContext`] into the folder a run writes into
#[derive(Debug)]
pub struct FolderResolver {
    output_root: PathBuf,
    pattern: Regex,
    placeholder: String,
}

impl FolderResolver {
    pub fn new(output_root: &Path, pattern: &str, placeholder: &str) -> Result<Self> {
        let pattern = Regex::new(pattern)
            .into_diagnostic()
            .wrap_err("Invalid catalog pattern")?;

        Ok(Self {
            output_root: output_root.to_path_buf(),
            pattern,
            placeholder: placeholder.to_string(),
        })
    }

    /// Identifier of the article shown on the page.
    ///
    /// A page without an identifier still gets a folder, the placeholder one.
    pub fn identifier<'a>(&'a self, location: &'a LocationContext) -> &'a str {
        location
            .0
            .as_deref()
            .and_then(|address| self.pattern.captures(address))
            .and_then(|cap| cap.get(1))
            .map_or(self.placeholder.as_str(), |id| id.as_str())
    }

    pub fn destination_folder(&self, location: &LocationContext) -> PathBuf {
        let folder = self.output_root.join(self.identifier(location));
        info!("Destination folder: {}", folder.display());
        folder
    }
}
