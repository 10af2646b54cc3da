use serde::Deserialize;

/// Container of the merged output file.
///
/// The remuxer picks the output container from the file extension,
/// so this is also what decides the final format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Extension {
    #[default]
    Mp4,
    Mkv,
    Ts,
}

impl Extension {
    /// Return the extension with the leading dot.
    /// e.g. ".ext"
    pub fn with_dot(self) -> &'static str {
        match self {
            Extension::Mp4 => ".mp4",
            Extension::Mkv => ".mkv",
            Extension::Ts => ".ts",
        }
    }
}
