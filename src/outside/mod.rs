mod command;
#[cfg(test)]
pub mod fake;
mod ffmpeg;

pub use ffmpeg::{ExitOutcome, Ffmpeg, Remuxer};
