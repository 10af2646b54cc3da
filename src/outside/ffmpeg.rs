use std::{
    ffi::{OsStr, OsString},
    fmt::Debug,
    path::Path,
};

use miette::Result;

use super::command::{assert_success_command, run_command, Capture, FFXXX_DEFAULT_ARGS};

/// How a remux invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    /// The program ran but reported a failure
    Failed { code: Option<i32>, stderr: String },
    /// The program could not be started at all
    SpawnFailed(String),
}

pub trait Remuxer: Sync + Debug {
    /// Join the files listed in the concat `manifest` into `output`,
    /// copying the streams as-is, without re-encoding them.
    ///
    /// Blocks until the output is complete.
    fn concat_copy(&self, manifest: &Path, output: &Path) -> ExitOutcome;
}

/// Interface for the [ffmpeg](https://ffmpeg.org) program
#[derive(Debug)]
pub struct Ffmpeg {
    program: String,
}

impl Ffmpeg {
    /// Verify that the `ffmpeg` binary is reachable
    pub fn new(program: &str) -> Result<Self> {
        assert_success_command(program, |cmd| cmd.arg("-version"))?;

        Ok(Self {
            program: program.to_string(),
        })
    }

    /// Arguments of a concat-demuxer, stream copy invocation.
    ///
    /// `-safe 0` lets the manifest list absolute paths,
    /// `-n` refuses to overwrite an existing output.
    fn concat_args(manifest: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = FFXXX_DEFAULT_ARGS.iter().map(OsString::from).collect();
        args.push("-n".into());
        args.extend(["-f", "concat", "-safe", "0"].map(OsString::from));
        args.extend([OsStr::new("-i"), manifest.as_os_str()].map(OsString::from));
        args.extend(["-c", "copy"].map(OsString::from));
        args.push(output.as_os_str().to_owned());
        args
    }
}

impl Remuxer for Ffmpeg {
    fn concat_copy(&self, manifest: &Path, output: &Path) -> ExitOutcome {
        let res = run_command(
            &self.program,
            |cmd| cmd.args(Self::concat_args(manifest, output)),
            Capture::STDERR,
        );

        match res {
            Ok(res) if res.status.success() => ExitOutcome::Success,
            Ok(res) => ExitOutcome::Failed {
                code: res.status.code(),
                stderr: String::from_utf8_lossy(&res.stderr).into_owned(),
            },
            Err(report) => ExitOutcome::SpawnFailed(format!("{report:?}")),
        }
    }
}
