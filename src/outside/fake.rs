use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use super::{ExitOutcome, Remuxer};

#[derive(Debug)]
enum Behavior {
    Succeed,
    /// Succeed after deleting this file, so its cleanup fails
    SucceedRemoving(PathBuf),
    Fail(String),
    NotStarted(String),
}

/// Stands in for ffmpeg: records every manifest it is given, and either
/// writes a dummy output file or fails like ffmpeg would.
#[derive(Debug)]
pub struct FakeRemuxer {
    behavior: Behavior,
    manifests: Mutex<Vec<String>>,
}

impl FakeRemuxer {
    fn with(behavior: Behavior) -> Self {
        Self {
            behavior,
            manifests: Mutex::new(vec![]),
        }
    }

    pub fn succeeding() -> Self {
        Self::with(Behavior::Succeed)
    }

    /// Succeeds, but removes `path` behind the caller's back first
    pub fn succeeding_removing(path: &Path) -> Self {
        Self::with(Behavior::SucceedRemoving(path.to_path_buf()))
    }

    pub fn failing(stderr: &str) -> Self {
        Self::with(Behavior::Fail(stderr.to_string()))
    }

    /// Behaves like a program that cannot be started
    pub fn not_started(reason: &str) -> Self {
        Self::with(Behavior::NotStarted(reason.to_string()))
    }

    /// Content of the manifests received so far
    pub fn manifests(&self) -> Vec<String> {
        self.manifests.lock().unwrap().clone()
    }
}

impl Remuxer for FakeRemuxer {
    fn concat_copy(&self, manifest: &Path, output: &Path) -> ExitOutcome {
        let content = std::fs::read_to_string(manifest).unwrap();
        self.manifests.lock().unwrap().push(content);

        match &self.behavior {
            Behavior::Fail(stderr) => ExitOutcome::Failed {
                code: Some(1),
                stderr: stderr.clone(),
            },
            Behavior::NotStarted(reason) => ExitOutcome::SpawnFailed(reason.clone()),
            Behavior::Succeed | Behavior::SucceedRemoving(_) => {
                if let Behavior::SucceedRemoving(path) = &self.behavior {
                    std::fs::remove_file(path).unwrap();
                }
                assert!(!output.exists(), "output would be overwritten");
                std::fs::write(output, b"merged").unwrap();
                ExitOutcome::Success
            }
        }
    }
}
