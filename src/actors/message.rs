use crate::pipeline::RunOutcome;

/// One press of the trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunRequest {
    pub id: u64,
}

/// What became of a [`RunRequest`]
#[derive(Debug)]
pub struct RunReport {
    pub id: u64,
    pub outcome: miette::Result<RunOutcome>,
}
