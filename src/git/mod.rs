/// Per-commit diff retrieval and file status classification.
pub(crate) mod diff;

/// Commit listing and repository access.
pub mod hist;
pub(crate) use diff::{CommitRecord, FileDiff, FileStatus};
pub(crate) use hist::*;
