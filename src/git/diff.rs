use git2::{Diff, DiffDelta, DiffOptions, ErrorCode, Patch, Repository};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, trace};

use crate::git::hist::CommitMeta;
use crate::{AppError, AppResult};

/// How a file changed in a commit, derived from its line counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Added,
    Deleted,
    Modified,
}

/// Inserted/deleted line counts for one file. Absent for binary files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineStats {
    pub insertions: usize,
    pub deletions: usize,
}

impl FileStatus {
    /// Every file of a root commit is `Added`. Otherwise only pure insertions
    /// or pure deletions count as added/deleted; everything else, including
    /// files without line counts, is `Modified`.
    pub fn classify(is_initial_commit: bool, stats: Option<LineStats>) -> Self {
        if is_initial_commit {
            return FileStatus::Added;
        }
        match stats {
            Some(LineStats {
                insertions,
                deletions: 0,
            }) if insertions > 0 => FileStatus::Added,
            Some(LineStats {
                insertions: 0,
                deletions,
            }) if deletions > 0 => FileStatus::Deleted,
            _ => FileStatus::Modified,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    pub file_path: String,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

/// A commit's metadata plus its per-file diffs, in diff order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    pub hash: String,
    pub message: String,
    pub author: String,
    pub date: String,
    pub diffs: Vec<FileDiff>,
}

fn get_diff_opts() -> DiffOptions {
    let mut opts = DiffOptions::new();
    opts.include_typechange(true)
        .ignore_submodules(false)
        .skip_binary_check(false)
        .force_text(false)
        .indent_heuristic(true)
        .context_lines(3);
    opts
}

fn get_filename(delta: &DiffDelta) -> PathBuf {
    match delta.new_file().path() {
        Some(p) => p.to_path_buf(),
        None => match delta.old_file().path() {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from("unknown"),
        },
    }
}

/// Unified patch text and line counts for the `idx`-th file of `diff`.
fn get_file_patch(
    diff: &Diff,
    idx: usize,
) -> Result<(Option<String>, Option<LineStats>), git2::Error> {
    match Patch::from_diff(diff, idx)? {
        Some(mut patch) => {
            let stats = if patch.delta().flags().is_binary() {
                None
            } else {
                let (_, insertions, deletions) = patch.line_stats()?;
                Some(LineStats {
                    insertions,
                    deletions,
                })
            };
            let buf = patch.to_buf()?;
            Ok((Some(String::from_utf8_lossy(&buf).into_owned()), stats))
        }
        // Nothing textual to show for this delta.
        None => Ok((None, None)),
    }
}

/// Load a commit and diff it against its first parent, or against the empty
/// tree when it is the root of the history. Any file whose patch cannot be
/// produced fails the whole commit.
#[tracing::instrument(level = "debug", skip(repo))]
pub fn get_commit_detail(repo: &Repository, hash: &str) -> AppResult<CommitRecord> {
    let commit = repo
        .revparse_single(hash)
        .and_then(|obj| obj.peel_to_commit())
        .map_err(|_| AppError::CommitNotFound(hash.to_string()))?;

    let parent = match commit.parent(0) {
        Ok(parent) => Some(parent),
        Err(e) if e.code() == ErrorCode::NotFound => None,
        Err(e) => return Err(e.into()),
    };
    let is_initial_commit = parent.is_none();
    if is_initial_commit {
        debug!("Commit {} has no parent, diffing against the empty tree", hash);
    }

    let tree = commit.tree()?;
    let parent_tree = parent.as_ref().map(|p| p.tree()).transpose()?;
    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), Some(&mut get_diff_opts()))?;

    let mut diffs = Vec::with_capacity(diff.deltas().len());
    for (idx, delta) in diff.deltas().enumerate() {
        let file_path = get_filename(&delta).to_string_lossy().into_owned();
        let (patch, stats) =
            get_file_patch(&diff, idx).map_err(|e| AppError::DiffRetrieval {
                path: file_path.clone(),
                message: e.message().to_string(),
            })?;
        let status = FileStatus::classify(is_initial_commit, stats);
        trace!("{} {:?} {:?}", file_path, status, stats);
        diffs.push(FileDiff {
            file_path,
            status,
            diff: patch,
        });
    }

    let CommitMeta {
        hash,
        author,
        date,
        message,
    } = CommitMeta::from_commit(&commit)?;
    Ok(CommitRecord {
        hash,
        message,
        author,
        date,
        diffs,
    })
}
