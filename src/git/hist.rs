use std::path::{Path, PathBuf};

use git2::{Commit, ErrorCode, Repository, Sort};
use serde::Serialize;
use tracing::{debug, trace};

use crate::git::diff::{CommitRecord, get_commit_detail};
use crate::time_utils::{ResolvedRange, format_git_time};
use crate::{AppError, AppResult};

/// One line of the commit log: what the report lists before fetching diffs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitMeta {
    pub hash: String,
    pub author: String,
    pub date: String,
    pub message: String,
}

impl CommitMeta {
    pub(crate) fn from_commit(commit: &Commit) -> AppResult<Self> {
        let author = commit.author();
        Ok(Self {
            hash: commit.id().to_string(),
            author: String::from_utf8_lossy(author.name_bytes()).into_owned(),
            date: format_git_time(author.when())?,
            message: commit.summary().unwrap_or_default().to_string(),
        })
    }
}

/// Where the report gets its commits from.
pub trait CommitSource {
    /// Commits in `range`, newest first.
    fn list_commits(&self, range: &ResolvedRange) -> AppResult<Vec<CommitMeta>>;

    /// Full metadata and classified diffs for one commit.
    fn commit_detail(&self, hash: &str) -> AppResult<CommitRecord>;
}

/// A git working tree opened through libgit2.
pub struct GitRepository {
    repo: Repository,
}

impl GitRepository {
    /// Discover the repository containing `path`. Bare repositories are rejected
    /// since there is no working tree to report on.
    #[tracing::instrument(level = "debug")]
    pub fn open(path: &Path) -> AppResult<Self> {
        let repo = match Repository::discover(path) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => {
                return Err(AppError::Repository(format!(
                    "{} is not a git repository",
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };
        if repo.is_bare() {
            return Err(AppError::Repository(format!(
                "{} is not a git repository (bare repositories have no working tree)",
                path.display()
            )));
        }
        debug!("Opened git repository at {:?}", repo.path());
        Ok(Self { repo })
    }

    pub fn workdir(&self) -> Option<PathBuf> {
        self.repo.workdir().map(Path::to_path_buf)
    }
}

impl CommitSource for GitRepository {
    #[tracing::instrument(name = "Listing commits", level = "debug", skip(self, range))]
    fn list_commits(&self, range: &ResolvedRange) -> AppResult<Vec<CommitMeta>> {
        let mut revwalk = self.repo.revwalk()?;
        revwalk.set_sorting(Sort::TIME)?;
        if let Err(e) = revwalk.push_head() {
            if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) {
                debug!("No HEAD to walk (likely unborn branch): {}", e);
                return Ok(Vec::new());
            }
            return Err(e.into());
        }

        let mut commits = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            // Same field `git log --since/--until` filters on.
            let committed_at = commit.time().seconds();
            if range.contains(committed_at) {
                trace!("Commit {} is in range", commit.id());
                commits.push(CommitMeta::from_commit(&commit)?);
            }
        }
        debug!("Found {} commits in range", commits.len());
        Ok(commits)
    }

    fn commit_detail(&self, hash: &str) -> AppResult<CommitRecord> {
        get_commit_detail(&self.repo, hash)
    }
}
