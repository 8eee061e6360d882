//! Repository gateway: every interaction with the git binary goes through here.

pub mod cli;
pub mod diff;
pub mod status;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use git2::{ErrorCode, Repository};

use crate::error::GitError;

pub use cli::GitCli;
pub use diff::{MAX_DIFF_CHARS, NumStat, TRUNCATION_MARKER, parse_numstat, truncate_diff};
pub use status::{FileStatus, GitStatus};

/// How `git reset` treats the index and working tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetMode {
    Mixed,
    Soft,
    Hard,
}

impl ResetMode {
    pub fn flag(&self) -> &'static str {
        match self {
            ResetMode::Mixed => "--mixed",
            ResetMode::Soft => "--soft",
            ResetMode::Hard => "--hard",
        }
    }
}

impl fmt::Display for ResetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag().trim_start_matches('-'))
    }
}

/// Operations the planning pipeline needs from version control.
///
/// `GitCli` is the real implementation; tests substitute `MockGateway`.
#[cfg_attr(test, mockall::automock)]
pub trait Gateway {
    /// Snapshot of the working tree in porcelain order.
    fn status(&self) -> Result<GitStatus, GitError>;

    /// Unified diff text.
    ///
    /// `staged_only` restricts to the index. Without `paths` and without
    /// `staged_only`, the diff covers the working tree against HEAD plus every
    /// untracked file rendered as a new-file diff.
    fn diff(&self, staged_only: bool, paths: &[String]) -> Result<String, GitError>;

    /// Per-path line counts keyed by repo-relative path.
    fn diff_numstat(&self, staged_only: bool) -> Result<HashMap<String, NumStat>, GitError>;

    /// Subjects of the most recent commits, newest first.
    fn recent_commits(&self, count: usize) -> Result<Vec<String>, GitError>;

    /// Stage exactly these paths (additions, modifications and removals).
    fn add(&self, paths: &[String]) -> Result<(), GitError>;

    /// Record the index as a commit and return its full hash.
    ///
    /// `message` is the complete commit message (subject, blank line, body).
    fn commit(&self, message: &str) -> Result<String, GitError>;

    fn reset(&self, mode: ResetMode, target: &str) -> Result<(), GitError>;

    /// Whether `reference` is reachable from any remote-tracking ref.
    fn was_pushed(&self, reference: &str) -> Result<bool, GitError>;
}

/// Check that the git binary is available.
pub fn check_git_installed() -> Result<(), GitError> {
    which::which("git").map_err(|_| GitError::GitNotInstalled)?;
    Ok(())
}

/// Find the working-tree root of the repository containing `cwd`.
///
/// Walks upward from `cwd` until a repository marker is found. Bare
/// repositories have no working tree and are reported as not a repository.
pub fn find_root(cwd: &Path) -> Result<PathBuf, GitError> {
    let repo = match Repository::discover(cwd) {
        Ok(repo) => repo,
        Err(e) if e.code() == ErrorCode::NotFound => {
            return Err(GitError::NotARepository(cwd.to_path_buf()));
        }
        Err(e) => return Err(GitError::Discover(e)),
    };

    let workdir = repo
        .workdir()
        .ok_or_else(|| GitError::NotARepository(cwd.to_path_buf()))?;

    // libgit2 reports the workdir with a trailing separator
    Ok(workdir.components().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_mode_flags() {
        assert_eq!(ResetMode::Mixed.flag(), "--mixed");
        assert_eq!(ResetMode::Soft.flag(), "--soft");
        assert_eq!(ResetMode::Hard.flag(), "--hard");
        assert_eq!(ResetMode::Mixed.to_string(), "mixed");
    }

    #[test]
    fn test_find_root_outside_repo() {
        let dir = tempfile::tempdir().unwrap();
        let result = find_root(dir.path());
        assert!(
            matches!(result, Err(GitError::NotARepository(_))),
            "Expected NotARepository, got: {:?}",
            result
        );
    }

    #[test]
    fn test_find_root_from_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        Repository::init(dir.path()).unwrap();
        let nested = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&nested).unwrap();

        let root = find_root(&nested).unwrap();
        assert_eq!(
            root.canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }
}
