//! [`Gateway`] implementation that shells out to the system `git` binary.
//!
//! All operations use `std::process::Command`, inheriting the user's git
//! config, hooks, and credential setup. Failures return git's stderr verbatim;
//! nothing is retried.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::error::GitError;

use super::diff::{MAX_DIFF_CHARS, NumStat, numstat_for_new_file, parse_numstat};
use super::status::GitStatus;
use super::{Gateway, ResetMode, find_root};

/// Untracked files larger than this get no line counts.
const MAX_NUMSTAT_FILE_BYTES: u64 = 1024 * 1024;

/// Git gateway rooted at a repository working tree.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    /// Use `root` as the working-tree root without any discovery.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Discover the repository containing `cwd` and root the gateway there.
    pub fn open(cwd: &Path) -> Result<Self, GitError> {
        Ok(Self::new(find_root(cwd)?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(&self.root)
            .args(["-c", "core.quotepath=false"])
            .args(args);
        cmd
    }

    /// Run a git command and return stdout, treating any non-zero exit as failure.
    fn run_git(&self, args: &[&str], operation: &str) -> Result<String, GitError> {
        self.run_git_accepting(args, operation, &[0])
    }

    /// Run a git command, accepting any of `ok_codes` as success.
    fn run_git_accepting(
        &self,
        args: &[&str],
        operation: &str,
        ok_codes: &[i32],
    ) -> Result<String, GitError> {
        debug!(?args, "git {}", operation);

        let output = self
            .command(args)
            .output()
            .map_err(|source| GitError::SpawnFailed {
                operation: operation.to_string(),
                source,
            })?;

        let accepted = output
            .status
            .code()
            .is_some_and(|code| ok_codes.contains(&code));

        if !accepted {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError::CommandFailed {
                operation: operation.to_string(),
                stderr,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Whether HEAD resolves to a commit (false on an unborn branch).
    fn has_head(&self) -> bool {
        self.command(&["rev-parse", "--verify", "--quiet", "HEAD"])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Untracked, non-ignored files, optionally limited to `paths`.
    fn untracked_files(&self, paths: &[String]) -> Result<Vec<String>, GitError> {
        let mut args = vec!["ls-files", "--others", "--exclude-standard", "-z"];
        if !paths.is_empty() {
            args.push("--");
            args.extend(paths.iter().map(String::as_str));
        }
        let output = self.run_git(&args, "ls-files")?;
        Ok(output
            .split('\0')
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Render an untracked file as a new-file diff.
    fn new_file_diff(&self, path: &str) -> Result<String, GitError> {
        // --no-index exits 1 when the inputs differ, which they always do here
        self.run_git_accepting(
            &["diff", "--no-color", "--no-ext-diff", "--no-index", "--", "/dev/null", path],
            "diff --no-index",
            &[0, 1],
        )
    }

    /// Diff of tracked files against HEAD, handling an unborn branch.
    fn tracked_diffs(&self, extra: &[&str], paths: &[String]) -> Result<String, GitError> {
        if self.has_head() {
            return self.run_git(&diff_args(&["diff", "HEAD"], extra, paths), "diff");
        }

        // No HEAD yet: everything tracked is in the index
        let mut text = self.run_git(
            &diff_args(&["diff", "--cached"], extra, paths),
            "diff --cached",
        )?;
        text.push_str(&self.run_git(&diff_args(&["diff"], extra, paths), "diff")?);
        Ok(text)
    }
}

/// Assemble `base extra... [-- paths...]`.
fn diff_args<'a>(base: &[&'a str], extra: &[&'a str], paths: &'a [String]) -> Vec<&'a str> {
    let mut args = base.to_vec();
    args.extend_from_slice(extra);
    if !paths.is_empty() {
        args.push("--");
        args.extend(paths.iter().map(String::as_str));
    }
    args
}

impl Gateway for GitCli {
    fn status(&self) -> Result<GitStatus, GitError> {
        let output = self.run_git(
            &["status", "--porcelain=v1", "-z", "--untracked-files=all"],
            "status",
        )?;

        GitStatus::parse_porcelain(&output).map_err(|detail| GitError::UnexpectedOutput {
            operation: "status".to_string(),
            detail,
        })
    }

    fn diff(&self, staged_only: bool, paths: &[String]) -> Result<String, GitError> {
        let flags = ["--no-color", "--no-ext-diff"];

        if staged_only {
            return self.run_git(
                &diff_args(&["diff", "--cached"], &flags, paths),
                "diff --cached",
            );
        }

        let mut text = self.tracked_diffs(&flags, paths)?;
        let untracked = self.untracked_files(paths)?;
        for (rendered, file) in untracked.iter().enumerate() {
            // Everything past the limit is truncated away by the caller
            if text.len() > MAX_DIFF_CHARS {
                debug!(
                    skipped = untracked.len() - rendered,
                    "Diff limit reached, not rendering remaining untracked files"
                );
                break;
            }
            text.push_str(&self.new_file_diff(file)?);
        }
        Ok(text)
    }

    fn diff_numstat(&self, staged_only: bool) -> Result<HashMap<String, NumStat>, GitError> {
        let parse = |output: String| {
            parse_numstat(&output).map_err(|detail| GitError::UnexpectedOutput {
                operation: "diff --numstat".to_string(),
                detail,
            })
        };

        if staged_only {
            let output =
                self.run_git(&["diff", "--cached", "--numstat", "-z"], "diff --numstat")?;
            return parse(output);
        }

        let mut stats = parse(self.tracked_diffs(&["--numstat", "-z"], &[])?)?;

        for file in self.untracked_files(&[])? {
            let path = self.root.join(&file);
            if let Ok(meta) = std::fs::metadata(&path)
                && meta.len() > MAX_NUMSTAT_FILE_BYTES
            {
                debug!(file = %file, bytes = meta.len(), "Skipping line count for large file");
                continue;
            }
            match std::fs::read(&path) {
                Ok(content) => {
                    stats.insert(file, numstat_for_new_file(&content));
                }
                Err(e) => warn!("Could not read untracked file {}: {}", file, e),
            }
        }

        Ok(stats)
    }

    fn recent_commits(&self, count: usize) -> Result<Vec<String>, GitError> {
        let limit = format!("-n{}", count);
        let output = self.run_git(&["log", &limit, "--pretty=format:%s"], "log")?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn add(&self, paths: &[String]) -> Result<(), GitError> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add", "-A", "--"];
        args.extend(paths.iter().map(String::as_str));
        self.run_git(&args, "add")?;
        Ok(())
    }

    fn commit(&self, message: &str) -> Result<String, GitError> {
        self.run_git(
            &["commit", "--quiet", "--cleanup=whitespace", "-m", message],
            "commit",
        )?;

        let hash = self.run_git(&["rev-parse", "HEAD"], "rev-parse")?;
        Ok(hash.trim().to_string())
    }

    fn reset(&self, mode: ResetMode, target: &str) -> Result<(), GitError> {
        // An unborn branch has no HEAD to reset to; emptying the index is the equivalent
        if mode == ResetMode::Mixed && target == "HEAD" && !self.has_head() {
            self.run_git(&["read-tree", "--empty"], "read-tree")?;
            return Ok(());
        }

        self.run_git(&["reset", "--quiet", mode.flag(), target], "reset")?;
        Ok(())
    }

    fn was_pushed(&self, reference: &str) -> Result<bool, GitError> {
        let output = self.run_git(&["branch", "--remotes", "--contains", reference], "branch")?;
        Ok(output.lines().any(|l| !l.trim().is_empty()))
    }
}
