//! Analysis request construction: what the LLM sees about the working tree.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::config::{CommitMode, RepoConfig, allowed_types};
use crate::error::ContextError;
use crate::git::{FileStatus, Gateway, GitStatus, MAX_DIFF_CHARS, NumStat, truncate_diff};
use crate::scope::resolve_scope;

/// Number of recent subjects offered to the LLM as a style sample.
pub const RECENT_COMMIT_COUNT: usize = 10;

/// Hard limit on the subject text after `type(scope): `.
pub const MAX_MESSAGE_LENGTH: usize = 50;

/// Guidance for deciding whether two files belong in the same commit.
pub const BEHAVIORAL_TEST: &str = "Group files that change the same observable behavior. \
If reverting one file alone would leave the project broken or inconsistent, it belongs with the \
files it depends on. Unrelated behavior changes go in separate commits.";

/// One working-tree delta.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    /// Repo-relative, forward-slash path.
    pub path: String,
    pub status: FileStatus,
    /// Resolved scope; empty when none applies.
    pub scope: String,
    /// `"+A -D"` or `"binary"` when line counts are known.
    pub diff_summary: Option<String>,
    /// Source path of a rename.
    pub old_path: Option<String>,
}

/// Constraints every planned commit must satisfy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rules {
    pub types: Vec<String>,
    pub max_message_length: usize,
    pub behavioral_test: String,
    /// Ask for exactly one commit covering every file.
    pub single_commit: bool,
}

/// Everything the provider needs to plan commits for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub files: Vec<FileChange>,
    /// Diff text bounded to [`MAX_DIFF_CHARS`].
    pub diff: String,
    /// Newest first; may be empty.
    pub recent_commits: Vec<String>,
    pub has_scopes: bool,
    /// Configured scope names plus the default scope.
    pub scope_names: Vec<String>,
    pub rules: Rules,
}

impl AnalysisRequest {
    /// The working set: every path this run intends to commit.
    pub fn paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    /// Rename destination -> source for renamed files in the request.
    pub fn rename_sources(&self) -> HashMap<String, String> {
        self.files
            .iter()
            .filter_map(|f| f.old_path.as_ref().map(|old| (f.path.clone(), old.clone())))
            .collect()
    }
}

/// Build a request from the current working-tree status.
///
/// With `staged_only`, only paths with staged changes are candidates.
/// Fails with [`ContextError::NoChanges`] when there is nothing to commit.
pub fn build_request<G: Gateway + ?Sized>(
    gateway: &G,
    staged_only: bool,
    repo_config: &RepoConfig,
    mode: CommitMode,
) -> Result<AnalysisRequest, ContextError> {
    let status = gateway.status()?;

    let candidates = if staged_only {
        &status.staged
    } else {
        &status.all
    };

    if candidates.is_empty() {
        return Err(ContextError::NoChanges);
    }

    debug!(
        "{} candidate file(s){}",
        candidates.len(),
        if staged_only { " (staged only)" } else { "" }
    );

    let stats = gateway.diff_numstat(staged_only)?;
    let files = file_changes(candidates, Some(&status), &stats, repo_config);
    let diff = truncate_diff(&gateway.diff(staged_only, &[])?, MAX_DIFF_CHARS);

    Ok(assemble(gateway, files, diff, repo_config, mode))
}

/// Build a request for an explicit list of paths.
///
/// Directories select every changed file beneath them. Change kinds come from
/// the working-tree status when it can be read; otherwise every path is
/// treated as modified.
pub fn build_for_files<G: Gateway + ?Sized>(
    gateway: &G,
    paths: &[String],
    repo_config: &RepoConfig,
    mode: CommitMode,
) -> Result<AnalysisRequest, ContextError> {
    let requested: Vec<String> = paths.iter().map(|p| normalize_path(p)).collect();

    let (selected, status) = match gateway.status() {
        Ok(status) => (select_changed(&requested, &status), Some(status)),
        Err(e) => {
            warn!("Could not read status, treating paths as modified: {}", e);
            (requested.clone(), None)
        }
    };

    if selected.is_empty() {
        return Err(ContextError::NoChanges);
    }

    let stats = gateway.diff_numstat(false).unwrap_or_else(|e| {
        warn!("Could not read diff stats: {}", e);
        HashMap::new()
    });
    let files = file_changes(&selected, status.as_ref(), &stats, repo_config);
    let diff = truncate_diff(&gateway.diff(false, &selected)?, MAX_DIFF_CHARS);

    Ok(assemble(gateway, files, diff, repo_config, mode))
}

fn file_changes(
    paths: &[String],
    status: Option<&GitStatus>,
    stats: &HashMap<String, NumStat>,
    repo_config: &RepoConfig,
) -> Vec<FileChange> {
    paths
        .iter()
        .map(|path| {
            let kind = status
                .and_then(|s| s.change_kind(path))
                .unwrap_or(FileStatus::Modified);
            let scope = resolve_scope(path, Some(repo_config));
            debug!(path = %path, scope = %scope, status = %kind, "Resolved file");

            FileChange {
                path: path.clone(),
                status: kind,
                scope,
                diff_summary: stats.get(path).map(NumStat::summary),
                old_path: status.and_then(|s| s.rename_sources.get(path).cloned()),
            }
        })
        .collect()
}

fn assemble<G: Gateway + ?Sized>(
    gateway: &G,
    files: Vec<FileChange>,
    diff: String,
    repo_config: &RepoConfig,
    mode: CommitMode,
) -> AnalysisRequest {
    let recent_commits = gateway
        .recent_commits(RECENT_COMMIT_COUNT)
        .unwrap_or_else(|e| {
            debug!("No recent commits available: {}", e);
            Vec::new()
        });

    AnalysisRequest {
        files,
        diff,
        recent_commits,
        has_scopes: repo_config.has_scopes(),
        scope_names: repo_config.scope_names(),
        rules: Rules {
            types: allowed_types(repo_config),
            max_message_length: MAX_MESSAGE_LENGTH,
            behavioral_test: BEHAVIORAL_TEST.to_string(),
            single_commit: mode == CommitMode::Single,
        },
    }
}

/// Rewrite `paths`, as typed from `cwd`, into forward-slash paths relative to
/// the repository `root`.
///
/// Paths that land outside the repository are kept as typed and will match
/// nothing.
pub fn repo_relative_paths(root: &Path, cwd: &Path, paths: &[String]) -> Vec<String> {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let cwd = cwd.canonicalize().unwrap_or_else(|_| cwd.to_path_buf());

    paths
        .iter()
        .map(|typed| {
            let typed = normalize_path(typed);
            let absolute = lexical_join(&cwd, Path::new(&typed));
            match absolute.strip_prefix(&root) {
                Ok(relative) => relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/"),
                Err(_) => typed,
            }
        })
        .collect()
}

/// Join and fold `.`/`..` without touching the filesystem.
fn lexical_join(base: &Path, path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in base.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

fn normalize_path(path: &str) -> String {
    let mut normalized = path.trim().replace('\\', "/");
    while let Some(rest) = normalized.strip_prefix("./") {
        normalized = rest.to_string();
    }
    normalized
}

/// Changed paths matching `requested`, exactly or as a directory prefix.
fn select_changed(requested: &[String], status: &GitStatus) -> Vec<String> {
    status
        .all
        .iter()
        .filter(|changed| {
            requested.iter().any(|req| {
                let dir = req.trim_end_matches('/');
                *changed == req
                    || dir.is_empty()
                    || dir == "."
                    || changed
                        .strip_prefix(dir)
                        .is_some_and(|rest| rest.starts_with('/'))
            })
        })
        .cloned()
        .collect()
}
