//! Turning a validated plan into git commits.

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{ExecuteError, GitError};
use crate::git::{Gateway, ResetMode};

use super::{CommitPlan, ExecutedCommit, PlannedCommit};

/// Creates one git commit per planned commit, in plan order.
pub struct Executor<'a, G: Gateway + ?Sized> {
    gateway: &'a G,
    dry_run: bool,
    rename_sources: HashMap<String, String>,
    cancel: Option<CancellationToken>,
}

impl<'a, G: Gateway + ?Sized> Executor<'a, G> {
    pub fn new(gateway: &'a G, dry_run: bool) -> Self {
        Self {
            gateway,
            dry_run,
            rename_sources: HashMap::new(),
            cancel: None,
        }
    }

    /// Stage each rename's source path alongside its destination.
    pub fn with_rename_sources(mut self, rename_sources: HashMap<String, String>) -> Self {
        self.rename_sources = rename_sources;
        self
    }

    /// Stop between commits once `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Execute `plan`, calling `progress(current, total, commit)` before each commit.
    ///
    /// `current` is 1-based. On failure the error carries every commit
    /// created so far; nothing is rolled back.
    pub fn run<F>(
        &self,
        plan: &CommitPlan,
        mut progress: F,
    ) -> Result<Vec<ExecutedCommit>, ExecuteError>
    where
        F: FnMut(usize, usize, &PlannedCommit),
    {
        let total = plan.commits.len();
        let mut executed = Vec::with_capacity(total);

        for (i, commit) in plan.commits.iter().enumerate() {
            if self.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                info!("Interrupted after {} of {} commits", executed.len(), total);
                return Err(ExecuteError::Interrupted { executed, total });
            }

            progress(i + 1, total, commit);

            if self.dry_run {
                debug!("Dry run, skipping commit: {}", commit.subject());
                executed.push(ExecutedCommit {
                    commit: commit.clone(),
                    hash: String::new(),
                });
                continue;
            }

            match self.commit_one(commit) {
                Ok(hash) => {
                    let done = ExecutedCommit {
                        commit: commit.clone(),
                        hash,
                    };
                    info!("Created {} {}", done.short_hash(), commit.subject());
                    executed.push(done);
                }
                Err(source) => {
                    return Err(ExecuteError::Gateway {
                        executed,
                        failed_at: i + 1,
                        total,
                        source,
                    });
                }
            }
        }

        Ok(executed)
    }

    fn commit_one(&self, commit: &PlannedCommit) -> Result<String, GitError> {
        // Start from a clean index so nothing staged earlier leaks in
        self.gateway.reset(ResetMode::Mixed, "HEAD")?;
        self.gateway.add(&self.paths_to_stage(commit))?;
        self.gateway.commit(&commit.full_message())
    }

    fn paths_to_stage(&self, commit: &PlannedCommit) -> Vec<String> {
        let mut paths = commit.files.clone();
        for file in &commit.files {
            if let Some(source) = self.rename_sources.get(file)
                && !paths.contains(source)
            {
                paths.push(source.clone());
            }
        }
        paths
    }
}
