//! Shared test utilities for integration tests.
//!
//! Not all functions are used by every test file, but they're shared across tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use git2::{Oid, Repository, Signature};
use tokio_util::sync::CancellationToken;

use commitsmith::context::{AnalysisRequest, FileChange, Rules};
use commitsmith::error::LlmError;
use commitsmith::git::{FileStatus, GitCli};
use commitsmith::llm::Provider;
use commitsmith::plan::{CommitPlan, PlannedCommit};

/// A test git repository builder for integration tests.
pub struct TestRepo {
    pub dir: tempfile::TempDir,
    pub repo: Repository,
}

impl TestRepo {
    /// Create a new empty git repository in a temp directory.
    ///
    /// Identity and signing are configured locally so `git commit` works on
    /// any host.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp directory");
        let repo = Repository::init(dir.path()).expect("Failed to init git repo");
        {
            let mut config = repo.config().expect("Failed to open repo config");
            config.set_str("user.name", "Test User").unwrap();
            config.set_str("user.email", "test@example.com").unwrap();
            config.set_bool("commit.gpgsign", false).unwrap();
        }
        Self { dir, repo }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A gateway rooted at this repository.
    pub fn gateway(&self) -> GitCli {
        GitCli::new(self.dir.path())
    }

    /// Write `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(rel)).expect("Failed to read file")
    }

    /// Stage `paths` through libgit2.
    pub fn stage(&self, paths: &[&str]) {
        let mut index = self.repo.index().expect("Failed to get index");
        for path in paths {
            if self.dir.path().join(path).exists() {
                index.add_path(Path::new(path)).expect("Failed to add file");
            } else {
                index.remove_path(Path::new(path)).expect("Failed to remove file");
            }
        }
        index.write().expect("Failed to write index");
    }

    /// Write `files`, stage them and commit with `message`. Returns the commit OID.
    pub fn commit_files(&self, files: &[(&str, &str)], message: &str) -> Oid {
        for (rel, content) in files {
            self.write(rel, content);
        }
        let paths: Vec<&str> = files.iter().map(|(rel, _)| *rel).collect();
        self.stage(&paths);
        self.commit_index(message)
    }

    /// Commit whatever is currently in the index.
    pub fn commit_index(&self, message: &str) -> Oid {
        let sig = Signature::now("Test User", "test@example.com")
            .expect("Failed to create signature");
        let mut index = self.repo.index().expect("Failed to get index");
        let tree_id = index.write_tree().expect("Failed to write tree");
        let tree = self.repo.find_tree(tree_id).expect("Failed to find tree");

        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        self.repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)
            .expect("Failed to create commit")
    }

    /// Subjects from HEAD backwards, newest first.
    pub fn log_subjects(&self) -> Vec<String> {
        let Ok(head) = self.repo.head() else {
            return Vec::new();
        };
        let mut walk = self.repo.revwalk().expect("Failed to create revwalk");
        walk.push(head.target().expect("HEAD has no target"))
            .expect("Failed to push HEAD");
        walk.map(|oid| {
            let commit = self.repo.find_commit(oid.unwrap()).unwrap();
            commit.summary().unwrap_or_default().to_string()
        })
        .collect()
    }

    /// Paths changed by the commit at `oid` relative to its first parent.
    pub fn files_in_commit(&self, oid: Oid) -> Vec<String> {
        let commit = self.repo.find_commit(oid).expect("Failed to find commit");
        let tree = commit.tree().unwrap();
        let parent_tree = commit.parent(0).ok().map(|p| p.tree().unwrap());
        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .unwrap();
        let mut files: Vec<String> = diff
            .deltas()
            .filter_map(|d| d.new_file().path().or_else(|| d.old_file().path()))
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        files.sort();
        files
    }

    /// Full message of the commit at `oid`.
    pub fn message(&self, oid: Oid) -> String {
        let commit = self.repo.find_commit(oid).expect("Failed to find commit");
        commit.message().unwrap_or_default().to_string()
    }

    /// Create `refs/remotes/origin/main` at `oid`, as if it had been pushed.
    pub fn mark_pushed(&self, oid: Oid) {
        self.repo
            .reference("refs/remotes/origin/main", oid, true, "test push")
            .expect("Failed to create remote-tracking ref");
    }

    pub fn head_oid(&self) -> Oid {
        self.repo
            .head()
            .expect("No HEAD")
            .target()
            .expect("HEAD has no target")
    }
}

/// Build a planned commit.
pub fn planned(commit_type: &str, scope: Option<&str>, message: &str, files: &[&str]) -> PlannedCommit {
    PlannedCommit {
        commit_type: commit_type.to_string(),
        scope: scope.map(str::to_string),
        message: message.to_string(),
        files: files.iter().map(|f| f.to_string()).collect(),
        body: None,
    }
}

/// A minimal analysis request over `paths`, all treated as added.
pub fn request_for(paths: &[&str]) -> AnalysisRequest {
    AnalysisRequest {
        files: paths
            .iter()
            .map(|p| FileChange {
                path: p.to_string(),
                status: FileStatus::Added,
                scope: String::new(),
                diff_summary: Some("+1 -0".to_string()),
                old_path: None,
            })
            .collect(),
        diff: "+hello\n".to_string(),
        recent_commits: Vec::new(),
        has_scopes: false,
        scope_names: Vec::new(),
        rules: Rules {
            types: vec!["feat".to_string(), "fix".to_string()],
            max_message_length: 50,
            behavioral_test: "Group by behavior.".to_string(),
            single_commit: false,
        },
    }
}

/// A provider that returns a fixed plan without any network access.
pub struct FakeProvider {
    pub plan: CommitPlan,
}

#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn model(&self) -> &str {
        "fake-model"
    }

    async fn analyze(
        &self,
        cancel: &CancellationToken,
        _request: &AnalysisRequest,
    ) -> Result<CommitPlan, LlmError> {
        if cancel.is_cancelled() {
            return Err(LlmError::Cancelled {
                provider: self.name().to_string(),
            });
        }
        Ok(self.plan.clone())
    }
}

/// A JSON plan body as a model would return it.
pub fn plan_json() -> String {
    r#"{"commits": [{"type": "feat", "scope": "api", "message": "add handler endpoint", "files": ["handler.go"]}, {"type": "chore", "message": "add configuration", "files": ["config.yaml"]}]}"#
        .to_string()
}
