//! commitsmith - A CLI tool that splits working-tree changes into small
//! Conventional Commits planned by an LLM.
//!
//! # Overview
//!
//! commitsmith snapshots the repository's uncommitted changes, asks a
//! configured LLM provider to group them into coherent commits, validates the
//! returned plan against the working set and repository rules, drops files
//! that look like secrets, and records the commits in order through the
//! system `git` binary.

pub mod config;
pub mod context;
pub mod error;
pub mod git;
pub mod llm;
pub mod plan;
pub mod scope;

// Re-export commonly used types
pub use config::{CommitMode, ProviderKind, RepoConfig, UserConfig};
pub use context::{AnalysisRequest, FileChange};
pub use error::{ConfigError, ContextError, ExecuteError, GitError, LlmError, ReverseError};
pub use git::{FileStatus, Gateway, GitCli, GitStatus, ResetMode};
pub use llm::{Provider, new_provider};
pub use plan::{
    CommitPlan, ExecutedCommit, Executor, PlannedCommit, ValidationReport, filter_sensitive_files,
    reverse, validate_plan,
};
pub use scope::resolve_scope;
