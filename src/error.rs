//! Error types for commitsmith modules using thiserror.

use std::path::PathBuf;

use thiserror::Error;

use crate::plan::ExecutedCommit;

/// Errors from the repository gateway (git subprocess calls).
#[derive(Error, Debug)]
pub enum GitError {
    #[error("git not found on PATH. Install git and try again.")]
    GitNotInstalled,

    #[error("Not a git repository (or any parent up to the filesystem root): {0}")]
    NotARepository(PathBuf),

    #[error("Failed to inspect repository: {0}")]
    Discover(#[source] git2::Error),

    #[error("Failed to spawn git {operation}: {source}")]
    SpawnFailed {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {operation} failed: {stderr}")]
    CommandFailed { operation: String, stderr: String },

    #[error("Unexpected output from git {operation}: {detail}")]
    UnexpectedOutput { operation: String, detail: String },
}

/// Errors from loading user and repository configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found at {0}. Run `commitsmith --init` to create one.")]
    ConfigNotFound(PathBuf),

    #[error("Could not determine a config directory; set COMMIT_CONFIG")]
    NoConfigDir,

    #[error("Failed to parse {path} line {line}: expected KEY=VALUE, got '{content}'")]
    EnvParse {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("COMMIT_PROVIDER is not set. Choose one of: anthropic, openai, grok, gemini, azure-foundry")]
    ProviderNotConfigured,

    #[error(
        "Invalid provider '{0}'. Choose one of: anthropic, openai, grok, gemini, azure-foundry"
    )]
    InvalidProvider(String),

    #[error("Provider {provider} requires {key} to be set")]
    MissingApiKey { provider: String, key: String },

    #[error("Invalid COMMIT_DEFAULT_MODE '{0}'. Expected 'smart' or 'single'")]
    InvalidDefaultMode(String),

    #[error("Failed to parse repo config {path}: {reason}")]
    RepoConfigParse { path: PathBuf, reason: String },

    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Config already exists at {0}")]
    AlreadyExists(PathBuf),
}

/// Errors from building the analysis request.
#[derive(Error, Debug)]
pub enum ContextError {
    #[error("No changes to commit (working tree is clean)")]
    NoChanges,

    #[error(transparent)]
    Git(#[from] GitError),
}

/// Errors from LLM provider calls.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("{provider} request timed out after {seconds} seconds")]
    Timeout { provider: String, seconds: u64 },

    #[error("{provider} request failed: {message}")]
    Transport { provider: String, message: String },

    #[error("{provider} rejected the credentials (HTTP {status}): {message}")]
    Auth {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} returned HTTP {status}: {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} returned an unparseable plan: {error}. Response began: {raw_prefix}")]
    ResponseParse {
        provider: String,
        error: String,
        raw_prefix: String,
    },

    #[error("{provider} request was cancelled")]
    Cancelled { provider: String },
}

/// Errors from executing a validated plan.
///
/// Every variant carries the commits created before the failure so the
/// caller can report partial progress.
#[derive(Error, Debug)]
pub enum ExecuteError {
    #[error("Commit {failed_at} of {total} failed after {} succeeded: {source}", .executed.len())]
    Gateway {
        executed: Vec<ExecutedCommit>,
        failed_at: usize,
        total: usize,
        #[source]
        source: GitError,
    },

    #[error("Interrupted after {} of {total} commits", .executed.len())]
    Interrupted {
        executed: Vec<ExecutedCommit>,
        total: usize,
    },
}

impl ExecuteError {
    /// Commits created before the run stopped.
    pub fn executed(&self) -> &[ExecutedCommit] {
        match self {
            ExecuteError::Gateway { executed, .. } => executed,
            ExecuteError::Interrupted { executed, .. } => executed,
        }
    }
}

/// Errors from reversing recent commits.
#[derive(Error, Debug)]
pub enum ReverseError {
    #[error("Reverse count must be at least 1, got {0}")]
    InvalidCount(usize),

    #[error(
        "Refusing to reverse {count} commit(s): they are already pushed to a remote. Use --force to override."
    )]
    PushedCommit { count: usize },

    #[error(transparent)]
    Git(#[from] GitError),
}
