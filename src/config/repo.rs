//! Optional per-repository configuration (`.commit.json`).
//!
//! Declares monorepo scopes and the commit types the planner may use.
//! A missing file yields the defaults.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::ConfigError;

/// File name of the repo config, at the repository root.
pub const REPO_CONFIG_FILE: &str = ".commit.json";

/// Built-in Conventional Commits vocabulary.
pub const DEFAULT_TYPES: [&str; 11] = [
    "feat", "fix", "docs", "style", "refactor", "test", "chore", "perf", "ci", "build", "revert",
];

/// One `path prefix -> scope name` binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeRule {
    /// Forward-slash prefix, always ending in `/`.
    pub path_prefix: String,
    pub scope: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMode {
    Whitelist,
    Blacklist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitTypes {
    pub mode: TypeMode,
    pub types: Vec<String>,
}

impl Default for CommitTypes {
    fn default() -> Self {
        Self {
            mode: TypeMode::Whitelist,
            types: DEFAULT_TYPES.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Validated repository configuration.
///
/// `scopes` is sorted by descending prefix length, so the first matching rule
/// is always the longest match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoConfig {
    pub scopes: Vec<ScopeRule>,
    pub default_scope: Option<String>,
    pub commit_types: CommitTypes,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRepoConfig {
    #[serde(default)]
    scopes: Vec<RawScope>,
    #[serde(default, rename = "defaultScope")]
    default_scope: Option<String>,
    #[serde(default, rename = "commitTypes")]
    commit_types: Option<RawCommitTypes>,
}

#[derive(Deserialize)]
struct RawScope {
    path: String,
    scope: String,
}

#[derive(Deserialize)]
struct RawCommitTypes {
    #[serde(default)]
    mode: Option<String>,
    #[serde(default)]
    types: Vec<String>,
}

impl RepoConfig {
    /// Parse and validate repo config JSON. `path` is only used in errors.
    pub fn from_json_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let fail = |reason: String| ConfigError::RepoConfigParse {
            path: path.to_path_buf(),
            reason,
        };

        let raw: RawRepoConfig = serde_json::from_str(text).map_err(|e| fail(e.to_string()))?;

        let mut seen = HashSet::new();
        let mut scopes = Vec::with_capacity(raw.scopes.len());
        for entry in raw.scopes {
            let scope = entry.scope.trim().to_string();
            if scope.is_empty() {
                return Err(fail(format!("scope name for path '{}' is empty", entry.path)));
            }

            let path_prefix = normalize_prefix(&entry.path)
                .ok_or_else(|| fail(format!("scope '{}' has an empty path", scope)))?;

            if !seen.insert(path_prefix.clone()) {
                return Err(fail(format!("duplicate scope path '{}'", path_prefix)));
            }

            scopes.push(ScopeRule { path_prefix, scope });
        }

        // Stable sort keeps file order among equal lengths
        scopes.sort_by(|a, b| b.path_prefix.len().cmp(&a.path_prefix.len()));

        let default_scope = raw
            .default_scope
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let commit_types = match raw.commit_types {
            None => CommitTypes::default(),
            Some(raw_types) => parse_commit_types(raw_types).map_err(fail)?,
        };

        Ok(Self {
            scopes,
            default_scope,
            commit_types,
        })
    }

    pub fn has_scopes(&self) -> bool {
        !self.scopes.is_empty()
    }

    /// Scope names a planned commit may use: every configured scope plus the default.
    pub fn scope_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for rule in &self.scopes {
            if !names.contains(&rule.scope) {
                names.push(rule.scope.clone());
            }
        }
        if let Some(default) = &self.default_scope
            && !names.contains(default)
        {
            names.push(default.clone());
        }
        names
    }
}

fn parse_commit_types(raw: RawCommitTypes) -> Result<CommitTypes, String> {
    let mode = match raw.mode.as_deref().map(str::trim) {
        None | Some("") => return Ok(CommitTypes::default()),
        Some(m) if m.eq_ignore_ascii_case("whitelist") => TypeMode::Whitelist,
        Some(m) if m.eq_ignore_ascii_case("blacklist") => TypeMode::Blacklist,
        Some(other) => {
            return Err(format!(
                "commitTypes.mode must be 'whitelist' or 'blacklist', got '{}'",
                other
            ));
        }
    };

    let mut types: Vec<String> = Vec::new();
    for t in raw.types {
        let t = t.trim().to_lowercase();
        if !t.is_empty() && !types.contains(&t) {
            types.push(t);
        }
    }

    let commit_types = CommitTypes { mode, types };
    if allowed_from(&commit_types).is_empty() {
        return Err("commitTypes leaves no commit type allowed".to_string());
    }
    Ok(commit_types)
}

/// Normalize a scope path to a forward-slash prefix ending in `/`.
///
/// Returns `None` for paths that are empty after normalization.
fn normalize_prefix(path: &str) -> Option<String> {
    let mut prefix = path.trim().replace('\\', "/");
    while let Some(rest) = prefix.strip_prefix("./") {
        prefix = rest.to_string();
    }
    let prefix = prefix.trim_start_matches('/').to_string();
    if prefix.is_empty() {
        return None;
    }
    if prefix.ends_with('/') {
        Some(prefix)
    } else {
        Some(format!("{}/", prefix))
    }
}

fn allowed_from(commit_types: &CommitTypes) -> Vec<String> {
    match commit_types.mode {
        TypeMode::Whitelist => commit_types.types.clone(),
        TypeMode::Blacklist => DEFAULT_TYPES
            .iter()
            .filter(|t| !commit_types.types.iter().any(|b| b == *t))
            .map(|t| t.to_string())
            .collect(),
    }
}

/// Types the planner may use: the whitelist itself, or the defaults minus the blacklist.
pub fn allowed_types(config: &RepoConfig) -> Vec<String> {
    allowed_from(&config.commit_types)
}

/// Load `.commit.json` from the repository root, or defaults when absent.
pub fn load_repo_config(root: &Path) -> Result<RepoConfig, ConfigError> {
    let path: PathBuf = root.join(REPO_CONFIG_FILE);

    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No {} at {}, using defaults", REPO_CONFIG_FILE, root.display());
            return Ok(RepoConfig::default());
        }
        Err(source) => return Err(ConfigError::Read { path, source }),
    };

    let config = RepoConfig::from_json_str(&text, &path)?;
    debug!(
        "Loaded {} with {} scope(s)",
        REPO_CONFIG_FILE,
        config.scopes.len()
    );
    Ok(config)
}
