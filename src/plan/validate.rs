//! Structural and semantic checks on a provider's plan.
//!
//! Every check runs and every defect is reported; nothing short-circuits.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::config::{CommitMode, RepoConfig, allowed_types};
use crate::context::MAX_MESSAGE_LENGTH;

use super::CommitPlan;
use super::sensitive::is_sensitive;

/// One defect in a plan. `commit` fields are 1-based positions in the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyPlan,
    TooManyCommits {
        count: usize,
    },
    DisallowedType {
        commit: usize,
        commit_type: String,
        allowed: Vec<String>,
    },
    EmptyMessage {
        commit: usize,
    },
    MultilineMessage {
        commit: usize,
    },
    MessageTooLong {
        commit: usize,
        length: usize,
        max: usize,
    },
    NoFiles {
        commit: usize,
    },
    UnknownFile {
        commit: usize,
        path: String,
    },
    DuplicateFile {
        path: String,
        first: usize,
        second: usize,
    },
    MissingFile {
        path: String,
    },
    InvalidScope {
        commit: usize,
        scope: String,
        allowed: Vec<String>,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyPlan => write!(f, "plan contains no commits"),
            ValidationIssue::TooManyCommits { count } => write!(
                f,
                "single-commit mode expects exactly one commit, plan has {}",
                count
            ),
            ValidationIssue::DisallowedType {
                commit,
                commit_type,
                allowed,
            } => write!(
                f,
                "commit {}: type '{}' is not allowed (allowed: {})",
                commit,
                commit_type,
                allowed.join(", ")
            ),
            ValidationIssue::EmptyMessage { commit } => {
                write!(f, "commit {}: message is empty", commit)
            }
            ValidationIssue::MultilineMessage { commit } => {
                write!(f, "commit {}: message must be a single line", commit)
            }
            ValidationIssue::MessageTooLong {
                commit,
                length,
                max,
            } => write!(
                f,
                "commit {}: message is {} characters, limit is {}",
                commit, length, max
            ),
            ValidationIssue::NoFiles { commit } => {
                write!(f, "commit {}: lists no files", commit)
            }
            ValidationIssue::UnknownFile { commit, path } => write!(
                f,
                "commit {}: '{}' is not in the set of changed files",
                commit, path
            ),
            ValidationIssue::DuplicateFile {
                path,
                first,
                second,
            } => {
                if first == second {
                    write!(f, "commit {}: '{}' is listed more than once", first, path)
                } else {
                    write!(
                        f,
                        "'{}' appears in both commit {} and commit {}",
                        path, first, second
                    )
                }
            }
            ValidationIssue::MissingFile { path } => {
                write!(f, "'{}' is changed but not covered by any commit", path)
            }
            ValidationIssue::InvalidScope {
                commit,
                scope,
                allowed,
            } => write!(
                f,
                "commit {}: scope '{}' is not configured (allowed: {})",
                commit,
                scope,
                allowed.join(", ")
            ),
        }
    }
}

/// Outcome of [`validate_plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}

impl ValidationReport {
    fn from_errors(errors: Vec<ValidationIssue>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.valid {
            return write!(f, "plan is valid");
        }
        write!(f, "plan failed validation:")?;
        for issue in &self.errors {
            write!(f, "\n  - {}", issue)?;
        }
        Ok(())
    }
}

/// Check `plan` against the working set and repository rules.
///
/// `working_set` is every path the run intends to commit, before sensitive
/// filtering. Sensitive paths are excluded from the expected coverage, so a
/// plan may reference them or leave them out.
pub fn validate_plan(
    plan: &CommitPlan,
    repo_config: &RepoConfig,
    working_set: &[String],
    mode: CommitMode,
) -> ValidationReport {
    let mut errors = Vec::new();

    let known: HashSet<&str> = working_set.iter().map(String::as_str).collect();
    let expected: Vec<&str> = working_set
        .iter()
        .map(String::as_str)
        .filter(|p| !is_sensitive(p))
        .collect();

    // 1. A plan with nothing in it only makes sense when everything is filtered
    if plan.commits.is_empty() && !expected.is_empty() {
        errors.push(ValidationIssue::EmptyPlan);
    }
    if mode == CommitMode::Single && plan.commits.len() > 1 {
        errors.push(ValidationIssue::TooManyCommits {
            count: plan.commits.len(),
        });
    }

    let allowed = allowed_types(repo_config);
    let scope_names = repo_config.scope_names();
    let mut seen: HashMap<&str, usize> = HashMap::new();

    for (i, commit) in plan.commits.iter().enumerate() {
        let n = i + 1;

        // 2. Type legality
        if !allowed.iter().any(|t| t == &commit.commit_type) {
            errors.push(ValidationIssue::DisallowedType {
                commit: n,
                commit_type: commit.commit_type.clone(),
                allowed: allowed.clone(),
            });
        }

        // 3. Message sanity
        let length = commit.message.chars().count();
        if commit.message.trim().is_empty() {
            errors.push(ValidationIssue::EmptyMessage { commit: n });
        } else if commit.message.contains(['\n', '\r']) {
            errors.push(ValidationIssue::MultilineMessage { commit: n });
        }
        if length > MAX_MESSAGE_LENGTH {
            errors.push(ValidationIssue::MessageTooLong {
                commit: n,
                length,
                max: MAX_MESSAGE_LENGTH,
            });
        }

        // 4 & 5. Files exist in the working set, each in one commit
        if commit.files.is_empty() {
            errors.push(ValidationIssue::NoFiles { commit: n });
        }
        for path in &commit.files {
            if !known.contains(path.as_str()) {
                errors.push(ValidationIssue::UnknownFile {
                    commit: n,
                    path: path.clone(),
                });
            }
            match seen.get(path.as_str()) {
                Some(&first) => errors.push(ValidationIssue::DuplicateFile {
                    path: path.clone(),
                    first,
                    second: n,
                }),
                None => {
                    seen.insert(path.as_str(), n);
                }
            }
        }

        // 7. Scope legality
        if repo_config.has_scopes()
            && let Some(scope) = commit.scope()
            && !scope_names.iter().any(|s| s == scope)
        {
            errors.push(ValidationIssue::InvalidScope {
                commit: n,
                scope: scope.to_string(),
                allowed: scope_names.clone(),
            });
        }
    }

    // 6. Coverage of every non-sensitive changed file
    for path in expected {
        if !seen.contains_key(path) {
            errors.push(ValidationIssue::MissingFile {
                path: path.to_string(),
            });
        }
    }

    ValidationReport::from_errors(errors)
}
