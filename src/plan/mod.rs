//! Commit plans: the provider's proposal, its validation, filtering,
//! execution and the reverse operation.

pub mod execute;
pub mod reverse;
pub mod sensitive;
pub mod validate;

use serde::{Deserialize, Serialize};

pub use execute::Executor;
pub use reverse::reverse;
pub use sensitive::{SENSITIVE_PATTERNS, filter_sensitive_files, is_sensitive};
pub use validate::{ValidationIssue, ValidationReport, validate_plan};

/// One proposed commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedCommit {
    /// Conventional Commits type (`feat`, `fix`, ...).
    #[serde(rename = "type")]
    pub commit_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    /// Subject text after `type(scope): `.
    pub message: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl PlannedCommit {
    /// Scope with surrounding whitespace removed, or `None` when blank.
    pub fn scope(&self) -> Option<&str> {
        self.scope
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// `type(scope): message`, or `type: message` without a scope.
    pub fn subject(&self) -> String {
        match self.scope() {
            Some(scope) => format!("{}({}): {}", self.commit_type, scope, self.message),
            None => format!("{}: {}", self.commit_type, self.message),
        }
    }

    /// Full commit message: subject, then a blank line and the body if present.
    pub fn full_message(&self) -> String {
        let mut parts = vec![self.subject()];

        if let Some(body) = self.body.as_deref().map(str::trim)
            && !body.is_empty()
        {
            parts.push(String::new());
            parts.push(body.to_string());
        }

        parts.join("\n")
    }
}

/// Ordered commits proposed by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitPlan {
    pub commits: Vec<PlannedCommit>,
}

impl CommitPlan {
    /// Every file referenced by the plan, in plan order, repeats included.
    pub fn referenced_files(&self) -> impl Iterator<Item = &str> {
        self.commits
            .iter()
            .flat_map(|c| c.files.iter().map(String::as_str))
    }
}

/// A planned commit together with the hash git assigned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedCommit {
    pub commit: PlannedCommit,
    /// Empty in dry-run mode.
    pub hash: String,
}

impl ExecutedCommit {
    /// First seven characters of the hash.
    pub fn short_hash(&self) -> &str {
        let end = self
            .hash
            .char_indices()
            .nth(7)
            .map_or(self.hash.len(), |(i, _)| i);
        &self.hash[..end]
    }
}

#[cfg(test)]
pub(crate) fn planned(
    commit_type: &str,
    scope: Option<&str>,
    message: &str,
    files: &[&str],
) -> PlannedCommit {
    PlannedCommit {
        commit_type: commit_type.to_string(),
        scope: scope.map(str::to_string),
        message: message.to_string(),
        files: files.iter().map(|f| f.to_string()).collect(),
        body: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_with_and_without_scope() {
        assert_eq!(
            planned("feat", Some("api"), "add handler endpoint", &["h.go"]).subject(),
            "feat(api): add handler endpoint"
        );
        assert_eq!(
            planned("chore", None, "add configuration", &["c.yaml"]).subject(),
            "chore: add configuration"
        );
        assert_eq!(
            planned("fix", Some("  "), "blank scope", &["a"]).subject(),
            "fix: blank scope"
        );
    }

    #[test]
    fn test_full_message_includes_body_after_blank_line() {
        let mut commit = planned("fix", Some("parser"), "handle empty input", &["p.rs"]);
        assert_eq!(commit.full_message(), "fix(parser): handle empty input");

        commit.body = Some("  Empty input used to panic.\nNow it returns an error.\n".to_string());
        assert_eq!(
            commit.full_message(),
            "fix(parser): handle empty input\n\nEmpty input used to panic.\nNow it returns an error."
        );

        commit.body = Some("   ".to_string());
        assert_eq!(commit.full_message(), "fix(parser): handle empty input");
    }

    #[test]
    fn test_deserialize_wire_format() {
        let json = r#"{"commits": [
            {"type": "feat", "scope": "api", "message": "add endpoint", "files": ["a.go"], "body": "why"},
            {"type": "chore", "message": "tidy", "files": ["b.go"]}
        ]}"#;
        let plan: CommitPlan = serde_json::from_str(json).unwrap();

        assert_eq!(plan.commits.len(), 2);
        assert_eq!(plan.commits[0].commit_type, "feat");
        assert_eq!(plan.commits[0].body.as_deref(), Some("why"));
        assert_eq!(plan.commits[1].scope, None);
        assert_eq!(plan.referenced_files().collect::<Vec<_>>(), vec!["a.go", "b.go"]);
    }

    #[test]
    fn test_short_hash() {
        let executed = ExecutedCommit {
            commit: planned("feat", None, "x", &["a"]),
            hash: "0123456789abcdef".to_string(),
        };
        assert_eq!(executed.short_hash(), "0123456");

        let dry = ExecutedCommit {
            commit: planned("feat", None, "x", &["a"]),
            hash: String::new(),
        };
        assert_eq!(dry.short_hash(), "");
    }
}
