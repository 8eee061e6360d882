//! Files an automated tool must never commit, whatever the plan says.

use tracing::warn;

use super::CommitPlan;

/// How a [`SENSITIVE_PATTERNS`] entry matches a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitivePattern {
    /// The final path component equals this name.
    Basename(&'static str),
    /// The final path component ends with this suffix (ASCII case-insensitive).
    Suffix(&'static str),
    /// `/` + path contains this fragment.
    Fragment(&'static str),
}

impl SensitivePattern {
    fn matches(&self, rooted: &str, basename: &str) -> bool {
        match self {
            SensitivePattern::Basename(name) => basename == *name,
            SensitivePattern::Suffix(suffix) => {
                basename.len() > suffix.len()
                    && basename
                        .get(basename.len() - suffix.len()..)
                        .is_some_and(|tail| tail.eq_ignore_ascii_case(suffix))
            }
            SensitivePattern::Fragment(fragment) => rooted.contains(fragment),
        }
    }
}

/// Every pattern that marks a file as sensitive.
pub const SENSITIVE_PATTERNS: &[SensitivePattern] = &[
    SensitivePattern::Basename(".env"),
    SensitivePattern::Basename(".env.local"),
    SensitivePattern::Basename(".env.production"),
    SensitivePattern::Suffix(".key"),
    SensitivePattern::Suffix(".pem"),
    SensitivePattern::Suffix(".p12"),
    SensitivePattern::Basename("id_rsa"),
    SensitivePattern::Basename("id_dsa"),
    SensitivePattern::Basename("id_ecdsa"),
    SensitivePattern::Basename("id_ed25519"),
    SensitivePattern::Basename("credentials"),
    SensitivePattern::Basename("secrets.yaml"),
    SensitivePattern::Basename("secrets.yml"),
    SensitivePattern::Basename("secret.json"),
    SensitivePattern::Fragment("/.ssh/"),
    SensitivePattern::Fragment("/.aws/credentials"),
];

/// Whether `path` matches any of [`SENSITIVE_PATTERNS`].
pub fn is_sensitive(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    let rooted = format!("/{}", normalized.trim_start_matches('/'));
    let basename = normalized.rsplit('/').next().unwrap_or(&normalized);

    SENSITIVE_PATTERNS
        .iter()
        .any(|pattern| pattern.matches(&rooted, basename))
}

/// Remove sensitive files from every commit in `plan`.
///
/// Commits left without files are dropped. Returns the removed paths in plan
/// order.
pub fn filter_sensitive_files(plan: &mut CommitPlan) -> Vec<String> {
    let mut removed = Vec::new();

    for commit in &mut plan.commits {
        let (sensitive, kept): (Vec<String>, Vec<String>) =
            commit.files.drain(..).partition(|f| is_sensitive(f));
        commit.files = kept;
        removed.extend(sensitive);
    }

    plan.commits.retain(|c| !c.files.is_empty());

    for path in &removed {
        warn!("Excluding sensitive file from commits: {}", path);
    }

    removed
}
