//! Monorepo scope resolution by longest path-prefix match.

use crate::config::RepoConfig;

/// Resolve the scope for a repo-relative path.
///
/// Backslashes in `path` are treated as separators. Relies on
/// [`RepoConfig::scopes`] being sorted longest prefix first, so the first
/// match wins. Falls back to the default scope, then to the empty string.
pub fn resolve_scope(path: &str, config: Option<&RepoConfig>) -> String {
    let Some(config) = config else {
        return String::new();
    };

    let normalized = path.replace('\\', "/");

    config
        .scopes
        .iter()
        .find(|rule| normalized.starts_with(&rule.path_prefix))
        .map(|rule| rule.scope.clone())
        .or_else(|| config.default_scope.clone())
        .unwrap_or_default()
}
