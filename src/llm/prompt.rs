//! Prompt construction shared by every provider.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::context::{AnalysisRequest, FileChange};

/// ANSI CSI escape sequences (colors, cursor movement).
static ANSI_ESCAPE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").ok());

/// C0 control characters other than tab and newline, plus DEL.
static CONTROL_CHARS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[\x00-\x08\x0b-\x1f\x7f]").ok());

/// Conventional Commits types with a one-line meaning each.
const TYPE_GLOSSARY: &[(&str, &str)] = &[
    ("feat", "a new user-visible capability"),
    ("fix", "a bug fix"),
    ("docs", "documentation only"),
    ("style", "formatting with no behavior change"),
    ("refactor", "restructuring with no behavior change"),
    ("test", "adding or fixing tests"),
    ("chore", "maintenance, tooling, housekeeping"),
    ("perf", "a performance improvement"),
    ("ci", "continuous integration configuration"),
    ("build", "build system or dependencies"),
    ("revert", "reverting an earlier commit"),
];

/// Strip terminal escapes and control characters from diff text.
///
/// Triple backticks are rewritten so the diff cannot close the fenced block
/// it is placed in.
pub fn sanitize_diff(text: &str) -> String {
    let mut result = text.replace("\r\n", "\n");

    if let Some(re) = ANSI_ESCAPE.as_ref() {
        result = re.replace_all(&result, "").into_owned();
    }
    if let Some(re) = CONTROL_CHARS.as_ref() {
        result = re.replace_all(&result, "").into_owned();
    }

    result.replace("```", "'''")
}

/// The system prompt: role, vocabulary, hard rules and output contract.
pub fn system_prompt(request: &AnalysisRequest) -> String {
    let rules = &request.rules;

    let vocabulary: String = rules
        .types
        .iter()
        .map(|t| {
            let meaning = TYPE_GLOSSARY
                .iter()
                .find(|(name, _)| *name == t.as_str())
                .map_or("project-specific type", |(_, meaning)| *meaning);
            format!("- {}: {}\n", t, meaning)
        })
        .collect();

    let scope_rule = if request.has_scopes {
        format!(
            "- `scope` must be one of: {}. Use the scope listed next to each file. Omit it when files span several scopes.",
            request.scope_names.join(", ")
        )
    } else {
        "- `scope` is optional; when used, name the module or area affected in one short lowercase word."
            .to_string()
    };

    let split_rule = if rules.single_commit {
        "- Produce EXACTLY ONE commit that lists every file."
    } else {
        "- Split the changes into the smallest set of commits where each commit is one coherent change. Order commits so foundational changes come first."
    };

    format!(
        r#"You are an experienced engineer turning uncommitted changes into Conventional Commits.

## Allowed commit types
{vocabulary}
## Rules (STRICT)
- `type` must be one of: {types}.
{scope_rule}
- `message` is the subject text after "type(scope): ". Imperative mood, lowercase start, no trailing period, a single line of at most {max} characters.
- `body` is optional. When present, explain WHY the change was made, wrapped at 72 characters.
- Every listed file must appear in exactly one commit. Do not invent paths; copy them exactly as listed.
{split_rule}
- Grouping test: {behavioral_test}

## Output format
Reply with ONLY a JSON object with a single key "commits", an array of objects with keys "type", "scope" (optional), "message", "body" (optional) and "files". No markdown, no explanation.
{{"commits": [{{"type": "feat", "scope": "api", "message": "add health endpoint", "body": "Load balancers need a cheap liveness probe.", "files": ["src/api/health.rs"]}}]}}"#,
        types = rules.types.join(", "),
        max = rules.max_message_length,
        behavioral_test = rules.behavioral_test,
    )
}

/// The user prompt: file listing, diff and recent subjects.
pub fn user_prompt(request: &AnalysisRequest) -> String {
    let files: String = request.files.iter().map(file_line).collect();

    let recent = if request.recent_commits.is_empty() {
        "(none)\n".to_string()
    } else {
        request
            .recent_commits
            .iter()
            .map(|s| format!("- {}\n", s))
            .collect()
    };

    format!(
        "## Changed files ({count})\n{files}\n## Diff\n```diff\n{diff}\n```\n\n## Recent commit subjects (match their style)\n{recent}",
        count = request.files.len(),
        diff = sanitize_diff(&request.diff).trim_end(),
    )
}

/// `status path [scope] [+A -D]`, one per line.
fn file_line(file: &FileChange) -> String {
    let mut line = format!("- {} {}", file.status, file.path);
    if let Some(old) = &file.old_path {
        line.push_str(&format!(" (from {})", old));
    }
    if !file.scope.is_empty() {
        line.push_str(&format!(" [{}]", file.scope));
    }
    if let Some(summary) = &file.diff_summary {
        line.push_str(&format!(" {}", summary));
    }
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Rules;
    use crate::git::FileStatus;

    fn request() -> AnalysisRequest {
        AnalysisRequest {
            files: vec![
                FileChange {
                    path: "src/api/handler.go".to_string(),
                    status: FileStatus::Added,
                    scope: "api".to_string(),
                    diff_summary: Some("+12 -0".to_string()),
                    old_path: None,
                },
                FileChange {
                    path: "docs/guide.md".to_string(),
                    status: FileStatus::Renamed,
                    scope: String::new(),
                    diff_summary: None,
                    old_path: Some("docs/old.md".to_string()),
                },
            ],
            diff: "+package api\n".to_string(),
            recent_commits: vec!["fix(db): close pool on shutdown".to_string()],
            has_scopes: true,
            scope_names: vec!["api".to_string(), "repo".to_string()],
            rules: Rules {
                types: vec!["feat".to_string(), "fix".to_string(), "wip".to_string()],
                max_message_length: 50,
                behavioral_test: "Keep behavior changes together.".to_string(),
                single_commit: false,
            },
        }
    }

    #[test]
    fn test_system_prompt_states_rules_and_contract() {
        let prompt = system_prompt(&request());
        assert!(prompt.contains("- feat: a new user-visible capability"));
        assert!(prompt.contains("- wip: project-specific type"));
        assert!(prompt.contains("must be one of: feat, fix, wip"));
        assert!(prompt.contains("at most 50 characters"));
        assert!(prompt.contains("must be one of: api, repo"));
        assert!(prompt.contains("Keep behavior changes together."));
        assert!(prompt.contains(r#"single key "commits""#));
        assert!(!prompt.contains("EXACTLY ONE"));
    }

    #[test]
    fn test_system_prompt_single_mode() {
        let mut req = request();
        req.rules.single_commit = true;
        req.has_scopes = false;
        let prompt = system_prompt(&req);
        assert!(prompt.contains("EXACTLY ONE commit"));
        assert!(prompt.contains("`scope` is optional"));
    }

    #[test]
    fn test_user_prompt_lists_files_diff_and_history() {
        let prompt = user_prompt(&request());
        assert!(prompt.contains("## Changed files (2)"));
        assert!(prompt.contains("- added src/api/handler.go [api] +12 -0"));
        assert!(prompt.contains("- renamed docs/guide.md (from docs/old.md)\n"));
        assert!(prompt.contains("```diff\n+package api\n```"));
        assert!(prompt.contains("- fix(db): close pool on shutdown"));
    }

    #[test]
    fn test_user_prompt_without_history() {
        let mut req = request();
        req.recent_commits.clear();
        assert!(user_prompt(&req).contains("(none)"));
    }

    #[test]
    fn test_sanitize_removes_ansi_and_control_chars() {
        let dirty = "\x1b[31m-old\x1b[0m\r\n+new\x07\tline\x00\n";
        assert_eq!(sanitize_diff(dirty), "-old\n+new\tline\n");
    }

    #[test]
    fn test_sanitize_neutralizes_fences() {
        let diff = "+```rust\n+fn main() {}\n+```\n";
        let clean = sanitize_diff(diff);
        assert!(!clean.contains("```"));
        assert!(clean.contains("'''rust"));
    }

    #[test]
    fn test_sanitize_keeps_unicode() {
        assert_eq!(sanitize_diff("+héllo 日本\n"), "+héllo 日本\n");
    }
}
