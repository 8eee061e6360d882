//! Recovering a commit plan from assistant text.
//!
//! Models are asked for bare JSON but often wrap it in a markdown fence or
//! add a sentence around it. Extraction tolerates both.

use serde::Deserialize;
use tracing::debug;

use crate::error::LlmError;
use crate::plan::{CommitPlan, PlannedCommit};

/// Characters of raw output kept in parse errors.
pub const RAW_PREFIX_CHARS: usize = 200;

/// Accepted shapes: the documented object, or a bare array of commits.
#[derive(Deserialize)]
#[serde(untagged)]
enum PlanShape {
    Object(CommitPlan),
    Array(Vec<PlannedCommit>),
}

/// Pull the JSON payload out of assistant text.
///
/// Tries a ```` ```json ```` fence, then a bare fence whose content looks like
/// JSON, then the first balanced `{...}` or `[...]` that parses. Falls back
/// to the trimmed input.
pub fn extract_json(response: &str) -> String {
    let trimmed = response.trim();

    if let Some(inner) = fenced_block(trimmed, "```json") {
        return inner.to_string();
    }
    if let Some(inner) = fenced_block(trimmed, "```")
        && (inner.starts_with('{') || inner.starts_with('['))
    {
        return inner.to_string();
    }

    for (start, ch) in trimmed.char_indices() {
        if ch != '{' && ch != '[' {
            continue;
        }
        if let Some(candidate) = balanced(&trimmed[start..])
            && serde_json::from_str::<serde_json::Value>(candidate).is_ok()
        {
            return candidate.to_string();
        }
    }

    trimmed.to_string()
}

/// Content between `opener` (plus the rest of its line) and the next closing fence.
fn fenced_block<'a>(text: &'a str, opener: &str) -> Option<&'a str> {
    let start = text.find(opener)? + opener.len();
    let rest = &text[start..];
    // Skip a language tag on the opening line
    let body_start = if opener == "```" {
        rest.find('\n').map_or(0, |i| i + 1)
    } else {
        0
    };
    let body = &rest[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Prefix of `text` up to the bracket that closes its first character.
///
/// Brackets inside JSON string literals, including escaped quotes, are ignored.
fn balanced(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=idx]);
                }
            }
            _ => {}
        }
    }

    None
}

/// First [`RAW_PREFIX_CHARS`] characters of `raw`.
pub fn raw_prefix(raw: &str) -> String {
    raw.chars().take(RAW_PREFIX_CHARS).collect()
}

/// Parse assistant text into a [`CommitPlan`].
pub fn parse_plan(provider: &str, raw: &str) -> Result<CommitPlan, LlmError> {
    let json = extract_json(raw);
    debug!("Extracted {} bytes of plan JSON from {}", json.len(), provider);

    match serde_json::from_str::<PlanShape>(&json) {
        Ok(PlanShape::Object(plan)) => Ok(plan),
        Ok(PlanShape::Array(commits)) => Ok(CommitPlan { commits }),
        Err(e) => Err(LlmError::ResponseParse {
            provider: provider.to_string(),
            error: e.to_string(),
            raw_prefix: raw_prefix(raw),
        }),
    }
}
