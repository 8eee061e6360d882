//! Diff text bounding and `--numstat` parsing.

use std::collections::HashMap;

/// Maximum bytes of diff text handed to the LLM.
pub const MAX_DIFF_CHARS: usize = 4000;

/// Appended to diff text that was cut at the limit.
pub const TRUNCATION_MARKER: &str = "\n...(truncated)\n";

/// Line counts for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumStat {
    pub added: usize,
    pub removed: usize,
    /// `true` when git reports `-` counts (binary content).
    pub binary: bool,
}

impl NumStat {
    pub fn new(added: usize, removed: usize) -> Self {
        Self {
            added,
            removed,
            binary: false,
        }
    }

    pub fn binary() -> Self {
        Self {
            added: 0,
            removed: 0,
            binary: true,
        }
    }

    /// `"+A -D"`, or `"binary"` for binary content.
    pub fn summary(&self) -> String {
        if self.binary {
            "binary".to_string()
        } else {
            format!("+{} -{}", self.added, self.removed)
        }
    }
}

/// Bound diff text to `limit` bytes.
///
/// Text at or under the limit is returned unchanged. Longer text is cut at
/// the last char boundary at or before `limit` and suffixed with
/// [`TRUNCATION_MARKER`]. Text that already is such a cut is returned as-is,
/// so applying this twice gives the same result as applying it once.
pub fn truncate_diff(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }

    if let Some(body) = text.strip_suffix(TRUNCATION_MARKER)
        && body.len() <= limit
    {
        return text.to_string();
    }

    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }

    let mut truncated = String::with_capacity(end + TRUNCATION_MARKER.len());
    truncated.push_str(&text[..end]);
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

/// Parse `git diff --numstat -z` output.
///
/// Regular records are `added<TAB>removed<TAB>path`. Renames leave the path
/// empty and follow it with the source and destination as separate
/// NUL-terminated fields; they are keyed by destination.
pub fn parse_numstat(output: &str) -> Result<HashMap<String, NumStat>, String> {
    let mut stats = HashMap::new();
    let mut fields = output.split('\0');

    while let Some(record) = fields.next() {
        let record = record.trim_start_matches('\n');
        if record.is_empty() {
            continue;
        }

        let mut parts = record.splitn(3, '\t');
        let (added, removed, path) = match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(r), Some(p)) => (a, r, p),
            _ => return Err(format!("malformed numstat record '{}'", record)),
        };

        let path = if path.is_empty() {
            let _source = fields.next();
            match fields.next() {
                Some(dest) if !dest.is_empty() => dest.to_string(),
                _ => return Err(format!("rename record '{}' has no destination", record)),
            }
        } else {
            path.to_string()
        };

        let stat = if added == "-" || removed == "-" {
            NumStat::binary()
        } else {
            let added = added
                .parse()
                .map_err(|_| format!("invalid added count '{}' for {}", added, path))?;
            let removed = removed
                .parse()
                .map_err(|_| format!("invalid removed count '{}' for {}", removed, path))?;
            NumStat::new(added, removed)
        };

        stats.insert(path, stat);
    }

    Ok(stats)
}

/// Count lines of a new file for its numstat entry.
///
/// Content containing a NUL byte is treated as binary, matching git.
pub fn numstat_for_new_file(content: &[u8]) -> NumStat {
    if content.contains(&0) {
        return NumStat::binary();
    }
    let text = String::from_utf8_lossy(content);
    NumStat::new(text.lines().count(), 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_diff("small diff", 100), "small diff");
        assert_eq!(truncate_diff("", 0), "");
    }

    #[test]
    fn test_truncate_exact_limit_unchanged() {
        let text = "a".repeat(50);
        assert_eq!(truncate_diff(&text, 50), text);
    }

    #[test]
    fn test_truncate_long_text_adds_marker() {
        let text = "a".repeat(120);
        let truncated = truncate_diff(&text, 100);
        assert!(truncated.starts_with(&"a".repeat(100)));
        assert!(truncated.ends_with(TRUNCATION_MARKER));
        assert_eq!(truncated.len(), 100 + TRUNCATION_MARKER.len());
    }

    #[test]
    fn test_truncate_does_not_split_multibyte() {
        // "é" is two bytes; a limit of 3 lands inside the second one
        let text = "éééé";
        let truncated = truncate_diff(text, 3);
        assert!(truncated.starts_with("é"));
        assert!(!truncated.starts_with("éé"));
        assert!(truncated.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn test_truncate_is_idempotent() {
        let samples = [
            "x".repeat(5000),
            "日本語".repeat(700),
            "short".to_string(),
            format!("{}{}", "y".repeat(4000), TRUNCATION_MARKER),
        ];
        for sample in &samples {
            for limit in [0, 1, 7, 100, 4000] {
                let once = truncate_diff(sample, limit);
                let twice = truncate_diff(&once, limit);
                assert_eq!(once, twice, "not idempotent for limit {}", limit);
            }
        }
    }

    #[test]
    fn test_parse_numstat_regular_records() {
        let output = "3\t1\tsrc/lib.rs\x0010\t0\tREADME.md\x00";
        let stats = parse_numstat(output).unwrap();
        assert_eq!(stats["src/lib.rs"], NumStat::new(3, 1));
        assert_eq!(stats["README.md"].summary(), "+10 -0");
    }

    #[test]
    fn test_parse_numstat_binary() {
        let output = "-\t-\tlogo.png\x00";
        let stats = parse_numstat(output).unwrap();
        assert!(stats["logo.png"].binary);
        assert_eq!(stats["logo.png"].summary(), "binary");
    }

    #[test]
    fn test_parse_numstat_rename_keyed_by_destination() {
        let output = "2\t2\t\x00src/old.rs\x00src/new.rs\x005\t0\tother.rs\x00";
        let stats = parse_numstat(output).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["src/new.rs"], NumStat::new(2, 2));
        assert!(!stats.contains_key("src/old.rs"));
        assert_eq!(stats["other.rs"], NumStat::new(5, 0));
    }

    #[test]
    fn test_parse_numstat_malformed() {
        assert!(parse_numstat("garbage\x00").is_err());
        assert!(parse_numstat("x\t1\tfile\x00").is_err());
    }

    #[test]
    fn test_parse_numstat_empty() {
        assert!(parse_numstat("").unwrap().is_empty());
    }

    #[test]
    fn test_numstat_for_new_file() {
        assert_eq!(numstat_for_new_file(b"one\ntwo\nthree\n"), NumStat::new(3, 0));
        assert!(numstat_for_new_file(&[0u8, 1, 2]).binary);
    }
}
