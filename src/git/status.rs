//! Parsing of `git status --porcelain=v1 -z` output.

use std::collections::HashMap;
use std::fmt;

/// Kind of change a working-tree path carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
            FileStatus::Renamed => "renamed",
        }
    }

    /// Single-letter marker for compact listings.
    pub fn marker(&self) -> char {
        match self {
            FileStatus::Added => 'A',
            FileStatus::Modified => 'M',
            FileStatus::Deleted => 'D',
            FileStatus::Renamed => 'R',
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Working-tree snapshot grouped the way the planner consumes it.
///
/// Every list preserves the order git emitted the entries in. Renames are
/// listed under their destination path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitStatus {
    pub staged: Vec<String>,
    pub modified: Vec<String>,
    pub added: Vec<String>,
    pub deleted: Vec<String>,
    pub renamed: Vec<String>,
    pub untracked: Vec<String>,
    pub all: Vec<String>,
    /// Rename destination -> rename source.
    pub rename_sources: HashMap<String, String>,
}

impl GitStatus {
    /// Parse NUL-separated porcelain v1 output.
    ///
    /// Returns an error describing the first malformed record.
    pub fn parse_porcelain(output: &str) -> Result<Self, String> {
        let mut status = GitStatus::default();
        let mut records = output.split('\0');

        while let Some(record) = records.next() {
            if record.is_empty() {
                continue;
            }
            if record.len() < 4 || !record.is_char_boundary(3) || &record[2..3] != " " {
                return Err(format!("malformed status record '{}'", record));
            }

            let mut codes = record[..2].chars();
            let (x, y) = match (codes.next(), codes.next()) {
                (Some(x), Some(y)) => (x, y),
                _ => return Err(format!("malformed status record '{}'", record)),
            };
            let path = record[3..].to_string();

            if x == '!' {
                continue;
            }

            if x == '?' {
                status.untracked.push(path.clone());
                status.push_all(path);
                continue;
            }

            // Added to the index, then removed from disk: nothing to commit.
            if x == 'A' && y == 'D' {
                continue;
            }

            if x == 'R' || x == 'C' || y == 'R' || y == 'C' {
                let source = records
                    .next()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| format!("rename of '{}' is missing its source path", path))?;
                if x == 'R' || y == 'R' {
                    status.renamed.push(path.clone());
                    status
                        .rename_sources
                        .insert(path.clone(), source.to_string());
                }
            }

            if x != ' ' {
                status.staged.push(path.clone());
            }
            if x == 'A' || x == 'C' {
                status.added.push(path.clone());
            }
            if x == 'D' || y == 'D' {
                status.deleted.push(path.clone());
            }
            if matches!(x, 'M' | 'T' | 'U') || matches!(y, 'M' | 'T' | 'U') {
                status.modified.push(path.clone());
            }

            status.push_all(path);
        }

        Ok(status)
    }

    fn push_all(&mut self, path: String) {
        if !self.all.contains(&path) {
            self.all.push(path);
        }
    }

    /// Change kind for a path in this snapshot. Untracked files count as added.
    pub fn change_kind(&self, path: &str) -> Option<FileStatus> {
        let contains = |list: &[String]| list.iter().any(|p| p == path);

        if contains(&self.renamed) {
            Some(FileStatus::Renamed)
        } else if contains(&self.added) || contains(&self.untracked) {
            Some(FileStatus::Added)
        } else if contains(&self.deleted) {
            Some(FileStatus::Deleted)
        } else if contains(&self.all) {
            Some(FileStatus::Modified)
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty_output() {
        let status = GitStatus::parse_porcelain("").unwrap();
        assert!(status.is_empty());
    }

    #[test]
    fn test_parse_mixed_entries_preserves_order() {
        let output = "M  src/lib.rs\0 M README.md\0A  new.rs\0 D gone.rs\0?? notes.txt\0";
        let status = GitStatus::parse_porcelain(output).unwrap();

        assert_eq!(
            status.all,
            vec!["src/lib.rs", "README.md", "new.rs", "gone.rs", "notes.txt"]
        );
        assert_eq!(status.staged, vec!["src/lib.rs", "new.rs"]);
        assert_eq!(status.modified, vec!["src/lib.rs", "README.md"]);
        assert_eq!(status.added, vec!["new.rs"]);
        assert_eq!(status.deleted, vec!["gone.rs"]);
        assert_eq!(status.untracked, vec!["notes.txt"]);
    }

    #[test]
    fn test_parse_rename_surfaces_destination() {
        let output = "R  src/new_name.rs\0src/old_name.rs\0M  other.rs\0";
        let status = GitStatus::parse_porcelain(output).unwrap();

        assert_eq!(status.renamed, vec!["src/new_name.rs"]);
        assert_eq!(status.all, vec!["src/new_name.rs", "other.rs"]);
        assert_eq!(
            status.rename_sources.get("src/new_name.rs").map(String::as_str),
            Some("src/old_name.rs")
        );
        assert!(!status.all.contains(&"src/old_name.rs".to_string()));
    }

    #[test]
    fn test_parse_staged_and_unstaged_same_path_listed_once() {
        let output = "MM src/main.rs\0";
        let status = GitStatus::parse_porcelain(output).unwrap();
        assert_eq!(status.all, vec!["src/main.rs"]);
        assert_eq!(status.staged, vec!["src/main.rs"]);
        assert_eq!(status.modified, vec!["src/main.rs"]);
    }

    #[test]
    fn test_parse_paths_with_spaces() {
        let output = "?? docs/my notes.md\0";
        let status = GitStatus::parse_porcelain(output).unwrap();
        assert_eq!(status.untracked, vec!["docs/my notes.md"]);
    }

    #[test]
    fn test_parse_skips_ignored() {
        let output = "!! target/\0?? a.txt\0";
        let status = GitStatus::parse_porcelain(output).unwrap();
        assert_eq!(status.all, vec!["a.txt"]);
    }

    #[test]
    fn test_parse_skips_added_then_deleted() {
        let output = "AD tmp.rs\0 M a.txt\0";
        let status = GitStatus::parse_porcelain(output).unwrap();
        assert_eq!(status.all, vec!["a.txt"]);
        assert!(status.staged.is_empty());
        assert!(status.added.is_empty());
        assert!(status.deleted.is_empty());
        assert_eq!(status.change_kind("tmp.rs"), None);
    }

    #[test]
    fn test_parse_malformed_record() {
        let result = GitStatus::parse_porcelain("XYZ\0");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_rename_missing_source() {
        let result = GitStatus::parse_porcelain("R  new.rs");
        assert!(result.unwrap_err().contains("missing its source"));
    }

    #[test]
    fn test_change_kind_lookup() {
        let output = "R  b.rs\0a.rs\0A  c.rs\0?? d.rs\0 D e.rs\0 M f.rs\0";
        let status = GitStatus::parse_porcelain(output).unwrap();

        assert_eq!(status.change_kind("b.rs"), Some(FileStatus::Renamed));
        assert_eq!(status.change_kind("c.rs"), Some(FileStatus::Added));
        assert_eq!(status.change_kind("d.rs"), Some(FileStatus::Added));
        assert_eq!(status.change_kind("e.rs"), Some(FileStatus::Deleted));
        assert_eq!(status.change_kind("f.rs"), Some(FileStatus::Modified));
        assert_eq!(status.change_kind("missing.rs"), None);
    }

    #[test]
    fn test_file_status_display() {
        assert_eq!(FileStatus::Added.to_string(), "added");
        assert_eq!(FileStatus::Modified.to_string(), "modified");
        assert_eq!(FileStatus::Deleted.to_string(), "deleted");
        assert_eq!(FileStatus::Renamed.to_string(), "renamed");
        assert_eq!(FileStatus::Renamed.marker(), 'R');
    }
}
