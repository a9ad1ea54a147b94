use super::hunk::Hunk;
use super::ParseError;
use std::fmt;

/// The diff of a single file: its preamble and hunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlock {
    /// Lines before the first hunk (`diff --git`, `index`, `---`, `+++`, ...),
    /// each ending in a newline
    pub preamble: String,
    /// Path of the patched file, if the preamble names one
    pub path: Option<String>,
    /// All hunks for this file
    pub hunks: Vec<Hunk>,
}

impl FileBlock {
    /// Parse the lines of one file block.
    ///
    /// Everything up to the first `@@ ` line is preamble. A block with no
    /// hunks (mode change, binary file) parses with an empty hunk list.
    pub fn parse(lines: &[&str]) -> Result<Self, ParseError> {
        let first_hunk = lines
            .iter()
            .position(|line| line.starts_with("@@ "))
            .unwrap_or(lines.len());

        let preamble: String = lines[..first_hunk]
            .iter()
            .map(|line| format!("{line}\n"))
            .collect();

        // Hunk header positions, relative to the whole block
        let starts: Vec<usize> = (first_hunk..lines.len())
            .filter(|&i| lines[i].starts_with("@@ "))
            .collect();

        let hunks = starts
            .iter()
            .enumerate()
            .map(|(n, &start)| {
                let end = starts.get(n + 1).copied().unwrap_or(lines.len());
                Hunk::parse(lines[start], lines[start + 1..end].iter().copied())
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FileBlock {
            path: target_path(&lines[..first_hunk]),
            preamble,
            hunks,
        })
    }
}

/// Extract the patched file's path from a preamble.
///
/// Prefers the new name (`+++ b/path`), falls back to the old name for
/// deletions, then to the `diff --git` line.
fn target_path(preamble: &[&str]) -> Option<String> {
    let from_marker = |prefix: &str| {
        preamble
            .iter()
            .find_map(|line| line.strip_prefix(prefix))
            .map(strip_timestamp)
            .filter(|path| *path != "/dev/null" && !path.is_empty())
            .map(strip_side_prefix)
    };

    from_marker("+++ ")
        .or_else(|| from_marker("--- "))
        .or_else(|| {
            preamble
                .iter()
                .find_map(|line| line.strip_prefix("diff --git "))
                .and_then(|rest| rest.rsplit_once(" b/"))
                .map(|(_, path)| path.trim_end())
        })
        .map(str::to_string)
}

/// `diff -u` appends a tab and timestamp to file names.
fn strip_timestamp(name: &str) -> &str {
    name.split('\t').next().unwrap_or(name).trim_end()
}

fn strip_side_prefix(path: &str) -> &str {
    path.strip_prefix("a/")
        .or_else(|| path.strip_prefix("b/"))
        .unwrap_or(path)
}

impl fmt::Display for FileBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.preamble)?;
        for hunk in &self.hunks {
            write!(f, "{}", hunk)?;
        }
        Ok(())
    }
}
