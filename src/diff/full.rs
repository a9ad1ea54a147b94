use super::ParseError;
use super::file::FileBlock;
use super::hunk::{HunkHeader, SideCounts};
use super::line::DiffLine;
use std::fmt;
use tracing::debug;

/// A complete diff containing changes for multiple files
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiffDocument {
    pub files: Vec<FileBlock>,
}

impl DiffDocument {
    /// Parse a complete diff into file blocks.
    ///
    /// Files start at `diff --git ` lines. Input without any such line is
    /// treated as plain `diff -u` output, where a file starts at a `--- `
    /// line directly followed by a `+++ ` line outside any hunk body. Text
    /// before the first file (commit messages, mail headers) is not part of
    /// the document. Line endings are kept, `\r` included.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let lines: Vec<&str> = text
            .split_inclusive('\n')
            .map(|line| line.strip_suffix('\n').unwrap_or(line))
            .collect();

        let starts: Vec<usize> = if lines.iter().any(|line| line.starts_with("diff --git ")) {
            (0..lines.len())
                .filter(|&i| lines[i].starts_with("diff --git "))
                .collect()
        } else {
            plain_file_starts(&lines)
        };

        if let Some(&first) = starts.first()
            && first > 0
        {
            debug!(lines = first, "skipping text before first file");
        }

        let files = starts
            .iter()
            .enumerate()
            .map(|(n, &start)| {
                let end = starts.get(n + 1).copied().unwrap_or(lines.len());
                FileBlock::parse(&lines[start..end])
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(DiffDocument { files })
    }
}

/// File starts in plain `diff -u` output.
///
/// Hunk bodies are skipped by their header counts, so removed `-- x` and
/// added `++ y` lines are never taken for a new file.
fn plain_file_starts(lines: &[&str]) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut remaining = SideCounts::default();

    for (i, line) in lines.iter().enumerate() {
        if remaining != SideCounts::default() {
            if line.starts_with('\\') {
                continue;
            }
            match DiffLine::parse(line) {
                Some(body) => {
                    remaining = remaining.after(body.marker);
                    continue;
                }
                // Malformed body, reported when the hunk is parsed
                None => remaining = SideCounts::default(),
            }
        }

        if line.starts_with("--- ")
            && lines.get(i + 1).is_some_and(|next| next.starts_with("+++ "))
        {
            starts.push(i);
        } else if let Ok(header) = HunkHeader::parse(line) {
            remaining = SideCounts::expected(&header);
        }
    }

    starts
}

impl fmt::Display for DiffDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for file in &self.files {
            write!(f, "{}", file)?;
        }
        Ok(())
    }
}
