//! Rebuilding a diff from its scrubbed hunks.

use crate::crop::{crop, drop_blank_only_runs};
use crate::diff::{Deltas, DiffDocument, FileBlock, HeaderError, Hunk};
use crate::rules::RuleSet;
use crate::scan::{Diagnostic, DropTally, scan_hunk};
use std::fmt;
use tracing::{debug, warn};

/// What scrubbing removed, and what needs a human look
#[derive(Debug, Default)]
pub struct ScrubReport {
    pub tally: DropTally,
    pub diagnostics: Vec<Diagnostic>,
    /// Hunks left with no changes
    pub hunks_elided: usize,
    /// Files left with no hunks
    pub files_elided: usize,
}

impl fmt::Display for ScrubReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dropped {} lines ({} debug, {} comment, {} blank), truncated {}, elided {} hunks in {} files",
            self.tally.dropped(),
            self.tally.debug_calls,
            self.tally.comments,
            self.tally.blanks,
            self.tally.truncated,
            self.hunks_elided,
            self.files_elided,
        )
    }
}

/// A scrubbed diff and its report
#[derive(Debug)]
pub struct Scrubbed {
    /// The rewritten diff, without a trailing newline; empty if nothing survived
    pub diff: String,
    pub report: ScrubReport,
}

/// Scrub every hunk of a parsed diff and render what survives.
pub fn scrub_document(document: DiffDocument, rules: &RuleSet) -> Result<Scrubbed, HeaderError> {
    let mut report = ScrubReport::default();
    let mut files = Vec::new();

    for file in document.files {
        if let Some(file) = scrub_file(file, rules, &mut report)? {
            files.push(file);
        }
    }

    let mut diff = DiffDocument { files }.to_string();
    if diff.ends_with('\n') {
        diff.pop();
    }

    Ok(Scrubbed { diff, report })
}

fn scrub_file(
    file: FileBlock,
    rules: &RuleSet,
    report: &mut ScrubReport,
) -> Result<Option<FileBlock>, HeaderError> {
    let kind = rules.file_kind(file.path.as_deref());
    let path = file.path.as_deref().unwrap_or("<unknown>");

    // Added lines dropped from earlier hunks of this file
    let mut file_delta = 0u32;
    let mut hunks = Vec::new();

    for hunk in file.hunks {
        let mut scanned = scan_hunk(hunk.lines, rules, kind);
        let blanks = drop_blank_only_runs(&mut scanned.lines, rules.window());
        scanned.dropped += blanks;
        scanned.tally.blanks += blanks;

        report.tally += scanned.tally;
        for mut diagnostic in scanned.diagnostics {
            diagnostic.path = file.path.clone();
            warn!("{diagnostic}");
            report.diagnostics.push(diagnostic);
        }

        let windows = crop(&scanned.lines, rules.window());
        if windows.is_empty() {
            debug!(path, header = %hunk.header, "hunk elided");
            report.hunks_elided += 1;
        }

        for (n, window) in windows.into_iter().enumerate() {
            let mut header = hunk.header.rebase(&Deltas {
                segment: scanned.dropped,
                file: file_delta,
                front: window.front,
                cropped: window.cropped,
            })?;
            if n > 0 {
                header.clear_section();
            }
            debug!(path, from = %hunk.header, to = %header, "rebased hunk");
            hunks.push(Hunk {
                header,
                lines: window.lines,
            });
        }

        file_delta += scanned.dropped;
    }

    if hunks.is_empty() {
        debug!(path, "file elided");
        report.files_elided += 1;
        return Ok(None);
    }

    Ok(Some(FileBlock { hunks, ..file }))
}
