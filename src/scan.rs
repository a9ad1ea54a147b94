//! Keep/drop decisions for the lines of one hunk body.
//!
//! The scanner walks a hunk once, left to right. Multi-line debug calls and
//! block comments are tracked in a `ScanState` that starts fresh for every
//! hunk, so nothing leaks from one hunk into the next.

use crate::diff::line::DiffLine;
use crate::rules::{Category, FileKind, RuleSet};
use std::fmt;
use std::ops::AddAssign;
use tracing::trace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    InsideCall,
    InsideBlockComment,
}

/// Transient state of one hunk scan
#[derive(Debug, Default)]
struct ScanState {
    mode: Mode,
    /// The line just before the current one was dropped
    previous_dropped: bool,
}

#[derive(Debug, Clone, Copy)]
enum DropReason {
    DebugCall,
    Comment,
    Blank,
}

/// Added lines dropped, by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DropTally {
    /// Lines belonging to debug calls (every line of a multi-line call)
    pub debug_calls: u32,
    /// Comment lines, line or block
    pub comments: u32,
    /// Blank lines
    pub blanks: u32,
    /// Lines kept with a trailing comment cut off
    pub truncated: u32,
}

impl DropTally {
    /// Lines dropped for any reason
    pub fn dropped(&self) -> u32 {
        self.debug_calls + self.comments + self.blanks
    }

    fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::DebugCall => self.debug_calls += 1,
            DropReason::Comment => self.comments += 1,
            DropReason::Blank => self.blanks += 1,
        }
    }
}

impl AddAssign for DropTally {
    fn add_assign(&mut self, other: Self) {
        self.debug_calls += other.debug_calls;
        self.comments += other.comments;
        self.blanks += other.blanks;
        self.truncated += other.truncated;
    }
}

/// Kind of advisory finding raised while scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A dropped debug call was the whole body of a brace-less `if`/`for`/...
    HeadlessControl,
    /// A debug call shares its line with other statements and was kept
    ConcatenatedCall,
}

/// An advisory finding for human review. Never stops processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// File the finding is in, once known
    pub path: Option<String>,
    /// The offending diff lines, with their markers
    pub lines: Vec<String>,
}

impl Diagnostic {
    fn new(kind: DiagnosticKind, lines: &[&DiffLine]) -> Self {
        Self {
            kind,
            path: None,
            lines: lines
                .iter()
                .map(|line| line.to_string().trim_end().to_string())
                .collect(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{path}: ")?;
        }
        match self.kind {
            DiagnosticKind::HeadlessControl => write!(
                f,
                "debug call removed from a brace-less control statement"
            )?,
            DiagnosticKind::ConcatenatedCall => {
                write!(f, "debug call shares its line with other code, kept")?
            }
        }
        for line in &self.lines {
            write!(f, "\n    {line}")?;
        }
        Ok(())
    }
}

/// Outcome of scanning one hunk body
#[derive(Debug, Default)]
pub struct Scanned {
    /// Surviving lines, in order
    pub lines: Vec<DiffLine>,
    /// Number of added lines dropped (the hunk's segment delta)
    pub dropped: u32,
    pub tally: DropTally,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scan one hunk body, dropping noise among its added lines.
///
/// Removed and context lines are always kept. A removed or context line met
/// inside an open debug call or block comment closes it.
pub fn scan_hunk(lines: Vec<DiffLine>, rules: &RuleSet, kind: FileKind) -> Scanned {
    let mut state = ScanState::default();
    let mut scanned = Scanned::default();

    for mut line in lines {
        let mut category = match state.mode {
            Mode::Normal => rules.classify(&line, kind),
            Mode::InsideCall => rules.classify_in_call(&line),
            Mode::InsideBlockComment => rules.classify_in_block_comment(&line),
        };

        // Code after a closing `*/` survives the comment it ends
        if category == Category::BlockCommentEnd
            && let Some(code) = rules.code_after_comment_end(&line.content)
        {
            line.content = code.to_string();
            scanned.tally.truncated += 1;
            state.mode = Mode::Normal;
            category = rules.classify(&line, kind);
        }

        if category == Category::TrailingComment {
            line.content = rules.strip_trailing_comment(&line.content).to_string();
            scanned.tally.truncated += 1;
            category = rules.classify(&line, kind);
        }

        trace!(?category, mode = ?state.mode, line = %line, "classified");

        let verdict = match category {
            Category::Context | Category::Removed => {
                state.mode = Mode::Normal;
                None
            }
            Category::AddedBlank => {
                let duplicate = scanned.lines.last().is_some_and(DiffLine::is_added_blank);
                (duplicate || state.previous_dropped).then_some(DropReason::Blank)
            }
            Category::LineComment | Category::BlockComment => Some(DropReason::Comment),
            Category::BlockCommentStart => {
                state.mode = Mode::InsideBlockComment;
                Some(DropReason::Comment)
            }
            Category::BlockCommentContinue => Some(DropReason::Comment),
            Category::BlockCommentEnd => {
                state.mode = Mode::Normal;
                Some(DropReason::Comment)
            }
            Category::DebugCall | Category::DebugCallStart => {
                if let Some(previous) = scanned.lines.last()
                    && rules.is_headless_control(previous)
                {
                    scanned.diagnostics.push(Diagnostic::new(
                        DiagnosticKind::HeadlessControl,
                        &[previous, &line],
                    ));
                }
                if category == Category::DebugCallStart {
                    state.mode = Mode::InsideCall;
                }
                Some(DropReason::DebugCall)
            }
            Category::DebugCallContinue => Some(DropReason::DebugCall),
            Category::DebugCallEnd => {
                state.mode = Mode::Normal;
                Some(DropReason::DebugCall)
            }
            Category::ConcatenatedDebugCall => {
                scanned
                    .diagnostics
                    .push(Diagnostic::new(DiagnosticKind::ConcatenatedCall, &[&line]));
                None
            }
            Category::Code | Category::TrailingComment => None,
        };

        match verdict {
            Some(reason) => {
                scanned.tally.record(reason);
                scanned.dropped += 1;
                state.previous_dropped = true;
            }
            None => {
                scanned.lines.push(line);
                state.previous_dropped = false;
            }
        }
    }

    scanned
}
