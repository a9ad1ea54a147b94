//! Trimming of context lines that no longer sit next to a change.
//!
//! After the scanner drops added lines, a hunk can be left with long runs of
//! context around (or between) its remaining changes. Cropping keeps only the
//! context within `window` lines of a change. When the kept lines fall apart
//! into separate groups, each group becomes its own output hunk.

use crate::diff::{DiffLine, SideCounts};
use std::ops::Range;
use tracing::debug;

/// One output hunk carved out of a scanned hunk body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub lines: Vec<DiffLine>,
    /// Lines of the body before this window, per side
    pub front: SideCounts,
    /// Lines of the body outside this window, per side
    pub cropped: SideCounts,
}

/// Ranges of lines within `window` lines of a change, merged where they touch
fn runs(lines: &[DiffLine], window: usize) -> Vec<Range<usize>> {
    let changes: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.marker.is_change())
        .map(|(i, _)| i)
        .collect();

    let near_change = |i: usize| {
        // First change at or after i, and the one before it
        let next = changes.partition_point(|&c| c < i);
        let after = changes.get(next).is_some_and(|&c| c - i <= window);
        let before = next > 0 && i - changes[next - 1] <= window;
        after || before
    };

    let mut runs: Vec<Range<usize>> = Vec::new();
    for i in (0..lines.len()).filter(|&i| near_change(i)) {
        match runs.last_mut() {
            Some(run) if run.end == i => run.end += 1,
            _ => runs.push(i..i + 1),
        }
    }
    runs
}

/// Drop the added blank lines of every group of changes that adds nothing
/// else. Returns the number of lines dropped.
pub fn drop_blank_only_runs(lines: &mut Vec<DiffLine>, window: usize) -> u32 {
    let mut doomed = vec![false; lines.len()];
    for run in runs(lines, window) {
        let body = &lines[run.clone()];
        if body
            .iter()
            .filter(|line| line.marker.is_change())
            .all(DiffLine::is_added_blank)
        {
            for i in run {
                doomed[i] = lines[i].is_added_blank();
            }
        }
    }

    let before = lines.len();
    let mut doomed = doomed.into_iter();
    lines.retain(|_| !doomed.next().unwrap_or(false));
    (before - lines.len()) as u32
}

/// Split a hunk body into windows of changes with at most `window` lines of
/// context on either side.
///
/// Returns no windows when the body has no changes left.
pub fn crop(lines: &[DiffLine], window: usize) -> Vec<Window> {
    let runs = runs(lines, window);
    if runs.len() > 1 {
        debug!(windows = runs.len(), "split hunk at distant context");
    }

    let total = SideCounts::of(lines);
    runs.into_iter()
        .map(|run| {
            let kept = SideCounts::of(&lines[run.clone()]);
            Window {
                front: SideCounts::of(&lines[..run.start]),
                cropped: SideCounts {
                    old: total.old - kept.old,
                    new: total.new - kept.new,
                },
                lines: lines[run].to_vec(),
            }
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use similar_asserts::assert_eq;

    fn body(text: &str) -> Vec<DiffLine> {
        text.lines().map(|l| DiffLine::parse(l).unwrap()).collect()
    }

    fn rendered(window: &Window) -> String {
        window.lines.iter().map(|l| format!("{l}\n")).collect()
    }

    #[test]
    fn no_changes_no_windows() {
        assert!(crop(&body(" a\n b\n c\n"), 3).is_empty());
        assert!(crop(&[], 3).is_empty());
    }

    #[test]
    fn short_context_is_kept_whole() {
        let lines = body(" a\n b\n-c\n+d\n e\n");
        let windows = crop(&lines, 3);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].lines, lines);
        assert_eq!(windows[0].front, SideCounts::default());
        assert_eq!(windows[0].cropped, SideCounts::default());
    }

    #[test]
    fn leading_context_beyond_window_is_cropped() {
        let windows = crop(&body(" 1\n 2\n 3\n 4\n 5\n+x\n 6\n"), 3);
        assert_eq!(windows.len(), 1);
        assert_eq!(rendered(&windows[0]), " 3\n 4\n 5\n+x\n 6\n");
        assert_eq!(windows[0].front, SideCounts { old: 2, new: 2 });
        assert_eq!(windows[0].cropped, SideCounts { old: 2, new: 2 });
    }

    #[test]
    fn trailing_context_beyond_window_is_cropped() {
        let windows = crop(&body("-x\n 1\n 2\n 3\n 4\n 5\n"), 3);
        assert_eq!(rendered(&windows[0]), "-x\n 1\n 2\n 3\n");
        assert_eq!(windows[0].front, SideCounts::default());
        assert_eq!(windows[0].cropped, SideCounts { old: 2, new: 2 });
    }

    #[test]
    fn distant_changes_split_into_windows() {
        let windows = crop(&body("+a\n 1\n 2\n 3\n 4\n-b\n"), 1);
        assert_eq!(windows.len(), 2);
        assert_eq!(rendered(&windows[0]), "+a\n 1\n");
        assert_eq!(windows[0].front, SideCounts::default());
        assert_eq!(windows[0].cropped, SideCounts { old: 4, new: 3 });
        assert_eq!(rendered(&windows[1]), " 4\n-b\n");
        assert_eq!(windows[1].front, SideCounts { old: 3, new: 4 });
        assert_eq!(windows[1].cropped, SideCounts { old: 3, new: 4 });
    }

    #[test]
    fn touching_windows_stay_together() {
        let lines = body("+a\n 1\n 2\n-b\n");
        let windows = crop(&lines, 1);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].lines, lines);
    }

    #[test]
    fn blank_only_hunk_loses_its_blanks() {
        let mut lines = body(" a\n+\n b\n");
        assert_eq!(drop_blank_only_runs(&mut lines, 3), 1);
        assert_eq!(lines, body(" a\n b\n"));
        assert!(crop(&lines, 3).is_empty());
    }

    #[test]
    fn blank_beside_real_change_is_kept() {
        let mut lines = body(" a\n+\n+real();\n b\n");
        assert_eq!(drop_blank_only_runs(&mut lines, 3), 0);
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn distant_blank_only_group_is_dropped() {
        let mut lines = body("+a();\n 1\n 2\n 3\n+\n 4\n");
        assert_eq!(drop_blank_only_runs(&mut lines, 1), 1);
        let windows = crop(&lines, 1);
        assert_eq!(windows.len(), 1);
        assert_eq!(rendered(&windows[0]), "+a();\n 1\n");
    }

    #[test]
    fn removed_blank_counts_as_real_change() {
        let mut lines = body("-\n+\n");
        assert_eq!(drop_blank_only_runs(&mut lines, 3), 0);
    }

    #[test]
    fn zero_window_keeps_changes_only() {
        let windows = crop(&body(" 1\n+a\n+b\n 2\n"), 0);
        assert_eq!(windows.len(), 1);
        assert_eq!(rendered(&windows[0]), "+a\n+b\n");
        assert_eq!(windows[0].front, SideCounts { old: 1, new: 1 });
    }

    fn arb_line() -> impl Strategy<Value = DiffLine> {
        prop_oneof![
            Just(DiffLine::parse(" ctx").unwrap()),
            Just(DiffLine::parse("-old").unwrap()),
            Just(DiffLine::parse("+new").unwrap()),
        ]
    }

    proptest! {
        #[test]
        fn windows_partition_the_kept_lines(
            lines in prop::collection::vec(arb_line(), 0..40),
            window in 0usize..5,
        ) {
            let total = SideCounts::of(&lines);
            let windows = crop(&lines, window);

            let changes = lines.iter().filter(|l| l.marker.is_change()).count();
            let kept_changes: usize = windows
                .iter()
                .map(|w| w.lines.iter().filter(|l| l.marker.is_change()).count())
                .sum();
            prop_assert_eq!(kept_changes, changes);

            for w in &windows {
                let kept = SideCounts::of(&w.lines);
                prop_assert_eq!(kept.old + w.cropped.old, total.old);
                prop_assert_eq!(kept.new + w.cropped.new, total.new);
                prop_assert!(w.lines.iter().any(|l| l.marker.is_change()));
            }
        }
    }
}
