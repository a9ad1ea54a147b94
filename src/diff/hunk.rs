use super::ParseError;
use super::line::{DiffLine, Marker};
use error_set::error_set;
use nom::{
    IResult, Parser,
    bytes::complete::tag,
    character::complete::{char, u32 as number},
    combinator::opt,
    sequence::{delimited, preceded},
};
use std::fmt;
use tracing::debug;

/// Separator `git format-patch` writes before its signature.
const MAIL_SIGNATURE: &str = "-- ";

error_set! {
    /// Errors from rewriting a hunk header
    HeaderError := {
        /// Applying the deltas would push a start or count out of range
        #[display("Cannot rebase hunk '{header}': {side} side out of range")]
        OutOfRange { header: String, side: String },
    }
}

/// One side of a hunk header: `start[,count]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HunkRange {
    pub start: u32,
    /// `None` when the header omits the count, which means 1
    pub count: Option<u32>,
}

impl HunkRange {
    pub fn new(start: u32, count: u32) -> Self {
        Self {
            start,
            count: Some(count),
        }
    }

    /// Number of lines in the range
    pub fn len(&self) -> u32 {
        self.count.unwrap_or(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for HunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.len() {
            1 => write!(f, "{}", self.start),
            n => write!(f, "{},{}", self.start, n),
        }
    }
}

/// Per-side line counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideCounts {
    pub old: u32,
    pub new: u32,
}

impl SideCounts {
    /// Count the old-side and new-side lines of a hunk body
    pub fn of(lines: &[DiffLine]) -> Self {
        lines.iter().fold(Self::default(), |counts, line| Self {
            old: counts.old + u32::from(line.marker.on_old_side()),
            new: counts.new + u32::from(line.marker.on_new_side()),
        })
    }

    /// The counts a header announces for its body
    pub fn expected(header: &HunkHeader) -> Self {
        Self {
            old: header.old.len(),
            new: header.new.len(),
        }
    }

    /// Counts still expected once a line with `marker` has been read
    pub fn after(self, marker: Marker) -> Self {
        Self {
            old: self.old.saturating_sub(u32::from(marker.on_old_side())),
            new: self.new.saturating_sub(u32::from(marker.on_new_side())),
        }
    }
}

/// Line-count changes applied to one output hunk.
///
/// `front` and `cropped` are zero for a hunk that was not cropped; the
/// header then only moves by `segment` and `file`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deltas {
    /// Added lines dropped from this hunk
    pub segment: u32,
    /// Added lines dropped from earlier hunks of the same file
    pub file: u32,
    /// Lines cropped ahead of the output hunk
    pub front: SideCounts,
    /// Lines of the hunk left outside the output hunk
    pub cropped: SideCounts,
}

/// Parsed `@@ -a[,b] +c[,d] @@ heading` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkHeader {
    pub old: HunkRange,
    pub new: HunkRange,
    /// Everything after the closing `@@`, verbatim (usually ` fn_name()`)
    pub section: String,
}

impl HunkHeader {
    /// Parse a hunk header line.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let (section, (old, new)) = header_line(line).map_err(|_| ParseError::InvalidHunkHeader {
            line: line.to_string(),
        })?;

        Ok(Self {
            old,
            new,
            section: section.to_string(),
        })
    }

    /// Compute the header of an output hunk from this (input) header.
    ///
    /// The old side only moves by cropping; dropped added lines live on the
    /// new side. A side that becomes empty points at the line before, as
    /// `git diff` does for empty ranges.
    pub fn rebase(&self, deltas: &Deltas) -> Result<Self, HeaderError> {
        let out_of_range = |side: &str| HeaderError::OutOfRange {
            header: self.to_string(),
            side: side.to_string(),
        };

        let mut old_start = self
            .old
            .start
            .checked_add(deltas.front.old)
            .ok_or_else(|| out_of_range("old"))?;
        let old_count = self
            .old
            .len()
            .checked_sub(deltas.cropped.old)
            .ok_or_else(|| out_of_range("old"))?;

        let mut new_start = self
            .new
            .start
            .checked_sub(deltas.file)
            .and_then(|start| start.checked_add(deltas.front.new))
            .ok_or_else(|| out_of_range("new"))?;
        let new_count = self
            .new
            .len()
            .checked_sub(deltas.segment)
            .and_then(|count| count.checked_sub(deltas.cropped.new))
            .ok_or_else(|| out_of_range("new"))?;

        if old_count == 0 && !self.old.is_empty() {
            old_start = old_start.checked_sub(1).ok_or_else(|| out_of_range("old"))?;
        }
        if new_count == 0 && !self.new.is_empty() {
            new_start = new_start.checked_sub(1).ok_or_else(|| out_of_range("new"))?;
        }

        Ok(Self {
            old: HunkRange::new(old_start, old_count),
            new: HunkRange::new(new_start, new_count),
            section: self.section.clone(),
        })
    }

    /// Drop the section heading, keeping a `\r` line ending if there is one.
    pub fn clear_section(&mut self) {
        let carriage_return = self.section.ends_with('\r');
        self.section.clear();
        if carriage_return {
            self.section.push('\r');
        }
    }
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@@ -{} +{} @@{}", self.old, self.new, self.section)
    }
}

fn range(input: &str) -> IResult<&str, HunkRange> {
    (number, opt(preceded(char(','), number)))
        .map(|(start, count)| HunkRange { start, count })
        .parse(input)
}

fn header_line(input: &str) -> IResult<&str, (HunkRange, HunkRange)> {
    (
        delimited(tag("@@ -"), range, char(' ')),
        delimited(char('+'), range, tag(" @@")),
    )
        .parse(input)
}

/// A single hunk: header plus body lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub header: HunkHeader,
    pub lines: Vec<DiffLine>,
}

impl Hunk {
    /// Parse a hunk from its header line and the body lines that follow it.
    ///
    /// Once the body holds the lines its header announces, a mail signature
    /// (`-- `) or any line that is not a body line ends the hunk; the rest is
    /// trailer. Empty lines past the end of the counted body (separators some
    /// tools append between files) are not part of the hunk either.
    pub fn parse<'a, I>(header_text: &str, body: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let header = HunkHeader::parse(header_text)?;
        let mut lines: Vec<DiffLine> = Vec::new();
        let mut remaining = SideCounts::expected(&header);
        let mut trailing_empty = 0usize;

        for raw in body {
            if raw.starts_with('\\') {
                // Applies to whichever line came last
                if let Some(last) = lines.last_mut() {
                    last.missing_final_newline = true;
                }
                continue;
            }

            let line = DiffLine::parse(raw);
            if remaining == SideCounts::default()
                && (raw.trim_end_matches('\r') == MAIL_SIGNATURE || line.is_none())
            {
                debug!(header = %header, "ignoring text after hunk body");
                break;
            }

            let line = line.ok_or_else(|| ParseError::UnexpectedBodyLine {
                line: raw.to_string(),
            })?;
            remaining = remaining.after(line.marker);
            trailing_empty = if raw.trim_end_matches('\r').is_empty() {
                trailing_empty + 1
            } else {
                0
            };
            lines.push(line);
        }

        let old_seen = lines.iter().filter(|l| l.marker.on_old_side()).count();
        let new_seen = lines.iter().filter(|l| l.marker.on_new_side()).count();
        let excess = old_seen
            .saturating_sub(header.old.len() as usize)
            .min(new_seen.saturating_sub(header.new.len() as usize))
            .min(trailing_empty);
        lines.truncate(lines.len() - excess);

        Ok(Hunk { header, lines })
    }

    /// Whether any line is an addition or removal
    pub fn has_changes(&self) -> bool {
        self.lines.iter().any(|l| l.marker.is_change())
    }
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header)?;
        for line in &self.lines {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::diff::line::Marker;
    use similar_asserts::assert_eq;

    fn header(text: &str) -> HunkHeader {
        HunkHeader::parse(text).unwrap()
    }

    #[test]
    fn parse_full_header() {
        let h = header("@@ -10,2 +10,3 @@");
        assert_eq!(h.old, HunkRange::new(10, 2));
        assert_eq!(h.new, HunkRange::new(10, 3));
        assert_eq!(h.section, "");
    }

    #[test]
    fn parse_omitted_counts() {
        let h = header("@@ -15 +14,0 @@ line 14");
        assert_eq!(h.old, HunkRange { start: 15, count: None });
        assert_eq!(h.old.len(), 1);
        assert_eq!(h.new, HunkRange::new(14, 0));
        assert_eq!(h.section, " line 14");
    }

    #[test]
    fn parse_invalid_headers() {
        for bad in [
            "@@ -a,1 +1 @@",
            "@@ -1,1 +1",
            "@@ 1,1 +1,1 @@",
            "@@ -1,1 -1,1 @@",
            "@@ -99999999999 +1 @@",
            "diff --git a/x b/x",
        ] {
            assert!(
                matches!(
                    HunkHeader::parse(bad),
                    Err(ParseError::InvalidHunkHeader { .. })
                ),
                "{bad}"
            );
        }
    }

    #[test]
    fn render_omits_count_of_one() {
        let h = HunkHeader {
            old: HunkRange::new(5, 1),
            new: HunkRange { start: 6, count: None },
            section: String::new(),
        };
        assert_eq!(h.to_string(), "@@ -5 +6 @@");
    }

    #[test]
    fn render_keeps_zero_count() {
        assert_eq!(header("@@ -136,0 +137 @@").to_string(), "@@ -136,0 +137 @@");
    }

    #[test]
    fn render_keeps_section_heading() {
        assert_eq!(
            header("@@ -1,5 +1,7 @@ int main(void)").to_string(),
            "@@ -1,5 +1,7 @@ int main(void)"
        );
    }

    #[test]
    fn rebase_segment_only_touches_new_count() {
        let rebased = header("@@ -1,3 +1,5 @@")
            .rebase(&Deltas {
                segment: 2,
                ..Deltas::default()
            })
            .unwrap();
        assert_eq!(rebased.to_string(), "@@ -1,3 +1,3 @@");
    }

    #[test]
    fn rebase_file_delta_moves_new_start() {
        let rebased = header("@@ -20,4 +25,6 @@")
            .rebase(&Deltas {
                segment: 1,
                file: 3,
                ..Deltas::default()
            })
            .unwrap();
        assert_eq!(rebased.to_string(), "@@ -20,4 +22,5 @@");
    }

    #[test]
    fn rebase_front_crop_moves_both_starts() {
        let rebased = header("@@ -10,10 +10,11 @@")
            .rebase(&Deltas {
                segment: 0,
                file: 0,
                front: SideCounts { old: 4, new: 4 },
                cropped: SideCounts { old: 6, new: 6 },
            })
            .unwrap();
        assert_eq!(rebased.to_string(), "@@ -14,4 +14,5 @@");
    }

    #[test]
    fn rebase_to_single_line_drops_count() {
        let rebased = header("@@ -7,0 +8,2 @@")
            .rebase(&Deltas {
                segment: 1,
                ..Deltas::default()
            })
            .unwrap();
        assert_eq!(rebased.to_string(), "@@ -7,0 +8 @@");
    }

    #[test]
    fn rebase_emptied_new_side_points_before() {
        let rebased = header("@@ -5 +5 @@")
            .rebase(&Deltas {
                segment: 1,
                ..Deltas::default()
            })
            .unwrap();
        assert_eq!(rebased.to_string(), "@@ -5 +4,0 @@");
    }

    #[test]
    fn rebase_already_empty_new_side_is_unchanged() {
        let rebased = header("@@ -15 +14,0 @@")
            .rebase(&Deltas {
                file: 2,
                ..Deltas::default()
            })
            .unwrap();
        assert_eq!(rebased.to_string(), "@@ -15 +12,0 @@");
    }

    #[test]
    fn rebase_crop_to_pure_addition_empties_old_side() {
        // 4 context lines, then 1 addition: keep only the addition
        let rebased = header("@@ -10,4 +10,5 @@")
            .rebase(&Deltas {
                segment: 0,
                file: 0,
                front: SideCounts { old: 4, new: 4 },
                cropped: SideCounts { old: 4, new: 4 },
            })
            .unwrap();
        assert_eq!(rebased.to_string(), "@@ -13,0 +14 @@");
    }

    #[test]
    fn side_counts_of_body() {
        let hunk = Hunk::parse("@@ -1,3 +1,3 @@", [" a", "-b", "+c", "+d", " e"]).unwrap();
        assert_eq!(SideCounts::of(&hunk.lines), SideCounts { old: 3, new: 4 });
    }

    #[test]
    fn rebase_underflow_is_error() {
        let result = header("@@ -1,3 +1,3 @@").rebase(&Deltas {
            segment: 4,
            ..Deltas::default()
        });
        assert!(matches!(
            result,
            Err(HeaderError::OutOfRange { side, .. }) if side == "new"
        ));
    }

    #[test]
    fn parse_hunk_body() {
        let hunk = Hunk::parse(
            "@@ -1,3 +1,3 @@",
            [" one", "-two", "+deux", " three"],
        )
        .unwrap();
        assert_eq!(hunk.lines.len(), 4);
        assert_eq!(hunk.lines[1], DiffLine::new(Marker::Removed, "two"));
        assert_eq!(hunk.lines[2], DiffLine::new(Marker::Added, "deux"));
        assert!(hunk.has_changes());
    }

    #[test]
    fn parse_attaches_missing_newline_marker() {
        let hunk = Hunk::parse(
            "@@ -3 +3,2 @@",
            [
                "-last line",
                "\\ No newline at end of file",
                "+last line",
                "+new final line",
            ],
        )
        .unwrap();
        assert!(hunk.lines[0].missing_final_newline);
        assert!(!hunk.lines[1].missing_final_newline);
        assert_eq!(
            hunk.to_string(),
            "@@ -3 +3,2 @@\n-last line\n\\ No newline at end of file\n+last line\n+new final line\n"
        );
    }

    #[test]
    fn parse_drops_trailing_separator_lines() {
        let hunk = Hunk::parse("@@ -1,2 +1,2 @@", [" a", "-b", "+c", "", ""]).unwrap();
        assert_eq!(hunk.lines.len(), 3);
    }

    #[test]
    fn parse_keeps_counted_empty_context() {
        let hunk = Hunk::parse("@@ -1,3 +1,3 @@", [" a", "", " c"]).unwrap();
        assert_eq!(hunk.lines.len(), 3);
        assert_eq!(hunk.lines[1], DiffLine::new(Marker::Context, ""));
    }

    #[test]
    fn parse_stops_at_mail_signature() {
        let hunk = Hunk::parse(
            "@@ -3,0 +4,2 @@",
            ["+a", "+b", "-- ", "2.39.0", ""],
        )
        .unwrap();
        assert_eq!(hunk.lines.len(), 2);
        assert_eq!(hunk.to_string(), "@@ -3,0 +4,2 @@\n+a\n+b\n");
    }

    #[test]
    fn signature_inside_counted_body_is_a_removed_line() {
        let hunk = Hunk::parse("@@ -1,2 +1 @@", ["-- ", "-x", "+y"]).unwrap();
        assert_eq!(hunk.lines[0], DiffLine::new(Marker::Removed, "- "));
        assert_eq!(hunk.lines.len(), 3);
    }

    #[test]
    fn extra_body_lines_past_the_count_are_kept() {
        let hunk = Hunk::parse("@@ -1 +1 @@", [" a", "+b"]).unwrap();
        assert_eq!(hunk.lines.len(), 2);
    }

    #[test]
    fn clear_section_keeps_line_ending() {
        let mut h = header("@@ -1,2 +1,3 @@ f()\r");
        h.clear_section();
        assert_eq!(h.to_string(), "@@ -1,2 +1,3 @@\r");
        let mut h = header("@@ -1 +1 @@ f()");
        h.clear_section();
        assert_eq!(h.to_string(), "@@ -1 +1 @@");
    }

    #[test]
    fn parse_rejects_unknown_body_line() {
        let result = Hunk::parse("@@ -1 +1 @@", ["-a", "index 123..456", "+b"]);
        assert!(matches!(
            result,
            Err(ParseError::UnexpectedBodyLine { line }) if line == "index 123..456"
        ));
    }
}
