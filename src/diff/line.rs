use std::fmt;

/// Marker git emits after a line that has no trailing newline.
pub const NO_NEWLINE_MARKER: &str = "\\ No newline at end of file";

/// Which side(s) of the diff a body line belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `+` line, new side only
    Added,
    /// `-` line, old side only
    Removed,
    /// ` ` line, both sides
    Context,
}

impl Marker {
    pub fn as_char(self) -> char {
        match self {
            Marker::Added => '+',
            Marker::Removed => '-',
            Marker::Context => ' ',
        }
    }

    /// Added or removed
    pub fn is_change(self) -> bool {
        self != Marker::Context
    }

    pub fn on_old_side(self) -> bool {
        self != Marker::Added
    }

    pub fn on_new_side(self) -> bool {
        self != Marker::Removed
    }
}

/// A single line of a hunk body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub marker: Marker,
    /// Line text without the marker or line ending
    pub content: String,
    /// The line ends in `\r\n` rather than `\n`
    pub carriage_return: bool,
    /// Followed by `\ No newline at end of file`
    pub missing_final_newline: bool,
}

impl DiffLine {
    pub fn new(marker: Marker, content: &str) -> Self {
        Self {
            marker,
            content: content.to_string(),
            carriage_return: false,
            missing_final_newline: false,
        }
    }

    /// Parse a body line. An empty line is read as empty context. A trailing
    /// `\r` is kept aside and written back on render.
    ///
    /// Returns `None` for lines with an unknown marker.
    pub fn parse(line: &str) -> Option<Self> {
        let (line, carriage_return) = match line.strip_suffix('\r') {
            Some(line) => (line, true),
            None => (line, false),
        };
        let mut chars = line.chars();
        let marker = match chars.next() {
            Some('+') => Marker::Added,
            Some('-') => Marker::Removed,
            Some(' ') | None => Marker::Context,
            Some(_) => return None,
        };
        Some(Self {
            carriage_return,
            ..Self::new(marker, chars.as_str())
        })
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    pub fn is_added_blank(&self) -> bool {
        self.marker == Marker::Added && self.is_blank()
    }
}

impl fmt::Display for DiffLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.marker.as_char(), self.content)?;
        if self.carriage_return {
            f.write_str("\r")?;
        }
        if self.missing_final_newline {
            write!(f, "\n{}", NO_NEWLINE_MARKER)?;
        }
        Ok(())
    }
}
