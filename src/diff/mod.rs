//! Unified-diff document model: files, hunks and body lines.

pub mod file;
pub mod full;
pub mod hunk;
pub mod line;

use error_set::error_set;

pub use file::FileBlock;
pub use full::DiffDocument;
pub use hunk::{Deltas, HeaderError, Hunk, HunkHeader, HunkRange, SideCounts};
pub use line::{DiffLine, Marker};

error_set! {
    /// Errors from reading the structure of a unified diff
    ParseError := {
        /// A line starting with `@@ ` is not a valid hunk header
        #[display("Invalid hunk header '{line}'")]
        InvalidHunkHeader { line: String },
        /// A hunk body line starts with something other than `+`, `-`, ` ` or `\`
        #[display("Unexpected line in hunk body: '{line}'")]
        UnexpectedBodyLine { line: String },
    }
}
