//! Scrub debug noise out of unified diffs.
//!
//! A [`Scrubber`] drops added debug calls, added comments and stray added
//! blank lines from a diff, then recomputes every hunk header so the result
//! still applies.

use error_set::error_set;

pub mod config;
pub mod crop;
pub mod diff;
pub mod rules;
pub mod scan;
pub mod scrub;

pub use config::{ConfigError, FilterConfig};
pub use diff::{HeaderError, ParseError};
pub use rules::RuleSet;
pub use scan::{Diagnostic, DiagnosticKind, DropTally};
pub use scrub::{ScrubReport, Scrubbed};

use diff::DiffDocument;

error_set! {
    /// Top-level error for patch-scrub operations
    ScrubError := {
        ParseError(ParseError),
        HeaderError(HeaderError),
        ConfigError(ConfigError),
    }
}

/// Main interface: a compiled filter that scrubs diffs
#[derive(Debug, Clone)]
pub struct Scrubber {
    rules: RuleSet,
}

impl Scrubber {
    /// Compile a filter from its configuration
    pub fn new(config: &FilterConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            rules: RuleSet::compile(config)?,
        })
    }

    /// Drop added debug calls, comments and stray blank lines from a
    /// unified diff, recomputing every hunk header.
    ///
    /// # Examples
    /// ```
    /// # use patch_scrub::{FilterConfig, Scrubber};
    /// let scrubber = Scrubber::new(&FilterConfig::default()).unwrap();
    /// let scrubbed = scrubber
    ///     .scrub("diff --git a/m.c b/m.c\n--- a/m.c\n+++ b/m.c\n@@ -1,0 +2,2 @@\n+PRINTF(\"hi\");\n+run();\n")
    ///     .unwrap();
    /// assert_eq!(
    ///     scrubbed.diff,
    ///     "diff --git a/m.c b/m.c\n--- a/m.c\n+++ b/m.c\n@@ -1,0 +2 @@\n+run();"
    /// );
    /// assert_eq!(scrubbed.report.tally.debug_calls, 1);
    /// ```
    pub fn scrub(&self, diff: &str) -> Result<Scrubbed, ScrubError> {
        Ok(scrub::scrub_document(
            DiffDocument::parse(diff)?,
            &self.rules,
        )?)
    }
}
