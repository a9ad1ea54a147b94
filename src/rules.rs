//! Line classification rules.
//!
//! Every added line of a hunk is mapped to a [`Category`] by a [`RuleSet`]
//! compiled once from a [`FilterConfig`]. Classification is a regex heuristic
//! over a single line; the scanner supplies the multi-line state.
//!
//! Comment syntax depends on the [`FileKind`] of the file being patched:
//! C-like files (selected by glob) use `//` and `/* */`, everything else uses
//! `#`.

use crate::config::{ConfigError, FilterConfig};
use crate::diff::line::{DiffLine, Marker};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;

/// Comment syntax family of a patched file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// `//` line comments and `/* */` block comments
    CLike,
    /// `#` line comments
    Other,
}

/// What a single hunk body line is, as far as filtering is concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Unchanged line
    Context,
    /// Removed line
    Removed,
    /// Added line that is empty or whitespace only
    AddedBlank,
    /// Added line that is entirely a line comment
    LineComment,
    /// Added code followed by a `//` or `/* */` comment
    TrailingComment,
    /// Added `/* ... */` comment closed on the same line
    BlockComment,
    /// Added line opening a block comment that continues on later lines
    BlockCommentStart,
    /// Added line inside an open block comment
    BlockCommentContinue,
    /// Added line closing an open block comment
    BlockCommentEnd,
    /// Added debug call complete on one line
    DebugCall,
    /// Added debug call whose arguments continue on later lines
    DebugCallStart,
    /// Added line inside an open debug call
    DebugCallContinue,
    /// Added line closing an open debug call
    DebugCallEnd,
    /// Added debug call sharing its line with other statements
    ConcatenatedDebugCall,
    /// Any other added line
    Code,
}

/// Whole-line comment forms, tried in order against an added line's content.
const COMMENT_RULES: &[(FileKind, &str, Category)] = &[
    (FileKind::CLike, r"^\s*//", Category::LineComment),
    (
        FileKind::CLike,
        r"^\s*/\*([^*]|\*+[^*/])*\*+/\s*$",
        Category::BlockComment,
    ),
    (
        FileKind::CLike,
        r"^\s*/\*([^*]|\*+[^*/])*\**$",
        Category::BlockCommentStart,
    ),
    // `#!` shebangs and `#[...]` attributes are code.
    (FileKind::Other, r"^\s*#([^!\[]|$)", Category::LineComment),
];

/// A `//` that is not a comment: inside a quoted string, or part of a URL.
const URL_GUARD: &str = r#"(["']).*//.*["']|://"#;

/// A `/* */` comment running to the end of the line.
const TRAILING_BLOCK: &str = r"^/\*([^*]|\*+[^*/])*\*+/\s*$";

/// A call that is closed at the end of its line.
const CALL_END: &str = r"\)\s*;\s*$";

/// A control keyword whose body may be a single brace-less statement.
const CONTROL: &str = r"^\s*(\}\s*)?(if|for|while|do|switch|else)\b";

/// Compiled classification rules
#[derive(Debug, Clone)]
pub struct RuleSet {
    comments: Vec<(FileKind, Regex, Category)>,
    url_guard: Regex,
    trailing_block: Regex,
    call_start: Regex,
    call_end: Regex,
    control: Regex,
    c_like: GlobSet,
    window: usize,
}

impl RuleSet {
    /// Compile the rule table for a configuration.
    pub fn compile(config: &FilterConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let comments = COMMENT_RULES
            .iter()
            .map(|&(kind, pattern, category)| Ok((kind, regex(pattern)?, category)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        // Longest names first so a prefix never shadows a longer name.
        let mut names: Vec<&str> = config.call_names.iter().map(String::as_str).collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let alternation = names
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");

        Ok(Self {
            comments,
            url_guard: regex(URL_GUARD)?,
            trailing_block: regex(TRAILING_BLOCK)?,
            call_start: regex(&format!(r"^\s*(?:{alternation})\s*\("))?,
            call_end: regex(CALL_END)?,
            control: regex(CONTROL)?,
            c_like: build_globset(&config.c_like_globs)?,
            window: config.window,
        })
    }

    /// Context lines kept on each side of a retained change.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Comment family for a file path. Files without a path are `Other`.
    pub fn file_kind(&self, path: Option<&str>) -> FileKind {
        match path {
            Some(path) if self.c_like.is_match(path) => FileKind::CLike,
            _ => FileKind::Other,
        }
    }

    /// Classify a line outside of any multi-line construct.
    pub fn classify(&self, line: &DiffLine, kind: FileKind) -> Category {
        match line.marker {
            Marker::Context => return Category::Context,
            Marker::Removed => return Category::Removed,
            Marker::Added => {}
        }

        let content = line.content.as_str();
        if content.trim().is_empty() {
            return Category::AddedBlank;
        }

        if let Some(&(_, _, category)) = self
            .comments
            .iter()
            .find(|(rule_kind, pattern, _)| *rule_kind == kind && pattern.is_match(content))
        {
            return category;
        }

        if kind == FileKind::CLike
            && self
                .trailing_comment_start(content)
                .is_some_and(|start| !content[..start].trim().is_empty())
        {
            return Category::TrailingComment;
        }

        self.classify_call(content)
    }

    /// Classify a line while a multi-line debug call is open.
    pub fn classify_in_call(&self, line: &DiffLine) -> Category {
        match line.marker {
            Marker::Added if self.call_end.is_match(&line.content) => Category::DebugCallEnd,
            Marker::Added => Category::DebugCallContinue,
            Marker::Removed => Category::Removed,
            Marker::Context => Category::Context,
        }
    }

    /// Classify a line while a block comment is open.
    pub fn classify_in_block_comment(&self, line: &DiffLine) -> Category {
        match line.marker {
            Marker::Added if line.content.contains("*/") => Category::BlockCommentEnd,
            Marker::Added => Category::BlockCommentContinue,
            Marker::Removed => Category::Removed,
            Marker::Context => Category::Context,
        }
    }

    /// Code before any trailing comments, without trailing whitespace.
    pub fn strip_trailing_comment<'a>(&self, content: &'a str) -> &'a str {
        let mut code = content;
        while let Some(idx) = self
            .trailing_comment_start(code)
            .filter(|&idx| !code[..idx].trim().is_empty())
        {
            code = code[..idx].trim_end();
        }
        code
    }

    /// Code following the `*/` that closes a block comment, if there is any.
    pub fn code_after_comment_end<'a>(&self, content: &'a str) -> Option<&'a str> {
        content
            .split_once("*/")
            .map(|(_, rest)| rest)
            .filter(|rest| !rest.trim().is_empty())
    }

    /// Where a trailing comment starts: the first unguarded `//`, or a
    /// `/* */` comment outside literals that runs to the end of the line.
    fn trailing_comment_start(&self, content: &str) -> Option<usize> {
        let line = content.find("//").filter(|_| !self.url_guard.is_match(content));
        let block = unquoted(content)
            .map(|(idx, _)| idx)
            .find(|&idx| {
                content[idx..].starts_with("/*") && self.trailing_block.is_match(&content[idx..])
            });

        line.into_iter().chain(block).min()
    }

    /// Whether a kept line is a control statement governing a single
    /// brace-less statement on the next line.
    pub fn is_headless_control(&self, line: &DiffLine) -> bool {
        if line.marker != Marker::Added {
            return false;
        }
        let content = line.content.trim();
        !content.starts_with('#')
            && !content.starts_with('/')
            && !content.ends_with(';')
            && !content.ends_with('{')
            && self.control.is_match(content)
    }

    fn classify_call(&self, content: &str) -> Category {
        let Some(open) = self.call_start.find(content) else {
            return Category::Code;
        };
        let args = &content[open.end()..];

        let Some(close) = closing_paren(args) else {
            return Category::DebugCallStart;
        };
        match args[close..].trim() {
            "" => Category::Code,
            ";" => Category::DebugCall,
            _ => Category::ConcatenatedDebugCall,
        }
    }
}

fn regex(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let normalized = pattern.trim().replace('\\', "/");
        if normalized.is_empty() {
            continue;
        }
        let glob = GlobBuilder::new(&normalized)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidGlob {
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;
        builder.add(glob);
    }

    builder.build().map_err(|e| ConfigError::InvalidGlob {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}

/// Characters of a line outside string and char literals, with their offsets.
fn unquoted(content: &str) -> impl Iterator<Item = (usize, char)> + '_ {
    let mut quote: Option<char> = None;
    let mut escaped = false;

    content.char_indices().filter(move |&(_, c)| {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            return false;
        }
        if c == '"' || c == '\'' {
            quote = Some(c);
            return false;
        }
        true
    })
}

/// Offset just past the `)` closing a call whose `(` precedes `args`.
fn closing_paren(args: &str) -> Option<usize> {
    let mut depth = 1;
    for (idx, c) in unquoted(args) {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}
