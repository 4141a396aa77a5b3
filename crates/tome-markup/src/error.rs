//! Parse errors.

use std::path::PathBuf;

/// A fatal problem in one source file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}:{line}: {kind}", .path.display())]
pub struct ParseError {
    /// Source file.
    pub path: PathBuf,
    /// 1-based line.
    pub line: usize,
    /// What went wrong.
    pub kind: ParseErrorKind,
}

/// Parse error categories.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    /// Directive syntax is broken (bad option line, stray argument, missing body).
    #[error("malformed directive: {0}")]
    MalformedDirective(String),
    /// `.. name::` with a name no handler is registered for.
    #[error("unknown directive type \"{0}\"")]
    UnknownDirective(String),
    /// Option not in the directive's recognized set.
    #[error("unknown option \":{option}:\" for directive \"{directive}\"")]
    UnknownOption { directive: String, option: String },
    /// `code-block` or `::` literal without an indented body.
    #[error("code block has no indented content")]
    UnterminatedCodeBlock,
    /// `:name:` role that is not recognized.
    #[error("unknown interpreted text role \"{0}\"")]
    UnknownRole(String),
    /// Inline start-string without end-string.
    #[error("{0} start-string without end-string")]
    UnterminatedInline(&'static str),
    /// Hyperlink reference without a URL.
    #[error("hyperlink reference `{0}`_ has no target URL")]
    MalformedHyperlink(String),
    /// Section adornment that does not form a heading.
    #[error("malformed section heading: {0}")]
    MalformedSection(String),
}
