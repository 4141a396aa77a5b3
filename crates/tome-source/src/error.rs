use std::path::PathBuf;

use tome_markup::ParseError;

/// Source loading failures.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("source directory not found: {}", .0.display())]
    MissingRoot(PathBuf),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid source pattern \"{pattern}\": {message}")]
    Pattern { pattern: String, message: String },

    #[error("no source files matched {patterns:?} under {}", .root.display())]
    NoSources { root: PathBuf, patterns: Vec<String> },

    /// Every parse error of the corpus, sorted by file and line.
    #[error("{}", join_errors(.0))]
    Parse(Vec<ParseError>),

    #[error("failed to start worker pool: {0}")]
    Pool(String),
}

fn join_errors(errors: &[ParseError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}
