use std::fmt;
use std::path::PathBuf;

/// A single reference problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReferenceError {
    /// A `:ref:`, `:doc:` or toctree entry that names nothing in the corpus.
    #[error("{}:{line}: unresolved {kind} reference \"{target}\"", .file.display())]
    Unresolved {
        file: PathBuf,
        line: usize,
        /// `ref`, `doc` or `toctree`.
        kind: &'static str,
        target: String,
    },

    /// The same explicit label declared twice.
    #[error(
        "{}:{second_line}: label \"{label}\" is also declared at {}:{first_line}",
        .second.display(),
        .first.display()
    )]
    Ambiguous {
        label: String,
        first: PathBuf,
        first_line: usize,
        second: PathBuf,
        second_line: usize,
    },
}

impl ReferenceError {
    fn location(&self) -> (&PathBuf, usize) {
        match self {
            Self::Unresolved { file, line, .. } => (file, *line),
            Self::Ambiguous {
                second,
                second_line,
                ..
            } => (second, *second_line),
        }
    }
}

/// Every reference error of a corpus, sorted by file and line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct ResolveError {
    pub errors: Vec<ReferenceError>,
}

impl ResolveError {
    pub(crate) fn new(mut errors: Vec<ReferenceError>) -> Self {
        errors.sort_by(|a, b| a.location().cmp(&b.location()));
        Self { errors }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

/// Navigation tree failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("root document \"{0}\" not found")]
    MissingRoot(String),

    /// Toctree inclusion loops back to a document on the current path.
    #[error("toctree cycle: {}", .cycle.join(" -> "))]
    Cycle { cycle: Vec<String> },
}
