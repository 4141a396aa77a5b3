//! Source file discovery.
//!
//! Discovery only finds files and derives their identifiers; nothing is read
//! at this stage. The loader turns [`SourceFile`]s into documents.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};

use crate::error::LoadError;

/// Path separators must be matched literally, so `java/*` does not reach
/// into `java/advanced/`.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A discovered source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Document identifier (`java/generics`).
    pub id: String,
    /// Absolute or root-joined path to the file.
    pub path: PathBuf,
}

/// Walks the source root and filters files through include/exclude globs.
pub(crate) struct Scanner {
    root: PathBuf,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl Scanner {
    pub fn new(root: PathBuf, include: &[String], exclude: &[String]) -> Result<Self, LoadError> {
        Ok(Self {
            root,
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// All matching files, sorted by identifier.
    ///
    /// Hidden files and directories (leading `.`) are never visited. When two
    /// files map to the same identifier (`intro.rst` and `intro.txt`), the
    /// lexicographically first path wins.
    pub fn scan(&self) -> Result<Vec<SourceFile>, LoadError> {
        if !self.root.is_dir() {
            return Err(LoadError::MissingRoot(self.root.clone()));
        }

        let mut relative = Vec::new();
        self.walk(&self.root, "", &mut relative)?;
        relative.sort();

        let mut by_id: BTreeMap<String, String> = BTreeMap::new();
        for rel in relative {
            if !self.is_selected(&rel) {
                continue;
            }
            let id = document_id(&rel);
            if let Some(existing) = by_id.get(&id) {
                tracing::warn!(id = %id, kept = %existing, skipped = %rel, "duplicate document identifier");
                continue;
            }
            by_id.insert(id, rel);
        }

        Ok(by_id
            .into_iter()
            .map(|(id, rel)| SourceFile {
                id,
                path: self.root.join(rel),
            })
            .collect())
    }

    fn is_selected(&self, rel: &str) -> bool {
        self.include.iter().any(|p| p.matches_with(rel, MATCH_OPTIONS))
            && !self.exclude.iter().any(|p| p.matches_with(rel, MATCH_OPTIONS))
    }

    fn walk(&self, dir: &Path, prefix: &str, out: &mut Vec<String>) -> Result<(), LoadError> {
        let entries = fs::read_dir(dir).map_err(|source| LoadError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| LoadError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let rel = if prefix.is_empty() {
                name
            } else {
                format!("{prefix}/{name}")
            };
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
            if is_dir {
                self.walk(&entry.path(), &rel, out)?;
            } else {
                out.push(rel);
            }
        }
        Ok(())
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Pattern>, LoadError> {
    patterns
        .iter()
        .map(|p| {
            Pattern::new(p).map_err(|e| LoadError::Pattern {
                pattern: p.clone(),
                message: e.msg.to_owned(),
            })
        })
        .collect()
}

/// Strip the file extension from a `/`-separated relative path.
pub(crate) fn document_id(rel: &str) -> String {
    let (dir, file) = rel.rsplit_once('/').map_or(("", rel), |(d, f)| (d, f));
    let stem = match file.rfind('.') {
        Some(dot) if dot > 0 => &file[..dot],
        _ => file,
    };
    if dir.is_empty() {
        stem.to_owned()
    } else {
        format!("{dir}/{stem}")
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "Title\n=====\n").unwrap();
    }

    fn ids(scanner: &Scanner) -> Vec<String> {
        scanner.scan().unwrap().into_iter().map(|f| f.id).collect()
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_document_id() {
        assert_eq!(document_id("index.rst"), "index");
        assert_eq!(document_id("java/generics.rst"), "java/generics");
        assert_eq!(document_id("java/v1.2/notes.rst"), "java/v1.2/notes");
        assert_eq!(document_id("README"), "README");
    }

    #[test]
    fn test_scan_sorts_by_identifier() {
        let tmp = TempDir::new().unwrap();
        for rel in ["zeta.rst", "alpha.rst", "java/generics.rst", "index.rst"] {
            touch(tmp.path(), rel);
        }
        let scanner = Scanner::new(tmp.path().to_path_buf(), &strings(&["**/*.rst"]), &[]).unwrap();

        assert_eq!(ids(&scanner), vec!["alpha", "index", "java/generics", "zeta"]);
    }

    #[test]
    fn test_scan_applies_excludes_and_skips_hidden() {
        let tmp = TempDir::new().unwrap();
        for rel in ["index.rst", "_build/html/old.rst", ".git/notes.rst", "drafts/.wip.rst", "notes.txt"] {
            touch(tmp.path(), rel);
        }
        let scanner = Scanner::new(
            tmp.path().to_path_buf(),
            &strings(&["**/*.rst"]),
            &strings(&["_build/**"]),
        )
        .unwrap();

        assert_eq!(ids(&scanner), vec!["index"]);
    }

    #[test]
    fn test_single_star_does_not_cross_directories() {
        let tmp = TempDir::new().unwrap();
        for rel in ["java/a.rst", "java/deep/b.rst"] {
            touch(tmp.path(), rel);
        }
        let scanner = Scanner::new(tmp.path().to_path_buf(), &strings(&["java/*.rst"]), &[]).unwrap();

        assert_eq!(ids(&scanner), vec!["java/a"]);
    }

    #[test]
    fn test_duplicate_identifiers_keep_first_path() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "intro.rst");
        touch(tmp.path(), "intro.txt");
        let scanner =
            Scanner::new(tmp.path().to_path_buf(), &strings(&["*.rst", "*.txt"]), &[]).unwrap();

        let files = scanner.scan().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, tmp.path().join("intro.rst"));
    }

    #[test]
    fn test_invalid_pattern() {
        let result = Scanner::new(PathBuf::from("."), &strings(&["[unclosed"]), &[]);
        assert!(matches!(result, Err(LoadError::Pattern { pattern, .. }) if pattern == "[unclosed"));
    }

    #[test]
    fn test_missing_root() {
        let scanner = Scanner::new(PathBuf::from("/nonexistent/tome"), &strings(&["**/*.rst"]), &[])
            .unwrap();
        assert!(matches!(scanner.scan(), Err(LoadError::MissingRoot(_))));
    }
}
