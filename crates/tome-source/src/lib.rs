//! Source loading for tome.
//!
//! [`SourceLoader`] discovers source files under a root directory, reads and
//! parses them on a bounded worker pool, and returns a [`Corpus`] whose
//! documents are ordered by identifier. The order never depends on the
//! filesystem or on which worker finished first.
//!
//! # Example
//!
//! ```no_run
//! use std::path::PathBuf;
//! use tome_source::{LoaderOptions, SourceLoader};
//!
//! let loader = SourceLoader::new(PathBuf::from("docs"), LoaderOptions::default())?;
//! let corpus = loader.load()?;
//! for doc in corpus.documents() {
//!     println!("{}: {}", doc.id, doc.title);
//! }
//! # Ok::<(), tome_source::LoadError>(())
//! ```

mod error;
mod scanner;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::ThreadPool;
use rayon::prelude::*;
use tome_markup::{Document, ParseError, parse_document};

pub use error::LoadError;
pub use scanner::SourceFile;

use scanner::Scanner;

/// Discovery and concurrency settings.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Glob patterns selecting source files, relative to the root.
    pub include: Vec<String>,
    /// Glob patterns removing files from the selection.
    pub exclude: Vec<String>,
    /// Worker threads; 0 uses one per available core.
    pub jobs: usize,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            include: vec!["**/*.rst".to_owned()],
            exclude: vec!["_build/**".to_owned()],
            jobs: 0,
        }
    }
}

/// Build a bounded worker pool. `jobs == 0` lets rayon pick the core count.
pub fn worker_pool(jobs: usize) -> Result<ThreadPool, LoadError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|i| format!("tome-worker-{i}"))
        .build()
        .map_err(|e| LoadError::Pool(e.to_string()))
}

/// Loads and parses every source document under a root directory.
pub struct SourceLoader {
    root: PathBuf,
    scanner: Scanner,
    include: Vec<String>,
    jobs: usize,
}

impl SourceLoader {
    /// Create a loader. Fails if any glob pattern is invalid.
    pub fn new(root: PathBuf, options: LoaderOptions) -> Result<Self, LoadError> {
        let scanner = Scanner::new(root.clone(), &options.include, &options.exclude)?;
        Ok(Self {
            root,
            scanner,
            include: options.include,
            jobs: options.jobs,
        })
    }

    /// Source root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Find source files without reading them.
    pub fn discover(&self) -> Result<Vec<SourceFile>, LoadError> {
        let files = self.scanner.scan()?;
        if files.is_empty() {
            return Err(LoadError::NoSources {
                root: self.root.clone(),
                patterns: self.include.clone(),
            });
        }
        tracing::debug!(count = files.len(), root = %self.root.display(), "Discovered source files");
        Ok(files)
    }

    /// Discover, read and parse all sources on a fresh worker pool.
    pub fn load(&self) -> Result<Corpus, LoadError> {
        let pool = worker_pool(self.jobs)?;
        self.load_with(&pool)
    }

    /// Discover, read and parse all sources on `pool`.
    ///
    /// Reports the first read failure, otherwise every parse error of the
    /// corpus at once.
    pub fn load_with(&self, pool: &ThreadPool) -> Result<Corpus, LoadError> {
        let files = self.discover()?;

        let results: Vec<Result<Document, LoadFailure>> =
            pool.install(|| files.par_iter().map(load_one).collect());

        let mut documents = Vec::with_capacity(results.len());
        let mut parse_errors = Vec::new();
        for result in results {
            match result {
                Ok(doc) => documents.push(doc),
                Err(LoadFailure::Io(e)) => return Err(e),
                Err(LoadFailure::Parse(e)) => parse_errors.push(e),
            }
        }

        if !parse_errors.is_empty() {
            parse_errors.sort_by(|a, b| (&a.path, a.line).cmp(&(&b.path, b.line)));
            return Err(LoadError::Parse(parse_errors));
        }

        tracing::info!(documents = documents.len(), "Loaded sources");
        Ok(Corpus::new(self.root.clone(), documents))
    }
}

enum LoadFailure {
    Io(LoadError),
    Parse(ParseError),
}

fn load_one(file: &SourceFile) -> Result<Document, LoadFailure> {
    let source = fs::read_to_string(&file.path).map_err(|source| {
        LoadFailure::Io(LoadError::Io {
            path: file.path.clone(),
            source,
        })
    })?;
    tracing::debug!(id = %file.id, "Parsing");
    parse_document(&file.id, &file.path, &source).map_err(LoadFailure::Parse)
}

/// The parsed documents of one build, ordered by identifier.
///
/// The corpus owns its documents; later stages borrow them and keep only
/// identifiers.
#[derive(Debug)]
pub struct Corpus {
    root: PathBuf,
    documents: Vec<Document>,
    index: HashMap<String, usize>,
}

impl Corpus {
    /// Build a corpus, sorting `documents` by identifier.
    pub fn new(root: PathBuf, mut documents: Vec<Document>) -> Self {
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        let index = documents
            .iter()
            .enumerate()
            .map(|(i, doc)| (doc.id.clone(), i))
            .collect();
        Self {
            root,
            documents,
            index,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Documents in identifier order.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn get(&self, id: &str) -> Option<&Document> {
        self.index.get(id).map(|&i| &self.documents[i])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Identifiers in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.documents.iter().map(|d| d.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn loader(root: &Path, jobs: usize) -> SourceLoader {
        SourceLoader::new(
            root.to_path_buf(),
            LoaderOptions {
                jobs,
                ..LoaderOptions::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn test_load_orders_documents() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "java/wildcards.rst", "Wildcards\n=========\n");
        write(tmp.path(), "index.rst", "Home\n====\n");
        write(tmp.path(), "java/generics.rst", "Generics\n========\n");

        let corpus = loader(tmp.path(), 2).load().unwrap();

        assert_eq!(
            corpus.ids().collect::<Vec<_>>(),
            vec!["index", "java/generics", "java/wildcards"]
        );
        assert_eq!(corpus.get("java/generics").unwrap().title, "Generics");
        assert!(corpus.contains("index"));
        assert!(!corpus.contains("java"));
    }

    #[test]
    fn test_load_is_independent_of_worker_count() {
        let tmp = TempDir::new().unwrap();
        for i in 0..20 {
            write(tmp.path(), &format!("page{i:02}.rst"), &format!("Page {i}\n=======\n"));
        }

        let serial = loader(tmp.path(), 1).load().unwrap();
        let parallel = loader(tmp.path(), 4).load().unwrap();

        assert_eq!(serial.documents(), parallel.documents());
    }

    #[test]
    fn test_no_sources() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "notes.md", "# Notes\n");

        let err = loader(tmp.path(), 1).load().unwrap_err();
        assert!(matches!(err, LoadError::NoSources { .. }));
    }

    #[test]
    fn test_all_parse_errors_are_reported() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "b.rst", "Title\n=====\n\n.. image:: x.png\n");
        write(tmp.path(), "a.rst", "Title\n=====\n\nUse :java:`List`.\n");
        write(tmp.path(), "ok.rst", "Fine\n====\n");

        let err = loader(tmp.path(), 2).load().unwrap_err();
        let LoadError::Parse(errors) = err else {
            panic!("expected parse errors");
        };
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].path, tmp.path().join("a.rst"));
        assert_eq!(errors[0].line, 4);
        assert_eq!(errors[1].path, tmp.path().join("b.rst"));
    }

    #[test]
    fn test_parse_error_display_lists_every_file() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "a.rst", ".. image:: x.png\n");
        write(tmp.path(), "b.rst", ".. figure:: y.png\n");

        let message = loader(tmp.path(), 1).load().unwrap_err().to_string();
        assert_eq!(message.lines().count(), 2);
        assert!(message.contains("a.rst:1"));
        assert!(message.contains("b.rst:1"));
    }
}
