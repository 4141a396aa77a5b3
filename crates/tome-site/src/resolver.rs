//! Cross-reference resolution.
//!
//! Resolution runs in two passes. The first collects every anchor
//! ([`AnchorTable::collect`]); the second checks every `:ref:`, `:doc:` and
//! toctree entry against it and expands toctree globs. All errors of the
//! corpus are gathered before failing, so one build reports everything.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tome_markup::{Document, RoleKind, RoleRef, Toctree, ToctreeEntry, normalize_label};
use tome_source::Corpus;

use crate::anchors::{AnchorTable, Target};
use crate::error::{ReferenceError, ResolveError};

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One entry of a resolved toctree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TocEntry {
    /// A document in the corpus, with an optional title override.
    Doc { id: String, title: Option<String> },
    /// An absolute URL.
    External { title: String, url: String },
}

/// A toctree with every entry resolved and globs expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToctree {
    pub caption: Option<String>,
    pub hidden: bool,
    pub maxdepth: Option<usize>,
    /// Anchor id from the `:name:` option.
    pub id: Option<String>,
    pub entries: Vec<TocEntry>,
}

impl ResolvedToctree {
    /// Identifiers of the documents this toctree includes, in order.
    pub fn doc_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().filter_map(|e| match e {
            TocEntry::Doc { id, .. } => Some(id.as_str()),
            TocEntry::External { .. } => None,
        })
    }
}

/// Frozen result of resolution.
///
/// Holds identifiers and titles only; documents stay in the [`Corpus`].
#[derive(Debug)]
pub struct XrefTable {
    anchors: AnchorTable,
    toctrees: BTreeMap<String, Vec<ResolvedToctree>>,
}

impl XrefTable {
    /// Resolve every reference of `corpus`.
    pub fn resolve(corpus: &Corpus) -> Result<Self, ResolveError> {
        let (anchors, mut errors) = AnchorTable::collect(corpus);
        let all_ids: Vec<&str> = corpus.ids().collect();

        let mut toctrees = BTreeMap::new();
        let mut references = 0usize;
        for doc in corpus.documents() {
            for role in doc.references() {
                references += 1;
                if lookup(&anchors, &doc.id, role).is_none() {
                    errors.push(ReferenceError::Unresolved {
                        file: doc.source_path.clone(),
                        line: role.line,
                        kind: role.kind.name(),
                        target: role.target.clone(),
                    });
                }
            }

            let resolved: Vec<ResolvedToctree> = doc
                .toctrees()
                .into_iter()
                .map(|toctree| resolve_toctree(&anchors, &all_ids, doc, toctree, &mut errors))
                .collect();
            toctrees.insert(doc.id.clone(), resolved);
        }

        if !errors.is_empty() {
            return Err(ResolveError::new(errors));
        }

        tracing::info!(documents = corpus.len(), references, "Resolved cross-references");
        Ok(Self { anchors, toctrees })
    }

    pub fn anchors(&self) -> &AnchorTable {
        &self.anchors
    }

    /// Resolved toctrees of `doc` in source order.
    pub fn toctrees(&self, doc: &str) -> &[ResolvedToctree] {
        self.toctrees.get(doc).map_or(&[], Vec::as_slice)
    }

    /// Target of a role occurring in document `from`.
    ///
    /// Every role of the corpus resolved when the table was built, so this
    /// only returns `None` for roles from outside the corpus.
    pub fn target(&self, from: &str, role: &RoleRef) -> Option<Target> {
        lookup(&self.anchors, from, role)
    }

    pub fn title(&self, doc: &str) -> Option<&str> {
        self.anchors.title(doc)
    }

    pub fn contains(&self, doc: &str) -> bool {
        self.anchors.contains_doc(doc)
    }

    pub(crate) fn source_path(&self, doc: &str) -> Option<&Path> {
        self.anchors.source_path(doc).map(PathBuf::as_path)
    }

    pub(crate) fn is_orphan(&self, doc: &str) -> bool {
        self.anchors.is_orphan(doc)
    }
}

fn lookup(anchors: &AnchorTable, from: &str, role: &RoleRef) -> Option<Target> {
    match role.kind {
        RoleKind::Ref => anchors.label(&normalize_label(&role.target)),
        RoleKind::Doc => {
            let (path, fragment) = match role.target.split_once('#') {
                Some((path, fragment)) => (path, Some(fragment)),
                None => (role.target.as_str(), None),
            };
            let id = if path.is_empty() {
                from.to_owned()
            } else {
                resolve_doc_path(dir_of(from), path)?
            };
            anchors.document(&id, fragment)
        }
    }
}

fn resolve_toctree(
    anchors: &AnchorTable,
    all_ids: &[&str],
    doc: &Document,
    toctree: &Toctree,
    errors: &mut Vec<ReferenceError>,
) -> ResolvedToctree {
    let mut entries: Vec<TocEntry> = Vec::new();
    let unresolved = |entry: &ToctreeEntry| ReferenceError::Unresolved {
        file: doc.source_path.clone(),
        line: entry.line,
        kind: "toctree",
        target: entry.target.clone(),
    };

    for entry in &toctree.entries {
        if entry.is_external() {
            entries.push(TocEntry::External {
                title: entry.title.clone().unwrap_or_else(|| entry.target.clone()),
                url: entry.target.clone(),
            });
            continue;
        }

        if toctree.glob && has_glob_chars(&entry.target) {
            let matched = expand_glob(all_ids, doc, &entry.target, &entries);
            if matched.is_empty() {
                errors.push(unresolved(entry));
            }
            entries.extend(matched.into_iter().map(|id| TocEntry::Doc { id, title: None }));
            continue;
        }

        match resolve_doc_path(doc.dir(), &entry.target).filter(|id| anchors.contains_doc(id)) {
            Some(id) => entries.push(TocEntry::Doc {
                id,
                title: entry.title.clone(),
            }),
            None => errors.push(unresolved(entry)),
        }
    }

    if toctree.reversed {
        entries.reverse();
    }

    ResolvedToctree {
        caption: toctree.caption.clone(),
        hidden: toctree.hidden,
        maxdepth: toctree.maxdepth,
        id: toctree.id.clone(),
        entries,
    }
}

/// Documents matching `pattern`, in corpus order, minus the containing
/// document and anything the toctree already lists.
fn expand_glob(all_ids: &[&str], doc: &Document, pattern: &str, listed: &[TocEntry]) -> Vec<String> {
    let Some(absolute) = join_relative(doc.dir(), pattern) else {
        return Vec::new();
    };
    let Ok(pattern) = Pattern::new(&absolute) else {
        return Vec::new();
    };
    all_ids
        .iter()
        .copied()
        .filter(|id| *id != doc.id && pattern.matches_with(id, GLOB_OPTIONS))
        .filter(|id| {
            !listed
                .iter()
                .any(|e| matches!(e, TocEntry::Doc { id: seen, .. } if seen.as_str() == *id))
        })
        .map(str::to_owned)
        .collect()
}

fn has_glob_chars(target: &str) -> bool {
    target.contains(['*', '?', '['])
}

fn dir_of(id: &str) -> &str {
    id.rsplit_once('/').map_or("", |(dir, _)| dir)
}

/// Resolve a document path written in document directory `dir`.
///
/// Paths starting with `/` are relative to the source root. Returns `None`
/// for paths that climb above the root.
pub fn resolve_doc_path(dir: &str, target: &str) -> Option<String> {
    let target = target.trim();
    let target = target.strip_suffix(".rst").unwrap_or(target);
    join_relative(dir, target)
}

fn join_relative(dir: &str, target: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_owned(),
        None if dir.is_empty() => target.to_owned(),
        None => format!("{dir}/{target}"),
    };
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }
    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}
