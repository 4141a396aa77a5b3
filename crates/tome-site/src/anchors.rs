//! Anchor collection: documents, heading slugs, and explicit labels.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tome_markup::{Block, walk_blocks};
use tome_source::Corpus;

use crate::ReferenceError;

/// Where a resolved reference points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Target document identifier.
    pub doc: String,
    /// Fragment within the target page, if any.
    pub fragment: Option<String>,
    /// Default link text.
    pub title: String,
}

#[derive(Debug)]
struct DocAnchors {
    title: String,
    path: PathBuf,
    orphan: bool,
    /// Fragment id -> display title.
    fragments: BTreeMap<String, String>,
}

#[derive(Debug)]
struct LabelAnchor {
    doc: String,
    fragment: String,
    title: Option<String>,
    path: PathBuf,
    line: usize,
}

/// Every addressable point of a corpus.
///
/// Built once before any reference is resolved. Labels share one global
/// namespace; heading slugs are scoped to their document.
#[derive(Debug, Default)]
pub struct AnchorTable {
    docs: BTreeMap<String, DocAnchors>,
    labels: BTreeMap<String, LabelAnchor>,
}

impl AnchorTable {
    /// Collect anchors from every document.
    ///
    /// Duplicate labels are reported as [`ReferenceError::Ambiguous`]; the
    /// returned table keeps the first declaration so later passes can go on
    /// collecting errors.
    pub fn collect(corpus: &Corpus) -> (Self, Vec<ReferenceError>) {
        let mut table = Self::default();
        let mut errors = Vec::new();

        for doc in corpus.documents() {
            let mut fragments = BTreeMap::new();
            walk_blocks(&doc.blocks, &mut |block| match block {
                Block::Heading(h) => {
                    fragments.insert(h.slug.clone(), h.plain.clone());
                }
                Block::Target { id, .. } => {
                    fragments.insert(id.clone(), doc.title.clone());
                }
                Block::Toctree(t) => {
                    if let Some(id) = &t.id {
                        let title = t.caption.clone().unwrap_or_else(|| doc.title.clone());
                        fragments.insert(id.clone(), title);
                    }
                }
                Block::CodeBlock(c) => {
                    if let Some(id) = &c.id {
                        let title = c.caption.clone().unwrap_or_else(|| doc.title.clone());
                        fragments.insert(id.clone(), title);
                    }
                }
                _ => {}
            });

            for label in &doc.labels {
                if let Some(first) = table.labels.get(&label.name) {
                    errors.push(ReferenceError::Ambiguous {
                        label: label.name.clone(),
                        first: first.path.clone(),
                        first_line: first.line,
                        second: doc.source_path.clone(),
                        second_line: label.line,
                    });
                    continue;
                }
                table.labels.insert(
                    label.name.clone(),
                    LabelAnchor {
                        doc: doc.id.clone(),
                        fragment: label.fragment.clone(),
                        title: label.title.clone(),
                        path: doc.source_path.clone(),
                        line: label.line,
                    },
                );
            }

            table.docs.insert(
                doc.id.clone(),
                DocAnchors {
                    title: doc.title.clone(),
                    path: doc.source_path.clone(),
                    orphan: doc.is_orphan(),
                    fragments,
                },
            );
        }

        tracing::debug!(
            documents = table.docs.len(),
            labels = table.labels.len(),
            "Collected anchors"
        );
        (table, errors)
    }

    pub fn contains_doc(&self, id: &str) -> bool {
        self.docs.contains_key(id)
    }

    /// Document identifiers in order.
    pub fn doc_ids(&self) -> impl Iterator<Item = &str> {
        self.docs.keys().map(String::as_str)
    }

    pub fn title(&self, id: &str) -> Option<&str> {
        self.docs.get(id).map(|d| d.title.as_str())
    }

    pub(crate) fn source_path(&self, id: &str) -> Option<&PathBuf> {
        self.docs.get(id).map(|d| &d.path)
    }

    pub(crate) fn is_orphan(&self, id: &str) -> bool {
        self.docs.get(id).is_some_and(|d| d.orphan)
    }

    /// The whole document, or a fragment of it.
    pub fn document(&self, id: &str, fragment: Option<&str>) -> Option<Target> {
        let doc = self.docs.get(id)?;
        let (fragment, title) = match fragment {
            None => (None, doc.title.clone()),
            Some(f) => (Some(f.to_owned()), doc.fragments.get(f)?.clone()),
        };
        Some(Target {
            doc: id.to_owned(),
            fragment,
            title,
        })
    }

    /// An explicit label. `name` must already be normalized.
    pub fn label(&self, name: &str) -> Option<Target> {
        let label = self.labels.get(name)?;
        let title = match &label.title {
            Some(title) => title.clone(),
            None => self.title(&label.doc)?.to_owned(),
        };
        Some(Target {
            doc: label.doc.clone(),
            fragment: Some(label.fragment.clone()),
            title,
        })
    }

    /// Every anchor with its title, in a stable order.
    ///
    /// Used to fingerprint everything one page can show about another.
    pub fn titles(&self) -> impl Iterator<Item = (String, &str)> {
        let docs = self.docs.iter().flat_map(|(id, doc)| {
            std::iter::once((id.clone(), doc.title.as_str())).chain(
                doc.fragments
                    .iter()
                    .map(move |(f, title)| (format!("{id}#{f}"), title.as_str())),
            )
        });
        let labels = self.labels.iter().map(|(name, l)| {
            let key = format!("label:{name}->{}#{}", l.doc, l.fragment);
            (key, l.title.as_deref().unwrap_or(""))
        });
        docs.chain(labels)
    }
}
