//! Navigation tree built from toctrees.
//!
//! # Architecture
//!
//! Nodes are stored in a flat `Vec<NavNode>` with parent/children
//! relationships tracked by indices. The tree has one or more top-level
//! document nodes: the configured root document, or else every document no
//! toctree includes. A toctree with a caption becomes a group node holding
//! its entries; toctrees without a caption attach their entries directly to
//! the including document.
//!
//! A document listed by several toctrees gets a node at each position, but
//! only its first node in pre-order carries its own toctree entries, so the
//! tree grows linearly with the number of toctree entries.
//!
//! Expansion and cycle detection both use explicit work stacks, so the depth
//! of a toctree chain is bounded by memory, not by the call stack.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::error::NavigationError;
use crate::resolver::{TocEntry, XrefTable};

/// What a navigation node stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavKind {
    /// A document, by identifier.
    Doc(String),
    /// A captioned toctree.
    Group,
    /// An external URL.
    External(String),
}

/// One node of the navigation tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavNode {
    pub kind: NavKind,
    pub title: String,
    /// Distance from the top-level node above it.
    pub depth: usize,
}

impl NavNode {
    /// Document identifier for document nodes.
    pub fn doc(&self) -> Option<&str> {
        match &self.kind {
            NavKind::Doc(id) => Some(id),
            NavKind::Group | NavKind::External(_) => None,
        }
    }
}

/// Breadcrumb navigation item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breadcrumb {
    pub title: String,
    pub doc: String,
}

/// Navigation item with children, as written to `navigation.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub title: String,
    /// Document identifier; absent for groups and external links.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    /// Absolute URL of an external entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavItem>,
}

/// Serializable view of the whole tree.
///
/// With a single top-level document, `root` and `title` name it and `items`
/// are its children. Otherwise both are absent and `items` lists every
/// top-level document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavIndex {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub items: Vec<NavItem>,
}

/// The site hierarchy derived from toctrees.
#[derive(Debug)]
pub struct NavTree {
    nodes: Vec<NavNode>,
    children: Vec<Vec<usize>>,
    parents: Vec<Option<usize>>,
    /// Top-level document nodes in order.
    roots: Vec<usize>,
    /// First node of each document in pre-order.
    doc_index: HashMap<String, usize>,
    unreachable: Vec<String>,
}

impl NavTree {
    /// Build the tree under `root_doc`, or, when it is `None`, under every
    /// document that no toctree includes and that is not marked `:orphan:`,
    /// in identifier order.
    ///
    /// Every document's toctrees are checked for cycles first, including
    /// documents no root reaches. Documents left out of the tree that are
    /// not marked `:orphan:` are logged as warnings.
    pub fn build(xref: &XrefTable, root_doc: Option<&str>) -> Result<Self, NavigationError> {
        let top: Vec<&str> = match root_doc {
            Some(id) if xref.title(id).is_some() => vec![id],
            Some(id) => return Err(NavigationError::MissingRoot(id.to_owned())),
            None => top_level(xref),
        };
        check_cycles(xref, &top)?;

        let mut tree = Self {
            nodes: Vec::new(),
            children: Vec::new(),
            parents: Vec::new(),
            roots: Vec::new(),
            doc_index: HashMap::new(),
            unreachable: Vec::new(),
        };
        for &id in &top {
            let title = xref.title(id).unwrap_or(id);
            let node = tree.push(None, NavKind::Doc(id.to_owned()), title.to_owned());
            tree.roots.push(node);
        }

        let mut expanded: HashSet<String> = HashSet::new();
        let mut stack: Vec<usize> = tree.roots.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            let Some(id) = tree.nodes[node].doc().map(str::to_owned) else {
                continue;
            };
            // Later occurrences stay leaves.
            if !expanded.insert(id.clone()) {
                continue;
            }
            let mut expand = Vec::new();
            for toctree in xref.toctrees(&id) {
                let parent = match &toctree.caption {
                    Some(caption) => tree.push(Some(node), NavKind::Group, caption.clone()),
                    None => node,
                };
                for entry in &toctree.entries {
                    match entry {
                        TocEntry::Doc { id, title } => {
                            let title = title
                                .clone()
                                .or_else(|| xref.title(id).map(str::to_owned))
                                .unwrap_or_else(|| id.clone());
                            expand.push(tree.push(Some(parent), NavKind::Doc(id.clone()), title));
                        }
                        TocEntry::External { title, url } => {
                            tree.push(Some(parent), NavKind::External(url.clone()), title.clone());
                        }
                    }
                }
            }
            stack.extend(expand.into_iter().rev());
        }

        tree.index_documents();
        for id in xref.anchors().doc_ids() {
            if tree.doc_index.contains_key(id) || xref.is_orphan(id) {
                continue;
            }
            let path = xref.source_path(id).map(|p| p.display().to_string()).unwrap_or_default();
            tracing::warn!(doc = %id, path = %path, "document isn't included in any toctree");
            tree.unreachable.push(id.to_owned());
        }

        tracing::info!(nodes = tree.nodes.len(), roots = tree.roots.len(), "Built navigation tree");
        Ok(tree)
    }

    fn push(&mut self, parent: Option<usize>, kind: NavKind, title: String) -> usize {
        let depth = parent.map_or(0, |p| self.nodes[p].depth + 1);
        let index = self.nodes.len();
        self.nodes.push(NavNode { kind, title, depth });
        self.children.push(Vec::new());
        self.parents.push(parent);
        if let Some(p) = parent {
            self.children[p].push(index);
        }
        index
    }

    /// Record the first pre-order node of every document.
    fn index_documents(&mut self) {
        let mut stack: Vec<usize> = self.roots.iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if let Some(id) = self.nodes[node].doc() {
                self.doc_index.entry(id.to_owned()).or_insert(node);
            }
            stack.extend(self.children[node].iter().rev());
        }
    }

    /// Top-level document nodes.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// The first top-level document, used as the site's home page.
    pub fn home_doc(&self) -> Option<&str> {
        self.roots.first().and_then(|&r| self.nodes[r].doc())
    }

    pub fn node(&self, index: usize) -> &NavNode {
        &self.nodes[index]
    }

    pub fn children(&self, index: usize) -> &[usize] {
        &self.children[index]
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents[index]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First node of a document, in pre-order.
    pub fn find(&self, doc: &str) -> Option<usize> {
        self.doc_index.get(doc).copied()
    }

    /// Documents left out of the tree that are not marked `:orphan:`.
    pub fn unreachable(&self) -> &[String] {
        &self.unreachable
    }

    /// Ancestor documents of `doc`, top level first, excluding `doc` itself.
    ///
    /// Groups are skipped. Empty for top-level and unreachable documents.
    pub fn breadcrumbs(&self, doc: &str) -> Vec<Breadcrumb> {
        let Some(node) = self.find(doc) else {
            return Vec::new();
        };
        let mut crumbs = Vec::new();
        let mut current = self.parents[node];
        while let Some(index) = current {
            let n = &self.nodes[index];
            if let Some(id) = n.doc() {
                crumbs.push(Breadcrumb {
                    title: n.title.clone(),
                    doc: id.to_owned(),
                });
            }
            current = self.parents[index];
        }
        crumbs.reverse();
        crumbs
    }

    /// Serializable copy of the tree.
    pub fn index(&self) -> NavIndex {
        if let &[root] = self.roots.as_slice() {
            return NavIndex {
                root: self.nodes[root].doc().map(str::to_owned),
                title: Some(self.nodes[root].title.clone()),
                items: self.children[root].iter().map(|&c| self.item(c)).collect(),
            };
        }
        NavIndex {
            root: None,
            title: None,
            items: self.roots.iter().map(|&r| self.item(r)).collect(),
        }
    }

    fn item(&self, index: usize) -> NavItem {
        let node = &self.nodes[index];
        let url = match &node.kind {
            NavKind::External(url) => Some(url.clone()),
            NavKind::Doc(_) | NavKind::Group => None,
        };
        NavItem {
            title: node.title.clone(),
            doc: node.doc().map(str::to_owned),
            url,
            children: self.children[index].iter().map(|&c| self.item(c)).collect(),
        }
    }
}

/// Documents no toctree includes and not marked `:orphan:`, in identifier
/// order.
fn top_level(xref: &XrefTable) -> Vec<&str> {
    let included: HashSet<&str> = xref
        .anchors()
        .doc_ids()
        .flat_map(|id| xref.toctrees(id).iter().flat_map(|t| t.doc_ids()))
        .collect();
    xref.anchors()
        .doc_ids()
        .filter(|id| !included.contains(id) && !xref.is_orphan(id))
        .collect()
}

/// Reject toctree cycles anywhere in the corpus.
///
/// Iterative depth-first search starting at the top-level documents, then
/// at every other document in identifier order. A document met again while
/// it is still on the current path closes a cycle.
fn check_cycles(xref: &XrefTable, top: &[&str]) -> Result<(), NavigationError> {
    let mut done: HashSet<&str> = HashSet::new();
    let starts = top.iter().copied().chain(xref.anchors().doc_ids());

    for start in starts {
        if done.contains(start) {
            continue;
        }
        let mut path: Vec<&str> = vec![start];
        let mut on_path: HashSet<&str> = HashSet::from([start]);
        let mut cursors: Vec<Vec<&str>> = vec![included(xref, start)];

        while let Some(pending) = cursors.last_mut() {
            let Some(next) = pending.pop() else {
                cursors.pop();
                if let Some(finished) = path.pop() {
                    on_path.remove(finished);
                    done.insert(finished);
                }
                continue;
            };
            if on_path.contains(next) {
                let from = path.iter().position(|id| *id == next).unwrap_or(0);
                let mut cycle: Vec<String> = path[from..].iter().map(|id| (*id).to_owned()).collect();
                cycle.push(next.to_owned());
                return Err(NavigationError::Cycle { cycle });
            }
            if done.contains(next) {
                continue;
            }
            path.push(next);
            on_path.insert(next);
            cursors.push(included(xref, next));
        }
    }
    Ok(())
}

/// Documents included by `doc`'s toctrees, reversed so `pop` yields them in
/// source order.
fn included<'x>(xref: &'x XrefTable, doc: &str) -> Vec<&'x str> {
    let mut ids: Vec<&str> = xref.toctrees(doc).iter().flat_map(|t| t.doc_ids()).collect();
    ids.reverse();
    ids
}
