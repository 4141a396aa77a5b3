//! Cross-reference resolution and navigation for tome.
//!
//! Two stages live here, run one after the other on a loaded
//! [`Corpus`](tome_source::Corpus):
//!
//! - [`XrefTable::resolve`] collects every anchor, checks every `:ref:`,
//!   `:doc:` and toctree entry, and expands toctree globs.
//! - [`NavTree::build`] turns the resolved toctrees into a tree rooted at the
//!   configured root document, or at every document no toctree includes,
//!   rejecting cycles.
//!
//! Both results are immutable and hold identifiers and titles only.

mod anchors;
mod error;
mod navigation;
mod resolver;

pub use anchors::{AnchorTable, Target};
pub use error::{NavigationError, ReferenceError, ResolveError};
pub use navigation::{Breadcrumb, NavIndex, NavItem, NavKind, NavNode, NavTree};
pub use resolver::{ResolvedToctree, TocEntry, XrefTable, resolve_doc_path};
