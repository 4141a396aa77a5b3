//! Parsed document model.
//!
//! Every type here is a plain immutable value produced by the parser. The
//! resolver and renderer only ever borrow them.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// One parsed source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Identifier: source path relative to the source root, `/`-separated,
    /// without extension (e.g. `java/generics`).
    pub id: String,
    /// Absolute path of the source file.
    pub source_path: PathBuf,
    /// First heading text, or a title derived from the identifier.
    pub title: String,
    /// Top-level blocks in source order.
    pub blocks: Vec<Block>,
    /// Explicit labels declared in this document.
    pub labels: Vec<Label>,
    /// Leading field list (`:orphan:`, `:author: ...`).
    pub fields: BTreeMap<String, String>,
    /// SHA-256 of the raw source, hex encoded.
    pub content_hash: String,
}

impl Document {
    /// Whether the document opted out of toctree inclusion with `:orphan:`.
    #[must_use]
    pub fn is_orphan(&self) -> bool {
        self.fields.contains_key("orphan")
    }

    /// All headings, including those nested in admonitions and quotes.
    #[must_use]
    pub fn headings(&self) -> Vec<&Heading> {
        let mut out = Vec::new();
        walk_blocks(&self.blocks, &mut |block| {
            if let Block::Heading(h) = block {
                out.push(h);
            }
        });
        out
    }

    /// All toctree directives in source order.
    #[must_use]
    pub fn toctrees(&self) -> Vec<&Toctree> {
        let mut out = Vec::new();
        walk_blocks(&self.blocks, &mut |block| {
            if let Block::Toctree(t) = block {
                out.push(t);
            }
        });
        out
    }

    /// All `:ref:` / `:doc:` roles in source order.
    #[must_use]
    pub fn references(&self) -> Vec<&RoleRef> {
        let mut out = Vec::new();
        walk_blocks(&self.blocks, &mut |block| {
            let inlines: &[Inline] = match block {
                Block::Heading(h) => &h.text,
                Block::Paragraph { inlines, .. } => inlines,
                Block::BulletList { items, .. } => {
                    for item in items {
                        collect_roles(item, &mut out);
                    }
                    return;
                }
                _ => return,
            };
            collect_roles(inlines, &mut out);
        });
        out
    }

    /// Directory part of the identifier (`""` for top-level documents).
    #[must_use]
    pub fn dir(&self) -> &str {
        self.id.rsplit_once('/').map_or("", |(dir, _)| dir)
    }
}

fn collect_roles<'a>(inlines: &'a [Inline], out: &mut Vec<&'a RoleRef>) {
    out.extend(inlines.iter().filter_map(|inline| match inline {
        Inline::Role(role) => Some(role),
        _ => None,
    }));
}

/// Visit every block depth-first, descending into admonitions and quotes.
pub fn walk_blocks<'a>(blocks: &'a [Block], visit: &mut impl FnMut(&'a Block)) {
    for block in blocks {
        visit(block);
        match block {
            Block::Admonition { body, .. } | Block::Quote { body, .. } => walk_blocks(body, visit),
            _ => {}
        }
    }
}

/// A block-level element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Section heading.
    Heading(Heading),
    /// Paragraph of inline content.
    Paragraph { inlines: Vec<Inline>, line: usize },
    /// Bullet list; each item is one run of inline content.
    BulletList { items: Vec<Vec<Inline>>, line: usize },
    /// Indented block quote.
    Quote { body: Vec<Block>, line: usize },
    /// Literal block introduced by a trailing `::`.
    LiteralBlock { text: String, line: usize },
    /// `code-block` directive.
    CodeBlock(CodeBlock),
    /// `note`, `tip`, `important`, `warning`, `caution`.
    Admonition {
        kind: AdmonitionKind,
        body: Vec<Block>,
        line: usize,
    },
    /// `toctree` directive.
    Toctree(Toctree),
    /// Position of an explicit label that is not attached to a heading.
    Target { id: String, line: usize },
}

/// Section heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    /// 1 for the title, deeper sections count up.
    pub level: u8,
    /// Inline content.
    pub text: Vec<Inline>,
    /// Text without markup.
    pub plain: String,
    /// Anchor id, unique within the document.
    pub slug: String,
    /// 1-based source line of the heading text.
    pub line: usize,
}

/// A `code-block` directive. The code is kept verbatim and never interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: Option<String>,
    pub caption: Option<String>,
    pub linenos: bool,
    /// Anchor id from the `:name:` option.
    pub id: Option<String>,
    pub code: String,
    pub line: usize,
}

/// Admonition flavours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmonitionKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl AdmonitionKind {
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        match name {
            "note" => Some(Self::Note),
            "tip" => Some(Self::Tip),
            "important" => Some(Self::Important),
            "warning" => Some(Self::Warning),
            "caution" => Some(Self::Caution),
            _ => None,
        }
    }

    /// Directive name, also used as CSS class.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Note => "note",
            Self::Tip => "tip",
            Self::Important => "important",
            Self::Warning => "warning",
            Self::Caution => "caution",
        }
    }

    /// Display title.
    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Note => "Note",
            Self::Tip => "Tip",
            Self::Important => "Important",
            Self::Warning => "Warning",
            Self::Caution => "Caution",
        }
    }
}

/// A `toctree` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toctree {
    pub caption: Option<String>,
    /// Entries are glob patterns.
    pub glob: bool,
    /// Contribute to navigation only; not rendered in the page body.
    pub hidden: bool,
    /// Depth of the inline rendering (`None` = unlimited).
    pub maxdepth: Option<usize>,
    /// Reverse the resolved entry order.
    pub reversed: bool,
    /// Anchor id from the `:name:` option.
    pub id: Option<String>,
    pub entries: Vec<ToctreeEntry>,
    pub line: usize,
}

/// One line of a toctree body: `target` or `Title <target>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToctreeEntry {
    pub title: Option<String>,
    pub target: String,
    pub line: usize,
}

impl ToctreeEntry {
    /// Whether the target is an absolute URL rather than a document.
    #[must_use]
    pub fn is_external(&self) -> bool {
        is_url(&self.target)
    }
}

/// Whether `target` is an absolute `http(s)://` or `mailto:` URL.
#[must_use]
pub fn is_url(target: &str) -> bool {
    target.starts_with("http://") || target.starts_with("https://") || target.starts_with("mailto:")
}

/// Inline content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Emphasis(String),
    Strong(String),
    Literal(String),
    /// `` `text <url>`_ ``
    Link { text: String, url: String },
    /// `:ref:` / `:doc:`
    Role(RoleRef),
}

/// Reference roles that need resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoleKind {
    /// `:ref:` - explicit label.
    Ref,
    /// `:doc:` - document path with optional `#slug`.
    Doc,
}

impl RoleKind {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Ref => "ref",
            Self::Doc => "doc",
        }
    }
}

/// A reference role occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRef {
    pub kind: RoleKind,
    /// Explicit link text from `Title <target>`.
    pub text: Option<String>,
    pub target: String,
    /// 1-based source line the role starts on.
    pub line: usize,
}

/// An explicit label (`.. _name:` or a `:name:` option).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Normalized label name (lowercase, inner whitespace collapsed).
    pub name: String,
    /// Fragment within the page (heading slug or target id).
    pub fragment: String,
    /// Text used when a `:ref:` has no explicit title.
    pub title: Option<String>,
    pub line: usize,
}

/// Concatenate the text of inline content without markup.
#[must_use]
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(t) | Inline::Emphasis(t) | Inline::Strong(t) | Inline::Literal(t) => {
                out.push_str(t);
            }
            Inline::Link { text, .. } => out.push_str(text),
            Inline::Role(role) => out.push_str(role.text.as_deref().unwrap_or(&role.target)),
        }
    }
    out
}
