//! HTML for the body of one page.

use std::collections::HashSet;
use std::fmt::Write;

use tome_markup::{Block, CodeBlock, Document, Inline};
use tome_site::{ResolvedToctree, TocEntry};

use crate::util::{escape, page_href};
use crate::{RenderError, SiteContext};

/// Writes the blocks of one document.
///
/// Toctree directives are matched to their resolved form by position: the
/// n-th toctree met in a depth-first walk is the n-th resolved toctree of
/// the document.
pub(crate) struct BodyWriter<'a> {
    doc: &'a Document,
    site: &'a SiteContext<'a>,
    toctrees: &'a [ResolvedToctree],
    next_toctree: usize,
    out: String,
}

impl<'a> BodyWriter<'a> {
    pub(crate) fn new(doc: &'a Document, site: &'a SiteContext<'a>) -> Self {
        Self {
            doc,
            site,
            toctrees: site.xref.toctrees(&doc.id),
            next_toctree: 0,
            out: String::with_capacity(4096),
        }
    }

    pub(crate) fn finish(mut self) -> Result<String, RenderError> {
        let doc = self.doc;
        self.blocks(&doc.blocks)?;
        Ok(self.out)
    }

    fn blocks(&mut self, blocks: &[Block]) -> Result<(), RenderError> {
        for block in blocks {
            self.block(block)?;
        }
        Ok(())
    }

    fn block(&mut self, block: &Block) -> Result<(), RenderError> {
        match block {
            Block::Heading(h) => {
                let level = h.level.min(6);
                let _ = write!(self.out, "<h{level} id=\"{}\">", escape(&h.slug));
                self.inlines(&h.text)?;
                let _ = writeln!(
                    self.out,
                    "<a class=\"headerlink\" href=\"#{}\">\u{b6}</a></h{level}>",
                    escape(&h.slug)
                );
            }
            Block::Paragraph { inlines, .. } => {
                self.out.push_str("<p>");
                self.inlines(inlines)?;
                self.out.push_str("</p>\n");
            }
            Block::BulletList { items, .. } => {
                self.out.push_str("<ul>\n");
                for item in items {
                    self.out.push_str("<li>");
                    self.inlines(item)?;
                    self.out.push_str("</li>\n");
                }
                self.out.push_str("</ul>\n");
            }
            Block::Quote { body, .. } => {
                self.out.push_str("<blockquote>\n");
                self.blocks(body)?;
                self.out.push_str("</blockquote>\n");
            }
            Block::LiteralBlock { text, .. } => {
                let _ = writeln!(
                    self.out,
                    "<pre class=\"literal-block\"><code>{}</code></pre>",
                    escape(text)
                );
            }
            Block::CodeBlock(code) => self.code_block(code),
            Block::Admonition { kind, body, .. } => {
                let _ = writeln!(self.out, "<div class=\"admonition {}\">", kind.name());
                let _ = writeln!(self.out, "<p class=\"admonition-title\">{}</p>", kind.title());
                self.blocks(body)?;
                self.out.push_str("</div>\n");
            }
            Block::Toctree(_) => self.toctree()?,
            Block::Target { id, .. } => {
                let _ = writeln!(self.out, "<span id=\"{}\"></span>", escape(id));
            }
        }
        Ok(())
    }

    fn inlines(&mut self, inlines: &[Inline]) -> Result<(), RenderError> {
        for inline in inlines {
            match inline {
                Inline::Text(t) => self.out.push_str(&escape(t)),
                Inline::Emphasis(t) => {
                    let _ = write!(self.out, "<em>{}</em>", escape(t));
                }
                Inline::Strong(t) => {
                    let _ = write!(self.out, "<strong>{}</strong>", escape(t));
                }
                Inline::Literal(t) => {
                    let _ = write!(self.out, "<code class=\"literal\">{}</code>", escape(t));
                }
                Inline::Link { text, url } => {
                    let _ = write!(
                        self.out,
                        "<a class=\"reference external\" href=\"{}\">{}</a>",
                        escape(url),
                        escape(text)
                    );
                }
                Inline::Role(role) => {
                    let target = self.site.xref.target(&self.doc.id, role).ok_or_else(|| {
                        RenderError::Unresolved {
                            doc: self.doc.id.clone(),
                            target: role.target.clone(),
                        }
                    })?;
                    let href = page_href(&self.doc.id, &target.doc, target.fragment.as_deref());
                    let text = role.text.as_deref().unwrap_or(&target.title);
                    let _ = write!(
                        self.out,
                        "<a class=\"reference internal\" href=\"{}\">{}</a>",
                        escape(&href),
                        escape(text)
                    );
                }
            }
        }
        Ok(())
    }

    fn code_block(&mut self, code: &CodeBlock) {
        self.out.push_str("<div class=\"code-block\"");
        if let Some(id) = &code.id {
            let _ = write!(self.out, " id=\"{}\"", escape(id));
        }
        self.out.push_str(">\n");
        if let Some(caption) = &code.caption {
            let _ = writeln!(self.out, "<div class=\"code-caption\">{}</div>", escape(caption));
        }

        self.out.push_str("<pre><code");
        if let Some(lang) = &code.language {
            let _ = write!(self.out, " class=\"language-{}\"", escape(lang));
        }
        self.out.push('>');
        if code.linenos {
            let lines: Vec<&str> = code.code.lines().collect();
            let width = lines.len().to_string().len();
            for (i, line) in lines.iter().enumerate() {
                if i > 0 {
                    self.out.push('\n');
                }
                let _ = write!(
                    self.out,
                    "<span class=\"lineno\">{:>width$}</span>{}",
                    i + 1,
                    escape(line)
                );
            }
        } else {
            self.out.push_str(&escape(&code.code));
        }
        self.out.push_str("</code></pre>\n</div>\n");
    }

    fn toctree(&mut self) -> Result<(), RenderError> {
        let toctrees = self.toctrees;
        let Some(toctree) = toctrees.get(self.next_toctree) else {
            return Err(RenderError::Unresolved {
                doc: self.doc.id.clone(),
                target: "toctree".to_owned(),
            });
        };
        self.next_toctree += 1;

        if toctree.hidden {
            if let Some(id) = &toctree.id {
                let _ = writeln!(self.out, "<span id=\"{}\"></span>", escape(id));
            }
            return Ok(());
        }

        self.out.push_str("<div class=\"toctree-wrapper\"");
        if let Some(id) = &toctree.id {
            let _ = write!(self.out, " id=\"{}\"", escape(id));
        }
        self.out.push_str(">\n");
        if let Some(caption) = &toctree.caption {
            let _ = writeln!(self.out, "<p class=\"caption\">{}</p>", escape(caption));
        }
        self.toctree_list(toctree);
        self.out.push_str("</div>\n");
        Ok(())
    }

    /// Nested entry list, descending into each document's own toctrees
    /// until `maxdepth` levels are shown. A document listed more than once
    /// is expanded only where it first appears.
    fn toctree_list(&mut self, toctree: &ResolvedToctree) {
        if toctree.entries.is_empty() {
            return;
        }
        let limit = toctree.maxdepth.unwrap_or(usize::MAX);
        let mut stack: Vec<(Vec<TocEntry>, usize)> = vec![(toctree.entries.clone(), 0)];
        let mut expanded: HashSet<String> = HashSet::new();
        self.out.push_str("<ul>\n");

        loop {
            let depth = stack.len();
            let Some((entries, pos)) = stack.last_mut() else {
                break;
            };
            let Some(entry) = entries.get(*pos).cloned() else {
                stack.pop();
                self.out.push_str("</ul>\n");
                if !stack.is_empty() {
                    self.out.push_str("</li>\n");
                }
                continue;
            };
            *pos += 1;

            match entry {
                TocEntry::External { title, url } => {
                    let _ = writeln!(
                        self.out,
                        "<li><a class=\"reference external\" href=\"{}\">{}</a></li>",
                        escape(&url),
                        escape(&title)
                    );
                }
                TocEntry::Doc { id, title } => {
                    let title = title
                        .as_deref()
                        .or_else(|| self.site.xref.title(&id))
                        .unwrap_or(&id);
                    let _ = write!(
                        self.out,
                        "<li><a class=\"reference internal\" href=\"{}\">{}</a>",
                        escape(&page_href(&self.doc.id, &id, None)),
                        escape(title)
                    );
                    let children: Vec<TocEntry> = if depth < limit && expanded.insert(id.clone()) {
                        self.site
                            .xref
                            .toctrees(&id)
                            .iter()
                            .flat_map(|t| t.entries.iter().cloned())
                            .collect()
                    } else {
                        Vec::new()
                    };
                    if children.is_empty() {
                        self.out.push_str("</li>\n");
                    } else {
                        self.out.push_str("\n<ul>\n");
                        stack.push((children, 0));
                    }
                }
            }
        }
    }
}
