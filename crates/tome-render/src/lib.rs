//! HTML rendering for tome.
//!
//! A [`Renderer`] turns one parsed [`Document`] into one standalone HTML
//! page, using the frozen [`XrefTable`] for links and the [`NavTree`] for
//! the sidebar and breadcrumbs. Rendering reads shared state only, so pages
//! can be rendered on any number of threads. The output for a given input
//! is byte-for-byte stable.
//!
//! Code blocks are emitted as `<pre><code class="language-X">` with the
//! code escaped and otherwise untouched; highlighting is left to CSS or
//! client-side tooling.

mod html;
mod template;
mod theme;
mod util;

use thiserror::Error;
use tome_markup::{Document, Heading};
use tome_site::{NavIndex, NavItem, NavTree, XrefTable};

pub use theme::{STYLESHEET, STYLESHEET_PATH, ThemeSettings};
pub use util::page_path;

use html::BodyWriter;
use template::{BreadcrumbData, NavItemData, PageData, TocData, render_page};
use theme::Theme;
use util::{page_href, relative_path};

/// Rendering failures.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown theme \"{0}\" (available: default)")]
    UnknownTheme(String),

    #[error("unknown option \"{option}\" for theme \"{theme}\"")]
    UnknownOption { theme: String, option: String },

    #[error("invalid value \"{value}\" for theme option \"{option}\": expected true or false")]
    InvalidOption { option: String, value: String },

    /// A reference the cross-reference table does not know. Only happens
    /// when a document is rendered against a table built from another corpus.
    #[error("{doc}: reference to \"{target}\" was not resolved")]
    Unresolved { doc: String, target: String },
}

/// Shared, read-only site state for rendering.
#[derive(Debug)]
pub struct SiteContext<'a> {
    pub xref: &'a XrefTable,
    pub nav: &'a NavTree,
    index: NavIndex,
}

impl<'a> SiteContext<'a> {
    pub fn new(xref: &'a XrefTable, nav: &'a NavTree) -> Self {
        Self {
            xref,
            nav,
            index: nav.index(),
        }
    }
}

/// One rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub doc_id: String,
    /// Output path relative to the output root, `/`-separated.
    pub path: String,
    pub html: String,
}

/// Renders documents with one validated theme.
#[derive(Debug, Clone)]
pub struct Renderer {
    theme: Theme,
}

impl Renderer {
    /// Validate the theme name and options.
    pub fn new(settings: &ThemeSettings) -> Result<Self, RenderError> {
        Ok(Self {
            theme: Theme::from_settings(settings)?,
        })
    }

    /// Stable string that changes whenever the theme would render a page
    /// differently.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        self.theme.fingerprint()
    }

    /// Render `doc` as a complete HTML page.
    pub fn render(&self, doc: &Document, site: &SiteContext<'_>) -> Result<RenderedPage, RenderError> {
        let path = page_path(&doc.id);
        let html_content = BodyWriter::new(doc, site).finish()?;

        let breadcrumbs = if self.theme.show_breadcrumbs {
            site.nav
                .breadcrumbs(&doc.id)
                .into_iter()
                .map(|crumb| BreadcrumbData {
                    href: page_href(&doc.id, &crumb.doc, None),
                    title: crumb.title,
                })
                .collect()
        } else {
            Vec::new()
        };

        let toc = if self.theme.show_page_toc {
            doc.headings().into_iter().filter(|h| h.level >= 2).map(toc_entry).collect()
        } else {
            Vec::new()
        };

        let page = PageData {
            title: &doc.title,
            project_name: &self.theme.project_name,
            home_href: page_href(&doc.id, site.nav.home_doc().unwrap_or(&doc.id), None),
            css_href: relative_path(&path, STYLESHEET_PATH),
            html_content,
            breadcrumbs,
            toc,
            navigation: nav_items(&site.index.items, &doc.id),
            footer: self.theme.footer.as_deref(),
        };

        tracing::debug!(doc = %doc.id, %path, "Rendered page");
        Ok(RenderedPage {
            doc_id: doc.id.clone(),
            html: render_page(&page),
            path,
        })
    }
}

fn toc_entry(heading: &Heading) -> TocData {
    TocData {
        level: heading.level,
        title: heading.plain.clone(),
        id: heading.slug.clone(),
    }
}

/// Sidebar entries with links relative to `current`.
fn nav_items(items: &[NavItem], current: &str) -> Vec<NavItemData> {
    items
        .iter()
        .map(|item| NavItemData {
            title: item.title.clone(),
            href: match (&item.doc, &item.url) {
                (Some(doc), _) => Some(page_href(current, doc, None)),
                (None, Some(url)) => Some(url.clone()),
                (None, None) => None,
            },
            is_active: item.doc.as_deref() == Some(current),
            children: nav_items(&item.children, current),
        })
        .collect()
}
