//! Page layout around the rendered body.

use std::fmt::Write;

use crate::util::escape;

/// Navigation item in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NavItemData {
    pub(crate) title: String,
    /// Link target; `None` for captioned groups.
    pub(crate) href: Option<String>,
    pub(crate) children: Vec<NavItemData>,
    pub(crate) is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BreadcrumbData {
    pub(crate) title: String,
    pub(crate) href: String,
}

/// Entry of the "On this page" list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TocData {
    pub(crate) level: u8,
    pub(crate) title: String,
    pub(crate) id: String,
}

/// Everything one page shows.
#[derive(Debug)]
pub(crate) struct PageData<'a> {
    pub(crate) title: &'a str,
    pub(crate) project_name: &'a str,
    pub(crate) home_href: String,
    pub(crate) css_href: String,
    pub(crate) html_content: String,
    pub(crate) breadcrumbs: Vec<BreadcrumbData>,
    pub(crate) toc: Vec<TocData>,
    pub(crate) navigation: Vec<NavItemData>,
    pub(crate) footer: Option<&'a str>,
}

/// Render a complete HTML page.
pub(crate) fn render_page(page: &PageData<'_>) -> String {
    let mut html = String::with_capacity(8192 + page.html_content.len());

    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    let _ = writeln!(
        html,
        "<title>{} - {}</title>",
        escape(page.title),
        escape(page.project_name)
    );
    let _ = writeln!(html, "<link rel=\"stylesheet\" href=\"{}\">", escape(&page.css_href));
    html.push_str("</head>\n<body>\n<div class=\"layout\">\n");

    render_sidebar(&mut html, page);

    html.push_str("<main class=\"content\">\n");
    render_breadcrumbs(&mut html, &page.breadcrumbs);
    html.push_str("<article>\n");
    html.push_str(&page.html_content);
    html.push_str("</article>\n");
    if let Some(footer) = page.footer {
        let _ = writeln!(html, "<footer class=\"footer\">{}</footer>", escape(footer));
    }
    html.push_str("</main>\n");

    render_toc(&mut html, &page.toc);

    html.push_str("</div>\n</body>\n</html>\n");
    html
}

fn render_sidebar(html: &mut String, page: &PageData<'_>) {
    html.push_str("<aside class=\"sidebar\">\n");
    let _ = writeln!(
        html,
        "<a class=\"project\" href=\"{}\">{}</a>",
        escape(&page.home_href),
        escape(page.project_name)
    );
    if !page.navigation.is_empty() {
        html.push_str("<nav>\n<ul>\n");
        render_nav_items(html, &page.navigation);
        html.push_str("</ul>\n</nav>\n");
    }
    html.push_str("</aside>\n");
}

fn render_nav_items(html: &mut String, items: &[NavItemData]) {
    for item in items {
        html.push_str("<li>");
        match &item.href {
            Some(href) => {
                let class = if item.is_active { " class=\"current\"" } else { "" };
                let _ = write!(
                    html,
                    "<a href=\"{}\"{class}>{}</a>",
                    escape(href),
                    escape(&item.title)
                );
            }
            None => {
                let _ = write!(html, "<span class=\"caption\">{}</span>", escape(&item.title));
            }
        }
        if item.children.is_empty() {
            html.push_str("</li>\n");
        } else {
            html.push_str("\n<ul>\n");
            render_nav_items(html, &item.children);
            html.push_str("</ul>\n</li>\n");
        }
    }
}

fn render_breadcrumbs(html: &mut String, breadcrumbs: &[BreadcrumbData]) {
    if breadcrumbs.is_empty() {
        return;
    }
    html.push_str("<nav class=\"breadcrumbs\">\n<ol>\n");
    for crumb in breadcrumbs {
        let _ = writeln!(
            html,
            "<li class=\"breadcrumb-item\"><a href=\"{}\">{}</a></li>",
            escape(&crumb.href),
            escape(&crumb.title)
        );
    }
    html.push_str("</ol>\n</nav>\n");
}

fn render_toc(html: &mut String, toc: &[TocData]) {
    if toc.is_empty() {
        return;
    }
    html.push_str("<aside class=\"page-toc\">\n<h3>On this page</h3>\n<ul>\n");
    for entry in toc {
        let class = if entry.level >= 3 { " class=\"nested\"" } else { "" };
        let _ = writeln!(
            html,
            "<li{class}><a href=\"#{}\">{}</a></li>",
            escape(&entry.id),
            escape(&entry.title)
        );
    }
    html.push_str("</ul>\n</aside>\n");
}
