//! Page paths and relative links.

/// Output path of a document's page, relative to the output root.
///
/// ```
/// assert_eq!(tome_render::page_path("java/generics"), "java/generics.html");
/// ```
#[must_use]
pub fn page_path(doc: &str) -> String {
    format!("{doc}.html")
}

/// Relative URL from the page at output path `from` to output path `to`.
///
/// The last segment of `from` is the page itself; the base directory is
/// everything before it.
pub(crate) fn relative_path(from: &str, to: &str) -> String {
    let from_segs: Vec<&str> = from.split('/').filter(|s| !s.is_empty()).collect();
    let to_segs: Vec<&str> = to.split('/').filter(|s| !s.is_empty()).collect();

    let from_dir = from_segs.split_last().map_or(&[][..], |(_, dir)| dir);
    let common = from_dir
        .iter()
        .zip(&to_segs)
        .take_while(|(a, b)| a == b)
        .count();

    let ups = "../".repeat(from_dir.len() - common);
    let result = format!("{ups}{}", to_segs[common..].join("/"));
    if result.is_empty() {
        "./".to_owned()
    } else {
        result
    }
}

/// Link from the page of `from_doc` to the page of `to_doc`.
pub(crate) fn page_href(from_doc: &str, to_doc: &str, fragment: Option<&str>) -> String {
    let path = relative_path(&page_path(from_doc), &page_path(to_doc));
    match fragment {
        Some(f) => format!("{path}#{f}"),
        None => path,
    }
}

/// Escape text for HTML content and attribute values.
pub(crate) fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path_same_directory() {
        assert_eq!(relative_path("java/generics.html", "java/wildcards.html"), "wildcards.html");
    }

    #[test]
    fn test_relative_path_deep_to_shallow() {
        assert_eq!(relative_path("java/collections/list.html", "index.html"), "../../index.html");
    }

    #[test]
    fn test_relative_path_shallow_to_deep() {
        assert_eq!(relative_path("index.html", "java/generics.html"), "java/generics.html");
    }

    #[test]
    fn test_relative_path_sibling_directory() {
        assert_eq!(relative_path("java/generics.html", "rust/traits.html"), "../rust/traits.html");
    }

    #[test]
    fn test_page_href_with_fragment() {
        assert_eq!(page_href("child/b", "a", Some("intro")), "../a.html#intro");
        assert_eq!(page_href("a", "a", None), "a.html");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;");
    }
}
