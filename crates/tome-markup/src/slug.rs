//! Identifier helpers shared by the parser and resolver.

use std::collections::HashMap;

/// Turn heading text into an anchor id.
///
/// Lowercases, keeps alphanumerics, and joins everything else into single
/// hyphens: `"Bounded Generics (Part 2)"` becomes `"bounded-generics-part-2"`.
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        "section".to_owned()
    } else {
        slug
    }
}

/// Normalize a label name: lowercase with inner whitespace collapsed.
#[must_use]
pub fn normalize_label(name: &str) -> String {
    name.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Hands out slugs unique within one document.
#[derive(Default)]
pub(crate) struct SlugAllocator {
    seen: HashMap<String, usize>,
}

impl SlugAllocator {
    /// First use of a slug returns it unchanged; repeats get `-1`, `-2`, ...
    pub fn allocate(&mut self, base: String) -> String {
        let count = self.seen.entry(base.clone()).or_insert(0);
        let slug = if *count == 0 {
            base
        } else {
            format!("{base}-{count}")
        };
        *count += 1;
        slug
    }
}

/// Derive a title from the last identifier segment.
///
/// `java/type_erasure` becomes `"Type Erasure"`.
#[must_use]
pub fn title_from_id(id: &str) -> String {
    let slug = id.rsplit_once('/').map_or(id, |(_, last)| last);
    let mut title = String::with_capacity(slug.len());
    for word in slug.split(['-', '_', ' ']).filter(|w| !w.is_empty()) {
        if !title.is_empty() {
            title.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            title.extend(first.to_uppercase());
            title.push_str(chars.as_str());
        }
    }
    if title.is_empty() {
        "Untitled".to_owned()
    } else {
        title
    }
}
