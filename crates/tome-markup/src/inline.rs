//! Inline markup: emphasis, literals, hyperlinks and roles.
//!
//! Start-strings follow the usual reStructuredText recognition rules: they
//! must sit at the start of the text or after whitespace or an opening
//! punctuation character, and must be followed by a non-whitespace
//! character. Anything else is literal text, so `a*b` and `2 * 3` stay plain.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseErrorKind;
use crate::model::{Inline, RoleKind, RoleRef};

/// `:name:` immediately followed by a backtick.
static ROLE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([A-Za-z][\w.+-]*):`").expect("valid regex"));

/// `Title <target>` inside a role or hyperlink.
static TITLED_TARGET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^(.*?)\s*<([^<>]+)>$").expect("valid regex"));

/// An inline problem with the source line it occurred on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InlineError {
    pub line: usize,
    pub kind: ParseErrorKind,
}

/// Parse one block's worth of inline text.
///
/// `s` holds the block's source lines joined with `\n`; `lines[k]` is the
/// 1-based source line of the k-th of them. Roles and errors carry the line
/// their start-string sits on.
pub(crate) fn parse_inlines(s: &str, lines: &[usize]) -> Result<Vec<Inline>, InlineError> {
    let mut out = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while let Some(ch) = s[i..].chars().next() {
        if ch == '\\' {
            // Escaped character: keep it verbatim, drop the backslash.
            if let Some(next) = s[i + 1..].chars().next() {
                text.push(next);
                i += 1 + next.len_utf8();
            } else {
                i += 1;
            }
            continue;
        }

        if is_start(s, i) {
            let line = line_at(s, i, lines);
            let parsed = parse_markup(s, i, line).map_err(|kind| InlineError { line, kind })?;
            if let Some((inline, end)) = parsed {
                flush(&mut text, &mut out);
                out.push(inline);
                i = end;
                continue;
            }
        }

        text.push(ch);
        i += ch.len_utf8();
    }

    flush(&mut text, &mut out);
    Ok(out)
}

/// Source line of byte offset `i`.
fn line_at(s: &str, i: usize, lines: &[usize]) -> usize {
    let row = s[..i].bytes().filter(|b| *b == b'\n').count();
    lines.get(row).or(lines.last()).copied().unwrap_or(0)
}

/// Try to parse a markup construct starting at byte `i`.
///
/// Returns the inline and the byte offset just past it, or `None` when the
/// character at `i` does not begin markup.
fn parse_markup(
    s: &str,
    i: usize,
    line: usize,
) -> Result<Option<(Inline, usize)>, ParseErrorKind> {
    let rest = &s[i..];

    if rest.starts_with("``") && followed_by_text(s, i + 2) {
        let body_start = i + 2;
        let close = s[body_start..]
            .find("``")
            .ok_or(ParseErrorKind::UnterminatedInline("inline literal"))?;
        let end = body_start + close;
        return Ok(Some((Inline::Literal(s[body_start..end].to_owned()), end + 2)));
    }

    if rest.starts_with("**") && followed_by_text(s, i + 2) {
        let body_start = i + 2;
        let close = s[body_start..]
            .find("**")
            .ok_or(ParseErrorKind::UnterminatedInline("strong emphasis"))?;
        let end = body_start + close;
        return Ok(Some((Inline::Strong(s[body_start..end].to_owned()), end + 2)));
    }

    if rest.starts_with('*') && followed_by_text(s, i + 1) {
        let body_start = i + 1;
        let close = s[body_start..]
            .find('*')
            .ok_or(ParseErrorKind::UnterminatedInline("emphasis"))?;
        let end = body_start + close;
        return Ok(Some((Inline::Emphasis(s[body_start..end].to_owned()), end + 1)));
    }

    if let Some(caps) = ROLE_PREFIX.captures(rest) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        let body_start = i + caps.get(0).map_or(0, |m| m.end());
        let (body, end) = interpreted_body(s, body_start)?;
        let inline = role_inline(name, body, line)?;
        return Ok(Some((inline, end)));
    }

    if rest.starts_with('`') && followed_by_text(s, i + 1) {
        let (body, mut end) = interpreted_body(s, i + 1)?;
        if s[end..].starts_with('_') {
            end += if s[end..].starts_with("__") { 2 } else { 1 };
            let (title, url) = split_titled_target(body);
            let Some(url) = url else {
                return Err(ParseErrorKind::MalformedHyperlink(body.to_owned()));
            };
            let text = title.unwrap_or_else(|| url.clone());
            return Ok(Some((Inline::Link { text, url }, end)));
        }
        // Default role renders like a title reference.
        return Ok(Some((Inline::Emphasis(body.to_owned()), end)));
    }

    Ok(None)
}

/// Read interpreted text up to the closing backtick starting at `start`.
fn interpreted_body(s: &str, start: usize) -> Result<(&str, usize), ParseErrorKind> {
    let close = s[start..]
        .find('`')
        .ok_or(ParseErrorKind::UnterminatedInline("interpreted text"))?;
    let end = start + close;
    Ok((&s[start..end], end + 1))
}

fn role_inline(name: &str, body: &str, line: usize) -> Result<Inline, ParseErrorKind> {
    let kind = match name {
        "ref" => RoleKind::Ref,
        "doc" => RoleKind::Doc,
        "code" | "literal" => return Ok(Inline::Literal(body.to_owned())),
        other => return Err(ParseErrorKind::UnknownRole(other.to_owned())),
    };
    let (title, target) = split_titled_target(body);
    Ok(Inline::Role(RoleRef {
        kind,
        text: if target.is_some() { title } else { None },
        target: target.unwrap_or_else(|| collapse_whitespace(body)),
        line,
    }))
}

/// Split `Title <target>` into its parts; plain text yields `(None, None)`.
pub(crate) fn split_titled_target(body: &str) -> (Option<String>, Option<String>) {
    match TITLED_TARGET.captures(body.trim()) {
        Some(caps) => {
            let title = caps
                .get(1)
                .map(|m| collapse_whitespace(m.as_str()))
                .filter(|t| !t.is_empty());
            let target = caps.get(2).map(|m| m.as_str().trim().to_owned());
            (title, target)
        }
        None => (None, None),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Start-string position check.
fn is_start(s: &str, i: usize) -> bool {
    match s[..i].chars().next_back() {
        None => true,
        Some(prev) => prev.is_whitespace() || "([{<'\"-/:".contains(prev),
    }
}

fn followed_by_text(s: &str, j: usize) -> bool {
    s.get(j..)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| !c.is_whitespace())
}

fn flush(text: &mut String, out: &mut Vec<Inline>) {
    if !text.is_empty() {
        out.push(Inline::Text(std::mem::take(text)));
    }
}
