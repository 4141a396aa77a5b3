//! Line-oriented block parser.
//!
//! The source is split into numbered lines once. Nested bodies (directive
//! content, block quotes) are dedented copies of those lines, so every block
//! keeps the line number it had in the original file.

use std::collections::BTreeMap;
use std::mem;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::directive;
use crate::error::{ParseError, ParseErrorKind};
use crate::inline::{InlineError, parse_inlines};
use crate::model::{AdmonitionKind, Block, Heading, Label, plain_text};
use crate::slug::{SlugAllocator, normalize_label, slugify};

static LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\.\s+_([^:]+):(?:\s+(.*))?$").expect("valid regex"));

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\.\.\s+([A-Za-z0-9](?:[\w.+-]*[A-Za-z0-9])?)::(?:\s+(.*))?$").expect("valid regex")
});

static SUBSTITUTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\.\s+\|([^|]+)\|").expect("valid regex"));

static FOOTNOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.\.\s+\[([^\]]+)\]").expect("valid regex"));

static FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([^:\s][^:]*):(?:\s+(.*))?$").expect("valid regex"));

static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([-*+])\s+(\S.*)$").expect("valid regex"));

const ADORNMENT_CHARS: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

const TAB_WIDTH: usize = 8;

/// One source line with its 1-based number in the original file.
#[derive(Debug, Clone)]
pub(crate) struct Line {
    pub text: String,
    pub no: usize,
}

impl Line {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn indent(&self) -> usize {
        self.text.len() - self.text.trim_start_matches(' ').len()
    }
}

/// Split source text into numbered lines with tabs expanded.
pub(crate) fn split_lines(source: &str) -> Vec<Line> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    source
        .lines()
        .enumerate()
        .map(|(n, text)| Line {
            text: text.replace('\t', &" ".repeat(TAB_WIDTH)),
            no: n + 1,
        })
        .collect()
}

/// Strip the common leading indentation of the non-blank lines.
pub(crate) fn dedent(lines: &[Line]) -> Vec<Line> {
    let min = lines
        .iter()
        .filter(|l| !l.is_blank())
        .map(Line::indent)
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| Line {
            text: if l.is_blank() {
                String::new()
            } else {
                l.text[min..].to_owned()
            },
            no: l.no,
        })
        .collect()
}

/// End (exclusive) of the indented or blank run starting at `start`,
/// with trailing blank lines left outside.
fn indented_end(lines: &[Line], start: usize) -> usize {
    let mut end = start;
    while end < lines.len() && (lines[end].is_blank() || lines[end].indent() > 0) {
        end += 1;
    }
    while end > start && lines[end - 1].is_blank() {
        end -= 1;
    }
    end
}

fn next_non_blank(lines: &[Line], from: usize) -> usize {
    let mut i = from;
    while i < lines.len() && lines[i].is_blank() {
        i += 1;
    }
    i
}

/// The adornment character of `text` if it is a run of at least `min_len`
/// copies of one punctuation character.
fn adornment_char(text: &str, min_len: usize) -> Option<char> {
    let text = text.trim_end();
    let first = text.chars().next()?;
    if !ADORNMENT_CHARS.contains(first) || text.chars().count() < min_len.max(1) {
        return None;
    }
    text.chars().all(|c| c == first).then_some(first)
}

/// Shape of a section heading found at some line.
struct Section {
    title: String,
    adornment: char,
    overline: bool,
    line: usize,
    next: usize,
}

fn section_at(lines: &[Line], i: usize) -> Result<Option<Section>, ParseErrorKind> {
    let text = lines[i].text.trim_end();

    if let Some(ch) = adornment_char(text, 3) {
        let Some(title) = lines.get(i + 1).filter(|l| !l.is_blank()) else {
            return Ok(None);
        };
        let underline = lines.get(i + 2).map(|l| l.text.trim_end());
        if underline.and_then(|u| adornment_char(u, 1)) != Some(ch) {
            return Err(ParseErrorKind::MalformedSection(format!(
                "overline \"{text}\" has no matching underline"
            )));
        }
        return Ok(Some(Section {
            title: title.text.trim().to_owned(),
            adornment: ch,
            overline: true,
            line: title.no,
            next: i + 3,
        }));
    }

    let Some(next) = lines.get(i + 1) else {
        return Ok(None);
    };
    let width = text.chars().count();
    match adornment_char(&next.text, width.min(3)) {
        Some(ch) if next.indent() == 0 => Ok(Some(Section {
            title: text.trim().to_owned(),
            adornment: ch,
            overline: false,
            line: lines[i].no,
            next: i + 2,
        })),
        _ => Ok(None),
    }
}

/// Everything the parser extracts from one file.
pub(crate) struct Parsed {
    pub blocks: Vec<Block>,
    pub labels: Vec<Label>,
    pub fields: BTreeMap<String, String>,
}

/// Parser state shared by a document and all of its nested bodies.
pub(crate) struct Parser<'p> {
    path: &'p Path,
    slugs: SlugAllocator,
    /// Adornment styles in order of first appearance; index + 1 is the level.
    styles: Vec<(char, bool)>,
    labels: Vec<Label>,
    /// Labels waiting for the heading that follows them.
    pending: Vec<(String, usize)>,
    fields: BTreeMap<String, String>,
}

impl<'p> Parser<'p> {
    pub fn new(path: &'p Path) -> Self {
        Self {
            path,
            slugs: SlugAllocator::default(),
            styles: Vec::new(),
            labels: Vec::new(),
            pending: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn parse(mut self, source: &str) -> Result<Parsed, ParseError> {
        let lines = split_lines(source);
        let blocks = self.blocks(&lines, true)?;
        Ok(Parsed {
            blocks,
            labels: self.labels,
            fields: self.fields,
        })
    }

    fn fail(&self, line: usize, kind: ParseErrorKind) -> ParseError {
        ParseError {
            path: self.path.to_path_buf(),
            line,
            kind,
        }
    }

    fn inline_fail(&self, error: InlineError) -> ParseError {
        self.fail(error.line, error.kind)
    }

    fn blocks(&mut self, lines: &[Line], top: bool) -> Result<Vec<Block>, ParseError> {
        let mut out = Vec::new();
        let mut i = 0;

        while i < lines.len() {
            let line = &lines[i];
            if line.is_blank() {
                i += 1;
                continue;
            }

            if line.indent() > 0 {
                let end = indented_end(lines, i);
                let body = self.blocks(&dedent(&lines[i..end]), false)?;
                out.push(Block::Quote {
                    body,
                    line: line.no,
                });
                i = end;
                continue;
            }

            let text = line.text.trim_end();
            if text == ".." || text.starts_with(".. ") {
                i = self.explicit_markup(lines, i, &mut out)?;
                continue;
            }

            if top && out.is_empty() && self.fields.is_empty() && FIELD.is_match(text) {
                i = self.field_list(lines, i);
                continue;
            }

            // Transition line: no block of its own.
            if adornment_char(text, 4).is_some()
                && lines.get(i + 1).is_none_or(Line::is_blank)
            {
                i += 1;
                continue;
            }

            if let Some(section) = section_at(lines, i).map_err(|k| self.fail(line.no, k))? {
                i = section.next;
                let heading = self.heading(section)?;
                out.push(heading);
                continue;
            }

            if BULLET.is_match(text) {
                i = self.bullet_list(lines, i, &mut out)?;
                continue;
            }

            i = self.paragraph(lines, i, &mut out)?;
        }

        self.flush_pending(&mut out);
        Ok(out)
    }

    /// `..` lines: labels, directives, and comments. Substitution
    /// definitions and footnotes are rejected rather than read as comments.
    fn explicit_markup(
        &mut self,
        lines: &[Line],
        i: usize,
        out: &mut Vec<Block>,
    ) -> Result<usize, ParseError> {
        let line = &lines[i];
        let text = line.text.trim_end();
        let end = indented_end(lines, i + 1);

        if let Some(caps) = LABEL.captures(text) {
            let name = caps[1].trim();
            let has_url = caps.get(2).is_some_and(|m| !m.as_str().trim().is_empty());
            if has_url || end > i + 1 {
                return Err(self.fail(
                    line.no,
                    ParseErrorKind::MalformedDirective(format!(
                        "external hyperlink target \"{name}\" is not supported"
                    )),
                ));
            }
            self.label(lines, end, name, line.no, out);
            return Ok(end);
        }

        if let Some(caps) = DIRECTIVE.captures(text) {
            let argument = caps
                .get(2)
                .map(|m| m.as_str().trim())
                .filter(|arg| !arg.is_empty());
            let body = dedent(&lines[i + 1..end]);
            let block = self.directive(&caps[1], argument, &body, line.no)?;
            self.flush_pending(out);
            out.push(block);
            return Ok(end);
        }

        if let Some(caps) = SUBSTITUTION.captures(text) {
            return Err(self.fail(
                line.no,
                ParseErrorKind::MalformedDirective(format!(
                    "substitution definition \"|{}|\" is not supported",
                    &caps[1]
                )),
            ));
        }

        if let Some(caps) = FOOTNOTE.captures(text) {
            return Err(self.fail(
                line.no,
                ParseErrorKind::MalformedDirective(format!(
                    "footnote or citation \"[{}]\" is not supported",
                    &caps[1]
                )),
            ));
        }

        // Comment: skip it together with its indented body.
        Ok(end)
    }

    /// Attach a label to the heading that follows, or emit a target.
    fn label(&mut self, lines: &[Line], next: usize, name: &str, line: usize, out: &mut Vec<Block>) {
        let name = normalize_label(name);

        let mut j = next_non_blank(lines, next);
        while j < lines.len() && LABEL.is_match(lines[j].text.trim_end()) {
            j = next_non_blank(lines, j + 1);
        }
        let heading_follows = j < lines.len()
            && lines[j].indent() == 0
            && matches!(section_at(lines, j), Ok(Some(_)));

        if heading_follows {
            self.pending.push((name, line));
        } else {
            let fragment = self.slugs.allocate(slugify(&name));
            out.push(Block::Target {
                id: fragment.clone(),
                line,
            });
            self.labels.push(Label {
                name,
                fragment,
                title: None,
                line,
            });
        }
    }

    fn flush_pending(&mut self, out: &mut Vec<Block>) {
        for (name, line) in mem::take(&mut self.pending) {
            let fragment = self.slugs.allocate(slugify(&name));
            out.push(Block::Target {
                id: fragment.clone(),
                line,
            });
            self.labels.push(Label {
                name,
                fragment,
                title: None,
                line,
            });
        }
    }

    /// Declare the label of a `:name:` option and return its fragment.
    fn declare_name(&mut self, name: Option<String>, title: Option<&str>, line: usize) -> Option<String> {
        let name = normalize_label(&name?);
        let fragment = self.slugs.allocate(slugify(&name));
        self.labels.push(Label {
            name,
            fragment: fragment.clone(),
            title: title.map(str::to_owned),
            line,
        });
        Some(fragment)
    }

    fn heading(&mut self, section: Section) -> Result<Block, ParseError> {
        let style = (section.adornment, section.overline);
        let index = match self.styles.iter().position(|s| *s == style) {
            Some(index) => index,
            None => {
                self.styles.push(style);
                self.styles.len() - 1
            }
        };
        let level = u8::try_from(index + 1).unwrap_or(u8::MAX);

        let text =
            parse_inlines(&section.title, &[section.line]).map_err(|e| self.inline_fail(e))?;
        let plain = plain_text(&text);
        let slug = self.slugs.allocate(slugify(&plain));

        for (name, line) in mem::take(&mut self.pending) {
            self.labels.push(Label {
                name,
                fragment: slug.clone(),
                title: Some(plain.clone()),
                line,
            });
        }

        Ok(Block::Heading(Heading {
            level,
            text,
            plain,
            slug,
            line: section.line,
        }))
    }

    fn directive(
        &mut self,
        name: &str,
        argument: Option<&str>,
        body: &[Line],
        line: usize,
    ) -> Result<Block, ParseError> {
        match name {
            "toctree" => {
                let (mut toctree, label) =
                    directive::toctree(argument, body, line).map_err(|k| self.fail(line, k))?;
                toctree.id = self.declare_name(label, toctree.caption.as_deref(), line);
                Ok(Block::Toctree(toctree))
            }
            "code-block" | "code" | "sourcecode" => {
                let (mut code, label) =
                    directive::code_block(argument, body, line).map_err(|k| self.fail(line, k))?;
                code.id = self.declare_name(label, code.caption.as_deref(), line);
                Ok(Block::CodeBlock(code))
            }
            other => {
                let Some(kind) = AdmonitionKind::from_name(other) else {
                    return Err(self.fail(line, ParseErrorKind::UnknownDirective(other.to_owned())));
                };
                let content = directive::admonition(other, argument, body, line)
                    .map_err(|k| self.fail(line, k))?;
                let body = self.blocks(&content, false)?;
                Ok(Block::Admonition { kind, body, line })
            }
        }
    }

    fn field_list(&mut self, lines: &[Line], start: usize) -> usize {
        let mut i = start;
        let mut last: Option<String> = None;

        while i < lines.len() && !lines[i].is_blank() {
            let line = &lines[i];
            if line.indent() > 0 {
                if let Some(value) = last.as_ref().and_then(|key| self.fields.get_mut(key)) {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(line.text.trim());
                }
            } else if let Some(caps) = FIELD.captures(line.text.trim_end()) {
                let key = caps[1].trim().to_owned();
                let value = caps.get(2).map_or("", |m| m.as_str().trim()).to_owned();
                self.fields.insert(key.clone(), value);
                last = Some(key);
            } else {
                break;
            }
            i += 1;
        }
        i
    }

    fn bullet_list(
        &mut self,
        lines: &[Line],
        start: usize,
        out: &mut Vec<Block>,
    ) -> Result<usize, ParseError> {
        let marker = lines[start].text.chars().next();
        // Item text with the source line of each of its joined lines.
        let mut items: Vec<(String, Vec<usize>)> = Vec::new();
        let mut i = start;

        while i < lines.len() {
            let line = &lines[i];
            if line.is_blank() {
                let k = next_non_blank(lines, i);
                let continues = lines.get(k).is_some_and(|next| {
                    next.indent() > 0
                        || (next.text.chars().next() == marker && BULLET.is_match(&next.text))
                });
                if !continues {
                    break;
                }
                i = k;
                continue;
            }
            if line.indent() > 0 {
                if let Some((text, nos)) = items.last_mut() {
                    text.push('\n');
                    text.push_str(line.text.trim());
                    nos.push(line.no);
                }
            } else {
                match BULLET.captures(line.text.trim_end()) {
                    Some(caps) if caps[1].chars().next() == marker => {
                        items.push((caps[2].to_owned(), vec![line.no]));
                    }
                    _ => break,
                }
            }
            i += 1;
        }

        let items = items
            .into_iter()
            .map(|(text, nos)| parse_inlines(&text, &nos).map_err(|e| self.inline_fail(e)))
            .collect::<Result<Vec<_>, _>>()?;
        out.push(Block::BulletList {
            items,
            line: lines[start].no,
        });
        Ok(i)
    }

    fn paragraph(
        &mut self,
        lines: &[Line],
        start: usize,
        out: &mut Vec<Block>,
    ) -> Result<usize, ParseError> {
        let line_no = lines[start].no;
        let mut i = start;
        let mut parts = Vec::new();
        let mut nos = Vec::new();
        while i < lines.len() && !lines[i].is_blank() {
            parts.push(lines[i].text.trim());
            nos.push(lines[i].no);
            i += 1;
        }

        let mut text = parts.join("\n");
        let literal_follows = text.ends_with("::");
        if literal_follows {
            if text == "::" {
                text.clear();
            } else if text.ends_with(" ::") || text.ends_with("\n::") {
                text.truncate(text.len() - 2);
                text.truncate(text.trim_end().len());
            } else {
                text.pop();
            }
        }

        if !text.is_empty() {
            let inlines = parse_inlines(&text, &nos).map_err(|e| self.inline_fail(e))?;
            out.push(Block::Paragraph {
                inlines,
                line: line_no,
            });
        }

        if !literal_follows {
            return Ok(i);
        }

        let body_start = next_non_blank(lines, i);
        if body_start >= lines.len() || lines[body_start].indent() == 0 {
            return Err(self.fail(lines[i - 1].no, ParseErrorKind::UnterminatedCodeBlock));
        }
        let end = indented_end(lines, body_start);
        out.push(Block::LiteralBlock {
            text: directive::join_lines(&dedent(&lines[body_start..end])),
            line: lines[body_start].no,
        });
        Ok(end)
    }
}
