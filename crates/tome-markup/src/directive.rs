//! Directive option handling and the per-kind directive builders.
//!
//! The block parser hands each builder the directive argument and its
//! dedented body. Leading `:option: value` lines form the option list; the
//! remaining lines are the directive content.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ParseErrorKind;
use crate::inline::split_titled_target;
use crate::model::{CodeBlock, Toctree, ToctreeEntry};
use crate::parser::{Line, dedent};

static OPTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:([A-Za-z][\w-]*):(?:\s+(.*))?$").expect("valid regex"));

/// A body line that opens with a role is content, not an option.
static ROLE_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:[\w.+-]+:`").expect("valid regex"));

#[derive(Clone, Copy, PartialEq, Eq)]
enum OptionKind {
    /// Present or absent, never takes a value.
    Flag,
    /// Requires a value.
    Value,
}

const TOCTREE_OPTIONS: &[(&str, OptionKind)] = &[
    ("caption", OptionKind::Value),
    ("glob", OptionKind::Flag),
    ("hidden", OptionKind::Flag),
    ("maxdepth", OptionKind::Value),
    ("reversed", OptionKind::Flag),
    ("name", OptionKind::Value),
];

const CODE_BLOCK_OPTIONS: &[(&str, OptionKind)] = &[
    ("caption", OptionKind::Value),
    ("linenos", OptionKind::Flag),
    ("name", OptionKind::Value),
];

/// Validated options of one directive.
#[derive(Debug, Default)]
struct Options(BTreeMap<String, Option<String>>);

impl Options {
    fn flag(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    fn value(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Option::as_deref)
    }
}

/// Split leading option lines off `body` and validate them against `allowed`.
fn split_options<'l>(
    directive: &str,
    body: &'l [Line],
    allowed: &[(&str, OptionKind)],
) -> Result<(Options, &'l [Line]), ParseErrorKind> {
    let mut options = Options::default();
    let mut consumed = 0;

    for line in body {
        let text = line.text.trim_end();
        if text.is_empty() || !text.starts_with(':') || ROLE_START.is_match(text) {
            break;
        }
        let Some(caps) = OPTION_LINE.captures(text) else {
            return Err(ParseErrorKind::MalformedDirective(format!(
                "invalid option line \"{text}\" in \"{directive}\""
            )));
        };
        let name = &caps[1];
        let value = caps
            .get(2)
            .map(|m| m.as_str().trim().to_owned())
            .filter(|v| !v.is_empty());

        let Some(&(_, kind)) = allowed.iter().find(|(known, _)| *known == name) else {
            return Err(ParseErrorKind::UnknownOption {
                directive: directive.to_owned(),
                option: name.to_owned(),
            });
        };
        match (kind, &value) {
            (OptionKind::Flag, Some(_)) => {
                return Err(ParseErrorKind::MalformedDirective(format!(
                    "option \":{name}:\" of \"{directive}\" takes no value"
                )));
            }
            (OptionKind::Value, None) => {
                return Err(ParseErrorKind::MalformedDirective(format!(
                    "option \":{name}:\" of \"{directive}\" requires a value"
                )));
            }
            _ => {}
        }
        if options.0.insert(name.to_owned(), value).is_some() {
            return Err(ParseErrorKind::MalformedDirective(format!(
                "duplicate option \":{name}:\" in \"{directive}\""
            )));
        }
        consumed += 1;
    }

    Ok((options, &body[consumed..]))
}

/// Build a toctree. Returns the directive and its `:name:` option.
pub(crate) fn toctree(
    argument: Option<&str>,
    body: &[Line],
    line: usize,
) -> Result<(Toctree, Option<String>), ParseErrorKind> {
    if let Some(arg) = argument {
        return Err(ParseErrorKind::MalformedDirective(format!(
            "toctree takes no argument, got \"{arg}\""
        )));
    }
    let (options, content) = split_options("toctree", body, TOCTREE_OPTIONS)?;

    let maxdepth = options
        .value("maxdepth")
        .map(|raw| {
            raw.parse::<usize>()
                .ok()
                .filter(|depth| *depth > 0)
                .ok_or_else(|| {
                    ParseErrorKind::MalformedDirective(format!(
                        "maxdepth must be a positive integer, got \"{raw}\""
                    ))
                })
        })
        .transpose()?;

    let entries = content
        .iter()
        .filter(|l| !l.is_blank())
        .map(|l| {
            let text = l.text.trim();
            match split_titled_target(text) {
                (title, Some(target)) => ToctreeEntry {
                    title,
                    target,
                    line: l.no,
                },
                (_, None) => ToctreeEntry {
                    title: None,
                    target: text.to_owned(),
                    line: l.no,
                },
            }
        })
        .collect();

    let toctree = Toctree {
        caption: options.value("caption").map(str::to_owned),
        glob: options.flag("glob"),
        hidden: options.flag("hidden"),
        maxdepth,
        reversed: options.flag("reversed"),
        id: None,
        entries,
        line,
    };
    Ok((toctree, options.value("name").map(str::to_owned)))
}

/// Build a code block. The content is kept verbatim after dedenting.
pub(crate) fn code_block(
    argument: Option<&str>,
    body: &[Line],
    line: usize,
) -> Result<(CodeBlock, Option<String>), ParseErrorKind> {
    if argument.is_some_and(|arg| arg.split_whitespace().count() > 1) {
        return Err(ParseErrorKind::MalformedDirective(
            "code-block takes a single language argument".to_owned(),
        ));
    }
    let (options, content) = split_options("code-block", body, CODE_BLOCK_OPTIONS)?;

    let start = content.iter().position(|l| !l.is_blank());
    let Some(start) = start else {
        return Err(ParseErrorKind::UnterminatedCodeBlock);
    };
    let code = join_lines(&dedent(&content[start..]));

    let block = CodeBlock {
        language: argument.map(str::to_owned),
        caption: options.value("caption").map(str::to_owned),
        linenos: options.flag("linenos"),
        id: None,
        code,
        line,
    };
    Ok((block, options.value("name").map(str::to_owned)))
}

/// Collect the content lines of an admonition, argument first.
pub(crate) fn admonition(
    name: &str,
    argument: Option<&str>,
    body: &[Line],
    line: usize,
) -> Result<Vec<Line>, ParseErrorKind> {
    let (_, content) = split_options(name, body, &[])?;

    let mut lines = Vec::with_capacity(content.len() + 1);
    if let Some(arg) = argument {
        lines.push(Line {
            text: arg.to_owned(),
            no: line,
        });
    }
    lines.extend(content.iter().cloned());

    if lines.iter().all(Line::is_blank) {
        return Err(ParseErrorKind::MalformedDirective(format!(
            "\"{name}\" directive has no content"
        )));
    }
    Ok(lines)
}

/// Join lines with `\n`, dropping trailing blank lines.
pub(crate) fn join_lines(lines: &[Line]) -> String {
    let end = lines
        .iter()
        .rposition(|l| !l.is_blank())
        .map_or(0, |last| last + 1);
    lines[..end]
        .iter()
        .map(|l| l.text.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}
