//! Document model and markup parser for tome.
//!
//! Sources use a reStructuredText-style markup: underlined (optionally
//! overlined) section headings, paragraphs, bullet lists, `::` literal
//! blocks, explicit labels (`.. _name:`), directives (`.. name:: argument`)
//! and inline roles (`:name:`target``).
//!
//! Recognized directives are `toctree`, `code-block` (aliases `code` and
//! `sourcecode`), and the admonitions `note`, `tip`, `important`, `warning`
//! and `caution`. Anything else fails with a [`ParseError`].
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//!
//! let source = "Generics\n========\n\nSee :ref:`erasure`.\n";
//! let doc = tome_markup::parse_document("java/generics", Path::new("java/generics.rst"), source)
//!     .unwrap();
//!
//! assert_eq!(doc.title, "Generics");
//! assert_eq!(doc.references()[0].target, "erasure");
//! ```

mod directive;
mod error;
mod inline;
mod model;
mod parser;
mod slug;

use std::path::Path;

use sha2::{Digest, Sha256};

pub use error::{ParseError, ParseErrorKind};
pub use model::{
    AdmonitionKind, Block, CodeBlock, Document, Heading, Inline, Label, RoleKind, RoleRef, Toctree,
    ToctreeEntry, is_url, plain_text, walk_blocks,
};
pub use slug::{normalize_label, slugify, title_from_id};

use parser::Parser;

/// Parse one source file into a [`Document`].
///
/// `id` is the document identifier, `source_path` is used for diagnostics
/// and stored on the document.
pub fn parse_document(id: &str, source_path: &Path, source: &str) -> Result<Document, ParseError> {
    let parsed = Parser::new(source_path).parse(source)?;

    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let content_hash = hex::encode(hasher.finalize());

    let mut doc = Document {
        id: id.to_owned(),
        source_path: source_path.to_path_buf(),
        title: String::new(),
        blocks: parsed.blocks,
        labels: parsed.labels,
        fields: parsed.fields,
        content_hash,
    };
    doc.title = doc
        .headings()
        .first()
        .map_or_else(|| title_from_id(id), |h| h.plain.clone());
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(source: &str) -> Document {
        parse_document("guide/page", Path::new("guide/page.rst"), source).unwrap()
    }

    fn parse_err(source: &str) -> ParseError {
        parse_document("guide/page", Path::new("guide/page.rst"), source).unwrap_err()
    }

    fn heading(block: &Block) -> &Heading {
        match block {
            Block::Heading(h) => h,
            other => panic!("expected heading, got {other:?}"),
        }
    }

    #[test]
    fn test_title_from_first_heading() {
        let doc = parse("Type Erasure\n============\n\nBody text.\n");
        assert_eq!(doc.title, "Type Erasure");
        assert_eq!(doc.blocks.len(), 2);
    }

    #[test]
    fn test_title_falls_back_to_id() {
        let doc = parse_document("java/raw_types", Path::new("raw_types.rst"), "Just text.\n").unwrap();
        assert_eq!(doc.title, "Raw Types");
    }

    #[test]
    fn test_heading_levels_follow_first_appearance() {
        let source = "\
=====
Guide
=====

Intro
-----

Details
~~~~~~~

Next
----
";
        let doc = parse(source);
        let levels: Vec<u8> = doc.headings().iter().map(|h| h.level).collect();
        assert_eq!(levels, vec![1, 2, 3, 2]);
        assert_eq!(heading(&doc.blocks[0]).line, 2);
    }

    #[test]
    fn test_repeated_headings_get_unique_slugs() {
        let doc = parse("Example\n=======\n\nExample\n-------\n\nExample\n-------\n");
        let slugs: Vec<&str> = doc.headings().iter().map(|h| h.slug.as_str()).collect();
        assert_eq!(slugs, vec!["example", "example-1", "example-2"]);
    }

    #[test]
    fn test_overline_without_underline_fails() {
        let err = parse_err("=====\nTitle\n\nText\n");
        assert!(matches!(err.kind, ParseErrorKind::MalformedSection(_)));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_label_attaches_to_following_heading() {
        let doc = parse(".. _type-erasure:\n\nType Erasure\n============\n");
        assert_eq!(
            doc.labels,
            vec![Label {
                name: "type-erasure".to_owned(),
                fragment: "type-erasure".to_owned(),
                title: Some("Type Erasure".to_owned()),
                line: 1,
            }]
        );
    }

    #[test]
    fn test_label_without_heading_becomes_target() {
        let doc = parse("Title\n=====\n\n.. _Static Abuse:\n\nNever do this.\n");
        assert_eq!(doc.labels[0].name, "static abuse");
        assert_eq!(doc.labels[0].fragment, "static-abuse");
        assert_eq!(doc.labels[0].title, None);
        assert!(matches!(&doc.blocks[1], Block::Target { id, line: 4 } if id == "static-abuse"));
    }

    #[test]
    fn test_external_target_is_rejected() {
        let err = parse_err(".. _jls: https://docs.oracle.com/\n");
        assert!(matches!(err.kind, ParseErrorKind::MalformedDirective(_)));
    }

    #[test]
    fn test_field_list_marks_orphan() {
        let doc = parse(":orphan:\n:author: Platform team\n\nLoose Page\n==========\n");
        assert!(doc.is_orphan());
        assert_eq!(doc.fields.get("author").map(String::as_str), Some("Platform team"));
        assert_eq!(doc.title, "Loose Page");
    }

    #[test]
    fn test_field_lines_later_in_document_are_text() {
        let doc = parse("Title\n=====\n\n:orphan:\n");
        assert!(!doc.is_orphan());
    }

    #[test]
    fn test_toctree_directive() {
        let source = "\
Index
=====

.. toctree::
   :caption: Java
   :name: java-toc

   java/generics
   Erasure <java/erasure>
";
        let doc = parse(source);
        let toctrees = doc.toctrees();
        assert_eq!(toctrees.len(), 1);
        assert_eq!(toctrees[0].caption.as_deref(), Some("Java"));
        assert_eq!(toctrees[0].id.as_deref(), Some("java-toc"));
        assert_eq!(toctrees[0].entries[1].target, "java/erasure");
        assert_eq!(toctrees[0].entries[1].line, 9);
        assert_eq!(doc.labels[0].name, "java-toc");
        assert_eq!(doc.labels[0].title.as_deref(), Some("Java"));
    }

    #[test]
    fn test_code_block_is_verbatim() {
        let source = "\
.. code-block:: java
   :linenos:

   List<?> items = new ArrayList<>();
   *not emphasis* :java:`not a role`
";
        let doc = parse(source);
        match &doc.blocks[0] {
            Block::CodeBlock(code) => {
                assert_eq!(code.language.as_deref(), Some("java"));
                assert!(code.linenos);
                assert_eq!(
                    code.code,
                    "List<?> items = new ArrayList<>();\n*not emphasis* :java:`not a role`"
                );
            }
            other => panic!("expected code block, got {other:?}"),
        }
    }

    #[test]
    fn test_code_block_without_body_fails() {
        let err = parse_err("Text.\n\n.. code-block:: java\n\nMore text.\n");
        assert_eq!(err.kind, ParseErrorKind::UnterminatedCodeBlock);
        assert_eq!(err.line, 3);
    }

    #[test]
    fn test_unknown_directive_fails_with_location() {
        let err = parse_err("Title\n=====\n\n.. image:: diagram.png\n");
        assert_eq!(
            err,
            ParseError {
                path: PathBuf::from("guide/page.rst"),
                line: 4,
                kind: ParseErrorKind::UnknownDirective("image".to_owned()),
            }
        );
        assert_eq!(
            err.to_string(),
            "guide/page.rst:4: unknown directive type \"image\""
        );
    }

    #[test]
    fn test_comment_is_skipped() {
        let doc = parse(".. this is a comment\n   spanning two lines\n\nText.\n");
        assert_eq!(doc.blocks.len(), 1);
    }

    #[test]
    fn test_substitution_definition_is_rejected() {
        let err = parse_err("Title\n=====\n\n.. |logo| image:: logo.png\n");
        assert_eq!(err.line, 4);
        assert_eq!(
            err.kind,
            ParseErrorKind::MalformedDirective(
                "substitution definition \"|logo|\" is not supported".to_owned()
            )
        );

        let err = parse_err(".. |version| replace:: 1.0\n");
        assert!(matches!(err.kind, ParseErrorKind::MalformedDirective(_)));
    }

    #[test]
    fn test_footnote_and_citation_are_rejected() {
        let err = parse_err("Text.\n\n.. [1] A footnote.\n");
        assert_eq!(err.line, 3);
        assert_eq!(
            err.kind,
            ParseErrorKind::MalformedDirective("footnote or citation \"[1]\" is not supported".to_owned())
        );

        let err = parse_err(".. [JLS] The Java Language Specification.\n");
        assert!(matches!(err.kind, ParseErrorKind::MalformedDirective(_)));
    }

    #[test]
    fn test_admonition_body_is_parsed() {
        let source = "\
.. warning:: Raw types
   lose type safety.

   See :ref:`erasure`.
";
        let doc = parse(source);
        match &doc.blocks[0] {
            Block::Admonition { kind, body, line } => {
                assert_eq!(*kind, AdmonitionKind::Warning);
                assert_eq!(*line, 1);
                assert_eq!(body.len(), 2);
            }
            other => panic!("expected admonition, got {other:?}"),
        }
        let refs = doc.references();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].line, 4);
    }

    #[test]
    fn test_literal_block_after_double_colon() {
        let doc = parse("Example::\n\n    int x = 1;\n      int y;\n\nAfter.\n");
        assert!(matches!(&doc.blocks[0], Block::Paragraph { inlines, .. }
            if inlines == &vec![Inline::Text("Example:".to_owned())]));
        assert!(matches!(&doc.blocks[1], Block::LiteralBlock { text, line: 3 }
            if text == "int x = 1;\n  int y;"));
        assert!(matches!(&doc.blocks[2], Block::Paragraph { .. }));
    }

    #[test]
    fn test_literal_marker_without_body_fails() {
        let err = parse_err("Example::\n\nNot indented.\n");
        assert_eq!(err.kind, ParseErrorKind::UnterminatedCodeBlock);
    }

    #[test]
    fn test_bullet_list() {
        let doc = parse("- first\n- second\n  continued\n\n- third\n\nAfter.\n");
        match &doc.blocks[0] {
            Block::BulletList { items, .. } => {
                assert_eq!(items.len(), 3);
                assert_eq!(items[1], vec![Inline::Text("second\ncontinued".to_owned())]);
            }
            other => panic!("expected list, got {other:?}"),
        }
        assert_eq!(doc.blocks.len(), 2);
    }

    #[test]
    fn test_unknown_role_reports_its_line() {
        let err = parse_err("Title\n=====\n\nUse :java:`List` here.\n");
        assert_eq!(err.kind, ParseErrorKind::UnknownRole("java".to_owned()));
        assert_eq!(err.line, 4);
    }

    #[test]
    fn test_unknown_role_deep_in_paragraph() {
        let err = parse_err("Title\n=====\n\nline one\nline two\nline three :java:`List`\n");
        assert_eq!(err.kind, ParseErrorKind::UnknownRole("java".to_owned()));
        assert_eq!(err.line, 6);
    }

    #[test]
    fn test_role_line_in_multi_line_paragraph_and_list() {
        let doc = parse(
            "Title\n=====\n\nline one\nline two\nline three :ref:`missing`\n\n\
             - item\n  continued :doc:`other`\n",
        );
        let lines: Vec<usize> = doc.references().iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![6, 9]);
    }

    #[test]
    fn test_content_hash_is_sha256_hex() {
        let doc = parse("");
        assert_eq!(
            doc.content_hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_indented_block_is_quote() {
        let doc = parse("Text.\n\n    Quoted text.\n");
        assert!(matches!(&doc.blocks[1], Block::Quote { body, line: 3 } if body.len() == 1));
    }
}
