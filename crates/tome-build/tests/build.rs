//! End-to-end builds against temporary source trees.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tome_build::{BuildError, BuildSettings, StaticSiteBuilder, WriteError};
use tome_config::Config;
use tome_render::ThemeSettings;
use tome_site::NavigationError;

struct Project {
    tmp: TempDir,
}

impl Project {
    fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
        }
    }

    fn source(&self) -> PathBuf {
        self.tmp.path().join("docs")
    }

    fn output(&self) -> PathBuf {
        self.tmp.path().join("site")
    }

    fn write(&self, rel: &str, content: &str) -> &Self {
        let path = self.source().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    fn settings(&self, root_doc: &str) -> BuildSettings {
        BuildSettings {
            source_dir: self.source(),
            output_dir: self.output(),
            root_doc: Some(root_doc.to_owned()),
            include: vec!["**/*.rst".to_owned()],
            exclude: vec![],
            jobs: 2,
            theme: ThemeSettings::default(),
            cache_dir: None,
        }
    }

    fn builder(&self) -> StaticSiteBuilder {
        StaticSiteBuilder::new(self.settings("index"))
    }
}

/// Every file under `root`, keyed by `/`-separated relative path.
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                pending.push(path);
            } else {
                let rel = path.strip_prefix(root).unwrap();
                let rel = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                files.insert(rel, fs::read(&path).unwrap());
            }
        }
    }
    files
}

fn java_project() -> Project {
    let project = Project::new();
    project
        .write(
            "index.rst",
            "Java Notes\n==========\n\n.. toctree::\n   :caption: Language\n\n   java/generics\n   java/wildcards\n",
        )
        .write(
            "java/generics.rst",
            ".. _generics:\n\nGenerics\n========\n\nSee :ref:`wildcards`.\n",
        )
        .write(
            "java/wildcards.rst",
            ".. _wildcards:\n\nWildcards\n=========\n\nBuilds on :ref:`generics`.\n",
        );
    project
}

#[test]
fn test_build_writes_one_page_per_document() {
    let project = java_project();

    let report = project.builder().build().unwrap();

    assert_eq!(report.pages(), 3);
    assert_eq!(report.pages_rendered, 3);
    assert_eq!(report.pages_cached, 0);
    assert!(report.unreachable.is_empty());

    let files = snapshot(&project.output());
    assert_eq!(
        files.keys().map(String::as_str).collect::<Vec<_>>(),
        vec![
            "_static/tome.css",
            "index.html",
            "java/generics.html",
            "java/wildcards.html",
            "navigation.json",
        ]
    );

    let generics = String::from_utf8(files["java/generics.html"].clone()).unwrap();
    assert!(generics.contains("href=\"wildcards.html#wildcards\">Wildcards</a>"));
    assert!(generics.contains("<span class=\"caption\">Language</span>"));
}

#[test]
fn test_rebuild_is_byte_identical() {
    let project = java_project();

    project.builder().build().unwrap();
    let first = snapshot(&project.output());
    fs::remove_dir_all(project.output()).unwrap();
    project.builder().build().unwrap();
    let second = snapshot(&project.output());

    assert_eq!(first, second);
}

#[test]
fn test_cached_rebuild_is_byte_identical() {
    let project = java_project();
    let mut settings = project.settings("index");
    settings.cache_dir = Some(project.tmp.path().join("cache"));

    let first_report = StaticSiteBuilder::new(settings.clone()).build().unwrap();
    let first = snapshot(&project.output());
    let second_report = StaticSiteBuilder::new(settings.clone()).build().unwrap();
    let second = snapshot(&project.output());

    assert_eq!(first_report.pages_cached, 0);
    assert_eq!(second_report.pages_cached, 3);
    assert_eq!(first, second);

    // Changing a title shown in other pages invalidates them too.
    project.write(
        "java/wildcards.rst",
        ".. _wildcards:\n\nBounded Wildcards\n=================\n\nBuilds on :ref:`generics`.\n",
    );
    let third_report = StaticSiteBuilder::new(settings).build().unwrap();
    assert_eq!(third_report.pages_cached, 0);
    let generics = fs::read_to_string(project.output().join("java/generics.html")).unwrap();
    assert!(generics.contains(">Bounded Wildcards</a>"));
}

#[test]
fn test_navigation_follows_path_order() {
    let project = Project::new();
    project
        .write("index.rst", "Home\n====\n\n.. toctree::\n   :glob:\n\n   topics/*\n")
        .write("topics/zebra.rst", "Zebra\n=====\n")
        .write("topics/apple.rst", "Apple\n=====\n")
        .write("topics/mango.rst", "Mango\n=====\n");

    project.builder().build().unwrap();

    let nav: serde_json::Value =
        serde_json::from_slice(&fs::read(project.output().join("navigation.json")).unwrap()).unwrap();
    let docs: Vec<&str> = nav["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["doc"].as_str().unwrap())
        .collect();
    assert_eq!(docs, vec!["topics/apple", "topics/mango", "topics/zebra"]);
}

#[test]
fn test_self_inclusion_is_a_cycle() {
    let project = Project::new();
    project.write("index.rst", "Home\n====\n\n.. toctree::\n\n   index\n");

    let err = project.builder().build().unwrap_err();

    assert!(matches!(
        &err,
        BuildError::Navigation(NavigationError::Cycle { cycle }) if cycle == &["index", "index"]
    ));
    assert!(!project.output().exists());
}

#[test]
fn test_transitive_cycle_names_every_document() {
    let project = Project::new();
    project
        .write("index.rst", "Home\n====\n\n.. toctree::\n\n   a\n")
        .write("a.rst", "A\n=\n\n.. toctree::\n\n   b\n")
        .write("b.rst", "B\n=\n\n.. toctree::\n\n   a\n");

    let err = project.builder().build().unwrap_err();

    assert_eq!(err.to_string(), "toctree cycle: a -> b -> a");
}

#[test]
fn test_missing_label_is_reported_with_location() {
    let project = Project::new();
    project.write("index.rst", "Home\n====\n\nSee :ref:`nowhere`.\n");

    let err = project.builder().build().unwrap_err();

    assert!(matches!(err, BuildError::Resolve(_)));
    let message = err.to_string();
    assert!(message.contains("index.rst:4"), "{message}");
    assert!(message.contains("\"nowhere\""), "{message}");
    assert!(!project.output().exists());
}

#[test]
fn test_duplicate_label_writes_nothing() {
    let project = Project::new();
    project
        .write("index.rst", "Home\n====\n\n.. toctree::\n\n   a\n   b\n")
        .write("a.rst", ".. _setup:\n\nA\n=\n")
        .write("b.rst", ".. _setup:\n\nB\n=\n");

    let err = project.builder().build().unwrap_err();

    let message = err.to_string();
    assert!(message.contains("a.rst"), "{message}");
    assert!(message.contains("b.rst"), "{message}");
    assert!(message.contains("\"setup\""), "{message}");
    assert!(!project.output().exists());
}

#[test]
fn test_glob_toctree_end_to_end() {
    let project = Project::new();
    project
        .write("a.rst", "Intro\n=====\n\n.. toctree::\n   :glob:\n\n   child/*\n")
        .write("child/c.rst", "C\n=\n")
        .write("child/b.rst", "B\n=\n");

    let report = StaticSiteBuilder::new(project.settings("a")).build().unwrap();

    assert_eq!(report.pages(), 3);
    let output = project.output();
    assert!(output.join("a.html").is_file());
    assert!(output.join("child/b.html").is_file());
    assert!(output.join("child/c.html").is_file());

    let page = fs::read_to_string(output.join("a.html")).unwrap();
    let b = page.find("href=\"child/b.html\"").unwrap();
    let c = page.find("href=\"child/c.html\"").unwrap();
    assert!(b < c);
}

#[test]
fn test_default_config_builds_corpus_without_index() {
    let project = Project::new();
    project
        .write("a.rst", "Intro\n=====\n\n.. toctree::\n   :glob:\n\n   child/*\n")
        .write("child/c.rst", "C\n=\n")
        .write("child/b.rst", "B\n=\n");
    let mut settings = BuildSettings::from_config(&Config::default());
    settings.source_dir = project.source();
    settings.output_dir = project.output();
    settings.cache_dir = None;

    let report = StaticSiteBuilder::new(settings).build().unwrap();

    assert_eq!(report.pages(), 3);
    assert!(report.unreachable.is_empty());
    let page = fs::read_to_string(project.output().join("a.html")).unwrap();
    let b = page.find("href=\"child/b.html\"").unwrap();
    let c = page.find("href=\"child/c.html\"").unwrap();
    assert!(b < c);

    let navigation: serde_json::Value =
        serde_json::from_slice(&fs::read(project.output().join("navigation.json")).unwrap()).unwrap();
    assert_eq!(navigation["root"], "a");
    assert_eq!(navigation["items"][0]["doc"], "child/b");
    assert_eq!(navigation["items"][1]["doc"], "child/c");
}

#[test]
fn test_explicit_missing_root_fails() {
    let project = Project::new();
    project.write("a.rst", "Intro\n=====\n");

    let err = project.builder().build().unwrap_err();

    assert!(matches!(
        err,
        BuildError::Navigation(NavigationError::MissingRoot(ref id)) if id == "index"
    ));
    assert!(!project.output().exists());
}

#[test]
fn test_check_writes_nothing() {
    let project = java_project();

    let report = project.builder().check().unwrap();

    assert_eq!(report.documents, 3);
    assert!(!project.output().exists());
}

#[test]
fn test_unreachable_documents_are_reported() {
    let project = java_project();
    project
        .write("drafts/todo.rst", "Todo\n====\n")
        .write("drafts/hidden.rst", ":orphan:\n\nHidden\n======\n");

    let report = project.builder().build().unwrap();

    assert_eq!(report.unreachable, vec!["drafts/todo"]);
    assert!(project.output().join("drafts/todo.html").is_file());
    assert!(project.output().join("drafts/hidden.html").is_file());
}

#[test]
fn test_cancelled_build_writes_nothing() {
    let project = java_project();
    let cancel = Arc::new(AtomicBool::new(true));

    let err = project
        .builder()
        .with_cancel_flag(Arc::clone(&cancel))
        .build()
        .unwrap_err();

    assert!(matches!(err, BuildError::Cancelled));
    assert!(!project.output().exists());
}

#[test]
fn test_static_files_are_copied() {
    let project = java_project();
    project.write("_static/custom.css", "h1 { color: red; }");

    let report = project.builder().build().unwrap();

    assert_eq!(report.assets_written, 3);
    assert_eq!(
        fs::read_to_string(project.output().join("_static/custom.css")).unwrap(),
        "h1 { color: red; }"
    );
}

#[test]
fn test_static_file_cannot_replace_builtin_stylesheet() {
    let project = java_project();
    project.write("_static/tome.css", "body { display: none; }");

    let err = project.builder().build().unwrap_err();

    assert!(matches!(
        err,
        BuildError::Write(WriteError::ReservedPath(ref p)) if p == "_static/tome.css"
    ));
    assert!(!project.output().exists());

    let err = project.builder().check().unwrap_err();
    assert!(matches!(err, BuildError::Write(WriteError::ReservedPath(_))));
}

#[test]
fn test_output_inside_source_is_not_read_back() {
    let project = java_project();
    let mut settings = project.settings("index");
    settings.output_dir = project.source().join("_out");
    fs::create_dir_all(&settings.output_dir).unwrap();
    fs::write(settings.output_dir.join("leftover.rst"), "Leftover\n========\n").unwrap();

    let report = StaticSiteBuilder::new(settings).build().unwrap();

    assert_eq!(report.pages(), 3);
}

#[test]
fn test_unknown_theme_fails_before_writing() {
    let project = java_project();
    let mut settings = project.settings("index");
    settings.theme.name = "alabaster".to_owned();

    let err = StaticSiteBuilder::new(settings).build().unwrap_err();

    assert!(matches!(err, BuildError::Render(_)));
    assert!(!project.output().exists());
}
