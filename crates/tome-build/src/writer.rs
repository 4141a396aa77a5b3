//! Output writer.
//!
//! Every file is written to a temporary file in its destination directory
//! and renamed over the final path, so readers of the output directory
//! never observe a partially written file.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tome_render::RenderedPage;

use crate::WriteError;

/// A non-page output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Path relative to the output root, `/`-separated.
    pub path: String,
    pub contents: Vec<u8>,
}

impl Asset {
    pub fn new(path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            contents: contents.into(),
        }
    }
}

/// Writes a fully rendered site into an output directory.
#[derive(Debug)]
pub struct OutputWriter {
    root: PathBuf,
}

impl OutputWriter {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write every page and asset. Returns the number of files written.
    ///
    /// Files already present in the output directory and not part of this
    /// build are left alone.
    pub fn write_all(&self, pages: &[RenderedPage], assets: &[Asset]) -> Result<usize, WriteError> {
        let files = pages
            .iter()
            .map(|p| (p.path.as_str(), p.html.as_bytes()))
            .chain(assets.iter().map(|a| (a.path.as_str(), a.contents.as_slice())));

        let mut written = 0;
        for (rel, contents) in files {
            let path = self.destination(rel)?;
            write_atomic(&path, contents)?;
            tracing::debug!(path = %rel, "Wrote output file");
            written += 1;
        }
        tracing::info!(files = written, root = %self.root.display(), "Wrote site");
        Ok(written)
    }

    fn destination(&self, rel: &str) -> Result<PathBuf, WriteError> {
        if rel.is_empty() || rel.split('/').any(|seg| seg.is_empty() || seg == "..") {
            return Err(WriteError::InvalidPath(rel.to_owned()));
        }
        Ok(rel.split('/').fold(self.root.clone(), |path, seg| path.join(seg)))
    }
}

fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), WriteError> {
    let io_err = |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    };
    let parent = path
        .parent()
        .ok_or_else(|| WriteError::InvalidPath(path.display().to_string()))?;
    fs::create_dir_all(parent).map_err(io_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(io_err)?;
    tmp.write_all(contents).map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;
    Ok(())
}

/// Read every file under `dir` as assets placed below `prefix`.
///
/// Hidden files are skipped. Symlinked files are read through the link;
/// symlinked directories are not followed. A missing directory yields no
/// assets. Files are returned in path order.
pub fn collect_assets(dir: &Path, prefix: &str) -> Result<Vec<Asset>, WriteError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut assets = Vec::new();
    let mut pending = vec![(dir.to_path_buf(), prefix.to_owned())];
    while let Some((current, rel)) = pending.pop() {
        let entries = fs::read_dir(&current).map_err(|source| WriteError::Io {
            path: current.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| WriteError::Io {
                path: current.clone(),
                source,
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let path = entry.path();
            let child_rel = format!("{rel}/{name}");
            let file_type = entry.file_type().map_err(|source| WriteError::Io {
                path: path.clone(),
                source,
            })?;
            if file_type.is_dir() {
                pending.push((path, child_rel));
            } else if file_type.is_symlink() && !path.is_file() {
                tracing::warn!(path = %path.display(), "Skipping symlink that is not a regular file");
            } else {
                let contents = fs::read(&path).map_err(|source| WriteError::Io {
                    path: path.clone(),
                    source,
                })?;
                assets.push(Asset::new(child_rel, contents));
            }
        }
    }
    assets.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(assets)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    use super::*;

    fn page(id: &str, html: &str) -> RenderedPage {
        RenderedPage {
            doc_id: id.to_owned(),
            path: format!("{id}.html"),
            html: html.to_owned(),
        }
    }

    #[test]
    fn test_write_all_creates_directories() {
        let tmp = TempDir::new().unwrap();
        let writer = OutputWriter::new(tmp.path().join("out"));

        let written = writer
            .write_all(
                &[page("index", "<p>home</p>"), page("java/generics", "<p>generics</p>")],
                &[Asset::new("_static/tome.css", "body {}")],
            )
            .unwrap();

        assert_eq!(written, 3);
        let out = tmp.path().join("out");
        assert_eq!(fs::read_to_string(out.join("index.html")).unwrap(), "<p>home</p>");
        assert_eq!(
            fs::read_to_string(out.join("java/generics.html")).unwrap(),
            "<p>generics</p>"
        );
        assert_eq!(fs::read_to_string(out.join("_static/tome.css")).unwrap(), "body {}");
    }

    #[test]
    fn test_write_all_replaces_existing_files() {
        let tmp = TempDir::new().unwrap();
        let writer = OutputWriter::new(tmp.path().to_path_buf());
        fs::write(tmp.path().join("index.html"), "old").unwrap();
        fs::write(tmp.path().join("stale.html"), "stale").unwrap();

        writer.write_all(&[page("index", "new")], &[]).unwrap();

        assert_eq!(fs::read_to_string(tmp.path().join("index.html")).unwrap(), "new");
        assert_eq!(fs::read_to_string(tmp.path().join("stale.html")).unwrap(), "stale");
    }

    #[test]
    fn test_write_all_leaves_no_temp_files() {
        let tmp = TempDir::new().unwrap();
        let writer = OutputWriter::new(tmp.path().to_path_buf());

        writer.write_all(&[page("a", "a"), page("b", "b")], &[]).unwrap();

        let mut names: Vec<String> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.html", "b.html"]);
    }

    #[test]
    fn test_rejects_escaping_paths() {
        let tmp = TempDir::new().unwrap();
        let writer = OutputWriter::new(tmp.path().join("out"));

        let err = writer
            .write_all(&[], &[Asset::new("../evil.txt", "x")])
            .unwrap_err();
        assert!(matches!(err, WriteError::InvalidPath(p) if p == "../evil.txt"));
        assert!(!tmp.path().join("evil.txt").exists());
    }

    #[test]
    fn test_collect_assets() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("_static");
        fs::create_dir_all(dir.join("img")).unwrap();
        fs::write(dir.join("extra.css"), "a").unwrap();
        fs::write(dir.join("img/logo.svg"), "<svg/>").unwrap();
        fs::write(dir.join(".DS_Store"), "").unwrap();

        let assets = collect_assets(&dir, "_static").unwrap();

        assert_eq!(
            assets,
            vec![
                Asset::new("_static/extra.css", "a"),
                Asset::new("_static/img/logo.svg", "<svg/>"),
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_collect_assets_does_not_follow_directory_symlinks() {
        use std::os::unix::fs::symlink;

        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("_static");
        fs::create_dir_all(dir.join("img")).unwrap();
        fs::write(dir.join("img/logo.svg"), "<svg/>").unwrap();
        symlink(&dir, dir.join("img/loop")).unwrap();
        symlink(dir.join("img/logo.svg"), dir.join("alias.svg")).unwrap();

        let assets = collect_assets(&dir, "_static").unwrap();

        assert_eq!(
            assets,
            vec![
                Asset::new("_static/alias.svg", "<svg/>"),
                Asset::new("_static/img/logo.svg", "<svg/>"),
            ]
        );
    }

    #[test]
    fn test_collect_assets_missing_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(collect_assets(&tmp.path().join("_static"), "_static").unwrap().is_empty());
    }
}
