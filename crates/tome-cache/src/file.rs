//! File-backed cache.
//!
//! Layout:
//!
//! ```text
//! {root}/
//! +-- VERSION              # tool version that wrote the entries
//! +-- pages/               # bucket
//!     +-- java/
//!         +-- generics.entry
//! ```
//!
//! Each entry is `[etag_len: u32 LE][etag][data]`. Entries are written to a
//! sibling temp file and renamed into place, so a concurrent reader sees
//! either the old entry or the new one.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::{Cache, CacheBucket};

const ENTRY_SUFFIX: &str = "entry";

/// Cache rooted at a directory on disk.
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Open the cache at `root` for tool version `version`.
    ///
    /// A missing or different `VERSION` file wipes the directory first.
    #[must_use]
    pub fn new(root: PathBuf, version: &str) -> Self {
        reset_on_version_change(&root, version);
        Self { root }
    }
}

impl Cache for FileCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(FileBucket {
            dir: self.root.join(name),
        })
    }
}

struct FileBucket {
    dir: PathBuf,
}

impl FileBucket {
    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        // Keys are document identifiers; refuse anything that could escape the bucket.
        if key.is_empty() || key.split('/').any(|seg| seg.is_empty() || seg == "..") {
            return None;
        }
        Some(self.dir.join(format!("{key}.{ENTRY_SUFFIX}")))
    }
}

impl CacheBucket for FileBucket {
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>> {
        let mut file = File::open(self.entry_path(key)?).ok()?;

        let mut len_buf = [0u8; 4];
        file.read_exact(&mut len_buf).ok()?;
        let etag_len = u32::from_le_bytes(len_buf) as usize;
        if etag_len != etag.len() {
            return None;
        }

        let mut stored = vec![0u8; etag_len];
        file.read_exact(&mut stored).ok()?;
        if stored != etag.as_bytes() {
            return None;
        }

        let mut data = Vec::new();
        file.read_to_end(&mut data).ok()?;
        Some(data)
    }

    fn put(&self, key: &str, etag: &str, value: &[u8]) {
        let Some(path) = self.entry_path(key) else {
            tracing::debug!(key, "refusing to cache entry with unsafe key");
            return;
        };
        if let Err(e) = write_entry(&path, etag, value) {
            tracing::warn!(path = %path.display(), "failed to write cache entry: {e}");
        }
    }
}

fn write_entry(path: &Path, etag: &str, value: &[u8]) -> std::io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| std::io::Error::other("cache entry has no parent directory"))?;
    fs::create_dir_all(parent)?;

    let etag_len = u32::try_from(etag.len()).map_err(std::io::Error::other)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(&etag_len.to_le_bytes())?;
    tmp.write_all(etag.as_bytes())?;
    tmp.write_all(value)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn reset_on_version_change(root: &Path, version: &str) {
    let version_file = root.join("VERSION");

    match fs::read_to_string(&version_file) {
        Ok(stored) if stored == version => {
            tracing::debug!(version, "cache version matches");
            return;
        }
        Ok(stored) => {
            tracing::info!(stored = %stored, current = version, "cache version changed, clearing cache");
        }
        Err(_) => tracing::debug!("initializing cache at {}", root.display()),
    }

    if root.exists()
        && let Err(e) = fs::remove_dir_all(root)
    {
        tracing::warn!("failed to clear cache directory: {e}");
    }
    if let Err(e) = fs::create_dir_all(root) {
        tracing::warn!("failed to create cache directory: {e}");
        return;
    }
    if let Err(e) = fs::write(&version_file, version) {
        tracing::warn!("failed to write cache VERSION file: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(tmp: &TempDir, version: &str) -> FileCache {
        FileCache::new(tmp.path().join("cache"), version)
    }

    #[test]
    fn test_put_then_get() {
        let tmp = TempDir::new().unwrap();
        let pages = open(&tmp, "1").bucket("pages");

        pages.put("java/generics", "abc", b"<main>generics</main>");

        assert_eq!(
            pages.get_string("java/generics", "abc").as_deref(),
            Some("<main>generics</main>")
        );
    }

    #[test]
    fn test_stale_etag_misses() {
        let tmp = TempDir::new().unwrap();
        let pages = open(&tmp, "1").bucket("pages");

        pages.put("index", "old", b"v1");

        assert_eq!(pages.get("index", "new"), None);
        // Same length, different bytes
        assert_eq!(pages.get("index", "olD"), None);
    }

    #[test]
    fn test_put_replaces_entry() {
        let tmp = TempDir::new().unwrap();
        let pages = open(&tmp, "1").bucket("pages");

        pages.put("index", "e1", b"first");
        pages.put("index", "e2", b"second");

        assert_eq!(pages.get("index", "e1"), None);
        assert_eq!(pages.get("index", "e2"), Some(b"second".to_vec()));
    }

    #[test]
    fn test_unsafe_keys_are_never_stored() {
        let tmp = TempDir::new().unwrap();
        let pages = open(&tmp, "1").bucket("pages");

        pages.put("../escape", "e", b"x");
        pages.put("", "e", b"x");

        assert_eq!(pages.get("../escape", "e"), None);
        assert!(!tmp.path().join("escape.entry").exists());
    }

    #[test]
    fn test_buckets_do_not_share_entries() {
        let tmp = TempDir::new().unwrap();
        let cache = open(&tmp, "1");

        cache.bucket("pages").put("k", "e", b"page");

        assert_eq!(cache.bucket("other").get("k", "e"), None);
    }

    #[test]
    fn test_same_version_keeps_entries() {
        let tmp = TempDir::new().unwrap();
        open(&tmp, "1").bucket("pages").put("k", "e", b"kept");

        let reopened = open(&tmp, "1");

        assert_eq!(reopened.bucket("pages").get("k", "e"), Some(b"kept".to_vec()));
    }

    #[test]
    fn test_new_version_clears_entries() {
        let tmp = TempDir::new().unwrap();
        open(&tmp, "1").bucket("pages").put("k", "e", b"gone");

        let reopened = open(&tmp, "2");

        assert_eq!(reopened.bucket("pages").get("k", "e"), None);
        let version = fs::read_to_string(tmp.path().join("cache/VERSION")).unwrap();
        assert_eq!(version, "2");
    }
}
