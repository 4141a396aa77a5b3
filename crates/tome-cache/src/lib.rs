//! Page cache for incremental tome builds.
//!
//! Rendering is a pure function of its inputs, so a page rendered by a
//! previous build can be reused whenever a fingerprint of those inputs is
//! unchanged. The fingerprint is passed to this crate as an opaque *etag*.
//!
//! - [`Cache`]: factory for named buckets
//! - [`CacheBucket`]: key-value store with etag validation
//! - [`NullCache`]: always misses (caching disabled)
//! - [`FileCache`]: one file per entry under a versioned root directory
//!
//! # Example
//!
//! ```
//! use tome_cache::{Cache, NullCache};
//!
//! let cache = NullCache;
//! let pages = cache.bucket("pages");
//! pages.put("java/generics", "3f9a", b"<html></html>");
//! assert_eq!(pages.get("java/generics", "3f9a"), None);
//! ```

mod file;
pub use file::FileCache;

/// A named partition within a [`Cache`].
///
/// A lookup hits only when the key exists and was stored with the same etag.
/// Implementations never fail: I/O problems surface as misses.
pub trait CacheBucket: Send + Sync {
    /// Fetch the value stored under `key` if its etag equals `etag`.
    fn get(&self, key: &str, etag: &str) -> Option<Vec<u8>>;

    /// Store `value` under `key`, replacing any previous entry.
    fn put(&self, key: &str, etag: &str, value: &[u8]);

    /// Fetch a UTF-8 value. Invalid UTF-8 counts as a miss.
    fn get_string(&self, key: &str, etag: &str) -> Option<String> {
        String::from_utf8(self.get(key, etag)?).ok()
    }
}

/// Factory for named [`CacheBucket`]s.
pub trait Cache: Send + Sync {
    /// Open a bucket (e.g. `"pages"`).
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;
}

/// Bucket that stores nothing.
pub struct NullCacheBucket;

impl CacheBucket for NullCacheBucket {
    fn get(&self, _key: &str, _etag: &str) -> Option<Vec<u8>> {
        None
    }

    fn put(&self, _key: &str, _etag: &str, _value: &[u8]) {}
}

/// Cache used when caching is disabled.
pub struct NullCache;

impl Cache for NullCache {
    fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
        Box::new(NullCacheBucket)
    }
}
