//! Fetch capability: maps hrefs to raw document bytes
//!
//! The walk engine never does I/O itself; it pulls bytes through a [`Fetch`]
//! implementation injected per deployment. Implementations must be safe for
//! concurrent use by independent search requests. Transparent caching (with
//! standard cache-control semantics) belongs in the implementation, not here.

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::FetchError;
use crate::href;

/// Maps one href to raw bytes or a typed fetch failure
pub trait Fetch: Send + Sync {
    /// Fetch the resource at `href`
    fn fetch(&self, href: &str) -> Result<Vec<u8>, FetchError>;
}

/// Reads `file://` catalogs from the local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct FileFetcher;

impl Fetch for FileFetcher {
    fn fetch(&self, href: &str) -> Result<Vec<u8>, FetchError> {
        let path = href::file_uri_to_path(href)
            .map_err(|_| FetchError::UnsupportedScheme(href.to_string()))?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => FetchError::NotFound(href.to_string()),
            _ => FetchError::Io {
                href: href.to_string(),
                message: e.to_string(),
            },
        })
    }
}

/// An in-memory catalog keyed by href
///
/// Test and fixture transport. Counts fetches so tests can assert that
/// pruned subtrees were never resolved.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    documents: HashMap<String, Vec<u8>>,
    fetches: AtomicUsize,
}

impl MemoryFetcher {
    /// Create an empty in-memory catalog
    pub fn new() -> Self {
        MemoryFetcher::default()
    }

    /// Store raw bytes under an href
    pub fn insert(&mut self, href: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.documents.insert(href.into(), bytes.into());
    }

    /// Store a JSON document under an href
    pub fn insert_json(&mut self, href: impl Into<String>, value: &serde_json::Value) {
        self.documents.insert(href.into(), value.to_string().into_bytes());
    }

    /// Number of fetches served (including misses)
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl Fetch for MemoryFetcher {
    fn fetch(&self, href: &str) -> Result<Vec<u8>, FetchError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        self.documents
            .get(href)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(href.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_fetcher_round_trip() {
        let mut fetcher = MemoryFetcher::new();
        fetcher.insert("mem://doc.json", b"{}".to_vec());
        assert_eq!(fetcher.fetch("mem://doc.json").unwrap(), b"{}");
        assert!(matches!(
            fetcher.fetch("mem://other.json"),
            Err(FetchError::NotFound(_)),
        ));
        assert_eq!(fetcher.fetch_count(), 2);
    }

    #[test]
    fn test_memory_fetcher_insert_json() {
        let mut fetcher = MemoryFetcher::new();
        fetcher.insert_json("mem://doc.json", &serde_json::json!({"id": "x"}));
        let bytes = fetcher.fetch("mem://doc.json").unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["id"], "x");
    }

    #[test]
    fn test_file_fetcher_reads_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, b"{\"type\": \"Catalog\"}").unwrap();

        let uri = href::file_path_to_file_uri(&path).unwrap();
        let bytes = FileFetcher.fetch(&uri).unwrap();
        assert_eq!(bytes, b"{\"type\": \"Catalog\"}");
    }

    #[test]
    fn test_file_fetcher_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let uri = href::file_path_to_file_uri(&dir.path().join("missing.json")).unwrap();
        assert!(matches!(
            FileFetcher.fetch(&uri),
            Err(FetchError::NotFound(_)),
        ));
    }

    #[test]
    fn test_file_fetcher_rejects_remote_href() {
        assert!(matches!(
            FileFetcher.fetch("https://example.test/catalog.json"),
            Err(FetchError::UnsupportedScheme(_)),
        ));
    }
}
