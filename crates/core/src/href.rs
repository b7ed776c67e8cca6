//! Href resolution helpers
//!
//! Catalog links may be relative to the document that declares them; these
//! helpers join them against their base and map `file://` hrefs to paths.

use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

/// Why an href could not be interpreted
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HrefError {
    /// The href (or its base) was not a parseable URL
    #[error("cannot parse href {href}: {message}")]
    Parse {
        /// The offending href
        href: String,
        /// Parser failure description
        message: String,
    },

    /// A filesystem path could not be expressed as a `file://` URL
    #[error("cannot express path as a file uri: {0}")]
    NotAFilePath(String),

    /// A non-`file://` href was used where a local path was required
    #[error("not a local href: {0}")]
    NotALocalHref(String),
}

/// Resolve a possibly-relative link href against the href of the document
/// that declared it
pub fn resolve_href(base: &str, href: &str) -> Result<String, HrefError> {
    if let Ok(absolute) = Url::parse(href) {
        return Ok(absolute.to_string());
    }
    let base_url = Url::parse(base).map_err(|e| HrefError::Parse {
        href: base.to_string(),
        message: e.to_string(),
    })?;
    base_url
        .join(href)
        .map(|joined| joined.to_string())
        .map_err(|e| HrefError::Parse {
            href: href.to_string(),
            message: e.to_string(),
        })
}

/// Whether an href names a local resource rather than a remote one
pub fn is_local(href: &str) -> bool {
    match Url::parse(href) {
        Ok(url) => url.scheme() == "file",
        // Unparseable hrefs are treated as plain filesystem paths
        Err(_) => true,
    }
}

/// Express a filesystem path as a `file://` href
pub fn file_path_to_file_uri(path: &Path) -> Result<String, HrefError> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| HrefError::NotAFilePath(e.to_string()))?
            .join(path)
    };
    Url::from_file_path(&absolute)
        .map(|url| url.to_string())
        .map_err(|_| HrefError::NotAFilePath(absolute.display().to_string()))
}

/// Map a `file://` href back to a filesystem path
pub fn file_uri_to_path(href: &str) -> Result<PathBuf, HrefError> {
    let url = Url::parse(href).map_err(|e| HrefError::Parse {
        href: href.to_string(),
        message: e.to_string(),
    })?;
    if url.scheme() != "file" {
        return Err(HrefError::NotALocalHref(href.to_string()));
    }
    url.to_file_path()
        .map_err(|_| HrefError::NotALocalHref(href.to_string()))
}
