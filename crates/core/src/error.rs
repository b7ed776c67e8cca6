//! Error types for the catalog-side failure taxonomy
//!
//! Catalog-side failures (unreachable resources, malformed documents) are
//! recovered close to the point of failure: they are cached on the lazy node
//! that produced them and reported to filters, which skip and log. Only
//! caller-caused query errors are fatal, and those live in the search crate.
//! We use `thiserror` for automatic `Display` and `Error` implementations.
//!
//! Every type here is `Clone` because a node's resolution outcome is computed
//! once and then shared for the rest of the node's lifetime.

use thiserror::Error;

/// Why one href could not be fetched
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The resource does not exist
    #[error("resource not found: {0}")]
    NotFound(String),

    /// The href scheme is not handled by this fetch capability
    #[error("unsupported href scheme: {0}")]
    UnsupportedScheme(String),

    /// Transport-level failure (I/O, network)
    #[error("failed to fetch {href}: {message}")]
    Io {
        /// The href being fetched
        href: String,
        /// Underlying failure description
        message: String,
    },
}

/// Why one node could not be resolved into a document
///
/// Resolution failures are never fatal to a walk by default: the walker and
/// filter stages decide whether to skip-and-log or abort.
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The underlying fetch failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The bytes were not a parseable STAC document
    #[error("malformed document at {href}: {message}")]
    Parse {
        /// The href of the offending document
        href: String,
        /// Parser failure description
        message: String,
    },

    /// The document kind does not match the link that declared it
    #[error("document at {href} is a {actual}, expected {expected}")]
    TypeMismatch {
        /// The href of the offending document
        href: String,
        /// Kind declared by the parent's link
        expected: String,
        /// Kind actually found
        actual: String,
    },

    /// A link href could not be resolved against its base
    #[error("bad href {href}: {message}")]
    BadHref {
        /// The offending href
        href: String,
        /// Failure description
        message: String,
    },
}

/// Malformed content on an otherwise-parseable document, relevant to a filter
///
/// Bad bbox, bad geometry, missing extent: logged and converted to a
/// suppress/prune by the filter stage that needed the field, never fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("bad STAC object {id}: {message}")]
pub struct BadObjectError {
    /// Id of the offending document
    pub id: String,
    /// What was wrong with it
    pub message: String,
}

impl BadObjectError {
    /// Build an error for the document `id`
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        BadObjectError {
            id: id.into(),
            message: message.into(),
        }
    }
}
