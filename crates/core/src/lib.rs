//! Core types and capabilities for stacwalk
//!
//! This crate defines the foundational pieces used throughout the system:
//! - WalkPath: order-preserving encoded position of a node in the catalog tree
//! - Document / Catalog / Collection / Item: the parsed STAC document model
//! - Bbox / Geometry / Interval: spatial and temporal query primitives
//! - Fetch / GeometryIntersect: injected capability traits
//! - WalkSettings: per-catalog assumptions
//! - Error hierarchy: FetchError, ResolveError, BadObjectError

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod fetch;
pub mod geom;
pub mod href;
pub mod model;
pub mod settings;
pub mod time;
pub mod walk_path;

// Re-export commonly used types and traits
pub use error::{BadObjectError, FetchError, ResolveError};
pub use fetch::{Fetch, FileFetcher, MemoryFetcher};
pub use geom::{Bbox, EnvelopeIntersect, Geometry, GeometryError, GeometryIntersect};
pub use href::{resolve_href, HrefError};
pub use model::{Catalog, Collection, DocKind, Document, Item, Link, NodeKind};
pub use settings::WalkSettings;
pub use time::{parse_rfc3339, Interval, TimeError};
pub use walk_path::{BadWalkPathLength, Segment, WalkPath, SEGMENT_LEN};
