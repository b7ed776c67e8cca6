//! stacwalk: search, filtering and pagination core for static STAC catalogs
//!
//! A static catalog is a tree of JSON documents linked by href: a root
//! catalog, nested catalogs and collections, and item leaves. This crate
//! searches such a tree without an index: a lazy depth-first walk, a filter
//! chain that prunes subtrees the query can never match, and keyset
//! pagination over stable content-derived cursors.
//!
//! ```no_run
//! use std::sync::Arc;
//! use stacwalk::{Client, FileFetcher, ItemSearch, WalkSettings};
//!
//! let settings = WalkSettings::new("file:///data/catalog.json");
//! let client = Client::new(Arc::new(FileFetcher), settings);
//! let page = client.search_items(&ItemSearch::new())?;
//! for node in &page.nodes {
//!     println!("{}", node.href());
//! }
//! # Ok::<(), stacwalk::SearchError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use stacwalk_core::{
    Bbox, Catalog, Collection, DocKind, Document, EnvelopeIntersect, Fetch, FetchError,
    FileFetcher, Geometry, GeometryError, GeometryIntersect, Interval, Item, Link, MemoryFetcher,
    NodeKind, ResolveError, Segment, TimeError, WalkPath, WalkSettings, SEGMENT_LEN,
};
pub use stacwalk_search::{
    BasicCql2, Client, CollectionSearch, Cql2Compiler, Cql2Error, Cql2Expression, ItemSearch,
    MarkerError, SearchError, WalkDirection, WalkMarker, WalkPage, DEFAULT_LIMIT,
};
pub use stacwalk_walk::{
    ChainWalk, FilterSignal, FilterStage, FilteredWalk, FixedWalk, Walk, WalkContext, WalkNode,
    WalkStream,
};
