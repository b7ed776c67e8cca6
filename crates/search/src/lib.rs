//! Search, filtering and pagination over static catalogs
//!
//! This crate assembles the walk primitives into the search surface:
//! - WalkMarker / WalkPage / paginate: keyset pagination with opaque tokens
//! - spatial / temporal / ids: the filter stages searches are built from
//! - Cql2Compiler / BasicCql2: property filtering as an injected capability
//! - Client: the search facade (item search, collection search, id lookups)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod cql2;
pub mod ids;
pub mod page;
pub mod spatial;
pub mod temporal;

pub use client::{Client, CollectionSearch, ItemSearch, SearchError, DEFAULT_LIMIT};
pub use cql2::{BasicCql2, Cql2Compiler, Cql2Error, Cql2Expression, Cql2Predicate, FieldMap};
pub use page::{paginate, MarkerError, WalkDirection, WalkMarker, WalkPage};
