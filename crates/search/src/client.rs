//! Search facade over one static catalog
//!
//! A [`Client`] owns the walk context plus the two injected capabilities
//! (geometry intersection, CQL2 compilation) and exposes the search
//! operations. Every search compiles and validates the query eagerly, then
//! assembles one filter chain over one walk source and cuts a page out of
//! the result. Catalog-side breakage surfaces as logged skips, never as an
//! error on these calls; the error type covers caller mistakes and missing
//! ids only.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use stacwalk_core::{
    Bbox, EnvelopeIntersect, Fetch, Geometry, GeometryIntersect, Interval, WalkSettings,
};
use stacwalk_walk::{
    resolve_for_filter, FilterSignal, FilterStage, FilteredWalk, Walk, WalkContext, WalkNode,
};

use crate::cql2::{BasicCql2, Cql2Compiler, Cql2Error, Cql2Expression, Cql2Predicate, FieldMap};
use crate::ids::{
    collection_source, collections_only_stage, find_collections, id_stage, item_source,
    items_only_stage, predict_items,
};
use crate::page::{page_bound_stage, paginate, MarkerError, WalkMarker, WalkPage};
use crate::spatial::{collection_spatial_stage, item_bbox_stage, item_intersects_stage};
use crate::temporal::{collection_temporal_stage, item_temporal_stage};

/// Default page size for both item and collection searches
pub const DEFAULT_LIMIT: usize = 10;

/// Why a search request was rejected
#[derive(Debug, Error)]
pub enum SearchError {
    /// The query itself was malformed (bad geometry, bad parameters)
    #[error("bad query: {0}")]
    BadQuery(String),

    /// The CQL2 filter could not be compiled
    #[error(transparent)]
    BadFilter(#[from] Cql2Error),

    /// The pagination marker could not be decoded
    #[error(transparent)]
    BadMarker(#[from] MarkerError),

    /// No collection with the requested id
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// No item with the requested id in the requested collection
    #[error("item {item_id} not found in collection {collection_id}")]
    ItemNotFound {
        /// The collection searched
        collection_id: String,
        /// The missing item
        item_id: String,
    },
}

/// An item search request
#[derive(Clone, Default)]
pub struct ItemSearch {
    /// Restrict to these item ids
    pub ids: Option<Vec<String>>,
    /// Restrict to items in these collections
    pub collections: Option<Vec<String>>,
    /// Items whose bbox intersects this bbox
    pub bbox: Option<Bbox>,
    /// Items whose geometry intersects this GeoJSON geometry
    pub intersects: Option<Value>,
    /// Items whose datetime intersects this interval
    pub datetime: Option<Interval>,
    /// CQL2 filter over item properties
    pub filter: Option<Cql2Expression>,
    /// Page size; zero returns an empty page
    pub limit: usize,
    /// Resume position from a previous page
    pub marker: Option<WalkMarker>,
}

impl ItemSearch {
    /// An unconstrained search with the default page size
    pub fn new() -> Self {
        ItemSearch {
            limit: DEFAULT_LIMIT,
            ..ItemSearch::default()
        }
    }
}

/// A collection search request
#[derive(Clone, Default)]
pub struct CollectionSearch {
    /// Restrict to these collection ids
    pub ids: Option<Vec<String>>,
    /// Collections whose spatial extent intersects this bbox
    pub bbox: Option<Bbox>,
    /// Collections whose temporal extent intersects this interval
    pub datetime: Option<Interval>,
    /// CQL2 filter over collection fields
    pub filter: Option<Cql2Expression>,
    /// Page size; zero returns an empty page
    pub limit: usize,
    /// Resume position from a previous page
    pub marker: Option<WalkMarker>,
}

impl CollectionSearch {
    /// An unconstrained search with the default page size
    pub fn new() -> Self {
        CollectionSearch {
            limit: DEFAULT_LIMIT,
            ..CollectionSearch::default()
        }
    }
}

/// Search client over one static catalog
pub struct Client {
    ctx: WalkContext,
    cql2: Arc<dyn Cql2Compiler>,
    geometry: Arc<dyn GeometryIntersect>,
}

impl Client {
    /// Client with the built-in capabilities: envelope-only geometry and the
    /// basic CQL2 compiler
    pub fn new(fetcher: Arc<dyn Fetch>, settings: WalkSettings) -> Self {
        Client {
            ctx: WalkContext::new(fetcher, settings),
            cql2: Arc::new(BasicCql2),
            geometry: Arc::new(EnvelopeIntersect),
        }
    }

    /// Replace the CQL2 compiler
    pub fn with_cql2(mut self, compiler: Arc<dyn Cql2Compiler>) -> Self {
        self.cql2 = compiler;
        self
    }

    /// Replace the geometry intersection engine
    pub fn with_geometry(mut self, engine: Arc<dyn GeometryIntersect>) -> Self {
        self.geometry = engine;
        self
    }

    /// The walk context this client searches over
    pub fn ctx(&self) -> &WalkContext {
        &self.ctx
    }

    /// Search items across the catalog
    pub fn search_items(&self, search: &ItemSearch) -> Result<WalkPage, SearchError> {
        let assume_extent = self.ctx.settings.assume_extent_spec;

        // Validate the query geometry before touching the catalog
        let intersects = search
            .intersects
            .as_ref()
            .map(|value| Geometry::GeoJson(value.clone()));
        let intersects_envelope = match &intersects {
            Some(geometry) => Some(
                geometry
                    .envelope()
                    .map_err(|e| SearchError::BadQuery(format!("bad intersects geometry: {e}")))?,
            ),
            None => None,
        };
        let coarse_envelope = search.bbox.or(intersects_envelope);

        let predicate = match &search.filter {
            Some(expression) => Some(self.cql2.compile(expression, FieldMap::Item)?),
            None => None,
        };

        let mut stages: Vec<FilterStage> = Vec::new();
        if let Some(marker) = &search.marker {
            stages.push(page_bound_stage(marker.start(), marker.end()));
        }
        if let Some(envelope) = coarse_envelope {
            stages.push(collection_spatial_stage(envelope, assume_extent));
        }
        if let Some(datetime) = search.datetime {
            stages.push(collection_temporal_stage(datetime, assume_extent));
        }
        stages.push(items_only_stage());
        if let Some(ids) = &search.ids {
            stages.push(id_stage(ids.clone()));
        }
        if let Some(datetime) = search.datetime {
            stages.push(item_temporal_stage(datetime));
        }
        if let Some(bbox) = search.bbox {
            stages.push(item_bbox_stage(bbox));
        }
        if let Some(geometry) = intersects {
            stages.push(item_intersects_stage(geometry, self.geometry.clone()));
        }
        if let Some(predicate) = predicate {
            stages.push(cql2_stage(predicate));
        }

        let source = item_source(
            &self.ctx,
            search.collections.as_deref(),
            search.ids.as_deref(),
        );
        let filtered = FilteredWalk::new(source, stages);
        Ok(paginate(filtered, search.marker.as_ref(), search.limit))
    }

    /// Search collections across the catalog
    pub fn search_collections(&self, search: &CollectionSearch) -> Result<WalkPage, SearchError> {
        let assume_extent = self.ctx.settings.assume_extent_spec;

        let predicate = match &search.filter {
            Some(expression) => Some(self.cql2.compile(expression, FieldMap::Collection)?),
            None => None,
        };

        let mut stages: Vec<FilterStage> = Vec::new();
        if let Some(marker) = &search.marker {
            stages.push(page_bound_stage(marker.start(), marker.end()));
        }
        if let Some(bbox) = search.bbox {
            stages.push(collection_spatial_stage(bbox, assume_extent));
        }
        if let Some(datetime) = search.datetime {
            stages.push(collection_temporal_stage(datetime, assume_extent));
        }
        stages.push(collections_only_stage());
        if let Some(ids) = &search.ids {
            stages.push(id_stage(ids.clone()));
        }
        if let Some(predicate) = predicate {
            stages.push(cql2_stage(predicate));
        }

        let source = collection_source(&self.ctx, search.ids.as_deref());
        let filtered = FilteredWalk::new(source, stages);
        Ok(paginate(filtered, search.marker.as_ref(), search.limit))
    }

    /// Search items within one collection
    ///
    /// Unlike scoping [`ItemSearch::collections`], this verifies the
    /// collection exists first.
    pub fn search_collection_items(
        &self,
        collection_id: &str,
        search: &ItemSearch,
    ) -> Result<WalkPage, SearchError> {
        self.get_collection(collection_id)?;
        let mut scoped = search.clone();
        scoped.collections = Some(vec![collection_id.to_string()]);
        self.search_items(&scoped)
    }

    /// Look up one collection by id
    pub fn get_collection(&self, collection_id: &str) -> Result<WalkNode, SearchError> {
        find_collections(&self.ctx, &[collection_id.to_string()])
            .into_iter()
            .next()
            .ok_or_else(|| SearchError::CollectionNotFound(collection_id.to_string()))
    }

    /// Look up one item by id within a collection
    pub fn get_item(&self, collection_id: &str, item_id: &str) -> Result<WalkNode, SearchError> {
        let collection = self.get_collection(collection_id)?;

        let predicted = predict_items(
            &self.ctx,
            std::slice::from_ref(&collection),
            &[item_id.to_string()],
        );
        if let Some(nodes) = predicted {
            if let Some(node) = nodes.into_iter().next() {
                return Ok(node);
            }
        }

        let mut walk = FilteredWalk::new(
            Walk::below(collection),
            vec![items_only_stage(), id_stage(vec![item_id.to_string()])],
        );
        walk.next().ok_or_else(|| SearchError::ItemNotFound {
            collection_id: collection_id.to_string(),
            item_id: item_id.to_string(),
        })
    }
}

/// Stage that keeps only nodes matching a compiled CQL2 predicate
///
/// Runs after a kind stage, so every node it sees is of the kind the
/// predicate was compiled for.
fn cql2_stage(predicate: Cql2Predicate) -> FilterStage {
    Box::new(move |node: &WalkNode| match resolve_for_filter(node) {
        Some(document) if predicate(document.raw()) => FilterSignal::Keep,
        _ => FilterSignal::Skip,
    })
}
