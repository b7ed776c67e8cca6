//! Spatial filter stages
//!
//! Two layers: a coarse branch stage that prunes whole collections whose
//! declared extent cannot intersect the query, and leaf stages that test each
//! item's bbox or geometry. The coarse stage always compares envelopes, even
//! when an exact geometry engine is injected, because envelope disjointness
//! is enough to prove a subtree irrelevant.
//!
//! A malformed extent suppresses the collection itself but never prunes: the
//! subtree is still walked, so the collection's items can still match.

use std::sync::Arc;

use tracing::{info, warn};

use stacwalk_core::{Bbox, Geometry, GeometryIntersect};
use stacwalk_walk::{resolve_for_filter, FilterSignal, FilterStage, WalkNode};

/// Coarse stage: prune collections whose declared spatial extent is disjoint
/// from the query envelope
///
/// Catalogs declare no extent and always pass. Leaves always pass; they are
/// judged by the leaf stages.
pub fn collection_spatial_stage(query_envelope: Bbox, assume_extent_spec: bool) -> FilterStage {
    Box::new(move |node: &WalkNode| {
        if !node.is_branch() {
            return FilterSignal::Keep;
        }
        let Some(document) = resolve_for_filter(node) else {
            return FilterSignal::Skip;
        };
        let Some(collection) = document.as_collection() else {
            return FilterSignal::Keep;
        };
        match collection.spatial_extent(assume_extent_spec) {
            Ok(extent) => {
                if extent.iter().any(|bbox| bbox.intersects(&query_envelope)) {
                    FilterSignal::Keep
                } else {
                    FilterSignal::Prune
                }
            }
            Err(error) => {
                warn!(
                    target: "stacwalk::spatial",
                    href = %node.href(),
                    error = %error,
                    "collection extent unusable, skipping collection",
                );
                FilterSignal::Skip
            }
        }
    })
}

/// Leaf stage: drop items whose bbox does not intersect the query bbox
pub fn item_bbox_stage(query: Bbox) -> FilterStage {
    Box::new(move |node: &WalkNode| {
        if node.is_branch() {
            return FilterSignal::Keep;
        }
        let Some(document) = resolve_for_filter(node) else {
            return FilterSignal::Skip;
        };
        let Some(item) = document.as_item() else {
            return FilterSignal::Skip;
        };
        match item.bbox() {
            Ok(bbox) if bbox.intersects(&query) => FilterSignal::Keep,
            Ok(_) => FilterSignal::Skip,
            Err(error) => {
                info!(
                    target: "stacwalk::spatial",
                    href = %node.href(),
                    error = %error,
                    "item bbox unusable, skipping",
                );
                FilterSignal::Skip
            }
        }
    })
}

/// Leaf stage: drop items whose geometry does not intersect the query
/// geometry, per the injected intersection engine
pub fn item_intersects_stage(
    query: Geometry,
    engine: Arc<dyn GeometryIntersect>,
) -> FilterStage {
    Box::new(move |node: &WalkNode| {
        if node.is_branch() {
            return FilterSignal::Keep;
        }
        let Some(document) = resolve_for_filter(node) else {
            return FilterSignal::Skip;
        };
        let Some(item) = document.as_item() else {
            return FilterSignal::Skip;
        };
        let geometry = match item.geometry() {
            Ok(value) => Geometry::GeoJson(value.clone()),
            Err(error) => {
                info!(
                    target: "stacwalk::spatial",
                    href = %node.href(),
                    error = %error,
                    "item geometry missing, skipping",
                );
                return FilterSignal::Skip;
            }
        };
        match engine.intersects(&query, &geometry) {
            Ok(true) => FilterSignal::Keep,
            Ok(false) => FilterSignal::Skip,
            Err(error) => {
                info!(
                    target: "stacwalk::spatial",
                    href = %node.href(),
                    error = %error,
                    "item geometry unusable, skipping",
                );
                FilterSignal::Skip
            }
        }
    })
}
