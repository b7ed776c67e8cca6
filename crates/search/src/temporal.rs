//! Temporal filter stages
//!
//! Same two-layer shape as the spatial stages: collections prune on their
//! declared temporal extent, items are judged on their own datetime. All
//! interval comparisons are closed-closed with open bounds as infinities.

use tracing::{info, warn};

use stacwalk_core::Interval;
use stacwalk_walk::{resolve_for_filter, FilterSignal, FilterStage, WalkNode};

/// Coarse stage: prune collections whose declared temporal extent is disjoint
/// from the query interval
pub fn collection_temporal_stage(query: Interval, assume_extent_spec: bool) -> FilterStage {
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
        match collection.temporal_extent(assume_extent_spec) {
            Ok(extent) => {
                if extent.iter().any(|interval| interval.intersects(&query)) {
                    FilterSignal::Keep
                } else {
                    FilterSignal::Prune
                }
            }
            Err(error) => {
                warn!(
                    target: "stacwalk::temporal",
                    href = %node.href(),
                    error = %error,
                    "collection extent unusable, skipping collection",
                );
                FilterSignal::Skip
            }
        }
    })
}

/// Leaf stage: drop items whose datetime does not intersect the query
/// interval
pub fn item_temporal_stage(query: Interval) -> FilterStage {
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
        match item.datetime() {
            Ok(interval) if interval.intersects(&query) => FilterSignal::Keep,
            Ok(_) => FilterSignal::Skip,
            Err(error) => {
                info!(
                    target: "stacwalk::temporal",
                    href = %node.href(),
                    error = %error,
                    "item datetime unusable, skipping",
                );
                FilterSignal::Skip
            }
        }
    })
}
