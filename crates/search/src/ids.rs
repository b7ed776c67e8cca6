//! Kind and id scoping: stages and walk sources
//!
//! Searches narrow the walk two ways. Stages drop nodes of the wrong kind or
//! with the wrong id from the output (never pruning, since a matching node
//! can sit arbitrarily deep). Source builders go further: under the
//! best-practice layout, ids predict hrefs directly, and a search for known
//! ids becomes a handful of point fetches instead of a walk. Prediction is a
//! probe, not a promise: any miss falls back to walking.

use std::collections::HashSet;

use stacwalk_core::{resolve_href, DocKind, NodeKind, WalkPath};
use stacwalk_walk::{
    resolve_for_filter, ChainWalk, FilterSignal, FilterStage, FilteredWalk, FixedWalk, Walk,
    WalkContext, WalkNode, WalkStream,
};

/// Stage that keeps only items; branches are still descended into
pub fn items_only_stage() -> FilterStage {
    Box::new(|node: &WalkNode| {
        if node.is_branch() {
            FilterSignal::Skip
        } else {
            FilterSignal::Keep
        }
    })
}

/// Stage that keeps only collections; catalogs are descended into silently
/// and items are dropped
pub fn collections_only_stage() -> FilterStage {
    Box::new(|node: &WalkNode| {
        if !node.is_branch() {
            return FilterSignal::Skip;
        }
        match resolve_for_filter(node) {
            Some(document) if document.kind() == DocKind::Collection => FilterSignal::Keep,
            _ => FilterSignal::Skip,
        }
    })
}

/// Stage that keeps only nodes whose document id is in `ids`
///
/// Meant to run after a kind stage, so every node it sees is of the kind the
/// ids refer to. Unresolvable nodes cannot match.
pub fn id_stage(ids: Vec<String>) -> FilterStage {
    let ids: HashSet<String> = ids.into_iter().collect();
    Box::new(move |node: &WalkNode| match resolve_for_filter(node) {
        Some(document) if ids.contains(document.id()) => FilterSignal::Keep,
        _ => FilterSignal::Skip,
    })
}

/// Locate collections by id
///
/// Under the best-practice layout every id is probed at its predicted href
/// first; if any probe misses, the whole lookup falls back to walking so a
/// nonconforming catalog still gets correct results.
pub fn find_collections(ctx: &WalkContext, ids: &[String]) -> Vec<WalkNode> {
    if ctx.settings.assume_best_practice_layout {
        if let Some(nodes) = predict_collections(ctx, ids) {
            return nodes;
        }
    }

    let mut wanted: HashSet<&str> = ids.iter().map(String::as_str).collect();
    let mut found = Vec::new();
    let mut walk = FilteredWalk::new(
        Walk::new(ctx),
        vec![collections_only_stage(), id_stage(ids.to_vec())],
    );
    while let Some(node) = walk.next_node() {
        if let Ok(id) = node.resolve_id() {
            wanted.remove(id.as_str());
        }
        found.push(node);
        if wanted.is_empty() {
            break;
        }
    }
    found
}

fn predict_collections(ctx: &WalkContext, ids: &[String]) -> Option<Vec<WalkNode>> {
    let root = ctx.root_node();
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();
    for id in ids {
        let href = resolve_href(root.href(), &format!("{id}/collection.json")).ok()?;
        if !seen.insert(href.clone()) {
            continue;
        }
        let path = root.path().child(WalkPath::encode_segment(&href));
        let node = WalkNode::new(ctx.clone(), href, NodeKind::Branch, path);
        // Probe: the document must exist and actually be a collection
        let document = node.resolve().ok()?;
        if document.kind() != DocKind::Collection {
            return None;
        }
        nodes.push(node);
    }
    nodes.sort_by(|a, b| a.path().cmp(b.path()));
    Some(nodes)
}

/// Locate items by id within the given collections
///
/// Returns `None` when prediction is off or any id misses everywhere, in
/// which case the caller walks instead.
pub fn predict_items(
    ctx: &WalkContext,
    collections: &[WalkNode],
    ids: &[String],
) -> Option<Vec<WalkNode>> {
    if !ctx.settings.assume_best_practice_layout {
        return None;
    }
    let mut seen = HashSet::new();
    let mut nodes = Vec::new();
    for id in ids {
        let mut hit = false;
        for collection in collections {
            let Ok(href) = resolve_href(collection.href(), &format!("{id}/{id}.json")) else {
                continue;
            };
            if !seen.insert(href.clone()) {
                hit = true;
                continue;
            }
            let path = collection.path().child(WalkPath::encode_segment(&href));
            let node = WalkNode::new(ctx.clone(), href, NodeKind::Item, path);
            if node.resolve().is_ok() {
                hit = true;
                nodes.push(node);
            }
        }
        if !hit {
            return None;
        }
    }
    nodes.sort_by(|a, b| a.path().cmp(b.path()));
    Some(nodes)
}

/// Build the raw walk source for an item search
pub fn item_source(
    ctx: &WalkContext,
    collection_ids: Option<&[String]>,
    item_ids: Option<&[String]>,
) -> Box<dyn WalkStream> {
    match collection_ids {
        Some(collection_ids) => {
            let collections = find_collections(ctx, collection_ids);
            if let Some(item_ids) = item_ids {
                if let Some(nodes) = predict_items(ctx, &collections, item_ids) {
                    return Box::new(FixedWalk::new(nodes));
                }
            }
            Box::new(ChainWalk::new(
                collections.into_iter().map(Walk::below).collect(),
            ))
        }
        None => Box::new(Walk::new(ctx)),
    }
}

/// Build the raw walk source for a collection search
pub fn collection_source(ctx: &WalkContext, ids: Option<&[String]>) -> Box<dyn WalkStream> {
    if let (Some(ids), true) = (ids, ctx.settings.assume_best_practice_layout) {
        if let Some(nodes) = predict_collections(ctx, ids) {
            return Box::new(FixedWalk::new(nodes));
        }
    }
    Box::new(Walk::new(ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use stacwalk_core::{MemoryFetcher, WalkSettings};

    fn fixture(best_practice: bool) -> (WalkContext, Arc<MemoryFetcher>) {
        let mut fetcher = MemoryFetcher::new();
        fetcher.insert_json(
            "mem://cat/catalog.json",
            &json!({
                "type": "Catalog",
                "id": "root",
                "links": [
                    {"rel": "child", "href": "./c1/collection.json"},
                    {"rel": "child", "href": "./c2/collection.json"}
                ]
            }),
        );
        for (c, items) in [("c1", vec!["i1", "i2"]), ("c2", vec!["j1"])] {
            let links: Vec<_> = items
                .iter()
                .map(|i| json!({"rel": "item", "href": format!("./{i}/{i}.json")}))
                .collect();
            fetcher.insert_json(
                &format!("mem://cat/{c}/collection.json"),
                &json!({
                    "type": "Collection",
                    "id": c,
                    "extent": {
                        "spatial": {"bbox": [[-180.0, -90.0, 180.0, 90.0]]},
                        "temporal": {"interval": [[null, null]]}
                    },
                    "links": links
                }),
            );
            for i in items {
                fetcher.insert_json(
                    &format!("mem://cat/{c}/{i}/{i}.json"),
                    &json!({"type": "Feature", "id": i, "properties": {}, "links": []}),
                );
            }
        }
        let fetcher = Arc::new(fetcher);
        let settings = WalkSettings::new("mem://cat/catalog.json")
            .with_best_practice_layout(best_practice);
        let ctx = WalkContext::new(fetcher.clone(), settings);
        (ctx, fetcher)
    }

    fn ids(nodes: &[WalkNode]) -> Vec<String> {
        nodes.iter().map(|n| n.resolve_id().unwrap()).collect()
    }

    #[test]
    fn test_items_only() {
        let (ctx, _) = fixture(false);
        let items: Vec<WalkNode> =
            FilteredWalk::new(Walk::new(&ctx), vec![items_only_stage()]).collect();
        let mut found = ids(&items);
        found.sort();
        assert_eq!(found, vec!["i1", "i2", "j1"]);
    }

    #[test]
    fn test_collections_only() {
        let (ctx, _) = fixture(false);
        let collections: Vec<WalkNode> =
            FilteredWalk::new(Walk::new(&ctx), vec![collections_only_stage()]).collect();
        let mut found = ids(&collections);
        found.sort();
        assert_eq!(found, vec!["c1", "c2"]);
    }

    #[test]
    fn test_id_stage_filters() {
        let (ctx, _) = fixture(false);
        let items: Vec<WalkNode> = FilteredWalk::new(
            Walk::new(&ctx),
            vec![items_only_stage(), id_stage(vec!["i2".to_string()])],
        )
        .collect();
        assert_eq!(ids(&items), vec!["i2"]);
    }

    #[test]
    fn test_find_collections_by_walking() {
        let (ctx, _) = fixture(false);
        let found = find_collections(&ctx, &["c2".to_string()]);
        assert_eq!(ids(&found), vec!["c2"]);
    }

    #[test]
    fn test_find_collections_direct() {
        let (ctx, fetcher) = fixture(true);
        let found = find_collections(&ctx, &["c2".to_string()]);
        assert_eq!(ids(&found), vec!["c2"]);
        // Point fetch: the root catalog and c1 were never touched
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[test]
    fn test_find_collections_direct_miss_falls_back() {
        let (ctx, _) = fixture(true);
        let found = find_collections(&ctx, &["c2".to_string(), "ghost".to_string()]);
        // The walk fallback still finds the collection that exists
        assert_eq!(ids(&found), vec!["c2"]);
    }

    #[test]
    fn test_predict_items_direct() {
        let (ctx, fetcher) = fixture(true);
        let collections = find_collections(&ctx, &["c1".to_string()]);
        let items = predict_items(&ctx, &collections, &["i2".to_string()]).unwrap();
        assert_eq!(ids(&items), vec!["i2"]);
        // One fetch for the collection probe, one for the item probe
        assert_eq!(fetcher.fetch_count(), 2);
    }

    #[test]
    fn test_predict_items_miss_returns_none() {
        let (ctx, _) = fixture(true);
        let collections = find_collections(&ctx, &["c1".to_string()]);
        assert!(predict_items(&ctx, &collections, &["ghost".to_string()]).is_none());
    }

    #[test]
    fn test_item_source_scoped_to_collections() {
        let (ctx, _) = fixture(false);
        let source = item_source(&ctx, Some(&["c2".to_string()]), None);
        let mut found: Vec<String> = FilteredWalk::new(source, vec![items_only_stage()])
            .map(|n| n.resolve_id().unwrap())
            .collect();
        found.sort();
        assert_eq!(found, vec!["j1"]);
    }
}
