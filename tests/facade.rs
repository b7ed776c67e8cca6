//! Smoke test for the re-exported facade: everything needed to stand up a
//! client and search is reachable from the root crate.

use std::sync::Arc;

use stacwalk::{
    Bbox, Client, CollectionSearch, ItemSearch, MemoryFetcher, WalkSettings,
};

fn fetcher() -> Arc<MemoryFetcher> {
    let mut fetcher = MemoryFetcher::new();
    fetcher.insert_json(
        "mem://cat/catalog.json",
        &serde_json::json!({
            "type": "Catalog", "id": "root",
            "links": [{"rel": "child", "href": "./c1/collection.json"}]
        }),
    );
    fetcher.insert_json(
        "mem://cat/c1/collection.json",
        &serde_json::json!({
            "type": "Collection", "id": "c1",
            "extent": {
                "spatial": {"bbox": [[0.0, 0.0, 10.0, 10.0]]},
                "temporal": {"interval": [[null, null]]}
            },
            "links": [{"rel": "item", "href": "./i1/i1.json"}]
        }),
    );
    fetcher.insert_json(
        "mem://cat/c1/i1/i1.json",
        &serde_json::json!({
            "type": "Feature", "id": "i1",
            "bbox": [1.0, 1.0, 2.0, 2.0],
            "properties": {"datetime": "2025-06-15T00:00:00Z"},
            "links": []
        }),
    );
    Arc::new(fetcher)
}

#[test]
fn test_item_search_through_facade() {
    let client = Client::new(fetcher(), WalkSettings::new("mem://cat/catalog.json"));
    let page = client
        .search_items(&ItemSearch {
            bbox: Some(Bbox::new(0.0, 0.0, 5.0, 5.0)),
            ..ItemSearch::new()
        })
        .unwrap();
    assert_eq!(page.len(), 1);
}

#[test]
fn test_collection_search_through_facade() {
    let client = Client::new(fetcher(), WalkSettings::new("mem://cat/catalog.json"));
    let page = client.search_collections(&CollectionSearch::new()).unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page.nodes[0].resolve_id().unwrap(), "c1");
}
