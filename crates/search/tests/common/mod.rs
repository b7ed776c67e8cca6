//! Shared in-memory catalog fixtures
//!
//! Catalogs follow the best-practice layout on disk so the same fixture
//! exercises both the walking and the direct-lookup paths.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};

use stacwalk_core::{MemoryFetcher, WalkSettings};
use stacwalk_search::{Client, WalkPage};

pub const CATALOG_HREF: &str = "mem://cat/catalog.json";

pub struct CollectionSpec {
    pub id: &'static str,
    pub bbox: [f64; 4],
    pub interval: [Option<&'static str>; 2],
    pub items: Vec<ItemSpec>,
}

pub struct ItemSpec {
    pub id: String,
    pub bbox: [f64; 4],
    pub datetime: Option<String>,
    pub cloud_cover: i64,
    pub platform: &'static str,
}

impl ItemSpec {
    pub fn new(id: &str, bbox: [f64; 4], datetime: &str) -> Self {
        ItemSpec {
            id: id.to_string(),
            bbox,
            datetime: Some(datetime.to_string()),
            cloud_cover: 0,
            platform: "landsat-8",
        }
    }

    pub fn cloud_cover(mut self, value: i64) -> Self {
        self.cloud_cover = value;
        self
    }

    pub fn platform(mut self, value: &'static str) -> Self {
        self.platform = value;
        self
    }

    fn to_json(&self, collection_id: &str) -> Value {
        let [xmin, ymin, xmax, ymax] = self.bbox;
        let center = [(xmin + xmax) / 2.0, (ymin + ymax) / 2.0];
        let mut properties = json!({
            "cloud_cover": self.cloud_cover,
            "platform": self.platform,
        });
        properties["datetime"] = match &self.datetime {
            Some(dt) => json!(dt),
            None => Value::Null,
        };
        json!({
            "type": "Feature",
            "id": self.id,
            "collection": collection_id,
            "bbox": self.bbox,
            "geometry": {"type": "Point", "coordinates": center},
            "properties": properties,
            "links": []
        })
    }
}

pub fn build_catalog(collections: &[CollectionSpec]) -> MemoryFetcher {
    let mut fetcher = MemoryFetcher::new();
    let children: Vec<Value> = collections
        .iter()
        .map(|c| json!({"rel": "child", "href": format!("./{}/collection.json", c.id)}))
        .collect();
    fetcher.insert_json(
        CATALOG_HREF,
        &json!({"type": "Catalog", "id": "root", "links": children}),
    );

    for collection in collections {
        let item_links: Vec<Value> = collection
            .items
            .iter()
            .map(|i| json!({"rel": "item", "href": format!("./{}/{}.json", i.id, i.id)}))
            .collect();
        let [xmin, ymin, xmax, ymax] = collection.bbox;
        fetcher.insert_json(
            &format!("mem://cat/{}/collection.json", collection.id),
            &json!({
                "type": "Collection",
                "id": collection.id,
                "extent": {
                    "spatial": {"bbox": [[xmin, ymin, xmax, ymax]]},
                    "temporal": {"interval": [collection.interval]}
                },
                "links": item_links
            }),
        );
        for item in &collection.items {
            fetcher.insert_json(
                &format!("mem://cat/{}/{}/{}.json", collection.id, item.id, item.id),
                &item.to_json(collection.id),
            );
        }
    }
    fetcher
}

/// Three collections in different places and eras:
/// - `sentinel`: bbox [0,0,20,20], June 2025, five items
/// - `landsat`: bbox [100,10,120,30], year 2020, three items
/// - `arctic`: bbox [-170,60,-160,80], year 1990, one item
pub fn geo_collections() -> Vec<CollectionSpec> {
    vec![
        CollectionSpec {
            id: "sentinel",
            bbox: [0.0, 0.0, 20.0, 20.0],
            interval: [Some("2025-06-01T00:00:00Z"), Some("2025-06-30T00:00:00Z")],
            items: vec![
                ItemSpec::new("s1", [1.0, 1.0, 2.0, 2.0], "2025-06-05T00:00:00Z")
                    .cloud_cover(10),
                ItemSpec::new("s2", [5.0, 5.0, 6.0, 6.0], "2025-06-10T00:00:00Z")
                    .cloud_cover(25),
                ItemSpec::new("s3", [9.0, 9.0, 10.0, 10.0], "2025-06-12T00:00:00Z")
                    .cloud_cover(50),
                ItemSpec::new("s4", [13.0, 13.0, 14.0, 14.0], "2025-06-14T00:00:00Z")
                    .cloud_cover(75)
                    .platform("sentinel-2"),
                ItemSpec::new("s5", [17.0, 17.0, 18.0, 18.0], "2025-06-25T00:00:00Z")
                    .cloud_cover(90)
                    .platform("sentinel-2"),
            ],
        },
        CollectionSpec {
            id: "landsat",
            bbox: [100.0, 10.0, 120.0, 30.0],
            interval: [Some("2020-01-01T00:00:00Z"), Some("2020-12-31T00:00:00Z")],
            items: vec![
                ItemSpec::new("l1", [101.0, 11.0, 102.0, 12.0], "2020-03-01T00:00:00Z")
                    .cloud_cover(5),
                ItemSpec::new("l2", [105.0, 15.0, 106.0, 16.0], "2020-06-01T00:00:00Z")
                    .cloud_cover(40),
                ItemSpec::new("l3", [110.0, 20.0, 111.0, 21.0], "2020-09-01T00:00:00Z")
                    .cloud_cover(80),
            ],
        },
        CollectionSpec {
            id: "arctic",
            bbox: [-170.0, 60.0, -160.0, 80.0],
            interval: [Some("1990-01-01T00:00:00Z"), Some("1990-12-31T00:00:00Z")],
            items: vec![ItemSpec::new(
                "a1",
                [-165.0, 70.0, -164.0, 71.0],
                "1990-06-01T00:00:00Z",
            )],
        },
    ]
}

pub fn geo_client(best_practice: bool) -> (Client, Arc<MemoryFetcher>) {
    let fetcher = Arc::new(build_catalog(&geo_collections()));
    let settings = WalkSettings::new(CATALOG_HREF).with_best_practice_layout(best_practice);
    (Client::new(fetcher.clone(), settings), fetcher)
}

/// One collection with 25 items, all in the same place and instant
pub fn big_collections(item_count: usize) -> Vec<CollectionSpec> {
    vec![CollectionSpec {
        id: "big",
        bbox: [0.0, 0.0, 10.0, 10.0],
        interval: [Some("2025-06-01T00:00:00Z"), Some("2025-06-30T00:00:00Z")],
        items: (0..item_count)
            .map(|i| {
                ItemSpec::new(
                    &format!("b{i:02}"),
                    [1.0, 1.0, 2.0, 2.0],
                    "2025-06-15T00:00:00Z",
                )
            })
            .collect(),
    }]
}

pub fn big_client(item_count: usize) -> (Client, Arc<MemoryFetcher>) {
    let fetcher = Arc::new(build_catalog(&big_collections(item_count)));
    (Client::new(fetcher.clone(), WalkSettings::new(CATALOG_HREF)), fetcher)
}

pub fn item_ids(page: &WalkPage) -> Vec<String> {
    page.nodes
        .iter()
        .map(|node| node.resolve_id().unwrap())
        .collect()
}

pub fn sorted_ids(page: &WalkPage) -> Vec<String> {
    let mut ids = item_ids(page);
    ids.sort();
    ids
}
