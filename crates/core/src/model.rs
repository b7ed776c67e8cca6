//! STAC document model: catalogs, collections, items
//!
//! Documents parse strictly on their structural shape (`type`, `id`, links)
//! and leniently on filter-relevant content (extents, bbox, datetimes): a
//! collection with a malformed extent still parses, and the filter stage that
//! needs the extent converts the malformed field into a logged skip/prune.
//! This mirrors the error taxonomy: parse failures kill one node, bad content
//! kills one filter decision.
//!
//! The raw JSON value is retained on every document so content filters (CQL2)
//! can evaluate against the full field map without reserializing.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::error::BadObjectError;
use crate::geom::Bbox;
use crate::time::{parse_rfc3339, Interval};

/// Link relation that declares a branch child (catalog or collection)
pub const REL_CHILD: &str = "child";
/// Link relation that declares a leaf item
pub const REL_ITEM: &str = "item";

/// What a link declares its target to be, before resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A catalog or collection: may have children, is recursed into
    Branch,
    /// An item: a leaf, never recursed into
    Item,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Branch => f.write_str("branch"),
            NodeKind::Item => f.write_str("item"),
        }
    }
}

/// The kind a document actually resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocKind {
    /// A catalog document
    Catalog,
    /// A collection document
    Collection,
    /// An item (GeoJSON `Feature`) document
    Item,
}

impl DocKind {
    /// Whether this kind can declare children
    pub fn is_branch(&self) -> bool {
        matches!(self, DocKind::Catalog | DocKind::Collection)
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocKind::Catalog => f.write_str("catalog"),
            DocKind::Collection => f.write_str("collection"),
            DocKind::Item => f.write_str("item"),
        }
    }
}

/// One hyperlink out of a document
#[derive(Debug, Clone, Deserialize)]
pub struct Link {
    /// Relation of the link (`child`, `item`, `self`, ...)
    pub rel: String,
    /// Target href, possibly relative to the declaring document
    pub href: String,
    /// Declared media type, if any
    #[serde(default, rename = "type")]
    pub media_type: Option<String>,
    /// Human-readable title, if any
    #[serde(default)]
    pub title: Option<String>,
}

/// A parsed STAC document, dispatched on the `type` field
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum Document {
    /// A catalog: pure branch node
    Catalog(Catalog),
    /// A collection: branch node with declared aggregate extents
    Collection(Collection),
    /// An item: leaf node (STAC items are GeoJSON features)
    #[serde(rename = "Feature")]
    Item(Item),
}

/// A catalog document
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    /// Catalog id
    pub id: String,
    /// Title, if any
    #[serde(default)]
    pub title: Option<String>,
    /// Description, if any
    #[serde(default)]
    pub description: Option<String>,
    /// Declared links
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(skip)]
    raw: Value,
}

/// A collection document
#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    /// Collection id
    pub id: String,
    /// Title, if any
    #[serde(default)]
    pub title: Option<String>,
    /// Description, if any
    #[serde(default)]
    pub description: Option<String>,
    /// Declared aggregate extent, kept raw and interpreted at filter time
    #[serde(default)]
    pub extent: Option<Value>,
    /// Declared links
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(skip)]
    raw: Value,
}

/// An item document
#[derive(Debug, Clone, Deserialize)]
pub struct Item {
    /// Item id
    pub id: String,
    /// Bounding box coordinates as declared (interpreted at filter time)
    #[serde(default)]
    pub bbox: Option<Vec<f64>>,
    /// GeoJSON geometry as declared
    #[serde(default)]
    pub geometry: Option<Value>,
    /// Item properties (datetime and everything else)
    #[serde(default)]
    pub properties: Value,
    /// Id of the collection this item belongs to, if declared
    #[serde(default)]
    pub collection: Option<String>,
    /// Declared links
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(skip)]
    raw: Value,
}

impl Document {
    /// Parse a document from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Document, serde_json::Error> {
        let value: Value = serde_json::from_slice(bytes)?;
        Document::from_value(value)
    }

    /// Parse a document from an already-decoded JSON value
    pub fn from_value(value: Value) -> Result<Document, serde_json::Error> {
        let mut document: Document = serde_json::from_value(value.clone())?;
        match &mut document {
            Document::Catalog(catalog) => catalog.raw = value,
            Document::Collection(collection) => collection.raw = value,
            Document::Item(item) => item.raw = value,
        }
        Ok(document)
    }

    /// The kind this document resolved to
    pub fn kind(&self) -> DocKind {
        match self {
            Document::Catalog(_) => DocKind::Catalog,
            Document::Collection(_) => DocKind::Collection,
            Document::Item(_) => DocKind::Item,
        }
    }

    /// Document id
    pub fn id(&self) -> &str {
        match self {
            Document::Catalog(catalog) => &catalog.id,
            Document::Collection(collection) => &collection.id,
            Document::Item(item) => &item.id,
        }
    }

    /// Declared links
    pub fn links(&self) -> &[Link] {
        match self {
            Document::Catalog(catalog) => &catalog.links,
            Document::Collection(collection) => &collection.links,
            Document::Item(item) => &item.links,
        }
    }

    /// The full JSON value this document was parsed from
    pub fn raw(&self) -> &Value {
        match self {
            Document::Catalog(catalog) => &catalog.raw,
            Document::Collection(collection) => &collection.raw,
            Document::Item(item) => &item.raw,
        }
    }

    /// Hrefs of declared branch children, in declaration order
    pub fn child_hrefs(&self) -> impl Iterator<Item = &str> {
        self.links_with_rel(REL_CHILD)
    }

    /// Hrefs of declared items, in declaration order
    pub fn item_hrefs(&self) -> impl Iterator<Item = &str> {
        self.links_with_rel(REL_ITEM)
    }

    fn links_with_rel<'a>(&'a self, rel: &'a str) -> impl Iterator<Item = &'a str> {
        self.links()
            .iter()
            .filter(move |link| link.rel == rel)
            .map(|link| link.href.as_str())
    }

    /// This document as a collection, if it is one
    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Document::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    /// This document as an item, if it is one
    pub fn as_item(&self) -> Option<&Item> {
        match self {
            Document::Item(item) => Some(item),
            _ => None,
        }
    }

    /// This document as a catalog, if it is one
    pub fn as_catalog(&self) -> Option<&Catalog> {
        match self {
            Document::Catalog(catalog) => Some(catalog),
            _ => None,
        }
    }
}

impl Collection {
    /// Effective spatial extent as a list of bboxes whose union is the extent
    ///
    /// The STAC extent spec says the first bbox aggregates the others; when
    /// `assume_extent_spec` is set and finer boxes exist, the coarse aggregate
    /// is dropped for tighter pruning.
    pub fn spatial_extent(&self, assume_extent_spec: bool) -> Result<Vec<Bbox>, BadObjectError> {
        let raw_boxes = self
            .extent
            .as_ref()
            .and_then(|extent| extent.pointer("/spatial/bbox"))
            .and_then(Value::as_array)
            .ok_or_else(|| BadObjectError::new(&self.id, "missing spatial extent"))?;

        let mut boxes = Vec::with_capacity(raw_boxes.len());
        for raw in raw_boxes {
            let coords: Vec<f64> = raw
                .as_array()
                .map(|values| values.iter().filter_map(Value::as_f64).collect())
                .unwrap_or_default();
            let parsed = Bbox::from_coords(&coords)
                .map_err(|e| BadObjectError::new(&self.id, format!("bad extent bbox: {e}")))?;
            boxes.push(parsed);
        }
        if boxes.is_empty() {
            return Err(BadObjectError::new(&self.id, "empty spatial extent"));
        }
        if assume_extent_spec && boxes.len() > 1 {
            boxes.remove(0);
        }
        Ok(boxes)
    }

    /// Effective temporal extent as a list of intervals, same aggregate rule
    /// as [`Collection::spatial_extent`]
    pub fn temporal_extent(&self, assume_extent_spec: bool) -> Result<Vec<Interval>, BadObjectError> {
        let raw_intervals = self
            .extent
            .as_ref()
            .and_then(|extent| extent.pointer("/temporal/interval"))
            .and_then(Value::as_array)
            .ok_or_else(|| BadObjectError::new(&self.id, "missing temporal extent"))?;

        let mut intervals = Vec::with_capacity(raw_intervals.len());
        for raw in raw_intervals {
            let parsed: Interval = serde_json::from_value(raw.clone())
                .map_err(|e| BadObjectError::new(&self.id, format!("bad extent interval: {e}")))?;
            intervals.push(parsed);
        }
        if intervals.is_empty() {
            return Err(BadObjectError::new(&self.id, "empty temporal extent"));
        }
        if assume_extent_spec && intervals.len() > 1 {
            intervals.remove(0);
        }
        Ok(intervals)
    }
}

impl Item {
    /// The item's own bounding box
    pub fn bbox(&self) -> Result<Bbox, BadObjectError> {
        let coords = self
            .bbox
            .as_ref()
            .ok_or_else(|| BadObjectError::new(&self.id, "missing bbox"))?;
        Bbox::from_coords(coords)
            .map_err(|e| BadObjectError::new(&self.id, format!("bad bbox: {e}")))
    }

    /// The item's own GeoJSON geometry
    pub fn geometry(&self) -> Result<&Value, BadObjectError> {
        match &self.geometry {
            Some(geometry) if !geometry.is_null() => Ok(geometry),
            _ => Err(BadObjectError::new(&self.id, "missing geometry")),
        }
    }

    /// The item's temporal coverage: `properties.datetime` as an instant, or
    /// `start_datetime`/`end_datetime` as an interval when datetime is null
    pub fn datetime(&self) -> Result<Interval, BadObjectError> {
        let bad = |message: String| BadObjectError::new(&self.id, message);

        if let Some(datetime) = self.properties.get("datetime").and_then(Value::as_str) {
            let instant =
                parse_rfc3339(datetime).map_err(|e| bad(format!("bad datetime: {e}")))?;
            return Ok(Interval::instant(instant));
        }

        let bound = |field: &str| -> Result<Option<chrono::DateTime<chrono::Utc>>, BadObjectError> {
            match self.properties.get(field).and_then(Value::as_str) {
                Some(value) => parse_rfc3339(value)
                    .map(Some)
                    .map_err(|e| bad(format!("bad {field}: {e}"))),
                None => Ok(None),
            }
        };

        let start = bound("start_datetime")?;
        let end = bound("end_datetime")?;
        if start.is_none() && end.is_none() {
            return Err(bad("missing datetime".to_string()));
        }
        Ok(Interval::new(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn parse(value: Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_catalog() {
        let doc = parse(json!({
            "type": "Catalog",
            "id": "root",
            "description": "test catalog",
            "links": [
                {"rel": "child", "href": "./c1/collection.json"},
                {"rel": "self", "href": "./catalog.json"}
            ]
        }));
        assert_eq!(doc.kind(), DocKind::Catalog);
        assert_eq!(doc.id(), "root");
        let children: Vec<&str> = doc.child_hrefs().collect();
        assert_eq!(children, vec!["./c1/collection.json"]);
        assert_eq!(doc.item_hrefs().count(), 0);
    }

    #[test]
    fn test_parse_item_is_feature() {
        let doc = parse(json!({
            "type": "Feature",
            "id": "item-1",
            "bbox": [0.0, 0.0, 1.0, 1.0],
            "geometry": {"type": "Point", "coordinates": [0.5, 0.5]},
            "properties": {"datetime": "2025-06-11T00:00:00Z"},
            "collection": "c1",
            "links": []
        }));
        assert_eq!(doc.kind(), DocKind::Item);
        let item = doc.as_item().unwrap();
        assert_eq!(item.bbox().unwrap(), Bbox::new(0.0, 0.0, 1.0, 1.0));
        assert_eq!(
            item.datetime().unwrap(),
            Interval::instant(Utc.with_ymd_and_hms(2025, 6, 11, 0, 0, 0).unwrap()),
        );
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        assert!(Document::from_value(json!({"type": "Nonsense", "id": "x"})).is_err());
        assert!(Document::from_bytes(b"not json").is_err());
    }

    #[test]
    fn test_raw_is_retained() {
        let doc = parse(json!({
            "type": "Feature",
            "id": "item-1",
            "properties": {"custom": 42},
        }));
        assert_eq!(doc.raw().pointer("/properties/custom"), Some(&json!(42)));
    }

    #[test]
    fn test_collection_spatial_extent_aggregate_rule() {
        let doc = parse(json!({
            "type": "Collection",
            "id": "c1",
            "extent": {
                "spatial": {"bbox": [[0.0, 0.0, 10.0, 10.0], [0.0, 0.0, 5.0, 5.0], [6.0, 6.0, 10.0, 10.0]]},
                "temporal": {"interval": [["2020-01-01T00:00:00Z", null]]}
            }
        }));
        let collection = doc.as_collection().unwrap();

        // Spec assumed: the coarse aggregate is dropped
        let fine = collection.spatial_extent(true).unwrap();
        assert_eq!(fine.len(), 2);
        assert_eq!(fine[0], Bbox::new(0.0, 0.0, 5.0, 5.0));

        // Spec not assumed: every declared box participates
        let coarse = collection.spatial_extent(false).unwrap();
        assert_eq!(coarse.len(), 3);

        let intervals = collection.temporal_extent(true).unwrap();
        assert_eq!(intervals.len(), 1);
        assert!(intervals[0].end.is_none());
    }

    #[test]
    fn test_collection_single_bbox_is_kept() {
        let doc = parse(json!({
            "type": "Collection",
            "id": "c1",
            "extent": {"spatial": {"bbox": [[0.0, 0.0, 1.0, 1.0]]}}
        }));
        let boxes = doc.as_collection().unwrap().spatial_extent(true).unwrap();
        assert_eq!(boxes, vec![Bbox::new(0.0, 0.0, 1.0, 1.0)]);
    }

    #[test]
    fn test_collection_missing_extent_is_bad_object() {
        let doc = parse(json!({"type": "Collection", "id": "c1"}));
        let collection = doc.as_collection().unwrap();
        assert!(collection.spatial_extent(true).is_err());
        assert!(collection.temporal_extent(true).is_err());
    }

    #[test]
    fn test_collection_bad_extent_bbox_is_bad_object() {
        let doc = parse(json!({
            "type": "Collection",
            "id": "c1",
            "extent": {"spatial": {"bbox": [[0.0, 0.0, 1.0]]}}
        }));
        let err = doc.as_collection().unwrap().spatial_extent(true).unwrap_err();
        assert!(err.to_string().contains("bad extent bbox"));
    }

    #[test]
    fn test_item_missing_bbox_and_geometry() {
        let doc = parse(json!({"type": "Feature", "id": "item-1", "properties": {}}));
        let item = doc.as_item().unwrap();
        assert!(item.bbox().is_err());
        assert!(item.geometry().is_err());
        assert!(item.datetime().is_err());
    }

    #[test]
    fn test_item_interval_datetime() {
        let doc = parse(json!({
            "type": "Feature",
            "id": "item-1",
            "properties": {
                "datetime": null,
                "start_datetime": "2025-06-10T00:00:00Z",
                "end_datetime": "2025-06-15T00:00:00Z"
            }
        }));
        let interval = doc.as_item().unwrap().datetime().unwrap();
        assert_eq!(
            interval,
            Interval::new(
                Some(Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap()),
                Some(Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap()),
            ),
        );
    }
}
