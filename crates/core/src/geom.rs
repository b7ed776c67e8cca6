//! Bounding boxes, query geometries, and the intersection capability
//!
//! Exact geometry math is an injected capability, not something this crate
//! implements: [`GeometryIntersect`] is the seam, and [`EnvelopeIntersect`]
//! is the built-in implementation that compares bounding envelopes only.
//! Callers that need exact polygon intersection inject their own engine.

use std::fmt;

use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

/// A 2D bounding box in lon/lat order, closed on all edges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bbox {
    /// West edge
    pub xmin: f64,
    /// South edge
    pub ymin: f64,
    /// East edge
    pub xmax: f64,
    /// North edge
    pub ymax: f64,
}

/// Malformed bbox or geometry content
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GeometryError {
    /// A bbox array had the wrong arity
    #[error("bbox must have 4 or 6 coordinates, got {0}")]
    BadBboxLength(usize),

    /// A bbox coordinate was not a finite number
    #[error("bbox coordinate is not a finite number")]
    BadBboxCoordinate,

    /// A GeoJSON geometry had no usable coordinates
    #[error("geometry has no coordinates")]
    EmptyGeometry,

    /// A GeoJSON geometry was structurally invalid
    #[error("malformed geometry: {0}")]
    Malformed(String),
}

impl Bbox {
    /// Build a bbox from corner coordinates
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Bbox {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Build a bbox from a STAC coordinate array (2D `[x1,y1,x2,y2]` or 3D
    /// `[x1,y1,z1,x2,y2,z2]`; the vertical axis is dropped)
    pub fn from_coords(coords: &[f64]) -> Result<Self, GeometryError> {
        let (xmin, ymin, xmax, ymax) = match coords.len() {
            4 => (coords[0], coords[1], coords[2], coords[3]),
            6 => (coords[0], coords[1], coords[3], coords[4]),
            len => return Err(GeometryError::BadBboxLength(len)),
        };
        if ![xmin, ymin, xmax, ymax].iter().all(|c| c.is_finite()) {
            return Err(GeometryError::BadBboxCoordinate);
        }
        Ok(Bbox::new(xmin, ymin, xmax, ymax))
    }

    /// Closed-edge overlap test: touching boxes intersect
    pub fn intersects(&self, other: &Bbox) -> bool {
        self.xmin <= other.xmax
            && other.xmin <= self.xmax
            && self.ymin <= other.ymax
            && other.ymin <= self.ymax
    }

    /// Smallest bbox covering both
    pub fn union(&self, other: &Bbox) -> Bbox {
        Bbox {
            xmin: self.xmin.min(other.xmin),
            ymin: self.ymin.min(other.ymin),
            xmax: self.xmax.max(other.xmax),
            ymax: self.ymax.max(other.ymax),
        }
    }
}

impl fmt::Display for Bbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

impl Serialize for Bbox {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(4))?;
        seq.serialize_element(&self.xmin)?;
        seq.serialize_element(&self.ymin)?;
        seq.serialize_element(&self.xmax)?;
        seq.serialize_element(&self.ymax)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Bbox {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BboxVisitor;

        impl<'de> Visitor<'de> for BboxVisitor {
            type Value = Bbox;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array of 4 or 6 numbers")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Bbox, A::Error> {
                let mut coords = Vec::with_capacity(6);
                while let Some(coord) = seq.next_element::<f64>()? {
                    coords.push(coord);
                }
                Bbox::from_coords(&coords).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_seq(BboxVisitor)
    }
}

/// A query geometry: either a plain bbox or a raw GeoJSON geometry object
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// An axis-aligned box
    Bbox(Bbox),
    /// A GeoJSON geometry value (`Point`, `Polygon`, `MultiPolygon`, ...)
    GeoJson(serde_json::Value),
}

impl Geometry {
    /// Bounding envelope of this geometry
    ///
    /// For GeoJSON this scans every coordinate position, recursing into
    /// `GeometryCollection` members.
    pub fn envelope(&self) -> Result<Bbox, GeometryError> {
        match self {
            Geometry::Bbox(bbox) => Ok(*bbox),
            Geometry::GeoJson(value) => geojson_envelope(value),
        }
    }
}

fn geojson_envelope(value: &serde_json::Value) -> Result<Bbox, GeometryError> {
    if let Some(members) = value.get("geometries").and_then(|g| g.as_array()) {
        let mut envelope: Option<Bbox> = None;
        for member in members {
            let bbox = geojson_envelope(member)?;
            envelope = Some(match envelope {
                Some(acc) => acc.union(&bbox),
                None => bbox,
            });
        }
        return envelope.ok_or(GeometryError::EmptyGeometry);
    }

    let coordinates = value
        .get("coordinates")
        .ok_or_else(|| GeometryError::Malformed("missing coordinates".to_string()))?;

    let mut envelope: Option<Bbox> = None;
    scan_positions(coordinates, &mut envelope)?;
    envelope.ok_or(GeometryError::EmptyGeometry)
}

/// Fold every `[x, y, ...]` position in a nested coordinate array into `acc`.
fn scan_positions(value: &serde_json::Value, acc: &mut Option<Bbox>) -> Result<(), GeometryError> {
    let array = value
        .as_array()
        .ok_or_else(|| GeometryError::Malformed("coordinates must be arrays".to_string()))?;

    if array.iter().all(|v| v.is_number()) {
        if array.len() < 2 {
            return Err(GeometryError::Malformed(
                "position must have at least 2 coordinates".to_string(),
            ));
        }
        let x = array[0].as_f64().ok_or(GeometryError::BadBboxCoordinate)?;
        let y = array[1].as_f64().ok_or(GeometryError::BadBboxCoordinate)?;
        if !x.is_finite() || !y.is_finite() {
            return Err(GeometryError::BadBboxCoordinate);
        }
        let point = Bbox::new(x, y, x, y);
        *acc = Some(match acc {
            Some(envelope) => envelope.union(&point),
            None => point,
        });
        return Ok(());
    }

    for nested in array {
        scan_positions(nested, acc)?;
    }
    Ok(())
}

/// Injected intersection test between two geometries
///
/// Must be safe for concurrent use by independent search requests.
pub trait GeometryIntersect: Send + Sync {
    /// Whether `a` and `b` intersect
    fn intersects(&self, a: &Geometry, b: &Geometry) -> Result<bool, GeometryError>;
}

/// Built-in intersection test over bounding envelopes
///
/// Conservative for exact-geometry purposes: envelopes that overlap may not
/// truly intersect, but disjoint envelopes are definitely disjoint, which is
/// what subtree pruning relies on.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvelopeIntersect;

impl GeometryIntersect for EnvelopeIntersect {
    fn intersects(&self, a: &Geometry, b: &Geometry) -> Result<bool, GeometryError> {
        Ok(a.envelope()?.intersects(&b.envelope()?))
    }
}
