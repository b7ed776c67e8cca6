//! Walk paths: fixed-width, lexicographically comparable tree positions
//!
//! A walk path encodes a node's position in the catalog tree as one fixed-width
//! segment per level, root to leaf. Each segment is a content-derived digest of
//! the node's href, so comparisons are O(depth) and independent of href length.
//! Walk paths double as pagination cursors: the total order over paths is the
//! traversal order callers resume from.
//!
//! ## Contract
//!
//! - Segment width is [`SEGMENT_LEN`] for the whole system.
//! - Paths compare lexicographically, segment by segment.
//! - `P.contains(Q)` iff `Q` is inside `P`'s subtree (prefix rule).
//! - [`WalkPath::Min`] / [`WalkPath::Max`] compare below/above every real path
//!   and never equal one.
//!
//! Segment digests only need to be stable and practically collision-free;
//! collision resistance is a quality property, not a correctness requirement.

use std::fmt;

use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// Width of one walk path segment in bytes
pub const SEGMENT_LEN: usize = 8;

/// One fixed-width level of a walk path
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Segment([u8; SEGMENT_LEN]);

impl Segment {
    /// Raw digest bytes
    pub fn as_bytes(&self) -> &[u8; SEGMENT_LEN] {
        &self.0
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// A position in the catalog tree, usable as an opaque, comparable bookmark
///
/// The derived `Ord` gives exactly the contract order: `Min` below every
/// real path, `Max` above, real paths byte-wise lexicographic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WalkPath {
    /// Sentinel below every real path (unbounded range start)
    Min,
    /// A real position: concatenated segments, root to leaf
    Path(Vec<u8>),
    /// Sentinel above every real path (unbounded range end)
    Max,
}

/// Raised when decoding a cursor whose byte length is not segment-aligned
#[derive(Debug, Error, PartialEq, Eq)]
#[error("walk path length {0} is not a multiple of the segment width {SEGMENT_LEN}")]
pub struct BadWalkPathLength(pub usize);

impl WalkPath {
    /// The empty path of the tree root (ancestor of every real path)
    pub fn root() -> Self {
        WalkPath::Path(Vec::new())
    }

    /// Digest one href into a fixed-width segment
    pub fn encode_segment(part: &str) -> Segment {
        Segment(xxh3_64(part.as_bytes()).to_be_bytes())
    }

    /// Encode a root-to-leaf sequence of hrefs into a path
    pub fn encode<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = WalkPath::root();
        for part in parts {
            path = path.child(Self::encode_segment(part.as_ref()));
        }
        path
    }

    /// Decode a path from raw cursor bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, BadWalkPathLength> {
        if bytes.len() % SEGMENT_LEN != 0 {
            return Err(BadWalkPathLength(bytes.len()));
        }
        Ok(WalkPath::Path(bytes))
    }

    /// Raw cursor bytes; `None` for the sentinels, which are never serialized
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            WalkPath::Path(bytes) => Some(bytes),
            WalkPath::Min | WalkPath::Max => None,
        }
    }

    /// Extend this path by one child segment
    ///
    /// The sentinels are absorbing: they have no children.
    pub fn child(&self, segment: Segment) -> WalkPath {
        match self {
            WalkPath::Path(bytes) => {
                let mut child = Vec::with_capacity(bytes.len() + SEGMENT_LEN);
                child.extend_from_slice(bytes);
                child.extend_from_slice(segment.as_bytes());
                WalkPath::Path(child)
            }
            WalkPath::Min | WalkPath::Max => self.clone(),
        }
    }

    /// Number of segments (tree depth); 0 for the root and the sentinels
    pub fn len(&self) -> usize {
        match self {
            WalkPath::Path(bytes) => bytes.len() / SEGMENT_LEN,
            WalkPath::Min | WalkPath::Max => 0,
        }
    }

    /// Whether this is the empty root path or a sentinel
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The per-level segments of a real path, root first
    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        let bytes: &[u8] = match self {
            WalkPath::Path(bytes) => bytes,
            WalkPath::Min | WalkPath::Max => &[],
        };
        bytes.chunks_exact(SEGMENT_LEN).map(|chunk| {
            let mut segment = [0u8; SEGMENT_LEN];
            segment.copy_from_slice(chunk);
            Segment(segment)
        })
    }

    /// Whether `candidate` is this path or one of its descendants
    ///
    /// Sentinels contain only themselves.
    pub fn contains(&self, candidate: &WalkPath) -> bool {
        match (self, candidate) {
            (WalkPath::Path(prefix), WalkPath::Path(bytes)) => bytes.starts_with(prefix),
            _ => self == candidate,
        }
    }
}

impl fmt::Display for WalkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkPath::Min => write!(f, "<min>"),
            WalkPath::Max => write!(f, "<max>"),
            WalkPath::Path(_) => {
                let mut first = true;
                for segment in self.segments() {
                    if !first {
                        write!(f, "/")?;
                    }
                    write!(f, "{segment}")?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}
