//! Keyset pagination over walk streams
//!
//! A page is a window of the walk, addressed by an opaque marker token built
//! from a walk path. Because walk paths are stable content digests, a marker
//! stays valid across processes and across catalog growth elsewhere in the
//! tree: resuming from one re-enters the walk exactly where it left off.
//!
//! ## Contract
//!
//! - `next:p` pages forward: elements strictly after `p`.
//! - `prev:p` pages backward: the trailing window of elements up to and
//!   including `p`.
//! - Following a page's next marker and then that page's prev marker returns
//!   the original page.

use std::collections::VecDeque;
use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use thiserror::Error;

use stacwalk_core::{BadWalkPathLength, WalkPath};
use stacwalk_walk::{FilterSignal, FilterStage, WalkNode};

/// Which way a marker pages through the walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkDirection {
    /// Elements strictly after the marker path
    Next,
    /// The trailing window of elements up to and including the marker path
    Prev,
}

impl fmt::Display for WalkDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkDirection::Next => f.write_str("next"),
            WalkDirection::Prev => f.write_str("prev"),
        }
    }
}

/// A resumable position in the walk: a path plus a paging direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkMarker {
    /// The boundary walk path
    pub path: WalkPath,
    /// Paging direction relative to the boundary
    pub direction: WalkDirection,
}

/// Why a marker token could not be decoded
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MarkerError {
    /// Token was not `direction:payload`
    #[error("malformed marker token: {0}")]
    BadFormat(String),

    /// Direction was neither `next` nor `prev`
    #[error("unknown marker direction: {0}")]
    BadDirection(String),

    /// Payload was not valid base64
    #[error("marker payload is not valid base64: {0}")]
    BadEncoding(String),

    /// Decoded payload was not segment-aligned
    #[error(transparent)]
    BadLength(#[from] BadWalkPathLength),
}

impl WalkMarker {
    /// Forward marker: resume strictly after `path`
    pub fn next(path: WalkPath) -> Self {
        WalkMarker {
            path,
            direction: WalkDirection::Next,
        }
    }

    /// Backward marker: the window ending at `path`
    pub fn prev(path: WalkPath) -> Self {
        WalkMarker {
            path,
            direction: WalkDirection::Prev,
        }
    }

    /// Serialize to the opaque wire token
    pub fn to_token(&self) -> String {
        let bytes = self.path.as_bytes().unwrap_or(&[]);
        format!("{}:{}", self.direction, URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Decode a wire token
    pub fn from_token(token: &str) -> Result<Self, MarkerError> {
        let (direction, payload) = token
            .split_once(':')
            .ok_or_else(|| MarkerError::BadFormat(token.to_string()))?;
        let direction = match direction {
            "next" => WalkDirection::Next,
            "prev" => WalkDirection::Prev,
            other => return Err(MarkerError::BadDirection(other.to_string())),
        };
        let bytes = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|e| MarkerError::BadEncoding(e.to_string()))?;
        Ok(WalkMarker {
            path: WalkPath::from_bytes(bytes)?,
            direction,
        })
    }

    /// Lower bound of the walk range this marker can ever need
    pub fn start(&self) -> WalkPath {
        match self.direction {
            WalkDirection::Next => self.path.clone(),
            WalkDirection::Prev => WalkPath::Min,
        }
    }

    /// Upper bound of the walk range this marker can ever need
    pub fn end(&self) -> WalkPath {
        match self.direction {
            WalkDirection::Next => WalkPath::Max,
            WalkDirection::Prev => self.path.clone(),
        }
    }
}

/// One page of walk results plus the markers to its neighbors
#[derive(Debug)]
pub struct WalkPage {
    /// The page's nodes, in walk-path order
    pub nodes: Vec<WalkNode>,
    prev: Option<WalkPath>,
    next: Option<WalkPath>,
}

impl WalkPage {
    /// Marker for the previous page, if one exists
    pub fn prev_marker(&self) -> Option<WalkMarker> {
        self.prev.clone().map(WalkMarker::prev)
    }

    /// Marker for the next page, if one exists
    pub fn next_marker(&self) -> Option<WalkMarker> {
        self.next.clone().map(WalkMarker::next)
    }

    /// Wire token for the previous page
    pub fn prev_token(&self) -> Option<String> {
        self.prev_marker().map(|m| m.to_token())
    }

    /// Wire token for the next page
    pub fn next_token(&self) -> Option<String> {
        self.next_marker().map(|m| m.to_token())
    }

    /// Number of nodes on the page
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the page is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Cut one page out of a walk
///
/// With a `limit` of zero nothing is consumed and the page is empty.
pub fn paginate<I>(mut nodes: I, marker: Option<&WalkMarker>, limit: usize) -> WalkPage
where
    I: Iterator<Item = WalkNode>,
{
    if limit == 0 {
        return WalkPage {
            nodes: Vec::new(),
            prev: None,
            next: None,
        };
    }

    if let Some(marker) = marker {
        if marker.direction == WalkDirection::Prev {
            return paginate_backward(nodes, &marker.path, limit);
        }
    }

    let after = marker.map(|m| &m.path);
    let mut page = Vec::with_capacity(limit);
    for node in nodes.by_ref() {
        if let Some(after) = after {
            if node.path() <= after {
                continue;
            }
        }
        page.push(node);
        if page.len() == limit {
            break;
        }
    }

    let next = if page.len() == limit && nodes.next().is_some() {
        page.last().map(|n| n.path().clone())
    } else {
        None
    };
    WalkPage {
        nodes: page,
        prev: after.cloned(),
        next,
    }
}

fn paginate_backward<I>(nodes: I, boundary: &WalkPath, limit: usize) -> WalkPage
where
    I: Iterator<Item = WalkNode>,
{
    // Trailing window ending at the boundary, one element of slack to learn
    // whether an earlier page exists
    let mut window: VecDeque<WalkNode> = VecDeque::with_capacity(limit + 1);
    for node in nodes {
        if node.path() > boundary {
            break;
        }
        if window.len() == limit + 1 {
            window.pop_front();
        }
        window.push_back(node);
    }

    let prev = if window.len() == limit + 1 {
        window.pop_front().map(|n| n.path().clone())
    } else {
        None
    };
    let nodes: Vec<WalkNode> = window.into();
    let next = nodes.last().map(|n| n.path().clone());
    WalkPage { nodes, prev, next }
}

/// Stage that restricts a walk to the range a marker can need, pruning
/// subtrees that lie entirely outside it
///
/// Ancestors of in-range nodes are outside the range themselves but must
/// still be descended through; they are skipped, not pruned.
pub fn page_bound_stage(start: WalkPath, end: WalkPath) -> FilterStage {
    Box::new(move |node: &WalkNode| {
        let path = node.path();
        if *path < start {
            if !node.is_branch() {
                FilterSignal::Skip
            } else if path.contains(&start) {
                // Ancestor of the range start: descend without emitting
                FilterSignal::Skip
            } else {
                FilterSignal::Prune
            }
        } else if *path > end {
            if node.is_branch() {
                FilterSignal::Prune
            } else {
                FilterSignal::Skip
            }
        } else {
            FilterSignal::Keep
        }
    })
}
