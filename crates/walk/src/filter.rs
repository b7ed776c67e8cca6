//! Filter pipeline over a walk
//!
//! A [`FilteredWalk`] wraps a [`WalkStream`] with an ordered chain of stages.
//! Each stage sees every node the earlier stages let through and answers with
//! a [`FilterSignal`]: keep it, replace it, drop just it, or drop its whole
//! subtree. Prune is what makes filtered walks cheap: a stage that can prove
//! a branch's descendants are all irrelevant stops them from being fetched.

use std::sync::Arc;

use tracing::{info, warn};

use stacwalk_core::Document;

use crate::node::WalkNode;
use crate::walk::WalkStream;

/// One stage's verdict on one node
pub enum FilterSignal {
    /// Pass the node to the next stage
    Keep,
    /// Pass a replacement node to the next stage
    Transform(WalkNode),
    /// Drop this node; its subtree is still walked
    Skip,
    /// Drop this node and do not descend into its subtree
    Prune,
}

/// One filter stage
///
/// Stages are `FnMut` so they can carry state (pagination windows, resolved
/// query predicates) across nodes.
pub type FilterStage = Box<dyn FnMut(&WalkNode) -> FilterSignal + Send>;

/// A walk with a filter chain applied to every emitted node
pub struct FilteredWalk<W> {
    source: W,
    stages: Vec<FilterStage>,
}

impl<W: WalkStream> FilteredWalk<W> {
    /// Apply `stages`, in order, to every node `source` emits
    pub fn new(source: W, stages: Vec<FilterStage>) -> Self {
        FilteredWalk { source, stages }
    }

    /// Append one more stage after the existing chain
    pub fn push_stage(&mut self, stage: FilterStage) {
        self.stages.push(stage);
    }
}

impl<W: WalkStream> WalkStream for FilteredWalk<W> {
    fn next_node(&mut self) -> Option<WalkNode> {
        'nodes: loop {
            let mut node = self.source.next_node()?;
            for stage in &mut self.stages {
                match stage(&node) {
                    FilterSignal::Keep => {}
                    FilterSignal::Transform(replacement) => node = replacement,
                    FilterSignal::Skip => continue 'nodes,
                    FilterSignal::Prune => {
                        self.source.skip_subtree();
                        continue 'nodes;
                    }
                }
            }
            return Some(node);
        }
    }

    fn skip_subtree(&mut self) {
        self.source.skip_subtree()
    }
}

impl<W: WalkStream> Iterator for FilteredWalk<W> {
    type Item = WalkNode;

    fn next(&mut self) -> Option<WalkNode> {
        self.next_node()
    }
}

/// Resolve a node on behalf of a filter stage, logging failures
///
/// Branches get a warning (a whole subtree is affected), leaves get an info
/// line. Returns `None` on failure so the stage can skip the node; the walker
/// independently treats an unresolvable branch as empty.
pub fn resolve_for_filter(node: &WalkNode) -> Option<Arc<Document>> {
    match node.resolve() {
        Ok(document) => Some(document),
        Err(error) => {
            if node.is_branch() {
                warn!(
                    target: "stacwalk::filter",
                    href = %node.href(),
                    error = %error,
                    "skipping unresolvable branch",
                );
            } else {
                info!(
                    target: "stacwalk::filter",
                    href = %node.href(),
                    error = %error,
                    "skipping unresolvable item",
                );
            }
            None
        }
    }
}
