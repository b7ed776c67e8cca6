//! Depth-first catalog traversal
//!
//! [`Walk`] emits every descendant of the root in preorder, children sorted by
//! walk path, and resolves documents only when it must: a node is emitted
//! unresolved, and its document is fetched when the walk descends into it (or
//! when a filter asks for it, whichever comes first). [`WalkStream::skip_subtree`]
//! cancels the pending descent into the most recently emitted branch, so a
//! pruned subtree costs zero fetches.
//!
//! Unreachable or malformed branches are logged and treated as empty; a broken
//! subtree never aborts the walk.

use std::collections::VecDeque;

use tracing::warn;

use stacwalk_core::{resolve_href, NodeKind, WalkPath};

use crate::node::{WalkContext, WalkNode};

/// A resumable stream of catalog nodes in walk-path order
pub trait WalkStream {
    /// The next node, or `None` when the stream is exhausted
    fn next_node(&mut self) -> Option<WalkNode>;

    /// Do not descend into the most recently emitted branch
    ///
    /// A no-op when the last emitted node was a leaf or nothing was emitted.
    fn skip_subtree(&mut self);
}

impl<W: WalkStream + ?Sized> WalkStream for Box<W> {
    fn next_node(&mut self) -> Option<WalkNode> {
        (**self).next_node()
    }

    fn skip_subtree(&mut self) {
        (**self).skip_subtree()
    }
}

/// Preorder traversal of one catalog tree
///
/// The root itself is never emitted; the stream starts at its children.
pub struct Walk {
    frames: Vec<VecDeque<WalkNode>>,
    pending: Option<WalkNode>,
}

impl Walk {
    /// Walk the catalog the context is rooted at
    pub fn new(ctx: &WalkContext) -> Self {
        Walk {
            frames: Vec::new(),
            pending: Some(ctx.root_node()),
        }
    }

    /// Walk the subtree below `branch` (the branch itself is not emitted)
    pub fn below(branch: WalkNode) -> Self {
        Walk {
            frames: Vec::new(),
            pending: Some(branch),
        }
    }

    fn descend(&mut self, branch: &WalkNode) {
        let document = match branch.resolve() {
            Ok(document) => document,
            Err(error) => {
                warn!(
                    target: "stacwalk::walk",
                    href = %branch.href(),
                    error = %error,
                    "skipping unreachable branch",
                );
                return;
            }
        };

        let ctx = branch.ctx();
        let declared = document
            .item_hrefs()
            .map(|href| (href, NodeKind::Item))
            .chain(document.child_hrefs().map(|href| (href, NodeKind::Branch)));

        let mut children = Vec::new();
        for (href, kind) in declared {
            let resolved = if ctx.settings.assume_absolute_hrefs {
                href.to_string()
            } else {
                match resolve_href(branch.href(), href) {
                    Ok(resolved) => resolved,
                    Err(error) => {
                        warn!(
                            target: "stacwalk::walk",
                            href = %href,
                            error = %error,
                            "skipping unresolvable link",
                        );
                        continue;
                    }
                }
            };
            let path = branch.path().child(WalkPath::encode_segment(&resolved));
            children.push(WalkNode::new(ctx.clone(), resolved, kind, path));
        }
        children.sort_by(|a, b| a.path().cmp(b.path()));
        self.frames.push(children.into());
    }
}

impl WalkStream for Walk {
    fn next_node(&mut self) -> Option<WalkNode> {
        if let Some(branch) = self.pending.take() {
            self.descend(&branch);
        }
        while let Some(frame) = self.frames.last_mut() {
            match frame.pop_front() {
                Some(node) => {
                    if node.is_branch() {
                        self.pending = Some(node.clone());
                    }
                    return Some(node);
                }
                None => {
                    self.frames.pop();
                }
            }
        }
        None
    }

    fn skip_subtree(&mut self) {
        self.pending = None;
    }
}

impl Iterator for Walk {
    type Item = WalkNode;

    fn next(&mut self) -> Option<WalkNode> {
        self.next_node()
    }
}

/// Several walks consumed back to back
pub struct ChainWalk<W> {
    walks: VecDeque<W>,
}

impl<W: WalkStream> ChainWalk<W> {
    /// Chain `walks` in the given order
    pub fn new(walks: Vec<W>) -> Self {
        ChainWalk {
            walks: walks.into(),
        }
    }
}

impl<W: WalkStream> WalkStream for ChainWalk<W> {
    fn next_node(&mut self) -> Option<WalkNode> {
        while let Some(walk) = self.walks.front_mut() {
            match walk.next_node() {
                Some(node) => return Some(node),
                None => {
                    self.walks.pop_front();
                }
            }
        }
        None
    }

    fn skip_subtree(&mut self) {
        if let Some(walk) = self.walks.front_mut() {
            walk.skip_subtree();
        }
    }
}

impl<W: WalkStream> Iterator for ChainWalk<W> {
    type Item = WalkNode;

    fn next(&mut self) -> Option<WalkNode> {
        self.next_node()
    }
}

/// A pre-assembled stream of nodes, emitted in walk-path order
///
/// Used for direct id lookups where the node set is known without walking.
/// Subtree skipping is a no-op: fixed streams never descend.
pub struct FixedWalk {
    nodes: VecDeque<WalkNode>,
}

impl FixedWalk {
    /// Stream `nodes`, sorted into walk-path order
    pub fn new(mut nodes: Vec<WalkNode>) -> Self {
        nodes.sort_by(|a, b| a.path().cmp(b.path()));
        FixedWalk {
            nodes: nodes.into(),
        }
    }
}

impl WalkStream for FixedWalk {
    fn next_node(&mut self) -> Option<WalkNode> {
        self.nodes.pop_front()
    }

    fn skip_subtree(&mut self) {}
}

impl Iterator for FixedWalk {
    type Item = WalkNode;

    fn next(&mut self) -> Option<WalkNode> {
        self.next_node()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use stacwalk_core::{Fetch, MemoryFetcher, WalkSettings};

    fn collection(id: &str, items: &[&str]) -> serde_json::Value {
        let links: Vec<_> = items
            .iter()
            .map(|i| json!({"rel": "item", "href": format!("./{i}/{i}.json")}))
            .collect();
        json!({
            "type": "Collection",
            "id": id,
            "extent": {
                "spatial": {"bbox": [[-180.0, -90.0, 180.0, 90.0]]},
                "temporal": {"interval": [[null, null]]}
            },
            "links": links
        })
    }

    fn item(id: &str) -> serde_json::Value {
        json!({
            "type": "Feature",
            "id": id,
            "properties": {"datetime": "2025-06-11T00:00:00Z"},
            "links": []
        })
    }

    /// Root catalog with c1 -> {i1, i2} and c2 -> {j1}
    fn fixture() -> (WalkContext, Arc<MemoryFetcher>) {
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
        fetcher.insert_json("mem://cat/c1/collection.json", &collection("c1", &["i1", "i2"]));
        fetcher.insert_json("mem://cat/c1/i1/i1.json", &item("i1"));
        fetcher.insert_json("mem://cat/c1/i2/i2.json", &item("i2"));
        fetcher.insert_json("mem://cat/c2/collection.json", &collection("c2", &["j1"]));
        fetcher.insert_json("mem://cat/c2/j1/j1.json", &item("j1"));

        let fetcher = Arc::new(fetcher);
        let ctx = WalkContext::new(fetcher.clone(), WalkSettings::new("mem://cat/catalog.json"));
        (ctx, fetcher)
    }

    #[test]
    fn test_walk_emits_descendants_in_path_order() {
        let (ctx, _) = fixture();
        let nodes: Vec<WalkNode> = Walk::new(&ctx).collect();

        assert_eq!(nodes.len(), 5);
        assert!(nodes.iter().all(|n| n.href() != "mem://cat/catalog.json"));

        for pair in nodes.windows(2) {
            assert!(pair[0].path() < pair[1].path());
        }
        for node in &nodes {
            assert!(WalkPath::root().contains(node.path()));
        }
    }

    #[test]
    fn test_items_are_contained_by_their_collection() {
        let (ctx, _) = fixture();
        let nodes: Vec<WalkNode> = Walk::new(&ctx).collect();

        let c1 = nodes
            .iter()
            .find(|n| n.href() == "mem://cat/c1/collection.json")
            .unwrap();
        let i1 = nodes
            .iter()
            .find(|n| n.href() == "mem://cat/c1/i1/i1.json")
            .unwrap();
        let c2 = nodes
            .iter()
            .find(|n| n.href() == "mem://cat/c2/collection.json")
            .unwrap();

        assert!(c1.path().contains(i1.path()));
        assert!(!c2.path().contains(i1.path()));
        assert_eq!(i1.path().len(), 2);
        assert_eq!(c1.path().len(), 1);
    }

    #[test]
    fn test_emission_is_lazy() {
        let (ctx, fetcher) = fixture();
        let mut walk = Walk::new(&ctx);

        // Emitting the first child costs one fetch: the root itself
        let first = walk.next_node().unwrap();
        assert_eq!(fetcher.fetch_count(), 1);
        assert!(first.is_branch());
    }

    #[test]
    fn test_skip_subtree_prunes_without_fetching() {
        let (ctx, fetcher) = fixture();
        let mut walk = Walk::new(&ctx);

        let mut emitted = Vec::new();
        while let Some(node) = walk.next_node() {
            if node.is_branch() {
                walk.skip_subtree();
            }
            emitted.push(node);
        }

        // Only the two collections came out, and neither was ever fetched
        assert_eq!(emitted.len(), 2);
        assert!(emitted.iter().all(|n| n.is_branch()));
        assert_eq!(fetcher.fetch_count(), 1);
    }

    #[test]
    fn test_broken_branch_is_treated_as_empty() {
        let (_ctx, fetcher) = fixture();
        // Re-register the catalog with a dangling child link
        let mut broken = MemoryFetcher::new();
        for href in [
            "mem://cat/catalog.json",
            "mem://cat/c2/collection.json",
            "mem://cat/c2/j1/j1.json",
        ] {
            broken.insert(href, fetcher.fetch(href).unwrap());
        }
        broken.insert_json(
            "mem://cat/catalog.json",
            &json!({
                "type": "Catalog",
                "id": "root",
                "links": [
                    {"rel": "child", "href": "./gone/collection.json"},
                    {"rel": "child", "href": "./c2/collection.json"}
                ]
            }),
        );
        let ctx = WalkContext::new(Arc::new(broken), WalkSettings::new("mem://cat/catalog.json"));

        let nodes: Vec<WalkNode> = Walk::new(&ctx).collect();
        let hrefs: Vec<&str> = nodes.iter().map(WalkNode::href).collect();

        // The dangling branch is emitted, then yields nothing
        assert!(hrefs.contains(&"mem://cat/gone/collection.json"));
        assert!(hrefs.contains(&"mem://cat/c2/j1/j1.json"));
        assert_eq!(nodes.len(), 3);
    }

    #[test]
    fn test_chain_walk() {
        let (ctx, _) = fixture();
        let all: Vec<WalkNode> = Walk::new(&ctx).collect();
        let c1 = all
            .iter()
            .find(|n| n.href() == "mem://cat/c1/collection.json")
            .unwrap();
        let c2 = all
            .iter()
            .find(|n| n.href() == "mem://cat/c2/collection.json")
            .unwrap();

        let chained: Vec<WalkNode> =
            ChainWalk::new(vec![Walk::below(c1.clone()), Walk::below(c2.clone())]).collect();
        assert_eq!(chained.len(), 3);
        assert!(chained[..2].iter().all(|n| c1.path().contains(n.path())));
        assert!(c2.path().contains(chained[2].path()));
    }

    #[test]
    fn test_fixed_walk_sorts_by_path() {
        let (ctx, _) = fixture();
        let mut nodes: Vec<WalkNode> = Walk::new(&ctx).collect();
        nodes.reverse();

        let fixed: Vec<WalkNode> = FixedWalk::new(nodes).collect();
        for pair in fixed.windows(2) {
            assert!(pair[0].path() < pair[1].path());
        }
    }
}
