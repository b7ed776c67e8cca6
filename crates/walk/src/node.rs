//! Lazy catalog nodes
//!
//! A [`WalkNode`] is a reference to a document that may never be fetched: it
//! carries the href, the kind its parent's link declared, and its walk path.
//! Resolution happens at most once per node; the outcome (document or error)
//! is cached and shared, so repeated filter stages asking for the document
//! cost one fetch total.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use stacwalk_core::{Document, Fetch, NodeKind, ResolveError, WalkPath, WalkSettings};

/// Shared per-walk state: the fetch capability and the catalog assumptions
#[derive(Clone)]
pub struct WalkContext {
    /// Injected fetch capability
    pub fetcher: Arc<dyn Fetch>,
    /// Per-catalog assumptions
    pub settings: Arc<WalkSettings>,
}

impl WalkContext {
    /// Build a context from a fetch capability and settings
    pub fn new(fetcher: Arc<dyn Fetch>, settings: WalkSettings) -> Self {
        WalkContext {
            fetcher,
            settings: Arc::new(settings),
        }
    }

    /// The unresolved root node of the configured catalog
    pub fn root_node(&self) -> WalkNode {
        WalkNode::new(
            self.clone(),
            self.settings.catalog_href.clone(),
            NodeKind::Branch,
            WalkPath::root(),
        )
    }
}

impl fmt::Debug for WalkContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkContext")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

struct NodeInner {
    href: String,
    declared: NodeKind,
    path: WalkPath,
    ctx: WalkContext,
    resolved: OnceCell<Result<Arc<Document>, ResolveError>>,
}

/// A lazily-resolved position in the catalog tree
///
/// Cheap to clone; clones share the resolution cache.
#[derive(Clone)]
pub struct WalkNode {
    inner: Arc<NodeInner>,
}

impl WalkNode {
    /// Build an unresolved node
    pub fn new(ctx: WalkContext, href: String, declared: NodeKind, path: WalkPath) -> Self {
        WalkNode {
            inner: Arc::new(NodeInner {
                href,
                declared,
                path,
                ctx,
                resolved: OnceCell::new(),
            }),
        }
    }

    /// Href this node resolves through
    pub fn href(&self) -> &str {
        &self.inner.href
    }

    /// Kind the parent's link declared for this node
    pub fn declared(&self) -> NodeKind {
        self.inner.declared
    }

    /// Whether this node is recursed into (declared catalog or collection)
    pub fn is_branch(&self) -> bool {
        self.inner.declared == NodeKind::Branch
    }

    /// This node's position in the catalog tree
    pub fn path(&self) -> &WalkPath {
        &self.inner.path
    }

    /// The walk context this node belongs to
    pub fn ctx(&self) -> &WalkContext {
        &self.inner.ctx
    }

    /// Fetch and parse the document, at most once
    ///
    /// The first call does the work; every later call (from any clone) returns
    /// the cached outcome, including a cached failure.
    pub fn resolve(&self) -> Result<Arc<Document>, ResolveError> {
        self.inner
            .resolved
            .get_or_init(|| self.resolve_inner())
            .clone()
    }

    /// Resolve and return the document id
    pub fn resolve_id(&self) -> Result<String, ResolveError> {
        Ok(self.resolve()?.id().to_string())
    }

    fn resolve_inner(&self) -> Result<Arc<Document>, ResolveError> {
        let href = &self.inner.href;
        let bytes = self.inner.ctx.fetcher.fetch(href)?;
        let document = Document::from_bytes(&bytes).map_err(|e| ResolveError::Parse {
            href: href.clone(),
            message: e.to_string(),
        })?;
        let declared_branch = self.inner.declared == NodeKind::Branch;
        if document.kind().is_branch() != declared_branch {
            return Err(ResolveError::TypeMismatch {
                href: href.clone(),
                expected: self.inner.declared.to_string(),
                actual: document.kind().to_string(),
            });
        }
        Ok(Arc::new(document))
    }
}

impl fmt::Debug for WalkNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkNode")
            .field("href", &self.inner.href)
            .field("declared", &self.inner.declared)
            .field("path", &self.inner.path.to_string())
            .field("resolved", &self.inner.resolved.get().is_some())
            .finish()
    }
}
