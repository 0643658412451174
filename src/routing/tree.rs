//! Path trie: route registration and lookup.
//!
//! # Responsibilities
//! - Register `pattern → handler (+ filters)` bindings
//! - Resolve a concrete request path to its handler, filters and captures
//!
//! # Design Decisions
//! - `"/"` is the root node itself and never stores filters
//! - Re-registering a pattern updates the existing node in place
//! - Lookup commits to the first child that matches a segment

use std::collections::HashMap;

use crate::routing::node::PathTreeNode;

/// Path parameters captured by `{:name}` wildcard segments.
pub type PathParams = HashMap<String, String>;

/// Result of a successful lookup.
#[derive(Debug)]
pub struct RouteMatch<'a, H, F> {
    pub handler: &'a H,
    pub filters: &'a [F],
    pub params: PathParams,
}

/// Segment trie mapping URL patterns to handlers.
#[derive(Debug)]
pub struct PathTree<H, F> {
    root: PathTreeNode<H, F>,
}

impl<H, F> PathTree<H, F> {
    pub fn new() -> Self {
        Self {
            root: PathTreeNode::new("/"),
        }
    }

    pub fn root(&self) -> &PathTreeNode<H, F> {
        &self.root
    }

    /// Register `handler` for `pattern`.
    ///
    /// `pattern` is a `/`-separated list of literal and `{:name}` segments.
    /// Patterns that do not start with `/` are ignored. For the root pattern
    /// `"/"` the filters are ignored. Otherwise the filters replace those of
    /// the route only when at least one is given.
    pub fn put(&mut self, pattern: &str, handler: H, filters: Vec<F>) {
        if pattern == "/" {
            self.root.set_handler(handler);
            return;
        }

        let Some(rest) = pattern.strip_prefix('/') else {
            tracing::debug!(pattern = %pattern, "Ignoring route pattern without leading '/'");
            return;
        };

        let mut node = &mut self.root;
        for segment in rest.split('/') {
            node = node.child_or_insert(segment);
        }
        node.set_handler(handler);
        node.set_filters(filters);
    }

    /// Resolve `path` to its handler, route filters and path parameters.
    ///
    /// Returns `None` when no node matches or the matched node has no handler.
    pub fn find_handler(&self, path: &str) -> Option<RouteMatch<'_, H, F>> {
        if path == "/" {
            return self.root.handler().map(|handler| RouteMatch {
                handler,
                filters: self.root.filters(),
                params: PathParams::new(),
            });
        }

        let rest = path.strip_prefix('/')?;
        let mut params = PathParams::new();
        let mut node = &self.root;

        for segment in rest.split('/') {
            node = match node.find_child(segment) {
                Some(child) => child,
                None => {
                    let child = node.first_wildcard_child()?;
                    if let Some(name) = child.wildcard_name() {
                        params.insert(name.to_string(), segment.to_string());
                    }
                    child
                }
            };
        }

        node.handler().map(|handler| RouteMatch {
            handler,
            filters: node.filters(),
            params,
        })
    }
}

impl<H, F> Default for PathTree<H, F> {
    fn default() -> Self {
        Self::new()
    }
}
