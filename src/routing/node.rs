//! Trie node for a single path segment.
//!
//! # Responsibilities
//! - Hold one segment value relative to the parent node
//! - Carry an optional handler and per-route filter list
//! - Recognize `{:name}` wildcard segments
//!
//! # Design Decisions
//! - Children kept in insertion order (`Vec`), scanned linearly
//! - Wildcards are only deduplicated by their literal text

/// A node in the path trie.
///
/// `H` is the handler type and `F` the filter type stored on the route.
#[derive(Debug)]
pub struct PathTreeNode<H, F> {
    segment: String,
    handler: Option<H>,
    filters: Vec<F>,
    wildcard_name: Option<String>,
    children: Vec<PathTreeNode<H, F>>,
}

impl<H, F> PathTreeNode<H, F> {
    /// Create a node for `segment`.
    ///
    /// An empty segment is valid and stands for a trailing slash.
    pub fn new(segment: impl Into<String>) -> Self {
        let segment = segment.into();
        let wildcard_name = wildcard_name(&segment).map(str::to_string);
        Self {
            segment,
            handler: None,
            filters: Vec::new(),
            wildcard_name,
            children: Vec::new(),
        }
    }

    pub fn segment(&self) -> &str {
        &self.segment
    }

    pub fn handler(&self) -> Option<&H> {
        self.handler.as_ref()
    }

    pub fn filters(&self) -> &[F] {
        &self.filters
    }

    /// Capture name when this node is a `{:name}` wildcard.
    pub fn wildcard_name(&self) -> Option<&str> {
        self.wildcard_name.as_deref()
    }

    pub fn children(&self) -> &[PathTreeNode<H, F>] {
        &self.children
    }

    pub(crate) fn set_handler(&mut self, handler: H) {
        self.handler = Some(handler);
    }

    /// Replace the filter list, unless `filters` is empty.
    pub(crate) fn set_filters(&mut self, filters: Vec<F>) {
        if !filters.is_empty() {
            self.filters = filters;
        }
    }

    /// Child whose segment equals `segment` exactly.
    pub fn find_child(&self, segment: &str) -> Option<&PathTreeNode<H, F>> {
        self.children.iter().find(|child| child.segment == segment)
    }

    /// First wildcard child in declaration order.
    pub fn first_wildcard_child(&self) -> Option<&PathTreeNode<H, F>> {
        self.children
            .iter()
            .find(|child| child.wildcard_name.is_some())
    }

    /// Literal-equal child for `segment`, created and appended if missing.
    pub(crate) fn child_or_insert(&mut self, segment: &str) -> &mut PathTreeNode<H, F> {
        let idx = match self.children.iter().position(|child| child.segment == segment) {
            Some(idx) => idx,
            None => {
                self.children.push(PathTreeNode::new(segment));
                self.children.len() - 1
            }
        };
        &mut self.children[idx]
    }
}

/// Parse a `{:name}` wildcard segment, returning the capture name.
///
/// The shortest wildcard is `{:x}`; `{:}` and any other brace usage are
/// literal segments.
pub fn wildcard_name(segment: &str) -> Option<&str> {
    if segment.len() < 4 {
        return None;
    }
    segment.strip_prefix("{:")?.strip_suffix('}')
}

#[cfg(test)]
mod tests {
    use super::*;

    type Node = PathTreeNode<u32, u32>;

    #[test]
    fn test_wildcard_syntax() {
        assert_eq!(wildcard_name("{:user}"), Some("user"));
        assert_eq!(wildcard_name("{:x}"), Some("x"));
        assert_eq!(wildcard_name("{:}"), None);
        assert_eq!(wildcard_name("{user}"), None);
        assert_eq!(wildcard_name(":user"), None);
        assert_eq!(wildcard_name("{:user}s"), None);
        assert_eq!(wildcard_name(""), None);
    }

    #[test]
    fn test_new_node_classification() {
        let literal = Node::new("user");
        assert_eq!(literal.segment(), "user");
        assert!(literal.wildcard_name().is_none());

        let wildcard = Node::new("{:id}");
        assert_eq!(wildcard.wildcard_name(), Some("id"));

        let trailing = Node::new("");
        assert_eq!(trailing.segment(), "");
        assert!(trailing.wildcard_name().is_none());
    }

    #[test]
    fn test_child_or_insert_reuses_literal() {
        let mut root = Node::new("/");
        root.child_or_insert("api").set_handler(1);
        root.child_or_insert("api").set_handler(2);

        assert_eq!(root.children().len(), 1);
        assert_eq!(root.find_child("api").and_then(|n| n.handler()), Some(&2));
    }

    #[test]
    fn test_first_wildcard_child_uses_declaration_order() {
        let mut root = Node::new("/");
        root.child_or_insert("static");
        root.child_or_insert("{:first}");
        root.child_or_insert("{:second}");

        let wildcard = root.first_wildcard_child().map(|n| n.segment());
        assert_eq!(wildcard, Some("{:first}"));
    }

    #[test]
    fn test_empty_filters_do_not_clear() {
        let mut node = Node::new("a");
        node.set_filters(vec![7, 8]);
        node.set_filters(Vec::new());
        assert_eq!(node.filters(), &[7, 8]);
    }
}
