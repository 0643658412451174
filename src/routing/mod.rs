//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (at startup):
//!     pattern "/api/v1/{:user}/add"
//!     → tree.rs (split on '/', walk or create nodes)
//!     → node.rs (classify literal vs {:name} wildcard)
//!
//! Lookup (per request):
//!     path "/api/v1/lisi/add"
//!     → tree.rs (descend segment by segment)
//!     → Return: RouteMatch { handler, filters, params } or None
//! ```
//!
//! # Design Decisions
//! - One trie node per path segment; the empty trailing segment is a real node
//! - Literal children always win over wildcard children at the same level
//! - Only the first wildcard child of a node is ever matched
//! - No backtracking once a child has been chosen
//! - No normalization: matching is exact and case-sensitive
//! - Populated during startup, read-only while serving

pub mod node;
pub mod tree;

pub use node::PathTreeNode;
pub use tree::{PathParams, PathTree, RouteMatch};
