//! HTTP dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, graceful shutdown)
//!     → mux.rs (path lookup in the routing trie)
//!     → context.rs (buffer body, parse query/form, build Context)
//!     → pipeline.rs (default filters → route filters → handler)
//!     → response.rs (buffered status/headers/body → Axum response)
//!     → Send to client
//! ```
//!
//! `endpoint.rs` offers the same context + pipeline for a single handler
//! mounted without the trie.

pub mod context;
pub mod endpoint;
pub mod filter;
pub mod mux;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use context::Context;
pub use endpoint::Endpoint;
pub use filter::{access_log, filter, handler, request_id, Filter, Handler};
pub use mux::{MuxService, ServeMux};
pub use server::HttpServer;
