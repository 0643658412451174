//! Path-trie HTTP request multiplexer with filter chains.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::MuxConfig;
pub use http::{
    access_log, filter, handler, request_id, Context, Endpoint, Filter, Handler, HttpServer,
    MuxService, ServeMux,
};
pub use lifecycle::Shutdown;
pub use observability::Logger;
