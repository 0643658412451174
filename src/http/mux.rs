//! Request dispatcher.
//!
//! # Responsibilities
//! - Own the path trie and the default filters
//! - Resolve each request path to a route
//! - Build the request context and run the filter chain
//!
//! # Design Decisions
//! - Registration takes `&mut self`; `into_service()` freezes the mux behind
//!   an `Arc`, so routes are read-only while serving
//! - Default filters run before route filters
//! - An unrouted request is left unanswered; the service falls back to the
//!   empty `200 OK` a transport sends when nothing is written

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use axum::body::Body;
use axum::http::Request;
use axum::response::Response;
use tower::Service;

use crate::http::context::Context;
use crate::http::filter::{handler, Filter, Handler};
use crate::observability::logging::{default_logger, Logger};
use crate::routing::{PathParams, PathTree, RouteMatch};

/// Bodies larger than this are recorded as a body read failure.
pub const DEFAULT_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

pub struct ServeMux {
    tree: PathTree<Handler, Filter>,
    filters: Vec<Filter>,
    logger: Arc<dyn Logger>,
    body_limit: usize,
}

impl ServeMux {
    /// Create an empty mux that logs through `tracing`.
    pub fn new() -> Self {
        Self {
            tree: PathTree::new(),
            filters: Vec::new(),
            logger: default_logger(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Replace the logger handed to every request context.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Set the largest request body buffered per request.
    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    /// In-place form of `with_body_limit`.
    pub fn set_body_limit(&mut self, body_limit: usize) {
        self.body_limit = body_limit;
    }

    /// Add filters that run, in order, before the route filters of every request.
    pub fn add_filters(&mut self, filters: impl IntoIterator<Item = Filter>) {
        self.filters.extend(filters);
    }

    /// Register `handler_fn` (and its route filters) for `pattern`.
    pub fn handle<H>(&mut self, pattern: &str, handler_fn: H, filters: impl IntoIterator<Item = Filter>)
    where
        H: Fn(&mut Context) + Send + Sync + 'static,
    {
        self.tree
            .put(pattern, handler(handler_fn), filters.into_iter().collect());
    }

    /// Look up the route for `path` without running it.
    pub fn find_handler(&self, path: &str) -> Option<RouteMatch<'_, Handler, Filter>> {
        self.tree.find_handler(path)
    }

    /// Dispatch one request. Returns `None` when no route matches.
    pub async fn dispatch(&self, req: Request<Body>) -> Option<Response> {
        let Some((handler, filters, params)) = self.resolve(req.uri().path()) else {
            tracing::debug!(path = %req.uri().path(), "No route matched");
            return None;
        };

        let ctx = Context::from_request(req, filters, Arc::clone(&self.logger), self.body_limit).await;
        let mut ctx = match ctx {
            Ok(ctx) => ctx,
            Err(response) => return Some(response),
        };
        ctx.set_path_params(params);
        ctx.process_with_filters(handler);
        Some(ctx.into_response())
    }

    fn resolve(&self, path: &str) -> Option<(Handler, Vec<Filter>, PathParams)> {
        let route = self.tree.find_handler(path)?;

        let mut filters = Vec::with_capacity(self.filters.len() + route.filters.len());
        filters.extend(self.filters.iter().cloned());
        filters.extend(route.filters.iter().cloned());

        Some((Arc::clone(route.handler), filters, route.params))
    }

    /// Freeze the routes and default filters into a shareable service.
    pub fn into_service(self) -> MuxService {
        MuxService {
            mux: Arc::new(self),
        }
    }
}

impl Default for ServeMux {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable `tower::Service` over a frozen `ServeMux`.
#[derive(Clone)]
pub struct MuxService {
    mux: Arc<ServeMux>,
}

impl MuxService {
    /// The frozen mux behind this service.
    pub fn mux(&self) -> &ServeMux {
        &self.mux
    }
}

impl Service<Request<Body>> for MuxService {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let mux = Arc::clone(&self.mux);
        Box::pin(async move { Ok(mux.dispatch(req).await.unwrap_or_default()) })
    }
}
