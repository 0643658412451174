//! Single-handler endpoints.
//!
//! An `Endpoint` wraps one handler and its filters as a `tower::Service`
//! that can be mounted directly, e.g. with `axum::Router::route_service`.
//! Method-guarded endpoints answer a bare 404 to any other method.

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};

use axum::body::Body;
use axum::http::{Method, Request};
use axum::response::Response;
use tower::Service;

use crate::http::context::Context;
use crate::http::filter::{handler, Filter, Handler};
use crate::http::mux::{BoxFuture, DEFAULT_BODY_LIMIT};
use crate::observability::logging::{default_logger, Logger};

#[derive(Clone)]
pub struct Endpoint {
    handler: Handler,
    filters: Vec<Filter>,
    method: Option<Method>,
    logger: Arc<dyn Logger>,
    body_limit: usize,
}

impl Endpoint {
    /// Endpoint that accepts every method.
    pub fn new<H>(handler_fn: H, filters: impl IntoIterator<Item = Filter>) -> Self
    where
        H: Fn(&mut Context) + Send + Sync + 'static,
    {
        Self {
            handler: handler(handler_fn),
            filters: filters.into_iter().collect(),
            method: None,
            logger: default_logger(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Endpoint that only runs for `method`.
    pub fn method<H>(method: Method, handler_fn: H, filters: impl IntoIterator<Item = Filter>) -> Self
    where
        H: Fn(&mut Context) + Send + Sync + 'static,
    {
        Self {
            method: Some(method),
            ..Self::new(handler_fn, filters)
        }
    }

    /// Replace the logger handed to the request context.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Set the largest request body buffered per request.
    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    /// Serve one request.
    pub async fn serve(&self, req: Request<Body>) -> Response {
        let ctx = Context::from_request(
            req,
            self.filters.clone(),
            Arc::clone(&self.logger),
            self.body_limit,
        )
        .await;
        let mut ctx = match ctx {
            Ok(ctx) => ctx,
            Err(response) => return response,
        };

        match &self.method {
            Some(expected) if expected != ctx.method() => ctx.write_404(),
            _ => ctx.process_with_filters(Arc::clone(&self.handler)),
        }
        ctx.into_response()
    }
}

impl Service<Request<Body>> for Endpoint {
    type Response = Response;
    type Error = Infallible;
    type Future = BoxFuture<Result<Response, Infallible>>;

    fn poll_ready(&mut self, _cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let endpoint = self.clone();
        Box::pin(async move { Ok(endpoint.serve(req).await) })
    }
}

/// Endpoint that only runs for `GET`.
pub fn get<H>(handler_fn: H, filters: impl IntoIterator<Item = Filter>) -> Endpoint
where
    H: Fn(&mut Context) + Send + Sync + 'static,
{
    Endpoint::method(Method::GET, handler_fn, filters)
}

/// Endpoint that only runs for `POST`.
pub fn post<H>(handler_fn: H, filters: impl IntoIterator<Item = Filter>) -> Endpoint
where
    H: Fn(&mut Context) + Send + Sync + 'static,
{
    Endpoint::method(Method::POST, handler_fn, filters)
}

/// Endpoint that only runs for `PUT`.
pub fn put<H>(handler_fn: H, filters: impl IntoIterator<Item = Filter>) -> Endpoint
where
    H: Fn(&mut Context) + Send + Sync + 'static,
{
    Endpoint::method(Method::PUT, handler_fn, filters)
}

/// Endpoint that only runs for `DELETE`.
pub fn delete<H>(handler_fn: H, filters: impl IntoIterator<Item = Filter>) -> Endpoint
where
    H: Fn(&mut Context) + Send + Sync + 'static,
{
    Endpoint::method(Method::DELETE, handler_fn, filters)
}
