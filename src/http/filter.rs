//! Filter and handler types, plus built-in filters.
//!
//! A filter receives the request context and decides whether the request
//! goes on: it calls `ctx.next()` to run the rest of the chain, or returns
//! without doing so to stop it.

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::http::context::Context;

/// Terminal business logic of a route.
pub type Handler = Arc<dyn Fn(&mut Context) + Send + Sync>;

/// One step of a request's filter chain.
pub type Filter = Arc<dyn Fn(&mut Context) + Send + Sync>;

pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

pub fn filter<F>(f: F) -> Filter
where
    F: Fn(&mut Context) + Send + Sync + 'static,
{
    Arc::new(f)
}

pub const X_REQUEST_ID: &str = "x-request-id";

/// Side-table key holding the request ID as a `String`.
pub const REQUEST_ID_KEY: &str = "request_id";

/// Reuse the inbound `x-request-id` or generate one (UUID v4).
///
/// The ID is stored under `REQUEST_ID_KEY` and echoed on the response.
pub fn request_id() -> Filter {
    filter(|ctx| {
        let id = ctx
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        ctx.write_header(X_REQUEST_ID, &id);
        ctx.put_value(REQUEST_ID_KEY, id);
        ctx.next();
    })
}

/// Log method, path, status and latency once the rest of the chain is done.
pub fn access_log() -> Filter {
    filter(|ctx| {
        let start = Instant::now();
        ctx.next();

        let status = ctx
            .response()
            .status()
            .map(|s| s.as_u16())
            .unwrap_or(200);
        let request_id = ctx
            .get_value::<String>(REQUEST_ID_KEY)
            .map(String::as_str)
            .unwrap_or("-");
        ctx.logger().log(format_args!(
            "{} {} {} {:?} request_id={}",
            ctx.method(),
            ctx.request_uri(),
            status,
            start.elapsed(),
            request_id,
        ));
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::context::tests::context;
    use axum::http::Request;

    #[test]
    fn test_request_id_generated() {
        let mut ctx = context(Request::builder().uri("/").body("").unwrap(), vec![request_id()]);
        ctx.process_with_filters(handler(|ctx| ctx.write_string("ok")));

        let id = ctx.get_value::<String>(REQUEST_ID_KEY).cloned().unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert_eq!(ctx.response().headers()[X_REQUEST_ID], id.as_str());
    }

    #[test]
    fn test_request_id_reused() {
        let req = Request::builder()
            .uri("/")
            .header(X_REQUEST_ID, "abc-123")
            .body("")
            .unwrap();
        let mut ctx = context(req, vec![request_id()]);
        ctx.process_with_filters(handler(|ctx| {
            let id = ctx.get_value::<String>(REQUEST_ID_KEY).cloned().unwrap_or_default();
            ctx.write_string(&id);
        }));

        assert_eq!(ctx.response().body(), b"abc-123");
        assert_eq!(ctx.response().headers()[X_REQUEST_ID], "abc-123");
    }

    #[test]
    fn test_access_log_continues_chain() {
        let mut ctx = context(
            Request::builder().uri("/items?page=1").body("").unwrap(),
            vec![access_log(), request_id()],
        );
        ctx.process_with_filters(handler(|ctx| ctx.write_string("listed")));
        assert_eq!(ctx.response().body(), b"listed");
    }
}
