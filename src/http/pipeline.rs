//! Filter chain execution.
//!
//! # Responsibilities
//! - Run the context's filters in order, terminal handler last
//! - Give filters explicit control: `next`, `abort`, `append_filters`
//! - Contain panics raised anywhere in the chain
//!
//! # Design Decisions
//! - The chain is a growable `Vec` plus a cursor that only moves forward
//! - The chain length is re-read on every `next`, so filters appended ahead
//!   of the cursor run
//! - A filter that returns without calling `next` ends the chain
//! - Exactly one panic barrier, around the outermost `exec_filters`

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use axum::http::StatusCode;

use crate::http::context::Context;
use crate::http::filter::{Filter, Handler};

impl Context {
    /// Append filters to the live chain.
    pub fn append_filters(&mut self, filters: impl IntoIterator<Item = Filter>) {
        self.filters.extend(filters);
    }

    /// Continue with the rest of the chain.
    ///
    /// A no-op once the chain has been aborted or has run to completion.
    pub fn next(&mut self) {
        self.filter_index += 1;
        self.exec_filters();
    }

    /// Stop the chain: no further filter or handler runs for this request.
    pub fn abort(&mut self) {
        self.aborted = true;
        self.filter_index = self.filters.len() + 1;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Run the filter at the cursor. Only `next` moves the cursor on, so a
    /// filter that returns without calling it ends the chain.
    fn exec_filters(&mut self) {
        if self.aborted {
            return;
        }
        if let Some(filter) = self.filters.get(self.filter_index).cloned() {
            filter(self);
        }
    }

    /// Run the chain with `handler` appended as its terminal step.
    ///
    /// A panic from any filter or the handler is logged and replaces the
    /// response with a single 500.
    pub fn process_with_filters(&mut self, handler: Handler) {
        self.append_filters([handler]);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.exec_filters()));
        if let Err(payload) = outcome {
            self.abort();
            let msg = panic_message(payload.as_ref());
            self.logger()
                .log_error(&format!("Recovered from panic in filter chain: {msg}"), None);
            self.reset_response();
            self.write_status(StatusCode::INTERNAL_SERVER_ERROR);
            self.write(format_args!("Internal Server Error"));
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::http::Request;

    use crate::http::context::tests::context;
    use crate::http::filter::{filter, handler};

    use super::*;

    type Trace = Arc<Mutex<Vec<&'static str>>>;

    fn step(trace: &Trace, label: &'static str) -> Filter {
        let trace = trace.clone();
        filter(move |ctx| {
            trace.lock().unwrap().push(label);
            ctx.next();
        })
    }

    fn stop(trace: &Trace, label: &'static str) -> Filter {
        let trace = trace.clone();
        filter(move |_ctx| trace.lock().unwrap().push(label))
    }

    fn terminal(trace: &Trace) -> Handler {
        let trace = trace.clone();
        handler(move |ctx| {
            trace.lock().unwrap().push("handler");
            ctx.write_string("done");
        })
    }

    fn run(filters: Vec<Filter>, handler: Handler) -> Context {
        let mut ctx = context(Request::builder().uri("/").body("").unwrap(), filters);
        ctx.process_with_filters(handler);
        ctx
    }

    fn recorded(trace: &Trace) -> Vec<&'static str> {
        trace.lock().unwrap().clone()
    }

    #[test]
    fn test_filters_run_in_order_then_handler() {
        let trace = Trace::default();
        let ctx = run(
            vec![step(&trace, "a"), step(&trace, "b"), step(&trace, "c")],
            terminal(&trace),
        );

        assert_eq!(recorded(&trace), vec!["a", "b", "c", "handler"]);
        assert_eq!(ctx.response().body(), b"done");
        assert!(!ctx.is_aborted());
    }

    #[test]
    fn test_handler_only() {
        let trace = Trace::default();
        run(Vec::new(), terminal(&trace));
        assert_eq!(recorded(&trace), vec!["handler"]);
    }

    #[test]
    fn test_filter_without_next_stops_chain() {
        let trace = Trace::default();
        run(
            vec![step(&trace, "a"), stop(&trace, "b"), step(&trace, "c")],
            terminal(&trace),
        );

        assert_eq!(recorded(&trace), vec!["a", "b"]);
    }

    #[test]
    fn test_abort_stops_chain() {
        let trace = Trace::default();
        let t = trace.clone();
        let aborting = filter(move |ctx| {
            t.lock().unwrap().push("abort");
            ctx.write_status(StatusCode::UNAUTHORIZED);
            ctx.abort();
            // Continuing after an abort does nothing.
            ctx.next();
        });

        let ctx = run(
            vec![step(&trace, "a"), aborting, step(&trace, "c")],
            terminal(&trace),
        );

        assert_eq!(recorded(&trace), vec!["a", "abort"]);
        assert!(ctx.is_aborted());
        assert_eq!(ctx.response().status(), Some(StatusCode::UNAUTHORIZED));
    }

    #[test]
    fn test_abort_covers_filters_appended_later() {
        let trace = Trace::default();
        let t = trace.clone();
        let late = step(&trace, "late");
        let aborting = filter(move |ctx| {
            ctx.abort();
            ctx.append_filters([late.clone()]);
            t.lock().unwrap().push("abort");
        });

        run(vec![aborting], terminal(&trace));
        assert_eq!(recorded(&trace), vec!["abort"]);
    }

    #[test]
    fn test_filters_run_once_when_next_is_called() {
        let trace = Trace::default();
        let t = trace.clone();
        let around = filter(move |ctx| {
            t.lock().unwrap().push("before");
            ctx.next();
            t.lock().unwrap().push("after");
        });

        run(vec![around, step(&trace, "b")], terminal(&trace));
        assert_eq!(recorded(&trace), vec!["before", "b", "handler", "after"]);
    }

    #[test]
    fn test_filter_appended_mid_chain_lands_after_handler() {
        let trace = Trace::default();
        let t = trace.clone();
        let extra = stop(&trace, "extra");
        let appending = filter(move |ctx| {
            t.lock().unwrap().push("appending");
            ctx.append_filters([extra.clone()]);
            ctx.next();
        });

        // The handler is already in the chain and does not call `next`.
        run(vec![appending], terminal(&trace));
        assert_eq!(recorded(&trace), vec!["appending", "handler"]);
    }

    #[test]
    fn test_handler_calling_next_reaches_appended_filter() {
        let trace = Trace::default();
        let t = trace.clone();
        let extra = stop(&trace, "extra");
        let appending = filter(move |ctx| {
            ctx.append_filters([extra.clone()]);
            ctx.next();
        });
        let forwarding = handler(move |ctx| {
            t.lock().unwrap().push("handler");
            ctx.next();
        });

        run(vec![appending], forwarding);
        assert_eq!(recorded(&trace), vec!["handler", "extra"]);
    }

    #[test]
    fn test_rejecting_filter_keeps_handler_output_out() {
        let trace = Trace::default();
        let t = trace.clone();
        let reject = filter(move |ctx| {
            t.lock().unwrap().push("reject");
            ctx.write_status(StatusCode::FORBIDDEN);
            ctx.write_string("denied");
        });

        let ctx = run(vec![reject], terminal(&trace));
        assert_eq!(recorded(&trace), vec!["reject"]);
        assert_eq!(ctx.response().status(), Some(StatusCode::FORBIDDEN));
        assert_eq!(ctx.response().body(), b"denied");
        assert!(!ctx.is_aborted());
    }

    #[test]
    fn test_abort_covers_many_appended_filters() {
        let trace = Trace::default();
        let late = [step(&trace, "x"), step(&trace, "y"), step(&trace, "z")];
        let aborting = filter(move |ctx| {
            ctx.abort();
            ctx.append_filters(late.iter().cloned());
        });

        run(vec![aborting], terminal(&trace));
        assert!(recorded(&trace).is_empty());
    }

    #[test]
    fn test_filters_appended_before_processing_precede_handler() {
        let trace = Trace::default();
        let mut ctx = context(Request::builder().uri("/").body("").unwrap(), vec![step(&trace, "a")]);
        ctx.append_filters([step(&trace, "b")]);
        ctx.process_with_filters(terminal(&trace));

        assert_eq!(recorded(&trace), vec!["a", "b", "handler"]);
    }

    #[tokio::test]
    async fn test_panic_in_handler_becomes_single_500() {
        let trace = Trace::default();
        let panicking = handler(|ctx| {
            ctx.write_string("partial output");
            panic!("handler exploded");
        });

        let ctx = run(vec![step(&trace, "a")], panicking);
        assert_eq!(recorded(&trace), vec!["a"]);
        assert!(ctx.is_aborted());

        let response = ctx.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get("content-type").is_none());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"Internal Server Error");
    }

    #[test]
    fn test_panic_in_filter_skips_rest_of_chain() {
        let trace = Trace::default();
        let t = trace.clone();
        let boom = filter(move |_ctx| {
            t.lock().unwrap().push("boom");
            panic!("{} failed", "filter");
        });

        let ctx = run(vec![boom, step(&trace, "b")], terminal(&trace));
        assert_eq!(recorded(&trace), vec!["boom"]);
        assert_eq!(
            ctx.response().status(),
            Some(StatusCode::INTERNAL_SERVER_ERROR)
        );
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic payload");
    }
}
