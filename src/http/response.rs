//! Buffered response sink.
//!
//! # Responsibilities
//! - Collect status, headers and body written by filters and handlers
//! - Convert the result into an axum response once the chain has finished
//!
//! # Design Decisions
//! - The first status written wins; later ones are ignored
//! - Writing body bytes commits an implicit 200 if no status was written
//! - Header changes after the status is committed are ignored
//! - Nothing reaches the client until the chain returns, so a panic can
//!   still replace the whole response

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;

#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status committed so far, if any.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Whether a status line has been committed.
    pub fn is_committed(&self) -> bool {
        self.status.is_some()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Commit `status`. Returns `false` if a status was already committed.
    pub fn write_status(&mut self, status: StatusCode) -> bool {
        if self.status.is_some() {
            return false;
        }
        self.status = Some(status);
        true
    }

    /// Set a header, replacing earlier values. Returns `false` once committed.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) -> bool {
        if self.is_committed() {
            return false;
        }
        self.headers.insert(name, value);
        true
    }

    pub fn write(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes);
    }

    /// Drop everything written so far.
    pub fn reset(&mut self) {
        self.status = None;
        self.headers.clear();
        self.body.clear();
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}
