//! Per-request context.
//!
//! # Responsibilities
//! - Own the request parts, parsed parameters and buffered body
//! - Own the response sink written by filters and the handler
//! - Carry path parameters and a typed key/value side-table
//! - Hold the filter chain state (see `pipeline.rs`)
//!
//! # Design Decisions
//! - One context per request, owned by the task serving it; no locking
//! - The body is buffered before the chain starts so filters stay synchronous
//! - Body access is memoized: the first access settles success or failure

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode};
use axum::response::Response;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::http::filter::Filter;
use crate::http::request::{parse_form, FormValues, ParsedForm};
use crate::http::response::ResponseWriter;
use crate::observability::Logger;
use crate::routing::PathParams;

/// Body as seen by the accessors.
enum BodyState {
    Unread(Result<Bytes, axum::Error>),
    Read(Bytes),
    Failed,
}

pub struct Context {
    parts: Parts,
    form: ParsedForm,
    body: BodyState,
    response: ResponseWriter,
    values: HashMap<String, Box<dyn Any + Send>>,
    path_params: PathParams,
    pub(super) filters: Vec<Filter>,
    pub(super) filter_index: usize,
    pub(super) aborted: bool,
    logger: Arc<dyn Logger>,
}

impl Context {
    /// Build a context from request parts and the buffered body.
    ///
    /// Malformed form data is answered immediately: the returned `Err` holds
    /// the 500 response already written for it.
    pub fn new(
        parts: Parts,
        body: Result<Bytes, axum::Error>,
        filters: Vec<Filter>,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, Response> {
        let mut ctx = Self {
            parts,
            form: ParsedForm::default(),
            body: BodyState::Unread(body),
            response: ResponseWriter::new(),
            values: HashMap::new(),
            path_params: PathParams::new(),
            filters,
            filter_index: 0,
            aborted: false,
            logger,
        };

        let parsed = match &ctx.body {
            BodyState::Unread(body) => parse_form(&ctx.parts, body.as_ref()),
            _ => Ok(ParsedForm::default()),
        };
        match parsed {
            Ok(form) => {
                ctx.form = form;
                Ok(ctx)
            }
            Err(err) => {
                ctx.write_500(&err);
                ctx.logger.log_error("ParseForm failed", Some(&err));
                Err(ctx.into_response())
            }
        }
    }

    /// Buffer the body of `req` (up to `body_limit` bytes) and build a context.
    ///
    /// A body over the limit is recorded as a body read failure.
    pub async fn from_request(
        req: Request<Body>,
        filters: Vec<Filter>,
        logger: Arc<dyn Logger>,
        body_limit: usize,
    ) -> Result<Self, Response> {
        let (parts, body) = req.into_parts();
        let body = axum::body::to_bytes(body, body_limit).await;
        Self::new(parts, body, filters, logger)
    }

    pub(crate) fn set_path_params(&mut self, params: PathParams) {
        self.path_params = params;
    }

    pub fn logger(&self) -> &dyn Logger {
        self.logger.as_ref()
    }

    pub fn set_logger(&mut self, logger: Arc<dyn Logger>) {
        self.logger = logger;
    }

    pub fn into_response(self) -> Response {
        self.response.into_response()
    }

    // ---- request ----

    pub fn request_parts(&self) -> &Parts {
        &self.parts
    }

    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// `Host` header, falling back to the authority of the request URI.
    pub fn host(&self) -> Option<&str> {
        self.parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.parts.uri.authority().map(|a| a.as_str()))
    }

    /// Scheme of the request URI. Origin-form requests carry none.
    pub fn scheme(&self) -> Option<&str> {
        self.parts.uri.scheme_str()
    }

    pub fn raw_query(&self) -> &str {
        self.parts.uri.query().unwrap_or("")
    }

    pub fn request_uri(&self) -> &str {
        self.parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| self.parts.uri.path())
    }

    /// Peer address, available when served with connect info.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    // ---- parameters ----

    /// GET parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.form.query.get(name)
    }

    pub fn query_all(&self, name: &str) -> &[String] {
        self.form.query.get_all(name)
    }

    /// POST/PUT/PATCH form body parameter.
    pub fn post(&self, name: &str) -> Option<&str> {
        self.form.post.get(name)
    }

    pub fn post_all(&self, name: &str) -> &[String] {
        self.form.post.get_all(name)
    }

    /// Body form parameter, falling back to the query string.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.form.merged.get(name)
    }

    pub fn param_all(&self, name: &str) -> &[String] {
        self.form.merged.get_all(name)
    }

    pub fn params(&self) -> &FormValues {
        &self.form.merged
    }

    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    // ---- body ----

    fn read_body(&mut self) -> Bytes {
        let state = std::mem::replace(&mut self.body, BodyState::Failed);
        self.body = match state {
            BodyState::Unread(Ok(bytes)) => BodyState::Read(bytes),
            BodyState::Unread(Err(err)) => {
                self.logger.log_error("Read req body failed", Some(&err));
                BodyState::Failed
            }
            settled => settled,
        };
        match &self.body {
            BodyState::Read(bytes) => bytes.clone(),
            _ => Bytes::new(),
        }
    }

    /// Request body bytes; empty if reading the body failed.
    pub fn body_as_bytes(&mut self) -> Bytes {
        self.read_body()
    }

    pub fn body_as_string(&mut self) -> String {
        String::from_utf8_lossy(&self.read_body()).into_owned()
    }

    /// Decode the body as JSON. Decoding errors are logged and returned.
    pub fn body_as_json<T: DeserializeOwned>(&mut self) -> Result<T, serde_json::Error> {
        let bytes = self.read_body();
        serde_json::from_slice(&bytes).map_err(|err| {
            self.logger.log_error("Body Unmarshal json failed", Some(&err));
            err
        })
    }

    // ---- response ----

    pub fn response(&self) -> &ResponseWriter {
        &self.response
    }

    pub(super) fn reset_response(&mut self) {
        self.response.reset();
    }

    pub fn write_status(&mut self, status: StatusCode) {
        if !self.response.write_status(status) {
            self.logger
                .log(format_args!("superfluous write_status({status}) ignored"));
        }
    }

    /// Set a response header. Ignored once the status is committed.
    pub fn write_header(&mut self, key: &str, val: &str) {
        let name = match HeaderName::try_from(key) {
            Ok(name) => name,
            Err(err) => {
                self.logger.log_error("Invalid header name", Some(&err));
                return;
            }
        };
        let value = match HeaderValue::try_from(val) {
            Ok(value) => value,
            Err(err) => {
                self.logger.log_error("Invalid header value", Some(&err));
                return;
            }
        };
        if !self.response.set_header(name, value) {
            self.logger
                .log(format_args!("header {key} ignored, response already committed"));
        }
    }

    /// Write formatted text without touching `Content-Type`.
    ///
    /// ```ignore
    /// ctx.write(format_args!("hello {}", name));
    /// ```
    pub fn write(&mut self, args: fmt::Arguments<'_>) {
        match args.as_str() {
            Some(s) => self.response.write(s.as_bytes()),
            None => self.response.write(args.to_string().as_bytes()),
        }
    }

    /// Write `bytes` as `text/plain`.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_header("Content-Type", "text/plain");
        self.response.write(bytes);
    }

    /// Write `data` as `text/plain`.
    pub fn write_string(&mut self, data: &str) {
        self.write_header("Content-Type", "text/plain");
        self.response.write(data.as_bytes());
    }

    /// Write `value` as `application/json`, or a 500 if it cannot be encoded.
    pub fn write_json<T: Serialize + ?Sized>(&mut self, value: &T) {
        match serde_json::to_vec(value) {
            Ok(bytes) => {
                self.write_header("Content-Type", "application/json");
                self.response.write(&bytes);
            }
            Err(err) => {
                self.logger.log_error("json encode failed", Some(&err));
                self.write_500(&err);
            }
        }
    }

    pub fn write_404(&mut self) {
        self.write_status(StatusCode::NOT_FOUND);
    }

    /// 500 carrying the message of `err`.
    pub fn write_500(&mut self, err: &dyn fmt::Display) {
        self.write_status(StatusCode::INTERNAL_SERVER_ERROR);
        self.write(format_args!("{err}"));
    }

    // ---- side-table ----

    pub fn put_value<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Box::new(value));
    }

    /// Value stored under `key`, if present and of type `T`.
    pub fn get_value<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key)?.downcast_ref()
    }

    pub fn get_value_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.values.get_mut(key)?.downcast_mut()
    }

    /// Remove and return the value under `key` if it is of type `T`.
    pub fn remove_value<T: Any>(&mut self, key: &str) -> Option<T> {
        if !self.values.get(key)?.is::<T>() {
            return None;
        }
        self.values.remove(key)?.downcast().ok().map(|boxed| *boxed)
    }
}
