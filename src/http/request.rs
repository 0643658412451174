//! Request parameter parsing.
//!
//! # Responsibilities
//! - Parse the URL query string into multi-valued parameters
//! - Parse `application/x-www-form-urlencoded` bodies of POST/PUT/PATCH
//! - Merge both into a single view (body values first, then query values)
//!
//! # Design Decisions
//! - Strict decoding: a bad percent escape or a `;` separator is an error,
//!   not silently repaired
//! - Values keep their arrival order per key
//! - The body is parsed from the buffered bytes, so it stays readable afterwards

use std::collections::HashMap;

use axum::body::Bytes;
use axum::http::{header, request::Parts, Method};
use thiserror::Error;

/// Failure to parse request form data.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("invalid URL escape {0:?}")]
    InvalidEscape(String),

    #[error("invalid semicolon separator in query")]
    Semicolon,

    #[error("failed to read form body: {0}")]
    Body(String),
}

/// Multi-valued form parameters keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    values: HashMap<String, Vec<String>>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// First value for `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values for `name`, in arrival order.
    pub fn get_all(&self, name: &str) -> &[String] {
        self.values.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.entry(name.into()).or_default().push(value.into());
    }

    /// Append every value of `other` after the existing values.
    pub fn extend_from(&mut self, other: &FormValues) {
        for (name, values) in &other.values {
            self.values
                .entry(name.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.values
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }
}

/// Query, body form and merged parameters of one request.
#[derive(Debug, Clone, Default)]
pub struct ParsedForm {
    pub query: FormValues,
    pub post: FormValues,
    pub merged: FormValues,
}

/// Parse a raw `application/x-www-form-urlencoded` string.
///
/// `+` decodes to a space. Empty pairs are skipped.
pub fn parse_urlencoded(raw: &str) -> Result<FormValues, FormError> {
    let mut values = FormValues::new();
    for pair in raw.split('&') {
        if pair.contains(';') {
            return Err(FormError::Semicolon);
        }
        check_escapes(pair)?;
    }
    for (name, value) in url::form_urlencoded::parse(raw.as_bytes()) {
        values.append(name, value);
    }
    Ok(values)
}

fn check_escapes(pair: &str) -> Result<(), FormError> {
    let bytes = pair.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !valid {
                let end = (i + 3).min(bytes.len());
                return Err(FormError::InvalidEscape(
                    String::from_utf8_lossy(&bytes[i..end]).into_owned(),
                ));
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    Ok(())
}

/// Whether the request carries a urlencoded form body.
pub fn has_form_body(parts: &Parts) -> bool {
    if !matches!(parts.method, Method::POST | Method::PUT | Method::PATCH) {
        return false;
    }
    parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .map(|media| media.trim().eq_ignore_ascii_case("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

/// Parse query and body parameters of a request.
///
/// `body` is the buffered request body, or the error hit while buffering it.
pub fn parse_form<E: std::fmt::Display>(
    parts: &Parts,
    body: Result<&Bytes, &E>,
) -> Result<ParsedForm, FormError> {
    let query = parse_urlencoded(parts.uri.query().unwrap_or(""))?;

    let post = if has_form_body(parts) {
        let bytes = body.map_err(|e| FormError::Body(e.to_string()))?;
        parse_urlencoded(&String::from_utf8_lossy(bytes))?
    } else {
        FormValues::new()
    };

    let mut merged = post.clone();
    merged.extend_from(&query);

    Ok(ParsedForm {
        query,
        post,
        merged,
    })
}
