//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, address parses)
//! - Check the log directive before the subscriber is installed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MuxConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::MuxConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("http.max_body_bytes must be greater than zero")]
    MaxBodyBytes,

    #[error("http.request_timeout_secs must be greater than zero")]
    RequestTimeout,

    #[error("observability.log_filter '{0}' is invalid: {1}")]
    LogFilter(String, String),
}

pub fn validate_config(config: &MuxConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if config.http.max_body_bytes == 0 {
        errors.push(ValidationError::MaxBodyBytes);
    }
    if config.http.request_timeout_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }
    if let Err(e) = EnvFilter::try_new(&config.observability.log_filter) {
        errors.push(ValidationError::LogFilter(
            config.observability.log_filter.clone(),
            e.to_string(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
