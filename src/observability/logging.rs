//! Structured logging.
//!
//! # Responsibilities
//! - Define the `Logger` capability used by the dispatcher and contexts
//! - Initialize the tracing subscriber from configuration
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and environment

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::{LogFormat, ObservabilityConfig};

/// Logging capability injected into the mux and each request context.
pub trait Logger: Send + Sync {
    /// Informational event.
    fn log(&self, args: fmt::Arguments<'_>);

    /// Error event with a short message and an optional cause.
    fn log_error(&self, msg: &str, err: Option<&dyn Error>);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, args: fmt::Arguments<'_>) {
        tracing::info!(target: "filter_mux", "{}", args);
    }

    fn log_error(&self, msg: &str, err: Option<&dyn Error>) {
        match err {
            Some(err) => tracing::error!(target: "filter_mux", error = %err, "{}", msg),
            None => tracing::error!(target: "filter_mux", "{}", msg),
        }
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _args: fmt::Arguments<'_>) {}

    fn log_error(&self, _msg: &str, _err: Option<&dyn Error>) {}
}

/// The logger used when none is injected.
pub fn default_logger() -> Arc<dyn Logger> {
    Arc::new(TracingLogger)
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.log_filter`.
pub fn init(config: &ObservabilityConfig) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl Logger for Recorder {
        fn log(&self, args: fmt::Arguments<'_>) {
            self.0.lock().unwrap().push(args.to_string());
        }

        fn log_error(&self, msg: &str, err: Option<&dyn Error>) {
            let line = match err {
                Some(err) => format!("{msg}: {err}"),
                None => msg.to_string(),
            };
            self.0.lock().unwrap().push(line);
        }
    }

    #[test]
    fn test_logger_is_object_safe() {
        let recorder = Arc::new(Recorder::default());
        let logger: Arc<dyn Logger> = recorder.clone();

        logger.log(format_args!("served {} bytes", 12));
        let err = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        logger.log_error("read failed", Some(&err));
        logger.log_error("recovered", None);

        let lines = recorder.0.lock().unwrap();
        assert_eq!(
            *lines,
            vec!["served 12 bytes", "read failed: boom", "recovered"]
        );
    }

    #[test]
    fn test_noop_logger_accepts_events() {
        let logger = NoopLogger;
        logger.log(format_args!("ignored"));
        logger.log_error("ignored", None);
    }
}
