//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher / Context
//!     → logging.rs (injected Logger capability)
//!     → tracing events
//!     → tracing-subscriber (stdout, pretty or JSON)
//! ```
//!
//! # Design Decisions
//! - Logging is a capability handed to the mux and every context, never a global
//! - The default capability forwards to `tracing`
//! - Subscriber setup is driven by config, overridable with `RUST_LOG`

pub mod logging;

pub use logging::{Logger, NoopLogger, TracingLogger};
