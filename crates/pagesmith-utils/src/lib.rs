//! Foundation crate shared by every pagesmith component.
//!
//! Holds the request/file data model, the error taxonomy, tracing setup, secret
//! redaction for log output, and the shared outbound HTTP client builder.

pub mod error;
pub mod http;
pub mod logging;
pub mod redaction;
pub mod types;
