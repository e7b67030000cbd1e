//! Observability for vellum
//!
//! Structured logging for document lifecycle events.

pub mod logger;

pub use logger::{Logger, Severity};
