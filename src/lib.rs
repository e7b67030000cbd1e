//! vellum - a strict, schema-typed document lifecycle engine
//!
//! Tracks per-document path state (hydrated/dirty), applies typed casting
//! and default values, runs asynchronous validation, and intercepts named
//! operations with an ordered serial/parallel pre-hook chain.

pub mod document;
pub mod hooks;
pub mod observability;
pub mod schema;

pub use document::errors::{DocumentError, DocumentResult};
pub use document::events::Observable;
pub use document::state::PathState;
pub use document::{Document, DocumentOp, NoopSave, PathValue, SetOptions};
pub use hooks::{HookRegistry, ParallelHookFn, PreHook, SerialHookFn};
pub use schema::types::{DefaultValue, PathDescriptor, PathKind, ScalarKind, Validator};
pub use schema::{QueuedCall, Schema};
