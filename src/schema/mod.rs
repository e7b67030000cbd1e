//! Schema contract consumed by the document runtime
//!
//! A schema maps path names to type descriptors and records calls made
//! before any document instance exists. The deferred-call queue is
//! replayed into every new instance, so a schema-registered hook lands
//! in each document's own registry without leaking across instances.

pub mod cast;
pub mod types;

use std::collections::HashMap;
use std::fmt;

use serde_json::Value;

use crate::hooks::PreHook;
use types::{PathDescriptor, PathKind};

/// A deferred call recorded before instantiation, replayed once per
/// new document in recording order
#[derive(Clone)]
pub enum QueuedCall {
    /// Register a pre-hook on the instance
    Pre {
        /// Hooked method name
        method: String,
        /// The hook to register
        hook: PreHook,
    },
    /// Set a path through the casting accessor
    Set {
        /// Target path
        path: String,
        /// Raw value
        value: Value,
    },
}

impl fmt::Debug for QueuedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueuedCall::Pre { method, .. } => write!(f, "QueuedCall::Pre({})", method),
            QueuedCall::Set { path, .. } => write!(f, "QueuedCall::Set({})", path),
        }
    }
}

/// Schema: path registry plus the deferred-call queue
#[derive(Clone)]
pub struct Schema {
    name: String,
    paths: HashMap<String, PathDescriptor>,
    queued: Vec<QueuedCall>,
}

impl Schema {
    /// Create an empty schema
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            paths: HashMap::new(),
            queued: Vec::new(),
        }
    }

    /// Declare a path (builder style)
    pub fn path(mut self, name: impl Into<String>, descriptor: PathDescriptor) -> Self {
        self.paths.insert(name.into(), descriptor);
        self
    }

    /// Record a deferred call, replayed into every new instance
    pub fn queue(mut self, call: QueuedCall) -> Self {
        self.queued.push(call);
        self
    }

    /// Schema name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the type descriptor for a path
    pub fn get(&self, path: &str) -> Option<&PathDescriptor> {
        self.paths.get(path)
    }

    /// Whether the path resolves to an embedded document collection
    pub fn is_embedded_document_collection(&self, path: &str) -> bool {
        matches!(
            self.paths.get(path).map(|d| &d.kind),
            Some(PathKind::EmbeddedDocumentCollection(_))
        )
    }

    /// Number of declared paths
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub(crate) fn queued(&self) -> &[QueuedCall] {
        &self.queued
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("paths", &self.paths.len())
            .field("queued", &self.queued.len())
            .finish()
    }
}
