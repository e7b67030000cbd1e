//! Hook engine: named pre-hook registry
//!
//! Each document instance owns a registry mapping method names to two
//! ordered buckets of pre-hooks. Serial hooks run strictly in
//! registration order, each resolving before the next starts; parallel
//! hooks fan out concurrently behind a join barrier. Any hook error
//! aborts the chain and the wrapped method never runs.
//!
//! The chain itself is driven by `Document::invoke`.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::document::errors::DocumentResult;
use crate::document::Document;

/// A serial pre-hook stage. Receives exclusive access to the document
/// and resolves before the next serial stage starts.
pub trait SerialHookFn: Send + Sync {
    /// Run the hook
    fn run<'a>(&'a self, doc: &'a mut Document) -> BoxFuture<'a, DocumentResult<()>>;
}

impl<F> SerialHookFn for F
where
    F: for<'a> Fn(&'a mut Document) -> BoxFuture<'a, DocumentResult<()>> + Send + Sync,
{
    fn run<'a>(&'a self, doc: &'a mut Document) -> BoxFuture<'a, DocumentResult<()>> {
        self(doc)
    }
}

/// A parallel pre-hook stage. Fans out concurrently with the other
/// parallel hooks over shared access to the document.
pub trait ParallelHookFn: Send + Sync {
    /// Run the hook
    fn run<'a>(&'a self, doc: &'a Document) -> BoxFuture<'a, DocumentResult<()>>;
}

impl<F> ParallelHookFn for F
where
    F: for<'a> Fn(&'a Document) -> BoxFuture<'a, DocumentResult<()>> + Send + Sync,
{
    fn run<'a>(&'a self, doc: &'a Document) -> BoxFuture<'a, DocumentResult<()>> {
        self(doc)
    }
}

/// A pre-hook as handed to registration. The original engine inferred
/// the discipline from callback arity; here it is explicit.
#[derive(Clone)]
pub enum PreHook {
    /// Ordered, one-at-a-time discipline
    Serial(Arc<dyn SerialHookFn>),
    /// Concurrent fan-out behind a join barrier
    Parallel(Arc<dyn ParallelHookFn>),
}

impl PreHook {
    /// Register a serial hook
    pub fn serial(f: impl SerialHookFn + 'static) -> Self {
        PreHook::Serial(Arc::new(f))
    }

    /// Register a parallel hook
    pub fn parallel(f: impl ParallelHookFn + 'static) -> Self {
        PreHook::Parallel(Arc::new(f))
    }
}

impl fmt::Debug for PreHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreHook::Serial(_) => write!(f, "PreHook::Serial"),
            PreHook::Parallel(_) => write!(f, "PreHook::Parallel"),
        }
    }
}

/// A serial-stage entry. The canonical lifecycle stages are closed
/// variants dispatched by the document controller; everything else is
/// a caller-registered callback.
#[derive(Clone)]
pub enum SerialHook {
    /// Surface a deferred cast error captured during `set`, clearing it
    CheckSaveError,
    /// Run the default-application coordinator
    ApplyDefaults,
    /// Run the validation coordinator
    Validate,
    /// Caller-registered serial hook
    Custom(Arc<dyn SerialHookFn>),
}

impl SerialHook {
    /// Whether two entries are the same registration. Custom hooks
    /// compare by callback identity.
    fn same_as(&self, other: &SerialHook) -> bool {
        match (self, other) {
            (SerialHook::CheckSaveError, SerialHook::CheckSaveError) => true,
            (SerialHook::ApplyDefaults, SerialHook::ApplyDefaults) => true,
            (SerialHook::Validate, SerialHook::Validate) => true,
            (SerialHook::Custom(a), SerialHook::Custom(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for SerialHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SerialHook::CheckSaveError => "CheckSaveError",
            SerialHook::ApplyDefaults => "ApplyDefaults",
            SerialHook::Validate => "Validate",
            SerialHook::Custom(_) => "Custom",
        };
        write!(f, "SerialHook::{}", name)
    }
}

/// The two ordered buckets registered for one method name
#[derive(Clone, Default)]
pub struct PreHooks {
    pub(crate) serial: Vec<SerialHook>,
    pub(crate) parallel: Vec<Arc<dyn ParallelHookFn>>,
}

impl PreHooks {
    /// Whether any hooks are registered
    pub fn is_empty(&self) -> bool {
        self.serial.is_empty() && self.parallel.is_empty()
    }

    fn push_serial(&mut self, hook: SerialHook) {
        // the same callback never appears twice
        if !self.serial.iter().any(|h| h.same_as(&hook)) {
            self.serial.push(hook);
        }
    }

    fn push_parallel(&mut self, hook: Arc<dyn ParallelHookFn>) {
        if !self.parallel.iter().any(|h| Arc::ptr_eq(h, &hook)) {
            self.parallel.push(hook);
        }
    }
}

impl fmt::Debug for PreHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreHooks")
            .field("serial", &self.serial)
            .field("parallel", &self.parallel.len())
            .finish()
    }
}

/// Per-instance hook registry
#[derive(Clone, Debug, Default)]
pub struct HookRegistry {
    hookable: BTreeSet<String>,
    pres: HashMap<String, PreHooks>,
}

impl HookRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark method names as intercepted. Invocations of names never
    /// registered here bypass the chain entirely.
    pub fn register_methods(&mut self, methods: &[&str]) {
        for method in methods {
            self.hookable.insert((*method).to_string());
        }
    }

    /// Whether a method name was made hookable
    pub fn is_hookable(&self, method: &str) -> bool {
        self.hookable.contains(method)
    }

    /// Register a pre-hook for a method, preserving registration order
    /// within its discipline
    pub fn add(&mut self, method: &str, hook: PreHook) {
        let bucket = self.pres.entry(method.to_string()).or_default();
        match hook {
            PreHook::Serial(f) => bucket.push_serial(SerialHook::Custom(f)),
            PreHook::Parallel(f) => bucket.push_parallel(f),
        }
    }

    pub(crate) fn add_serial(&mut self, method: &str, hook: SerialHook) {
        self.pres.entry(method.to_string()).or_default().push_serial(hook);
    }

    /// Hooks registered for a method, if any
    pub fn get(&self, method: &str) -> Option<&PreHooks> {
        self.pres.get(method)
    }

    /// Number of serial hooks registered for a method
    pub fn serial_count(&self, method: &str) -> usize {
        self.pres.get(method).map_or(0, |p| p.serial.len())
    }

    /// Number of parallel hooks registered for a method
    pub fn parallel_count(&self, method: &str) -> usize {
        self.pres.get(method).map_or(0, |p| p.parallel.len())
    }
}
