//! Path type descriptors
//!
//! Every schema path carries a descriptor: its type (a closed tagged
//! variant), an optional default, an ordered validator sequence, and a
//! setter transform chain applied before casting.

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Schema;

/// Setter transform applied to a raw value before casting
pub type SetterFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Zero-argument default generator, resolved synchronously
pub type DefaultGenerator = Arc<dyn Fn() -> Value + Send + Sync>;

/// Asynchronous default generator, resolved on the runtime
pub type AsyncDefaultGenerator = Arc<dyn Fn() -> BoxFuture<'static, Value> + Send + Sync>;

/// Asynchronous validator predicate. Resolves to `None` on success or
/// `Some(message)` on rejection.
pub type ValidatorFn = Arc<dyn Fn(Value) -> BoxFuture<'static, Option<String>> + Send + Sync>;

/// Scalar path types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    /// UTF-8 string
    String,
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
}

impl ScalarKind {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "bool",
        }
    }
}

/// Path type as a closed tagged variant
#[derive(Clone)]
pub enum PathKind {
    /// A scalar value
    Scalar(ScalarKind),
    /// A single nested document with its own schema
    EmbeddedDocument(Arc<Schema>),
    /// An ordered collection of nested documents, each independently
    /// validated and defaulted
    EmbeddedDocumentCollection(Arc<Schema>),
}

impl PathKind {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            PathKind::Scalar(kind) => kind.type_name(),
            PathKind::EmbeddedDocument(_) => "embedded document",
            PathKind::EmbeddedDocumentCollection(_) => "embedded document collection",
        }
    }
}

impl fmt::Debug for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PathKind({})", self.type_name())
    }
}

/// Default value descriptor for a path
#[derive(Clone)]
pub enum DefaultValue {
    /// A plain value, written through `set` directly
    Static(Value),
    /// A synchronous generator invoked at default-application time
    Generator(DefaultGenerator),
    /// An asynchronous generator scheduled on the runtime; the
    /// coordinator joins on all of these before completing
    AsyncGenerator(AsyncDefaultGenerator),
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Static(value) => write!(f, "DefaultValue::Static({})", value),
            DefaultValue::Generator(_) => write!(f, "DefaultValue::Generator"),
            DefaultValue::AsyncGenerator(_) => write!(f, "DefaultValue::AsyncGenerator"),
        }
    }
}

/// A single validator attached to a path
#[derive(Clone)]
pub enum Validator {
    /// Regular-expression test with a fixed rejection message
    Pattern {
        /// Compiled pattern, tested against the string form of the value
        regex: Regex,
        /// Message carried by the resulting validator error
        message: String,
    },
    /// Asynchronous predicate
    Func(ValidatorFn),
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Pattern { regex, .. } => write!(f, "Validator::Pattern({})", regex.as_str()),
            Validator::Func(_) => write!(f, "Validator::Func"),
        }
    }
}

/// Full descriptor for one schema path
#[derive(Clone)]
pub struct PathDescriptor {
    /// Path type
    pub kind: PathKind,
    /// Optional default, applied to new documents
    pub default: Option<DefaultValue>,
    /// Ordered validator sequence; all run concurrently per path
    pub validators: Vec<Validator>,
    /// Setter transforms, applied in order before casting
    pub setters: Vec<SetterFn>,
}

impl PathDescriptor {
    /// Create a descriptor with the given kind and nothing else
    pub fn new(kind: PathKind) -> Self {
        Self {
            kind,
            default: None,
            validators: Vec::new(),
            setters: Vec::new(),
        }
    }

    /// Create a string path
    pub fn string() -> Self {
        Self::new(PathKind::Scalar(ScalarKind::String))
    }

    /// Create an int path
    pub fn int() -> Self {
        Self::new(PathKind::Scalar(ScalarKind::Int))
    }

    /// Create a float path
    pub fn float() -> Self {
        Self::new(PathKind::Scalar(ScalarKind::Float))
    }

    /// Create a bool path
    pub fn bool() -> Self {
        Self::new(PathKind::Scalar(ScalarKind::Bool))
    }

    /// Create a single embedded document path
    pub fn embedded(schema: Arc<Schema>) -> Self {
        Self::new(PathKind::EmbeddedDocument(schema))
    }

    /// Create an embedded document collection path
    pub fn embedded_collection(schema: Arc<Schema>) -> Self {
        Self::new(PathKind::EmbeddedDocumentCollection(schema))
    }

    /// Attach a static default value
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(DefaultValue::Static(value));
        self
    }

    /// Attach a synchronous default generator
    pub fn with_generated_default<F>(mut self, f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::Generator(Arc::new(f)));
        self
    }

    /// Attach an asynchronous default generator
    pub fn with_async_default<F>(mut self, f: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Value> + Send + Sync + 'static,
    {
        self.default = Some(DefaultValue::AsyncGenerator(Arc::new(f)));
        self
    }

    /// Attach a regex validator with its rejection message
    pub fn with_pattern(mut self, regex: Regex, message: impl Into<String>) -> Self {
        self.validators.push(Validator::Pattern {
            regex,
            message: message.into(),
        });
        self
    }

    /// Attach an asynchronous validator predicate
    pub fn with_validator<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> BoxFuture<'static, Option<String>> + Send + Sync + 'static,
    {
        self.validators.push(Validator::Func(Arc::new(f)));
        self
    }

    /// Attach a setter transform
    pub fn with_setter<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.setters.push(Arc::new(f));
        self
    }
}

impl fmt::Debug for PathDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathDescriptor")
            .field("kind", &self.kind)
            .field("default", &self.default)
            .field("validators", &self.validators.len())
            .field("setters", &self.setters.len())
            .finish()
    }
}
