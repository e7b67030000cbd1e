//! Document controller
//!
//! One in-memory record bound to one schema. Construction wires the
//! canonical "save" pre-hooks (deferred-error check, defaults,
//! validation) and replays calls the schema queued before the instance
//! existed. All mutation goes through the casting accessor; a cast
//! failure is captured for the next hooked save instead of being thrown
//! from `set`.

pub mod errors;
pub mod events;
pub mod state;

mod defaults;
mod validate;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::stream::{FuturesUnordered, StreamExt};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::hooks::{HookRegistry, PreHook, SerialHook};
use crate::observability::Logger;
use crate::schema::cast::{cast_scalar, json_type_name};
use crate::schema::types::PathKind;
use crate::schema::{QueuedCall, Schema};

use errors::{DocumentError, DocumentResult};
use events::{Listener, ListenerMap, Observable};
use state::PathState;

/// A value stored at one path, owned exclusively by its document
#[derive(Debug, Clone)]
pub enum PathValue {
    /// A typed scalar
    Scalar(Value),
    /// A single nested document
    Document(Box<Document>),
    /// An ordered collection of nested documents
    Collection(Vec<Document>),
}

impl PathValue {
    /// The scalar value, if this is one
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            PathValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// The embedded collection, if this is one
    pub fn as_collection(&self) -> Option<&[Document]> {
        match self {
            PathValue::Collection(docs) => Some(docs),
            _ => None,
        }
    }
}

/// Flags controlling one `set` operation
#[derive(Debug, Clone, Copy)]
pub struct SetOptions {
    /// Run setter transforms and cast before storing
    pub transform: bool,
    /// Mark the path dirty (ignored while initializing)
    pub mark_dirty: bool,
    /// Hydration from storage: data is assumed already well-typed
    pub is_init: bool,
}

impl SetOptions {
    /// Caller mutation: transform, mark dirty
    pub fn transformed() -> Self {
        Self {
            transform: true,
            mark_dirty: true,
            is_init: false,
        }
    }

    /// Hydration from a stored record: no transform, never dirty
    pub fn init() -> Self {
        Self {
            transform: false,
            mark_dirty: false,
            is_init: true,
        }
    }

    /// Default application: transform, but leave the path clean
    pub fn default_write() -> Self {
        Self {
            transform: true,
            mark_dirty: false,
            is_init: false,
        }
    }
}

/// The original method wrapped by a hooked invocation. Persistence
/// transports implement this; the hook chain runs it last.
pub trait DocumentOp<T = Value>: Send + Sync {
    /// Execute the wrapped method body
    fn call<'a>(&'a self, doc: &'a mut Document) -> BoxFuture<'a, DocumentResult<T>>;
}

impl<T, F> DocumentOp<T> for F
where
    F: for<'a> Fn(&'a mut Document) -> BoxFuture<'a, DocumentResult<T>> + Send + Sync,
{
    fn call<'a>(&'a self, doc: &'a mut Document) -> BoxFuture<'a, DocumentResult<T>> {
        self(doc)
    }
}

/// No-op persistence for tests and dry runs
pub struct NoopSave;

impl DocumentOp<Value> for NoopSave {
    fn call<'a>(&'a self, _doc: &'a mut Document) -> BoxFuture<'a, DocumentResult<Value>> {
        Box::pin(async { Ok(json!({ "saved": true })) })
    }
}

/// One in-memory record bound to one schema
#[derive(Clone)]
pub struct Document {
    id: Uuid,
    schema: Arc<Schema>,
    values: BTreeMap<String, PathValue>,
    state: PathState,
    is_new: bool,
    save_error: Option<DocumentError>,
    hooks: HookRegistry,
    listeners: ListenerMap,
}

impl Document {
    /// Construct an empty, unpersisted document.
    ///
    /// Wires the canonical "save" pre-hooks in order (deferred-error
    /// check, defaults, validation), then replays the schema's queued
    /// calls into this instance.
    pub fn new(schema: Arc<Schema>) -> Self {
        let mut doc = Self {
            id: Uuid::new_v4(),
            schema,
            values: BTreeMap::new(),
            state: PathState::new(),
            is_new: true,
            save_error: None,
            hooks: HookRegistry::new(),
            listeners: ListenerMap::default(),
        };

        doc.hooks.register_methods(&["save"]);
        doc.hooks.add_serial("save", SerialHook::CheckSaveError);
        doc.hooks.add_serial("save", SerialHook::ApplyDefaults);
        doc.hooks.add_serial("save", SerialHook::Validate);
        doc.replay_queue();
        doc
    }

    /// Construct from a raw stored record
    pub fn from_stored(schema: Arc<Schema>, raw: Map<String, Value>) -> Self {
        let mut doc = Self::new(schema);
        doc.init(raw);
        doc
    }

    /// Instance identifier, used in log events
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The bound schema
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// True until the record is confirmed persisted
    pub fn is_new(&self) -> bool {
        self.is_new
    }

    /// Whether this new document has dirty paths.
    ///
    /// A persisted (non-new) document never reports modified, even with
    /// dirty paths.
    pub fn modified(&self) -> bool {
        self.is_new && self.state.has_dirty()
    }

    /// The deferred error captured by the last failing `set`, if any
    pub fn save_error(&self) -> Option<&DocumentError> {
        self.save_error.as_ref()
    }

    /// Path state tracker
    pub fn path_state(&self) -> &PathState {
        &self.state
    }

    /// Hydrate every top-level key of a stored record. Casting is
    /// bypassed: the data is assumed already well-typed from storage.
    pub fn init(&mut self, raw: Map<String, Value>) {
        self.is_new = false;
        for (key, value) in raw {
            self.set_with(&key, value, SetOptions::init());
        }
        self.emit("init", &Value::Null);
    }

    /// Set a path with transform and dirty marking
    pub fn set(&mut self, path: &str, value: Value) {
        self.set_with(path, value, SetOptions::transformed());
    }

    /// Set a path under explicit flags.
    ///
    /// Never fails synchronously: an unknown path or a failed cast is
    /// captured into the deferred error slot and surfaced by the next
    /// hooked save. On capture the write is skipped.
    pub fn set_with(&mut self, path: &str, value: Value, opts: SetOptions) {
        let schema = Arc::clone(&self.schema);
        let Some(descriptor) = schema.get(path) else {
            self.capture(DocumentError::UnknownPath(path.to_string()));
            return;
        };

        match &descriptor.kind {
            PathKind::EmbeddedDocumentCollection(element_schema) => {
                let Value::Array(items) = value else {
                    self.capture(DocumentError::cast(
                        path,
                        "embedded document collection",
                        json_type_name(&value),
                    ));
                    return;
                };
                let mut docs = Vec::with_capacity(items.len());
                for item in items {
                    match self.build_embedded(path, element_schema, item, opts) {
                        Some(doc) => docs.push(doc),
                        None => return,
                    }
                }
                self.values.insert(path.to_string(), PathValue::Collection(docs));
            }
            PathKind::EmbeddedDocument(child_schema) => {
                match self.build_embedded(path, child_schema, value, opts) {
                    Some(doc) => {
                        self.values
                            .insert(path.to_string(), PathValue::Document(Box::new(doc)));
                    }
                    None => return,
                }
            }
            PathKind::Scalar(kind) => {
                let value = if opts.transform {
                    let mut value = value;
                    for setter in &descriptor.setters {
                        value = setter(value);
                    }
                    match cast_scalar(*kind, value) {
                        Ok(value) => value,
                        Err(failure) => {
                            self.capture(DocumentError::cast(
                                path,
                                failure.expected,
                                failure.actual,
                            ));
                            return;
                        }
                    }
                } else {
                    value
                };
                self.values.insert(path.to_string(), PathValue::Scalar(value));
            }
        }

        self.state.hydrate(path);
        if opts.mark_dirty && !opts.is_init {
            self.state.mark_dirty(path);
        }
    }

    /// Read a path. No side effects; absent if never hydrated.
    pub fn get(&self, path: &str) -> Option<&PathValue> {
        self.values.get(path)
    }

    /// Read a scalar path
    pub fn get_scalar(&self, path: &str) -> Option<&Value> {
        self.values.get(path).and_then(PathValue::as_scalar)
    }

    /// Register a pre-hook for a method on this instance
    pub fn pre(&mut self, method: &str, hook: PreHook) {
        self.hooks.add(method, hook);
    }

    /// Make method names interceptable on this instance
    pub fn register_hooks(&mut self, methods: &[&str]) {
        self.hooks.register_methods(methods);
    }

    /// Per-instance hook registry
    pub fn hook_registry(&self) -> &HookRegistry {
        &self.hooks
    }

    /// Invoke a named method through its pre-hook chain.
    ///
    /// Serial hooks run strictly in registration order; parallel hooks
    /// fan out behind a join barrier. The first error aborts the chain
    /// and is returned in place of the wrapped method's result. A method
    /// never made hookable, or with no hooks registered, runs unmodified.
    pub async fn invoke<T>(
        &mut self,
        method: &str,
        original: &dyn DocumentOp<T>,
    ) -> DocumentResult<T> {
        if !self.hooks.is_hookable(method) {
            return original.call(self).await;
        }
        let pres = match self.hooks.get(method) {
            Some(pres) if !pres.is_empty() => pres.clone(),
            _ => return original.call(self).await,
        };

        for hook in &pres.serial {
            let result = match hook {
                SerialHook::CheckSaveError => match self.save_error.take() {
                    Some(err) => Err(err),
                    None => Ok(()),
                },
                SerialHook::ApplyDefaults => {
                    self.apply_defaults().await;
                    Ok(())
                }
                SerialHook::Validate => self.validate().await,
                SerialHook::Custom(f) => f.run(self).await,
            };
            if let Err(err) = result {
                self.log_abort(method, &err);
                return Err(err);
            }
        }

        if !pres.parallel.is_empty() {
            let shared: &Document = self;
            let mut join: FuturesUnordered<BoxFuture<'_, DocumentResult<()>>> =
                pres.parallel.iter().map(|f| f.run(shared)).collect();
            while let Some(result) = join.next().await {
                if let Err(err) = result {
                    shared.log_abort(method, &err);
                    return Err(err);
                }
            }
        }

        original.call(self).await
    }

    /// Persist through the hooked "save" chain. On success the document
    /// is no longer new and a "save" event is emitted.
    pub async fn save(&mut self, persist: &dyn DocumentOp<Value>) -> DocumentResult<Value> {
        let value = self.invoke("save", persist).await?;
        self.is_new = false;
        let doc_id = self.id.to_string();
        Logger::info("DOC_SAVE_COMPLETE", &[("doc", doc_id.as_str())]);
        self.emit("save", &value);
        Ok(value)
    }

    fn build_embedded(
        &mut self,
        path: &str,
        schema: &Arc<Schema>,
        value: Value,
        opts: SetOptions,
    ) -> Option<Document> {
        let Value::Object(fields) = value else {
            self.capture(DocumentError::cast(
                path,
                "embedded document",
                json_type_name(&value),
            ));
            return None;
        };
        if opts.is_init {
            Some(Document::from_stored(Arc::clone(schema), fields))
        } else {
            // child writes inherit the caller's flags, so a clean
            // hydration of the parent path stays clean in the element
            let mut doc = Document::new(Arc::clone(schema));
            for (key, value) in fields {
                doc.set_with(&key, value, opts);
            }
            Some(doc)
        }
    }

    /// Capture an out-of-band error for the next hooked save. The first
    /// capture is kept until the error-check hook consumes it.
    fn capture(&mut self, err: DocumentError) {
        let doc_id = self.id.to_string();
        let text = err.to_string();
        Logger::warn(
            "DOC_DEFERRED_ERROR",
            &[
                ("doc", doc_id.as_str()),
                ("kind", err.kind()),
                ("error", text.as_str()),
            ],
        );
        if self.save_error.is_none() {
            self.save_error = Some(err);
        }
    }

    fn log_abort(&self, method: &str, err: &DocumentError) {
        let doc_id = self.id.to_string();
        let text = err.to_string();
        Logger::warn(
            "DOC_HOOK_CHAIN_ABORT",
            &[
                ("doc", doc_id.as_str()),
                ("method", method),
                ("kind", err.kind()),
                ("error", text.as_str()),
            ],
        );
    }

    fn replay_queue(&mut self) {
        let queued = self.schema.queued().to_vec();
        for call in queued {
            match call {
                QueuedCall::Pre { method, hook } => self.pre(&method, hook),
                QueuedCall::Set { path, value } => self.set(&path, value),
            }
        }
    }
}

impl Observable for Document {
    fn on(&mut self, event: &str, listener: Listener) {
        self.listeners.on(event, listener);
    }

    fn emit(&self, event: &str, payload: &Value) {
        self.listeners.emit(event, payload);
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("id", &self.id)
            .field("schema", &self.schema.name())
            .field("is_new", &self.is_new)
            .field("state", &self.state)
            .field("save_error", &self.save_error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::types::PathDescriptor;

    fn user_schema() -> Arc<Schema> {
        Arc::new(
            Schema::new("users")
                .path("name", PathDescriptor::string())
                .path("age", PathDescriptor::int()),
        )
    }

    #[test]
    fn test_set_then_get() {
        let mut doc = Document::new(user_schema());
        doc.set("name", json!("alice"));
        assert_eq!(doc.get_scalar("name"), Some(&json!("alice")));
        assert!(doc.path_state().is_dirty("name"));
    }

    #[test]
    fn test_get_unhydrated_path_is_absent() {
        let doc = Document::new(user_schema());
        assert!(doc.get("name").is_none());
    }

    #[test]
    fn test_set_casts_through_transform() {
        let mut doc = Document::new(user_schema());
        doc.set("age", json!("30"));
        assert_eq!(doc.get_scalar("age"), Some(&json!(30)));
    }

    #[test]
    fn test_setter_transforms_run_before_cast() {
        let schema = Arc::new(Schema::new("users").path(
            "name",
            PathDescriptor::string().with_setter(|v| match v {
                Value::String(s) => Value::String(s.to_lowercase()),
                other => other,
            }),
        ));
        let mut doc = Document::new(schema);
        doc.set("name", json!("ALICE"));
        assert_eq!(doc.get_scalar("name"), Some(&json!("alice")));
    }

    #[test]
    fn test_cast_failure_is_deferred_not_thrown() {
        let mut doc = Document::new(user_schema());
        doc.set("age", json!("abc"));
        assert!(doc.get("age").is_none());
        assert!(matches!(
            doc.save_error(),
            Some(DocumentError::Cast { path, .. }) if path == "age"
        ));
    }

    #[test]
    fn test_out_of_range_float_on_int_path_is_deferred() {
        let mut doc = Document::new(user_schema());
        doc.set("age", json!(1e20));
        assert!(doc.get("age").is_none());
        assert!(matches!(
            doc.save_error(),
            Some(DocumentError::Cast { path, .. }) if path == "age"
        ));
    }

    #[test]
    fn test_unknown_path_is_deferred() {
        let mut doc = Document::new(user_schema());
        doc.set("nonexistent", json!(1));
        assert!(matches!(
            doc.save_error(),
            Some(DocumentError::UnknownPath(p)) if p == "nonexistent"
        ));
    }

    #[test]
    fn test_first_deferred_error_wins_until_consumed() {
        let mut doc = Document::new(user_schema());
        doc.set("age", json!("abc"));
        doc.set("nonexistent", json!(1));
        assert!(matches!(doc.save_error(), Some(DocumentError::Cast { .. })));
    }

    #[test]
    fn test_init_hydrates_without_dirtying() {
        let mut raw = Map::new();
        raw.insert("name".to_string(), json!("bob"));
        raw.insert("age".to_string(), json!(41));
        let doc = Document::from_stored(user_schema(), raw);

        assert!(!doc.is_new());
        assert!(doc.path_state().is_hydrated("name"));
        assert!(doc.path_state().is_hydrated("age"));
        assert!(!doc.path_state().has_dirty());
        assert_eq!(doc.get_scalar("age"), Some(&json!(41)));
    }

    #[test]
    fn test_collection_path_rejects_non_array() {
        let items = Arc::new(Schema::new("items").path("sku", PathDescriptor::string()));
        let schema = Arc::new(
            Schema::new("orders").path("items", PathDescriptor::embedded_collection(items)),
        );
        let mut doc = Document::new(schema);
        doc.set("items", json!("not-a-collection"));

        assert!(doc.get("items").is_none());
        assert!(matches!(
            doc.save_error(),
            Some(DocumentError::Cast { expected, actual, .. })
                if expected == "embedded document collection" && actual == "string"
        ));
    }

    #[test]
    fn test_collection_path_builds_embedded_documents() {
        let items = Arc::new(Schema::new("items").path("sku", PathDescriptor::string()));
        let schema = Arc::new(
            Schema::new("orders").path("items", PathDescriptor::embedded_collection(items)),
        );
        let mut doc = Document::new(schema);
        doc.set("items", json!([{ "sku": "a-1" }, { "sku": "b-2" }]));

        let docs = doc.get("items").and_then(PathValue::as_collection).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].get_scalar("sku"), Some(&json!("a-1")));
        assert!(docs[1].is_new());
    }

    #[test]
    fn test_canonical_save_hooks_wired_in_order() {
        let doc = Document::new(user_schema());
        assert!(doc.hook_registry().is_hookable("save"));
        assert_eq!(doc.hook_registry().serial_count("save"), 3);
    }

    #[test]
    fn test_queued_calls_replayed_per_instance() {
        let schema = Arc::new(
            Schema::new("users")
                .path("name", PathDescriptor::string())
                .queue(QueuedCall::Set {
                    path: "name".into(),
                    value: json!("queued"),
                }),
        );
        let a = Document::new(Arc::clone(&schema));
        let b = Document::new(schema);
        assert_eq!(a.get_scalar("name"), Some(&json!("queued")));
        assert_eq!(b.get_scalar("name"), Some(&json!("queued")));
        assert!(a.modified());
    }

    #[test]
    fn test_modified_tracks_new_and_dirty() {
        let mut doc = Document::new(user_schema());
        assert!(!doc.modified());
        doc.set("name", json!("x"));
        assert!(doc.modified());
    }

    #[test]
    fn test_modified_false_for_persisted_documents() {
        let mut raw = Map::new();
        raw.insert("name".to_string(), json!("bob"));
        let mut doc = Document::from_stored(user_schema(), raw);
        doc.set("name", json!("changed"));
        // dirty, but not new: never reported as modified
        assert!(doc.path_state().is_dirty("name"));
        assert!(!doc.modified());
    }
}
