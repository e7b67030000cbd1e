//! Observable capability
//!
//! Subscribe/emit semantics for document lifecycle events ("init",
//! "save"). Listeners are owned by the instance, never shared across
//! documents.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

/// An event listener
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Subscribe/emit capability implemented by document types
pub trait Observable {
    /// Subscribe a listener to a named event
    fn on(&mut self, event: &str, listener: Listener);

    /// Emit a named event to every subscribed listener, in
    /// subscription order
    fn emit(&self, event: &str, payload: &Value);
}

/// Owned listener registry backing an `Observable` implementation
#[derive(Clone, Default)]
pub(crate) struct ListenerMap {
    listeners: HashMap<String, Vec<Listener>>,
}

impl ListenerMap {
    pub(crate) fn on(&mut self, event: &str, listener: Listener) {
        self.listeners
            .entry(event.to_string())
            .or_default()
            .push(listener);
    }

    pub(crate) fn emit(&self, event: &str, payload: &Value) {
        if let Some(listeners) = self.listeners.get(event) {
            for listener in listeners {
                listener(payload);
            }
        }
    }
}
