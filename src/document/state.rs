//! PathState tracker
//!
//! Per-document record of which paths hold a value (hydrated) and which
//! were mutated after hydration (dirty). Ordered sets keep iteration
//! deterministic. A dirty path is always hydrated: `mark_dirty` hydrates
//! first, so the invariant holds structurally.

use std::collections::BTreeSet;

/// Hydrated/dirty path sets for one document
#[derive(Debug, Clone, Default)]
pub struct PathState {
    hydrated: BTreeSet<String>,
    dirty: BTreeSet<String>,
}

impl PathState {
    /// Create an empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a path holds a value
    pub fn hydrate(&mut self, path: &str) {
        self.hydrated.insert(path.to_string());
    }

    /// Record a post-hydration mutation
    pub fn mark_dirty(&mut self, path: &str) {
        self.hydrated.insert(path.to_string());
        self.dirty.insert(path.to_string());
    }

    /// Whether the path currently holds a value
    pub fn is_hydrated(&self, path: &str) -> bool {
        self.hydrated.contains(path)
    }

    /// Whether the path was mutated after hydration
    pub fn is_dirty(&self, path: &str) -> bool {
        self.dirty.contains(path)
    }

    /// Whether any path is dirty
    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Whether no path is hydrated
    pub fn is_empty(&self) -> bool {
        self.hydrated.is_empty()
    }

    /// Hydrated paths in deterministic order
    pub fn hydrated(&self) -> impl Iterator<Item = &String> {
        self.hydrated.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hydrate_does_not_dirty() {
        let mut state = PathState::new();
        state.hydrate("name");
        assert!(state.is_hydrated("name"));
        assert!(!state.is_dirty("name"));
        assert!(!state.has_dirty());
    }

    #[test]
    fn test_dirty_implies_hydrated() {
        let mut state = PathState::new();
        state.mark_dirty("age");
        assert!(state.is_hydrated("age"));
        assert!(state.is_dirty("age"));
        assert!(state.has_dirty());
    }

    #[test]
    fn test_hydrated_iteration_is_ordered() {
        let mut state = PathState::new();
        state.hydrate("zeta");
        state.hydrate("alpha");
        state.hydrate("mid");
        let paths: Vec<&String> = state.hydrated().collect();
        assert_eq!(paths, ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_empty_tracker() {
        let state = PathState::new();
        assert!(state.is_empty());
        assert!(!state.is_hydrated("x"));
    }
}
