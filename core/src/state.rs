//! Module state slices and the namespaced state tree.
//!
//! The store owns one [`StateTree`]: a persistent map from module namespace
//! to that module's [`ModuleState`]. Each slice holds the module's domain
//! state and its reserved request records. Every level sits behind an `Arc`,
//! so replacing one slice copies one map node and leaves every other slice
//! pointer-equal.

use crate::draft::produce;
use crate::request::{RequestMap, RequestRecord};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The state a module owns inside the store
pub struct ModuleState<D> {
    state: Arc<D>,
    requests: Arc<RequestMap>,
}

impl<D> ModuleState<D> {
    /// A slice with the given domain state and no request records
    #[must_use]
    pub fn new(state: D) -> Self {
        Self {
            state: Arc::new(state),
            requests: Arc::new(RequestMap::new()),
        }
    }

    /// Domain state
    #[must_use]
    pub const fn state(&self) -> &Arc<D> {
        &self.state
    }

    /// Request records by key
    #[must_use]
    pub const fn requests(&self) -> &Arc<RequestMap> {
        &self.requests
    }

    /// The record for one request key
    #[must_use]
    pub fn request(&self, key: &str) -> Option<&RequestRecord> {
        self.requests.get(key)
    }

    /// A slice with the domain state replaced, sharing the request records
    #[must_use]
    pub fn with_state(&self, state: Arc<D>) -> Self {
        Self {
            state,
            requests: Arc::clone(&self.requests),
        }
    }

    /// A slice with the request records replaced, sharing the domain state
    #[must_use]
    pub fn with_requests(&self, requests: Arc<RequestMap>) -> Self {
        Self {
            state: Arc::clone(&self.state),
            requests,
        }
    }
}

impl<D> Clone for ModuleState<D> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            requests: Arc::clone(&self.requests),
        }
    }
}

impl<D: fmt::Debug> fmt::Debug for ModuleState<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleState")
            .field("state", &self.state)
            .field("requests", &self.requests)
            .finish()
    }
}

/// A type-erased module slice
pub type Slice = Arc<dyn Any + Send + Sync>;

/// The store's root state: module slices by namespace
///
/// Cloning is cheap (one `Arc`). Two trees are [`ptr_eq`](Self::ptr_eq) when
/// no event changed anything between them.
#[derive(Clone, Default)]
pub struct StateTree {
    slices: Arc<BTreeMap<String, Slice>>,
}

impl StateTree {
    /// An empty tree
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registered namespaces, in order
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.slices.keys().map(String::as_str)
    }

    /// Whether a slice exists under `namespace`
    #[must_use]
    pub fn contains(&self, namespace: &str) -> bool {
        self.slices.contains_key(namespace)
    }

    /// The type-erased slice under `namespace`
    #[must_use]
    pub fn raw_slice(&self, namespace: &str) -> Option<&Slice> {
        self.slices.get(namespace)
    }

    /// The typed slice under `namespace`
    ///
    /// `None` when the namespace is missing or holds another state type.
    #[must_use]
    pub fn slice<D>(&self, namespace: &str) -> Option<Arc<ModuleState<D>>>
    where
        D: Send + Sync + 'static,
    {
        let slice = Arc::clone(self.slices.get(namespace)?);
        slice.downcast::<ModuleState<D>>().ok()
    }

    /// A tree with the slice under `namespace` inserted or replaced
    #[must_use]
    pub fn with_slice<D>(&self, namespace: &str, slice: Arc<ModuleState<D>>) -> Self
    where
        D: Send + Sync + 'static,
    {
        let slices = produce(&self.slices, |draft| {
            draft.insert(namespace.to_string(), slice as Slice);
        });
        Self { slices }
    }

    /// Whether both trees are the same value (no change in between)
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slices, &other.slices)
    }
}

impl fmt::Debug for StateTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateTree")
            .field("namespaces", &self.slices.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Counter {
        count: i32,
    }

    #[test]
    fn test_typed_slice_roundtrip() {
        let tree = StateTree::new().with_slice("counter", Arc::new(ModuleState::new(Counter { count: 3 })));

        let slice = tree.slice::<Counter>("counter");
        assert_eq!(slice.map(|s| s.state().count), Some(3));
        assert!(tree.contains("counter"));
        assert_eq!(tree.namespaces().collect::<Vec<_>>(), vec!["counter"]);
    }

    #[test]
    fn test_wrong_type_or_namespace_yields_none() {
        let tree = StateTree::new().with_slice("counter", Arc::new(ModuleState::new(Counter::default())));
        assert!(tree.slice::<String>("counter").is_none());
        assert!(tree.slice::<Counter>("other").is_none());
    }

    #[test]
    fn test_replacing_one_slice_shares_the_others() {
        let a = Arc::new(ModuleState::new(Counter { count: 1 }));
        let tree = StateTree::new()
            .with_slice("a", Arc::clone(&a))
            .with_slice("b", Arc::new(ModuleState::new(Counter { count: 2 })));

        let next = tree.with_slice("b", Arc::new(ModuleState::new(Counter { count: 20 })));

        assert!(!next.ptr_eq(&tree));
        let before = tree.slice::<Counter>("a");
        let after = next.slice::<Counter>("a");
        assert!(matches!((before, after), (Some(x), Some(y)) if Arc::ptr_eq(&x, &y)));
        assert_eq!(tree.slice::<Counter>("b").map(|s| s.state().count), Some(2));
    }

    #[test]
    fn test_with_state_keeps_requests_shared() {
        let slice = ModuleState::new(Counter::default());
        let next = slice.with_state(Arc::new(Counter { count: 9 }));
        assert!(Arc::ptr_eq(slice.requests(), next.requests()));
        assert!(!Arc::ptr_eq(slice.state(), next.state()));
    }
}
