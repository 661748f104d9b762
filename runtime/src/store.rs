//! The concrete store.
//!
//! A [`Store`] owns the [`StateTree`] of every registered module and folds
//! each dispatched [`Event`] through the combined module reducers. Writes are
//! serialized through a `tokio::sync::watch` channel, so the store can be
//! shared freely (`Arc<Store>`) across tasks and threads.

use crate::config::StoreConfig;
use crate::error::StoreError;
use crate::metrics::StoreMetrics;
use crate::module::Module;
use revux_core::composition::CombinedReducer;
use revux_core::module::ModuleDefinition;
use revux_core::{Event, Reducer, StateTree, StoreHandle};
use std::fmt;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Store runtime holding the state of several modules
///
/// # Example
///
/// ```
/// use revux_core::module::ModuleDefinition;
/// use revux_core::StoreHandle;
/// use revux_runtime::module::Module;
/// use revux_runtime::store::Store;
///
/// #[derive(Clone, Default)]
/// struct Counter {
///     count: i64,
/// }
///
/// let counter = Module::new(
///     ModuleDefinition::builder("counter")
///         .state(Counter::default())
///         .mutation("INCREMENT", |draft, _payload| draft.count += 1)
///         .build()?,
/// );
///
/// let store = Store::builder().module(&counter)?.build();
/// assert!(store.get_state().contains("counter"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Store {
    state: watch::Sender<StateTree>,
    reducer: CombinedReducer<StateTree>,
    /// Event broadcast channel for observing every dispatched event.
    events: broadcast::Sender<Event>,
}

impl Store {
    /// Start building a store
    #[must_use]
    pub fn builder() -> StoreBuilder {
        StoreBuilder::new()
    }

    /// Subscribe to state changes
    ///
    /// The receiver is notified only when an event changed the tree.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StateTree> {
        self.state.subscribe()
    }

    /// Subscribe to dispatched events
    ///
    /// Every event is broadcast after it has been folded into the state,
    /// including events that changed nothing. Slow subscribers lag and lose
    /// the oldest events once the configured capacity is exceeded.
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    /// Registered module namespaces
    #[must_use]
    pub fn namespaces(&self) -> Vec<String> {
        self.state
            .borrow()
            .namespaces()
            .map(ToString::to_string)
            .collect()
    }
}

impl StoreHandle for Store {
    fn get_state(&self) -> StateTree {
        self.state.borrow().clone()
    }

    #[tracing::instrument(skip(self, event), fields(event = %event), name = "store_dispatch")]
    fn dispatch(&self, event: Event) {
        StoreMetrics::record_dispatch(event.namespace());

        let changed = self.state.send_if_modified(|tree| {
            let next = self.reducer.reduce(tree, &event);
            if next.ptr_eq(tree) {
                false
            } else {
                *tree = next;
                true
            }
        });

        if changed {
            tracing::debug!("Event folded into state");
        } else {
            tracing::trace!("Event left state unchanged");
        }

        // Broadcast to observers; an error only means nobody is listening
        let _ = self.events.send(event);
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("state", &*self.state.borrow())
            .field("reducer", &self.reducer)
            .field("event_subscribers", &self.events.receiver_count())
            .finish()
    }
}

/// Builder for [`Store`]
///
/// Each registered module contributes its initial slice and its reducer.
pub struct StoreBuilder {
    tree: StateTree,
    reducer: CombinedReducer<StateTree>,
    config: StoreConfig,
}

impl StoreBuilder {
    /// An empty builder with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self {
            tree: StateTree::new(),
            reducer: CombinedReducer::default(),
            config: StoreConfig::default(),
        }
    }

    /// Register a module
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateNamespace`] if a module with the same
    /// namespace is already registered.
    pub fn module<D>(self, module: &Module<D>) -> Result<Self, StoreError>
    where
        D: Clone + Send + Sync + 'static,
    {
        self.definition(Arc::clone(module.definition()))
    }

    /// Register a module definition
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateNamespace`] if a module with the same
    /// namespace is already registered.
    pub fn definition<D>(mut self, definition: Arc<ModuleDefinition<D>>) -> Result<Self, StoreError>
    where
        D: Clone + Send + Sync + 'static,
    {
        let namespace = definition.namespace();
        if self.tree.contains(namespace) {
            return Err(StoreError::DuplicateNamespace(namespace.to_string()));
        }

        tracing::debug!(namespace, "Registering module");
        self.tree = self.tree.with_slice(namespace, definition.initial_slice());
        self.reducer.push(Box::new(definition));
        Ok(self)
    }

    /// Use custom configuration
    #[must_use]
    pub const fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Create the store
    #[must_use]
    pub fn build(self) -> Store {
        let (state, _) = watch::channel(self.tree);
        let (events, _) = broadcast::channel(self.config.event_capacity.max(1));

        Store {
            state,
            reducer: self.reducer,
            events,
        }
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StoreBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreBuilder")
            .field("tree", &self.tree)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Counter {
        count: i64,
    }

    fn counter(namespace: &str) -> Result<Module<Counter>, Box<dyn std::error::Error>> {
        let definition = ModuleDefinition::builder(namespace)
            .state(Counter::default())
            .mutation("ADD", |draft, payload| {
                draft.count += payload.as_i64().unwrap_or(1);
            })
            .build()?;
        Ok(Module::new(definition))
    }

    #[test]
    fn test_duplicate_namespace_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let a = counter("counter")?;
        let b = counter("counter")?;
        let result = Store::builder().module(&a)?.module(&b);
        assert!(matches!(result, Err(StoreError::DuplicateNamespace(ns)) if ns == "counter"));
        Ok(())
    }

    #[test]
    fn test_dispatch_folds_event() -> Result<(), Box<dyn std::error::Error>> {
        let module = counter("counter")?;
        let store = Store::builder().module(&module)?.build();

        store.dispatch(Event::mutation("counter", "ADD", json!(5)));

        let slice = store.get_state().slice::<Counter>("counter");
        assert_eq!(slice.map(|s| s.state().count), Some(5));
        Ok(())
    }

    #[test]
    fn test_unhandled_event_keeps_tree_identical() -> Result<(), Box<dyn std::error::Error>> {
        let module = counter("counter")?;
        let store = Store::builder().module(&module)?.build();
        let before = store.get_state();

        store.dispatch(Event::mutation("counter", "UNKNOWN", Value::Null));
        store.dispatch(Event::mutation("elsewhere", "ADD", json!(1)));

        assert!(store.get_state().ptr_eq(&before));
        Ok(())
    }

    #[tokio::test]
    async fn test_subscribers_see_changes_and_events() -> Result<(), Box<dyn std::error::Error>> {
        let module = counter("counter")?;
        let store = Store::builder()
            .module(&module)?
            .with_config(StoreConfig::default().with_event_capacity(4))
            .build();
        let mut states = store.subscribe();
        let mut events = store.subscribe_events();

        store.dispatch(Event::mutation("counter", "ADD", json!(2)));

        assert!(states.has_changed()?);
        let count = states
            .borrow_and_update()
            .slice::<Counter>("counter")
            .map(|s| s.state().count);
        assert_eq!(count, Some(2));

        let event = events.recv().await?;
        assert_eq!(event.event_type(), "counter/ADD");
        Ok(())
    }

    #[test]
    fn test_namespaces_lists_registered_modules() -> Result<(), Box<dyn std::error::Error>> {
        let a = counter("alpha")?;
        let b = counter("beta")?;
        let store = Store::builder().module(&a)?.module(&b)?.build();
        assert_eq!(store.namespaces(), vec!["alpha".to_string(), "beta".to_string()]);
        Ok(())
    }
}
