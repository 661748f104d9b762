//! Reducer composition utilities
//!
//! A store holds many modules, each reducing only events addressed to its own
//! namespace. [`combine_reducers`] folds one event through all of them so the
//! store drives a single reducer.
//!
//! # Example
//!
//! ```
//! use revux_core::composition::combine_reducers;
//! use revux_core::module::ModuleDefinition;
//! use revux_core::{Event, Reducer, StateTree};
//! use serde_json::json;
//!
//! #[derive(Clone, Default)]
//! struct Flag {
//!     on: bool,
//! }
//!
//! let lights = ModuleDefinition::builder("lights")
//!     .state(Flag::default())
//!     .mutation("TOGGLE", |draft, _payload| draft.on = !draft.on)
//!     .build()?;
//! let alarm = ModuleDefinition::builder("alarm")
//!     .state(Flag::default())
//!     .mutation("TOGGLE", |draft, _payload| draft.on = !draft.on)
//!     .build()?;
//!
//! let tree = StateTree::new()
//!     .with_slice("lights", lights.initial_slice())
//!     .with_slice("alarm", alarm.initial_slice());
//! let combined = combine_reducers(vec![Box::new(lights), Box::new(alarm)]);
//!
//! let next = combined.reduce(&tree, &Event::mutation("lights", "TOGGLE", json!(null)));
//! assert_eq!(next.slice::<Flag>("lights").map(|s| s.state().on), Some(true));
//! assert_eq!(next.slice::<Flag>("alarm").map(|s| s.state().on), Some(false));
//! # Ok::<(), revux_core::DefinitionError>(())
//! ```

use crate::event::Event;
use crate::reducer::Reducer;
use std::fmt;

/// A boxed reducer that can be shared across threads
pub type BoxedReducer<S> = Box<dyn Reducer<State = S> + Send + Sync>;

/// Combines reducers that operate on the same state type.
///
/// Each reducer sees the state produced by the previous one. A reducer that
/// ignores the event returns its input, so an event nobody handles leaves the
/// state pointer-equal to the original.
#[must_use]
pub fn combine_reducers<S>(reducers: Vec<BoxedReducer<S>>) -> CombinedReducer<S>
where
    S: Clone + 'static,
{
    CombinedReducer { reducers }
}

/// A combined reducer that runs multiple reducers in sequence.
///
/// Created by [`combine_reducers`].
pub struct CombinedReducer<S> {
    reducers: Vec<BoxedReducer<S>>,
}

impl<S> CombinedReducer<S> {
    /// Number of reducers
    #[must_use]
    pub fn len(&self) -> usize {
        self.reducers.len()
    }

    /// Whether there are no reducers
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reducers.is_empty()
    }

    /// Append a reducer
    pub fn push(&mut self, reducer: BoxedReducer<S>) {
        self.reducers.push(reducer);
    }
}

impl<S> Default for CombinedReducer<S> {
    fn default() -> Self {
        Self {
            reducers: Vec::new(),
        }
    }
}

impl<S> fmt::Debug for CombinedReducer<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinedReducer")
            .field("reducers", &self.reducers.len())
            .finish()
    }
}

impl<S> Reducer for CombinedReducer<S>
where
    S: Clone + 'static,
{
    type State = S;

    fn reduce(&self, state: &S, event: &Event) -> S {
        self.reducers
            .iter()
            .fold(state.clone(), |current, reducer| reducer.reduce(&current, event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    struct Counter(&'static str);

    impl Reducer for Counter {
        type State = Vec<String>;

        fn reduce(&self, state: &Vec<String>, event: &Event) -> Vec<String> {
            if !event.is_for(self.0) {
                return state.clone();
            }
            let mut next = state.clone();
            next.push(format!("{}:{}", self.0, event.event_type()));
            next
        }
    }

    #[test]
    fn test_combined_reducer_runs_in_order() {
        let combined = combine_reducers(vec![Box::new(Counter("a")), Box::new(Counter("a"))]);
        let state = combined.reduce(&Vec::new(), &Event::mutation("a", "PING", Value::Null));
        assert_eq!(state, vec!["a:a/PING".to_string(), "a:a/PING".to_string()]);
    }

    #[test]
    fn test_only_matching_reducer_changes_state() {
        let mut combined = combine_reducers(vec![Box::new(Counter("a"))]);
        combined.push(Box::new(Counter("b")));
        assert_eq!(combined.len(), 2);

        let state = combined.reduce(&Vec::new(), &Event::mutation("b", "PING", Value::Null));
        assert_eq!(state, vec!["b:b/PING".to_string()]);
    }

    #[test]
    fn test_empty_combination_is_identity() {
        let combined = CombinedReducer::<Vec<String>>::default();
        assert!(combined.is_empty());
        let state = vec!["x".to_string()];
        assert_eq!(combined.reduce(&state, &Event::mutation("a", "PING", Value::Null)), state);
    }
}
