//! # Revux Core
//!
//! Core traits and types for Revux modules.
//!
//! A module bundles a namespaced slice of state, the mutations that change it,
//! getters that derive values from it, and API actions whose request lifecycle
//! (pending, success, error) is tracked automatically.
//!
//! ## Core Concepts
//!
//! - **Draft**: copy-on-write view used by mutations ([`draft`])
//! - **Request tracking**: per-key lifecycle records and read views ([`request`])
//! - **Event**: the unit of input to a reducer ([`event`])
//! - **Module definition**: validated registry of actions, mutations and getters ([`module`])
//! - **Reducer**: pure function `(State, Event) → State` ([`reducer`])
//! - **Environment**: injected dependencies such as the HTTP collaborator ([`environment`])
//!
//! ## Architecture Principles
//!
//! - Functional core: reducers never perform I/O
//! - Unidirectional data flow through a single store
//! - Structural sharing: untouched state is never copied
//! - Dependency injection via the module environment
//!
//! ## Example
//!
//! ```
//! use revux_core::module::ModuleDefinition;
//! use revux_core::http::ApiRequest;
//! use revux_core::module::ApiAction;
//!
//! #[derive(Clone, Default)]
//! struct CounterState {
//!     count: i64,
//! }
//!
//! let definition = ModuleDefinition::builder("counter")
//!     .state(CounterState::default())
//!     .getter("count", |state: &CounterState| state.count)
//!     .mutation("INCREMENT", |draft, _payload| draft.count += 1)
//!     .api_action(
//!         "FETCH_COUNT",
//!         ApiAction::<CounterState>::new(
//!             |_ctx, _payload| ApiRequest::get("/count"),
//!             |draft, result| draft.count = result.response.as_i64().unwrap_or_default(),
//!         ),
//!     )
//!     .build();
//!
//! assert!(definition.is_ok());
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use serde_json::Value;

/// Copy-on-write drafts and the `produce` update engine
pub mod draft;

/// Error types for module definitions and module operations
pub mod error;

/// Dispatched events
pub mod event;

/// Request descriptors and the HTTP collaborator contract types
pub mod http;

/// Module definitions: the action, mutation and getter registry
pub mod module;

/// Request lifecycle records and status views
pub mod request;

/// Module state slices and the namespaced state tree
pub mod state;

/// Reducer composition utilities
pub mod composition;

/// Reducer module - The core trait for state transitions
///
/// Reducers are pure functions: `(State, Event) → State`.
///
/// They never mutate the state they receive. A reducer that ignores an event
/// returns a value pointer-equal to its input so consumers can detect changes
/// cheaply.
pub mod reducer {
    use crate::event::Event;
    use std::sync::Arc;

    /// The Reducer trait - core abstraction for state transitions
    ///
    /// # Example
    ///
    /// ```ignore
    /// impl Reducer for TodosReducer {
    ///     type State = StateTree;
    ///
    ///     fn reduce(&self, state: &StateTree, event: &Event) -> StateTree {
    ///         if event.namespace() != "todos" {
    ///             return state.clone();
    ///         }
    ///         // Fold the event into a new tree
    ///         state.clone()
    ///     }
    /// }
    /// ```
    pub trait Reducer {
        /// The state type this reducer folds events into
        type State;

        /// Fold an event into a new state value
        ///
        /// Must be total: unknown events return the input state unchanged.
        fn reduce(&self, state: &Self::State, event: &Event) -> Self::State;
    }

    impl<R> Reducer for Arc<R>
    where
        R: Reducer + ?Sized,
    {
        type State = R::State;

        fn reduce(&self, state: &Self::State, event: &Event) -> Self::State {
            (**self).reduce(state, event)
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected when a
/// module is bound to a store. Production code uses [`SystemClock`] and a real
/// HTTP client; tests use a fixed clock and a scripted client.
///
/// [`SystemClock`]: environment::SystemClock
pub mod environment {
    use crate::http::{HttpError, HttpRequest, HttpResponse};
    use chrono::{DateTime, Utc};
    use std::future::Future;
    use std::pin::Pin;

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }

    /// Future returned by [`HttpClient::execute`]
    pub type HttpFuture<'a> =
        Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>>;

    /// The HTTP collaborator used by API actions
    ///
    /// Implementations perform the actual transport. A successful call yields
    /// the decoded response body in [`HttpResponse::data`]; any failure yields
    /// an [`HttpError`], optionally carrying a structured error body.
    ///
    /// # Dyn Compatibility
    ///
    /// This trait uses explicit `Pin<Box<dyn Future>>` returns instead of
    /// `async fn` so it can be injected as `Arc<dyn HttpClient>`.
    pub trait HttpClient: Send + Sync {
        /// Execute a request
        ///
        /// # Errors
        ///
        /// Returns [`HttpError`] for any transport failure or non-success
        /// response.
        fn execute(&self, request: HttpRequest) -> HttpFuture<'_>;
    }
}

/// Store module - the contract a module binds to
pub mod store {
    use crate::event::Event;
    use crate::state::StateTree;

    /// An externally owned, centralized store
    ///
    /// Modules read the current [`StateTree`] and dispatch events through this
    /// handle. Dispatching folds the event into the state synchronously, so a
    /// read that follows a dispatch observes its effect.
    pub trait StoreHandle: Send + Sync {
        /// Snapshot of the current state tree
        fn get_state(&self) -> StateTree;

        /// Fold an event into the store's state
        fn dispatch(&self, event: Event);
    }
}

pub use draft::{Draft, produce, try_produce};
pub use error::{DefinitionError, ModuleError};
pub use event::{Event, EventKind};
pub use module::{ApiAction, ModuleDefinition};
pub use reducer::Reducer;
pub use request::{RequestKey, RequestRecord, RequestStatus, RequestStatusView};
pub use state::{ModuleState, StateTree};
pub use store::StoreHandle;
