//! Dispatched events.
//!
//! An [`Event`] is the only input a reducer accepts. It names the module
//! namespace it targets and what happened. Three lifecycle kinds are handled
//! the same way by every module; the other kinds are resolved against the
//! module's registry.
//!
//! Events are transient: they exist only on their way through the reducer
//! (and to any observers of the store).

use crate::http::ApiRequest;
use crate::request::RequestKey;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;

/// Event type suffix of [`EventKind::RequestInitiated`]
pub const REQUEST_INITIATED: &str = "REVUX_REQUEST_INITIATED";
/// Event type suffix of [`EventKind::RequestSucceeded`]
pub const REQUEST_SUCCESS: &str = "REVUX_REQUEST_SUCCESS";
/// Event type suffix of [`EventKind::RequestFailed`]
pub const REQUEST_FAILURE: &str = "REVUX_REQUEST_FAILURE";

/// What happened
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// A request started; its record becomes pending
    RequestInitiated {
        /// Tracked key
        key: RequestKey,
        /// Start time
        at: DateTime<Utc>,
    },

    /// A request finished successfully
    RequestSucceeded {
        /// Tracked key
        key: RequestKey,
        /// Completion time
        at: DateTime<Utc>,
    },

    /// A request failed
    RequestFailed {
        /// Tracked key
        key: RequestKey,
        /// Completion time
        at: DateTime<Utc>,
        /// Opaque error payload
        error: Value,
    },

    /// A committed mutation
    Mutation {
        /// Mutation name
        name: String,
        /// Mutation payload
        payload: Value,
    },

    /// An API action's response arrived; routed to its success mutation
    ApiSucceeded {
        /// API action name
        action: String,
        /// Payload the action was dispatched with
        payload: Value,
        /// The request that was made
        request: ApiRequest,
        /// Decoded response body
        response: Value,
    },
}

/// A dispatched event addressed to one module namespace
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    namespace: String,
    kind: EventKind,
}

impl Event {
    /// Create an event
    #[must_use]
    pub fn new(namespace: impl Into<String>, kind: EventKind) -> Self {
        Self {
            namespace: namespace.into(),
            kind,
        }
    }

    /// Request started
    #[must_use]
    pub fn request_initiated(
        namespace: impl Into<String>,
        key: RequestKey,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(namespace, EventKind::RequestInitiated { key, at })
    }

    /// Request succeeded
    #[must_use]
    pub fn request_succeeded(
        namespace: impl Into<String>,
        key: RequestKey,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(namespace, EventKind::RequestSucceeded { key, at })
    }

    /// Request failed
    #[must_use]
    pub fn request_failed(
        namespace: impl Into<String>,
        key: RequestKey,
        at: DateTime<Utc>,
        error: Value,
    ) -> Self {
        Self::new(namespace, EventKind::RequestFailed { key, at, error })
    }

    /// Mutation committed
    #[must_use]
    pub fn mutation(namespace: impl Into<String>, name: impl Into<String>, payload: Value) -> Self {
        Self::new(
            namespace,
            EventKind::Mutation {
                name: name.into(),
                payload,
            },
        )
    }

    /// API response arrived
    #[must_use]
    pub fn api_succeeded(
        namespace: impl Into<String>,
        action: impl Into<String>,
        payload: Value,
        request: ApiRequest,
        response: Value,
    ) -> Self {
        Self::new(
            namespace,
            EventKind::ApiSucceeded {
                action: action.into(),
                payload,
                request,
                response,
            },
        )
    }

    /// Target namespace
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// What happened
    #[must_use]
    pub const fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Whether the event targets `namespace`
    #[must_use]
    pub fn is_for(&self, namespace: &str) -> bool {
        self.namespace == namespace
    }

    /// Namespaced type string, e.g. `todos/ADD_TODO`
    #[must_use]
    pub fn event_type(&self) -> String {
        let name = match &self.kind {
            EventKind::RequestInitiated { .. } => REQUEST_INITIATED,
            EventKind::RequestSucceeded { .. } => REQUEST_SUCCESS,
            EventKind::RequestFailed { .. } => REQUEST_FAILURE,
            EventKind::Mutation { name, .. } => name.as_str(),
            EventKind::ApiSucceeded { action, .. } => action.as_str(),
        };
        format!("{}/{name}", self.namespace)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.event_type())
    }
}
