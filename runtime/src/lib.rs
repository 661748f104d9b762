//! # Revux Runtime
//!
//! Runtime implementation for Revux modules.
//!
//! This crate provides the store that owns module state, the dispatcher that
//! runs sync and HTTP-backed actions against it, and an HTTP collaborator
//! backed by `reqwest`.
//!
//! ## Core Components
//!
//! - **Store**: owns the state tree and folds dispatched events ([`store`])
//! - **Module**: binds a definition to a store and dispatches its actions ([`module`])
//! - **HTTP client**: the production [`HttpClient`](revux_core::environment::HttpClient) ([`http`])
//! - **Config**: store and HTTP client settings ([`config`])
//!
//! ## Example
//!
//! ```ignore
//! use revux_runtime::{Module, ModuleEnvironment, Store};
//!
//! let todos = Module::new(todos_definition()?);
//! let store = Arc::new(Store::builder().module(&todos)?.build());
//! todos.bind_store(store, ModuleEnvironment::new(http))?;
//!
//! // Run an API action
//! let outcome = todos.dispatch_api("GET_TODOS", json!({})).await?;
//!
//! // Read state
//! let pending = todos.requests("GET_TODOS")?.is_pending();
//! ```

/// Runtime configuration
pub mod config;

/// `reqwest`-backed HTTP collaborator
pub mod http;

/// Metric names and descriptions
pub mod metrics;

/// Bound modules: dispatcher and getter facade
pub mod module;

/// The concrete store
pub mod store;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur while assembling a Store
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Two modules share a namespace
        ///
        /// Each namespace owns exactly one slice of the state tree.
        #[error("A module is already registered under namespace '{0}'")]
        DuplicateNamespace(String),
    }
}

pub use config::{ConfigError, HttpConfig, StoreConfig};
pub use error::StoreError;
pub use http::ReqwestHttpClient;
pub use module::{ApiOutcome, Module, ModuleEnvironment};
pub use store::{Store, StoreBuilder};
