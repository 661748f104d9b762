//! Todo example: a `todos` module backed by a JSON API.
//!
//! The module mirrors a typical CRUD resource:
//!
//! - `GET_TODOS` loads the list and keeps the first page
//! - `ADD_TODO` creates a todo and inserts the server's copy
//! - `UPDATE_TODO` and `DELETE_TODO` track their status per todo id
//! - `selectTodo` is a plain action committing `SET_SELECTED_TODO`
//!
//! # Quick Start
//!
//! ```no_run
//! use revux_runtime::{HttpConfig, ModuleEnvironment, ReqwestHttpClient, Store};
//! use serde_json::json;
//! use std::sync::Arc;
//! use todo::{GET_TODOS, todos_module};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let todos = todos_module()?;
//! let store = Arc::new(Store::builder().module(&todos)?.build());
//!
//! let config = HttpConfig::default().with_base_url("https://jsonplaceholder.typicode.com");
//! let http = Arc::new(ReqwestHttpClient::new(config)?);
//! todos.bind_store(store, ModuleEnvironment::new(http))?;
//!
//! todos.dispatch_api(GET_TODOS, json!(null)).await?;
//! println!("Loaded: {}", todos.state()?.count());
//! println!("Status: {:?}", todos.requests(GET_TODOS)?.status());
//! # Ok(())
//! # }
//! ```

pub mod module;
pub mod types;

pub use module::{
    ADD_TODO, DELETE_TODO, GET_TODOS, NAMESPACE, SELECT_TODO, SET_SELECTED_TODO, UPDATE_TODO,
    todos_definition, todos_module,
};
pub use types::{Todo, TodoId, TodoState};
