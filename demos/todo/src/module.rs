//! The `todos` module definition.

use crate::types::{Todo, TodoId, TodoState};
use revux_core::http::ApiRequest;
use revux_core::module::{ApiAction, ModuleDefinition};
use revux_core::DefinitionError;
use revux_runtime::Module;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Namespace the module's slice lives under
pub const NAMESPACE: &str = "todos";

/// Fetch the list
pub const GET_TODOS: &str = "GET_TODOS";
/// Create a todo from the payload
pub const ADD_TODO: &str = "ADD_TODO";
/// Patch one todo, tracked per id
pub const UPDATE_TODO: &str = "UPDATE_TODO";
/// Delete one todo, tracked per id
pub const DELETE_TODO: &str = "DELETE_TODO";
/// Select a todo by id
pub const SELECT_TODO: &str = "selectTodo";
/// Store the selected id
pub const SET_SELECTED_TODO: &str = "SET_SELECTED_TODO";

/// How many todos of a fetched list are kept
pub const PAGE_SIZE: usize = 5;

/// Describe the `todos` module
///
/// # Errors
///
/// Returns a [`DefinitionError`] if the registrations are inconsistent.
pub fn todos_definition() -> Result<ModuleDefinition<TodoState>, DefinitionError> {
    ModuleDefinition::builder(NAMESPACE)
        .state(TodoState::new())
        .getter("todos", |state: &TodoState| {
            state.list.values().cloned().collect::<Vec<_>>()
        })
        .getter("selectedTodoId", |state: &TodoState| state.selected_todo_id)
        .api_action(
            GET_TODOS,
            ApiAction::<TodoState>::new(
                |_ctx, _payload| ApiRequest::get("/todos"),
                |draft, result| {
                    let list: BTreeMap<_, _> = result
                        .response
                        .as_array()
                        .into_iter()
                        .flatten()
                        .take(PAGE_SIZE)
                        .filter_map(Todo::from_json)
                        .map(|todo| (todo.id, todo))
                        .collect();
                    draft.list = Arc::new(list);
                },
            ),
        )
        .api_action(
            ADD_TODO,
            ApiAction::<TodoState>::new(
                |_ctx, payload| ApiRequest::post("/todos").with_params(payload.clone()),
                |draft, result| {
                    if let Some(todo) = Todo::from_json(result.response) {
                        Arc::make_mut(&mut draft.list).insert(todo.id, todo);
                    }
                },
            ),
        )
        .api_action(
            UPDATE_TODO,
            ApiAction::<TodoState>::new(
                |_ctx, payload| {
                    keyed(
                        ApiRequest::patch(todo_url(payload)).with_params(payload.clone()),
                        payload,
                    )
                },
                |draft, result| {
                    if let Some(todo) = Todo::from_json(result.response) {
                        Arc::make_mut(&mut draft.list).insert(todo.id, todo);
                    }
                },
            ),
        )
        .api_action(
            DELETE_TODO,
            ApiAction::<TodoState>::new(
                |_ctx, payload| keyed(ApiRequest::delete(todo_url(payload)), payload),
                |draft, result| {
                    if let Some(id) = todo_id(result.payload) {
                        if draft.list.contains_key(&id) {
                            Arc::make_mut(&mut draft.list).remove(&id);
                        }
                    }
                },
            ),
        )
        .action(SELECT_TODO, |ctx, payload| {
            ctx.commit(SET_SELECTED_TODO, payload["id"].clone())
        })
        .mutation(SET_SELECTED_TODO, |draft, payload| {
            draft.selected_todo_id = payload.as_i64();
        })
        .build()
}

/// The `todos` module, ready to register with a store
///
/// # Errors
///
/// Returns a [`DefinitionError`] if the registrations are inconsistent.
pub fn todos_module() -> Result<Module<TodoState>, DefinitionError> {
    todos_definition().map(Module::new)
}

fn todo_id(payload: &Value) -> Option<TodoId> {
    match &payload["id"] {
        Value::String(id) => id.parse().ok(),
        id => id.as_i64(),
    }
}

fn todo_url(payload: &Value) -> String {
    match todo_id(payload) {
        Some(id) => format!("/todos/{id}"),
        None => "/todos".to_string(),
    }
}

fn keyed(request: ApiRequest, payload: &Value) -> ApiRequest {
    match todo_id(payload) {
        Some(id) => request.key_by(id),
        None => request,
    }
}
