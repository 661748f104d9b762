//! Domain types for the Todo example.
//!
//! Todos come from a JSON API, so the item type mirrors the wire format
//! (camelCase, tolerant of missing fields). The list is kept behind an `Arc`
//! so updates that only change the selection share it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Identifier assigned by the API
pub type TodoId = i64;

/// A single todo item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Unique identifier
    pub id: TodoId,
    /// Title/description of the todo
    #[serde(default)]
    pub title: String,
    /// Whether the todo is completed
    #[serde(default)]
    pub completed: bool,
    /// Owner, when the API reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
}

impl Todo {
    /// Creates a new open todo
    #[must_use]
    pub fn new(id: TodoId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            completed: false,
            user_id: None,
        }
    }

    /// Decode a todo from an API body, `None` if it has no numeric id
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// State of the todos module
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TodoState {
    /// All todos indexed by ID
    pub list: Arc<BTreeMap<TodoId, Todo>>,
    /// Currently selected todo
    pub selected_todo_id: Option<TodoId>,
}

impl TodoState {
    /// Creates a new empty todo state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of todos
    #[must_use]
    pub fn count(&self) -> usize {
        self.list.len()
    }

    /// Returns the number of completed todos
    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.list.values().filter(|t| t.completed).count()
    }

    /// Returns a todo by ID
    #[must_use]
    pub fn get(&self, id: TodoId) -> Option<&Todo> {
        self.list.get(&id)
    }

    /// The selected todo, if it is still in the list
    #[must_use]
    pub fn selected(&self) -> Option<&Todo> {
        self.selected_todo_id.and_then(|id| self.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn todo_from_api_body() {
        let todo = Todo::from_json(&json!({
            "userId": 1,
            "id": 7,
            "title": "delectus aut autem",
            "completed": true
        }));
        assert_eq!(
            todo,
            Some(Todo {
                id: 7,
                title: "delectus aut autem".to_string(),
                completed: true,
                user_id: Some(1),
            })
        );
    }

    #[test]
    fn todo_from_partial_body_uses_defaults() {
        assert_eq!(Todo::from_json(&json!({ "id": 42, "title": "x" })), Some(Todo::new(42, "x")));
        assert_eq!(Todo::from_json(&json!({ "title": "no id" })), None);
    }

    #[test]
    fn todo_state_count() {
        let mut state = TodoState::new();
        assert_eq!(state.count(), 0);
        assert_eq!(state.completed_count(), 0);

        let mut done = Todo::new(2, "Todo 2");
        done.completed = true;
        state.list = Arc::new(BTreeMap::from([(1, Todo::new(1, "Todo 1")), (2, done)]));
        state.selected_todo_id = Some(2);

        assert_eq!(state.count(), 2);
        assert_eq!(state.completed_count(), 1);
        assert_eq!(state.selected().map(|t| t.id), Some(2));
    }
}
