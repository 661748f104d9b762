//! Integration tests for the todos module
//!
//! These run the module through a real `Store` with a scripted HTTP
//! collaborator standing in for the JSON API.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use revux_core::RequestStatus;
use revux_core::environment::Clock;
use revux_core::http::Method;
use revux_runtime::{ApiOutcome, Module, ModuleEnvironment, Store};
use revux_testing::{MockHttpClient, test_clock};
use serde_json::{Value, json};
use std::sync::Arc;
use todo::{
    ADD_TODO, DELETE_TODO, GET_TODOS, SELECT_TODO, Todo, TodoState, UPDATE_TODO, todos_module,
};

fn setup() -> (Module<TodoState>, Arc<MockHttpClient>) {
    let todos = todos_module().unwrap();
    let store = Arc::new(Store::builder().module(&todos).unwrap().build());
    let http = Arc::new(MockHttpClient::new());
    let env = ModuleEnvironment::new(http.clone()).with_clock(Arc::new(test_clock()));
    todos.bind_store(store, env).unwrap();
    (todos, http)
}

fn api_todos(count: i64) -> Value {
    Value::Array(
        (1..=count)
            .map(|id| json!({ "userId": 1, "id": id, "title": format!("todo {id}"), "completed": false }))
            .collect(),
    )
}

async fn loaded() -> (Module<TodoState>, Arc<MockHttpClient>) {
    let (todos, http) = setup();
    http.respond_json(Method::Get, "/todos", api_todos(6));
    assert_eq!(todos.dispatch_api(GET_TODOS, Value::Null).await.unwrap(), ApiOutcome::Success);
    (todos, http)
}

#[tokio::test]
async fn test_get_todos_keeps_first_five() {
    let (todos, _http) = loaded().await;

    let list: Vec<Todo> = todos.get("todos").unwrap();
    assert_eq!(list.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    assert_eq!(list[0].user_id, Some(1));
    assert!(todos.requests(GET_TODOS).unwrap().is_success());
}

#[tokio::test]
async fn test_get_todos_is_pending_while_in_flight() {
    let (todos, http) = setup();
    http.respond_json(Method::Get, "/todos", api_todos(2));
    let gate = http.hold(Method::Get, "/todos");

    assert!(todos.requests(GET_TODOS).unwrap().is_pending_or_empty());

    let load = todos.dispatch_api(GET_TODOS, Value::Null);
    let observe = async {
        http.wait_for_requests(1).await;
        let status = todos.requests(GET_TODOS).unwrap();
        gate.release();
        status
    };
    let (outcome, during) = tokio::join!(load, observe);

    assert!(during.is_pending());
    assert_eq!(during.requested_at(), Some(test_clock().now()));
    assert!(outcome.unwrap().is_success());
    assert_eq!(todos.state().unwrap().count(), 2);
}

#[tokio::test]
async fn test_add_todo_posts_payload_and_inserts_response() {
    let (todos, http) = loaded().await;
    http.respond_json(
        Method::Post,
        "/todos",
        json!({ "id": 201, "title": "Buy milk", "completed": false }),
    );

    let outcome = todos
        .dispatch_api(ADD_TODO, json!({ "title": "Buy milk", "completed": false }))
        .await
        .unwrap();

    assert!(outcome.is_success());
    let state = todos.state().unwrap();
    assert_eq!(state.count(), 6);
    assert_eq!(state.get(201).map(|t| t.title.as_str()), Some("Buy milk"));

    let sent = http.requests().pop().unwrap();
    assert_eq!(sent.method, Method::Post);
    assert_eq!(sent.body, Some(json!({ "title": "Buy milk", "completed": false })));
}

#[tokio::test]
async fn test_update_status_is_tracked_per_todo() {
    let (todos, http) = loaded().await;
    http.respond_json(
        Method::Patch,
        "/todos/2",
        json!({ "id": 2, "title": "todo 2", "completed": true }),
    );
    http.fail(Method::Patch, "/todos/3", 500, json!({ "message": "server down" }));

    let first = todos
        .dispatch_api(UPDATE_TODO, json!({ "id": 2, "completed": true }))
        .await
        .unwrap();
    let second = todos
        .dispatch_api(UPDATE_TODO, json!({ "id": 3, "completed": true }))
        .await
        .unwrap();

    assert_eq!(first, ApiOutcome::Success);
    assert_eq!(second, ApiOutcome::Failure);

    let updated = todos.requests("UPDATE_TODO%2").unwrap();
    let failed = todos.requests("UPDATE_TODO%3").unwrap();
    assert_eq!(updated.status(), RequestStatus::Success);
    assert_eq!(failed.status(), RequestStatus::Error);
    assert_eq!(failed.error_message().as_deref(), Some("server down"));
    assert_eq!(todos.requests("UPDATE_TODO%4").unwrap().status(), RequestStatus::Unset);
    assert!(!todos.requests(UPDATE_TODO).unwrap().was_requested());

    let state = todos.state().unwrap();
    assert!(state.get(2).unwrap().completed);
    assert!(!state.get(3).unwrap().completed);
}

#[tokio::test]
async fn test_delete_removes_todo_only_on_success() {
    let (todos, http) = loaded().await;
    http.respond_json(Method::Delete, "/todos/1", json!({}));
    http.fail(Method::Delete, "/todos/4", 404, json!({ "message": "not found" }));

    todos.dispatch_api(DELETE_TODO, json!({ "id": 1 })).await.unwrap();
    todos.dispatch_api(DELETE_TODO, json!({ "id": 4 })).await.unwrap();

    let state = todos.state().unwrap();
    assert!(state.get(1).is_none());
    assert!(state.get(4).is_some());
    assert_eq!(state.count(), 4);
    assert!(todos.requests("DELETE_TODO%1").unwrap().is_success());
    assert!(todos.requests("DELETE_TODO%4").unwrap().is_error());
}

#[tokio::test]
async fn test_select_todo_sets_selected_id() {
    let (todos, _http) = loaded().await;

    todos.dispatch(SELECT_TODO, json!({ "id": 3 })).unwrap();

    let selected: Option<i64> = todos.get("selectedTodoId").unwrap();
    assert_eq!(selected, Some(3));
    assert_eq!(todos.state().unwrap().selected().map(|t| t.id), Some(3));
}
