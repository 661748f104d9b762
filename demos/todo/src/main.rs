//! Todo example binary
//!
//! Runs the `todos` module against a live JSON API. The base URL comes from
//! `REVUX_API_BASE_URL` and defaults to the public jsonplaceholder service.

use revux_core::StoreHandle;
use revux_runtime::{
    HttpConfig, ModuleEnvironment, ReqwestHttpClient, Store, metrics::register_metrics,
};
use serde_json::json;
use std::sync::Arc;
use todo::{ADD_TODO, DELETE_TODO, GET_TODOS, SELECT_TODO, UPDATE_TODO, todos_module};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "todo=info,revux_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
    register_metrics();

    println!("=== Todo Example ===\n");

    let mut config = HttpConfig::from_env()?;
    if config.base_url.is_none() {
        config = config.with_base_url(DEFAULT_BASE_URL);
    }
    let http = Arc::new(ReqwestHttpClient::new(config)?);

    let todos = todos_module()?;
    let store = Arc::new(Store::builder().module(&todos)?.build());
    todos.bind_store(Arc::clone(&store) as Arc<dyn StoreHandle>, ModuleEnvironment::new(http))?;

    let mut events = store.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            tracing::info!(event = %event.event_type(), "Event");
        }
    });

    // The `_delay` field holds the request back so the pending state is visible
    println!(">>> {GET_TODOS} (delayed 300ms)");
    let load = todos.dispatch_api(GET_TODOS, json!({ "_delay": 300 }));
    let watch = async {
        tokio::task::yield_now().await;
        if let Ok(status) = todos.requests(GET_TODOS) {
            println!("    status while in flight: {:?}", status.status());
        }
    };
    let (outcome, ()) = tokio::join!(load, watch);
    println!("    outcome: {:?}", outcome?);
    print_list(&todos)?;

    println!("\n>>> {ADD_TODO}");
    let outcome = todos
        .dispatch_api(ADD_TODO, json!({ "title": "Write the docs", "completed": false, "userId": 1 }))
        .await?;
    println!("    outcome: {outcome:?}");
    print_list(&todos)?;

    println!("\n>>> {UPDATE_TODO} id=1");
    todos
        .dispatch_api(UPDATE_TODO, json!({ "id": 1, "completed": true }))
        .await?;
    let status = todos.requests(&format!("{UPDATE_TODO}%1"))?;
    println!("    {UPDATE_TODO}%1: {:?}", status.status());
    println!("    {UPDATE_TODO}%2: {:?}", todos.requests(&format!("{UPDATE_TODO}%2"))?.status());

    println!("\n>>> {DELETE_TODO} id=2");
    todos.dispatch_api(DELETE_TODO, json!({ "id": 2 })).await?;
    print_list(&todos)?;

    println!("\n>>> {SELECT_TODO} id=3");
    todos.dispatch(SELECT_TODO, json!({ "id": 3 }))?;
    let selected: Option<i64> = todos.get("selectedTodoId")?;
    println!("    selected: {selected:?}");

    // Unknown routes are recorded as errors, not raised
    println!("\n>>> {UPDATE_TODO} id=99999");
    todos
        .dispatch_api(UPDATE_TODO, json!({ "id": 99_999, "title": "ghost" }))
        .await?;
    let status = todos.requests(&format!("{UPDATE_TODO}%99999"))?;
    println!(
        "    status: {:?}, error: {:?}",
        status.status(),
        status.error_message()
    );

    println!("\nNamespaces in store: {:?}", store.namespaces());
    println!("\n=== Example Complete ===");
    Ok(())
}

fn print_list(todos: &revux_runtime::Module<todo::TodoState>) -> anyhow::Result<()> {
    let state = todos.state()?;
    println!("    {} todos ({} completed)", state.count(), state.completed_count());
    for todo in state.list.values() {
        let status = if todo.completed { "x" } else { " " };
        println!("    [{status}] #{} {}", todo.id, todo.title);
    }
    Ok(())
}
