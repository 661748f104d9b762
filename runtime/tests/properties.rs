//! Property tests for the store's request bookkeeping
//!
//! Random lifecycle event sequences are folded through a real `Store` and
//! compared with a simple model of what each request record should hold.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use proptest::prelude::*;
use revux_core::environment::Clock;
use revux_core::module::ModuleDefinition;
use revux_core::{Event, RequestStatus, StateTree, StoreHandle};
use revux_runtime::Store;
use revux_testing::properties::{payload, request_key};
use revux_testing::test_clock;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
struct Empty;

#[derive(Debug, Clone, Default)]
struct Bag {
    last: Option<serde_json::Value>,
}

fn store() -> Store {
    let tracked = ModuleDefinition::builder("tracked")
        .state(Empty)
        .build()
        .expect("tracked module is valid");
    let other = ModuleDefinition::builder("other")
        .state(Bag::default())
        .mutation("PUT", |draft, payload| draft.last = Some(payload.clone()))
        .build()
        .expect("other module is valid");

    Store::builder()
        .definition(Arc::new(tracked))
        .unwrap()
        .definition(Arc::new(other))
        .unwrap()
        .build()
}

fn status(tree: &StateTree, key: &str) -> RequestStatus {
    tree.slice::<Empty>("tracked")
        .and_then(|slice| slice.request(key).map(|record| record.status))
        .unwrap_or_default()
}

proptest! {
    #[test]
    fn prop_records_follow_the_last_lifecycle_event(
        keys in proptest::collection::vec(request_key(), 1..4),
        ops in proptest::collection::vec((0usize..4, 0u8..3), 0..24),
    ) {
        let subscriber = tracing_subscriber::fmt().with_test_writer().finish();
        tracing::subscriber::with_default(subscriber, || {
            let store = store();
            let at = test_clock().now();
            let mut model: HashMap<String, RequestStatus> = HashMap::new();

            for (index, op) in &ops {
                let key = keys[index % keys.len()].clone();
                let name = key.as_str().to_string();
                let event = match op {
                    0 => {
                        model.insert(name, RequestStatus::Pending);
                        Event::request_initiated("tracked", key, at)
                    },
                    1 => {
                        if let Some(status) = model.get_mut(&name) {
                            *status = RequestStatus::Success;
                        }
                        Event::request_succeeded("tracked", key, at)
                    },
                    _ => {
                        if let Some(status) = model.get_mut(&name) {
                            *status = RequestStatus::Error;
                        }
                        Event::request_failed("tracked", key, at, json!({ "message": "boom" }))
                    },
                };
                store.dispatch(event);
            }

            let tree = store.get_state();
            for key in &keys {
                let expected = model.get(key.as_str()).copied().unwrap_or_default();
                prop_assert_eq!(status(&tree, key.as_str()), expected);
            }
            Ok(())
        })?;
    }

    #[test]
    fn prop_mutations_leave_other_slices_shared(
        payloads in proptest::collection::vec(payload(), 1..8),
    ) {
        let store = store();
        let before = store.get_state();

        for body in &payloads {
            store.dispatch(Event::mutation("other", "PUT", body.clone()));
        }

        let after = store.get_state();
        let tracked_before = before.raw_slice("tracked").unwrap();
        let tracked_after = after.raw_slice("tracked").unwrap();
        prop_assert!(Arc::ptr_eq(tracked_before, tracked_after));

        let last = after.slice::<Bag>("other").and_then(|slice| slice.state().last.clone());
        prop_assert_eq!(last, payloads.last().cloned());
    }
}
