//! # Revux Testing
//!
//! Testing utilities and helpers for Revux modules.
//!
//! This crate provides:
//! - Mock implementations of the environment traits (`FixedClock`,
//!   `MockHttpClient`)
//! - A fluent given/when/then harness for reducers (`ReducerTest`)
//! - Property-based testing strategies
//!
//! ## Example
//!
//! ```
//! use revux_core::environment::HttpClient;
//! use revux_core::http::{ApiRequest, Method};
//! use revux_testing::MockHttpClient;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let http = MockHttpClient::new();
//! http.respond_json(Method::Get, "/todos", json!([{ "id": 1 }]));
//!
//! let response = http.execute(ApiRequest::get("/todos").to_http_request()).await;
//! assert_eq!(response.map(|r| r.data), Ok(json!([{ "id": 1 }])));
//! assert_eq!(http.request_count(), 1);
//! # }
//! ```

use chrono::{DateTime, Utc};
use revux_core::environment::Clock;


/// Mock implementations for testing.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use revux_core::environment::{HttpClient, HttpFuture};
    use revux_core::http::{HttpError, HttpRequest, HttpResponse, Method};
    use serde_json::Value;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
    use tokio::sync::Semaphore;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use revux_testing::mocks::FixedClock;
    /// use revux_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    type Route = (Method, String);
    type Reply = Result<HttpResponse, HttpError>;

    /// Scripted HTTP collaborator
    ///
    /// Replies are registered per method and URL and consumed in order; the
    /// last reply for a route repeats. Unscripted routes answer with a 404
    /// carrying `{"message": "no route"}`. Every request is recorded.
    ///
    /// A route can be held with [`hold`](Self::hold): requests to it are
    /// recorded but do not complete until the returned [`Gate`] releases
    /// them, which lets a test observe the pending state mid-flight.
    #[derive(Debug, Default)]
    pub struct MockHttpClient {
        replies: Mutex<HashMap<Route, VecDeque<Reply>>>,
        gates: Mutex<HashMap<Route, Arc<Semaphore>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl MockHttpClient {
        /// A client with no scripted replies
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue a reply for a route
        pub fn respond(&self, method: Method, url: impl Into<String>, reply: Reply) {
            lock(&self.replies)
                .entry((method, url.into()))
                .or_default()
                .push_back(reply);
        }

        /// Queue a 200 reply with a JSON body
        pub fn respond_json(&self, method: Method, url: impl Into<String>, body: Value) {
            self.respond(method, url, Ok(HttpResponse::ok(body)));
        }

        /// Queue an error reply with a status and JSON body
        pub fn fail(&self, method: Method, url: impl Into<String>, status: u16, body: Value) {
            self.respond(
                method,
                url,
                Err(HttpError::Status {
                    status,
                    body: Some(body),
                }),
            );
        }

        /// Hold requests to a route until released
        pub fn hold(&self, method: Method, url: impl Into<String>) -> Gate {
            let semaphore = Arc::new(Semaphore::new(0));
            lock(&self.gates).insert((method, url.into()), Arc::clone(&semaphore));
            Gate { semaphore }
        }

        /// All requests received so far, in arrival order
        #[must_use]
        pub fn requests(&self) -> Vec<HttpRequest> {
            lock(&self.requests).clone()
        }

        /// Number of requests received so far
        #[must_use]
        pub fn request_count(&self) -> usize {
            lock(&self.requests).len()
        }

        /// Wait until at least `count` requests have arrived
        pub async fn wait_for_requests(&self, count: usize) {
            while self.request_count() < count {
                tokio::task::yield_now().await;
            }
        }

        fn next_reply(&self, route: &Route) -> Reply {
            let mut replies = lock(&self.replies);
            let reply = match replies.get_mut(route) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            };
            reply.unwrap_or_else(|| {
                Err(HttpError::Status {
                    status: 404,
                    body: Some(serde_json::json!({ "message": "no route" })),
                })
            })
        }

        async fn handle(&self, request: HttpRequest) -> Reply {
            let route = (request.method, request.url.clone());
            lock(&self.requests).push(request);

            let gate = lock(&self.gates).get(&route).cloned();
            if let Some(gate) = gate {
                let permit = gate
                    .acquire()
                    .await
                    .map_err(|e| HttpError::Transport(e.to_string()))?;
                permit.forget();
            }

            self.next_reply(&route)
        }
    }

    impl HttpClient for MockHttpClient {
        fn execute(&self, request: HttpRequest) -> HttpFuture<'_> {
            Box::pin(self.handle(request))
        }
    }

    /// Releases requests held by [`MockHttpClient::hold`]
    #[derive(Debug, Clone)]
    pub struct Gate {
        semaphore: Arc<Semaphore>,
    }

    impl Gate {
        /// Let one held request complete
        pub fn release(&self) {
            self.semaphore.add_permits(1);
        }

        /// Fail every held and future request on this route
        pub fn close(&self) {
            self.semaphore.close();
        }
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Property-based testing utilities using proptest.
pub mod properties {
    use proptest::prelude::*;
    use revux_core::RequestKey;
    use serde_json::{Value, json};

    /// Action names as they appear in module definitions
    pub fn action_name() -> impl Strategy<Value = String> {
        "[A-Z][A-Z_]{0,15}"
    }

    /// Request keys, with and without a discriminator
    pub fn request_key() -> impl Strategy<Value = RequestKey> {
        (action_name(), proptest::option::of("[a-z0-9]{1,6}"))
            .prop_map(|(action, discriminator)| RequestKey::new(&action, discriminator.as_deref()))
    }

    /// Small flat JSON object payloads
    pub fn payload() -> impl Strategy<Value = Value> {
        proptest::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..5)
            .prop_map(|fields| json!(fields))
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, Gate, MockHttpClient, test_clock};
pub use reducer_test::ReducerTest;
