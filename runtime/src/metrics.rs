//! Metric names and descriptions.
//!
//! The runtime records through the [`metrics`] facade only; installing an
//! exporter (Prometheus or otherwise) is left to the application. Call
//! [`register_metrics`] once after installing a recorder so the exporter
//! knows the descriptions.
//!
//! | Name | Kind | Labels |
//! |------|------|--------|
//! | `revux.events.dispatched` | counter | `namespace` |
//! | `revux.requests.initiated` | counter | `namespace`, `action` |
//! | `revux.requests.succeeded` | counter | `namespace`, `action` |
//! | `revux.requests.failed` | counter | `namespace`, `action` |
//! | `revux.requests.duration_seconds` | histogram | `namespace`, `action` |

use metrics::{Unit, describe_counter, describe_histogram};
use std::time::Duration;

// Re-export metrics macros for use in other modules
pub use metrics::{counter, histogram};

/// Events folded into a store
pub const EVENTS_DISPATCHED: &str = "revux.events.dispatched";
/// API requests started
pub const REQUESTS_INITIATED: &str = "revux.requests.initiated";
/// API requests that succeeded
pub const REQUESTS_SUCCEEDED: &str = "revux.requests.succeeded";
/// API requests that failed
pub const REQUESTS_FAILED: &str = "revux.requests.failed";
/// Time spent waiting on the HTTP collaborator
pub const REQUEST_DURATION: &str = "revux.requests.duration_seconds";

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        EVENTS_DISPATCHED,
        Unit::Count,
        "Total number of events folded into a store"
    );
    describe_counter!(
        REQUESTS_INITIATED,
        Unit::Count,
        "Total number of API requests started"
    );
    describe_counter!(
        REQUESTS_SUCCEEDED,
        Unit::Count,
        "Total number of API requests that succeeded"
    );
    describe_counter!(
        REQUESTS_FAILED,
        Unit::Count,
        "Total number of API requests that failed"
    );
    describe_histogram!(
        REQUEST_DURATION,
        Unit::Seconds,
        "Time taken by the HTTP collaborator"
    );
}

/// Request lifecycle metrics recorder.
pub struct RequestMetrics;

impl RequestMetrics {
    /// Record a request start.
    pub fn record_initiated(namespace: &str, action: &str) {
        counter!(REQUESTS_INITIATED, "namespace" => namespace.to_string(), "action" => action.to_string())
            .increment(1);
    }

    /// Record a finished request.
    pub fn record_completed(namespace: &str, action: &str, success: bool, duration: Duration) {
        let name = if success {
            REQUESTS_SUCCEEDED
        } else {
            REQUESTS_FAILED
        };
        counter!(name, "namespace" => namespace.to_string(), "action" => action.to_string())
            .increment(1);
        histogram!(REQUEST_DURATION, "namespace" => namespace.to_string(), "action" => action.to_string())
            .record(duration.as_secs_f64());
    }
}

/// Store metrics recorder.
pub struct StoreMetrics;

impl StoreMetrics {
    /// Record an event dispatch.
    pub fn record_dispatch(namespace: &str) {
        counter!(EVENTS_DISPATCHED, "namespace" => namespace.to_string()).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        register_metrics();
        StoreMetrics::record_dispatch("todos");
        RequestMetrics::record_initiated("todos", "GET_TODOS");
        RequestMetrics::record_completed("todos", "GET_TODOS", true, Duration::from_millis(5));
        RequestMetrics::record_completed("todos", "GET_TODOS", false, Duration::ZERO);
    }
}
