//! Request lifecycle tracking.
//!
//! Every API action invocation is tracked under a [`RequestKey`]. The key is
//! the action name, or `action%discriminator` when the action tracks separate
//! requests per entity (updating todo 3 and todo 7 at the same time).
//!
//! A key moves `Unset → Pending → Success | Error`. Invoking the same key
//! again always re-enters `Pending`, whatever the previous outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of one trackable request
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestKey(String);

impl RequestKey {
    /// Separator between the action name and the discriminator
    pub const SEPARATOR: char = '%';

    /// Build the key for `action`, optionally scoped by a discriminator
    #[must_use]
    pub fn new(action: &str, discriminator: Option<&str>) -> Self {
        match discriminator {
            Some(discriminator) => Self(format!("{action}{}{discriminator}", Self::SEPARATOR)),
            None => Self(action.to_string()),
        }
    }

    /// The action part of the key
    #[must_use]
    pub fn action(&self) -> &str {
        self.0
            .split_once(Self::SEPARATOR)
            .map_or(self.0.as_str(), |(action, _)| action)
    }

    /// The discriminator part of the key, if any
    #[must_use]
    pub fn discriminator(&self) -> Option<&str> {
        self.0
            .split_once(Self::SEPARATOR)
            .map(|(_, discriminator)| discriminator)
    }

    /// The key as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for RequestKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RequestKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for RequestKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Lifecycle status of a request key
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    /// Never requested
    #[default]
    Unset,
    /// Request in flight
    Pending,
    /// Completed successfully
    Success,
    /// Completed with an error
    Error,
}

/// The stored lifecycle record for one request key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
    /// Current status
    pub status: RequestStatus,
    /// When the latest invocation started
    pub requested_at: DateTime<Utc>,
    /// When the latest invocation finished
    pub completed_at: Option<DateTime<Utc>>,
    /// Opaque error payload of a failed invocation
    pub error: Option<Value>,
}

impl RequestRecord {
    /// A fresh record for an invocation that just started
    #[must_use]
    pub const fn pending(requested_at: DateTime<Utc>) -> Self {
        Self {
            status: RequestStatus::Pending,
            requested_at,
            completed_at: None,
            error: None,
        }
    }

    /// Mark the invocation as succeeded
    pub fn succeed(&mut self, completed_at: DateTime<Utc>) {
        self.status = RequestStatus::Success;
        self.completed_at = Some(completed_at);
        self.error = None;
    }

    /// Mark the invocation as failed with an error payload
    pub fn fail(&mut self, completed_at: DateTime<Utc>, error: Value) {
        self.status = RequestStatus::Error;
        self.completed_at = Some(completed_at);
        self.error = Some(error);
    }
}

/// All request records of a module, by key
pub type RequestMap = BTreeMap<RequestKey, RequestRecord>;

/// Read-only projection of a request record
///
/// Built from an optional record; an unknown key yields the empty view, so
/// lookups never fail.
///
/// # Example
///
/// ```
/// use revux_core::request::RequestStatusView;
///
/// let view = RequestStatusView::from_record(None);
/// assert!(view.is_empty());
/// assert!(view.is_pending_or_empty());
/// assert!(!view.was_requested());
/// assert_eq!(view.error_message(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestStatusView {
    status: RequestStatus,
    requested_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    error: Option<Value>,
}

impl RequestStatusView {
    /// Project a record (or its absence) into a view
    #[must_use]
    pub fn from_record(record: Option<&RequestRecord>) -> Self {
        record.map_or_else(Self::default, |record| Self {
            status: record.status,
            requested_at: Some(record.requested_at),
            completed_at: record.completed_at,
            error: record.error.clone(),
        })
    }

    /// Raw status
    #[must_use]
    pub const fn status(&self) -> RequestStatus {
        self.status
    }

    /// When the latest invocation started
    #[must_use]
    pub const fn requested_at(&self) -> Option<DateTime<Utc>> {
        self.requested_at
    }

    /// When the latest invocation finished
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// The request has been made at least once
    #[must_use]
    pub const fn was_requested(&self) -> bool {
        self.requested_at.is_some()
    }

    /// The request is in flight
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, RequestStatus::Pending)
    }

    /// In flight, or never made (nothing worth rendering yet)
    #[must_use]
    pub const fn is_pending_or_empty(&self) -> bool {
        self.is_empty() || self.is_pending()
    }

    /// The request has never been made
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.requested_at.is_none()
    }

    /// The latest invocation failed
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.status, RequestStatus::Error)
    }

    /// The latest invocation succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, RequestStatus::Success)
    }

    /// The opaque error payload
    #[must_use]
    pub const fn error(&self) -> Option<&Value> {
        self.error.as_ref()
    }

    /// First line of the error's `message`
    ///
    /// `None` when there is no error; an empty string when the payload has no
    /// recognizable message.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let error = self.error.as_ref()?;
        let message = match error {
            Value::String(message) => Some(message.as_str()),
            other => other.get("message").and_then(Value::as_str),
        };
        Some(
            message
                .and_then(|message| message.lines().next())
                .unwrap_or_default()
                .to_string(),
        )
    }

    /// Structured sub-errors from `error.details.messages`, if present
    #[must_use]
    pub fn error_messages(&self) -> &[Value] {
        self.error
            .as_ref()
            .and_then(|error| error.pointer("/details/messages"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, second)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn test_request_key_plain() {
        let key = RequestKey::new("GET_TODOS", None);
        assert_eq!(key.as_str(), "GET_TODOS");
        assert_eq!(key.action(), "GET_TODOS");
        assert_eq!(key.discriminator(), None);
    }

    #[test]
    fn test_request_key_with_discriminator() {
        let key = RequestKey::new("UPDATE_TODO", Some("7"));
        assert_eq!(key.to_string(), "UPDATE_TODO%7");
        assert_eq!(key.action(), "UPDATE_TODO");
        assert_eq!(key.discriminator(), Some("7"));
    }

    #[test]
    fn test_map_lookup_by_str() {
        let mut map = RequestMap::new();
        map.insert(RequestKey::new("A", Some("1")), RequestRecord::pending(at(0)));
        assert!(map.contains_key("A%1"));
        assert!(!map.contains_key("A"));
    }

    #[test]
    fn test_record_transitions() {
        let mut record = RequestRecord::pending(at(0));
        assert_eq!(record.status, RequestStatus::Pending);

        record.fail(at(1), json!({ "message": "boom" }));
        assert_eq!(record.status, RequestStatus::Error);
        assert_eq!(record.completed_at, Some(at(1)));

        record.succeed(at(2));
        assert_eq!(record.status, RequestStatus::Success);
        assert_eq!(record.error, None);
    }

    #[test]
    fn test_pending_view() {
        let record = RequestRecord::pending(at(0));
        let view = RequestStatusView::from_record(Some(&record));
        assert!(view.was_requested());
        assert!(view.is_pending());
        assert!(view.is_pending_or_empty());
        assert!(!view.is_empty());
        assert!(!view.is_success());
        assert!(!view.is_error());
    }

    #[test]
    fn test_error_view_extracts_messages() {
        let mut record = RequestRecord::pending(at(0));
        record.fail(
            at(1),
            json!({
                "message": "Validation failed\nsee details",
                "details": { "messages": [{ "field": "title" }, "too short"] }
            }),
        );
        let view = RequestStatusView::from_record(Some(&record));

        assert!(view.is_error());
        assert!(!view.is_pending_or_empty());
        assert_eq!(view.error_message().as_deref(), Some("Validation failed"));
        assert_eq!(view.error_messages().len(), 2);
        assert_eq!(view.error_messages()[1], json!("too short"));
    }

    #[test]
    fn test_error_without_message_degrades_to_blank() {
        let mut record = RequestRecord::pending(at(0));
        record.fail(at(1), json!({ "code": 500 }));
        let view = RequestStatusView::from_record(Some(&record));

        assert_eq!(view.error_message().as_deref(), Some(""));
        assert!(view.error_messages().is_empty());
    }

    #[test]
    fn test_record_serializes_like_a_status_map() -> Result<(), serde_json::Error> {
        let record = RequestRecord::pending(at(0));
        let value = serde_json::to_value(&record)?;
        assert_eq!(value["status"], json!("PENDING"));
        assert!(value.get("requestedAt").is_some());
        Ok(())
    }
}
