//! Bound modules: the dispatcher and the getter facade.
//!
//! A [`Module`] wraps a validated [`ModuleDefinition`]. It is registered with
//! a [`Store`](crate::store::Store) (which takes its initial slice and its
//! reducer) and then bound to that store exactly once with
//! [`Module::bind_store`], which also injects the [`ModuleEnvironment`].
//! From then on the module can dispatch actions, commit mutations, run API
//! actions and evaluate getters.

use crate::metrics::RequestMetrics;
use revux_core::environment::{Clock, HttpClient, SystemClock};
use revux_core::module::{ActionContext, ModuleDefinition, RequestContext};
use revux_core::{Event, ModuleError, ModuleState, RequestKey, RequestStatusView, StoreHandle};
use serde_json::{Value, json};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

/// Payload field that delays an API request by the given milliseconds
///
/// The field is removed before the payload reaches the request builder; the
/// success mutation still sees the payload as dispatched.
pub const DELAY_FIELD: &str = "_delay";

/// Dependencies injected when a module is bound
#[derive(Clone)]
pub struct ModuleEnvironment {
    http: Arc<dyn HttpClient>,
    clock: Arc<dyn Clock>,
}

impl ModuleEnvironment {
    /// An environment using `http` and the system clock
    #[must_use]
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different clock
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The HTTP collaborator
    #[must_use]
    pub const fn http(&self) -> &Arc<dyn HttpClient> {
        &self.http
    }

    /// The clock
    #[must_use]
    pub const fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}

impl fmt::Debug for ModuleEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleEnvironment")
            .field("now", &self.clock.now())
            .finish_non_exhaustive()
    }
}

/// Result of an API action
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome {
    /// The request succeeded
    Success,
    /// The request succeeded and the action returns the response body
    Response(Value),
    /// The request failed; the error is in the request record
    Failure,
}

impl ApiOutcome {
    /// Whether the request succeeded
    #[must_use]
    pub const fn is_success(&self) -> bool {
        !matches!(self, Self::Failure)
    }

    /// The returned response body, if any
    #[must_use]
    pub const fn response(&self) -> Option<&Value> {
        match self {
            Self::Response(body) => Some(body),
            Self::Success | Self::Failure => None,
        }
    }

    /// Consume the outcome, returning the response body, if any
    #[must_use]
    pub fn into_response(self) -> Option<Value> {
        match self {
            Self::Response(body) => Some(body),
            Self::Success | Self::Failure => None,
        }
    }
}

struct Binding {
    store: Arc<dyn StoreHandle>,
    env: ModuleEnvironment,
}

/// A module definition plus its store binding
///
/// # Example
///
/// ```
/// use revux_core::module::ModuleDefinition;
/// use revux_runtime::module::{Module, ModuleEnvironment};
/// use revux_runtime::store::Store;
/// use revux_runtime::http::ReqwestHttpClient;
/// use revux_runtime::config::HttpConfig;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// #[derive(Clone, Default)]
/// struct Session {
///     user: Option<String>,
/// }
///
/// let session = Module::new(
///     ModuleDefinition::builder("session")
///         .state(Session::default())
///         .getter("user", |state: &Session| state.user.clone())
///         .action("login", |ctx, payload| ctx.commit("SET_USER", payload))
///         .mutation("SET_USER", |draft, payload| {
///             draft.user = payload.as_str().map(ToString::to_string);
///         })
///         .build()?,
/// );
///
/// let store = Arc::new(Store::builder().module(&session)?.build());
/// let http = Arc::new(ReqwestHttpClient::new(HttpConfig::default())?);
/// session.bind_store(store, ModuleEnvironment::new(http))?;
///
/// session.dispatch("login", json!("ada"))?;
/// assert_eq!(session.get::<Option<String>>("user")?, Some("ada".to_string()));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Module<D> {
    definition: Arc<ModuleDefinition<D>>,
    binding: OnceLock<Binding>,
}

impl<D> Module<D>
where
    D: Clone + Send + Sync + 'static,
{
    /// Wrap a definition; the module is unbound until [`bind_store`](Self::bind_store)
    #[must_use]
    pub fn new(definition: ModuleDefinition<D>) -> Self {
        Self {
            definition: Arc::new(definition),
            binding: OnceLock::new(),
        }
    }

    /// The module's namespace
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.definition.namespace()
    }

    /// The underlying definition
    #[must_use]
    pub const fn definition(&self) -> &Arc<ModuleDefinition<D>> {
        &self.definition
    }

    /// Whether the module has been bound to a store
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.binding.get().is_some()
    }

    /// Attach the module to the store that holds its slice
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::AlreadyBound`] on a second call,
    /// [`ModuleError::NotRegistered`] if the store has no slice for this
    /// namespace, or [`ModuleError::SliceType`] if the slice has another type.
    pub fn bind_store(
        &self,
        store: Arc<dyn StoreHandle>,
        env: ModuleEnvironment,
    ) -> Result<(), ModuleError> {
        if self.is_bound() {
            return Err(ModuleError::AlreadyBound(self.namespace().to_string()));
        }
        self.definition.slice_of(&store.get_state())?;

        self.binding
            .set(Binding { store, env })
            .map_err(|_| ModuleError::AlreadyBound(self.namespace().to_string()))?;

        tracing::debug!(namespace = self.namespace(), "Module bound to store");
        Ok(())
    }

    /// Current slice (domain state plus request records)
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::NotBound`] before binding.
    pub fn slice(&self) -> Result<Arc<ModuleState<D>>, ModuleError> {
        let binding = self.binding()?;
        self.definition.slice_of(&binding.store.get_state())
    }

    /// Current domain state
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::NotBound`] before binding.
    pub fn state(&self) -> Result<Arc<D>, ModuleError> {
        Ok(Arc::clone(self.slice()?.state()))
    }

    /// Evaluate a getter on the current state
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::NotBound`] before binding,
    /// [`ModuleError::UnknownGetter`] for an unregistered name and
    /// [`ModuleError::GetterType`] if the getter does not produce a `T`.
    pub fn get<T: 'static>(&self, name: &str) -> Result<T, ModuleError> {
        let state = self.state()?;
        self.definition.evaluate(name, &state)
    }

    /// Status of a tracked request (`ACTION` or `ACTION%discriminator`)
    ///
    /// Unknown keys read as never requested.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::NotBound`] before binding.
    pub fn requests(&self, key: &str) -> Result<RequestStatusView, ModuleError> {
        let slice = self.slice()?;
        Ok(RequestStatusView::from_record(slice.request(key)))
    }

    /// Run a sync action
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::NotBound`] before binding,
    /// [`ModuleError::UnknownAction`] for an unregistered name, or the
    /// handler's own error (for example [`ModuleError::UnknownMutation`]).
    #[tracing::instrument(skip(self, payload), fields(namespace = %self.namespace()))]
    pub fn dispatch(&self, action: &str, payload: Value) -> Result<(), ModuleError> {
        let binding = self.binding()?;
        self.definition
            .run_action(action, binding.store.as_ref(), payload)
    }

    /// Commit a mutation directly
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::NotBound`] before binding or
    /// [`ModuleError::UnknownMutation`] for an unregistered name.
    pub fn commit(&self, mutation: &str, payload: Value) -> Result<(), ModuleError> {
        let binding = self.binding()?;
        ActionContext::new(&self.definition, binding.store.as_ref()).commit(mutation, payload)
    }

    /// Run an API action and track its request lifecycle
    ///
    /// The request record under the action's key becomes pending before the
    /// HTTP call starts and success or error once it finishes. Transport
    /// failures are recorded and reported as [`ApiOutcome::Failure`], never
    /// as `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::NotBound`] before binding and
    /// [`ModuleError::UnknownAction`] or [`ModuleError::WrongActionKind`] for
    /// a bad name.
    #[tracing::instrument(skip(self, payload), fields(namespace = %self.namespace()))]
    pub async fn dispatch_api(&self, action: &str, payload: Value) -> Result<ApiOutcome, ModuleError> {
        let binding = self.binding()?;
        let api = self.definition.api_action(action)?;
        let namespace = self.namespace();
        let store = &binding.store;
        let clock = &binding.env.clock;

        let (request_payload, delay) = split_delay(payload.clone());
        let request = {
            let slice = self.definition.slice_of(&store.get_state())?;
            api.build_request(&RequestContext::new(&slice), &request_payload)
        };
        let key = RequestKey::new(action, request.key_by.as_deref());

        store.dispatch(Event::request_initiated(namespace, key.clone(), clock.now()));
        RequestMetrics::record_initiated(namespace, action);

        if let Some(delay) = delay {
            tracing::trace!(?delay, "Delaying request");
            tokio::time::sleep(delay).await;
        }

        let started = Instant::now();
        let result = binding.env.http.execute(request.to_http_request()).await;
        RequestMetrics::record_completed(namespace, action, result.is_ok(), started.elapsed());

        match result {
            Ok(response) => {
                let body = response.data;
                store.dispatch(Event::api_succeeded(
                    namespace,
                    action,
                    payload,
                    request,
                    body.clone(),
                ));
                store.dispatch(Event::request_succeeded(namespace, key.clone(), clock.now()));
                tracing::debug!(%key, status = response.status, "Request succeeded");

                if let Some(hook) = api.on_success(body.clone()) {
                    hook.await;
                }

                Ok(if api.returns_response() {
                    ApiOutcome::Response(body)
                } else {
                    ApiOutcome::Success
                })
            },
            Err(err) => {
                tracing::warn!(%key, error = %err, "Request failed");
                let error = err
                    .into_body()
                    .unwrap_or_else(|| json!({ "message": "unknown error" }));
                store.dispatch(Event::request_failed(
                    namespace,
                    key,
                    clock.now(),
                    error.clone(),
                ));

                if let Some(hook) = api.on_failure(error) {
                    hook.await;
                }

                Ok(ApiOutcome::Failure)
            },
        }
    }

    fn binding(&self) -> Result<&Binding, ModuleError> {
        self.binding
            .get()
            .ok_or_else(|| ModuleError::NotBound(self.namespace().to_string()))
    }
}

impl<D> From<ModuleDefinition<D>> for Module<D>
where
    D: Clone + Send + Sync + 'static,
{
    fn from(definition: ModuleDefinition<D>) -> Self {
        Self::new(definition)
    }
}

impl<D> fmt::Debug for Module<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("definition", &self.definition)
            .field("bound", &self.binding.get().is_some())
            .finish()
    }
}

/// Remove the delay field from an object payload
fn split_delay(payload: Value) -> (Value, Option<Duration>) {
    match payload {
        Value::Object(mut fields) => {
            let delay = fields
                .remove(DELAY_FIELD)
                .and_then(|value| value.as_u64())
                .map(Duration::from_millis);
            (Value::Object(fields), delay)
        },
        other => (other, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;
    use revux_core::http::{ApiRequest, HttpError, HttpResponse};
    use revux_core::module::ApiAction;
    use revux_testing::mocks::{MockHttpClient, test_clock};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Debug, Default)]
    struct Echo {
        last: Option<Value>,
    }

    fn echo_module(hits: Arc<AtomicUsize>) -> Result<Module<Echo>, Box<dyn std::error::Error>> {
        let failures = Arc::clone(&hits);
        let definition = ModuleDefinition::builder("echo")
            .state(Echo::default())
            .api_action(
                "SEND",
                ApiAction::<Echo>::new(
                    |_ctx, payload| ApiRequest::post("/echo").with_params(payload.clone()),
                    |draft, result| draft.last = Some(result.response.clone()),
                )
                .returning_response()
                .after_success(move |_body| {
                    let hits = Arc::clone(&hits);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                    }
                })
                .after_failure(move |_error| {
                    let failures = Arc::clone(&failures);
                    async move {
                        failures.fetch_add(10, Ordering::SeqCst);
                    }
                }),
            )
            .build()?;
        Ok(Module::new(definition))
    }

    fn bind(module: &Module<Echo>, http: Arc<MockHttpClient>) -> Result<Arc<Store>, Box<dyn std::error::Error>> {
        let store = Arc::new(Store::builder().module(module)?.build());
        let env = ModuleEnvironment::new(http).with_clock(Arc::new(test_clock()));
        module.bind_store(Arc::clone(&store) as Arc<dyn StoreHandle>, env)?;
        Ok(store)
    }

    #[test]
    fn test_split_delay_strips_field() {
        let (payload, delay) = split_delay(json!({ "id": 1, "_delay": 25 }));
        assert_eq!(payload, json!({ "id": 1 }));
        assert_eq!(delay, Some(Duration::from_millis(25)));

        let (payload, delay) = split_delay(json!([1, 2]));
        assert_eq!(payload, json!([1, 2]));
        assert_eq!(delay, None);
    }

    #[test]
    fn test_operations_before_binding_fail() -> Result<(), Box<dyn std::error::Error>> {
        let module = echo_module(Arc::new(AtomicUsize::new(0)))?;
        assert!(matches!(module.state(), Err(ModuleError::NotBound(ns)) if ns == "echo"));
        assert!(matches!(module.requests("SEND"), Err(ModuleError::NotBound(_))));
        assert!(matches!(module.commit("X", Value::Null), Err(ModuleError::NotBound(_))));
        Ok(())
    }

    #[test]
    fn test_bind_twice_fails() -> Result<(), Box<dyn std::error::Error>> {
        let module = echo_module(Arc::new(AtomicUsize::new(0)))?;
        let http = Arc::new(MockHttpClient::new());
        let store = bind(&module, Arc::clone(&http))?;

        let again = module.bind_store(store, ModuleEnvironment::new(http));
        assert!(matches!(again, Err(ModuleError::AlreadyBound(_))));
        Ok(())
    }

    #[test]
    fn test_bind_to_store_without_slice_fails() -> Result<(), Box<dyn std::error::Error>> {
        let module = echo_module(Arc::new(AtomicUsize::new(0)))?;
        let store = Arc::new(Store::builder().build());
        let result = module.bind_store(store, ModuleEnvironment::new(Arc::new(MockHttpClient::new())));
        assert!(matches!(result, Err(ModuleError::NotRegistered(_))));
        assert!(!module.is_bound());
        Ok(())
    }

    #[tokio::test]
    async fn test_success_returns_response_and_runs_hook() -> Result<(), Box<dyn std::error::Error>> {
        let hits = Arc::new(AtomicUsize::new(0));
        let module = echo_module(Arc::clone(&hits))?;
        let http = Arc::new(MockHttpClient::new());
        http.respond(
            revux_core::http::Method::Post,
            "/echo",
            Ok(HttpResponse::ok(json!({ "ok": true }))),
        );
        bind(&module, Arc::clone(&http))?;

        let outcome = module
            .dispatch_api("SEND", json!({ "text": "hi", "_delay": 1 }))
            .await?;

        assert_eq!(outcome, ApiOutcome::Response(json!({ "ok": true })));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(module.state()?.last, Some(json!({ "ok": true })));
        assert!(module.requests("SEND")?.is_success());

        let sent = http.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, Some(json!({ "text": "hi" })));
        Ok(())
    }

    #[tokio::test]
    async fn test_success_mutation_sees_dispatched_payload() -> Result<(), Box<dyn std::error::Error>> {
        let module = Module::new(
            ModuleDefinition::builder("echo")
                .state(Echo::default())
                .api_action(
                    "SEND",
                    ApiAction::<Echo>::new(
                        |_ctx, payload| ApiRequest::post("/echo").with_params(payload.clone()),
                        |draft, result| draft.last = Some(result.payload.clone()),
                    ),
                )
                .build()?,
        );
        let http = Arc::new(MockHttpClient::new());
        http.respond_json(revux_core::http::Method::Post, "/echo", json!({}));
        bind(&module, Arc::clone(&http))?;

        module.dispatch_api("SEND", json!({ "id": 1, "_delay": 1 })).await?;

        assert_eq!(module.state()?.last, Some(json!({ "id": 1, "_delay": 1 })));
        assert_eq!(http.requests()[0].body, Some(json!({ "id": 1 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_without_body_records_unknown_error() -> Result<(), Box<dyn std::error::Error>> {
        let hits = Arc::new(AtomicUsize::new(0));
        let module = echo_module(Arc::clone(&hits))?;
        let http = Arc::new(MockHttpClient::new());
        http.respond(
            revux_core::http::Method::Post,
            "/echo",
            Err(HttpError::Transport("connection refused".to_string())),
        );
        bind(&module, http)?;

        let outcome = module.dispatch_api("SEND", json!({})).await?;

        assert_eq!(outcome, ApiOutcome::Failure);
        assert!(!outcome.is_success());
        assert_eq!(hits.load(Ordering::SeqCst), 10);

        let status = module.requests("SEND")?;
        assert!(status.is_error());
        assert_eq!(status.error_message().as_deref(), Some("unknown error"));
        assert!(module.state()?.last.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_dispatch_api_rejects_unknown_action() -> Result<(), Box<dyn std::error::Error>> {
        let module = echo_module(Arc::new(AtomicUsize::new(0)))?;
        bind(&module, Arc::new(MockHttpClient::new()))?;

        let result = module.dispatch_api("NOPE", Value::Null).await;
        assert!(matches!(result, Err(ModuleError::UnknownAction { .. })));
        Ok(())
    }

    #[test]
    fn test_api_outcome_accessors() {
        assert!(ApiOutcome::Success.is_success());
        assert_eq!(ApiOutcome::Success.response(), None);
        assert_eq!(
            ApiOutcome::Response(json!(1)).into_response(),
            Some(json!(1))
        );
    }
}
