//! Module definitions.
//!
//! A [`ModuleDefinition`] is the static description of one namespaced module:
//! its initial state, getters, sync actions, mutations and API actions. It is
//! assembled with [`ModuleDefinition::builder`] and validated once by
//! [`ModuleDefinitionBuilder::build`]; afterwards it never changes.
//!
//! The definition is also the module's reducer: it implements [`Reducer`]
//! over the store's [`StateTree`], handling the request lifecycle events for
//! its namespace and routing every other event to the registered mutation.
//!
//! # Example
//!
//! ```
//! use revux_core::http::ApiRequest;
//! use revux_core::module::{ApiAction, ModuleDefinition};
//! use serde_json::json;
//! use std::collections::BTreeMap;
//! use std::sync::Arc;
//!
//! #[derive(Clone, Default)]
//! struct Users {
//!     by_id: Arc<BTreeMap<i64, String>>,
//!     selected: Option<i64>,
//! }
//!
//! let users = ModuleDefinition::builder("users")
//!     .state(Users::default())
//!     .getter("names", |state: &Users| state.by_id.values().cloned().collect::<Vec<_>>())
//!     .api_action(
//!         "FETCH_USER",
//!         ApiAction::<Users>::new(
//!             |_ctx, payload| {
//!                 let id = payload["id"].as_i64().unwrap_or_default();
//!                 ApiRequest::get(format!("/users/{id}")).key_by(id)
//!             },
//!             |draft, result| {
//!                 if let (Some(id), Some(name)) = (result.response["id"].as_i64(), result.response["name"].as_str()) {
//!                     Arc::make_mut(&mut draft.by_id).insert(id, name.to_string());
//!                 }
//!             },
//!         ),
//!     )
//!     .action("select", |ctx, payload| ctx.commit("SET_SELECTED", payload))
//!     .mutation("SET_SELECTED", |draft, payload| draft.selected = payload.as_i64())
//!     .build();
//!
//! assert!(users.is_ok());
//! ```

use crate::draft::{Draft, produce};
use crate::error::{DefinitionError, ModuleError, NameFamily};
use crate::event::{Event, EventKind};
use crate::http::ApiRequest;
use crate::reducer::Reducer;
use crate::request::{RequestRecord, RequestStatusView};
use crate::state::{ModuleState, StateTree};
use crate::store::StoreHandle;
use serde_json::Value;
use std::any::{Any, type_name};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Future returned by an after-success or after-failure hook
pub type HookFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

type Hook = Box<dyn Fn(Value) -> HookFuture + Send + Sync>;
type RequestBuilderFn<D> = Box<dyn Fn(&RequestContext<'_, D>, &Value) -> ApiRequest + Send + Sync>;
type SuccessMutationFn<D> = Box<dyn Fn(&mut Draft<'_, D>, &ApiResult<'_>) + Send + Sync>;
type MutationFn<D> = Box<dyn Fn(&mut Draft<'_, D>, &Value) + Send + Sync>;
type ActionFn<D> =
    Box<dyn Fn(&ActionContext<'_, D>, Value) -> Result<(), ModuleError> + Send + Sync>;
type GetterFn<D> = Box<dyn Fn(&D) -> Box<dyn Any + Send> + Send + Sync>;
type InitialStateFn<D> = Box<dyn Fn() -> D + Send + Sync>;

/// What a request builder sees
pub struct RequestContext<'a, D> {
    slice: &'a ModuleState<D>,
}

impl<'a, D> RequestContext<'a, D> {
    /// Context over a module slice
    #[must_use]
    pub const fn new(slice: &'a ModuleState<D>) -> Self {
        Self { slice }
    }

    /// Current domain state
    #[must_use]
    pub fn state(&self) -> &D {
        self.slice.state()
    }

    /// Status of another request of this module
    #[must_use]
    pub fn request_status(&self, key: &str) -> RequestStatusView {
        RequestStatusView::from_record(self.slice.request(key))
    }
}

/// What an API action's success mutation receives
#[derive(Debug, Clone, Copy)]
pub struct ApiResult<'a> {
    /// Payload the action was dispatched with
    pub payload: &'a Value,
    /// The request that was made
    pub request: &'a ApiRequest,
    /// Decoded response body
    pub response: &'a Value,
}

/// What a sync action handler sees
pub struct ActionContext<'a, D> {
    definition: &'a ModuleDefinition<D>,
    store: &'a dyn StoreHandle,
}

impl<'a, D> ActionContext<'a, D>
where
    D: Clone + Send + Sync + 'static,
{
    /// Context for running one of `definition`'s actions against `store`
    #[must_use]
    pub const fn new(definition: &'a ModuleDefinition<D>, store: &'a dyn StoreHandle) -> Self {
        Self { definition, store }
    }

    /// Namespace of the module the action belongs to
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.definition.namespace()
    }

    /// Current domain state, including earlier commits of this action
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::NotRegistered`] or [`ModuleError::SliceType`]
    /// if the store does not hold this module's slice.
    pub fn state(&self) -> Result<Arc<D>, ModuleError> {
        let slice = self.definition.slice_of(&self.store.get_state())?;
        Ok(Arc::clone(slice.state()))
    }

    /// Commit a mutation: one event folded into the store
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::UnknownMutation`] if no mutation with this name
    /// is registered.
    pub fn commit(&self, mutation: &str, payload: Value) -> Result<(), ModuleError> {
        if !self.definition.has_mutation(mutation) {
            return Err(ModuleError::UnknownMutation {
                namespace: self.namespace().to_string(),
                name: mutation.to_string(),
            });
        }
        self.store
            .dispatch(Event::mutation(self.namespace(), mutation, payload));
        Ok(())
    }
}

/// An HTTP-backed action: request builder, success mutation and options
pub struct ApiAction<D> {
    request: RequestBuilderFn<D>,
    mutation: Option<SuccessMutationFn<D>>,
    return_response: bool,
    after_success: Option<Hook>,
    after_failure: Option<Hook>,
}

impl<D> ApiAction<D> {
    /// An action with a request builder and the mutation applied on success
    pub fn new<B, M>(request: B, mutation: M) -> Self
    where
        B: Fn(&RequestContext<'_, D>, &Value) -> ApiRequest + Send + Sync + 'static,
        M: Fn(&mut Draft<'_, D>, &ApiResult<'_>) + Send + Sync + 'static,
    {
        Self {
            request: Box::new(request),
            mutation: Some(Box::new(mutation)),
            return_response: false,
            after_success: None,
            after_failure: None,
        }
    }

    /// An action whose response does not change state
    pub fn without_mutation<B>(request: B) -> Self
    where
        B: Fn(&RequestContext<'_, D>, &Value) -> ApiRequest + Send + Sync + 'static,
    {
        Self {
            request: Box::new(request),
            mutation: None,
            return_response: false,
            after_success: None,
            after_failure: None,
        }
    }

    /// Hand the raw response body back to the caller instead of `true`
    #[must_use]
    pub fn returning_response(mut self) -> Self {
        self.return_response = true;
        self
    }

    /// Run `hook` with the response body after the state is updated
    #[must_use]
    pub fn after_success<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.after_success = Some(Box::new(move |body| Box::pin(hook(body))));
        self
    }

    /// Run `hook` with the error body after the failure is recorded
    #[must_use]
    pub fn after_failure<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.after_failure = Some(Box::new(move |error| Box::pin(hook(error))));
        self
    }

    /// Build the request for `payload`
    pub fn build_request(&self, ctx: &RequestContext<'_, D>, payload: &Value) -> ApiRequest {
        (self.request)(ctx, payload)
    }

    /// Whether the caller gets the raw response body
    #[must_use]
    pub const fn returns_response(&self) -> bool {
        self.return_response
    }

    /// The after-success hook's future, if one is declared
    pub fn on_success(&self, body: Value) -> Option<HookFuture> {
        self.after_success.as_ref().map(|hook| hook(body))
    }

    /// The after-failure hook's future, if one is declared
    pub fn on_failure(&self, error: Value) -> Option<HookFuture> {
        self.after_failure.as_ref().map(|hook| hook(error))
    }
}

impl<D> fmt::Debug for ApiAction<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiAction")
            .field("has_mutation", &self.mutation.is_some())
            .field("return_response", &self.return_response)
            .field("after_success", &self.after_success.is_some())
            .field("after_failure", &self.after_failure.is_some())
            .finish_non_exhaustive()
    }
}

/// Registry entry for a dispatchable name
enum ActionKind<D> {
    Api(ApiAction<D>),
    Sync(ActionFn<D>),
}

/// A validated, immutable module description
pub struct ModuleDefinition<D> {
    namespace: String,
    initial: InitialStateFn<D>,
    actions: HashMap<String, ActionKind<D>>,
    mutations: HashMap<String, MutationFn<D>>,
    getters: HashMap<String, GetterFn<D>>,
}

impl<D> ModuleDefinition<D>
where
    D: Clone + Send + Sync + 'static,
{
    /// Start describing a module under `namespace`
    #[must_use]
    pub fn builder(namespace: impl Into<String>) -> ModuleDefinitionBuilder<D> {
        ModuleDefinitionBuilder::new(namespace)
    }

    /// The module's namespace
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// A fresh initial domain state
    #[must_use]
    pub fn initial_state(&self) -> D {
        (self.initial)()
    }

    /// A fresh slice for a new store
    #[must_use]
    pub fn initial_slice(&self) -> Arc<ModuleState<D>> {
        Arc::new(ModuleState::new(self.initial_state()))
    }

    /// Whether a mutation with this name is registered
    #[must_use]
    pub fn has_mutation(&self, name: &str) -> bool {
        self.mutations.contains_key(name)
    }

    /// Whether an action (sync or API) with this name is registered
    #[must_use]
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Registered getter names
    pub fn getter_names(&self) -> impl Iterator<Item = &str> {
        self.getters.keys().map(String::as_str)
    }

    /// Look up an API action
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::UnknownAction`] if nothing is registered under
    /// `name`, [`ModuleError::WrongActionKind`] if it is a sync action.
    pub fn api_action(&self, name: &str) -> Result<&ApiAction<D>, ModuleError> {
        match self.actions.get(name) {
            Some(ActionKind::Api(action)) => Ok(action),
            Some(ActionKind::Sync(_)) => Err(ModuleError::WrongActionKind {
                namespace: self.namespace.clone(),
                name: name.to_string(),
                expected: "an api action",
            }),
            None => Err(self.unknown_action(name)),
        }
    }

    /// Run a sync action against `store`
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::UnknownAction`] or
    /// [`ModuleError::WrongActionKind`] for a bad name, or whatever error the
    /// handler returns.
    pub fn run_action(
        &self,
        name: &str,
        store: &dyn StoreHandle,
        payload: Value,
    ) -> Result<(), ModuleError> {
        match self.actions.get(name) {
            Some(ActionKind::Sync(handler)) => handler(&ActionContext::new(self, store), payload),
            Some(ActionKind::Api(_)) => Err(ModuleError::WrongActionKind {
                namespace: self.namespace.clone(),
                name: name.to_string(),
                expected: "a sync action",
            }),
            None => Err(self.unknown_action(name)),
        }
    }

    /// Run a getter on `state`
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::UnknownGetter`] if no getter has this name and
    /// [`ModuleError::GetterType`] if it does not produce a `T`.
    pub fn evaluate<T: 'static>(&self, name: &str, state: &D) -> Result<T, ModuleError> {
        let getter = self
            .getters
            .get(name)
            .ok_or_else(|| ModuleError::UnknownGetter {
                namespace: self.namespace.clone(),
                name: name.to_string(),
            })?;

        getter(state)
            .downcast::<T>()
            .map(|value| *value)
            .map_err(|_| ModuleError::GetterType {
                namespace: self.namespace.clone(),
                name: name.to_string(),
                expected: type_name::<T>(),
            })
    }

    /// This module's slice of `tree`
    ///
    /// # Errors
    ///
    /// Returns [`ModuleError::NotRegistered`] if the namespace is missing and
    /// [`ModuleError::SliceType`] if it holds another state type.
    pub fn slice_of(&self, tree: &StateTree) -> Result<Arc<ModuleState<D>>, ModuleError> {
        if !tree.contains(&self.namespace) {
            return Err(ModuleError::NotRegistered(self.namespace.clone()));
        }
        tree.slice::<D>(&self.namespace)
            .ok_or_else(|| ModuleError::SliceType(self.namespace.clone()))
    }

    /// Status view of one request key in `tree`
    ///
    /// # Errors
    ///
    /// Same as [`slice_of`](Self::slice_of). Unknown keys are not an error.
    pub fn request_status(
        &self,
        tree: &StateTree,
        key: &str,
    ) -> Result<RequestStatusView, ModuleError> {
        let slice = self.slice_of(tree)?;
        Ok(RequestStatusView::from_record(slice.request(key)))
    }

    /// Fold one event into this module's slice
    ///
    /// Returns the same `Arc` when the event changes nothing.
    #[must_use]
    pub fn reduce_slice(
        &self,
        slice: &Arc<ModuleState<D>>,
        kind: &EventKind,
    ) -> Arc<ModuleState<D>> {
        match kind {
            EventKind::RequestInitiated { key, at } => {
                let requests = produce(slice.requests(), |draft| {
                    draft.insert(key.clone(), RequestRecord::pending(*at));
                });
                Arc::new(slice.with_requests(requests))
            },
            EventKind::RequestSucceeded { key, at } => {
                if slice.request(key.as_str()).is_none() {
                    return Arc::clone(slice);
                }
                let requests = produce(slice.requests(), |draft| {
                    if let Some(record) = draft.get_mut(key) {
                        record.succeed(*at);
                    }
                });
                Arc::new(slice.with_requests(requests))
            },
            EventKind::RequestFailed { key, at, error } => {
                if slice.request(key.as_str()).is_none() {
                    return Arc::clone(slice);
                }
                let requests = produce(slice.requests(), |draft| {
                    if let Some(record) = draft.get_mut(key) {
                        record.fail(*at, error.clone());
                    }
                });
                Arc::new(slice.with_requests(requests))
            },
            EventKind::ApiSucceeded {
                action,
                payload,
                request,
                response,
            } => {
                let Some(ActionKind::Api(ApiAction {
                    mutation: Some(mutation),
                    ..
                })) = self.actions.get(action)
                else {
                    return Arc::clone(slice);
                };
                let result = ApiResult {
                    payload,
                    request,
                    response,
                };
                Self::apply(slice, |draft| mutation(draft, &result))
            },
            EventKind::Mutation { name, payload } => match self.mutations.get(name) {
                Some(mutation) => Self::apply(slice, |draft| mutation(draft, payload)),
                None => Arc::clone(slice),
            },
        }
    }

    fn apply<F>(slice: &Arc<ModuleState<D>>, mutator: F) -> Arc<ModuleState<D>>
    where
        F: FnOnce(&mut Draft<'_, D>),
    {
        let state = produce(slice.state(), mutator);
        if Arc::ptr_eq(&state, slice.state()) {
            Arc::clone(slice)
        } else {
            Arc::new(slice.with_state(state))
        }
    }

    fn unknown_action(&self, name: &str) -> ModuleError {
        ModuleError::UnknownAction {
            namespace: self.namespace.clone(),
            name: name.to_string(),
        }
    }
}

impl<D> Reducer for ModuleDefinition<D>
where
    D: Clone + Send + Sync + 'static,
{
    type State = StateTree;

    fn reduce(&self, state: &StateTree, event: &Event) -> StateTree {
        if !event.is_for(&self.namespace) {
            return state.clone();
        }
        let Some(slice) = state.slice::<D>(&self.namespace) else {
            return state.clone();
        };

        let next = self.reduce_slice(&slice, event.kind());
        if Arc::ptr_eq(&next, &slice) {
            state.clone()
        } else {
            state.with_slice(&self.namespace, next)
        }
    }
}

impl<D> fmt::Debug for ModuleDefinition<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut actions: Vec<_> = self.actions.keys().collect();
        actions.sort();
        let mut mutations: Vec<_> = self.mutations.keys().collect();
        mutations.sort();
        let mut getters: Vec<_> = self.getters.keys().collect();
        getters.sort();

        f.debug_struct("ModuleDefinition")
            .field("namespace", &self.namespace)
            .field("actions", &actions)
            .field("mutations", &mutations)
            .field("getters", &getters)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ModuleDefinition`]
///
/// Registrations are collected as given and checked together in
/// [`build`](Self::build).
pub struct ModuleDefinitionBuilder<D> {
    namespace: String,
    initial: Option<InitialStateFn<D>>,
    api_actions: Vec<(String, ApiAction<D>)>,
    actions: Vec<(String, ActionFn<D>)>,
    mutations: Vec<(String, MutationFn<D>)>,
    getters: Vec<(String, GetterFn<D>)>,
}

impl<D> ModuleDefinitionBuilder<D>
where
    D: Clone + Send + Sync + 'static,
{
    /// Start describing a module under `namespace`
    #[must_use]
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            initial: None,
            api_actions: Vec::new(),
            actions: Vec::new(),
            mutations: Vec::new(),
            getters: Vec::new(),
        }
    }

    /// Initial state value (cloned for every store the module joins)
    #[must_use]
    pub fn state(mut self, state: D) -> Self {
        self.initial = Some(Box::new(move || state.clone()));
        self
    }

    /// Initial state factory
    #[must_use]
    pub fn state_with<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> D + Send + Sync + 'static,
    {
        self.initial = Some(Box::new(factory));
        self
    }

    /// Register a getter
    #[must_use]
    pub fn getter<T, F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        T: Send + 'static,
        F: Fn(&D) -> T + Send + Sync + 'static,
    {
        self.getters.push((
            name.into(),
            Box::new(move |state| Box::new(getter(state)) as Box<dyn Any + Send>),
        ));
        self
    }

    /// Register an HTTP-backed action
    #[must_use]
    pub fn api_action(mut self, name: impl Into<String>, action: ApiAction<D>) -> Self {
        self.api_actions.push((name.into(), action));
        self
    }

    /// Register a sync action
    #[must_use]
    pub fn action<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&ActionContext<'_, D>, Value) -> Result<(), ModuleError> + Send + Sync + 'static,
    {
        self.actions.push((name.into(), Box::new(handler)));
        self
    }

    /// Register a mutation
    #[must_use]
    pub fn mutation<F>(mut self, name: impl Into<String>, mutation: F) -> Self
    where
        F: Fn(&mut Draft<'_, D>, &Value) + Send + Sync + 'static,
    {
        self.mutations.push((name.into(), Box::new(mutation)));
        self
    }

    /// Validate the registrations and produce the definition
    ///
    /// # Errors
    ///
    /// Returns a [`DefinitionError`] for an empty or malformed namespace, a
    /// missing initial state, empty or duplicate names, or an API action that
    /// shares its name with a sync action or a mutation.
    pub fn build(self) -> Result<ModuleDefinition<D>, DefinitionError> {
        let namespace = self.namespace;
        if namespace.is_empty() {
            return Err(DefinitionError::EmptyNamespace);
        }
        if namespace.contains('/') {
            return Err(DefinitionError::InvalidNamespace(namespace));
        }
        let initial = self
            .initial
            .ok_or_else(|| DefinitionError::MissingInitialState(namespace.clone()))?;

        let api_actions = collect(&namespace, NameFamily::ApiAction, self.api_actions)?;
        let sync_actions = collect(&namespace, NameFamily::Action, self.actions)?;
        let mutations = collect(&namespace, NameFamily::Mutation, self.mutations)?;
        let getters = collect(&namespace, NameFamily::Getter, self.getters)?;

        if let Some(name) = api_actions.keys().find(|name| sync_actions.contains_key(*name)) {
            return Err(DefinitionError::ActionCollision {
                namespace,
                name: name.clone(),
            });
        }
        if let Some(name) = api_actions.keys().find(|name| mutations.contains_key(*name)) {
            return Err(DefinitionError::MutationCollision {
                namespace,
                name: name.clone(),
            });
        }

        let actions = api_actions
            .into_iter()
            .map(|(name, action)| (name, ActionKind::Api(action)))
            .chain(
                sync_actions
                    .into_iter()
                    .map(|(name, handler)| (name, ActionKind::Sync(handler))),
            )
            .collect();

        Ok(ModuleDefinition {
            namespace,
            initial,
            actions,
            mutations,
            getters,
        })
    }
}

fn collect<T>(
    namespace: &str,
    family: NameFamily,
    entries: Vec<(String, T)>,
) -> Result<HashMap<String, T>, DefinitionError> {
    let mut seen = HashSet::new();
    let mut map = HashMap::with_capacity(entries.len());
    for (name, entry) in entries {
        if name.is_empty() {
            return Err(DefinitionError::EmptyName {
                namespace: namespace.to_string(),
                family,
            });
        }
        if !seen.insert(name.clone()) {
            return Err(DefinitionError::DuplicateName {
                namespace: namespace.to_string(),
                family,
                name,
            });
        }
        map.insert(name, entry);
    }
    Ok(map)
}
