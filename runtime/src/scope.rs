//! Key-deriving wrappers around the registry
//!
//! A [`MetaScope`] runs named actions through a [`MetaRegistry`] under keys
//! derived from the action name and its argument (see [`KeyStyle`]). It holds
//! no state of its own.
//!
//! [`ActionGroup`] goes one step further and decorates a whole set of named
//! actions so they can be dispatched by name, each automatically tracked.

use crate::{MetaRegistry, RuntimeError};
use action_meta_core::{ActionError, KeyStyle, MetaArgument, RequestMeta};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Decorate actions with request metadata keyed `<action>` or `<action>-<id>`
#[must_use]
pub fn with_meta(registry: MetaRegistry) -> MetaScope {
    MetaScope::new(registry)
}

/// Decorate actions with request metadata keyed `<prefix><id>`
#[must_use]
pub fn with_prefixed_id_meta(registry: MetaRegistry, prefix: impl Into<String>) -> MetaScope {
    MetaScope::with_style(registry, KeyStyle::prefixed_id(prefix))
}

/// Registry view that derives keys from action names and arguments
///
/// # Example
///
/// ```
/// use action_meta_runtime::{MetaRegistry, with_meta, with_prefixed_id_meta};
///
/// let registry = MetaRegistry::new();
///
/// let meta = with_meta(registry.clone());
/// assert_eq!(meta.key("fetch", &7_u64), "fetch-7");
/// assert_eq!(meta.key("fetchMine", &()), "fetchMine");
///
/// let agreements = with_prefixed_id_meta(registry, "agreements/");
/// assert_eq!(agreements.key("agreementSave", &3_u64), "agreements/3");
/// ```
#[derive(Debug, Clone)]
pub struct MetaScope {
    registry: MetaRegistry,
    style: KeyStyle,
}

impl MetaScope {
    /// Scope keyed by action name (and argument id)
    #[must_use]
    pub fn new(registry: MetaRegistry) -> Self {
        Self::with_style(registry, KeyStyle::ActionName)
    }

    /// Scope with an explicit key style
    #[must_use]
    pub const fn with_style(registry: MetaRegistry, style: KeyStyle) -> Self {
        Self { registry, style }
    }

    /// The underlying registry
    #[must_use]
    pub const fn registry(&self) -> &MetaRegistry {
        &self.registry
    }

    /// The key style in use
    #[must_use]
    pub const fn style(&self) -> &KeyStyle {
        &self.style
    }

    /// Derive the registry key for an invocation
    #[must_use]
    pub fn key<A: MetaArgument + ?Sized>(&self, action: &str, argument: &A) -> String {
        self.style.key_for(action, argument)
    }

    /// Run `operation(argument)` through the registry under the derived key
    ///
    /// # Errors
    ///
    /// Returns the failure for anything other than a `400..500` response,
    /// exactly like [`MetaRegistry::request`].
    pub async fn run<A, F, Fut, T>(
        &self,
        action: &str,
        argument: A,
        operation: F,
    ) -> Result<Option<T>, ActionError>
    where
        A: MetaArgument,
        F: FnOnce(A) -> Fut,
        Fut: Future<Output = Result<T, ActionError>>,
    {
        let key = self.key(action, &argument);
        self.registry.request(key, move || operation(argument)).await
    }

    /// The registry entry for an invocation
    #[must_use]
    pub fn status<A: MetaArgument + ?Sized>(&self, action: &str, argument: &A) -> RequestMeta {
        self.registry.get(&self.key(action, argument))
    }

    /// Entries of argument-less actions, keyed by action name
    #[must_use]
    pub fn statuses(&self, actions: &[&str]) -> HashMap<String, RequestMeta> {
        actions
            .iter()
            .map(|action| ((*action).to_owned(), self.status(action, &())))
            .collect()
    }

    /// Reset the entry for an invocation
    pub fn clear<A: MetaArgument + ?Sized>(&self, action: &str, argument: &A) {
        self.registry.clear(self.key(action, argument));
    }

    /// Reset the entries of argument-less actions
    pub fn clear_actions(&self, actions: &[&str]) {
        self.registry
            .clear_many(actions.iter().map(|action| self.key(action, &())));
    }
}

/// A registered action: takes its argument, returns a boxed future
pub type ActionFn<A, T> = Arc<dyn Fn(A) -> BoxFuture<'static, Result<T, ActionError>> + Send + Sync>;

/// A set of named actions whose invocations are tracked automatically
///
/// # Example
///
/// ```ignore
/// let applications = ActionGroup::new(with_meta(registry))
///     .action("withdraw", move |id: u64| api.withdraw(id))
///     .action("accept", move |id: u64| api.accept(id));
///
/// applications.dispatch("withdraw", 12).await?;
/// assert!(applications.scope().status("withdraw", &12_u64).success);
/// ```
pub struct ActionGroup<A, T> {
    scope: MetaScope,
    actions: HashMap<String, ActionFn<A, T>>,
}

impl<A, T> ActionGroup<A, T>
where
    A: MetaArgument + Send + 'static,
    T: Send + 'static,
{
    /// Create an empty group on a scope
    #[must_use]
    pub fn new(scope: MetaScope) -> Self {
        Self {
            scope,
            actions: HashMap::new(),
        }
    }

    /// Register an action under `name`, replacing any previous one
    #[must_use]
    pub fn action<F, Fut>(mut self, name: impl Into<String>, action: F) -> Self
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ActionError>> + Send + 'static,
    {
        let action: ActionFn<A, T> = Arc::new(move |argument| action(argument).boxed());
        self.actions.insert(name.into(), action);
        self
    }

    /// The scope the group records into
    #[must_use]
    pub const fn scope(&self) -> &MetaScope {
        &self.scope
    }

    /// Whether an action named `name` is registered
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    /// Names of the registered actions
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    /// Invoke the action named `name` under its derived key
    ///
    /// # Errors
    ///
    /// - [`RuntimeError::UnknownAction`] if no action has that name
    /// - [`RuntimeError::Action`] for failures other than `400..500` responses
    pub async fn dispatch(&self, name: &str, argument: A) -> Result<Option<T>, RuntimeError> {
        let action = self
            .actions
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UnknownAction(name.to_owned()))?;

        self.scope
            .run(name, argument, move |argument| action(argument))
            .await
            .map_err(RuntimeError::from)
    }
}

impl<A, T> fmt::Debug for ActionGroup<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionGroup")
            .field("scope", &self.scope)
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .finish()
    }
}
