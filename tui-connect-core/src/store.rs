//! Store contract and a reference reducer store
//!
//! Connected components only ever talk to a store through [`StoreApi`]:
//! read the current snapshot, dispatch an action, subscribe to change
//! notifications. [`Store`] is a small reducer-driven implementation of that
//! contract, useful on its own and in tests.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use crate::Action;

/// A change listener registered with a store
pub type Listener = Rc<dyn Fn()>;

/// Shared handle to a store, as held by connected instances
pub type StoreRef<S, A> = Rc<dyn StoreApi<S, A>>;

/// The operations a connected component needs from a store
///
/// Implementations must:
/// - return the same `Rc` from [`state`](StoreApi::state) until the state changes
/// - invoke every subscribed listener synchronously before `dispatch` returns
pub trait StoreApi<S, A> {
    /// Current state snapshot
    fn state(&self) -> Rc<S>;

    /// Dispatch an action
    fn dispatch(&self, action: A);

    /// Register a listener, returning a handle that removes it
    fn subscribe(&self, listener: Listener) -> Subscription;
}

/// Handle for a registered listener
///
/// [`unsubscribe`](Subscription::unsubscribe) may be called any number of
/// times; only the first call has an effect. Dropping the handle unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    teardown: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// A handle with nothing to tear down.
    pub fn empty() -> Self {
        Self { teardown: None }
    }

    pub fn unsubscribe(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }

    pub fn is_active(&self) -> bool {
        self.teardown.is_some()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// A reducer function that handles actions and mutates state
///
/// Returns `true` if the state changed. A `false` result keeps the previous
/// snapshot, so subscribers see the same `Rc` as before.
pub type Reducer<S, A> = fn(&mut S, A) -> bool;

#[derive(Default)]
struct ListenerSet {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

/// Reducer-driven store implementing [`StoreApi`]
///
/// Every change produces a fresh `Rc<S>` snapshot (the previous state is
/// cloned, then reduced), so snapshot identity doubles as a change marker.
///
/// # Example
/// ```
/// use std::rc::Rc;
/// use tui_connect_core::{Action, Store, StoreApi};
///
/// #[derive(Clone, Debug)]
/// enum CounterAction {
///     Increment,
/// }
///
/// impl Action for CounterAction {
///     fn name(&self) -> &'static str {
///         "Increment"
///     }
/// }
///
/// fn reducer(state: &mut i32, action: CounterAction) -> bool {
///     match action {
///         CounterAction::Increment => {
///             *state += 1;
///             true
///         }
///     }
/// }
///
/// let store = Store::new(0, reducer);
/// let before = store.state();
/// store.dispatch(CounterAction::Increment);
/// assert_eq!(*store.state(), 1);
/// assert!(!Rc::ptr_eq(&before, &store.state()));
/// ```
pub struct Store<S, A: Action, M: Middleware<A> = NoopMiddleware> {
    state: RefCell<Rc<S>>,
    reducer: Reducer<S, A>,
    middleware: RefCell<M>,
    listeners: Rc<RefCell<ListenerSet>>,
    dispatching: Cell<bool>,
    _marker: PhantomData<A>,
}

impl<S: Clone, A: Action> Store<S, A> {
    /// Create a new store with initial state and reducer
    pub fn new(state: S, reducer: Reducer<S, A>) -> Self {
        Self::with_middleware(state, reducer, NoopMiddleware)
    }
}

impl<S: Clone, A: Action, M: Middleware<A>> Store<S, A, M> {
    /// Create a new store with middleware
    pub fn with_middleware(state: S, reducer: Reducer<S, A>, middleware: M) -> Self {
        Self {
            state: RefCell::new(Rc::new(state)),
            reducer,
            middleware: RefCell::new(middleware),
            listeners: Rc::new(RefCell::new(ListenerSet::default())),
            dispatching: Cell::new(false),
            _marker: PhantomData,
        }
    }

    /// Wrap the store in an `Rc` so it can be handed to connected components.
    pub fn into_ref(self) -> StoreRef<S, A>
    where
        S: 'static,
        M: 'static,
    {
        Rc::new(self)
    }

    /// Dispatch an action through middleware and reducer, then notify listeners
    ///
    /// Returns `true` if the reducer reported a change.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a reducer or middleware hook.
    pub fn dispatch_action(&self, action: A) -> bool {
        assert!(
            !self.dispatching.replace(true),
            "reducers and middleware may not dispatch actions"
        );

        self.middleware.borrow_mut().before(&action);
        let changed = {
            let mut next = S::clone(&self.state.borrow());
            let changed = (self.reducer)(&mut next, action.clone());
            if changed {
                *self.state.borrow_mut() = Rc::new(next);
            }
            changed
        };
        self.middleware.borrow_mut().after(&action, changed);
        self.dispatching.set(false);

        // Listeners added or removed during notification take effect on the
        // next dispatch.
        let snapshot: Vec<Listener> = self
            .listeners
            .borrow()
            .entries
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener();
        }

        changed
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().entries.len()
    }

    /// Get a reference to the middleware
    pub fn middleware(&self) -> std::cell::Ref<'_, M> {
        self.middleware.borrow()
    }
}

impl<S: Clone, A: Action, M: Middleware<A>> StoreApi<S, A> for Store<S, A, M> {
    fn state(&self) -> Rc<S> {
        self.state.borrow().clone()
    }

    fn dispatch(&self, action: A) {
        self.dispatch_action(action);
    }

    fn subscribe(&self, listener: Listener) -> Subscription {
        let id = {
            let mut set = self.listeners.borrow_mut();
            let id = set.next_id;
            set.next_id += 1;
            set.entries.push((id, listener));
            id
        };

        let listeners: Weak<RefCell<ListenerSet>> = Rc::downgrade(&self.listeners);
        Subscription::new(move || {
            if let Some(listeners) = listeners.upgrade() {
                listeners
                    .borrow_mut()
                    .entries
                    .retain(|(entry_id, _)| *entry_id != id);
            }
        })
    }
}

/// Middleware trait for intercepting actions
///
/// Implement this trait to add logging, persistence, or other
/// cross-cutting concerns to your store.
pub trait Middleware<A: Action> {
    /// Called before the action is dispatched to the reducer
    fn before(&mut self, action: &A);

    /// Called after the action is processed by the reducer
    fn after(&mut self, action: &A, state_changed: bool);
}

/// A no-op middleware that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMiddleware;

impl<A: Action> Middleware<A> for NoopMiddleware {
    fn before(&mut self, _action: &A) {}
    fn after(&mut self, _action: &A, _state_changed: bool) {}
}

/// Middleware tracing what each action did to the store
///
/// Logs at `debug` whether the reducer published a new snapshot. Connected
/// instances ignore actions that keep the snapshot, so an action logged as
/// "snapshot unchanged" never reaches a mapper.
#[derive(Debug, Clone)]
pub struct LoggingMiddleware {
    store: &'static str,
    trace_dispatch: bool,
}

impl Default for LoggingMiddleware {
    fn default() -> Self {
        Self::named("store")
    }
}

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every log line with `store = name`.
    pub fn named(name: &'static str) -> Self {
        Self {
            store: name,
            trace_dispatch: false,
        }
    }

    /// Also log each action at `trace` before the reducer runs.
    pub fn trace_dispatch(mut self, enabled: bool) -> Self {
        self.trace_dispatch = enabled;
        self
    }

    pub fn store_name(&self) -> &'static str {
        self.store
    }
}

impl<A: Action> Middleware<A> for LoggingMiddleware {
    fn before(&mut self, action: &A) {
        if self.trace_dispatch {
            tracing::trace!(store = %self.store, action = %action.name(), "reducing action");
        }
    }

    fn after(&mut self, action: &A, state_changed: bool) {
        if state_changed {
            tracing::debug!(store = %self.store, action = %action.name(), "published new snapshot");
        } else {
            tracing::debug!(store = %self.store, action = %action.name(), "snapshot unchanged");
        }
    }
}
