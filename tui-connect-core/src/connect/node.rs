//! Live connected instances

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::cache::{Changes, PropsCache, RecomputeInput};
use super::Connected;
use crate::bind::Dispatcher;
use crate::error::ConnectError;
use crate::props::Props;
use crate::render::{Element, Renderer};
use crate::store::{Listener, StoreRef, Subscription};
use crate::Action;

/// Where an instance is in its subscription lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Unmounted,
    /// Mounted without a store subscription (no state mapper)
    Mounted,
    Subscribed,
}

struct Instance<S, A, N> {
    connected: Connected<S, A>,
    store: StoreRef<S, A>,
    dispatcher: Dispatcher<A>,
    /// Last snapshot that scheduled a render
    store_state: Rc<S>,
    own_props: Props,
    cache: PropsCache<S, A, N>,
    subscription: Option<Subscription>,
    mounted: bool,
}

impl<S: 'static, A: Action, N> Instance<S, A, N> {
    /// Returns whether a render should be scheduled.
    fn on_store_change(&mut self) -> bool {
        if self.subscription.is_none() {
            return false;
        }

        let config = self.connected.config.clone();
        let next = self.store.state();
        if config.options.pure && Rc::ptr_eq(&next, &self.store_state) {
            return false;
        }

        let input = RecomputeInput {
            config: &config,
            component: self.connected.display_name(),
            state: &next,
            dispatcher: &self.dispatcher,
            own_props: &self.own_props,
        };
        if !self.cache.on_store_change(&input) {
            tracing::trace!(
                component = %self.connected.display_name(),
                "state props unchanged; skipping render"
            );
            return false;
        }

        self.store_state = next;
        true
    }

    fn render<R: Renderer<Node = N>>(&mut self, renderer: &R) -> Result<N, ConnectError>
    where
        N: Clone,
    {
        let config = self.connected.config.clone();
        let state = self.store.state();
        let input = RecomputeInput {
            config: &config,
            component: self.connected.display_name(),
            state: &state,
            dispatcher: &self.dispatcher,
            own_props: &self.own_props,
        };
        let changes = self.cache.recompute(&input)?;

        if !changes.contains(Changes::MERGED_PROPS) {
            if let Some(node) = self.cache.rendered() {
                tracing::trace!(
                    component = %self.connected.display_name(),
                    "merged props unchanged; reusing node"
                );
                return Ok(node.clone());
            }
        }

        tracing::trace!(
            component = %self.connected.display_name(),
            ?changes,
            "creating node"
        );
        let props = self.cache.merged_props().cloned().unwrap_or_default();
        let node = renderer.create_node(self.connected.wrapped_component(), &props);
        self.cache.set_rendered(node.clone());
        Ok(node)
    }
}

struct Shared<S, A, N> {
    instance: RefCell<Instance<S, A, N>>,
    /// A notification arrived while the instance was busy
    pending_change: Cell<bool>,
    needs_render: Cell<bool>,
    on_update: RefCell<Option<Rc<dyn Fn()>>>,
}

impl<S: 'static, A: Action, N> Shared<S, A, N> {
    fn handle_store_change(&self) {
        loop {
            let schedule = match self.instance.try_borrow_mut() {
                Ok(mut instance) => instance.on_store_change(),
                Err(_) => {
                    tracing::trace!("store notification while instance is busy; deferring");
                    self.pending_change.set(true);
                    return;
                }
            };

            if schedule {
                self.needs_render.set(true);
                let on_update = self.on_update.borrow().clone();
                if let Some(on_update) = on_update {
                    on_update();
                }
            }

            // A mapper may have dispatched while state props were precomputed
            if !self.pending_change.replace(false) {
                return;
            }
        }
    }
}

/// A live instance of a [`Connected`] component
///
/// Lifecycle: [`mount`](Self::mount) subscribes (when the configuration has
/// a state mapper), [`render`](Self::render) produces a node through a
/// [`Renderer`], [`unmount`](Self::unmount) unsubscribes and clears every
/// cached value. Store notifications never render by themselves; they set
/// [`needs_render`](Self::needs_render) and invoke the
/// [`on_update`](Self::on_update) callback.
pub struct ConnectedNode<S, A, N = Element> {
    shared: Rc<Shared<S, A, N>>,
}

impl<S: 'static, A: Action, N: Clone + 'static> ConnectedNode<S, A, N> {
    pub(crate) fn new(connected: &Connected<S, A>, own_props: Props, store: StoreRef<S, A>) -> Self {
        let dispatcher = Dispatcher::for_store(store.clone());
        let store_state = store.state();

        tracing::debug!(component = %connected.display_name(), "instantiated");

        Self {
            shared: Rc::new(Shared {
                instance: RefCell::new(Instance {
                    connected: connected.clone(),
                    store,
                    dispatcher,
                    store_state,
                    own_props,
                    cache: PropsCache::new(),
                    subscription: None,
                    mounted: false,
                }),
                pending_change: Cell::new(false),
                needs_render: Cell::new(false),
                on_update: RefCell::new(None),
            }),
        }
    }

    /// Mark the instance mounted and subscribe if needed. No-op when already mounted.
    pub fn mount(&self) {
        let subscribe = {
            let mut instance = self.shared.instance.borrow_mut();
            if instance.mounted {
                return;
            }
            instance.mounted = true;
            instance.connected.config.should_subscribe && instance.subscription.is_none()
        };

        if subscribe {
            self.try_subscribe();
        }
    }

    fn try_subscribe(&self) {
        let weak: Weak<Shared<S, A, N>> = Rc::downgrade(&self.shared);
        let listener: Listener = Rc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.handle_store_change();
            }
        });

        let (store, component) = {
            let instance = self.shared.instance.borrow();
            (
                instance.store.clone(),
                instance.connected.display_name().to_string(),
            )
        };
        let subscription = store.subscribe(listener.clone());
        self.shared.instance.borrow_mut().subscription = Some(subscription);
        tracing::debug!(component = %component, "subscribed to store");

        // Catch up on anything dispatched between construction and mount
        listener();
    }

    /// Unsubscribe and clear the cache. Safe to call repeatedly.
    pub fn unmount(&self) {
        let (subscription, component) = {
            let mut instance = self.shared.instance.borrow_mut();
            instance.mounted = false;
            instance.cache.clear();
            (
                instance.subscription.take(),
                instance.connected.display_name().to_string(),
            )
        };
        self.shared.pending_change.set(false);
        self.shared.needs_render.set(false);

        if let Some(mut subscription) = subscription {
            subscription.unsubscribe();
            tracing::debug!(component = %component, "unsubscribed from store");
        }
    }

    /// Replace the own props. Returns whether they count as changed.
    pub fn set_own_props(&self, own_props: Props) -> bool {
        let mut instance = self.shared.instance.borrow_mut();
        let changed =
            !instance.connected.config.options.pure || !instance.own_props.shallow_eq(&own_props);
        if changed {
            instance.cache.mark_own_props_changed();
        }
        instance.own_props = own_props;
        changed
    }

    /// Produce the node for the current store state and own props.
    ///
    /// Returns the previously rendered node when nothing relevant changed.
    /// A mapper failure captured during a store notification is returned here.
    pub fn render<R: Renderer<Node = N>>(&self, renderer: &R) -> Result<N, ConnectError> {
        let result = self.shared.instance.borrow_mut().render(renderer);
        self.shared.needs_render.set(false);

        if self.shared.pending_change.replace(false) {
            self.shared.handle_store_change();
        }
        result
    }

    /// The node last produced for the wrapped component.
    ///
    /// Fails with [`ConnectError::RefNotEnabled`] unless the options enable
    /// `with_ref`. `None` until the first render.
    pub fn wrapped_instance(&self) -> Result<Option<N>, ConnectError> {
        let instance = self.shared.instance.borrow();
        if !instance.connected.config.options.with_ref {
            return Err(ConnectError::RefNotEnabled {
                component: instance.connected.display_name().to_string(),
            });
        }
        Ok(instance.cache.rendered().cloned())
    }

    /// Swap in a new configuration of the same component.
    ///
    /// Does nothing and returns `false` when `connected` carries the
    /// configuration already in use. Otherwise the cache is cleared, the
    /// subscription is adjusted to the new configuration, and the instance
    /// is flagged for rendering.
    pub fn reload(&self, connected: &Connected<S, A>) -> bool {
        let (subscribe, stale) = {
            let mut instance = self.shared.instance.borrow_mut();
            if Rc::ptr_eq(&instance.connected.config, &connected.config) {
                return false;
            }
            tracing::debug!(component = %connected.display_name(), "reloading configuration");

            instance.connected = connected.clone();
            instance.cache.clear();
            let should_subscribe = instance.connected.config.should_subscribe;
            let stale = if should_subscribe {
                None
            } else {
                instance.subscription.take()
            };
            (
                should_subscribe && instance.mounted && instance.subscription.is_none(),
                stale,
            )
        };

        if let Some(mut stale) = stale {
            stale.unsubscribe();
        }
        if subscribe {
            self.try_subscribe();
        }
        self.shared.needs_render.set(true);
        true
    }

    /// Register the re-render hook invoked when a store change needs a render.
    pub fn on_update(&self, callback: impl Fn() + 'static) {
        *self.shared.on_update.borrow_mut() = Some(Rc::new(callback));
    }

    pub fn needs_render(&self) -> bool {
        self.shared.needs_render.get()
    }

    pub fn phase(&self) -> Phase {
        let instance = self.shared.instance.borrow();
        match (instance.mounted, instance.subscription.is_some()) {
            (false, _) => Phase::Unmounted,
            (true, false) => Phase::Mounted,
            (true, true) => Phase::Subscribed,
        }
    }

    pub fn is_subscribed(&self) -> bool {
        self.phase() == Phase::Subscribed
    }

    pub fn own_props(&self) -> Props {
        self.shared.instance.borrow().own_props.clone()
    }

    pub fn state_props(&self) -> Option<Props> {
        self.shared.instance.borrow().cache.state_props().cloned()
    }

    pub fn dispatch_props(&self) -> Option<Props> {
        self.shared.instance.borrow().cache.dispatch_props().cloned()
    }

    pub fn merged_props(&self) -> Option<Props> {
        self.shared.instance.borrow().cache.merged_props().cloned()
    }

    pub fn display_name(&self) -> String {
        self.shared.instance.borrow().connected.display_name().to_string()
    }

    pub fn store(&self) -> StoreRef<S, A> {
        self.shared.instance.borrow().store.clone()
    }

    /// The per-instance dispatcher handed to the dispatch mapper.
    pub fn dispatcher(&self) -> Dispatcher<A> {
        self.shared.instance.borrow().dispatcher.clone()
    }
}

impl<S, A, N> fmt::Debug for ConnectedNode<S, A, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ConnectedNode");
        if let Ok(instance) = self.shared.instance.try_borrow() {
            s.field("component", &instance.connected.component.display_name())
                .field("mounted", &instance.mounted)
                .field("subscribed", &instance.subscription.is_some());
        }
        s.field("needs_render", &self.shared.needs_render.get())
            .finish_non_exhaustive()
    }
}
