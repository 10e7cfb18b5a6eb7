//! Binding stores to components
//!
//! [`Connect`] collects up to four pieces of configuration (a state mapper, a
//! dispatch mapper, a props merger and [`ConnectOptions`]) and wraps a
//! [`ComponentType`] into a [`Connected`] type. Each [`ConnectedNode`]
//! instantiated from it:
//!
//! 1. resolves its store (explicit argument first, then the provider context)
//! 2. subscribes to the store when a state mapper was given
//! 3. recomputes state props, dispatch props and merged props, each only when
//!    its inputs changed
//! 4. asks the [`Renderer`](crate::Renderer) for a node only when the merged
//!    props changed, returning the previous node otherwise
//!
//! # Example
//!
//! ```ignore
//! use tui_connect::prelude::*;
//!
//! let connected = Connect::new()
//!     .map_state(StateMapper::new(|state: &AppState| props! { "count" => state.count }))
//!     .map_dispatch(ActionCreators::new().with("increment", || AppAction::Increment))
//!     .wrap(ComponentType::new("Counter"));
//!
//! let provider = Provider::new(store);
//! let node = connected.instantiate(Props::new(), None, &provider.context())?;
//! node.mount();
//! let element = node.render(&ElementRenderer)?;
//! ```

mod cache;
mod mapper;
mod node;

pub use cache::{Changes, PropsCache, RecomputeInput};
pub use mapper::{
    default_merge_props, DispatchMapper, MapResult, Mapped, MergeProps, StateMapper,
};
pub use node::{ConnectedNode, Phase};

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::component::{connect_display_name, ComponentType};
use crate::error::ConnectError;
use crate::props::Props;
use crate::provider::StoreContext;
use crate::store::StoreRef;
use crate::Action;

use mapper::expect_props;

/// Behavior switches for a connected component
///
/// Deserializes with per-field defaults:
///
/// ```
/// use tui_connect_core::ConnectOptions;
///
/// let opts = ConnectOptions::from_json(r#"{ "with_ref": true }"#).unwrap();
/// assert!(opts.pure);
/// assert!(opts.with_ref);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectOptions {
    /// Skip recomputation and re-rendering when inputs are unchanged
    pub pure: bool,
    /// Expose the rendered wrapped node through
    /// [`ConnectedNode::wrapped_instance`]
    pub with_ref: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            pure: true,
            with_ref: false,
        }
    }
}

impl ConnectOptions {
    pub fn from_json(json: &str) -> Result<Self, ConnectError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn pure(mut self, pure: bool) -> Self {
        self.pure = pure;
        self
    }

    pub fn with_ref(mut self, with_ref: bool) -> Self {
        self.with_ref = with_ref;
        self
    }
}

/// Normalized configuration shared by every instance of a [`Connected`] type
pub struct ConnectConfig<S, A> {
    pub(crate) map_state: StateMapper<S>,
    pub(crate) map_dispatch: DispatchMapper<A>,
    pub(crate) merge: MergeProps,
    pub(crate) options: ConnectOptions,
    pub(crate) should_subscribe: bool,
}

impl<S, A> ConnectConfig<S, A> {
    pub fn options(&self) -> ConnectOptions {
        self.options
    }

    /// Whether instances listen to the store at all
    pub fn should_subscribe(&self) -> bool {
        self.should_subscribe
    }

    /// Merged props are compared against the previous result only for the
    /// default merger in pure mode; a custom merger always yields "changed".
    pub fn check_merged_equals(&self) -> bool {
        self.options.pure && self.merge.is_default()
    }

    pub(crate) fn merge(
        &self,
        state_props: &Props,
        dispatch_props: &Props,
        own_props: &Props,
        component: &str,
    ) -> Props {
        match &self.merge {
            MergeProps::Default => default_merge_props(state_props, dispatch_props, own_props),
            MergeProps::Custom(merge) => expect_props::<()>(
                merge(state_props, dispatch_props, own_props).into(),
                component,
                "merge_props",
            ),
        }
    }
}

impl<S, A> fmt::Debug for ConnectConfig<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectConfig")
            .field("map_state", &self.map_state)
            .field("map_dispatch", &self.map_dispatch)
            .field("merge", &self.merge)
            .field("options", &self.options)
            .field("should_subscribe", &self.should_subscribe)
            .finish()
    }
}

/// Connection factory
///
/// Every argument is optional:
/// - no state mapper: state props are always empty and instances never
///   subscribe to the store
/// - no dispatch mapper: the instance's [`Dispatcher`](crate::Dispatcher) is
///   exposed under the `dispatch` prop
/// - no merger: `{...own, ...state, ...dispatch}`
pub struct Connect<S, A> {
    map_state: Option<StateMapper<S>>,
    map_dispatch: Option<DispatchMapper<A>>,
    merge: Option<MergeProps>,
    options: ConnectOptions,
}

impl<S, A> Clone for Connect<S, A> {
    fn clone(&self) -> Self {
        Self {
            map_state: self.map_state.clone(),
            map_dispatch: self.map_dispatch.clone(),
            merge: self.merge.clone(),
            options: self.options,
        }
    }
}

impl<S: 'static, A: Action> Default for Connect<S, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: 'static, A: Action> Connect<S, A> {
    pub fn new() -> Self {
        Self {
            map_state: None,
            map_dispatch: None,
            merge: None,
            options: ConnectOptions::default(),
        }
    }

    pub fn map_state(mut self, mapper: StateMapper<S>) -> Self {
        self.map_state = Some(mapper);
        self
    }

    /// Accepts a [`DispatchMapper`] or an [`ActionCreators`](crate::ActionCreators) set.
    pub fn map_dispatch(mut self, mapper: impl Into<DispatchMapper<A>>) -> Self {
        self.map_dispatch = Some(mapper.into());
        self
    }

    pub fn merge_props(mut self, merge: MergeProps) -> Self {
        self.merge = Some(merge);
        self
    }

    pub fn options(mut self, options: ConnectOptions) -> Self {
        self.options = options;
        self
    }

    /// Wrap a component. Each call produces an independent configuration.
    pub fn wrap(&self, component: ComponentType) -> Connected<S, A> {
        let config = ConnectConfig {
            should_subscribe: self.map_state.is_some(),
            map_state: self.map_state.clone().unwrap_or_else(StateMapper::empty),
            map_dispatch: self
                .map_dispatch
                .clone()
                .unwrap_or_else(DispatchMapper::dispatch_only),
            merge: self.merge.clone().unwrap_or_default(),
            options: self.options,
        };

        let display_name = connect_display_name(&component);
        let wrapper = ComponentType::builder(display_name.clone())
            .display_name(display_name)
            .hoist_statics_from(&component)
            .build();

        tracing::debug!(
            component = %wrapper.display_name(),
            pure = config.options.pure,
            with_ref = config.options.with_ref,
            subscribes = config.should_subscribe,
            "wrapped component"
        );

        Connected {
            config: Rc::new(config),
            wrapped: component,
            component: wrapper,
        }
    }
}

/// Four-argument form of [`Connect`].
pub fn connect<S: 'static, A: Action>(
    map_state: Option<StateMapper<S>>,
    map_dispatch: Option<DispatchMapper<A>>,
    merge_props: Option<MergeProps>,
    options: Option<ConnectOptions>,
) -> Connect<S, A> {
    Connect {
        map_state,
        map_dispatch,
        merge: merge_props,
        options: options.unwrap_or_default(),
    }
}

/// A wrapped component type, ready to be instantiated
pub struct Connected<S, A> {
    pub(crate) config: Rc<ConnectConfig<S, A>>,
    pub(crate) wrapped: ComponentType,
    pub(crate) component: ComponentType,
}

impl<S, A> Clone for Connected<S, A> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            wrapped: self.wrapped.clone(),
            component: self.component.clone(),
        }
    }
}

impl<S: 'static, A: Action> Connected<S, A> {
    /// `Connect(<wrapped display name>)`
    pub fn display_name(&self) -> &str {
        self.component.display_name()
    }

    /// The wrapper's own descriptor, carrying the hoisted statics.
    pub fn component(&self) -> &ComponentType {
        &self.component
    }

    pub fn wrapped_component(&self) -> &ComponentType {
        &self.wrapped
    }

    pub fn config(&self) -> &ConnectConfig<S, A> {
        &self.config
    }

    /// Create a live instance.
    ///
    /// `store` takes precedence over the store in `context`. Fails with
    /// [`ConnectError::MissingStore`] when neither provides one.
    pub fn instantiate<N: Clone + 'static>(
        &self,
        own_props: Props,
        store: Option<StoreRef<S, A>>,
        context: &StoreContext<S, A>,
    ) -> Result<ConnectedNode<S, A, N>, ConnectError> {
        let store = context
            .resolve(store)
            .ok_or_else(|| ConnectError::MissingStore {
                component: self.display_name().to_string(),
            })?;
        Ok(ConnectedNode::new(self, own_props, store))
    }
}

impl<S, A> fmt::Debug for Connected<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connected")
            .field("component", &self.component.display_name())
            .field("config", &self.config)
            .finish()
    }
}
