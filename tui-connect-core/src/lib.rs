//! Core traits and types for tui-connect
//!
//! This crate binds a centralized, reducer-driven store to a tree of ratatui
//! components. Components never read the store themselves: a connected
//! wrapper derives their props from the store state, re-derives them only
//! when something relevant changed, and hands them to a renderer.
//!
//! # Core Concepts
//!
//! - **Store**: state snapshots (`Rc<S>`), dispatch, change subscriptions ([`StoreApi`])
//! - **Props**: insertion-ordered prop mappings compared by identity ([`Props`])
//! - **Connect**: mappers from state and dispatch to props ([`Connect`], [`StateMapper`],
//!   [`DispatchMapper`], [`MergeProps`])
//! - **ConnectedNode**: a live instance with a subscription and a props cache
//! - **Provider**: hands a store to the instances beneath it ([`StoreContext`])
//!
//! # Basic Example
//!
//! ```ignore
//! use tui_connect_core::prelude::*;
//!
//! #[derive(Clone, Debug)]
//! enum CounterAction {
//!     Increment,
//! }
//!
//! impl Action for CounterAction {
//!     fn name(&self) -> &'static str {
//!         "Increment"
//!     }
//! }
//!
//! #[derive(Clone, Default)]
//! struct AppState {
//!     count: i64,
//! }
//!
//! fn reducer(state: &mut AppState, action: CounterAction) -> bool {
//!     match action {
//!         CounterAction::Increment => {
//!             state.count += 1;
//!             true
//!         }
//!     }
//! }
//!
//! let store = Store::new(AppState::default(), reducer).into_ref();
//! let provider = Provider::new(store.clone());
//!
//! let counter = Connect::new()
//!     .map_state(StateMapper::new(|s: &AppState| props! { "count" => s.count }))
//!     .map_dispatch(ActionCreators::new().with("increment", || CounterAction::Increment))
//!     .wrap(ComponentType::new("Counter"));
//!
//! let node = counter.instantiate(Props::new(), None, &provider.context())?;
//! node.mount();
//!
//! let element = node.render(&ElementRenderer)?;
//! element.props().get_callback("increment").unwrap().call(&[]);
//! assert!(node.needs_render());
//! ```
//!
//! # Render loop
//!
//! Store notifications only mark an instance dirty. Drive rendering from
//! your own loop, either by polling [`ConnectedNode::needs_render`] or by
//! registering a hook with [`ConnectedNode::on_update`]:
//!
//! ```ignore
//! let dirty = Rc::new(Cell::new(false));
//! let flag = dirty.clone();
//! node.on_update(move || flag.set(true));
//!
//! loop {
//!     if dirty.replace(false) {
//!         let element = node.render(&ElementRenderer)?;
//!         terminal.draw(|frame| element.draw(frame, frame.area()))?;
//!     }
//!     // ... event handling, dispatching actions
//! }
//! ```

pub mod action;
pub mod bind;
pub mod component;
pub mod connect;
pub mod error;
pub mod props;
pub mod provider;
pub mod render;
pub mod store;
pub mod testing;

// Core trait exports
pub use action::Action;
pub use component::{
    connect_display_name, hoist_statics, ComponentBuilder, ComponentType, View, RESERVED_STATICS,
};
pub use error::{BoxError, ConnectError};
pub use props::{shallow_equal, Callback, PropValue, Props};
pub use render::{Element, ElementRenderer, Renderer};

// Dispatch exports
pub use bind::{
    bind_action_creator, bind_action_creators, ActionCreator, ActionCreators, Dispatcher,
    DISPATCH_PROP,
};

// Store exports
pub use store::{
    Listener, LoggingMiddleware, Middleware, NoopMiddleware, Reducer, Store, StoreApi, StoreRef,
    Subscription,
};

// Connect exports
pub use connect::{
    connect, default_merge_props, Changes, Connect, ConnectConfig, ConnectOptions, Connected,
    ConnectedNode, DispatchMapper, MapResult, Mapped, MergeProps, Phase, PropsCache,
    RecomputeInput, StateMapper,
};
pub use provider::{only_child, Provider, StoreContext};

// Re-export ratatui types for convenience
pub use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    Frame,
};

// Testing exports
pub use testing::{
    buffer_rect_to_string_plain, buffer_to_string_plain, render_to_string, RecordingMiddleware,
    RecordingRenderer, RenderHarness,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::action::Action;
    pub use crate::bind::{ActionCreators, Dispatcher};
    pub use crate::component::{ComponentType, View};
    pub use crate::connect::{
        connect, Connect, ConnectOptions, Connected, ConnectedNode, DispatchMapper, Mapped,
        MergeProps, StateMapper,
    };
    pub use crate::error::ConnectError;
    pub use crate::props;
    pub use crate::props::{Callback, PropValue, Props};
    pub use crate::provider::{Provider, StoreContext};
    pub use crate::render::{Element, ElementRenderer, Renderer};
    pub use crate::store::{
        LoggingMiddleware, Middleware, NoopMiddleware, Reducer, Store, StoreApi, StoreRef,
    };

    // Re-export ratatui types
    pub use ratatui::{
        layout::Rect,
        style::{Color, Modifier, Style},
        text::{Line, Span, Text},
        Frame,
    };
}
