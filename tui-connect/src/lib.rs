//! tui-connect: bind centralized stores to ratatui component trees
//!
//! Components stay pure functions of their props. A connected wrapper maps
//! store state and dispatch into props, recomputes them only when their
//! inputs changed, and reuses the previous rendered node otherwise.
//!
//! # Example
//! ```ignore
//! use tui_connect::prelude::*;
//!
//! #[derive(Action, Clone, Debug)]
//! enum TodoAction {
//!     Toggle(i64),
//!     ClearDone,
//! }
//!
//! let todo_list = Connect::new()
//!     .map_state(StateMapper::new(|s: &TodoState| props! { "items" => s.items.len() }))
//!     .map_dispatch(ActionCreators::new().with("clear_done", || TodoAction::ClearDone))
//!     .wrap(ComponentType::new("TodoList"));
//!
//! let node = todo_list.instantiate(Props::new(), None, &provider.context())?;
//! node.mount();
//! ```

// Re-export everything from core
pub use tui_connect_core::*;

// Re-export derive macros
pub use tui_connect_macros::Action;

/// Prelude for convenient imports
pub mod prelude {
    pub use tui_connect_core::prelude::*;

    // Derive macros
    pub use tui_connect_macros::Action;
}
