//! Action trait for values dispatched through a store

use std::fmt::Debug;

/// Marker trait for actions that can be dispatched to a store
///
/// Connected components never construct actions themselves; they receive
/// dispatch-derived props (callbacks or a [`Dispatcher`](crate::Dispatcher))
/// that forward actions to the store they were connected to.
///
/// Use `#[derive(Action)]` from `tui-connect-macros` to auto-implement this trait.
pub trait Action: Clone + Debug + 'static {
    /// Get the action name for logging
    fn name(&self) -> &'static str;
}
