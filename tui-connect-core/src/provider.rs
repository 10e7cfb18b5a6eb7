//! Store provider and the explicit store context it hands down

use std::fmt;
use std::rc::Rc;

use crate::error::ConnectError;
use crate::store::StoreRef;

/// Store handle threaded from a [`Provider`] to connected descendants
pub struct StoreContext<S, A> {
    store: Option<StoreRef<S, A>>,
}

impl<S, A> Clone for StoreContext<S, A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S, A> Default for StoreContext<S, A> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<S, A> StoreContext<S, A> {
    /// A context with no store
    pub fn empty() -> Self {
        Self { store: None }
    }

    pub fn with_store(store: StoreRef<S, A>) -> Self {
        Self { store: Some(store) }
    }

    pub fn store(&self) -> Option<&StoreRef<S, A>> {
        self.store.as_ref()
    }

    /// Pick the store for an instance: `explicit` wins over the context.
    pub fn resolve(&self, explicit: Option<StoreRef<S, A>>) -> Option<StoreRef<S, A>> {
        explicit.or_else(|| self.store.clone())
    }
}

impl<S, A> fmt::Debug for StoreContext<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreContext")
            .field("has_store", &self.store.is_some())
            .finish()
    }
}

/// Makes a store available to the connected components beneath it
pub struct Provider<S, A> {
    store: StoreRef<S, A>,
}

impl<S, A> Provider<S, A> {
    pub fn new(store: StoreRef<S, A>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &StoreRef<S, A> {
        &self.store
    }

    pub fn context(&self) -> StoreContext<S, A> {
        StoreContext::with_store(self.store.clone())
    }

    /// Attempt to swap the provided store.
    ///
    /// Changing the store on the fly is not supported: a different store is
    /// ignored with a warning.
    pub fn replace_store(&mut self, store: StoreRef<S, A>) {
        if !Rc::ptr_eq(&self.store, &store) {
            tracing::warn!(
                "<Provider> does not support changing `store` on the fly; keeping the original store"
            );
        }
    }

    /// Render the provider's single child.
    pub fn render_child<N>(&self, children: Vec<N>) -> Result<N, ConnectError> {
        only_child(children)
    }
}

impl<S, A> fmt::Debug for Provider<S, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider").finish_non_exhaustive()
    }
}

/// Take the only element of `children`, rejecting zero or several.
pub fn only_child<N>(children: Vec<N>) -> Result<N, ConnectError> {
    let count = children.len();
    let mut iter = children.into_iter();
    match (iter.next(), count) {
        (Some(child), 1) => Ok(child),
        _ => Err(ConnectError::ProviderChildCount { count }),
    }
}
