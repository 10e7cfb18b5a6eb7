//! Dispatch handles and action-creator binding

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::props::{Callback, PropValue, Props};
use crate::store::StoreRef;
use crate::Action;

/// Prop name under which the default dispatch mapper exposes the dispatcher
pub const DISPATCH_PROP: &str = "dispatch";

struct DispatchFn<A>(Box<dyn Fn(A)>);

/// Cloneable handle that forwards actions to a store
///
/// Clones share identity, and so does the prop made from a dispatcher: the
/// default `dispatch` prop stays shallow-equal across recomputations.
pub struct Dispatcher<A> {
    inner: Rc<DispatchFn<A>>,
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<A: Action> Dispatcher<A> {
    pub fn new(func: impl Fn(A) + 'static) -> Self {
        Self {
            inner: Rc::new(DispatchFn(Box::new(func))),
        }
    }

    /// Dispatcher bound to a store.
    pub fn for_store<S: 'static>(store: StoreRef<S, A>) -> Self {
        Self::new(move |action| store.dispatch(action))
    }

    pub fn dispatch(&self, action: A) {
        (self.inner.0)(action)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// This dispatcher as an opaque prop value.
    pub fn to_prop(&self) -> PropValue {
        PropValue::Opaque(self.inner.clone())
    }

    /// Recover a dispatcher previously stored with [`to_prop`](Self::to_prop).
    pub fn from_prop(value: &PropValue) -> Option<Self> {
        match value {
            PropValue::Opaque(any) => any
                .clone()
                .downcast::<DispatchFn<A>>()
                .ok()
                .map(|inner| Self { inner }),
            _ => None,
        }
    }
}

impl<A> fmt::Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dispatcher(..)")
    }
}

/// Function producing an action from positional arguments
pub type ActionCreator<A> = Rc<dyn Fn(&[PropValue]) -> A>;

/// Named set of action creators
///
/// Passed as the dispatch mapper, each entry becomes a callback prop that
/// dispatches whatever the creator returns.
pub struct ActionCreators<A> {
    creators: IndexMap<String, ActionCreator<A>>,
}

impl<A> Clone for ActionCreators<A> {
    fn clone(&self) -> Self {
        Self {
            creators: self.creators.clone(),
        }
    }
}

impl<A> Default for ActionCreators<A> {
    fn default() -> Self {
        Self {
            creators: IndexMap::new(),
        }
    }
}

impl<A: Action> ActionCreators<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a creator that ignores its arguments.
    pub fn with(self, name: impl Into<String>, creator: impl Fn() -> A + 'static) -> Self {
        self.with_args(name, move |_| creator())
    }

    /// Add a creator that reads positional arguments.
    pub fn with_args(
        mut self,
        name: impl Into<String>,
        creator: impl Fn(&[PropValue]) -> A + 'static,
    ) -> Self {
        self.creators.insert(name.into(), Rc::new(creator));
        self
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.creators.keys().map(String::as_str)
    }
}

impl<A> fmt::Debug for ActionCreators<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.creators.keys()).finish()
    }
}

/// Turn one action creator into a callback that dispatches its result.
pub fn bind_action_creator<A: Action>(
    name: &str,
    creator: ActionCreator<A>,
    dispatcher: &Dispatcher<A>,
) -> Callback {
    let dispatcher = dispatcher.clone();
    Callback::new(name, move |args| dispatcher.dispatch(creator(args)))
}

/// Bind every creator, producing one callback prop per entry.
pub fn bind_action_creators<A: Action>(
    creators: &ActionCreators<A>,
    dispatcher: &Dispatcher<A>,
) -> Props {
    creators
        .creators
        .iter()
        .map(|(name, creator)| {
            (
                name.clone(),
                bind_action_creator(name, creator.clone(), dispatcher),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Increment,
        Add(i64),
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            match self {
                TestAction::Increment => "Increment",
                TestAction::Add(_) => "Add",
            }
        }
    }

    fn recording_dispatcher() -> (Dispatcher<TestAction>, Rc<RefCell<Vec<TestAction>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let l = log.clone();
        (Dispatcher::new(move |a| l.borrow_mut().push(a)), log)
    }

    #[test]
    fn test_bound_creator_dispatches_result() {
        let (dispatcher, log) = recording_dispatcher();
        let creators = ActionCreators::new()
            .with("increment", || TestAction::Increment)
            .with_args("add", |args| {
                TestAction::Add(args.first().and_then(PropValue::as_int).unwrap_or(0))
            });

        let props = bind_action_creators(&creators, &dispatcher);
        assert_eq!(props.len(), 2);

        props.get_callback("increment").unwrap().call(&[]);
        props.get_callback("add").unwrap().call(&[PropValue::Int(5)]);

        assert_eq!(
            *log.borrow(),
            vec![TestAction::Increment, TestAction::Add(5)]
        );
    }

    #[test]
    fn test_dispatcher_prop_roundtrip_keeps_identity() {
        let (dispatcher, log) = recording_dispatcher();
        let prop = dispatcher.to_prop();

        let recovered = Dispatcher::<TestAction>::from_prop(&prop).unwrap();
        assert!(recovered.ptr_eq(&dispatcher));
        assert!(prop.same(&dispatcher.to_prop()));

        recovered.dispatch(TestAction::Increment);
        assert_eq!(log.borrow().len(), 1);
    }
}
