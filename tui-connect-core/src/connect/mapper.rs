//! State/dispatch mappers and the props merger
//!
//! Whether a mapper reads the instance's own props is declared up front by
//! the variant it is built with, never inferred. Mappers that ignore own
//! props are not re-run when only own props change.
//!
//! Either mapper may also act as a *factory*: if its first result is
//! [`Mapped::Mapper`], the returned mapper replaces it for the rest of that
//! instance's life and is invoked right away to produce the actual props.
//!
//! A result that is not a mapping logs a warning and is then spread into
//! props the way a record spread treats it: a list contributes its items
//! under their indices (`"0"`, `"1"`, ...), while scalars, opaque values and
//! a second-level mapper contribute no keys.

use std::fmt;
use std::rc::Rc;

use crate::bind::{bind_action_creators, ActionCreators, Dispatcher, DISPATCH_PROP};
use crate::error::BoxError;
use crate::props::{PropValue, Props};
use crate::Action;

/// What a mapper produced
pub enum Mapped<M> {
    /// Props for the component; anything but [`PropValue::Map`] is reported
    /// and treated as an empty mapping
    Value(PropValue),
    /// A per-instance mapper to use from now on
    Mapper(M),
}

impl<M> Mapped<M> {
    pub fn props(props: Props) -> Self {
        Mapped::Value(props.into())
    }
}

impl<M> From<Props> for Mapped<M> {
    fn from(props: Props) -> Self {
        Mapped::props(props)
    }
}

impl<M> From<PropValue> for Mapped<M> {
    fn from(value: PropValue) -> Self {
        Mapped::Value(value)
    }
}

impl<M> fmt::Debug for Mapped<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mapped::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Mapped::Mapper(_) => f.write_str("Mapper(..)"),
        }
    }
}

pub type MapResult<M> = Result<Mapped<M>, BoxError>;

type StateFn<S> = dyn Fn(&S) -> MapResult<StateMapper<S>>;
type StateWithPropsFn<S> = dyn Fn(&S, &Props) -> MapResult<StateMapper<S>>;

/// Derives props from store state
pub enum StateMapper<S> {
    WithoutOwnProps(Rc<StateFn<S>>),
    WithOwnProps(Rc<StateWithPropsFn<S>>),
}

impl<S> Clone for StateMapper<S> {
    fn clone(&self) -> Self {
        match self {
            StateMapper::WithoutOwnProps(f) => StateMapper::WithoutOwnProps(f.clone()),
            StateMapper::WithOwnProps(f) => StateMapper::WithOwnProps(f.clone()),
        }
    }
}

impl<S: 'static> StateMapper<S> {
    pub fn new(f: impl Fn(&S) -> Props + 'static) -> Self {
        StateMapper::WithoutOwnProps(Rc::new(move |state: &S| -> MapResult<Self> {
            Ok(f(state).into())
        }))
    }

    pub fn with_own_props(f: impl Fn(&S, &Props) -> Props + 'static) -> Self {
        StateMapper::WithOwnProps(Rc::new(move |state: &S, own: &Props| -> MapResult<Self> {
            Ok(f(state, own).into())
        }))
    }

    pub fn try_new(f: impl Fn(&S) -> Result<Props, BoxError> + 'static) -> Self {
        StateMapper::WithoutOwnProps(Rc::new(move |state: &S| -> MapResult<Self> {
            f(state).map(Mapped::from)
        }))
    }

    pub fn try_with_own_props(
        f: impl Fn(&S, &Props) -> Result<Props, BoxError> + 'static,
    ) -> Self {
        StateMapper::WithOwnProps(Rc::new(move |state: &S, own: &Props| -> MapResult<Self> {
            f(state, own).map(Mapped::from)
        }))
    }

    /// Full control over the result, including factory returns.
    pub fn from_fn(f: impl Fn(&S) -> MapResult<Self> + 'static) -> Self {
        StateMapper::WithoutOwnProps(Rc::new(f))
    }

    pub fn from_fn_with_own_props(f: impl Fn(&S, &Props) -> MapResult<Self> + 'static) -> Self {
        StateMapper::WithOwnProps(Rc::new(f))
    }

    /// A mapper factory: `make` runs once per instance, on its first
    /// computation, and picks the mapper that instance uses afterwards.
    pub fn factory(make: impl Fn(&S, &Props) -> StateMapper<S> + 'static) -> Self {
        StateMapper::WithOwnProps(Rc::new(move |state: &S, own: &Props| -> MapResult<Self> {
            Ok(Mapped::Mapper(make(state, own)))
        }))
    }

    /// Mapper used when none is configured.
    pub(crate) fn empty() -> Self {
        Self::new(|_| Props::new())
    }
}

impl<S> StateMapper<S> {
    pub fn depends_on_own_props(&self) -> bool {
        matches!(self, StateMapper::WithOwnProps(_))
    }

    pub(crate) fn call(&self, state: &S, own_props: &Props) -> MapResult<Self> {
        match self {
            StateMapper::WithoutOwnProps(f) => f(state),
            StateMapper::WithOwnProps(f) => f(state, own_props),
        }
    }
}

impl<S> fmt::Debug for StateMapper<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateMapper::WithoutOwnProps(_) => f.write_str("StateMapper::WithoutOwnProps"),
            StateMapper::WithOwnProps(_) => f.write_str("StateMapper::WithOwnProps"),
        }
    }
}

type DispatchFn<A> = dyn Fn(&Dispatcher<A>) -> MapResult<DispatchMapper<A>>;
type DispatchWithPropsFn<A> = dyn Fn(&Dispatcher<A>, &Props) -> MapResult<DispatchMapper<A>>;

/// Derives props from the instance's dispatcher
pub enum DispatchMapper<A> {
    WithoutOwnProps(Rc<DispatchFn<A>>),
    WithOwnProps(Rc<DispatchWithPropsFn<A>>),
}

impl<A> Clone for DispatchMapper<A> {
    fn clone(&self) -> Self {
        match self {
            DispatchMapper::WithoutOwnProps(f) => DispatchMapper::WithoutOwnProps(f.clone()),
            DispatchMapper::WithOwnProps(f) => DispatchMapper::WithOwnProps(f.clone()),
        }
    }
}

impl<A: Action> DispatchMapper<A> {
    pub fn new(f: impl Fn(&Dispatcher<A>) -> Props + 'static) -> Self {
        DispatchMapper::WithoutOwnProps(Rc::new(move |dispatch: &Dispatcher<A>| -> MapResult<Self> {
            Ok(f(dispatch).into())
        }))
    }

    pub fn with_own_props(f: impl Fn(&Dispatcher<A>, &Props) -> Props + 'static) -> Self {
        DispatchMapper::WithOwnProps(Rc::new(move |dispatch: &Dispatcher<A>, own: &Props| -> MapResult<Self> {
            Ok(f(dispatch, own).into())
        }))
    }

    pub fn try_new(f: impl Fn(&Dispatcher<A>) -> Result<Props, BoxError> + 'static) -> Self {
        DispatchMapper::WithoutOwnProps(Rc::new(move |dispatch: &Dispatcher<A>| -> MapResult<Self> {
            f(dispatch).map(Mapped::from)
        }))
    }

    pub fn try_with_own_props(
        f: impl Fn(&Dispatcher<A>, &Props) -> Result<Props, BoxError> + 'static,
    ) -> Self {
        DispatchMapper::WithOwnProps(Rc::new(move |dispatch: &Dispatcher<A>, own: &Props| -> MapResult<Self> {
            f(dispatch, own).map(Mapped::from)
        }))
    }

    pub fn from_fn(f: impl Fn(&Dispatcher<A>) -> MapResult<Self> + 'static) -> Self {
        DispatchMapper::WithoutOwnProps(Rc::new(f))
    }

    pub fn from_fn_with_own_props(
        f: impl Fn(&Dispatcher<A>, &Props) -> MapResult<Self> + 'static,
    ) -> Self {
        DispatchMapper::WithOwnProps(Rc::new(f))
    }

    /// See [`StateMapper::factory`].
    pub fn factory(make: impl Fn(&Dispatcher<A>, &Props) -> DispatchMapper<A> + 'static) -> Self {
        DispatchMapper::WithOwnProps(Rc::new(move |dispatch: &Dispatcher<A>, own: &Props| -> MapResult<Self> {
            Ok(Mapped::Mapper(make(dispatch, own)))
        }))
    }

    /// Bind each action creator to the dispatcher.
    pub fn from_action_creators(creators: ActionCreators<A>) -> Self {
        Self::new(move |dispatch| bind_action_creators(&creators, dispatch))
    }

    /// Mapper used when none is configured: exposes the dispatcher itself
    /// under [`DISPATCH_PROP`].
    pub(crate) fn dispatch_only() -> Self {
        Self::new(|dispatch| Props::new().with(DISPATCH_PROP, dispatch.to_prop()))
    }
}

impl<A> DispatchMapper<A> {
    pub fn depends_on_own_props(&self) -> bool {
        matches!(self, DispatchMapper::WithOwnProps(_))
    }

    pub(crate) fn call(&self, dispatch: &Dispatcher<A>, own_props: &Props) -> MapResult<Self> {
        match self {
            DispatchMapper::WithoutOwnProps(f) => f(dispatch),
            DispatchMapper::WithOwnProps(f) => f(dispatch, own_props),
        }
    }
}

impl<A: Action> From<ActionCreators<A>> for DispatchMapper<A> {
    fn from(creators: ActionCreators<A>) -> Self {
        Self::from_action_creators(creators)
    }
}

impl<A> fmt::Debug for DispatchMapper<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchMapper::WithoutOwnProps(_) => f.write_str("DispatchMapper::WithoutOwnProps"),
            DispatchMapper::WithOwnProps(_) => f.write_str("DispatchMapper::WithOwnProps"),
        }
    }
}

type MergeFn = dyn Fn(&Props, &Props, &Props) -> PropValue;

/// Combines state props, dispatch props and own props
#[derive(Clone, Default)]
pub enum MergeProps {
    /// Own props, overridden by state props, overridden by dispatch props
    #[default]
    Default,
    Custom(Rc<MergeFn>),
}

impl MergeProps {
    pub fn custom(f: impl Fn(&Props, &Props, &Props) -> Props + 'static) -> Self {
        MergeProps::Custom(Rc::new(move |state: &Props, dispatch: &Props, own: &Props| -> PropValue {
            f(state, dispatch, own).into()
        }))
    }

    /// A merger whose result is checked for shape at runtime.
    pub fn custom_value(f: impl Fn(&Props, &Props, &Props) -> PropValue + 'static) -> Self {
        MergeProps::Custom(Rc::new(f))
    }

    pub fn is_default(&self) -> bool {
        matches!(self, MergeProps::Default)
    }
}

impl fmt::Debug for MergeProps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeProps::Default => f.write_str("MergeProps::Default"),
            MergeProps::Custom(_) => f.write_str("MergeProps::Custom"),
        }
    }
}

/// `{...own, ...state, ...dispatch}`
pub fn default_merge_props(state_props: &Props, dispatch_props: &Props, own_props: &Props) -> Props {
    let mut merged = own_props.clone();
    merged.assign(state_props);
    merged.assign(dispatch_props);
    merged
}

/// Accept a mapper result as props, warning on anything that is not a mapping.
pub(crate) fn expect_props<M>(mapped: Mapped<M>, component: &str, function: &'static str) -> Props {
    let value = match mapped {
        Mapped::Value(PropValue::Map(map)) => {
            return Rc::try_unwrap(map).unwrap_or_else(|map| (*map).clone());
        }
        Mapped::Value(value) => value,
        Mapped::Mapper(_) => {
            tracing::warn!(
                component = %component,
                function,
                "{}() in {} must return a plain mapping. Instead received a mapper.",
                function,
                component
            );
            return Props::new();
        }
    };

    tracing::warn!(
        component = %component,
        function,
        received = ?value,
        "{}() in {} must return a plain mapping. Instead received a {} value.",
        function,
        component,
        value.kind()
    );
    spread(value)
}

fn spread(value: PropValue) -> Props {
    match value {
        PropValue::List(items) => items
            .iter()
            .enumerate()
            .fold(Props::new(), |props, (index, item)| {
                props.with(index.to_string(), item.clone())
            }),
        _ => Props::new(),
    }
}
