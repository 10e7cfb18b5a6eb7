//! Per-instance props cache and the recomputation decision table

use bitflags::bitflags;

use super::mapper::{expect_props, DispatchMapper, Mapped, StateMapper};
use super::ConnectConfig;
use crate::bind::Dispatcher;
use crate::error::{BoxError, ConnectError};
use crate::props::Props;

bitflags! {
    /// Which stages changed during one recomputation
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Changes: u8 {
        const STATE_PROPS = 1 << 0;
        const DISPATCH_PROPS = 1 << 1;
        const OWN_PROPS = 1 << 2;
        const MERGED_PROPS = 1 << 3;
    }
}

/// Everything a recomputation reads
pub struct RecomputeInput<'a, S, A> {
    pub config: &'a ConnectConfig<S, A>,
    /// Display name, for diagnostics
    pub component: &'a str,
    pub state: &'a S,
    pub dispatcher: &'a Dispatcher<A>,
    pub own_props: &'a Props,
}

/// Cached props, rendered node and dirty flags of one live instance
///
/// All fields are reset together by [`clear`](PropsCache::clear).
pub struct PropsCache<S, A, N> {
    state_props: Option<Props>,
    dispatch_props: Option<Props>,
    merged_props: Option<Props>,
    rendered: Option<N>,
    have_own_props_changed: bool,
    has_store_state_changed: bool,
    state_props_precalculated: bool,
    precalculation_error: Option<ConnectError>,
    state_mapper: Option<StateMapper<S>>,
    dispatch_mapper: Option<DispatchMapper<A>>,
}

impl<S, A, N> Default for PropsCache<S, A, N> {
    fn default() -> Self {
        Self {
            state_props: None,
            dispatch_props: None,
            merged_props: None,
            rendered: None,
            have_own_props_changed: true,
            has_store_state_changed: true,
            state_props_precalculated: false,
            precalculation_error: None,
            state_mapper: None,
            dispatch_mapper: None,
        }
    }
}

impl<S, A, N> PropsCache<S, A, N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything, including finalized mappers.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn state_props(&self) -> Option<&Props> {
        self.state_props.as_ref()
    }

    pub fn dispatch_props(&self) -> Option<&Props> {
        self.dispatch_props.as_ref()
    }

    pub fn merged_props(&self) -> Option<&Props> {
        self.merged_props.as_ref()
    }

    pub fn rendered(&self) -> Option<&N> {
        self.rendered.as_ref()
    }

    pub fn set_rendered(&mut self, node: N) {
        self.rendered = Some(node);
    }

    pub fn mark_own_props_changed(&mut self) {
        self.have_own_props_changed = true;
    }

    /// False until the state mapper has been finalized.
    pub fn state_depends_on_own_props(&self) -> bool {
        self.state_mapper
            .as_ref()
            .is_some_and(StateMapper::depends_on_own_props)
    }

    /// False until the dispatch mapper has been finalized.
    pub fn dispatch_depends_on_own_props(&self) -> bool {
        self.dispatch_mapper
            .as_ref()
            .is_some_and(DispatchMapper::depends_on_own_props)
    }

    fn compute_state_props(&mut self, input: &RecomputeInput<'_, S, A>) -> Result<Props, ConnectError> {
        const FUNCTION: &str = "map_state_to_props";

        let mapper = match self.state_mapper.clone() {
            Some(mapper) => mapper,
            None => {
                let configured = input.config.map_state.clone();
                let mapped = configured
                    .call(input.state, input.own_props)
                    .map_err(|source| mapper_error(input.component, FUNCTION, source))?;
                return match mapped {
                    Mapped::Mapper(real) => {
                        tracing::trace!(component = %input.component, "state mapper factory resolved");
                        self.state_mapper = Some(real);
                        self.compute_state_props(input)
                    }
                    Mapped::Value(value) => {
                        self.state_mapper = Some(configured);
                        Ok(expect_props::<()>(value.into(), input.component, FUNCTION))
                    }
                };
            }
        };

        let mapped = mapper
            .call(input.state, input.own_props)
            .map_err(|source| mapper_error(input.component, FUNCTION, source))?;
        Ok(expect_props(mapped, input.component, FUNCTION))
    }

    fn compute_dispatch_props(
        &mut self,
        input: &RecomputeInput<'_, S, A>,
    ) -> Result<Props, ConnectError> {
        const FUNCTION: &str = "map_dispatch_to_props";

        let mapper = match self.dispatch_mapper.clone() {
            Some(mapper) => mapper,
            None => {
                let configured = input.config.map_dispatch.clone();
                let mapped = configured
                    .call(input.dispatcher, input.own_props)
                    .map_err(|source| mapper_error(input.component, FUNCTION, source))?;
                return match mapped {
                    Mapped::Mapper(real) => {
                        tracing::trace!(component = %input.component, "dispatch mapper factory resolved");
                        self.dispatch_mapper = Some(real);
                        self.compute_dispatch_props(input)
                    }
                    Mapped::Value(value) => {
                        self.dispatch_mapper = Some(configured);
                        Ok(expect_props::<()>(value.into(), input.component, FUNCTION))
                    }
                };
            }
        };

        let mapped = mapper
            .call(input.dispatcher, input.own_props)
            .map_err(|source| mapper_error(input.component, FUNCTION, source))?;
        Ok(expect_props(mapped, input.component, FUNCTION))
    }

    /// Recompute state props; `true` if they differ (shallowly) from the cache.
    pub fn update_state_props(
        &mut self,
        input: &RecomputeInput<'_, S, A>,
    ) -> Result<bool, ConnectError> {
        let next = self.compute_state_props(input)?;
        if self
            .state_props
            .as_ref()
            .is_some_and(|prev| prev.shallow_eq(&next))
        {
            return Ok(false);
        }
        self.state_props = Some(next);
        Ok(true)
    }

    /// Recompute dispatch props; `true` if they differ (shallowly) from the cache.
    pub fn update_dispatch_props(
        &mut self,
        input: &RecomputeInput<'_, S, A>,
    ) -> Result<bool, ConnectError> {
        let next = self.compute_dispatch_props(input)?;
        if self
            .dispatch_props
            .as_ref()
            .is_some_and(|prev| prev.shallow_eq(&next))
        {
            return Ok(false);
        }
        self.dispatch_props = Some(next);
        Ok(true)
    }

    /// Re-merge; `true` unless the merge is compared and found unchanged.
    pub fn update_merged_props(&mut self, input: &RecomputeInput<'_, S, A>) -> bool {
        let empty = Props::new();
        let next = input.config.merge(
            self.state_props.as_ref().unwrap_or(&empty),
            self.dispatch_props.as_ref().unwrap_or(&empty),
            input.own_props,
            input.component,
        );

        if input.config.check_merged_equals()
            && self
                .merged_props
                .as_ref()
                .is_some_and(|prev| prev.shallow_eq(&next))
        {
            return false;
        }
        self.merged_props = Some(next);
        true
    }

    /// Opportunistic work done when the store publishes a new snapshot.
    ///
    /// In pure mode, a state mapper that ignores own props is run right away;
    /// if its output is unchanged nothing needs to happen and `false` is
    /// returned. A mapper error is stored and surfaces from the next
    /// [`recompute`](Self::recompute). Returns whether a render is needed.
    pub fn on_store_change(&mut self, input: &RecomputeInput<'_, S, A>) -> bool {
        if input.config.options.pure && !self.state_depends_on_own_props() {
            match self.update_state_props(input) {
                Ok(false) => return false,
                Ok(true) => {}
                Err(err) => {
                    tracing::debug!(
                        component = %input.component,
                        error = %err,
                        "state props failed during store notification; deferring to render"
                    );
                    self.precalculation_error = Some(err);
                }
            }
            self.state_props_precalculated = true;
        }
        self.has_store_state_changed = true;
        true
    }

    /// Bring every stage up to date for a render.
    ///
    /// Consumes the dirty flags. Returns the stages that changed; when
    /// [`Changes::MERGED_PROPS`] is absent and a node was rendered before,
    /// that node is still valid.
    pub fn recompute(&mut self, input: &RecomputeInput<'_, S, A>) -> Result<Changes, ConnectError> {
        let own_props_changed = std::mem::take(&mut self.have_own_props_changed);
        let store_state_changed = std::mem::take(&mut self.has_store_state_changed);
        let precalculated = std::mem::take(&mut self.state_props_precalculated);
        if let Some(err) = self.precalculation_error.take() {
            return Err(err);
        }

        let pure = input.config.options.pure;
        let (should_update_state, should_update_dispatch) = if pure && self.rendered.is_some() {
            (
                store_state_changed || (own_props_changed && self.state_depends_on_own_props()),
                own_props_changed && self.dispatch_depends_on_own_props(),
            )
        } else {
            (true, true)
        };

        let mut changes = Changes::empty();
        changes.set(Changes::OWN_PROPS, own_props_changed);

        let state_changed = if precalculated {
            true
        } else if should_update_state {
            self.update_state_props(input)?
        } else {
            false
        };
        changes.set(Changes::STATE_PROPS, state_changed);

        let dispatch_changed = should_update_dispatch && self.update_dispatch_props(input)?;
        changes.set(Changes::DISPATCH_PROPS, dispatch_changed);

        let must_merge = !pure || !changes.is_empty() || self.merged_props.is_none();
        if must_merge && self.update_merged_props(input) {
            changes.insert(Changes::MERGED_PROPS);
        }

        Ok(changes)
    }
}

fn mapper_error(component: &str, function: &'static str, source: BoxError) -> ConnectError {
    ConnectError::Mapper {
        component: component.to_string(),
        function,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connect::{Connect, MergeProps};
    use crate::{props, Action, ComponentType};
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Debug)]
    struct Noop;

    impl Action for Noop {
        fn name(&self) -> &'static str {
            "Noop"
        }
    }

    #[derive(Clone)]
    struct State {
        count: i64,
        label: &'static str,
    }

    fn config(connect: Connect<State, Noop>) -> Rc<ConnectConfig<State, Noop>> {
        connect.wrap(ComponentType::new("Test")).config
    }

    fn input<'a>(
        config: &'a ConnectConfig<State, Noop>,
        state: &'a State,
        dispatcher: &'a Dispatcher<Noop>,
        own_props: &'a Props,
    ) -> RecomputeInput<'a, State, Noop> {
        RecomputeInput {
            config,
            component: "Connect(Test)",
            state,
            dispatcher,
            own_props,
        }
    }

    fn counting_state_mapper(calls: Rc<Cell<u32>>) -> Connect<State, Noop> {
        Connect::new().map_state(crate::StateMapper::new(move |s: &State| {
            calls.set(calls.get() + 1);
            props! { "count" => s.count }
        }))
    }

    #[test]
    fn test_first_recompute_computes_everything() {
        let config = config(Connect::new());
        let dispatcher = Dispatcher::new(|_: Noop| {});
        let state = State { count: 0, label: "a" };
        let own = props! { "id" => 7 };
        let mut cache = PropsCache::<State, Noop, ()>::new();

        let changes = cache.recompute(&input(&config, &state, &dispatcher, &own)).unwrap();
        assert!(changes.contains(Changes::STATE_PROPS | Changes::DISPATCH_PROPS | Changes::MERGED_PROPS));

        let merged = cache.merged_props().unwrap();
        assert_eq!(merged.get_int("id"), Some(7));
        assert!(merged.contains_key("dispatch"));
    }

    #[test]
    fn test_unchanged_inputs_skip_merge() {
        let calls = Rc::new(Cell::new(0));
        let config = config(counting_state_mapper(calls.clone()));
        let dispatcher = Dispatcher::new(|_: Noop| {});
        let state = State { count: 1, label: "a" };
        let own = Props::new();
        let mut cache = PropsCache::<State, Noop, ()>::new();

        cache.recompute(&input(&config, &state, &dispatcher, &own)).unwrap();
        cache.set_rendered(());
        assert_eq!(calls.get(), 1);

        let changes = cache.recompute(&input(&config, &state, &dispatcher, &own)).unwrap();
        assert_eq!(changes, Changes::empty());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_store_change_with_equal_state_props_is_absorbed() {
        let calls = Rc::new(Cell::new(0));
        let config = config(counting_state_mapper(calls.clone()));
        let dispatcher = Dispatcher::new(|_: Noop| {});
        let own = Props::new();
        let mut cache = PropsCache::<State, Noop, ()>::new();

        let first = State { count: 1, label: "a" };
        cache.recompute(&input(&config, &first, &dispatcher, &own)).unwrap();
        cache.set_rendered(());

        // Only `label` changed, which the mapper ignores
        let second = State { count: 1, label: "b" };
        assert!(!cache.on_store_change(&input(&config, &second, &dispatcher, &own)));
        assert_eq!(calls.get(), 2);

        let third = State { count: 2, label: "b" };
        assert!(cache.on_store_change(&input(&config, &third, &dispatcher, &own)));
        let changes = cache.recompute(&input(&config, &third, &dispatcher, &own)).unwrap();
        assert!(changes.contains(Changes::STATE_PROPS | Changes::MERGED_PROPS));
        // precalculated result reused, not recomputed
        assert_eq!(calls.get(), 3);
        assert_eq!(cache.merged_props().unwrap().get_int("count"), Some(2));
    }

    #[test]
    fn test_own_props_only_rerun_dependent_mappers() {
        let calls = Rc::new(Cell::new(0));
        let config = config(counting_state_mapper(calls.clone()));
        let dispatcher = Dispatcher::new(|_: Noop| {});
        let state = State { count: 1, label: "a" };
        let mut cache = PropsCache::<State, Noop, ()>::new();

        cache
            .recompute(&input(&config, &state, &dispatcher, &props! { "x" => 1 }))
            .unwrap();
        cache.set_rendered(());

        cache.mark_own_props_changed();
        let changes = cache
            .recompute(&input(&config, &state, &dispatcher, &props! { "x" => 2 }))
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert!(changes.contains(Changes::OWN_PROPS | Changes::MERGED_PROPS));
        assert!(!changes.contains(Changes::STATE_PROPS));
        assert_eq!(cache.merged_props().unwrap().get_int("x"), Some(2));
    }

    #[test]
    fn test_precalculation_error_surfaces_once() {
        let fail = Rc::new(Cell::new(false));
        let f = fail.clone();
        let config = config(Connect::new().map_state(crate::StateMapper::try_new(
            move |s: &State| {
                if f.get() {
                    Err("mapper exploded".into())
                } else {
                    Ok(props! { "count" => s.count })
                }
            },
        )));
        let dispatcher = Dispatcher::new(|_: Noop| {});
        let own = Props::new();
        let mut cache = PropsCache::<State, Noop, ()>::new();

        let state = State { count: 1, label: "a" };
        cache.recompute(&input(&config, &state, &dispatcher, &own)).unwrap();
        cache.set_rendered(());

        fail.set(true);
        let next = State { count: 2, label: "a" };
        assert!(cache.on_store_change(&input(&config, &next, &dispatcher, &own)));

        let err = cache
            .recompute(&input(&config, &next, &dispatcher, &own))
            .unwrap_err();
        assert!(matches!(
            err,
            ConnectError::Mapper { function: "map_state_to_props", .. }
        ));

        fail.set(false);
        let changes = cache.recompute(&input(&config, &next, &dispatcher, &own)).unwrap();
        assert_eq!(changes, Changes::empty());
    }

    #[test]
    fn test_custom_merge_always_changes() {
        let config = config(
            Connect::new()
                .map_state(crate::StateMapper::new(|s: &State| props! { "count" => s.count }))
                .merge_props(MergeProps::custom(|_, _, _| props! { "fixed" => true })),
        );
        let dispatcher = Dispatcher::new(|_: Noop| {});
        let own = Props::new();
        let mut cache = PropsCache::<State, Noop, ()>::new();

        let state = State { count: 1, label: "a" };
        cache.recompute(&input(&config, &state, &dispatcher, &own)).unwrap();
        cache.set_rendered(());

        let next = State { count: 2, label: "a" };
        cache.on_store_change(&input(&config, &next, &dispatcher, &own));
        let changes = cache.recompute(&input(&config, &next, &dispatcher, &own)).unwrap();
        assert!(changes.contains(Changes::MERGED_PROPS));
    }

    #[test]
    fn test_clear_resets_finalized_mappers() {
        let made = Rc::new(Cell::new(0));
        let m = made.clone();
        let config = config(Connect::new().map_state(crate::StateMapper::factory(
            move |_: &State, _| {
                m.set(m.get() + 1);
                crate::StateMapper::new(|s: &State| props! { "count" => s.count })
            },
        )));
        let dispatcher = Dispatcher::new(|_: Noop| {});
        let own = Props::new();
        let state = State { count: 1, label: "a" };
        let mut cache = PropsCache::<State, Noop, ()>::new();

        cache.recompute(&input(&config, &state, &dispatcher, &own)).unwrap();
        assert_eq!(made.get(), 1);
        assert!(!cache.state_depends_on_own_props());

        cache.clear();
        assert!(cache.merged_props().is_none());
        cache.recompute(&input(&config, &state, &dispatcher, &own)).unwrap();
        assert_eq!(made.get(), 2);
    }
}
