//! End-to-end behavior of connected components against a real store

use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use tracing_subscriber::layer::SubscriberExt;
use tui_connect::prelude::*;
use tui_connect::testing::{render_to_string, RecordingMiddleware, RecordingRenderer};
use tui_connect::{assert_dispatched, count_dispatched, Phase, StoreRef, Subscription};

#[derive(Clone, Debug, Default)]
struct AppState {
    count: i64,
    label: String,
}

#[derive(Action, Clone, Debug, PartialEq)]
enum AppAction {
    Increment,
    Add(i64),
    Rename(String),
    Noop,
}

fn reducer(state: &mut AppState, action: AppAction) -> bool {
    match action {
        AppAction::Increment => {
            state.count += 1;
            true
        }
        AppAction::Add(n) => {
            state.count += n;
            true
        }
        AppAction::Rename(label) => {
            state.label = label;
            true
        }
        AppAction::Noop => false,
    }
}

fn new_store() -> StoreRef<AppState, AppAction> {
    Store::new(AppState::default(), reducer).into_ref()
}

fn count_mapper() -> StateMapper<AppState> {
    StateMapper::new(|s: &AppState| props! { "count" => s.count })
}

fn counter(connect: Connect<AppState, AppAction>) -> Connected<AppState, AppAction> {
    connect.wrap(ComponentType::new("Counter"))
}

fn mount(
    connected: &Connected<AppState, AppAction>,
    own_props: Props,
    store: &StoreRef<AppState, AppAction>,
) -> ConnectedNode<AppState, AppAction> {
    let provider = Provider::new(store.clone());
    let node = connected
        .instantiate(own_props, None, &provider.context())
        .unwrap();
    node.mount();
    node
}

/// Render only when the instance asked for it, like a frame loop would.
fn pump(node: &ConnectedNode<AppState, AppAction>, renderer: &RecordingRenderer) {
    if node.needs_render() {
        node.render(renderer).unwrap();
    }
}

#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs(f: impl FnOnce()) -> String {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::registry().with(
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(move || writer.clone()),
    );
    tracing::subscriber::with_default(subscriber, f);
    let bytes = logs.0.lock().unwrap().clone();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[test]
fn test_count_reaches_component_once() {
    let store = new_store();
    let node = mount(&counter(Connect::new().map_state(count_mapper())), Props::new(), &store);
    let renderer = RecordingRenderer::new();

    node.render(&renderer).unwrap();
    store.dispatch(AppAction::Increment);
    pump(&node, &renderer);

    // Same snapshot reference: nothing to do
    store.dispatch(AppAction::Noop);
    store.dispatch(AppAction::Noop);
    pump(&node, &renderer);
    node.render(&renderer).unwrap();

    let rendered = renderer.drain_rendered();
    let counts: Vec<_> = rendered.iter().map(|p| p.get_int("count")).collect();
    assert_eq!(counts, vec![Some(0), Some(1)]);
}

#[test]
fn test_without_state_mapper_never_subscribes() {
    let store = new_store();
    let node = mount(&counter(Connect::new()), Props::new(), &store);
    let renderer = RecordingRenderer::new();
    let first = node.render(&renderer).unwrap();

    assert_eq!(node.phase(), Phase::Mounted);
    for _ in 0..3 {
        store.dispatch(AppAction::Increment);
    }
    assert!(!node.needs_render());
    assert!(node.render(&renderer).unwrap().ptr_eq(&first));
    assert_eq!(renderer.render_count(), 1);

    // The default dispatch mapper exposes the dispatcher
    let dispatcher = Dispatcher::<AppAction>::from_prop(first.props().get("dispatch").unwrap())
        .expect("dispatch prop");
    dispatcher.dispatch(AppAction::Add(10));
    assert_eq!(store.state().count, 13);
}

#[test]
fn test_action_creators_dispatch_their_result() {
    let recorder = RecordingMiddleware::new();
    let store =
        Store::with_middleware(AppState::default(), reducer, recorder.clone()).into_ref();
    let connected = counter(
        Connect::new().map_state(count_mapper()).map_dispatch(
            ActionCreators::new()
                .with("increment", || AppAction::Increment)
                .with_args("add", |args| {
                    AppAction::Add(args.first().and_then(PropValue::as_int).unwrap_or(1))
                }),
        ),
    );
    let node = mount(&connected, Props::new(), &store);
    let element = node.render(&ElementRenderer).unwrap();

    element.props().get_callback("increment").unwrap().call(&[]);
    element
        .props()
        .get_callback("add")
        .unwrap()
        .call(&[PropValue::Int(5)]);

    let actions = recorder.drain();
    assert_dispatched!(actions, AppAction::Increment);
    assert_dispatched!(actions, AppAction::Add(5));
    assert_eq!(count_dispatched!(actions, AppAction::Increment), 1);
    assert_eq!(store.state().count, 6);

    assert!(node.needs_render());
    let element = node.render(&ElementRenderer).unwrap();
    assert_eq!(element.props().get_int("count"), Some(6));
}

#[test]
fn test_wrapped_instance_requires_with_ref() {
    let store = new_store();
    let node = mount(&counter(Connect::new().map_state(count_mapper())), Props::new(), &store);
    let err = node.wrapped_instance().unwrap_err();
    assert!(matches!(err, ConnectError::RefNotEnabled { .. }));
    assert!(err.to_string().contains("with_ref"));

    let with_ref = mount(
        &counter(
            Connect::new()
                .map_state(count_mapper())
                .options(ConnectOptions::from_json(r#"{"with_ref": true}"#).unwrap()),
        ),
        Props::new(),
        &store,
    );
    let element = with_ref.render(&ElementRenderer).unwrap();
    assert!(with_ref.wrapped_instance().unwrap().unwrap().ptr_eq(&element));
}

#[test]
fn test_missing_store_names_component() {
    let connected = counter(Connect::new().map_state(count_mapper()));
    let err = connected
        .instantiate::<Element>(Props::new(), None, &StoreContext::empty())
        .unwrap_err();

    assert_eq!(err.component(), Some("Connect(Counter)"));
    let msg = err.to_string();
    assert!(msg.contains("Connect(Counter)"));
    assert!(msg.contains("Provider"));
}

#[test]
fn test_explicit_store_wins_over_provider() {
    let explicit = new_store();
    explicit.dispatch(AppAction::Add(42));
    let provided = Provider::new(new_store());

    let node = counter(Connect::new().map_state(count_mapper()))
        .instantiate::<Element>(Props::new(), Some(explicit.clone()), &provided.context())
        .unwrap();
    let element = node.render(&ElementRenderer).unwrap();
    assert_eq!(element.props().get_int("count"), Some(42));
}

#[test]
fn test_unchanged_inputs_keep_node_identity() {
    let store = new_store();
    let node = mount(
        &counter(Connect::new().map_state(count_mapper())),
        props! { "title" => "clicks" },
        &store,
    );
    let first = node.render(&ElementRenderer).unwrap();

    store.dispatch(AppAction::Noop);
    store.dispatch(AppAction::Rename("ignored".into()));
    assert!(!node.set_own_props(props! { "title" => "clicks" }));

    assert!(node.render(&ElementRenderer).unwrap().ptr_eq(&first));
}

#[test]
fn test_equal_state_props_reuse_node() {
    let store = new_store();
    let calls = Rc::new(Cell::new(0));
    let c = calls.clone();
    let node = mount(
        &counter(Connect::new().map_state(StateMapper::new(move |s: &AppState| {
            c.set(c.get() + 1);
            props! { "count" => s.count }
        }))),
        Props::new(),
        &store,
    );
    let renderer = RecordingRenderer::new();
    let first = node.render(&renderer).unwrap();

    // New snapshot, same mapped output
    store.dispatch(AppAction::Rename("x".into()));
    assert_eq!(calls.get(), 2);
    assert!(node.render(&renderer).unwrap().ptr_eq(&first));
    assert_eq!(renderer.render_count(), 1);
}

#[test]
fn test_default_merge_precedence() {
    let store = new_store();
    store.dispatch(AppAction::Add(3));
    let connected = counter(
        Connect::new()
            .map_state(StateMapper::new(|s: &AppState| {
                props! { "b" => s.count, "c" => s.count }
            }))
            .map_dispatch(DispatchMapper::<AppAction>::new(|_| props! { "c" => "dispatch" })),
    );
    let node = mount(
        &connected,
        props! { "a" => "own", "b" => "own", "c" => "own" },
        &store,
    );

    let merged = node.render(&ElementRenderer).unwrap().props().clone();
    assert_eq!(merged.get_str("a"), Some("own"));
    assert_eq!(merged.get_int("b"), Some(3));
    assert_eq!(merged.get_str("c"), Some("dispatch"));
    assert_eq!(merged.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
}

#[test]
fn test_unsubscribe_is_idempotent() {
    let store = new_store();
    let updates = Rc::new(Cell::new(0));
    let node = mount(&counter(Connect::new().map_state(count_mapper())), Props::new(), &store);
    let u = updates.clone();
    node.on_update(move || u.set(u.get() + 1));

    node.unmount();
    node.unmount();
    store.dispatch(AppAction::Increment);
    assert_eq!(updates.get(), 0);
    assert_eq!(node.phase(), Phase::Unmounted);

    let heard = Rc::new(Cell::new(0));
    let h = heard.clone();
    let mut subscription: Subscription = store.subscribe(Rc::new(move || h.set(h.get() + 1)));
    store.dispatch(AppAction::Increment);
    subscription.unsubscribe();
    subscription.unsubscribe();
    drop(subscription);
    store.dispatch(AppAction::Increment);
    assert_eq!(heard.get(), 1);
}

#[test]
fn test_factory_mapper_runs_once_per_instance() {
    let store = new_store();
    let factory_calls = Rc::new(Cell::new(0));
    let mapper_calls = Rc::new(Cell::new(0));
    let (f, m) = (factory_calls.clone(), mapper_calls.clone());
    let connected = counter(Connect::new().map_state(StateMapper::factory(
        move |_: &AppState, own: &Props| {
            f.set(f.get() + 1);
            let step = own.get_int("step").unwrap_or(1);
            let m = m.clone();
            StateMapper::new(move |s: &AppState| {
                m.set(m.get() + 1);
                props! { "scaled" => s.count * step }
            })
        },
    )));

    let a = mount(&connected, props! { "step" => 2 }, &store);
    let b = mount(&connected, props! { "step" => 10 }, &store);
    a.render(&ElementRenderer).unwrap();
    b.render(&ElementRenderer).unwrap();
    assert_eq!(factory_calls.get(), 2);

    store.dispatch(AppAction::Increment);
    store.dispatch(AppAction::Increment);
    assert_eq!(a.render(&ElementRenderer).unwrap().props().get_int("scaled"), Some(4));
    assert_eq!(b.render(&ElementRenderer).unwrap().props().get_int("scaled"), Some(20));
    assert_eq!(factory_calls.get(), 2);
    assert_eq!(mapper_calls.get(), 2 + 4);

    // The factory result ignores own props, so own-prop changes reuse it
    a.set_own_props(props! { "step" => 3 });
    a.render(&ElementRenderer).unwrap();
    assert_eq!(mapper_calls.get(), 6);

    // Remounting starts over
    a.unmount();
    a.mount();
    assert_eq!(a.render(&ElementRenderer).unwrap().props().get_int("scaled"), Some(6));
    assert_eq!(factory_calls.get(), 3);
}

#[test]
fn test_own_props_dependent_mapper_reruns() {
    let store = new_store();
    let connected = counter(Connect::new().map_state(StateMapper::with_own_props(
        |s: &AppState, own: &Props| props! { "total" => s.count + own.get_int("base").unwrap_or(0) },
    )));
    let node = mount(&connected, props! { "base" => 100 }, &store);
    assert_eq!(node.render(&ElementRenderer).unwrap().props().get_int("total"), Some(100));

    assert!(node.set_own_props(props! { "base" => 200 }));
    assert_eq!(node.render(&ElementRenderer).unwrap().props().get_int("total"), Some(200));

    store.dispatch(AppAction::Increment);
    assert!(node.needs_render());
    assert_eq!(node.render(&ElementRenderer).unwrap().props().get_int("total"), Some(201));
}

#[test]
fn test_impure_rerenders_every_time() {
    let store = new_store();
    let node = mount(
        &counter(
            Connect::new()
                .map_state(count_mapper())
                .options(ConnectOptions::default().pure(false)),
        ),
        Props::new(),
        &store,
    );
    let renderer = RecordingRenderer::new();
    let first = node.render(&renderer).unwrap();
    let second = node.render(&renderer).unwrap();
    assert!(!first.ptr_eq(&second));

    // Even a no-op dispatch schedules a render
    store.dispatch(AppAction::Noop);
    assert!(node.needs_render());
    assert_eq!(renderer.render_count(), 2);
}

#[test]
fn test_custom_merge_props() {
    let store = new_store();
    let connected = counter(
        Connect::new()
            .map_state(count_mapper())
            .merge_props(MergeProps::custom(|state, _dispatch, own| {
                let label = own.get_str("label").unwrap_or("count");
                props! { "text" => format!("{label}: {}", state.get_int("count").unwrap_or(0)) }
            })),
    );
    let node = mount(&connected, props! { "label" => "Total" }, &store);
    let element = node.render(&ElementRenderer).unwrap();
    assert_eq!(element.props().get_str("text"), Some("Total: 0"));
    assert!(element.props().get("dispatch").is_none());
    assert!(!connected.config().check_merged_equals());
}

#[test]
fn test_precalculated_error_surfaces_on_render() {
    let store = new_store();
    let connected = counter(Connect::new().map_state(StateMapper::try_new(|s: &AppState| {
        if s.count > 1 {
            Err(format!("count {} is out of range", s.count).into())
        } else {
            Ok(props! { "count" => s.count })
        }
    })));
    let node = mount(&connected, Props::new(), &store);
    node.render(&ElementRenderer).unwrap();

    // The failure happens inside the store notification, not in dispatch
    store.dispatch(AppAction::Add(5));
    assert!(node.needs_render());

    match node.render(&ElementRenderer) {
        Err(ConnectError::Mapper {
            component,
            function,
            source,
        }) => {
            assert_eq!(component, "Connect(Counter)");
            assert_eq!(function, "map_state_to_props");
            assert_eq!(source.to_string(), "count 5 is out of range");
        }
        other => panic!("expected a mapper error, got {other:?}"),
    }
}

#[test]
fn test_non_mapping_results_warn_and_render_empty() {
    let store = new_store();
    let connected = counter(Connect::new().map_state(StateMapper::from_fn(
        |s: &AppState| Ok(Mapped::Value(PropValue::Int(s.count))),
    )));

    let logs = capture_logs(|| {
        let node = mount(&connected, props! { "id" => 1 }, &store);
        let element = node.render(&ElementRenderer).unwrap();
        assert_eq!(element.props().len(), 2);
        assert_eq!(element.props().get_int("id"), Some(1));
    });

    assert!(logs.contains("WARN"));
    assert!(logs.contains("map_state_to_props() in Connect(Counter) must return a plain mapping"));
}

#[test]
fn test_logging_middleware_reports_snapshot_changes() {
    let store: StoreRef<AppState, AppAction> = Store::with_middleware(
        AppState::default(),
        reducer,
        LoggingMiddleware::named("app").trace_dispatch(true),
    )
    .into_ref();
    let node = mount(&counter(Connect::new().map_state(count_mapper())), Props::new(), &store);
    let renderer = RecordingRenderer::new();
    node.render(&renderer).unwrap();

    let logs = capture_logs(|| {
        store.dispatch(AppAction::Increment);
        store.dispatch(AppAction::Noop);
    });

    assert!(logs.contains("store=app"));
    assert!(logs.contains("reducing action"));
    assert!(logs.contains("action=Increment"));
    assert!(logs.contains("published new snapshot"));
    assert!(logs.contains("action=Noop"));
    assert!(logs.contains("snapshot unchanged"));

    // Only the snapshot-changing action reaches the component
    pump(&node, &renderer);
    assert_eq!(renderer.render_count(), 2);
    assert_eq!(renderer.last_props().unwrap().get_int("count"), Some(1));
}

#[test]
fn test_provider_replace_store_warns() {
    let original = new_store();
    let mut provider = Provider::new(original.clone());

    let logs = capture_logs(|| provider.replace_store(new_store()));
    assert!(logs.contains("does not support changing `store` on the fly"));
    assert!(Rc::ptr_eq(provider.store(), &original));

    let connected = counter(Connect::new().map_state(count_mapper()));
    let child = connected
        .instantiate::<Element>(Props::new(), None, &provider.context())
        .unwrap();
    assert!(provider.render_child(vec![child]).is_ok());
    assert!(matches!(
        provider.render_child(Vec::<u8>::new()),
        Err(ConnectError::ProviderChildCount { count: 0 })
    ));
}

#[test]
fn test_reload_replaces_configuration() {
    let store = new_store();
    store.dispatch(AppAction::Add(2));
    let v1 = counter(Connect::new().map_state(count_mapper()));
    let node = mount(&v1, Props::new(), &store);
    assert_eq!(node.render(&ElementRenderer).unwrap().props().get_int("count"), Some(2));

    let v2 = counter(Connect::new().map_state(StateMapper::new(|s: &AppState| {
        props! { "count" => s.count, "label" => s.label.as_str() }
    })));
    assert!(node.reload(&v2));
    assert!(node.needs_render());
    let element = node.render(&ElementRenderer).unwrap();
    assert_eq!(element.props().get_str("label"), Some(""));
    assert!(!node.reload(&v2));
}

fn badge_view(frame: &mut Frame, area: Rect, props: &Props) {
    let text = format!(
        "{} ({})",
        props.get_str("name").unwrap_or("?"),
        props.get_int("count").unwrap_or(0)
    );
    frame.render_widget(Line::from(text), area);
}

#[test]
fn test_json_state_and_view_rendering() {
    let store: StoreRef<serde_json::Value, AppAction> =
        Store::new(serde_json::json!({ "user": { "name": "ada" } }), |_, _| false).into_ref();
    let connected = Connect::new()
        .map_state(StateMapper::new(|s: &serde_json::Value| {
            props! { "name" => PropValue::from(s["user"]["name"].clone()), "count" => 7 }
        }))
        .wrap(ComponentType::builder("Badge").view(badge_view).build());

    let node = connected
        .instantiate::<Element>(Props::new(), Some(store), &StoreContext::empty())
        .unwrap();
    let element = node.render(&ElementRenderer).unwrap();
    assert_eq!(render_to_string(&element, 12, 1), "ada (7)");
}
