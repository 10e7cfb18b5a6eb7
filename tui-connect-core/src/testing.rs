//! Test utilities for tui-connect applications
//!
//! - [`RecordingRenderer`]: a [`Renderer`] that remembers every props mapping
//!   it was asked to render
//! - [`RecordingMiddleware`]: store middleware that logs dispatched actions
//! - [`RenderHarness`] / [`render_to_string`]: draw elements on a ratatui
//!   `TestBackend` and read the buffer back as text
//! - Assertion macros for verifying dispatched actions
//!
//! # Example
//!
//! ```ignore
//! use tui_connect::testing::{RecordingMiddleware, RecordingRenderer};
//!
//! let recorder = RecordingMiddleware::new();
//! let store = Store::with_middleware(AppState::default(), reducer, recorder.clone()).into_ref();
//!
//! let renderer = RecordingRenderer::new();
//! node.render(&renderer)?;
//! assert_eq!(renderer.render_count(), 1);
//!
//! store.dispatch(Action::Increment);
//! assert_dispatched!(recorder.drain(), Action::Increment);
//! ```

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ratatui::{backend::TestBackend, buffer::Buffer, layout::Rect, Frame, Terminal};

use crate::component::ComponentType;
use crate::props::Props;
use crate::render::{Element, ElementRenderer, Renderer};
use crate::store::Middleware;
use crate::Action;

/// [`Renderer`] that records what it renders
///
/// Produces the same [`Element`]s as [`ElementRenderer`].
#[derive(Default)]
pub struct RecordingRenderer {
    count: Cell<usize>,
    rendered: RefCell<Vec<Props>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes created so far
    pub fn render_count(&self) -> usize {
        self.count.get()
    }

    /// Props of the most recently created node
    pub fn last_props(&self) -> Option<Props> {
        self.rendered.borrow().last().cloned()
    }

    /// Take the props recorded since the last drain.
    pub fn drain_rendered(&self) -> Vec<Props> {
        std::mem::take(&mut *self.rendered.borrow_mut())
    }
}

impl Renderer for RecordingRenderer {
    type Node = Element;

    fn create_node(&self, component: &ComponentType, props: &Props) -> Element {
        self.count.set(self.count.get() + 1);
        self.rendered.borrow_mut().push(props.clone());
        ElementRenderer.create_node(component, props)
    }
}

/// Middleware recording every action that reaches the reducer
///
/// Clones share one log, so keep a clone before moving the middleware into
/// a store.
pub struct RecordingMiddleware<A> {
    log: Rc<RefCell<Vec<A>>>,
}

impl<A> Clone for RecordingMiddleware<A> {
    fn clone(&self) -> Self {
        Self {
            log: self.log.clone(),
        }
    }
}

impl<A> Default for RecordingMiddleware<A> {
    fn default() -> Self {
        Self {
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<A: Clone> RecordingMiddleware<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take all recorded actions.
    pub fn drain(&self) -> Vec<A> {
        std::mem::take(&mut *self.log.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.log.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.borrow().is_empty()
    }
}

impl<A: Action> Middleware<A> for RecordingMiddleware<A> {
    fn before(&mut self, action: &A) {
        self.log.borrow_mut().push(action.clone());
    }

    fn after(&mut self, _action: &A, _state_changed: bool) {}
}

/// Renders into an in-memory terminal
///
/// # Panics
///
/// Constructor and draw helpers panic if the test backend fails, which
/// makes them suitable for tests only.
pub struct RenderHarness {
    terminal: Terminal<TestBackend>,
}

impl RenderHarness {
    pub fn new(width: u16, height: u16) -> Self {
        let terminal =
            Terminal::new(TestBackend::new(width, height)).expect("test backend never fails");
        Self { terminal }
    }

    /// Draw with `f` and return the resulting buffer.
    pub fn render<F>(&mut self, f: F) -> &Buffer
    where
        F: FnOnce(&mut Frame),
    {
        self.terminal.draw(f).expect("test backend never fails");
        self.terminal.backend().buffer()
    }

    /// Draw with `f` and return the buffer as plain text, one line per row.
    pub fn render_to_string_plain<F>(&mut self, f: F) -> String
    where
        F: FnOnce(&mut Frame),
    {
        buffer_to_string_plain(self.render(f))
    }

    /// Draw an element over the whole terminal area.
    pub fn render_element(&mut self, element: &Element) -> String {
        self.render_to_string_plain(|frame| {
            let area = frame.area();
            element.draw(frame, area);
        })
    }
}

/// Draw `element` on a `width` x `height` test terminal and return the text.
pub fn render_to_string(element: &Element, width: u16, height: u16) -> String {
    RenderHarness::new(width, height).render_element(element)
}

/// Buffer content as text, trailing whitespace trimmed from every row.
pub fn buffer_to_string_plain(buffer: &Buffer) -> String {
    buffer_rect_to_string_plain(buffer, buffer.area)
}

/// Text content of `area` within `buffer`.
pub fn buffer_rect_to_string_plain(buffer: &Buffer, area: Rect) -> String {
    let area = area.intersection(buffer.area);
    let mut lines = Vec::with_capacity(area.height as usize);
    for y in area.top()..area.bottom() {
        let mut line = String::new();
        for x in area.left()..area.right() {
            if let Some(cell) = buffer.cell((x, y)) {
                line.push_str(cell.symbol());
            }
        }
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}

/// Assert that an action matching a pattern was dispatched.
///
/// # Example
///
/// ```ignore
/// let actions = recorder.drain();
/// assert_dispatched!(actions, Action::Increment);
/// assert_dispatched!(actions, Action::SetValue(v) if *v == 42);
/// ```
#[macro_export]
macro_rules! assert_dispatched {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            $actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` to be dispatched, but got: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Assert that no action matching a pattern was dispatched.
#[macro_export]
macro_rules! assert_not_dispatched {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        assert!(
            !$actions.iter().any(|a| matches!(a, $pattern $(if $guard)?)),
            "Expected action matching `{}` NOT to be dispatched, but it was: {:?}",
            stringify!($pattern),
            $actions
        );
    };
}

/// Count how many dispatched actions match a pattern.
#[macro_export]
macro_rules! count_dispatched {
    ($actions:expr, $pattern:pat $(if $guard:expr)?) => {
        $actions.iter().filter(|a| matches!(a, $pattern $(if $guard)?)).count()
    };
}
