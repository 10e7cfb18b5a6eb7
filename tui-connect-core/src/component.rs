//! Component descriptors
//!
//! A [`ComponentType`] is the explicit description of something the rendering
//! engine can instantiate: a name, an optional display name, a set of static
//! attributes, and optionally a [`View`] that knows how to draw it.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use ratatui::{layout::Rect, Frame};

use crate::props::{PropValue, Props};

/// Static attribute names owned by the rendering framework
///
/// These are never copied from a wrapped component onto its wrapper.
pub const RESERVED_STATICS: &[&str] = &[
    "name",
    "display_name",
    "default_props",
    "prop_types",
    "context_types",
    "child_context_types",
    "mixins",
    "type",
];

/// Draws a component from its props
///
/// This is the render half of a component: a pure function of props
/// (plus whatever internal UI state the implementor keeps).
///
/// # Example
///
/// ```ignore
/// struct CounterView;
///
/// impl View for CounterView {
///     fn render(&self, frame: &mut Frame, area: Rect, props: &Props) {
///         let text = format!("Count: {}", props.get_int("count").unwrap_or(0));
///         frame.render_widget(Paragraph::new(text), area);
///     }
/// }
/// ```
pub trait View {
    fn render(&self, frame: &mut Frame, area: Rect, props: &Props);
}

impl<F> View for F
where
    F: Fn(&mut Frame, Rect, &Props),
{
    fn render(&self, frame: &mut Frame, area: Rect, props: &Props) {
        self(frame, area, props)
    }
}

struct ComponentInner {
    name: String,
    display_name: Option<String>,
    statics: IndexMap<String, PropValue>,
    view: Option<Rc<dyn View>>,
}

/// Cheaply cloneable component descriptor
///
/// Clones share identity ([`ComponentType::same`]).
#[derive(Clone)]
pub struct ComponentType {
    inner: Rc<ComponentInner>,
}

impl ComponentType {
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder(name).build()
    }

    pub fn builder(name: impl Into<String>) -> ComponentBuilder {
        ComponentBuilder {
            name: name.into(),
            display_name: None,
            statics: IndexMap::new(),
            view: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Explicit display name, else the name, else `"Component"`.
    pub fn display_name(&self) -> &str {
        match &self.inner.display_name {
            Some(display) => display.as_str(),
            None if !self.inner.name.is_empty() => self.inner.name.as_str(),
            None => "Component",
        }
    }

    pub fn statics(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.inner.statics.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn static_value(&self, key: &str) -> Option<&PropValue> {
        self.inner.statics.get(key)
    }

    pub fn view(&self) -> Option<&Rc<dyn View>> {
        self.inner.view.as_ref()
    }

    pub fn same(&self, other: &ComponentType) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentType")
            .field("name", &self.inner.name)
            .field("display_name", &self.display_name())
            .field("statics", &self.inner.statics.keys().collect::<Vec<_>>())
            .field("has_view", &self.inner.view.is_some())
            .finish()
    }
}

/// Builder for [`ComponentType`]
pub struct ComponentBuilder {
    name: String,
    display_name: Option<String>,
    statics: IndexMap<String, PropValue>,
    view: Option<Rc<dyn View>>,
}

impl ComponentBuilder {
    pub fn display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Attach a static attribute.
    pub fn with_static(mut self, key: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.statics.insert(key.into(), value.into());
        self
    }

    pub fn view(mut self, view: impl View + 'static) -> Self {
        self.view = Some(Rc::new(view));
        self
    }

    /// Copy non-reserved statics from `source`, see [`hoist_statics`].
    pub fn hoist_statics_from(mut self, source: &ComponentType) -> Self {
        hoist_statics(&mut self.statics, source);
        self
    }

    pub fn build(self) -> ComponentType {
        ComponentType {
            inner: Rc::new(ComponentInner {
                name: self.name,
                display_name: self.display_name,
                statics: self.statics,
                view: self.view,
            }),
        }
    }
}

/// Copy every static of `source` that is not in [`RESERVED_STATICS`] into
/// `target`, overwriting existing entries with the same name.
pub fn hoist_statics(target: &mut IndexMap<String, PropValue>, source: &ComponentType) {
    for (key, value) in source.statics() {
        if RESERVED_STATICS.contains(&key) {
            continue;
        }
        target.insert(key.to_string(), value.clone());
    }
}

/// Display name of the wrapper generated around `inner`.
pub fn connect_display_name(inner: &ComponentType) -> String {
    format!("Connect({})", inner.display_name())
}
