//! Rendering collaborator
//!
//! Connected components never draw anything themselves. They hand a
//! component type and its final props to a [`Renderer`], cache whatever node
//! comes back, and return that same node again while nothing relevant changes.

use std::fmt;
use std::rc::Rc;

use ratatui::{layout::Rect, Frame};

use crate::component::ComponentType;
use crate::props::Props;

/// Materializes nodes from a component type and props
pub trait Renderer {
    /// Rendered output; cloned out of the connect cache on every render.
    type Node: Clone;

    fn create_node(&self, component: &ComponentType, props: &Props) -> Self::Node;
}

struct ElementInner {
    component: ComponentType,
    props: Props,
}

/// Default node type: a component type paired with its props
///
/// Clones share identity ([`Element::ptr_eq`]).
#[derive(Clone)]
pub struct Element {
    inner: Rc<ElementInner>,
}

impl Element {
    pub fn new(component: ComponentType, props: Props) -> Self {
        Self {
            inner: Rc::new(ElementInner { component, props }),
        }
    }

    pub fn component(&self) -> &ComponentType {
        &self.inner.component
    }

    pub fn props(&self) -> &Props {
        &self.inner.props
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Draw through the component's view, if it has one.
    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        match self.inner.component.view() {
            Some(view) => view.render(frame, area, &self.inner.props),
            None => tracing::trace!(
                component = %self.inner.component.display_name(),
                "element has no view, skipping draw"
            ),
        }
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("component", &self.inner.component.display_name())
            .field("props", &self.inner.props)
            .finish()
    }
}

/// [`Renderer`] producing [`Element`]s
#[derive(Debug, Clone, Copy, Default)]
pub struct ElementRenderer;

impl Renderer for ElementRenderer {
    type Node = Element;

    fn create_node(&self, component: &ComponentType, props: &Props) -> Element {
        Element::new(component.clone(), props.clone())
    }
}
