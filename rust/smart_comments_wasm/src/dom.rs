//! DOM implementation of the render surface.
//!
//! The view tree is materialized node by node. Every handler closure is
//! built with the `UiAction` of its element, so nothing is looked up in the
//! DOM when the user interacts. Closures live until the next clear.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use smart_comments_core::view::{class, grown_height, Element as ViewElement, InputBinding};
use smart_comments_core::{InputSlot, Surface, ThreadError, UiAction, ViewNode, ViewTree};
use tracing::{error, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, Element, Event, HtmlElement, HtmlInputElement, HtmlTextAreaElement};

pub type Dispatcher = Rc<dyn Fn(UiAction)>;

struct DomInner {
    document: Document,
    target: String,
    container: RefCell<Option<Element>>,
    listeners: RefCell<Vec<Closure<dyn FnMut(Event)>>>,
    dispatcher: RefCell<Option<Dispatcher>>,
}

impl DomInner {
    fn dispatch(&self, action: UiAction) {
        let dispatcher = self.dispatcher.borrow().clone();
        if let Some(dispatch) = dispatcher {
            dispatch(action);
        }
    }
}

/// Thread container attached below a host element. Every surface appends a
/// container of its own, so widgets sharing or nesting hosts never touch
/// each other's nodes. Clones share state.
#[derive(Clone)]
pub struct DomSurface {
    inner: Rc<DomInner>,
}

fn mount_error(e: JsValue) -> ThreadError { ThreadError::Mount(format!("{e:?}")) }

impl DomSurface {
    pub fn new(document: Document, target: &str) -> Self {
        Self {
            inner: Rc::new(DomInner {
                document,
                target: target.to_string(),
                container: RefCell::new(None),
                listeners: RefCell::new(Vec::new()),
                dispatcher: RefCell::new(None),
            }),
        }
    }

    /// Receiver of every interaction on the rendered thread.
    pub fn set_dispatcher(&self, dispatcher: Dispatcher) { *self.inner.dispatcher.borrow_mut() = Some(dispatcher); }

    pub fn container(&self) -> Option<Element> { self.inner.container.borrow().clone() }

    fn listen(&self, el: &Element, event: &str, mut handler: impl FnMut(&DomInner, Event) + 'static) -> Result<(), JsValue> {
        let weak: Weak<DomInner> = Rc::downgrade(&self.inner);
        let closure = Closure::<dyn FnMut(Event)>::new(move |ev: Event| {
            if let Some(inner) = weak.upgrade() {
                handler(&*inner, ev);
            }
        });
        el.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
        self.inner.listeners.borrow_mut().push(closure);
        Ok(())
    }

    fn build(&self, parent: &Element, node: &ViewNode) -> Result<(), JsValue> {
        match node {
            ViewNode::Text(text) => {
                parent.append_child(&self.inner.document.create_text_node(text))?;
            }
            ViewNode::Markup(markup) => parent.insert_adjacent_html("beforeend", markup)?,
            ViewNode::Element(view) => {
                let el = self.inner.document.create_element(view.tag)?;
                if !view.classes.is_empty() {
                    el.set_class_name(&view.classes.join(" "));
                }
                for (name, value) in &view.attrs {
                    el.set_attribute(name, value)?;
                }
                for child in &view.children {
                    self.build(&el, child)?;
                }
                self.wire(&el, view)?;
                parent.append_child(&el)?;
            }
        }
        Ok(())
    }

    fn wire(&self, el: &Element, view: &ViewElement) -> Result<(), JsValue> {
        if let Some(action) = view.on_click.clone() {
            let allow_default = view.allow_default;
            self.listen(el, "click", move |inner, ev| {
                if !allow_default {
                    ev.prevent_default();
                }
                ev.stop_propagation();
                inner.dispatch(action.clone());
            })?;
        }
        if let Some(binding) = &view.input {
            self.bind_input(el, binding)?;
        }
        Ok(())
    }

    fn bind_input(&self, el: &Element, binding: &InputBinding) -> Result<(), JsValue> {
        set_value(el, &binding.value);
        let field = el.clone();
        let slot: InputSlot = binding.slot.clone();
        let auto_grow = binding.auto_grow;
        if auto_grow {
            if let Some(html) = el.dyn_ref::<HtmlElement>() {
                html.style().set_property("box-sizing", "border-box")?;
            }
        }
        self.listen(el, "input", move |inner, _| {
            if auto_grow {
                grow(&field);
            }
            inner.dispatch(UiAction::Input(slot.clone(), value_of(&field)));
        })
    }
}

fn set_value(el: &Element, value: &str) {
    if let Some(area) = el.dyn_ref::<HtmlTextAreaElement>() {
        area.set_value(value);
    } else if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
        input.set_value(value);
    }
}

fn value_of(el: &Element) -> String {
    if let Some(area) = el.dyn_ref::<HtmlTextAreaElement>() {
        area.value()
    } else if let Some(input) = el.dyn_ref::<HtmlInputElement>() {
        input.value()
    } else {
        String::new()
    }
}

fn grow(el: &Element) {
    let Some(html) = el.dyn_ref::<HtmlElement>() else { return };
    if let Some(height) = grown_height(html.offset_height(), html.client_height(), html.scroll_height()) {
        if let Err(e) = html.style().set_property("height", &format!("{height}px")) {
            warn!(error = ?e, "could not grow input");
        }
    }
}

impl Surface for DomSurface {
    fn mount(&self) -> Result<(), ThreadError> {
        if self.inner.container.borrow().is_some() {
            return Ok(());
        }
        let host = self
            .inner
            .document
            .query_selector(&self.inner.target)
            .map_err(mount_error)?
            .ok_or_else(|| ThreadError::Mount(format!("no element matches `{}`", self.inner.target)))?;
        let container = self.inner.document.create_element("div").map_err(mount_error)?;
        container.set_class_name(class::CONTAINER);
        host.append_child(&container).map_err(mount_error)?;
        *self.inner.container.borrow_mut() = Some(container);
        Ok(())
    }

    fn clear(&self) {
        if let Some(container) = self.inner.container.borrow().as_ref() {
            container.set_inner_html("");
        }
        self.inner.listeners.borrow_mut().clear();
    }

    fn render(&self, tree: &ViewTree) {
        let Some(container) = self.container() else {
            error!("render requested before the thread container was mounted");
            return;
        };
        for node in &tree.nodes {
            if let Err(e) = self.build(&container, node) {
                error!(error = ?e, "failed to render comment thread");
                return;
            }
        }
    }

    fn alert(&self, message: &str) {
        if let Some(window) = web_sys::window() {
            if let Err(e) = window.alert_with_message(message) {
                warn!(error = ?e, alert = message, "could not show alert");
            }
        }
    }

    fn unmount(&self) {
        self.clear();
        if let Some(container) = self.inner.container.borrow_mut().take() {
            container.remove();
        }
        *self.inner.dispatcher.borrow_mut() = None;
    }
}
