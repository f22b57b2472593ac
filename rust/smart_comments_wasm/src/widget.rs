//! JavaScript-facing activation and teardown.

use std::rc::Rc;

use smart_comments_core::view::render_comments;
use smart_comments_core::{html, Comment, Endpoints, HttpCommentStore, Snapshot, ThreadController, WidgetConfig};
use tracing::debug;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::dom::DomSurface;
use crate::fetch::FetchTransport;
use crate::logging;

type Controller = ThreadController<HttpCommentStore<FetchTransport>, DomSurface>;

fn to_js(e: impl std::fmt::Display) -> JsValue { JsValue::from_str(&e.to_string()) }

/// Installs the console logger and, with `console-panic`, the panic hook.
#[wasm_bindgen(start)]
pub fn wasm_init() {
    #[cfg(feature = "console-panic")]
    console_error_panic_hook::set_once();

    logging::init();
}

/// One comment thread attached to one host element. Each instance owns its
/// configuration, model and controller.
#[wasm_bindgen]
pub struct CommentWidget {
    controller: Rc<Controller>,
}

#[wasm_bindgen]
impl CommentWidget {
    /// Activates the thread under `target` (a CSS selector). Refused when any
    /// option is empty; nothing is attached and no request is made then.
    #[wasm_bindgen(constructor)]
    pub fn new(target: &str, config: JsValue) -> Result<CommentWidget, JsValue> {
        let config: WidgetConfig =
            serde_wasm_bindgen::from_value(config).map_err(|e| JsValue::from_str(&format!("Invalid config: {e}")))?;
        Self::activate(target, config)
    }

    #[wasm_bindgen(js_name = fromJson)]
    pub fn from_json(target: &str, config_json: &str) -> Result<CommentWidget, JsValue> {
        let config = WidgetConfig::from_json(config_json).map_err(to_js)?;
        Self::activate(target, config)
    }

    fn activate(target: &str, config: WidgetConfig) -> Result<CommentWidget, JsValue> {
        let document = web_sys::window().and_then(|w| w.document()).ok_or("No document")?;
        let surface = DomSurface::new(document, target);
        let store = HttpCommentStore::new(Endpoints::from(&config), FetchTransport);
        let controller = Rc::new(ThreadController::init(config, store, surface.clone()).map_err(to_js)?);

        let weak = Rc::downgrade(&controller);
        surface.set_dispatcher(Rc::new(move |action| {
            let Some(controller) = weak.upgrade() else { return };
            spawn_local(async move {
                if let Err(e) = controller.dispatch(action).await {
                    debug!(error = %e, "interaction not applied");
                }
            });
        }));

        let widget = CommentWidget { controller };
        widget.refresh();
        Ok(widget)
    }

    /// Schedules a fetch-all and full re-render.
    pub fn refresh(&self) {
        let controller = Rc::clone(&self.controller);
        spawn_local(async move {
            if let Err(e) = controller.request_all_comments().await {
                debug!(error = %e, "refresh skipped");
            }
        });
    }

    /// Current snapshot, or `null` before the first successful fetch.
    pub fn comments(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.controller.comments()).map_err(to_js)
    }

    /// Replaces the model without contacting the store. Call `render` to show it.
    #[wasm_bindgen(js_name = setComments)]
    pub fn set_comments(&self, comments: JsValue) -> Result<(), JsValue> {
        let snapshot: Snapshot = serde_wasm_bindgen::from_value(comments).map_err(to_js)?;
        self.controller.set_comments(snapshot).map_err(to_js)
    }

    /// Same as `setComments` for a raw JSON string.
    #[wasm_bindgen(js_name = setCommentsJson)]
    pub fn set_comments_json(&self, json: &str) -> Result<(), JsValue> {
        self.controller.set_comments_json(json).map_err(to_js)
    }

    #[wasm_bindgen(js_name = clearComments)]
    pub fn clear_comments(&self) { self.controller.clear_comments() }

    pub fn render(&self) { self.controller.redraw() }

    #[wasm_bindgen(js_name = toHtml)]
    pub fn to_html(&self) -> String { self.controller.to_html() }

    #[wasm_bindgen(getter, js_name = isReady)]
    pub fn is_ready(&self) -> bool {
        self.controller.state() == smart_comments_core::ControllerState::Ready
    }

    /// Removes everything the widget attached to the page.
    pub fn remove(&self) { self.controller.teardown() }
}

/// Markup for a flat list of comment entries, without series containers or
/// composer. Needs no activated widget.
#[wasm_bindgen(js_name = renderComments)]
pub fn render_comments_html(comments: JsValue) -> Result<String, JsValue> {
    let comments: Vec<Comment> = serde_wasm_bindgen::from_value(comments).map_err(to_js)?;
    Ok(html::to_html(&render_comments(&comments)))
}

#[wasm_bindgen]
pub fn version() -> String { env!("CARGO_PKG_VERSION").to_string() }
