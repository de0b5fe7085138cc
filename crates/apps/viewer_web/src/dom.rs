//! The host page as seen through web-sys.

use bridge::{ActivationSignal, DeferredAsset, HostDocument, HostError};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Element, EventTarget, HtmlElement, HtmlMediaElement, MouseEvent, MouseEventInit,
    PointerEvent, PointerEventInit, Window,
};

use crate::attach::Attached;
use crate::options::DomAttributes;

fn dom_err(err: JsValue) -> HostError {
    HostError::Dom(format!("{err:?}"))
}

/// Quotes `value` for use inside a `[attr="..."]` selector.
pub fn attribute_selector(attribute: &str, value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("[{attribute}=\"{escaped}\"]")
}

/// An event listener that is removed when dropped.
pub struct DomListener {
    target: EventTarget,
    event_type: &'static str,
    callback: Closure<dyn FnMut(web_sys::Event)>,
}

impl DomListener {
    pub fn new(
        target: &EventTarget,
        event_type: &'static str,
        callback: impl FnMut(web_sys::Event) + 'static,
    ) -> Result<Self, JsValue> {
        let callback = Closure::wrap(Box::new(callback) as Box<dyn FnMut(web_sys::Event)>);
        target.add_event_listener_with_callback(event_type, callback.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            event_type,
            callback,
        })
    }
}

impl Drop for DomListener {
    fn drop(&mut self) {
        let _ = self
            .target
            .remove_event_listener_with_callback(self.event_type, self.callback.as_ref().unchecked_ref());
    }
}

pub struct DomHost {
    window: Attached<Window>,
    document: Attached<Document>,
    attributes: DomAttributes,
}

impl DomHost {
    pub fn new(window: Window, document: Document, attributes: DomAttributes) -> Self {
        Self {
            window: Attached::new(window),
            document: Attached::new(document),
            attributes,
        }
    }

    /// Lets go of the page. Queries find nothing and dispatches fail
    /// afterwards.
    pub fn detach(&self) {
        self.window.detach();
        self.document.detach();
    }

    fn live_document(&self) -> Result<Document, HostError> {
        self.document
            .get()
            .ok_or_else(|| HostError::Dom("embed detached from document".to_string()))
    }

    fn query_all(&self, root: &Element, selector: &str) -> Vec<Element> {
        let Ok(list) = root.query_selector_all(selector) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<Element>().ok())
            .collect()
    }

    fn mouse_event(&self, signal: ActivationSignal) -> Result<web_sys::Event, JsValue> {
        let window = self
            .window
            .get()
            .ok_or_else(|| JsValue::from_str("embed detached from window"))?;
        if signal.is_pointer_event() {
            let init = PointerEventInit::new();
            init.set_bubbles(true);
            init.set_cancelable(true);
            init.set_pointer_type("mouse");
            init.set_is_primary(true);
            init.set_view(Some(&window));
            let event = PointerEvent::new_with_event_init_dict(signal.event_type(), &init)?;
            return Ok(event.into());
        }
        let init = MouseEventInit::new();
        init.set_bubbles(true);
        init.set_cancelable(true);
        init.set_view(Some(&window));
        init.set_button(0);
        let event = MouseEvent::new_with_mouse_event_init_dict(signal.event_type(), &init)?;
        Ok(event.into())
    }
}

impl HostDocument for DomHost {
    type Element = Element;

    fn dialog_triggers(&self, dialog_id: &str) -> Vec<Element> {
        let Some(root) = self.document.get().and_then(|d| d.document_element()) else {
            return Vec::new();
        };
        self.query_all(
            &root,
            &attribute_selector(&self.attributes.dialog_trigger, dialog_id),
        )
    }

    fn is_visible(&self, element: &Element) -> bool {
        match element.dyn_ref::<HtmlElement>() {
            Some(el) => el.offset_width() > 0 || el.offset_height() > 0,
            None => element.get_client_rects().length() > 0,
        }
    }

    fn create_hidden_trigger(&self, dialog_id: &str) -> Result<Element, HostError> {
        let document = self.live_document()?;
        let el = document.create_element("button").map_err(dom_err)?;
        el.set_attribute(&self.attributes.dialog_trigger, dialog_id)
            .map_err(dom_err)?;
        el.set_attribute("type", "button").map_err(dom_err)?;
        el.set_attribute("aria-hidden", "true").map_err(dom_err)?;
        el.set_attribute("tabindex", "-1").map_err(dom_err)?;
        el.set_attribute(
            "style",
            "position:absolute;width:1px;height:1px;margin:-1px;padding:0;border:0;\
             overflow:hidden;clip:rect(0 0 0 0);opacity:0;pointer-events:none",
        )
        .map_err(dom_err)?;
        let body = document
            .body()
            .ok_or_else(|| HostError::Dom("document has no body".to_string()))?;
        body.append_child(&el).map_err(dom_err)?;
        Ok(el)
    }

    fn remove_element(&self, element: &Element) {
        element.remove();
    }

    fn dispatch(&self, element: &Element, signal: ActivationSignal) -> Result<(), HostError> {
        let event = self.mouse_event(signal).map_err(dom_err)?;
        element.dispatch_event(&event).map_err(dom_err)?;
        Ok(())
    }

    fn dialog_root(&self, dialog_id: &str) -> Option<Element> {
        self.document
            .get()?
            .query_selector(&attribute_selector(&self.attributes.dialog_root, dialog_id))
            .ok()
            .flatten()
    }

    fn deferred_assets(&self, root: &Element) -> Vec<DeferredAsset<Element>> {
        let source = &self.attributes.deferred_source;
        self.query_all(root, &format!("[{source}]"))
            .into_iter()
            .filter_map(|element| {
                let deferred_value = element.get_attribute(source)?;
                let live_attribute = element
                    .get_attribute(&self.attributes.deferred_target)
                    .unwrap_or_else(|| "src".to_string());
                let current_value = element.get_attribute(&live_attribute);
                let is_media = element.dyn_ref::<HtmlMediaElement>().is_some();
                Some(DeferredAsset {
                    element,
                    deferred_value,
                    live_attribute,
                    current_value,
                    is_media,
                })
            })
            .collect()
    }

    fn set_attribute(&self, element: &Element, name: &str, value: &str) -> Result<(), HostError> {
        element.set_attribute(name, value).map_err(dom_err)
    }

    fn begin_media_load(&self, element: &Element) {
        if let Some(media) = element.dyn_ref::<HtmlMediaElement>() {
            media.load();
        }
    }

    fn open_dialog_by_id(&self, dialog_id: &str) -> Result<bool, HostError> {
        let Some(window) = self.window.get() else {
            return Ok(false);
        };
        let name = JsValue::from_str(&self.attributes.global_opener);
        let value = js_sys::Reflect::get(&window, &name)
            .map_err(|e| HostError::Script(format!("{e:?}")))?;
        let Some(func) = value.dyn_ref::<js_sys::Function>() else {
            return Ok(false);
        };
        func.call1(&window, &JsValue::from_str(dialog_id))
            .map_err(|e| HostError::Script(format!("{e:?}")))?;
        Ok(true)
    }
}

/// Error panel with a retry button, shown inside the container.
pub struct ErrorOverlay {
    root: Element,
    _retry: DomListener,
}

impl ErrorOverlay {
    pub fn show(
        document: &Document,
        container: &Element,
        message: &str,
        on_retry: impl FnMut(web_sys::Event) + 'static,
        retry_allowed: bool,
    ) -> Result<Self, JsValue> {
        let root = document.create_element("div")?;
        root.set_attribute("class", "scene-embed-error")?;
        root.set_attribute("role", "alert")?;

        let text = document.create_element("p")?;
        text.set_text_content(Some(message));
        root.append_child(&text)?;

        let button = document.create_element("button")?;
        button.set_attribute("type", "button")?;
        button.set_text_content(Some("Retry"));
        if !retry_allowed {
            button.set_attribute("disabled", "")?;
        }
        root.append_child(&button)?;

        let retry = DomListener::new(&button, "click", on_retry)?;
        container.append_child(&root)?;
        Ok(Self {
            root,
            _retry: retry,
        })
    }
}

impl Drop for ErrorOverlay {
    fn drop(&mut self) {
        self.root.remove();
    }
}
