use crate::error::HostError;

/// One step of the press/release/click sequence dispatched at a trigger.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ActivationSignal {
    PointerDown,
    MouseDown,
    PointerUp,
    MouseUp,
    Click,
}

impl ActivationSignal {
    pub const SEQUENCE: [ActivationSignal; 5] = [
        ActivationSignal::PointerDown,
        ActivationSignal::MouseDown,
        ActivationSignal::PointerUp,
        ActivationSignal::MouseUp,
        ActivationSignal::Click,
    ];

    pub fn event_type(self) -> &'static str {
        match self {
            ActivationSignal::PointerDown => "pointerdown",
            ActivationSignal::MouseDown => "mousedown",
            ActivationSignal::PointerUp => "pointerup",
            ActivationSignal::MouseUp => "mouseup",
            ActivationSignal::Click => "click",
        }
    }

    pub fn is_pointer_event(self) -> bool {
        matches!(self, ActivationSignal::PointerDown | ActivationSignal::PointerUp)
    }
}

/// An element inside a dialog whose real source is withheld.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredAsset<E> {
    pub element: E,
    pub deferred_value: String,
    /// Attribute that receives `deferred_value`, e.g. `src` or `poster`.
    pub live_attribute: String,
    pub current_value: Option<String>,
    /// Video and audio elements need an explicit load request.
    pub is_media: bool,
}

/// The slice of the host page this layer reads and writes.
///
/// Implementations are shared behind `Rc`, so every method takes `&self`.
pub trait HostDocument {
    type Element: Clone;

    /// Elements declared as triggers for `dialog_id`, in document order.
    fn dialog_triggers(&self, dialog_id: &str) -> Vec<Self::Element>;

    fn is_visible(&self, element: &Self::Element) -> bool;

    /// Creates a visually hidden, `aria-hidden` trigger for `dialog_id` and
    /// attaches it to the document.
    fn create_hidden_trigger(&self, dialog_id: &str) -> Result<Self::Element, HostError>;

    fn remove_element(&self, element: &Self::Element);

    fn dispatch(&self, element: &Self::Element, signal: ActivationSignal) -> Result<(), HostError>;

    /// Root of the mounted dialog, if it is in the document yet.
    fn dialog_root(&self, dialog_id: &str) -> Option<Self::Element>;

    /// Deferred-source elements inside `root`. Must not look outside it.
    fn deferred_assets(&self, root: &Self::Element) -> Vec<DeferredAsset<Self::Element>>;

    fn set_attribute(&self, element: &Self::Element, name: &str, value: &str)
    -> Result<(), HostError>;

    fn begin_media_load(&self, element: &Self::Element);

    /// Page-level "open dialog by id" function. `Ok(false)` when the page
    /// exposes none.
    fn open_dialog_by_id(&self, dialog_id: &str) -> Result<bool, HostError>;
}

impl<H: HostDocument + ?Sized> HostDocument for std::rc::Rc<H> {
    type Element = H::Element;

    fn dialog_triggers(&self, dialog_id: &str) -> Vec<Self::Element> {
        (**self).dialog_triggers(dialog_id)
    }

    fn is_visible(&self, element: &Self::Element) -> bool {
        (**self).is_visible(element)
    }

    fn create_hidden_trigger(&self, dialog_id: &str) -> Result<Self::Element, HostError> {
        (**self).create_hidden_trigger(dialog_id)
    }

    fn remove_element(&self, element: &Self::Element) {
        (**self).remove_element(element)
    }

    fn dispatch(&self, element: &Self::Element, signal: ActivationSignal) -> Result<(), HostError> {
        (**self).dispatch(element, signal)
    }

    fn dialog_root(&self, dialog_id: &str) -> Option<Self::Element> {
        (**self).dialog_root(dialog_id)
    }

    fn deferred_assets(&self, root: &Self::Element) -> Vec<DeferredAsset<Self::Element>> {
        (**self).deferred_assets(root)
    }

    fn set_attribute(
        &self,
        element: &Self::Element,
        name: &str,
        value: &str,
    ) -> Result<(), HostError> {
        (**self).set_attribute(element, name, value)
    }

    fn begin_media_load(&self, element: &Self::Element) {
        (**self).begin_media_load(element)
    }

    fn open_dialog_by_id(&self, dialog_id: &str) -> Result<bool, HostError> {
        (**self).open_dialog_by_id(dialog_id)
    }
}
