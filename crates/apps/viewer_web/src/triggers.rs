//! Browser-side load triggers: an intersection observer, first-interaction
//! listeners on the container and a delay timer.

use std::cell::Cell;
use std::rc::Rc;

use activation::{ArmedTrigger, TriggerConfig, TriggerHost, TriggerKind};
use gloo_timers::callback::Timeout;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, IntersectionObserver, IntersectionObserverEntry, IntersectionObserverInit};

use crate::attach::Attached;
use crate::dom::DomListener;

/// Events on the container that count as a first interaction.
const INTERACTION_EVENTS: [&str; 6] = [
    "pointerenter",
    "pointerdown",
    "touchstart",
    "wheel",
    "focusin",
    "keydown",
];

/// Receives the winning trigger's source name.
pub type LoadCallback = Rc<dyn Fn(&'static str)>;

/// Hands the source name to the controller on a fresh task. Firing
/// disarms every trigger, which drops the closures; none of them may be
/// running when that happens.
fn fire(on_fire: &LoadCallback, kind: TriggerKind) {
    let on_fire = on_fire.clone();
    wasm_bindgen_futures::spawn_local(async move {
        on_fire(kind.source_name());
    });
}

pub struct DomTriggerHost {
    container: Attached<Element>,
    on_fire: LoadCallback,
}

impl DomTriggerHost {
    pub fn new(container: Element, on_fire: LoadCallback) -> Self {
        Self {
            container: Attached::new(container),
            on_fire,
        }
    }

    /// Lets go of the container. Nothing can be armed afterwards.
    pub fn detach(&self) {
        self.container.detach();
    }
}

impl TriggerHost for DomTriggerHost {
    fn arm(&self, kind: TriggerKind, config: &TriggerConfig) -> Option<Box<dyn ArmedTrigger>> {
        let Some(container) = self.container.get() else {
            log::debug!("{} trigger not armed: embed detached", kind.source_name());
            return None;
        };
        let armed: Result<Box<dyn ArmedTrigger>, JsValue> = match kind {
            TriggerKind::Viewport => {
                ViewportTrigger::arm(&container, config.viewport_margin_px, &self.on_fire)
                    .map(|t| Box::new(t) as Box<dyn ArmedTrigger>)
            }
            TriggerKind::Interaction => InteractionTrigger::arm(&container, &self.on_fire)
                .map(|t| Box::new(t) as Box<dyn ArmedTrigger>),
            TriggerKind::Delay => Ok(Box::new(DelayTrigger::arm(config.delay_ms, &self.on_fire))),
        };
        match armed {
            Ok(armed) => {
                log::debug!("{} trigger armed", kind.source_name());
                Some(armed)
            }
            Err(err) => {
                log::warn!("arming {} trigger failed: {err:?}", kind.source_name());
                None
            }
        }
    }
}

struct ViewportTrigger {
    observer: Option<IntersectionObserver>,
    _callback: Option<Closure<dyn FnMut(js_sys::Array, IntersectionObserver)>>,
}

impl ViewportTrigger {
    fn arm(container: &Element, margin_px: f64, on_fire: &LoadCallback) -> Result<Self, JsValue> {
        let on_fire = on_fire.clone();
        let fired = Cell::new(false);
        let callback = Closure::wrap(Box::new(move |entries: js_sys::Array, _: IntersectionObserver| {
            if fired.get() {
                return;
            }
            let visible = entries.iter().any(|entry| {
                entry
                    .dyn_into::<IntersectionObserverEntry>()
                    .is_ok_and(|e| e.is_intersecting())
            });
            if visible {
                fired.set(true);
                fire(&on_fire, TriggerKind::Viewport);
            }
        }) as Box<dyn FnMut(js_sys::Array, IntersectionObserver)>);

        let init = IntersectionObserverInit::new();
        init.set_root_margin(&format!("{}px", margin_px.max(0.0).round()));
        let observer =
            IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &init)?;
        observer.observe(container);
        Ok(Self {
            observer: Some(observer),
            _callback: Some(callback),
        })
    }
}

impl ArmedTrigger for ViewportTrigger {
    fn kind(&self) -> TriggerKind {
        TriggerKind::Viewport
    }

    fn disarm(&mut self) {
        if let Some(observer) = self.observer.take() {
            observer.disconnect();
        }
        self._callback = None;
    }
}

struct InteractionTrigger {
    listeners: Vec<DomListener>,
}

impl InteractionTrigger {
    fn arm(container: &Element, on_fire: &LoadCallback) -> Result<Self, JsValue> {
        let fired = Rc::new(Cell::new(false));
        let mut listeners = Vec::with_capacity(INTERACTION_EVENTS.len());
        for event_type in INTERACTION_EVENTS {
            let on_fire = on_fire.clone();
            let fired = fired.clone();
            listeners.push(DomListener::new(container, event_type, move |_| {
                if !fired.replace(true) {
                    fire(&on_fire, TriggerKind::Interaction);
                }
            })?);
        }
        Ok(Self { listeners })
    }
}

impl ArmedTrigger for InteractionTrigger {
    fn kind(&self) -> TriggerKind {
        TriggerKind::Interaction
    }

    fn disarm(&mut self) {
        self.listeners.clear();
    }
}

struct DelayTrigger {
    timeout: Option<Timeout>,
}

impl DelayTrigger {
    fn arm(delay_ms: u64, on_fire: &LoadCallback) -> Self {
        let on_fire = on_fire.clone();
        let millis = u32::try_from(delay_ms).unwrap_or(u32::MAX);
        let timeout = Timeout::new(millis, move || fire(&on_fire, TriggerKind::Delay));
        Self {
            timeout: Some(timeout),
        }
    }
}

impl ArmedTrigger for DelayTrigger {
    fn kind(&self) -> TriggerKind {
        TriggerKind::Delay
    }

    fn disarm(&mut self) {
        // Dropping a pending `Timeout` clears it.
        self.timeout = None;
    }
}

#[cfg(test)]
mod tests {
    use super::INTERACTION_EVENTS;

    #[test]
    fn keyboard_focus_and_pointer_all_count_as_interaction() {
        for event in ["pointerdown", "touchstart", "wheel", "focusin", "keydown"] {
            assert!(INTERACTION_EVENTS.contains(&event), "{event} missing");
        }
    }
}
