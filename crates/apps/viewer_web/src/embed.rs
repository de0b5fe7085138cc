//! One embedded scene: activation, bootstrap, pointer wiring and teardown.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use activation::{
    ActivationController, ActivationError, BootstrapPlan, Bootstrapped, DisposeStage, Disposer,
    LoadState, RetryRejected, SceneRuntime, SessionTicket, TriggerKind, bootstrap,
};
use bridge::{DialogRequest, ModalBridge};
use foundation::time::Millis;
use interaction::{ClickRequest, PickContext, PointerResolver, step_glow};
use runtime::clock::Clock;
use runtime::frame::Frame;
use scene::HotspotIndex;
use serde::Serialize;
use streaming::ResourceFetcher;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{Document, Element, MouseEvent, PointerEvent, TouchEvent, Window};

use crate::attach::Attached;
use crate::clock::{GlooSleeper, PerformanceClock};
use crate::dom::{DomHost, DomListener, ErrorOverlay};
use crate::frame_loop::AnimationLoop;
use crate::net::GlooTransport;
use crate::options::EmbedOptions;
use crate::scene_js::{JsRuntime, JsSceneRuntime};
use crate::triggers::{DomTriggerHost, LoadCallback};

type Fetcher = ResourceFetcher<GlooTransport, GlooSleeper, PerformanceClock>;
type Bridge = ModalBridge<Rc<DomHost>, GlooSleeper>;

/// Payload handed to the page's error callback.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
    pub retryable: bool,
    pub session: u32,
}

impl ErrorReport {
    pub fn new(error: &ActivationError, session: u32) -> Self {
        let kind = match error {
            ActivationError::ContainerMissing { .. } => "containerMissing",
            ActivationError::FetchExhausted(_) => "fetchExhausted",
            ActivationError::RenderBootstrapFailure(_) => "renderBootstrapFailure",
        };
        Self {
            kind,
            message: error.to_string(),
            retryable: error.is_retryable(),
            session,
        }
    }
}

/// Snapshot returned by `SceneEmbed.state()`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmbedStatus {
    pub state: LoadState,
    pub session: u32,
    pub progress: Option<u8>,
    pub source: Option<String>,
    pub hotspots: usize,
    pub highlighted: usize,
    pub error: Option<String>,
}

fn report_to_js(report: &ErrorReport) -> JsValue {
    serde_json::to_string(report)
        .ok()
        .and_then(|json| js_sys::JSON::parse(&json).ok())
        .unwrap_or_else(|| JsValue::from_str(&report.message))
}

fn client_point(event: &web_sys::Event) -> Option<(f64, f64)> {
    let mouse = event.dyn_ref::<MouseEvent>()?;
    Some((mouse.client_x() as f64, mouse.client_y() as f64))
}

fn is_touch_pointer(event: &web_sys::Event) -> bool {
    event
        .dyn_ref::<PointerEvent>()
        .is_some_and(|p| p.pointer_type() == "touch")
}

/// First touch point, or `None` for zero or several fingers.
fn single_touch(event: &web_sys::Event) -> Option<(f64, f64)> {
    let touches = event.dyn_ref::<TouchEvent>()?.touches();
    if touches.length() != 1 {
        return None;
    }
    let touch = touches.get(0)?;
    Some((touch.client_x() as f64, touch.client_y() as f64))
}

struct Inner {
    options: EmbedOptions,
    window: Attached<Window>,
    document: Attached<Document>,
    container: Attached<Element>,
    clock: PerformanceClock,
    controller: RefCell<ActivationController<PerformanceClock>>,
    fetcher: Rc<Fetcher>,
    runtime: Rc<RefCell<JsRuntime>>,
    hotspots: RefCell<Option<HotspotIndex>>,
    resolver: RefCell<PointerResolver>,
    bridge: Rc<Bridge>,
    triggers: DomTriggerHost,
    disposer: RefCell<Disposer>,
    frame_loop: RefCell<Option<AnimationLoop>>,
    last_frame: Cell<Option<Frame>>,
    listeners: RefCell<Vec<DomListener>>,
    overlay: RefCell<Option<ErrorOverlay>>,
    on_error: RefCell<Option<js_sys::Function>>,
}

impl Inner {
    fn now(&self) -> Millis {
        self.clock.now()
    }

    fn start(self: &Rc<Self>) {
        let ticket = self.controller.borrow_mut().start(&self.triggers);
        if let Some(ticket) = ticket {
            self.spawn_session(ticket);
        }
    }

    fn trigger(self: &Rc<Self>, source: &str) -> bool {
        let ticket = self.controller.borrow_mut().trigger_load(source);
        match ticket {
            Some(ticket) => {
                self.spawn_session(ticket);
                true
            }
            None => false,
        }
    }

    fn retry(self: &Rc<Self>) -> Result<(), RetryRejected> {
        let retried = self.controller.borrow_mut().retry(&self.triggers);
        match retried {
            Ok(ticket) => {
                self.overlay.replace(None);
                match ticket {
                    Some(ticket) => self.spawn_session(ticket),
                    None => {
                        self.trigger("retry");
                    }
                }
                Ok(())
            }
            Err(rejected) => {
                log::debug!("{rejected}");
                Err(rejected)
            }
        }
    }

    /// The task holds the fetcher and runtime but only a weak handle to
    /// the embed; every checkpoint of the bootstrap asks whether the embed
    /// and the session are still alive.
    fn spawn_session(self: &Rc<Self>, ticket: SessionTicket) {
        let plan = BootstrapPlan {
            config: self.options.config_plan(),
            model: self.options.model_plan(),
            stations: self.options.stations.clone(),
        };
        let fetcher = self.fetcher.clone();
        let runtime = self.runtime.clone();
        let weak = Rc::downgrade(self);
        spawn_local(async move {
            let alive = weak.clone();
            let is_current = move || {
                alive
                    .upgrade()
                    .is_some_and(|inner| inner.controller.borrow().is_current(ticket))
            };
            let progress = weak.clone();
            let mut on_progress = move |percent: u8| {
                if let Some(inner) = progress.upgrade() {
                    inner.controller.borrow_mut().report_progress(ticket, percent);
                }
            };
            let result = bootstrap(&fetcher, &runtime, &plan, &is_current, &mut on_progress).await;
            match weak.upgrade() {
                Some(inner) => inner.finish_session(ticket, result),
                None => log::debug!("session {} outlived its embed", ticket.session),
            }
        });
    }

    fn finish_session(
        self: &Rc<Self>,
        ticket: SessionTicket,
        result: Result<Option<Bootstrapped>, ActivationError>,
    ) {
        let booted = match result {
            Ok(Some(booted)) => booted,
            Ok(None) => {
                log::debug!("session {} abandoned mid-bootstrap", ticket.session);
                return;
            }
            Err(err) => {
                self.controller.borrow_mut().complete(ticket, Err(err));
                return;
            }
        };
        if !self.controller.borrow_mut().complete(ticket, Ok(())) {
            log::debug!("session {} finished after teardown", ticket.session);
            let mut index = booted.hotspots.index;
            if let Some(scene) = self.runtime.borrow_mut().scene_mut() {
                index.release(scene);
            }
            return;
        }
        for warning in &booted.config.warnings {
            log::warn!("scene config: {warning}");
        }
        log::info!(
            "model {} ready with {} hotspot(s){}",
            booted.model_url,
            booted.hotspots.index.len(),
            if booted.model_from_fallback { " (fallback)" } else { "" }
        );
        self.hotspots.replace(Some(booted.hotspots.index));
        self.resolver.borrow_mut().reset();
        self.last_frame.set(None);
        self.start_frame_loop();
    }

    fn start_frame_loop(self: &Rc<Self>) {
        if self.frame_loop.borrow().as_ref().is_some_and(AnimationLoop::is_running) {
            return;
        }
        let Some(window) = self.window.get() else {
            return;
        };
        let weak = Rc::downgrade(self);
        let started = AnimationLoop::start(window, move |_timestamp| {
            if let Some(inner) = weak.upgrade() {
                inner.tick();
            }
        });
        match started {
            Ok(frame_loop) => {
                self.frame_loop.replace(Some(frame_loop));
            }
            Err(err) => log::error!("animation loop did not start: {err:?}"),
        }
    }

    fn tick(&self) {
        let now = self.now();
        let frame = match self.last_frame.get() {
            Some(prev) => prev.next(now),
            None => Frame::first(now),
        };
        self.last_frame.set(Some(frame));

        let mut rt = self.runtime.borrow_mut();
        if let Some(index) = self.hotspots.borrow_mut().as_mut() {
            // Camera and surface are read only on frames that raycast.
            let wants_raycast = self.resolver.borrow().wants_raycast(now);
            if wants_raycast {
                let ctx = PickContext {
                    camera: rt.camera(),
                    surface: rt.surface(),
                };
                let change = self.resolver.borrow_mut().update(now, &ctx, index);
                if let Some(change) = change {
                    rt.set_cursor(change.affordance.css_cursor());
                }
            }
            let ease = self.resolver.borrow().settings().glow_ease;
            if let Some(scene) = rt.scene_mut() {
                step_glow(index, scene, ease);
            }
        }
        let removed = self.bridge.sweep(now);
        if removed > 0 {
            log::trace!("removed {removed} synthesized trigger(s)");
        }
        rt.render(&frame);
    }

    fn pick_context(&self) -> PickContext {
        let rt = self.runtime.borrow();
        PickContext {
            camera: rt.camera(),
            surface: rt.surface(),
        }
    }

    /// Runs on the bridge alone; disposing the embed closes the bridge,
    /// which ends a dialog search still in progress.
    fn open_dialog(&self, request: ClickRequest) {
        let bridge = self.bridge.clone();
        let now = self.now();
        spawn_local(async move {
            match bridge.open(&request.dialog_id, &request.station_key, now).await {
                Ok(DialogRequest::Debounced) => {
                    log::debug!("dialog {} debounced", request.dialog_id)
                }
                Ok(DialogRequest::Dispatched { trigger, delivered_by }) => log::info!(
                    "dialog {} for {} requested via {trigger:?} trigger, delivered by {delivered_by:?}",
                    request.dialog_id,
                    request.station_key
                ),
                Err(timeout) => log::warn!("{timeout}"),
            }
        });
    }

    fn on_pointer(self: &Rc<Self>, event: &web_sys::Event) {
        let Some((x, y)) = client_point(event) else {
            return;
        };
        let now = self.now();
        if is_touch_pointer(event) {
            return;
        }
        let mut resolver = self.resolver.borrow_mut();
        match event.type_().as_str() {
            "pointermove" => resolver.on_pointer_move(x, y, now),
            "pointerdown" => resolver.on_pointer_down(x, y, now),
            "pointerup" => resolver.on_pointer_up(x, y, now),
            _ => {}
        }
    }

    fn on_click(self: &Rc<Self>, event: &web_sys::Event) {
        let Some((x, y)) = client_point(event) else {
            return;
        };
        let ctx = self.pick_context();
        let request = {
            let hotspots = self.hotspots.borrow();
            let Some(index) = hotspots.as_ref() else {
                return;
            };
            self.resolver.borrow_mut().on_click(x, y, self.now(), &ctx, index)
        };
        if let Some(request) = request {
            self.open_dialog(request);
        }
    }

    fn on_pointer_leave(&self) {
        let change = match self.hotspots.borrow_mut().as_mut() {
            Some(index) => self.resolver.borrow_mut().on_pointer_leave(index),
            None => None,
        };
        if let Some(change) = change {
            self.runtime.borrow_mut().set_cursor(change.affordance.css_cursor());
        }
    }

    fn on_touch(self: &Rc<Self>, event: &web_sys::Event) {
        let now = self.now();
        match event.type_().as_str() {
            "touchstart" => match single_touch(event) {
                Some((x, y)) => self.resolver.borrow_mut().on_touch_start(x, y, now),
                None => self.resolver.borrow_mut().on_touch_cancel(),
            },
            "touchmove" => match single_touch(event) {
                Some((x, y)) => self.resolver.borrow_mut().on_touch_move(x, y, now),
                None => self.resolver.borrow_mut().on_touch_cancel(),
            },
            "touchend" => {
                let ctx = self.pick_context();
                let request = {
                    let hotspots = self.hotspots.borrow();
                    let Some(index) = hotspots.as_ref() else {
                        self.resolver.borrow_mut().on_touch_cancel();
                        return;
                    };
                    self.resolver.borrow_mut().on_touch_end(now, &ctx, index)
                };
                if let Some(request) = request {
                    // The browser's synthesized click would open it twice.
                    event.prevent_default();
                    self.open_dialog(request);
                }
            }
            _ => self.resolver.borrow_mut().on_touch_cancel(),
        }
    }

    fn attach_surface_listeners(self: &Rc<Self>) -> Result<(), JsValue> {
        let container = self
            .container
            .get()
            .ok_or_else(|| JsValue::from_str("container detached"))?;
        let mut listeners = Vec::new();
        for event_type in ["pointermove", "pointerdown", "pointerup"] {
            let weak = Rc::downgrade(self);
            listeners.push(DomListener::new(&container, event_type, move |event| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_pointer(&event);
                }
            })?);
        }
        let weak = Rc::downgrade(self);
        listeners.push(DomListener::new(&container, "click", move |event| {
            if let Some(inner) = weak.upgrade() {
                inner.on_click(&event);
            }
        })?);
        let weak = Rc::downgrade(self);
        listeners.push(DomListener::new(&container, "pointerleave", move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.on_pointer_leave();
            }
        })?);
        for event_type in ["touchstart", "touchmove", "touchend", "touchcancel"] {
            let weak = Rc::downgrade(self);
            listeners.push(DomListener::new(&container, event_type, move |event| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_touch(&event);
                }
            })?);
        }
        self.listeners.replace(listeners);
        Ok(())
    }

    /// Runs on its own task so page code called from here may re-enter the
    /// embed, e.g. to dispose it.
    fn report_error(self: &Rc<Self>, error: ActivationError) {
        let weak = Rc::downgrade(self);
        spawn_local(async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let report = ErrorReport::new(&error, inner.controller.borrow().session());
            inner.show_overlay(&report);
            let callback = inner.on_error.borrow().clone();
            if let Some(callback) = callback
                && let Err(err) = callback.call1(&JsValue::NULL, &report_to_js(&report))
            {
                log::warn!("error callback threw: {err:?}");
            }
        });
    }

    fn show_overlay(self: &Rc<Self>, report: &ErrorReport) {
        if self.controller.borrow().is_disposed() {
            return;
        }
        let (Some(document), Some(container)) = (self.document.get(), self.container.get()) else {
            return;
        };
        let weak = Rc::downgrade(self);
        let overlay = ErrorOverlay::show(
            &document,
            &container,
            &report.message,
            move |_| {
                let weak = weak.clone();
                spawn_local(async move {
                    if let Some(inner) = weak.upgrade()
                        && let Err(err) = inner.retry()
                    {
                        log::warn!("retry refused: {err}");
                    }
                });
            },
            report.retryable,
        );
        match overlay {
            Ok(overlay) => {
                self.overlay.replace(Some(overlay));
            }
            Err(err) => log::warn!("error overlay could not be shown: {err:?}"),
        }
    }

    fn register_teardown(self: &Rc<Self>) {
        let mut disposer = self.disposer.borrow_mut();
        let weak = Rc::downgrade(self);
        disposer.register(DisposeStage::StopLoop, move || {
            if let Some(inner) = weak.upgrade()
                && let Some(frame_loop) = inner.frame_loop.take()
            {
                frame_loop.stop();
            }
        });
        for kind in TriggerKind::ALL {
            let weak = Rc::downgrade(self);
            disposer.register(kind.dispose_stage(), move || {
                if let Some(inner) = weak.upgrade() {
                    inner.controller.borrow_mut().disarm(kind);
                }
            });
        }
        let weak = Rc::downgrade(self);
        disposer.register(DisposeStage::ClearTimers, move || {
            if let Some(inner) = weak.upgrade() {
                inner.bridge.release();
            }
        });
        let weak = Rc::downgrade(self);
        disposer.register(DisposeStage::RemoveListeners, move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.take();
                inner.overlay.replace(None);
            }
        });
        let weak = Rc::downgrade(self);
        disposer.register(DisposeStage::ReleaseHotspots, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let Some(mut index) = inner.hotspots.take() else {
                return;
            };
            let mut rt = inner.runtime.borrow_mut();
            if let Some(scene) = rt.scene_mut() {
                index.release(scene);
            }
        });
        let weak = Rc::downgrade(self);
        disposer.register(DisposeStage::TeardownRuntime, move || {
            if let Some(inner) = weak.upgrade() {
                inner.runtime.borrow_mut().dispose();
            }
        });
        let weak = Rc::downgrade(self);
        disposer.register(DisposeStage::DropReferences, move || {
            if let Some(inner) = weak.upgrade() {
                // Ends the session; an in-flight bootstrap stops at its next
                // checkpoint.
                inner.controller.borrow_mut().dispose();
                inner.on_error.replace(None);
                inner.resolver.borrow_mut().reset();
                inner.last_frame.set(None);
                inner.triggers.detach();
                inner.bridge.host().detach();
                inner.window.detach();
                inner.document.detach();
                inner.container.detach();
            }
        });
    }

    fn status(&self) -> EmbedStatus {
        let controller = self.controller.borrow();
        let hotspots = self.hotspots.borrow();
        EmbedStatus {
            state: controller.observe(),
            session: controller.session(),
            progress: controller.progress(),
            source: controller.winning_source().map(str::to_string),
            hotspots: hotspots.as_ref().map_or(0, HotspotIndex::len),
            highlighted: hotspots.as_ref().map_or(0, HotspotIndex::highlighted_count),
            error: controller.last_error().map(ToString::to_string),
        }
    }

    fn dispose(&self) {
        self.disposer.borrow_mut().dispose();
    }
}

/// A scene embedded in a host page.
///
/// ```js
/// const embed = SceneEmbed.mount(JSON.stringify(options), renderer, onError);
/// embed.start();
/// ```
#[wasm_bindgen]
pub struct SceneEmbed {
    inner: Rc<Inner>,
}

#[wasm_bindgen]
impl SceneEmbed {
    /// Resolves the container and wires everything short of loading.
    /// A missing container is reported through `on_error` and returned as
    /// an error; no embed exists afterwards.
    pub fn mount(
        options_json: &str,
        renderer: JsSceneRuntime,
        on_error: Option<js_sys::Function>,
    ) -> Result<SceneEmbed, JsValue> {
        let options = EmbedOptions::from_json(options_json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        crate::init_logging(options.log_level());

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        let clock = PerformanceClock::new();
        let mut controller = ActivationController::new(clock.clone());
        controller.configure(options.trigger_config());

        let container = match document.query_selector(&options.container) {
            Ok(Some(container)) => container,
            _ => {
                let err = ActivationError::ContainerMissing {
                    selector: options.container.clone(),
                };
                let report = ErrorReport::new(&err, controller.session());
                controller.fail(err);
                if let Some(callback) = on_error {
                    let _ = callback.call1(&JsValue::NULL, &report_to_js(&report));
                }
                return Err(JsValue::from_str(&report.message));
            }
        };

        let host = Rc::new(DomHost::new(window.clone(), document.clone(), options.dom.clone()));
        let inner = Rc::new_cyclic(|weak: &Weak<Inner>| {
            let on_fire: LoadCallback = {
                let weak = weak.clone();
                Rc::new(move |source: &'static str| {
                    if let Some(inner) = weak.upgrade() {
                        inner.trigger(source);
                    }
                })
            };
            let reporter = weak.clone();
            controller.on_error(move |err| {
                if let Some(inner) = reporter.upgrade() {
                    inner.report_error(err.clone());
                }
            });
            Inner {
                triggers: DomTriggerHost::new(container.clone(), on_fire),
                runtime: Rc::new(RefCell::new(JsRuntime::new(renderer, container.clone()))),
                resolver: RefCell::new(PointerResolver::new(options.pointer)),
                bridge: Rc::new(ModalBridge::new(host, GlooSleeper, options.modal)),
                fetcher: Rc::new(ResourceFetcher::new(GlooTransport, GlooSleeper, clock.clone())),
                controller: RefCell::new(controller),
                hotspots: RefCell::new(None),
                disposer: RefCell::new(Disposer::new()),
                frame_loop: RefCell::new(None),
                last_frame: Cell::new(None),
                listeners: RefCell::new(Vec::new()),
                overlay: RefCell::new(None),
                on_error: RefCell::new(on_error),
                options,
                window: Attached::new(window),
                document: Attached::new(document),
                container: Attached::new(container),
                clock,
            }
        });
        inner.attach_surface_listeners()?;
        inner.register_teardown();
        Ok(SceneEmbed { inner })
    }

    /// Arms the configured triggers, or loads at once when lazy loading
    /// is off.
    pub fn start(&self) {
        self.inner.start();
    }

    /// Manual load. Returns `false` when another trigger already won.
    #[wasm_bindgen(js_name = triggerLoad)]
    pub fn trigger_load(&self, source: Option<String>) -> bool {
        self.inner.trigger(source.as_deref().unwrap_or("manual"))
    }

    pub fn retry(&self) -> Result<(), JsValue> {
        self.inner
            .retry()
            .map_err(|rejected| JsValue::from_str(&rejected.to_string()))
    }

    /// Current status as JSON.
    pub fn state(&self) -> String {
        serde_json::to_string(&self.inner.status()).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn dispose(&self) {
        self.inner.dispose();
    }
}
