//! Pointer and touch input resolved against the hotspot index.
//!
//! Input handlers only record state. Hover raycasts happen in
//! [`PointerResolver::update`], once per animation frame at most, and only
//! when the throttle and idle gates allow it. Clicks and taps are resolved
//! immediately.

use foundation::math::Vec2;
use foundation::time::Millis;
use runtime::throttle::Throttle;
use scene::{CameraView, HotspotIndex, SurfaceRect};

use crate::gesture::{Gesture, GestureKind};
use crate::settings::PointerSettings;

/// Cursor shown over the rendering surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Affordance {
    #[default]
    Default,
    Interactive,
}

impl Affordance {
    pub fn css_cursor(self) -> &'static str {
        match self {
            Affordance::Default => "default",
            Affordance::Interactive => "pointer",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct PointerIdleState {
    pub last_activity_at: Option<Millis>,
    pub last_raycast_at: Option<Millis>,
}

impl PointerIdleState {
    pub fn is_idle(&self, now: Millis, idle_ms: f64) -> bool {
        match self.last_activity_at {
            Some(at) => now.since(at) >= idle_ms,
            None => true,
        }
    }
}

/// Camera and surface geometry needed to turn client pixels into a ray.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickContext {
    pub camera: CameraView,
    pub surface: SurfaceRect,
}

impl PickContext {
    /// Index of the nearest interactive record under the client position.
    pub fn resolve(&self, index: &HotspotIndex, client_x: f64, client_y: f64) -> Option<usize> {
        let ndc = self.surface.to_ndc(client_x, client_y)?;
        let ray = self.camera.ray_through_ndc(ndc)?;
        index.pick(ray).map(|hit| hit.index)
    }
}

/// Hover moved from one record (or none) to another.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HoverChange {
    pub left: Option<usize>,
    pub entered: Option<usize>,
    pub affordance: Affordance,
}

/// A resolved click, ready for the modal bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickRequest {
    pub record: usize,
    pub dialog_id: String,
    pub station_key: String,
}

#[derive(Debug, Clone)]
pub struct PointerResolver {
    settings: PointerSettings,
    pointer: Option<Vec2>,
    moved_since_raycast: bool,
    idle: PointerIdleState,
    throttle: Throttle,
    hovered: Option<usize>,
    affordance: Affordance,
    mouse: Gesture,
    touch: Gesture,
    suppress_next_click: bool,
}

impl PointerResolver {
    pub fn new(settings: PointerSettings) -> Self {
        Self {
            settings,
            pointer: None,
            moved_since_raycast: false,
            idle: PointerIdleState::default(),
            throttle: Throttle::new(settings.throttle_ms),
            hovered: None,
            affordance: Affordance::Default,
            mouse: Gesture::default(),
            touch: Gesture::default(),
            suppress_next_click: false,
        }
    }

    pub fn settings(&self) -> &PointerSettings {
        &self.settings
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    pub fn affordance(&self) -> Affordance {
        self.affordance
    }

    pub fn idle_state(&self) -> PointerIdleState {
        self.idle
    }

    fn note_activity(&mut self, now: Millis) {
        self.idle.last_activity_at = Some(now);
    }

    pub fn on_pointer_move(&mut self, client_x: f64, client_y: f64, now: Millis) {
        let at = Vec2::new(client_x, client_y);
        self.pointer = Some(at);
        self.moved_since_raycast = true;
        self.mouse.move_to(at);
        self.note_activity(now);
    }

    pub fn on_pointer_down(&mut self, client_x: f64, client_y: f64, now: Millis) {
        self.mouse.start(Vec2::new(client_x, client_y), now);
        self.suppress_next_click = false;
        self.note_activity(now);
    }

    /// A press that travelled past the tap threshold was an orbit drag; the
    /// click the browser fires after it is swallowed.
    pub fn on_pointer_up(&mut self, client_x: f64, client_y: f64, now: Millis) {
        self.mouse.move_to(Vec2::new(client_x, client_y));
        if let Some(summary) = self.mouse.end(now)
            && summary.moved_beyond(self.settings.tap_max_move_px)
        {
            log::trace!("drag of {:.1}px, next click suppressed", summary.max_travel_px);
            self.suppress_next_click = true;
        }
        self.note_activity(now);
    }

    pub fn on_click(
        &mut self,
        client_x: f64,
        client_y: f64,
        now: Millis,
        ctx: &PickContext,
        index: &HotspotIndex,
    ) -> Option<ClickRequest> {
        self.note_activity(now);
        if std::mem::take(&mut self.suppress_next_click) {
            return None;
        }
        self.click_at(client_x, client_y, ctx, index)
    }

    pub fn on_touch_start(&mut self, client_x: f64, client_y: f64, now: Millis) {
        self.touch.start(Vec2::new(client_x, client_y), now);
        self.note_activity(now);
    }

    pub fn on_touch_move(&mut self, client_x: f64, client_y: f64, now: Millis) {
        self.touch.move_to(Vec2::new(client_x, client_y));
        self.note_activity(now);
    }

    /// Resolves a tap at the gesture's last position. Drags yield nothing.
    pub fn on_touch_end(
        &mut self,
        now: Millis,
        ctx: &PickContext,
        index: &HotspotIndex,
    ) -> Option<ClickRequest> {
        self.note_activity(now);
        let summary = self.touch.end(now)?;
        match summary.classify(&self.settings) {
            GestureKind::Tap => self.click_at(summary.end.x, summary.end.y, ctx, index),
            GestureKind::Drag => None,
        }
    }

    /// Multi-touch or an interrupted gesture.
    pub fn on_touch_cancel(&mut self) {
        self.touch.cancel();
    }

    /// The pointer left the surface: hover is cleared immediately.
    pub fn on_pointer_leave(&mut self, index: &mut HotspotIndex) -> Option<HoverChange> {
        self.pointer = None;
        self.moved_since_raycast = false;
        self.mouse.cancel();
        self.set_hover(index, None)
    }

    /// Whether [`PointerResolver::update`] at `now` would raycast. Callers
    /// use it to skip reading the camera and surface on quiet frames.
    pub fn wants_raycast(&self, now: Millis) -> bool {
        self.pointer.is_some()
            && self.moved_since_raycast
            && !self.idle.is_idle(now, self.settings.idle_ms)
            && self.throttle.would_pass(now)
    }

    /// Per-frame hover resolution. Skipped unless the pointer moved since
    /// the last raycast, the user is not idle and the throttle interval has
    /// elapsed.
    pub fn update(
        &mut self,
        now: Millis,
        ctx: &PickContext,
        index: &mut HotspotIndex,
    ) -> Option<HoverChange> {
        let pointer = self.pointer?;
        if !self.moved_since_raycast {
            return None;
        }
        if self.idle.is_idle(now, self.settings.idle_ms) {
            self.moved_since_raycast = false;
            return None;
        }
        if !self.throttle.try_pass(now) {
            return None;
        }
        self.moved_since_raycast = false;
        self.idle.last_raycast_at = Some(now);

        let hit = ctx.resolve(index, pointer.x, pointer.y);
        self.set_hover(index, hit)
    }

    /// Drops hover and gesture state, e.g. after the index was rebuilt.
    pub fn reset(&mut self) {
        self.pointer = None;
        self.moved_since_raycast = false;
        self.hovered = None;
        self.affordance = Affordance::Default;
        self.mouse.cancel();
        self.touch.cancel();
        self.suppress_next_click = false;
        self.throttle.reset();
    }

    fn click_at(
        &mut self,
        client_x: f64,
        client_y: f64,
        ctx: &PickContext,
        index: &HotspotIndex,
    ) -> Option<ClickRequest> {
        let Some(hit) = ctx.resolve(index, client_x, client_y) else {
            log::trace!("click at ({client_x:.0}, {client_y:.0}) hit nothing interactive");
            return None;
        };
        let record = index.get(hit)?;
        log::debug!("click on station {}", record.station_key);
        Some(ClickRequest {
            record: hit,
            dialog_id: record.dialog_id.clone(),
            station_key: record.station_key.clone(),
        })
    }

    fn set_hover(&mut self, index: &mut HotspotIndex, hit: Option<usize>) -> Option<HoverChange> {
        if hit == self.hovered {
            return None;
        }
        let left = self.hovered.take();
        if let Some(prev) = left
            && let Some(record) = index.get_mut(prev)
        {
            record.target_glow = 0.0;
            record.is_highlighted = false;
        }
        let entered = hit.filter(|&i| index.get(i).is_some());
        if let Some(i) = entered
            && let Some(record) = index.get_mut(i)
        {
            record.target_glow = 1.0;
            record.is_highlighted = true;
        }
        self.hovered = entered;
        self.affordance = if entered.is_some() {
            Affordance::Interactive
        } else {
            Affordance::Default
        };
        Some(HoverChange {
            left,
            entered,
            affordance: self.affordance,
        })
    }
}
