use foundation::math::Vec2;
use foundation::time::Millis;

use crate::settings::PointerSettings;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GestureKind {
    Tap,
    Drag,
}

/// Movement and duration of one finished press.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GestureSummary {
    pub start: Vec2,
    pub end: Vec2,
    /// Largest distance from the start point seen during the press.
    pub max_travel_px: f64,
    pub duration_ms: f64,
}

impl GestureSummary {
    /// Tap iff travel stays under the move threshold and the press is shorter
    /// than the time threshold.
    pub fn classify(&self, settings: &PointerSettings) -> GestureKind {
        if self.max_travel_px < settings.tap_max_move_px
            && self.duration_ms < settings.tap_max_duration_ms
        {
            GestureKind::Tap
        } else {
            GestureKind::Drag
        }
    }

    pub fn moved_beyond(&self, threshold_px: f64) -> bool {
        self.max_travel_px >= threshold_px
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Phase {
    Idle,
    Active {
        start: Vec2,
        last: Vec2,
        started_at: Millis,
        max_travel_px: f64,
    },
}

/// Tracks a single press from start to end: `idle -> active -> idle`.
#[derive(Debug, Clone, PartialEq)]
pub struct Gesture {
    phase: Phase,
}

impl Default for Gesture {
    fn default() -> Self {
        Self { phase: Phase::Idle }
    }
}

impl Gesture {
    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active { .. })
    }

    /// Starting while active restarts the gesture.
    pub fn start(&mut self, at_px: Vec2, now: Millis) {
        self.phase = Phase::Active {
            start: at_px,
            last: at_px,
            started_at: now,
            max_travel_px: 0.0,
        };
    }

    pub fn move_to(&mut self, at_px: Vec2) {
        if let Phase::Active {
            start,
            last,
            max_travel_px,
            ..
        } = &mut self.phase
        {
            *last = at_px;
            *max_travel_px = max_travel_px.max((at_px - *start).length());
        }
    }

    /// Ends the gesture at its last known position.
    pub fn end(&mut self, now: Millis) -> Option<GestureSummary> {
        let Phase::Active {
            start,
            last,
            started_at,
            max_travel_px,
        } = std::mem::replace(&mut self.phase, Phase::Idle)
        else {
            return None;
        };
        Some(GestureSummary {
            start,
            end: last,
            max_travel_px,
            duration_ms: now.since(started_at),
        })
    }

    pub fn cancel(&mut self) {
        self.phase = Phase::Idle;
    }
}
