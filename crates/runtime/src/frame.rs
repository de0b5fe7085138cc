use foundation::time::Millis;

/// Animation frame metadata.
///
/// One `Frame` per host frame-presentation callback. Per-frame work (pointer
/// resolution, glow easing) reads its timestamp instead of sampling the
/// clock, so every consumer in a frame agrees on "now".
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Host time at the start of the frame.
    pub now: Millis,
    /// Time since the previous frame (ms); zero for the first frame.
    pub dt_ms: f64,
}

impl Frame {
    pub fn first(now: Millis) -> Self {
        Self {
            index: 0,
            now,
            dt_ms: 0.0,
        }
    }

    pub fn next(self, now: Millis) -> Self {
        Self {
            index: self.index + 1,
            now,
            dt_ms: now.since(self.now),
        }
    }
}
