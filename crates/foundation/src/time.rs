/// Host timestamp in milliseconds.
///
/// Matches the browser's `performance.now()` timebase; tests drive it from a
/// manual clock so every timing decision is replayable.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Millis(pub f64);

impl Millis {
    pub const ZERO: Millis = Millis(0.0);

    /// Milliseconds elapsed since `earlier`, clamped at zero.
    pub fn since(self, earlier: Millis) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }

    pub fn plus(self, ms: f64) -> Millis {
        Millis(self.0 + ms)
    }
}
