use std::cell::Cell;
use std::rc::Rc;

use foundation::time::Millis;

/// Source of the current host time.
pub trait Clock {
    fn now(&self) -> Millis;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Millis {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now(&self) -> Millis {
        (**self).now()
    }
}

/// Clock that only moves when told to.
///
/// Used to replay timing-sensitive behavior (debounce windows, idle gating,
/// backoff) without real time passing.
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Cell<f64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(ms: f64) -> Self {
        Self {
            now_ms: Cell::new(ms),
        }
    }

    pub fn advance(&self, ms: f64) {
        self.now_ms.set(self.now_ms.get() + ms.max(0.0));
    }

    pub fn set(&self, t: Millis) {
        self.now_ms.set(t.0);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millis {
        Millis(self.now_ms.get())
    }
}
