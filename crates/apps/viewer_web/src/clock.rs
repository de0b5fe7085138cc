use foundation::time::Millis;
use gloo_timers::future::TimeoutFuture;
use runtime::clock::Clock;
use runtime::sleep::Sleeper;

/// `performance.now()`, falling back to `Date.now()` when the page has no
/// performance timeline.
#[derive(Debug, Clone)]
pub struct PerformanceClock {
    performance: Option<web_sys::Performance>,
}

impl PerformanceClock {
    pub fn new() -> Self {
        Self {
            performance: web_sys::window().and_then(|w| w.performance()),
        }
    }
}

impl Clock for PerformanceClock {
    fn now(&self) -> Millis {
        match &self.performance {
            Some(p) => Millis(p.now()),
            None => Millis(js_sys::Date::now()),
        }
    }
}

#[derive(Debug, Default, Copy, Clone)]
pub struct GlooSleeper;

impl Sleeper for GlooSleeper {
    async fn sleep(&self, ms: u64) {
        TimeoutFuture::new(ms.min(u32::MAX as u64) as u32).await;
    }
}
