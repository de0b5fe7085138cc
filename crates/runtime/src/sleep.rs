use std::cell::RefCell;
use std::rc::Rc;

use crate::clock::ManualClock;

/// Suspends the current task for a number of milliseconds.
///
/// The only suspension points in this layer are network I/O and these
/// explicitly scheduled waits.
#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, ms: u64);
}

impl<S: Sleeper + ?Sized> Sleeper for &S {
    async fn sleep(&self, ms: u64) {
        (**self).sleep(ms).await
    }
}

impl<S: Sleeper + ?Sized> Sleeper for Rc<S> {
    async fn sleep(&self, ms: u64) {
        (**self).sleep(ms).await
    }
}

/// Sleeper that completes immediately, advancing a [`ManualClock`] by the
/// requested amount and recording every wait.
#[derive(Debug)]
pub struct RecordingSleeper {
    clock: Rc<ManualClock>,
    waits: RefCell<Vec<u64>>,
}

impl RecordingSleeper {
    pub fn new(clock: Rc<ManualClock>) -> Self {
        Self {
            clock,
            waits: RefCell::new(Vec::new()),
        }
    }

    pub fn clock(&self) -> &Rc<ManualClock> {
        &self.clock
    }

    /// Every wait requested so far, in order.
    pub fn waits(&self) -> Vec<u64> {
        self.waits.borrow().clone()
    }

    pub fn total_waited_ms(&self) -> u64 {
        self.waits.borrow().iter().sum()
    }
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, ms: u64) {
        self.waits.borrow_mut().push(ms);
        self.clock.advance(ms as f64);
    }
}
