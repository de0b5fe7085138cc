/// Teardown steps, in the order they run.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum DisposeStage {
    StopLoop,
    DisconnectObserver,
    ClearTimers,
    RemoveListeners,
    ReleaseHotspots,
    TeardownRuntime,
    DropReferences,
}

impl DisposeStage {
    pub const ALL: [DisposeStage; 7] = [
        DisposeStage::StopLoop,
        DisposeStage::DisconnectObserver,
        DisposeStage::ClearTimers,
        DisposeStage::RemoveListeners,
        DisposeStage::ReleaseHotspots,
        DisposeStage::TeardownRuntime,
        DisposeStage::DropReferences,
    ];
}

type Step = Box<dyn FnOnce()>;

/// Collects teardown steps from every component and runs them once, stage
/// by stage. Within a stage, steps run in registration order.
#[derive(Default)]
pub struct Disposer {
    steps: Vec<(DisposeStage, Step)>,
    disposed: bool,
    ran: Vec<DisposeStage>,
}

impl Disposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A step registered after disposal runs immediately.
    pub fn register(&mut self, stage: DisposeStage, step: impl FnOnce() + 'static) {
        if self.disposed {
            log::debug!("late {stage:?} step runs immediately");
            step();
            self.ran.push(stage);
            return;
        }
        self.steps.push((stage, Box::new(step)));
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn pending(&self) -> usize {
        self.steps.len()
    }

    /// Stages of every step run so far, in run order.
    pub fn ran(&self) -> &[DisposeStage] {
        &self.ran
    }

    /// Safe to call repeatedly; only the first call does anything.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        let mut steps = std::mem::take(&mut self.steps);
        steps.sort_by_key(|(stage, _)| *stage);
        for (stage, step) in steps {
            step();
            self.ran.push(stage);
        }
        log::info!("disposed after {} teardown step(s)", self.ran.len());
    }
}

#[cfg(test)]
mod tests {
    use super::{DisposeStage, Disposer};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn stages_run_in_teardown_order() {
        let order = Rc::new(RefCell::new(Vec::new()));
        let mut d = Disposer::new();
        for (stage, label) in [
            (DisposeStage::TeardownRuntime, "runtime"),
            (DisposeStage::StopLoop, "loop"),
            (DisposeStage::RemoveListeners, "listeners-a"),
            (DisposeStage::ReleaseHotspots, "hotspots"),
            (DisposeStage::RemoveListeners, "listeners-b"),
            (DisposeStage::DisconnectObserver, "observer"),
        ] {
            let order = order.clone();
            d.register(stage, move || order.borrow_mut().push(label));
        }
        d.dispose();
        assert_eq!(
            *order.borrow(),
            vec!["loop", "observer", "listeners-a", "listeners-b", "hotspots", "runtime"]
        );
        assert_eq!(d.pending(), 0);
    }

    #[test]
    fn dispose_twice_is_a_no_op() {
        let count = Rc::new(RefCell::new(0));
        let mut d = Disposer::new();
        let c = count.clone();
        d.register(DisposeStage::ClearTimers, move || *c.borrow_mut() += 1);
        d.dispose();
        d.dispose();
        assert_eq!(*count.borrow(), 1);
        assert!(d.is_disposed());
    }

    #[test]
    fn late_registration_runs_at_once() {
        let hit = Rc::new(RefCell::new(false));
        let mut d = Disposer::new();
        d.dispose();
        let h = hit.clone();
        d.register(DisposeStage::DropReferences, move || *h.borrow_mut() = true);
        assert!(*hit.borrow());
        assert_eq!(d.ran(), &[DisposeStage::DropReferences]);
    }
}
