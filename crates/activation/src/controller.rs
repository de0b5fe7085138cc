use foundation::time::Millis;
use runtime::clock::Clock;
use runtime::event_bus::{Event, EventBus};

use crate::error::{ActivationError, RetryRejected};
use crate::state::{LoadState, TriggerConfig};
use crate::triggers::{ArmedTrigger, TriggerHost, TriggerKind};

/// Proof that a `trigger_load` call won the race for a session.
///
/// Completions and progress must present the ticket; tickets from an older
/// session are ignored.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SessionTicket {
    pub session: u32,
}

type ErrorCallback = Box<dyn FnMut(&ActivationError)>;

/// `pending -> loading -> loaded | error`, gated by racing trigger sources.
///
/// The first `trigger_load` of a session wins and disarms every other
/// source; later calls are logged and ignored.
pub struct ActivationController<C> {
    clock: C,
    config: TriggerConfig,
    state: LoadState,
    session: u32,
    disposed: bool,
    armed: Vec<Box<dyn ArmedTrigger>>,
    winner: Option<String>,
    duplicates: Vec<String>,
    progress: Option<u8>,
    last_error: Option<ActivationError>,
    error_reported: bool,
    on_error: Option<ErrorCallback>,
    events: EventBus,
}

impl<C: Clock> ActivationController<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            config: TriggerConfig::default(),
            state: LoadState::Pending,
            session: 1,
            disposed: false,
            armed: Vec::new(),
            winner: None,
            duplicates: Vec::new(),
            progress: None,
            last_error: None,
            error_reported: false,
            on_error: None,
            events: EventBus::new(),
        }
    }

    /// Takes effect on the next `start()` or `retry()`.
    pub fn configure(&mut self, config: TriggerConfig) {
        self.config = config;
    }

    pub fn config(&self) -> &TriggerConfig {
        &self.config
    }

    /// Host-visible error callback. Invoked at most once per session.
    pub fn on_error(&mut self, callback: impl FnMut(&ActivationError) + 'static) {
        self.on_error = Some(Box::new(callback));
    }

    pub fn observe(&self) -> LoadState {
        self.state
    }

    pub fn session(&self) -> u32 {
        self.session
    }

    pub fn progress(&self) -> Option<u8> {
        self.progress
    }

    pub fn last_error(&self) -> Option<&ActivationError> {
        self.last_error.as_ref()
    }

    pub fn winning_source(&self) -> Option<&str> {
        self.winner.as_deref()
    }

    /// Sources that fired after the winner, in arrival order.
    pub fn duplicate_sources(&self) -> &[String] {
        &self.duplicates
    }

    pub fn armed_count(&self) -> usize {
        self.armed.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    fn now(&self) -> Millis {
        self.clock.now()
    }

    fn emit(&mut self, message: String) {
        let at = self.now();
        self.events.emit(at, "activation", message);
    }

    /// Arms the configured trigger sources. With lazy loading off this
    /// activates at once and returns the session ticket.
    pub fn start(&mut self, host: &dyn TriggerHost) -> Option<SessionTicket> {
        if self.disposed || self.state != LoadState::Pending {
            log::debug!("start ignored in state {}", self.state.as_str());
            return None;
        }
        self.disarm_all();

        if self.config.immediate {
            return self.trigger_load("immediate");
        }
        for kind in TriggerKind::enabled_by(&self.config) {
            match host.arm(kind, &self.config) {
                Some(armed) => self.armed.push(armed),
                None => log::warn!("{} trigger could not be armed", kind.source_name()),
            }
        }
        if !self.config.activates_on_its_own() {
            log::info!("no automatic trigger configured; waiting for a manual load");
        }
        self.emit(format!(
            "session {} armed {} trigger(s)",
            self.session,
            self.armed.len()
        ));
        None
    }

    /// First caller wins. Returns the ticket the winner uses to report
    /// progress and completion; every later call is a logged no-op.
    pub fn trigger_load(&mut self, source: &str) -> Option<SessionTicket> {
        if self.disposed {
            return None;
        }
        if self.state != LoadState::Pending {
            log::debug!(
                "load trigger {source} ignored: session {} already {}",
                self.session,
                self.state.as_str()
            );
            self.duplicates.push(source.to_string());
            return None;
        }
        self.disarm_all();
        self.state = LoadState::Loading;
        self.winner = Some(source.to_string());
        log::info!("activation session {} started by {source}", self.session);
        self.emit(format!("session {} loading via {source}", self.session));
        Some(SessionTicket {
            session: self.session,
        })
    }

    /// Progress for the running session; never decreases.
    pub fn report_progress(&mut self, ticket: SessionTicket, percent: u8) {
        if !self.is_current(ticket) || self.state != LoadState::Loading {
            return;
        }
        let percent = percent.min(100);
        if self.progress.is_some_and(|p| percent <= p) {
            return;
        }
        self.progress = Some(percent);
    }

    /// Ends the running session. Returns `false` for a stale ticket or a
    /// session that is no longer loading.
    pub fn complete(&mut self, ticket: SessionTicket, result: Result<(), ActivationError>) -> bool {
        if !self.is_current(ticket) || self.state != LoadState::Loading {
            log::debug!("stale completion for session {} ignored", ticket.session);
            return false;
        }
        match result {
            Ok(()) => {
                self.state = LoadState::Loaded;
                self.progress = Some(100);
                log::info!("activation session {} loaded", self.session);
                self.emit(format!("session {} loaded", self.session));
            }
            Err(err) => self.enter_error(err),
        }
        true
    }

    /// Fails the session outside a bootstrap, e.g. when the container is
    /// missing before anything was armed.
    pub fn fail(&mut self, error: ActivationError) {
        if self.disposed || matches!(self.state, LoadState::Loaded | LoadState::Error) {
            return;
        }
        self.disarm_all();
        self.enter_error(error);
    }

    fn enter_error(&mut self, error: ActivationError) {
        self.state = LoadState::Error;
        log::error!("activation session {} failed: {error}", self.session);
        self.emit(format!("session {} failed: {error}", self.session));
        if !self.error_reported {
            self.error_reported = true;
            if let Some(cb) = self.on_error.as_mut() {
                cb(&error);
            }
        }
        self.last_error = Some(error);
    }

    /// Starts a fresh session after an error and re-arms triggers.
    pub fn retry(&mut self, host: &dyn TriggerHost) -> Result<Option<SessionTicket>, RetryRejected> {
        let retryable = self.last_error.as_ref().is_none_or(ActivationError::is_retryable);
        if self.disposed || self.state != LoadState::Error || !retryable {
            return Err(RetryRejected { state: self.state });
        }
        self.session += 1;
        self.state = LoadState::Pending;
        self.progress = None;
        self.last_error = None;
        self.error_reported = false;
        self.winner = None;
        self.duplicates.clear();
        log::info!("manual retry opened session {}", self.session);
        Ok(self.start(host))
    }

    /// Disarms everything; completions still in flight become stale.
    /// Disarms the armed triggers of one kind, leaving the others armed.
    /// Returns how many were disarmed.
    pub fn disarm(&mut self, kind: TriggerKind) -> usize {
        let (matching, rest): (Vec<_>, Vec<_>) =
            self.armed.drain(..).partition(|armed| armed.kind() == kind);
        self.armed = rest;
        let count = matching.len();
        for mut armed in matching {
            log::trace!("disarming {} trigger", kind.source_name());
            armed.disarm();
        }
        count
    }

    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disarm_all();
        self.disposed = true;
        self.session += 1;
        self.on_error = None;
        self.emit("disposed".to_string());
    }

    /// Whether `ticket` still belongs to the live session.
    pub fn is_current(&self, ticket: SessionTicket) -> bool {
        !self.disposed && ticket.session == self.session
    }

    fn disarm_all(&mut self) {
        for mut armed in self.armed.drain(..) {
            log::trace!("disarming {} trigger", armed.kind().source_name());
            armed.disarm();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ActivationController;
    use crate::error::ActivationError;
    use crate::state::{LoadState, TriggerConfig};
    use crate::triggers::{ArmedTrigger, TriggerHost, TriggerKind};
    use pretty_assertions::assert_eq;
    use runtime::clock::ManualClock;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        armed: RefCell<Vec<TriggerKind>>,
        disarmed: RefCell<Vec<TriggerKind>>,
    }

    struct Armed {
        kind: TriggerKind,
        log: Rc<Log>,
        done: bool,
    }

    impl ArmedTrigger for Armed {
        fn kind(&self) -> TriggerKind {
            self.kind
        }

        fn disarm(&mut self) {
            if !self.done {
                self.done = true;
                self.log.disarmed.borrow_mut().push(self.kind);
            }
        }
    }

    struct Host(Rc<Log>);

    impl TriggerHost for Host {
        fn arm(&self, kind: TriggerKind, _config: &TriggerConfig) -> Option<Box<dyn ArmedTrigger>> {
            self.0.armed.borrow_mut().push(kind);
            Some(Box::new(Armed {
                kind,
                log: self.0.clone(),
                done: false,
            }))
        }
    }

    fn controller() -> (ActivationController<Rc<ManualClock>>, Host, Rc<Log>) {
        let log = Rc::new(Log::default());
        let c = ActivationController::new(Rc::new(ManualClock::new()));
        (c, Host(log.clone()), log)
    }

    fn render_failure() -> ActivationError {
        ActivationError::RenderBootstrapFailure("no webgl".to_string())
    }

    #[test]
    fn first_trigger_wins_and_disarms_the_rest() {
        let (mut c, host, log) = controller();
        assert!(c.start(&host).is_none());
        assert_eq!(c.armed_count(), 3);

        let ticket = c.trigger_load("delay").expect("winner");
        assert_eq!(c.observe(), LoadState::Loading);
        assert_eq!(c.armed_count(), 0);
        assert_eq!(log.disarmed.borrow().len(), 3);

        assert!(c.trigger_load("viewport").is_none());
        assert!(c.trigger_load("interaction").is_none());
        assert_eq!(c.observe(), LoadState::Loading);
        assert_eq!(c.winning_source(), Some("delay"));
        assert_eq!(c.duplicate_sources(), &["viewport".to_string(), "interaction".to_string()]);
        assert_eq!(ticket.session, 1);
    }

    #[test]
    fn repeated_triggers_equal_a_single_trigger() {
        let (mut once, _, _) = controller();
        once.trigger_load("manual");
        let (mut many, _, _) = controller();
        for _ in 0..5 {
            many.trigger_load("manual");
        }
        assert_eq!(once.observe(), many.observe());
        assert_eq!(once.session(), many.session());
    }

    #[test]
    fn immediate_config_activates_on_start() {
        let (mut c, host, log) = controller();
        c.configure(TriggerConfig::immediate());
        let ticket = c.start(&host).expect("immediate");
        assert_eq!(c.winning_source(), Some("immediate"));
        assert!(log.armed.borrow().is_empty());
        assert!(c.complete(ticket, Ok(())));
        assert_eq!(c.observe(), LoadState::Loaded);
    }

    #[test]
    fn manual_only_arms_nothing_and_waits() {
        let (mut c, host, _) = controller();
        c.configure(TriggerConfig::manual());
        assert!(c.start(&host).is_none());
        assert_eq!(c.armed_count(), 0);
        assert_eq!(c.observe(), LoadState::Pending);
        assert!(c.trigger_load("manual").is_some());
    }

    #[test]
    fn error_callback_fires_exactly_once() {
        let (mut c, _, _) = controller();
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        c.on_error(move |_| seen.set(seen.get() + 1));

        let ticket = c.trigger_load("manual").expect("ticket");
        assert!(c.complete(ticket, Err(render_failure())));
        assert!(!c.complete(ticket, Err(render_failure())));
        c.fail(render_failure());
        assert_eq!(calls.get(), 1);
        assert_eq!(c.observe(), LoadState::Error);
        assert!(c.observe().shows_retry());
    }

    #[test]
    fn retry_opens_a_new_session_and_ignores_stale_completions() {
        let (mut c, host, log) = controller();
        c.start(&host);
        let first = c.trigger_load("viewport").expect("first");
        c.complete(first, Err(render_failure()));

        assert!(c.retry(&host).expect("retry").is_none());
        assert_eq!(c.session(), 2);
        assert_eq!(c.observe(), LoadState::Pending);
        assert_eq!(log.armed.borrow().len(), 6);

        assert!(!c.complete(first, Ok(())));
        assert_eq!(c.observe(), LoadState::Pending);

        let second = c.trigger_load("manual").expect("second");
        assert!(c.complete(second, Ok(())));
        assert_eq!(c.observe(), LoadState::Loaded);
    }

    #[test]
    fn retry_is_rejected_unless_errored() {
        let (mut c, host, _) = controller();
        assert_eq!(c.retry(&host).map_err(|e| e.state), Err(LoadState::Pending));
        c.fail(ActivationError::ContainerMissing {
            selector: "#scene-embed".to_string(),
        });
        assert_eq!(c.retry(&host).map_err(|e| e.state), Err(LoadState::Error));
    }

    #[test]
    fn progress_is_monotonic_within_a_session() {
        let (mut c, _, _) = controller();
        let t = c.trigger_load("manual").expect("t");
        c.report_progress(t, 40);
        c.report_progress(t, 20);
        assert_eq!(c.progress(), Some(40));
        c.report_progress(t, 250);
        assert_eq!(c.progress(), Some(100));
    }

    #[test]
    fn dispose_disarms_and_makes_completions_stale() {
        let (mut c, host, log) = controller();
        c.start(&host);
        c.dispose();
        c.dispose();
        assert_eq!(log.disarmed.borrow().len(), 3);
        assert!(c.trigger_load("viewport").is_none());
        assert!(c.is_disposed());
        assert_eq!(c.events().last().map(|e| e.message.as_str()), Some("disposed"));
    }

    #[test]
    fn disarming_one_kind_keeps_the_others_armed() {
        let (mut c, host, log) = controller();
        c.start(&host);
        assert_eq!(c.armed_count(), 3);

        assert_eq!(c.disarm(TriggerKind::Delay), 1);
        assert_eq!(c.disarm(TriggerKind::Delay), 0);
        assert_eq!(*log.disarmed.borrow(), vec![TriggerKind::Delay]);
        assert_eq!(c.armed_count(), 2);

        c.dispose();
        assert_eq!(log.disarmed.borrow().len(), 3);
    }

    #[test]
    fn tickets_go_stale_on_dispose() {
        let (mut c, _host, _log) = controller();
        let ticket = c.trigger_load("manual").expect("ticket");
        assert!(c.is_current(ticket));
        c.dispose();
        assert!(!c.is_current(ticket));
    }
}
