use std::cell::RefCell;

use foundation::time::Millis;
use runtime::retry::BoundedRetry;
use runtime::sleep::Sleeper;
use runtime::throttle::Debouncer;
use serde::{Deserialize, Serialize};

use crate::assets::{DeferredActivation, DeferredAssets};
use crate::error::DialogDiscoveryTimeout;
use crate::host::HostDocument;
use crate::opener::{DialogOpener, default_openers};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ModalSettings {
    pub debounce_ms: f64,
    /// How long a synthesized trigger stays in the document after use.
    pub synthetic_grace_ms: f64,
    pub discovery_attempts: u32,
    pub discovery_interval_ms: u64,
}

impl Default for ModalSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 400.0,
            synthetic_grace_ms: 1500.0,
            discovery_attempts: 5,
            discovery_interval_ms: 100,
        }
    }
}

impl ModalSettings {
    pub fn discovery(&self) -> BoundedRetry {
        BoundedRetry::new(self.discovery_attempts, self.discovery_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModalTriggerRecord {
    pub dialog_id: String,
    pub last_triggered_at: Millis,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TriggerSource {
    Visible,
    /// Only hidden duplicates existed; the first one was used.
    Hidden,
    Synthesized,
    /// Synthesis failed too; only page-level openers could run.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogRequest {
    /// Dropped: the same dialog was requested inside the debounce window.
    Debounced,
    Dispatched {
        trigger: TriggerSource,
        /// Openers that reported delivery, in the order they ran.
        delivered_by: Vec<&'static str>,
    },
}

/// Opens host-page dialogs in response to hotspot clicks.
pub struct ModalBridge<H: HostDocument, S> {
    host: H,
    sleeper: S,
    settings: ModalSettings,
    openers: Vec<Box<dyn DialogOpener<H>>>,
    debounce: RefCell<Debouncer<String>>,
    synthetic: RefCell<Vec<(H::Element, Millis)>>,
    assets: DeferredAssets,
}

impl<H: HostDocument, S: Sleeper> ModalBridge<H, S> {
    pub fn new(host: H, sleeper: S, settings: ModalSettings) -> Self {
        Self::with_openers(host, sleeper, settings, default_openers())
    }

    pub fn with_openers(
        host: H,
        sleeper: S,
        settings: ModalSettings,
        openers: Vec<Box<dyn DialogOpener<H>>>,
    ) -> Self {
        Self {
            host,
            sleeper,
            settings,
            openers,
            debounce: RefCell::new(Debouncer::new(settings.debounce_ms)),
            synthetic: RefCell::new(Vec::new()),
            assets: DeferredAssets::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn deferred_assets(&self) -> &DeferredAssets {
        &self.assets
    }

    pub fn trigger_record(&self, dialog_id: &str) -> Option<ModalTriggerRecord> {
        self.debounce
            .borrow()
            .last_accepted(&dialog_id.to_string())
            .map(|at| ModalTriggerRecord {
                dialog_id: dialog_id.to_string(),
                last_triggered_at: at,
            })
    }

    pub fn pending_synthetic(&self) -> usize {
        self.synthetic.borrow().len()
    }

    /// Requests the dialog and then releases its deferred assets.
    pub async fn open(
        &self,
        dialog_id: &str,
        station_key: &str,
        now: Millis,
    ) -> Result<DialogRequest, DialogDiscoveryTimeout> {
        let request = self.request_dialog(dialog_id, station_key, now);
        if request == DialogRequest::Debounced {
            return Ok(request);
        }
        match self
            .assets
            .activate(&self.host, &self.sleeper, self.settings.discovery(), dialog_id)
            .await?
        {
            DeferredActivation::Activated { assets } => {
                log::debug!("dialog {dialog_id} opened with {assets} deferred asset(s)")
            }
            DeferredActivation::AlreadyActive => {}
            DeferredActivation::Closed => log::debug!("dialog {dialog_id} opened after teardown"),
        }
        Ok(request)
    }

    /// Debounces, finds or synthesizes a trigger and runs every opener in
    /// order. A failing opener is logged and never stops the ones after it.
    pub fn request_dialog(&self, dialog_id: &str, station_key: &str, now: Millis) -> DialogRequest {
        if !self.debounce.borrow_mut().accept(dialog_id.to_string(), now) {
            log::debug!("dialog {dialog_id} requested again inside debounce window");
            return DialogRequest::Debounced;
        }
        log::info!("opening dialog {dialog_id} for station {station_key}");

        let (trigger, source) = self.discover_trigger(dialog_id, now);
        let mut delivered_by = Vec::new();
        for opener in &self.openers {
            match opener.open(&self.host, dialog_id, trigger.as_ref()) {
                Ok(true) => delivered_by.push(opener.name()),
                Ok(false) => {}
                Err(err) => log::warn!("{} opener failed for {dialog_id}: {err}", opener.name()),
            }
        }
        if delivered_by.is_empty() {
            log::warn!("no opener could deliver dialog {dialog_id}");
        }
        DialogRequest::Dispatched {
            trigger: source,
            delivered_by,
        }
    }

    fn discover_trigger(&self, dialog_id: &str, now: Millis) -> (Option<H::Element>, TriggerSource) {
        let triggers = self.host.dialog_triggers(dialog_id);
        if let Some(visible) = triggers.iter().find(|t| self.host.is_visible(t)) {
            return (Some(visible.clone()), TriggerSource::Visible);
        }
        if let Some(hidden) = triggers.into_iter().next() {
            return (Some(hidden), TriggerSource::Hidden);
        }
        match self.host.create_hidden_trigger(dialog_id) {
            Ok(el) => {
                let remove_at = now.plus(self.settings.synthetic_grace_ms);
                self.synthetic.borrow_mut().push((el.clone(), remove_at));
                (Some(el), TriggerSource::Synthesized)
            }
            Err(err) => {
                log::warn!("could not synthesize trigger for {dialog_id}: {err}");
                (None, TriggerSource::None)
            }
        }
    }

    /// Removes synthesized triggers whose grace period has passed. Returns
    /// how many were removed.
    pub fn sweep(&self, now: Millis) -> usize {
        let expired: Vec<H::Element> = {
            let mut pending = self.synthetic.borrow_mut();
            let mut expired = Vec::new();
            pending.retain(|(el, remove_at)| {
                if now >= *remove_at {
                    expired.push(el.clone());
                    false
                } else {
                    true
                }
            });
            expired
        };
        for el in &expired {
            self.host.remove_element(el);
        }
        expired.len()
    }

    /// Removes every synthesized trigger regardless of grace and stops
    /// deferred-asset activation still waiting on a dialog.
    pub fn release(&self) {
        let pending = std::mem::take(&mut *self.synthetic.borrow_mut());
        for (el, _) in &pending {
            self.host.remove_element(el);
        }
        self.assets.close();
    }
}

#[cfg(test)]
mod tests {
    use super::{DialogRequest, ModalBridge, ModalSettings, TriggerSource};
    use crate::fake::FakeHost;
    use crate::host::ActivationSignal;
    use foundation::time::Millis;
    use pretty_assertions::assert_eq;
    use runtime::clock::ManualClock;
    use runtime::sleep::RecordingSleeper;
    use std::rc::Rc;

    fn bridge(host: Rc<FakeHost>) -> ModalBridge<Rc<FakeHost>, RecordingSleeper> {
        let sleeper = RecordingSleeper::new(Rc::new(ManualClock::new()));
        ModalBridge::new(host, sleeper, ModalSettings::default())
    }

    fn clicks(host: &FakeHost) -> usize {
        host.dispatched()
            .iter()
            .filter(|(_, s)| *s == ActivationSignal::Click)
            .count()
    }

    #[test]
    fn duplicate_requests_inside_window_open_once() {
        let host = Rc::new(FakeHost::new());
        host.add_trigger("x", true);
        let b = bridge(host.clone());

        assert!(matches!(b.request_dialog("x", "s", Millis(0.0)), DialogRequest::Dispatched { .. }));
        assert_eq!(b.request_dialog("x", "s", Millis(399.0)), DialogRequest::Debounced);
        assert_eq!(clicks(&host), 1);

        assert!(matches!(b.request_dialog("x", "s", Millis(400.0)), DialogRequest::Dispatched { .. }));
        assert_eq!(clicks(&host), 2);
        assert_eq!(b.trigger_record("x").expect("record").last_triggered_at, Millis(400.0));
    }

    #[test]
    fn different_dialogs_are_not_serialized() {
        let host = Rc::new(FakeHost::new());
        host.add_trigger("x", true);
        host.add_trigger("y", true);
        let b = bridge(host.clone());
        b.request_dialog("x", "s", Millis(0.0));
        b.request_dialog("y", "s", Millis(1.0));
        assert_eq!(clicks(&host), 2);
    }

    #[test]
    fn visible_trigger_beats_hidden_duplicate() {
        let host = Rc::new(FakeHost::new());
        host.add_trigger("x", false);
        let visible = host.add_trigger("x", true);
        let b = bridge(host.clone());

        let got = b.request_dialog("x", "s", Millis(0.0));
        assert_eq!(
            got,
            DialogRequest::Dispatched {
                trigger: TriggerSource::Visible,
                delivered_by: vec!["event-sequence"],
            }
        );
        assert!(host.dispatched().iter().all(|(el, _)| *el == visible));
    }

    #[test]
    fn synthesized_trigger_is_removed_after_grace() {
        let host = Rc::new(FakeHost::new());
        let b = bridge(host.clone());

        let got = b.request_dialog("x", "s", Millis(0.0));
        assert!(matches!(
            got,
            DialogRequest::Dispatched {
                trigger: TriggerSource::Synthesized,
                ..
            }
        ));
        assert_eq!(host.live_triggers("x"), 1);
        assert_eq!(clicks(&host), 1);

        assert_eq!(b.sweep(Millis(1499.0)), 0);
        assert_eq!(b.sweep(Millis(1500.0)), 1);
        assert_eq!(host.live_triggers("x"), 0);
        assert_eq!(b.pending_synthetic(), 0);
    }

    #[test]
    fn release_drops_pending_synthetic_triggers() {
        let host = Rc::new(FakeHost::new());
        let b = bridge(host.clone());
        b.request_dialog("x", "s", Millis(0.0));
        b.release();
        assert_eq!(host.live_triggers("x"), 0);
        assert!(b.deferred_assets().is_closed());
    }

    #[test]
    fn failing_secondary_opener_does_not_abort_primary() {
        let host = Rc::new(FakeHost::new());
        host.add_trigger("x", true);
        host.fail_global_opener();
        let b = bridge(host.clone());

        let got = b.request_dialog("x", "s", Millis(0.0));
        assert_eq!(
            got,
            DialogRequest::Dispatched {
                trigger: TriggerSource::Visible,
                delivered_by: vec!["event-sequence"],
            }
        );
        assert_eq!(host.global_calls(), vec!["x".to_string()]);
    }

    #[test]
    fn failing_primary_still_runs_secondary() {
        let host = Rc::new(FakeHost::new());
        host.add_trigger("x", true);
        host.fail_dispatch();
        host.set_global_opener(true);
        let b = bridge(host.clone());

        let got = b.request_dialog("x", "s", Millis(0.0));
        assert_eq!(
            got,
            DialogRequest::Dispatched {
                trigger: TriggerSource::Visible,
                delivered_by: vec!["global-function"],
            }
        );
    }

    #[test]
    fn open_activates_deferred_assets_of_that_dialog() {
        let host = Rc::new(FakeHost::new());
        host.add_trigger("x", true);
        host.add_dialog("x");
        let video = host.add_asset(Some("x"), "tour.mp4", "src", true);
        let b = bridge(host.clone());

        let got = pollster::block_on(b.open("x", "s", Millis(0.0))).expect("opened");
        assert!(matches!(got, DialogRequest::Dispatched { .. }));
        assert_eq!(host.attribute(video, "src").as_deref(), Some("tour.mp4"));
        assert!(b.deferred_assets().is_activated("x"));
    }

    #[test]
    fn open_reports_discovery_timeout_without_panicking() {
        let host = Rc::new(FakeHost::new());
        host.add_trigger("x", true);
        let b = bridge(host.clone());

        let err = pollster::block_on(b.open("x", "s", Millis(0.0))).expect_err("no dialog");
        assert_eq!(err.attempts, 5);
        assert_eq!(clicks(&host), 1);
    }

    #[test]
    fn settings_accept_partial_json() {
        let s: ModalSettings = serde_json::from_str(r#"{"debounceMs": 250}"#).expect("settings");
        assert_eq!(s.debounce_ms, 250.0);
        assert_eq!(s.discovery_attempts, 5);
    }
}
