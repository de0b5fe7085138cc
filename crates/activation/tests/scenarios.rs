//! End-to-end activation runs against a scripted network and an in-memory
//! renderer.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use activation::{
    ActivationController, ActivationError, ArmedTrigger, BootstrapPlan, DisposeStage, Disposer,
    LoadState, SceneRuntime, TriggerConfig, TriggerHost, TriggerKind, bootstrap,
};
use formats::{SceneConfig, StationMapping};
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use foundation::math::Vec3;
use pretty_assertions::assert_eq;
use runtime::clock::ManualClock;
use runtime::frame::Frame;
use runtime::sleep::RecordingSleeper;
use scene::{
    CameraView, SceneGraph, SceneSnapshot, SceneTree, SnapshotBounds, SnapshotNode, SurfaceRect,
};
use streaming::{FetchPlan, ResourceFetcher, Transport, TransportError};

const PRIMARY: &str = "/assets/plant.glb";
const FALLBACK: &str = "https://cdn.example.net/plant.glb";
const CONFIG: &str = "/assets/scene-config.json";

type Hook = Box<dyn FnOnce()>;

#[derive(Default)]
struct Network {
    replies: RefCell<BTreeMap<String, VecDeque<Result<Vec<u8>, TransportError>>>>,
    calls: RefCell<Vec<String>>,
    hooks: RefCell<BTreeMap<String, Hook>>,
}

impl Network {
    fn ok(&self, url: &str, body: Vec<u8>) {
        self.push(url, Ok(body));
    }

    fn push(&self, url: &str, reply: Result<Vec<u8>, TransportError>) {
        self.replies
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(reply);
    }

    /// Runs `hook` once, while the next request for `url` is in flight.
    fn during_fetch(&self, url: &str, hook: impl FnOnce() + 'static) {
        self.hooks.borrow_mut().insert(url.to_string(), Box::new(hook));
    }

    fn calls_to(&self, url: &str) -> usize {
        self.calls.borrow().iter().filter(|u| *u == url).count()
    }
}

impl Transport for Network {
    async fn fetch(
        &self,
        url: &str,
        progress: &mut dyn FnMut(u64, Option<u64>),
    ) -> Result<Vec<u8>, TransportError> {
        self.calls.borrow_mut().push(url.to_string());
        let hook = self.hooks.borrow_mut().remove(url);
        if let Some(hook) = hook {
            hook();
        }
        let next = self.replies.borrow_mut().get_mut(url).and_then(|q| q.pop_front());
        match next {
            Some(Ok(body)) => {
                let total = body.len() as u64;
                progress(total / 2, Some(total));
                progress(total, Some(total));
                Ok(body)
            }
            Some(Err(err)) => Err(err),
            None => Err(TransportError::Network("net::ERR_CONNECTION_RESET".to_string())),
        }
    }
}

#[derive(Default)]
struct FakeRenderer {
    fail_init: bool,
    initialized_with: Option<SceneConfig>,
    tree: Option<SceneTree>,
    loads: u32,
    disposed: bool,
}

impl SceneRuntime for FakeRenderer {
    fn initialize(&mut self, config: &SceneConfig) -> Result<(), String> {
        if self.fail_init {
            return Err("WebGL context could not be created".to_string());
        }
        self.initialized_with = Some(config.clone());
        Ok(())
    }

    fn load_model(&mut self, bytes: Vec<u8>, _url: &str) -> LocalBoxFuture<'static, Result<(), String>> {
        self.loads += 1;
        let parsed = serde_json::from_slice::<SceneSnapshot>(&bytes)
            .map_err(|e| e.to_string())
            .and_then(|snap| SceneTree::from_snapshot(&snap).map_err(|e| e.to_string()));
        let result = match parsed {
            Ok(tree) => {
                self.tree = Some(tree);
                Ok(())
            }
            Err(err) => Err(err),
        };
        async move { result }.boxed_local()
    }

    fn scene_mut(&mut self) -> Option<&mut dyn SceneGraph> {
        self.tree.as_mut().map(|t| t as &mut dyn SceneGraph)
    }

    fn camera(&self) -> CameraView {
        CameraView::new(Vec3::new(5.0, 3.0, 5.0), Vec3::ZERO, 45.0, 1.0)
    }

    fn surface(&self) -> SurfaceRect {
        SurfaceRect::new(0.0, 0.0, 800.0, 600.0)
    }

    fn render(&mut self, _frame: &Frame) {}

    fn set_cursor(&mut self, _cursor: &str) {}

    fn dispose(&mut self) {
        self.disposed = true;
        self.tree = None;
    }
}

/// A plant model with `count` station meshes, each sharing one material.
fn plant_model(count: usize) -> Vec<u8> {
    let mut nodes = vec![SnapshotNode {
        name: Some("Plant".to_string()),
        ..SnapshotNode::default()
    }];
    for i in 0..count {
        let x = i as f64 * 3.0;
        nodes.push(SnapshotNode {
            name: Some(format!("Station_{i:02}_Body")),
            parent: Some(0),
            bounds: Some(SnapshotBounds {
                min: [x - 1.0, 0.0, -1.0],
                max: [x + 1.0, 2.0, 1.0],
            }),
            material: Some(1),
            ..SnapshotNode::default()
        });
    }
    serde_json::to_vec(&SceneSnapshot { nodes }).expect("model json")
}

fn stations(count: usize) -> StationMapping {
    StationMapping::from_pairs((0..count).map(|i| (format!("station_{i:02}"), format!("dialog-{i}"))))
        .expect("mapping")
}

struct Harness {
    network: Rc<Network>,
    sleeper: Rc<RecordingSleeper>,
    fetcher: ResourceFetcher<Rc<Network>, Rc<RecordingSleeper>, Rc<ManualClock>>,
    controller: ActivationController<Rc<ManualClock>>,
    renderer: RefCell<FakeRenderer>,
    errors: Rc<Cell<u32>>,
}

impl Harness {
    fn new() -> Self {
        let clock = Rc::new(ManualClock::new());
        let sleeper = Rc::new(RecordingSleeper::new(clock.clone()));
        let network = Rc::new(Network::default());
        let fetcher = ResourceFetcher::new(network.clone(), sleeper.clone(), clock.clone());
        let mut controller = ActivationController::new(clock);
        controller.configure(TriggerConfig::manual());
        let errors = Rc::new(Cell::new(0));
        let seen = errors.clone();
        controller.on_error(move |_| seen.set(seen.get() + 1));
        Self {
            network,
            sleeper,
            fetcher,
            controller,
            renderer: RefCell::new(FakeRenderer::default()),
            errors,
        }
    }

    fn plan(&self, count: usize) -> BootstrapPlan {
        BootstrapPlan {
            config: Some(FetchPlan::new(CONFIG)),
            model: FetchPlan::new(PRIMARY).with_fallback(FALLBACK),
            stations: stations(count),
        }
    }

    /// Activates through the controller and runs the bootstrap to the end.
    fn activate(&mut self, plan: &BootstrapPlan) -> Option<activation::Bootstrapped> {
        let ticket = self.controller.trigger_load("manual")?;
        let mut progress = Vec::new();
        let controller = &self.controller;
        let result = pollster::block_on(bootstrap(
            &self.fetcher,
            &self.renderer,
            plan,
            &|| controller.is_current(ticket),
            &mut |p| progress.push(p),
        ));
        for p in progress {
            self.controller.report_progress(ticket, p);
        }
        match result {
            Ok(Some(done)) => {
                self.controller.complete(ticket, Ok(()));
                Some(done)
            }
            Ok(None) => None,
            Err(err) => {
                self.controller.complete(ticket, Err(err));
                None
            }
        }
    }
}

#[test]
fn happy_path_loads_and_indexes_every_station() {
    let mut h = Harness::new();
    h.network.ok(CONFIG, br#"{"camera": {"fov": 50}}"#.to_vec());
    h.network.ok(PRIMARY, plant_model(10));
    let plan = h.plan(10);

    assert_eq!(h.controller.observe(), LoadState::Pending);
    let done = h.activate(&plan).expect("bootstrapped");

    assert_eq!(h.controller.observe(), LoadState::Loaded);
    assert_eq!(h.controller.progress(), Some(100));
    assert_eq!(done.hotspots.index.len(), 10);
    assert!(done.hotspots.incomplete.is_none());
    assert!(!done.model_from_fallback);
    assert_eq!(done.config.config.camera.fov, 50.0);
    assert!(h.sleeper.waits().is_empty());
    assert_eq!(h.errors.get(), 0);

    let transitions: Vec<_> = h
        .controller
        .events()
        .iter()
        .map(|e| e.message.as_str())
        .collect();
    assert_eq!(transitions, vec!["session 1 loading via manual", "session 1 loaded"]);
}

#[test]
fn fallback_serves_the_model_when_primary_is_down() {
    let mut h = Harness::new();
    h.network.ok(CONFIG, b"{}".to_vec());
    h.network.ok(FALLBACK, plant_model(3));
    let plan = h.plan(3);

    let done = h.activate(&plan).expect("bootstrapped");

    assert_eq!(h.controller.observe(), LoadState::Loaded);
    assert_eq!(done.model_url, FALLBACK);
    assert!(done.model_from_fallback);
    assert_eq!(h.network.calls_to(PRIMARY), 3);
    assert_eq!(h.network.calls_to(FALLBACK), 1);
    assert_eq!(h.sleeper.waits(), vec![1000, 2000, 4000]);
}

#[test]
fn total_failure_ends_in_error_with_one_callback() {
    let mut h = Harness::new();
    h.network.ok(CONFIG, b"{}".to_vec());
    let plan = h.plan(3);

    assert!(h.activate(&plan).is_none());

    assert_eq!(h.controller.observe(), LoadState::Error);
    assert!(h.controller.observe().shows_retry());
    assert_eq!(h.errors.get(), 1);
    assert_eq!(h.network.calls_to(PRIMARY) + h.network.calls_to(FALLBACK), 6);
    match h.controller.last_error() {
        Some(ActivationError::FetchExhausted(e)) => assert_eq!(e.attempts.len(), 6),
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(h.renderer.borrow().loads, 0);
}

#[test]
fn missing_config_degrades_to_defaults() {
    let mut h = Harness::new();
    h.network.push(CONFIG, Err(TransportError::Status { status: 404 }));
    h.network.ok(PRIMARY, plant_model(2));
    let plan = h.plan(2);

    let done = h.activate(&plan).expect("bootstrapped");

    assert_eq!(h.controller.observe(), LoadState::Loaded);
    assert_eq!(done.config.config, SceneConfig::default());
    assert_eq!(done.config.warnings.len(), 1);
    assert_eq!(
        h.renderer.borrow().initialized_with.as_ref(),
        Some(&SceneConfig::default())
    );
}

#[test]
fn renderer_failure_is_fatal_and_skips_the_download() {
    let mut h = Harness::new();
    h.renderer.borrow_mut().fail_init = true;
    h.network.ok(CONFIG, b"{}".to_vec());
    h.network.ok(PRIMARY, plant_model(1));
    let plan = h.plan(1);

    assert!(h.activate(&plan).is_none());
    assert!(matches!(
        h.controller.last_error(),
        Some(ActivationError::RenderBootstrapFailure(_))
    ));
    assert_eq!(h.network.calls_to(PRIMARY), 0);
    assert_eq!(h.errors.get(), 1);
}

#[test]
fn racing_triggers_bootstrap_once() {
    let mut h = Harness::new();
    h.network.ok(CONFIG, b"{}".to_vec());
    h.network.ok(PRIMARY, plant_model(1));
    let plan = h.plan(1);

    assert!(h.activate(&plan).is_some());
    assert!(h.activate(&plan).is_none());
    assert!(h.controller.trigger_load("viewport").is_none());

    assert_eq!(h.controller.observe(), LoadState::Loaded);
    assert_eq!(h.renderer.borrow().loads, 1);
    assert_eq!(h.network.calls_to(PRIMARY), 1);
}

#[test]
fn partial_station_match_still_loads() {
    let mut h = Harness::new();
    h.network.ok(CONFIG, b"{}".to_vec());
    h.network.ok(PRIMARY, plant_model(2));
    let plan = h.plan(4);

    let done = h.activate(&plan).expect("bootstrapped");
    assert_eq!(h.controller.observe(), LoadState::Loaded);
    assert_eq!(done.hotspots.index.len(), 2);
    assert_eq!(
        done.hotspots.incomplete.expect("warning").missing,
        vec!["station_02".to_string(), "station_03".to_string()]
    );
}

#[test]
fn retry_after_failure_can_succeed() {
    let mut h = Harness::new();
    h.network.ok(CONFIG, b"{}".to_vec());
    let plan = h.plan(1);
    assert!(h.activate(&plan).is_none());

    struct NoTriggers;
    impl TriggerHost for NoTriggers {
        fn arm(
            &self,
            _kind: TriggerKind,
            _config: &TriggerConfig,
        ) -> Option<Box<dyn ArmedTrigger>> {
            None
        }
    }
    h.controller.retry(&NoTriggers).expect("retry allowed");
    assert_eq!(h.controller.observe(), LoadState::Pending);

    h.network.ok(CONFIG, b"{}".to_vec());
    h.network.ok(PRIMARY, plant_model(1));
    assert!(h.activate(&plan).is_some());
    assert_eq!(h.controller.observe(), LoadState::Loaded);
    assert_eq!(h.controller.session(), 2);
    assert_eq!(h.errors.get(), 1);
}

#[test]
fn dispose_before_bootstrap_leaves_the_renderer_alone() {
    let mut h = Harness::new();
    h.network.ok(CONFIG, b"{}".to_vec());
    h.network.ok(PRIMARY, plant_model(2));
    let plan = h.plan(2);

    let ticket = h.controller.trigger_load("manual").expect("ticket");
    h.controller.dispose();
    h.renderer.borrow_mut().dispose();

    let controller = &h.controller;
    let result = pollster::block_on(bootstrap(
        &h.fetcher,
        &h.renderer,
        &plan,
        &|| controller.is_current(ticket),
        &mut |_| {},
    ));

    assert_eq!(result.map(|done| done.is_some()), Ok(false));
    let renderer = h.renderer.borrow();
    assert!(renderer.initialized_with.is_none());
    assert_eq!(renderer.loads, 0);
    assert!(renderer.tree.is_none());
    assert_eq!(h.network.calls_to(PRIMARY), 0);
    assert_eq!(h.errors.get(), 0);
}

#[test]
fn dispose_during_download_skips_model_load_and_indexing() {
    let h = Harness::new();
    h.network.ok(CONFIG, b"{}".to_vec());
    h.network.ok(PRIMARY, plant_model(4));
    let plan = h.plan(4);

    let controller = Rc::new(RefCell::new(h.controller));
    let ticket = controller.borrow_mut().trigger_load("manual").expect("ticket");
    let teardown = controller.clone();
    h.network.during_fetch(PRIMARY, move || teardown.borrow_mut().dispose());

    let result = pollster::block_on(bootstrap(
        &h.fetcher,
        &h.renderer,
        &plan,
        &|| controller.borrow().is_current(ticket),
        &mut |_| {},
    ));

    assert_eq!(result.map(|done| done.is_some()), Ok(false));
    assert!(controller.borrow().is_disposed());
    let renderer = h.renderer.borrow();
    assert!(renderer.initialized_with.is_some());
    assert_eq!(renderer.loads, 0);
    assert!(renderer.tree.is_none());
    assert_eq!(h.network.calls_to(PRIMARY), 1);
}

/// Records teardown as it happens: stage markers and disarmed sources.
#[derive(Debug, Clone, PartialEq)]
enum Teardown {
    Stage(DisposeStage),
    Disarmed(TriggerKind),
}

struct RecordingTriggers(Rc<RefCell<Vec<Teardown>>>);

struct Recorded {
    kind: TriggerKind,
    log: Rc<RefCell<Vec<Teardown>>>,
}

impl ArmedTrigger for Recorded {
    fn kind(&self) -> TriggerKind {
        self.kind
    }

    fn disarm(&mut self) {
        self.log.borrow_mut().push(Teardown::Disarmed(self.kind));
    }
}

impl TriggerHost for RecordingTriggers {
    fn arm(&self, kind: TriggerKind, _config: &TriggerConfig) -> Option<Box<dyn ArmedTrigger>> {
        Some(Box::new(Recorded {
            kind,
            log: self.0.clone(),
        }))
    }
}

#[test]
fn each_trigger_is_disarmed_in_its_own_teardown_stage() {
    let log = Rc::new(RefCell::new(Vec::new()));
    let controller = Rc::new(RefCell::new(ActivationController::new(Rc::new(ManualClock::new()))));
    assert!(controller.borrow_mut().start(&RecordingTriggers(log.clone())).is_none());
    assert_eq!(controller.borrow().armed_count(), 3);

    let mut disposer = Disposer::new();
    for stage in DisposeStage::ALL {
        let log = log.clone();
        disposer.register(stage, move || log.borrow_mut().push(Teardown::Stage(stage)));
    }
    for kind in TriggerKind::ALL {
        let controller = controller.clone();
        disposer.register(kind.dispose_stage(), move || {
            controller.borrow_mut().disarm(kind);
        });
    }
    let last = controller.clone();
    disposer.register(DisposeStage::DropReferences, move || last.borrow_mut().dispose());
    disposer.dispose();

    assert_eq!(
        *log.borrow(),
        vec![
            Teardown::Stage(DisposeStage::StopLoop),
            Teardown::Stage(DisposeStage::DisconnectObserver),
            Teardown::Disarmed(TriggerKind::Viewport),
            Teardown::Stage(DisposeStage::ClearTimers),
            Teardown::Disarmed(TriggerKind::Delay),
            Teardown::Stage(DisposeStage::RemoveListeners),
            Teardown::Disarmed(TriggerKind::Interaction),
            Teardown::Stage(DisposeStage::ReleaseHotspots),
            Teardown::Stage(DisposeStage::TeardownRuntime),
            Teardown::Stage(DisposeStage::DropReferences),
        ]
    );
    assert_eq!(controller.borrow().armed_count(), 0);
    assert!(controller.borrow().is_disposed());
}
