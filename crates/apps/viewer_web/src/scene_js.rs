//! Adapter for the page's JavaScript renderer.
//!
//! The renderer owns the WebGL scene. After a model loads it exports a flat
//! node snapshot; this side mirrors it in a [`SceneTree`] for traversal and
//! picking and forwards material changes back by node index.

use std::cell::RefCell;
use std::rc::Rc;

use activation::SceneRuntime;
use formats::{CameraConfig, SceneConfig};
use foundation::bounds::Aabb3;
use foundation::math::Vec3;
use futures::FutureExt;
use futures::future::LocalBoxFuture;
use runtime::frame::Frame;
use scene::{CameraView, NodeId, SceneGraph, SceneSnapshot, SceneTree, SurfaceRect, VisualState};
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::Element;

#[wasm_bindgen]
extern "C" {
    /// Renderer object supplied by the page.
    #[derive(Clone)]
    pub type JsSceneRuntime;

    #[wasm_bindgen(method, catch)]
    fn initialize(this: &JsSceneRuntime, container: &Element, config_json: &str) -> Result<(), JsValue>;

    /// Resolves to the scene snapshot as a JSON string.
    #[wasm_bindgen(method, catch, js_name = loadModel)]
    fn load_model(this: &JsSceneRuntime, bytes: &[u8], url: &str) -> Result<js_sys::Promise, JsValue>;

    #[wasm_bindgen(method, catch, js_name = cameraJson)]
    fn camera_json(this: &JsSceneRuntime) -> Result<String, JsValue>;

    #[wasm_bindgen(method, catch, js_name = makeMaterialsUnique)]
    fn make_materials_unique(this: &JsSceneRuntime, node: u32) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = releaseUniqueMaterials)]
    fn release_unique_materials(this: &JsSceneRuntime, node: u32) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setGlow)]
    fn set_glow(this: &JsSceneRuntime, node: u32, glow: f32) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch)]
    fn render(this: &JsSceneRuntime, timestamp: f64, dt_ms: f64) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch, js_name = setCursor)]
    fn set_cursor(this: &JsSceneRuntime, cursor: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(method, catch)]
    fn dispose(this: &JsSceneRuntime) -> Result<(), JsValue>;
}

fn js_message(err: &JsValue) -> String {
    err.as_string().unwrap_or_else(|| format!("{err:?}"))
}

/// Camera as reported by `cameraJson()`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CameraSnapshot {
    pub position: [f64; 3],
    pub target: [f64; 3],
    #[serde(default)]
    pub up: Option<[f64; 3]>,
    pub fov: f64,
}

impl CameraSnapshot {
    pub fn from_config(camera: &CameraConfig) -> Self {
        Self {
            position: camera.position,
            target: camera.target,
            up: None,
            fov: camera.fov,
        }
    }

    pub fn to_view(&self, aspect: f64) -> CameraView {
        let [ex, ey, ez] = self.position;
        let [tx, ty, tz] = self.target;
        let mut view = CameraView::new(Vec3::new(ex, ey, ez), Vec3::new(tx, ty, tz), self.fov, aspect);
        if let Some([ux, uy, uz]) = self.up {
            view.up = Vec3::new(ux, uy, uz);
        }
        view
    }
}

/// Mirror of the renderer's graph; material changes go to both sides.
struct JsSceneGraph {
    tree: SceneTree,
    js: JsSceneRuntime,
}

impl JsSceneGraph {
    fn forward(&self, op: &str, result: Result<(), JsValue>) {
        if let Err(err) = result {
            log::warn!("renderer {op} failed: {}", js_message(&err));
        }
    }
}

impl SceneGraph for JsSceneGraph {
    fn root(&self) -> Option<NodeId> {
        self.tree.root()
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.tree.children(node)
    }

    fn name(&self, node: NodeId) -> Option<String> {
        self.tree.name(node)
    }

    fn world_bounds(&self, node: NodeId) -> Option<Aabb3> {
        self.tree.world_bounds(node)
    }

    fn base_visual(&self, node: NodeId) -> VisualState {
        self.tree.base_visual(node)
    }

    fn make_materials_unique(&mut self, node: NodeId) -> usize {
        let cloned = self.tree.make_materials_unique(node);
        if cloned > 0 {
            self.forward("makeMaterialsUnique", self.js.make_materials_unique(node.index()));
        }
        cloned
    }

    fn release_unique_materials(&mut self, node: NodeId) {
        self.tree.release_unique_materials(node);
        self.forward("releaseUniqueMaterials", self.js.release_unique_materials(node.index()));
    }

    fn set_glow(&mut self, node: NodeId, glow: f32) {
        self.tree.set_glow(node, glow);
        self.forward("setGlow", self.js.set_glow(node.index(), glow.clamp(0.0, 1.0)));
    }
}

const DETACHED: &str = "renderer already disposed";

/// [`SceneRuntime`] backed by the page's renderer.
///
/// `dispose` lets go of the renderer object and the container; every call
/// after that is a no-op or an error.
pub struct JsRuntime {
    js: Option<JsSceneRuntime>,
    container: Option<Element>,
    camera: CameraSnapshot,
    generation: u32,
    loaded: Rc<RefCell<Option<SceneTree>>>,
    graph: Option<JsSceneGraph>,
    cursor: &'static str,
}

impl JsRuntime {
    pub fn new(js: JsSceneRuntime, container: Element) -> Self {
        Self {
            js: Some(js),
            container: Some(container),
            camera: CameraSnapshot::from_config(&CameraConfig::default()),
            generation: 0,
            loaded: Rc::new(RefCell::new(None)),
            graph: None,
            cursor: "default",
        }
    }
}

impl SceneRuntime for JsRuntime {
    fn initialize(&mut self, config: &SceneConfig) -> Result<(), String> {
        let (Some(js), Some(container)) = (&self.js, &self.container) else {
            return Err(DETACHED.to_string());
        };
        self.camera = CameraSnapshot::from_config(&config.camera);
        let json = serde_json::to_string(config).map_err(|e| e.to_string())?;
        js.initialize(container, &json).map_err(|e| js_message(&e))
    }

    fn load_model(&mut self, bytes: Vec<u8>, url: &str) -> LocalBoxFuture<'static, Result<(), String>> {
        self.generation += 1;
        self.graph = None;
        self.loaded.replace(None);

        let Some(js) = &self.js else {
            return async { Err(DETACHED.to_string()) }.boxed_local();
        };
        let generation = self.generation;
        let slot = self.loaded.clone();
        let promise = js.load_model(&bytes, url);
        async move {
            let promise = promise.map_err(|e| js_message(&e))?;
            let value = JsFuture::from(promise).await.map_err(|e| js_message(&e))?;
            let json = value
                .as_string()
                .ok_or_else(|| "loadModel did not resolve to a snapshot string".to_string())?;
            let snapshot: SceneSnapshot =
                serde_json::from_str(&json).map_err(|e| format!("invalid scene snapshot: {e}"))?;
            let tree = SceneTree::from_snapshot_with_generation(&snapshot, generation)
                .map_err(|e| e.to_string())?;
            log::debug!("scene snapshot with {} node(s) installed", tree.len());
            slot.replace(Some(tree));
            Ok(())
        }
        .boxed_local()
    }

    fn scene_mut(&mut self) -> Option<&mut dyn SceneGraph> {
        let loaded = self.loaded.borrow_mut().take();
        if let Some(tree) = loaded
            && tree.generation() == self.generation
            && let Some(js) = &self.js
        {
            self.graph = Some(JsSceneGraph {
                tree,
                js: js.clone(),
            });
        }
        self.graph.as_mut().map(|g| g as &mut dyn SceneGraph)
    }

    fn camera(&self) -> CameraView {
        let aspect = self.surface().aspect();
        let Some(js) = &self.js else {
            return self.camera.to_view(aspect);
        };
        match js.camera_json() {
            Ok(json) => match serde_json::from_str::<CameraSnapshot>(&json) {
                Ok(camera) => camera.to_view(aspect),
                Err(err) => {
                    log::trace!("camera snapshot unreadable: {err}");
                    self.camera.to_view(aspect)
                }
            },
            Err(_) => self.camera.to_view(aspect),
        }
    }

    fn surface(&self) -> SurfaceRect {
        let Some(container) = &self.container else {
            return SurfaceRect::new(0.0, 0.0, 0.0, 0.0);
        };
        let r = container.get_bounding_client_rect();
        SurfaceRect::new(r.left(), r.top(), r.width(), r.height())
    }

    fn render(&mut self, frame: &Frame) {
        let Some(js) = &self.js else {
            return;
        };
        if let Err(err) = js.render(frame.now.0, frame.dt_ms) {
            log::warn!("render failed on frame {}: {}", frame.index, js_message(&err));
        }
    }

    fn set_cursor(&mut self, cursor: &str) {
        if self.cursor == cursor {
            return;
        }
        self.cursor = if cursor == "pointer" { "pointer" } else { "default" };
        let Some(js) = &self.js else {
            return;
        };
        if let Err(err) = js.set_cursor(self.cursor) {
            log::debug!("setCursor failed: {}", js_message(&err));
        }
    }

    fn dispose(&mut self) {
        self.graph = None;
        self.loaded.replace(None);
        self.container = None;
        if let Some(js) = self.js.take()
            && let Err(err) = js.dispose()
        {
            log::warn!("renderer dispose failed: {}", js_message(&err));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CameraSnapshot;
    use foundation::math::Vec3;

    #[test]
    fn camera_snapshot_reads_renderer_json() {
        let json = r#"{"position": [0, 2, 8], "target": [0, 1, 0], "fov": 50}"#;
        let camera: CameraSnapshot = serde_json::from_str(json).expect("camera");
        let view = camera.to_view(1.5);
        assert_eq!(view.eye, Vec3::new(0.0, 2.0, 8.0));
        assert_eq!(view.target, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(view.fov_y_deg, 50.0);
        assert_eq!(view.aspect, 1.5);
    }
}
