use formats::SceneConfig;
use futures::future::LocalBoxFuture;
use runtime::frame::Frame;
use scene::{CameraView, SceneGraph, SurfaceRect};

/// The renderer: camera, lights, model and the drawing surface.
///
/// This layer only drives it. Model parsing may finish asynchronously, so
/// `load_model` hands back a future that does not borrow the runtime.
pub trait SceneRuntime {
    fn initialize(&mut self, config: &SceneConfig) -> Result<(), String>;

    fn load_model(&mut self, bytes: Vec<u8>, url: &str) -> LocalBoxFuture<'static, Result<(), String>>;

    /// The loaded model's graph; `None` before a model is installed.
    fn scene_mut(&mut self) -> Option<&mut dyn SceneGraph>;

    fn camera(&self) -> CameraView;

    fn surface(&self) -> SurfaceRect;

    fn render(&mut self, frame: &Frame);

    fn set_cursor(&mut self, cursor: &str);

    fn dispose(&mut self);
}
