//! Browser entry point: a lazily activated 3D scene embedded in a host page.
//!
//! The page constructs a renderer object (see [`scene_js::JsSceneRuntime`])
//! and hands it to [`embed::SceneEmbed::mount`] with a JSON options blob.

use console_error_panic_hook::set_once;
use wasm_bindgen::prelude::*;

pub mod attach;
pub mod clock;
pub mod dom;
pub mod embed;
pub mod frame_loop;
pub mod net;
pub mod options;
pub mod scene_js;
pub mod triggers;

pub use embed::SceneEmbed;
pub use options::EmbedOptions;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    set_once();
    Ok(())
}

/// Routes `log` to the browser console. Only the first call takes effect.
pub(crate) fn init_logging(level: log::Level) {
    if console_log::init_with_level(level).is_err() {
        log::debug!("logger already installed");
    }
}
