use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::Window;

type FrameClosure = Closure<dyn FnMut(f64)>;

/// `requestAnimationFrame` loop calling `tick` with the frame timestamp.
pub struct AnimationLoop {
    window: Window,
    closure: Rc<RefCell<Option<FrameClosure>>>,
    pending: Rc<Cell<Option<i32>>>,
}

impl AnimationLoop {
    pub fn start(window: Window, mut tick: impl FnMut(f64) + 'static) -> Result<Self, JsValue> {
        let closure: Rc<RefCell<Option<FrameClosure>>> = Rc::new(RefCell::new(None));
        let pending = Rc::new(Cell::new(None));

        let closure_loop = closure.clone();
        let pending_loop = pending.clone();
        let window_loop = window.clone();
        *closure.borrow_mut() = Some(Closure::wrap(Box::new(move |timestamp: f64| {
            pending_loop.set(None);
            tick(timestamp);
            // `stop()` inside `tick` empties the slot; the loop ends here.
            let next = closure_loop
                .borrow()
                .as_ref()
                .map(|f| window_loop.request_animation_frame(f.as_ref().unchecked_ref()));
            if let Some(Ok(id)) = next {
                pending_loop.set(Some(id));
            }
        }) as Box<dyn FnMut(f64)>));

        let first = closure
            .borrow()
            .as_ref()
            .map(|f| window.request_animation_frame(f.as_ref().unchecked_ref()))
            .transpose()?;
        pending.set(first);
        Ok(Self {
            window,
            closure,
            pending,
        })
    }

    pub fn is_running(&self) -> bool {
        self.closure.borrow().is_some()
    }

    /// Cancels the next frame. The closure itself is dropped on a later
    /// task because `stop()` may be called from inside it.
    pub fn stop(&self) {
        if let Some(id) = self.pending.take() {
            let _ = self.window.cancel_animation_frame(id);
        }
        let Some(closure) = self.closure.borrow_mut().take() else {
            return;
        };
        wasm_bindgen_futures::spawn_local(async move {
            drop(closure);
        });
    }
}

impl Drop for AnimationLoop {
    fn drop(&mut self) {
        self.stop();
    }
}
