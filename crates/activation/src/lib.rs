//! Deferred activation: when to load, how to bootstrap, how to tear down.

pub mod bootstrap;
pub mod controller;
pub mod disposer;
pub mod error;
pub mod scene_runtime;
pub mod state;
pub mod triggers;

pub use bootstrap::*;
pub use controller::*;
pub use disposer::*;
pub use error::*;
pub use scene_runtime::*;
pub use state::*;
pub use triggers::*;
