pub mod clock;
pub mod event_bus;
pub mod frame;
pub mod retry;
pub mod sleep;
pub mod throttle;

pub use clock::*;
pub use event_bus::*;
pub use frame::*;
pub use retry::*;
pub use sleep::*;
pub use throttle::*;
