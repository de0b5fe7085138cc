pub mod gesture;
pub mod glow;
pub mod resolver;
pub mod settings;

pub use gesture::*;
pub use glow::*;
pub use resolver::*;
pub use settings::*;
