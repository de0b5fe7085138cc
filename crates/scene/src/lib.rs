pub mod camera;
pub mod graph;
pub mod hotspots;
pub mod node;
pub mod picking;
pub mod tree;

pub use camera::*;
pub use graph::*;
pub use hotspots::*;
pub use node::*;
pub use picking::*;
pub use tree::*;
