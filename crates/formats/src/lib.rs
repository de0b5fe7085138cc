pub mod config;
pub mod error;
pub mod stations;

pub use config::*;
pub use error::*;
pub use stations::*;
