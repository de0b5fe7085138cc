//! Asks a host page to open dialogs this crate does not own.

pub mod assets;
pub mod error;
pub mod host;
pub mod modal;
pub mod opener;

#[cfg(test)]
mod fake;

pub use assets::*;
pub use error::*;
pub use host::*;
pub use modal::*;
pub use opener::*;
