pub mod fetcher;
pub mod plan;
pub mod transport;

pub use fetcher::*;
pub use plan::*;
pub use transport::*;
