pub mod dataset;
pub mod error;
pub mod listing;

pub use dataset::*;
pub use error::*;
pub use listing::*;
