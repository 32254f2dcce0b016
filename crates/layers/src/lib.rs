pub mod cluster;
pub mod decorate;
pub mod query;
pub mod symbology;

pub use cluster::*;
pub use decorate::*;
pub use query::*;
pub use symbology::*;
