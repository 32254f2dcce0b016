pub mod aggregate;
pub mod distribution;
pub mod statistics;

pub use aggregate::*;
pub use distribution::*;
pub use statistics::*;
