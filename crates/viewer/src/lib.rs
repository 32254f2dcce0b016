//! Listing map viewer core: one coordinator driving filter, clustering,
//! price encoding and selection over whichever map provider is mounted.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod viewport;

pub use config::*;
pub use coordinator::*;
pub use error::*;
pub use events::*;
pub use pipeline::*;
pub use registry::*;
pub use viewport::*;
