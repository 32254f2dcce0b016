//! Map provider adapters.
//!
//! Every rendering backend is driven through [`MapAdapter`]. Concrete SDKs
//! only implement the narrow [`MapBackend`] surface; lifecycle, marker
//! diffing and event translation live once in [`BackendAdapter`].

pub mod adapter;
pub mod backend;
pub mod catalog;
pub mod contract;
pub mod error;
pub mod headless;
pub mod loader;

pub use adapter::*;
pub use backend::*;
pub use catalog::*;
pub use contract::*;
pub use error::*;
pub use headless::*;
pub use loader::*;
