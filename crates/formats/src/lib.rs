pub mod aggregate_feed;
pub mod error;
pub mod feed;
pub mod http;

pub use aggregate_feed::*;
pub use error::*;
pub use feed::*;
pub use http::*;
