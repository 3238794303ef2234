//! Background removal API library.

pub mod config;
pub mod http;
pub mod intake;
pub mod lifecycle;
pub mod observability;
pub mod processing;

pub use config::ServiceConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
