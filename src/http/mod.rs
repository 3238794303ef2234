//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID, span)
//!     → handlers.rs (intake → processing adapter)
//!     → response.rs (JSON body, status mapping)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::{ApiError, ErrorResponse, HealthResponse, IndexResponse, RemovalResponse};
pub use server::{AppState, HttpServer};
