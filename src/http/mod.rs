//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, route dispatch)
//!     → request.rs (request ID)
//!     → middleware/ (concurrency limit)
//!     → {endpoint} + OPTIONS      → cors.rs (preflight)
//!     → {endpoint} + GET|HEAD|POST → proxy::Forwarder
//!     → {endpoint} + other        → response.rs (405)
//!     → any other path            → response.rs (status page)
//! ```

pub mod cors;
pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
