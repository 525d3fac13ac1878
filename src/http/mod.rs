//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (request id, trace span, timeout, body limit, metrics)
//!     → auth.rs (bearer key on write routes)
//!     → handlers.rs (one gateway operation per route)
//!     → response.rs (GatewayError → status + JSON body)
//! ```

pub mod auth;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
