//! Resilience helpers.
//!
//! # Data Flow
//! ```text
//! Money-moving write:
//!     → single_flight.rs (reject a second concurrent send for the same key)
//!     → submit
//!     → confirmation polling paced by backoff.rs
//! ```
//!
//! # Design Decisions
//! - Writes are never retried; a failed submission goes back to the caller
//! - Receipt polling backs off exponentially with jitter

pub mod backoff;
pub mod single_flight;

pub use backoff::calculate_backoff;
pub use single_flight::{FlightGuard, SingleFlight};
