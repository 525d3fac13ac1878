//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gateway, provider, http:
//!     → logging.rs (tracing events, EnvFilter)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout
//!     → Prometheus scrape on observability.metrics_address
//! ```

pub mod logging;
pub mod metrics;
