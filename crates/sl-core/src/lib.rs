//! sl-core: shared foundation for solarloop.
//!
//! Contains:
//! - numeric (finite checks and rounding)
//! - metrics (Prometheus text counters and gauges)
//! - error (shared error types)

pub mod error;
pub mod metrics;
pub mod numeric;

pub use error::{CoreError, CoreResult};
pub use metrics::{Counter, Gauge, Metric, render};
pub use numeric::{ensure_finite, round_to};
