//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Interceptor, workers, dispatcher, writer produce:
//!     → logging.rs (structured log events, record id as correlation field)
//!     → metrics.rs (counters, gauges, histograms)
//! ```
//!
//! # Design Decisions
//! - Pipeline failures are only ever logged and counted, never raised
//! - Every record carries a UUID so its log lines can be correlated

pub mod logging;
pub mod metrics;
