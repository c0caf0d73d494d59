//! Instrumentation policy subsystem.
//!
//! # Data Flow
//! ```text
//! [[policies]] rules (config) or programmatic registration
//!     → resolver.rs (PolicyRegistry)
//!     → worker resolves CallSite → InstrumentationPolicy
//! ```
//!
//! # Design Decisions
//! - Lookup happens on the worker, never before the instrumented call
//! - Method-level policy takes precedence over type-level policy
//! - Absence of both is an explicit ResolutionError

pub mod resolver;
pub mod types;

pub use resolver::{PolicyRegistry, PolicyResolver};
pub use types::{CallSite, InstrumentationPolicy, ResolutionError};
