//! Interception subsystem.
//!
//! # Data Flow
//! ```text
//! caller
//!     → interceptor.rs (time call, observe value/error/panic)
//!     → return original outcome to caller
//!     → Invocation → worker pool (fire-and-forget)
//!
//! tower stack
//!     → layer.rs (AuditLayer wraps a Service with the interceptor)
//! ```
//!
//! # Design Decisions
//! - Instrumentation is explicit: call sites wrap calls, or a layer is added
//!   to a service stack at startup
//! - The caller never waits on policy lookup, serialization or I/O

pub mod interceptor;
pub mod layer;

pub use interceptor::Interceptor;
pub use layer::{AuditLayer, AuditService};
