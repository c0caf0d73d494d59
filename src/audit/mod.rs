//! Audit record subsystem.
//!
//! # Data Flow
//! ```text
//! Invocation (record.rs, built by the interceptor)
//!     → worker builds AuditRecord
//!     → dispatch.rs (bounded queue, publish head)
//!     → writer.rs (render block, append under partition.rs directory)
//! ```
//!
//! # Design Decisions
//! - Records are immutable once built and consumed exactly once
//! - One writer instance serves every record, guarded by a single mutex
//! - No retry: a failed write is logged and the record discarded

pub mod dispatch;
pub mod partition;
pub mod record;
pub mod writer;

pub use dispatch::{AuditSubscriber, Dispatcher};
pub use partition::{Clock, DatePartitioner, FixedClock, Partition, SystemClock};
pub use record::{Args, AuditRecord, Capture, Invocation, Outcome};
pub use writer::{AuditWriter, WriteError};
