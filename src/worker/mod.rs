//! Background processing subsystem.
//!
//! # Data Flow
//! ```text
//! Interceptor
//!     → pool.rs (unbounded channel, fixed workers)
//!     → processor.rs (resolve, serialize, build record)
//!     → audit::Dispatcher
//! ```

pub mod pool;
pub mod processor;

pub use pool::{PipelineError, PoolHandle, WorkerPool};
pub use processor::RecordProcessor;
