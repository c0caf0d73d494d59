//! Call instrumentation with an asynchronous, date-partitioned audit log.

pub mod audit;
pub mod config;
pub mod intercept;
pub mod observability;
pub mod pipeline;
pub mod policy;
pub mod worker;

pub use audit::{Args, AuditRecord, AuditWriter};
pub use config::AuditConfig;
pub use intercept::{AuditLayer, Interceptor};
pub use pipeline::AuditPipeline;
pub use policy::{CallSite, InstrumentationPolicy, PolicyRegistry, PolicyResolver};
