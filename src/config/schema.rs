//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the audit
//! pipeline. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::policy::InstrumentationPolicy;

/// Profile name that switches the pipeline into production mode.
pub const PRODUCTION_PROFILE: &str = "prod";

/// Persistence root used when no `default_path` is configured.
pub const DEFAULT_PERSISTENCE_PATH: &str = "logs";

/// Root configuration for the audit pipeline.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuditConfig {
    /// Active deployment profile (e.g., "dev", "prod").
    pub profile: String,

    /// Where audit blocks are written.
    pub persistence: PersistenceConfig,

    /// Background worker pool sizing.
    pub workers: WorkerConfig,

    /// Dispatcher queue sizing.
    pub queue: QueueConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Per-type and per-method instrumentation rules.
    pub policies: Vec<PolicyRule>,
}

impl AuditConfig {
    /// Returns true when the active profile is the production profile.
    pub fn is_production(&self) -> bool {
        self.profile == PRODUCTION_PROFILE
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Root directory for audit logs. Unset means [`DEFAULT_PERSISTENCE_PATH`].
    pub default_path: Option<String>,
}

impl PersistenceConfig {
    /// Resolve the persistence root once, logging whether it was defaulted.
    pub fn resolve_default_path(&self) -> String {
        match self.default_path.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => {
                tracing::info!(path, kind = "custom", "Audit persistence path resolved");
                path.to_string()
            }
            _ => {
                tracing::info!(
                    path = DEFAULT_PERSISTENCE_PATH,
                    kind = "default",
                    "Audit persistence path resolved"
                );
                DEFAULT_PERSISTENCE_PATH.to_string()
            }
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of background workers.
    pub count: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { count: 2 }
    }
}

/// Dispatcher queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of pending records before submissions are dropped.
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { capacity: 1024 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines (always on in production).
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9100".to_string(),
        }
    }
}

/// A single instrumentation rule.
///
/// A rule without `method` applies to the whole type. A method rule without
/// `params` matches every overload of that method.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PolicyRule {
    /// Fully qualified type name the rule applies to.
    #[serde(rename = "type")]
    pub type_name: String,

    /// Method name, for method-level rules.
    #[serde(default)]
    pub method: Option<String>,

    /// Exact parameter type list, for overload-specific rules.
    #[serde(default)]
    pub params: Option<Vec<String>>,

    #[serde(default = "default_true")]
    pub record_args: bool,

    #[serde(default = "default_true")]
    pub record_result: bool,

    #[serde(default)]
    pub persist: bool,

    /// Overrides the default persistence path for matching calls.
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default = "default_true")]
    pub record_timing: bool,
}

fn default_true() -> bool {
    true
}

impl PolicyRule {
    /// The policy this rule grants.
    pub fn policy(&self) -> InstrumentationPolicy {
        InstrumentationPolicy {
            record_args: self.record_args,
            record_result: self.record_result,
            persist: self.persist,
            target_path: self.path.clone(),
            record_timing: self.record_timing,
        }
    }
}
