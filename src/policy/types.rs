//! Call identity and instrumentation policy types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recording and persistence switches resolved for a single call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentationPolicy {
    /// Record the argument map.
    pub record_args: bool,
    /// Record the return value.
    pub record_result: bool,
    /// Hand the record to the writer.
    pub persist: bool,
    /// Directory overriding the configured default.
    pub target_path: Option<String>,
    /// Echo the elapsed time.
    pub record_timing: bool,
}

impl Default for InstrumentationPolicy {
    fn default() -> Self {
        Self {
            record_args: true,
            record_result: true,
            persist: false,
            target_path: None,
            record_timing: true,
        }
    }
}

impl InstrumentationPolicy {
    /// Default policy with persistence switched on.
    pub fn persisted() -> Self {
        Self {
            persist: true,
            ..Self::default()
        }
    }

    pub fn with_target_path(mut self, path: impl Into<String>) -> Self {
        self.target_path = Some(path.into());
        self
    }
}

/// Identity of an instrumented call: declaring type, method and signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallSite {
    pub type_name: String,
    pub method: String,
    pub param_types: Vec<String>,
}

impl CallSite {
    pub fn new(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            method: method.into(),
            param_types: Vec::new(),
        }
    }

    /// Attach the parameter type list used for overload-specific lookup.
    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.param_types = params.into_iter().map(Into::into).collect();
        self
    }

    /// Fully qualified call identity, e.g. `demo::Greeter::greet`.
    pub fn target_address(&self) -> String {
        format!("{}::{}", self.type_name, self.method)
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}({})", self.type_name, self.method, self.param_types.join(", "))
    }
}

/// Errors raised while resolving a policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// Neither a method-level nor a type-level policy applies.
    #[error("no instrumentation policy found for {target}")]
    NotFound { target: String },
}
