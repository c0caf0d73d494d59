//! Policy lookup.
//!
//! # Responsibilities
//! - Store method-level and type-level policies
//! - Resolve the effective policy for a call site
//! - Return an explicit NotFound rather than a silent default
//!
//! # Design Decisions
//! - Method rules win over type rules
//! - An exact parameter list wins over a rule registered for every overload
//! - Concurrent map so rules can be registered while workers resolve

use dashmap::DashMap;

use crate::config::PolicyRule;
use crate::policy::types::{CallSite, InstrumentationPolicy, ResolutionError};

/// Resolves the effective policy for a call. Consulted on worker threads only.
pub trait PolicyResolver: Send + Sync {
    fn resolve(&self, site: &CallSite) -> Result<InstrumentationPolicy, ResolutionError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct MethodKey {
    type_name: String,
    method: String,
    /// `None` matches every overload.
    params: Option<Vec<String>>,
}

/// In-memory policy table.
#[derive(Debug, Default)]
pub struct PolicyRegistry {
    methods: DashMap<MethodKey, InstrumentationPolicy>,
    types: DashMap<String, InstrumentationPolicy>,
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configuration rules.
    pub fn from_rules(rules: &[PolicyRule]) -> Self {
        let registry = Self::new();
        for rule in rules {
            match &rule.method {
                Some(method) => match &rule.params {
                    Some(params) => registry.register_overload(
                        &rule.type_name,
                        method,
                        params.clone(),
                        rule.policy(),
                    ),
                    None => registry.register_method(&rule.type_name, method, rule.policy()),
                },
                None => registry.register_type(&rule.type_name, rule.policy()),
            }
        }
        tracing::debug!(
            types = registry.types.len(),
            methods = registry.methods.len(),
            "Policy registry built"
        );
        registry
    }

    /// Register a policy covering every method of a type.
    pub fn register_type(&self, type_name: &str, policy: InstrumentationPolicy) {
        self.types.insert(type_name.to_string(), policy);
    }

    /// Register a policy for every overload of a method.
    pub fn register_method(&self, type_name: &str, method: &str, policy: InstrumentationPolicy) {
        self.methods.insert(
            MethodKey {
                type_name: type_name.to_string(),
                method: method.to_string(),
                params: None,
            },
            policy,
        );
    }

    /// Register a policy for one exact method signature.
    pub fn register_overload(
        &self,
        type_name: &str,
        method: &str,
        params: Vec<String>,
        policy: InstrumentationPolicy,
    ) {
        self.methods.insert(
            MethodKey {
                type_name: type_name.to_string(),
                method: method.to_string(),
                params: Some(params),
            },
            policy,
        );
    }

    fn find_method(&self, site: &CallSite) -> Option<InstrumentationPolicy> {
        let mut key = MethodKey {
            type_name: site.type_name.clone(),
            method: site.method.clone(),
            params: Some(site.param_types.clone()),
        };
        if let Some(policy) = self.methods.get(&key) {
            return Some(policy.value().clone());
        }
        key.params = None;
        self.methods.get(&key).map(|r| r.value().clone())
    }
}

impl PolicyResolver for PolicyRegistry {
    fn resolve(&self, site: &CallSite) -> Result<InstrumentationPolicy, ResolutionError> {
        if let Some(policy) = self.find_method(site) {
            return Ok(policy);
        }
        self.types
            .get(&site.type_name)
            .map(|r| r.value().clone())
            .ok_or_else(|| ResolutionError::NotFound {
                target: site.target_address(),
            })
    }
}
