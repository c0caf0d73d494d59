//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (worker count, queue capacity)
//! - Check policy rules are well formed
//! - Detect duplicate rules for the same call site
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AuditConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::AuditConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("workers.count must be greater than 0")]
    NoWorkers,

    #[error("queue.capacity must be greater than 0")]
    ZeroQueueCapacity,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("policy #{index} has an empty type name")]
    EmptyTypeName { index: usize },

    #[error("policy #{index} declares params without a method")]
    ParamsWithoutMethod { index: usize },

    #[error("policy #{index} duplicates an earlier rule for {target}")]
    DuplicateRule { index: usize, target: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &AuditConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.workers.count == 0 {
        errors.push(ValidationError::NoWorkers);
    }

    if config.queue.capacity == 0 {
        errors.push(ValidationError::ZeroQueueCapacity);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let mut seen = HashSet::new();
    for (index, rule) in config.policies.iter().enumerate() {
        if rule.type_name.trim().is_empty() {
            errors.push(ValidationError::EmptyTypeName { index });
            continue;
        }
        if rule.method.is_none() && rule.params.is_some() {
            errors.push(ValidationError::ParamsWithoutMethod { index });
            continue;
        }

        let key = (rule.type_name.clone(), rule.method.clone(), rule.params.clone());
        if !seen.insert(key) {
            let target = match &rule.method {
                Some(method) => format!("{}::{}", rule.type_name, method),
                None => rule.type_name.clone(),
            };
            errors.push(ValidationError::DuplicateRule { index, target });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
