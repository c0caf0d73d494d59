//! The job each worker runs for one invocation.
//!
//! resolve policy → echo to the log → serialize what the policy wants
//! → build the record → submit to the dispatcher.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::audit::record::{render_capture, AuditRecord, Invocation, Outcome};
use crate::audit::Dispatcher;
use crate::observability::metrics;
use crate::policy::{InstrumentationPolicy, PolicyResolver};

pub struct RecordProcessor {
    resolver: Arc<dyn PolicyResolver>,
    dispatcher: Arc<Dispatcher>,
}

impl RecordProcessor {
    pub fn new(resolver: Arc<dyn PolicyResolver>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            resolver,
            dispatcher,
        }
    }

    pub fn process(&self, invocation: Invocation) {
        let policy = match self.resolver.resolve(&invocation.site) {
            Ok(policy) => policy,
            Err(e) => {
                metrics::record_dropped("unresolved_policy");
                error!(
                    id = %invocation.id,
                    error = %e,
                    "Unable to resolve instrumentation policy, record dropped"
                );
                return;
            }
        };

        if let Some(record) = build_record(invocation, &policy) {
            self.dispatcher.submit(record);
        }
    }
}

/// Echo the call and, if the policy persists it, build its record.
pub fn build_record(invocation: Invocation, policy: &InstrumentationPolicy) -> Option<AuditRecord> {
    let id = invocation.id;
    let target_address = invocation.site.target_address();
    let elapsed_ms = invocation.elapsed_ms();

    info!(id = %id, target = %target_address, "Instrumented call started");

    let args_text = if policy.record_args {
        let text = or_empty(id, "args", invocation.args.render());
        info!(id = %id, args = %text, "Call arguments");
        text
    } else {
        String::new()
    };

    let (result_text, error_message, error_location) = match invocation.outcome {
        Outcome::Failed { message, location } => {
            info!(id = %id, error = %message, location = %location, "Call failed");
            (String::new(), message, location)
        }
        Outcome::Returned(value) if policy.record_result => {
            let text = or_empty(id, "result", render_capture(value.as_ref()));
            info!(id = %id, result = %text, "Call result");
            (text, String::new(), String::new())
        }
        Outcome::Returned(_) => (String::new(), String::new(), String::new()),
    };

    info!(id = %id, target = %target_address, "Instrumented call finished");
    if policy.record_timing {
        info!(id = %id, elapsed_ms, "Call duration");
    }

    if !policy.persist {
        return None;
    }

    Some(AuditRecord {
        id,
        target_address,
        args_text,
        result_text,
        error_message,
        error_location,
        start_time: invocation.start_time,
        end_time: invocation.end_time,
        persistence_path: policy.target_path.clone(),
    })
}

fn or_empty(id: Uuid, field: &'static str, rendered: Result<String, serde_json::Error>) -> String {
    rendered.unwrap_or_else(|e| {
        metrics::record_serialization_failure(field);
        warn!(id = %id, field, error = %e, "Failed to serialize call data, recording it empty");
        String::new()
    })
}
