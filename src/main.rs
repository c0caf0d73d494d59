//! call-audit demonstration binary.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller thread                      background
//!   ─────────────                      ──────────
//!   Interceptor::intercept
//!     ├─ run call, time it
//!     ├─ Invocation ───────────────▶  WorkerPool (unbounded channel)
//!     └─ return original outcome         │
//!                                        ▼
//!                                    RecordProcessor
//!                                      resolve policy (PolicyRegistry)
//!                                      serialize args / result
//!                                        │
//!                                        ▼
//!                                    Dispatcher (bounded queue)
//!                                        │ publish head
//!                                        ▼
//!                                    AuditWriter
//!                                      <root>/<y>/<m>/<d>/log.txt
//! ```
//!
//! Loads configuration, instruments a few sample calls, and shuts the
//! pipeline down so every block is on disk before exit.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;

use call_audit::config::{load_config, AuditConfig};
use call_audit::observability::{logging, metrics};
use call_audit::{Args, AuditPipeline, CallSite, InstrumentationPolicy, Interceptor, PolicyRegistry};

const GREETER: &str = "demo::Greeter";
const CALCULATOR: &str = "demo::Calculator";

#[derive(Parser)]
#[command(name = "call-audit")]
#[command(
    about = "Instrument calls and persist an audit trail off the hot path",
    long_about = None
)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Deployment profile; "prod" selects production partitioning.
    #[arg(short, long, env = "CALL_AUDIT_PROFILE")]
    profile: Option<String>,

    /// Overrides persistence.default_path.
    #[arg(short, long)]
    log_dir: Option<String>,
}

#[derive(Debug, Error)]
enum DemoError {
    #[error("cannot greet an empty name")]
    EmptyName,
    #[error("division by zero")]
    DivisionByZero,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AuditConfig::default(),
    };
    if let Some(profile) = cli.profile {
        config.profile = profile;
    }
    if let Some(dir) = cli.log_dir {
        config.persistence.default_path = Some(dir);
    }

    logging::init_logging(&config.observability, config.is_production());
    tracing::info!(
        profile = %config.profile,
        workers = config.workers.count,
        queue_capacity = config.queue.capacity,
        policies = config.policies.len(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let registry = PolicyRegistry::from_rules(&config.policies);
    if config.policies.is_empty() {
        registry.register_type(GREETER, InstrumentationPolicy::persisted());
        registry.register_method(CALCULATOR, "divide", InstrumentationPolicy::persisted());
    }

    let pipeline = AuditPipeline::start(&config, Arc::new(registry));
    run_demo(&pipeline.interceptor()).await;
    pipeline.shutdown().await;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn run_demo(interceptor: &Interceptor) {
    let greet_site = CallSite::new(GREETER, "greet").with_params(["String"]);
    for name in ["Ada", ""] {
        let args = Args::new().with("name", name);
        let outcome = interceptor.intercept(&greet_site, args, || greet(name));
        tracing::info!(?outcome, "greet returned");
    }

    let divide_site = CallSite::new(CALCULATOR, "divide").with_params(["i64", "i64"]);
    for (a, b) in [(84, 2), (1, 0)] {
        let args = Args::new().with("a", a).with("b", b);
        let outcome = interceptor
            .intercept_async(&divide_site, args, async move { divide(a, b) })
            .await;
        tracing::info!(?outcome, "divide returned");
    }

    // No policy covers this type, so the worker logs and drops it.
    let unknown = CallSite::new("demo::Unregistered", "noop");
    interceptor.observe(&unknown, Args::new(), || ());
}

fn greet(name: &str) -> Result<String, DemoError> {
    if name.is_empty() {
        return Err(DemoError::EmptyName);
    }
    Ok(format!("hi {name}"))
}

fn divide(a: i64, b: i64) -> Result<i64, DemoError> {
    if b == 0 {
        return Err(DemoError::DivisionByZero);
    }
    Ok(a / b)
}
