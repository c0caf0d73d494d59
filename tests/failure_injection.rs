//! Failure injection tests for the audit pipeline.

use std::collections::HashMap;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tempfile::tempdir;

use call_audit::audit::{AuditRecord, AuditSubscriber};
use call_audit::{AuditPipeline, Args, CallSite, InstrumentationPolicy, PolicyRegistry};

mod common;

fn persisted(type_name: &str) -> PolicyRegistry {
    let registry = PolicyRegistry::new();
    registry.register_type(type_name, InstrumentationPolicy::persisted());
    registry
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_directory_collision_does_not_stop_pipeline() {
    let dir = tempdir().unwrap();
    let healthy = tempdir().unwrap();
    // A file where the year directory should go makes directory creation fail.
    fs::write(dir.path().join("2024"), b"not a directory").unwrap();

    let registry = persisted("demo::Store");
    registry.register_type(
        "demo::Mirror",
        InstrumentationPolicy::persisted().with_target_path(healthy.path().to_str().unwrap()),
    );
    let pipeline = common::start_pipeline(&common::config(dir.path(), 1, 64), registry);
    let interceptor = pipeline.interceptor();

    let store = CallSite::new("demo::Store", "put");
    assert_eq!(interceptor.observe(&store, Args::new().with("key", "a"), || 1), 1);

    let mirror = CallSite::new("demo::Mirror", "put");
    assert_eq!(interceptor.observe(&mirror, Args::new().with("key", "b"), || 2), 2);

    pipeline.shutdown().await;
    assert!(dir.path().join("2024").is_file());

    let blocks = common::read_blocks(&common::log_file(healthy.path()));
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].target, "demo::Mirror::put");
    assert_eq!(blocks[0].args, r#"{"key":"b"}"#);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_call_is_recorded_and_resumed() {
    let dir = tempdir().unwrap();
    let config = common::config(dir.path(), 1, 64);
    let pipeline = common::start_pipeline(&config, persisted("demo::Store"));
    let interceptor = pipeline.interceptor();
    let site = CallSite::new("demo::Store", "get");

    let caught = panic::catch_unwind(AssertUnwindSafe(|| {
        interceptor.observe(&site, Args::new().with("key", "missing"), || -> u32 {
            panic!("key not found")
        })
    }));
    assert!(caught.is_err());

    // The pipeline keeps serving calls after a panic.
    assert_eq!(interceptor.observe(&site, Args::new().with("key", "b"), || 2u32), 2);
    pipeline.shutdown().await;

    let blocks = common::read_blocks(&common::log_file(dir.path()));
    assert_eq!(blocks.len(), 2);
    let failed = blocks.iter().find(|b| !b.error_message.is_empty()).unwrap();
    assert_eq!(failed.error_message, "key not found");
    // Located where the panic was raised, not at the intercepting call.
    assert!(failed.error_location.starts_with(concat!(file!(), ":")));
    assert!(failed.result.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unserializable_args_are_recorded_empty() {
    let dir = tempdir().unwrap();
    let config = common::config(dir.path(), 1, 64);
    let pipeline = common::start_pipeline(&config, persisted("demo::Store"));
    let interceptor = pipeline.interceptor();
    let site = CallSite::new("demo::Store", "index");

    let mut index = HashMap::new();
    index.insert((1, 2), "tuple keys have no JSON form");
    let value = interceptor.observe(&site, Args::new().with("index", index), || "ok".to_string());
    assert_eq!(value, "ok");
    pipeline.shutdown().await;

    let blocks = common::read_blocks(&common::log_file(dir.path()));
    assert_eq!(blocks.len(), 1);
    assert!(blocks[0].args.is_empty());
    assert_eq!(blocks[0].result, "\"ok\"");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_multiline_error_stays_in_one_block() {
    let dir = tempdir().unwrap();
    let config = common::config(dir.path(), 1, 64);
    let pipeline = common::start_pipeline(&config, persisted("demo::Store"));
    let interceptor = pipeline.interceptor();
    let site = CallSite::new("demo::Store", "load");

    let result: Result<u32, String> =
        interceptor.intercept(&site, Args::new(), || Err("first line\nsecond line".to_string()));
    assert_eq!(result, Err("first line\nsecond line".to_string()));
    pipeline.shutdown().await;

    let blocks = common::read_blocks(&common::log_file(dir.path()));
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].error_message, "first line\\nsecond line");
    assert!(blocks[0].args.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_zero_capacity_queue_drops_records() {
    let dir = tempdir().unwrap();
    let config = common::config(dir.path(), 1, 0);
    let pipeline = common::start_pipeline(&config, persisted("demo::Store"));
    let interceptor = pipeline.interceptor();
    let site = CallSite::new("demo::Store", "put");

    for i in 0..10 {
        assert_eq!(interceptor.observe(&site, Args::new().with("i", i), || i), i);
    }
    pipeline.shutdown().await;

    assert!(!common::log_file(dir.path()).exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_calls_after_shutdown_still_return() {
    let dir = tempdir().unwrap();
    let config = common::config(dir.path(), 2, 64);
    let pipeline = common::start_pipeline(&config, persisted("demo::Store"));
    let interceptor = pipeline.interceptor();
    pipeline.shutdown().await;

    let site = CallSite::new("demo::Store", "put");
    assert_eq!(interceptor.observe(&site, Args::new(), || 42), 42);
    assert!(!common::log_file(dir.path()).exists());
}

/// Panics on the first record it sees.
#[derive(Default)]
struct PanicOnce {
    tripped: AtomicBool,
}

impl AuditSubscriber for PanicOnce {
    fn on_record(&self, _record: &AuditRecord) {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            panic!("subscriber failure");
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_worker_survives_panicking_job() {
    let dir = tempdir().unwrap();
    let config = common::config(dir.path(), 1, 64);
    let panicking: Arc<dyn AuditSubscriber> = Arc::new(PanicOnce::default());
    let writer: Arc<dyn AuditSubscriber> = common::fixed_writer(dir.path());
    let pipeline = AuditPipeline::with_subscribers(
        &config,
        Arc::new(persisted("demo::Store")),
        vec![panicking, writer],
    );
    let interceptor = pipeline.interceptor();
    let site = CallSite::new("demo::Store", "put");

    for i in 0..3 {
        interceptor.observe(&site, Args::new().with("i", i), || i);
    }
    pipeline.shutdown().await;

    // The first record is lost with its job; the single worker handles the rest.
    assert_eq!(common::read_blocks(&common::log_file(dir.path())).len(), 2);
}
