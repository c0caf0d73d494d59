//! Shared utilities for pipeline integration and load testing.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;

use call_audit::audit::writer::{BLOCK_END, BLOCK_START, ELAPSED_LABEL, LOG_FILE_NAME};
use call_audit::audit::{AuditSubscriber, DatePartitioner, FixedClock};
use call_audit::config::PRODUCTION_PROFILE;
use call_audit::{AuditConfig, AuditPipeline, AuditWriter, PolicyRegistry};

/// Lines per block, not counting the blank separator.
pub const BLOCK_LINES: usize = 10;

/// Date every test writer partitions under.
pub fn partition_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()
}

/// Production config rooted at `root`.
pub fn config(root: &Path, workers: usize, capacity: usize) -> AuditConfig {
    let mut config = AuditConfig::default();
    config.profile = PRODUCTION_PROFILE.to_string();
    config.persistence.default_path = Some(root.to_str().unwrap().to_string());
    config.workers.count = workers;
    config.queue.capacity = capacity;
    config
}

/// Writer pinned to 2024-03-05 in production layout.
pub fn fixed_writer(root: &Path) -> Arc<AuditWriter> {
    let partitioner = DatePartitioner::with_clock(true, Arc::new(FixedClock(partition_date())));
    Arc::new(AuditWriter::new(root.to_str().unwrap(), partitioner))
}

/// Start a pipeline whose only subscriber is a fixed-date writer.
pub fn start_pipeline(config: &AuditConfig, registry: PolicyRegistry) -> AuditPipeline {
    let root = config.persistence.resolve_default_path();
    let writer: Arc<dyn AuditSubscriber> = fixed_writer(Path::new(&root));
    AuditPipeline::with_subscribers(config, Arc::new(registry), vec![writer])
}

/// `<root>/2024/3/5/log.txt`
pub fn log_file(root: &Path) -> PathBuf {
    root.join("2024").join("3").join("5").join(LOG_FILE_NAME)
}

/// One parsed audit block.
#[derive(Debug, Clone)]
pub struct Block {
    pub start_line: String,
    pub target: String,
    pub args: String,
    pub result: String,
    pub error_message: String,
    pub error_location: String,
    pub elapsed_ms: i64,
    pub end_line: String,
}

impl Block {
    pub fn start_epoch(&self) -> i64 {
        epoch_of(&self.start_line)
    }

    pub fn end_epoch(&self) -> i64 {
        epoch_of(&self.end_line)
    }
}

fn epoch_of(line: &str) -> i64 {
    line.rsplit("  ").next().unwrap().parse().unwrap()
}

/// Parse every block in a log file, asserting the framing is intact.
pub fn read_blocks(path: &Path) -> Vec<Block> {
    let content = fs::read_to_string(path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len() % (BLOCK_LINES + 1), 0, "truncated or interleaved block");

    lines
        .chunks(BLOCK_LINES + 1)
        .map(|chunk| {
            assert_eq!(chunk[0], BLOCK_START);
            assert_eq!(chunk[9], BLOCK_END);
            assert_eq!(chunk[10], "");
            Block {
                start_line: chunk[1].to_string(),
                target: chunk[2].to_string(),
                args: chunk[3].to_string(),
                result: chunk[4].to_string(),
                error_message: chunk[5].to_string(),
                error_location: chunk[6].to_string(),
                elapsed_ms: chunk[7].strip_prefix(ELAPSED_LABEL).unwrap().parse().unwrap(),
                end_line: chunk[8].to_string(),
            }
        })
        .collect()
}
