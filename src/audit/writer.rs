//! Audit block writer.
//!
//! # Responsibilities
//! - Resolve the target directory (record override or configured default)
//! - Append the date partition and create it on demand
//! - Render a record as a delimited text block
//! - Append the block to `log.txt`, one writer at a time
//!
//! # Design Decisions
//! - The block is rendered before the lock is taken and appended in one write
//! - A failed write is logged and abandoned; there is no retry
//! - Multi-line values are escaped so every block keeps its line count

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use chrono::{Local, TimeZone};
use thiserror::Error;

use crate::audit::dispatch::AuditSubscriber;
use crate::audit::partition::DatePartitioner;
use crate::audit::record::AuditRecord;
use crate::observability::metrics;

pub const LOG_FILE_NAME: &str = "log.txt";
pub const BLOCK_START: &str = "<----------Start---------->";
pub const BLOCK_END: &str = "<----------End------------>";
pub const ELAPSED_LABEL: &str = "Elapsed (ms): ";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors that abandon a single write.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create audit directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create audit file {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to append to audit file {path}: {source}")]
    Append {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WriteError {
    /// Short label for metrics.
    pub fn stage(&self) -> &'static str {
        match self {
            WriteError::CreateDir { .. } => "create_dir",
            WriteError::CreateFile { .. } => "create_file",
            WriteError::Append { .. } => "append",
        }
    }
}

/// Appends audit blocks to date-partitioned files.
#[derive(Debug)]
pub struct AuditWriter {
    default_path: String,
    partitioner: DatePartitioner,
    lock: Mutex<()>,
}

impl AuditWriter {
    pub fn new(default_path: impl Into<String>, partitioner: DatePartitioner) -> Self {
        Self {
            default_path: default_path.into(),
            partitioner,
            lock: Mutex::new(()),
        }
    }

    pub fn default_path(&self) -> &str {
        &self.default_path
    }

    /// Partitioned directory a record will be written to.
    pub fn directory_for(&self, record: &AuditRecord) -> String {
        let root = record
            .persistence_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(&self.default_path);
        self.partitioner.current().under(root)
    }

    /// Append one record. Returns the file written to.
    pub fn write(&self, record: &AuditRecord) -> Result<PathBuf, WriteError> {
        let dir = self.directory_for(record);
        fs::create_dir_all(&dir).map_err(|source| WriteError::CreateDir {
            path: PathBuf::from(&dir),
            source,
        })?;

        let path = PathBuf::from(format!("{dir}{}{LOG_FILE_NAME}", self.partitioner.separator()));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| WriteError::CreateFile {
                path: path.clone(),
                source,
            })?;

        let block = render_block(record);

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        append(&mut file, &block).map_err(|source| WriteError::Append {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}

impl AuditSubscriber for AuditWriter {
    fn on_record(&self, record: &AuditRecord) {
        match self.write(record) {
            Ok(path) => {
                metrics::record_written();
                tracing::debug!(
                    id = %record.id,
                    target = %record.target_address,
                    path = %path.display(),
                    "Audit record written"
                );
            }
            Err(e) => {
                metrics::record_write_failure(e.stage());
                tracing::error!(
                    id = %record.id,
                    target = %record.target_address,
                    error = %e,
                    "Failed to persist audit record"
                );
            }
        }
    }
}

fn append(file: &mut File, block: &str) -> io::Result<()> {
    file.write_all(block.as_bytes())?;
    file.flush()
}

/// Render a record as a delimited block, including the trailing blank line.
pub fn render_block(record: &AuditRecord) -> String {
    let lines = [
        BLOCK_START.to_string(),
        format!("{}  {}", format_time(record.start_time), record.start_time),
        single_line(&record.target_address),
        single_line(&record.args_text),
        single_line(&record.result_text),
        single_line(&record.error_message),
        single_line(&record.error_location),
        format!("{ELAPSED_LABEL}{}", record.elapsed_ms()),
        format!("{}  {}", format_time(record.end_time), record.end_time),
        BLOCK_END.to_string(),
    ];
    let mut block = lines.join("\n");
    block.push_str("\n\n");
    block
}

/// Local `yyyy-MM-dd HH:mm:ss` for epoch milliseconds.
pub fn format_time(epoch_ms: i64) -> String {
    Local
        .timestamp_millis_opt(epoch_ms)
        .single()
        .map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_default()
}

fn single_line(text: &str) -> String {
    text.replace("\r\n", "\\n").replace(['\n', '\r'], "\\n")
}
