//! Bounded record queue and publication to subscribers.
//!
//! # Responsibilities
//! - Accept records without ever blocking the submitter
//! - Drop and report records when the queue is at capacity
//! - Publish the oldest pending record to every subscriber
//!
//! # Design Decisions
//! - Each submission is followed by publishing the queue head, which is not
//!   necessarily the record just submitted
//! - The published record is the one actually dequeued, so a record is
//!   published at most once
//! - Subscribers run outside the queue lock

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::audit::record::AuditRecord;
use crate::observability::metrics;

/// Receives every published record.
pub trait AuditSubscriber: Send + Sync {
    fn on_record(&self, record: &AuditRecord);
}

/// Bounded queue of pending records plus the publish step.
pub struct Dispatcher {
    queue: Mutex<VecDeque<AuditRecord>>,
    capacity: usize,
    subscribers: Vec<Arc<dyn AuditSubscriber>>,
}

impl Dispatcher {
    pub fn new(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            subscribers: Vec::new(),
        }
    }

    pub fn with_subscriber(mut self, subscriber: Arc<dyn AuditSubscriber>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of records waiting to be published.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Enqueue a record, then publish the queue head.
    ///
    /// Returns false when the queue was full and the record was dropped.
    pub fn submit(&self, record: AuditRecord) -> bool {
        let accepted = self.enqueue(record);
        if let Some(head) = self.dequeue() {
            self.publish(&head);
        }
        accepted
    }

    /// Publish everything still pending.
    pub fn drain(&self) -> usize {
        let mut published = 0;
        while let Some(record) = self.dequeue() {
            self.publish(&record);
            published += 1;
        }
        if published > 0 {
            tracing::debug!(published, "Dispatcher drained");
        }
        published
    }

    fn enqueue(&self, record: AuditRecord) -> bool {
        let mut queue = self.lock();
        if queue.len() >= self.capacity {
            drop(queue);
            metrics::record_dropped("queue_full");
            tracing::warn!(
                id = %record.id,
                target = %record.target_address,
                capacity = self.capacity,
                "Audit queue full, record dropped"
            );
            return false;
        }
        queue.push_back(record);
        metrics::record_queue_depth(queue.len());
        true
    }

    fn dequeue(&self) -> Option<AuditRecord> {
        let mut queue = self.lock();
        let head = queue.pop_front();
        metrics::record_queue_depth(queue.len());
        head
    }

    fn publish(&self, record: &AuditRecord) {
        for subscriber in &self.subscribers {
            subscriber.on_record(record);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<AuditRecord>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
