//! Pipeline assembly.
//!
//! Builds writer → dispatcher → processor → worker pool once at startup and
//! hands out cloneable [`Interceptor`]s.

use std::sync::Arc;

use crate::audit::{AuditSubscriber, AuditWriter, DatePartitioner, Dispatcher};
use crate::config::AuditConfig;
use crate::intercept::Interceptor;
use crate::policy::{PolicyRegistry, PolicyResolver};
use crate::worker::{RecordProcessor, WorkerPool};

/// A running audit pipeline.
pub struct AuditPipeline {
    pool: WorkerPool,
    dispatcher: Arc<Dispatcher>,
}

impl AuditPipeline {
    /// Start with policies taken from the config's `[[policies]]` rules.
    pub fn from_config(config: &AuditConfig) -> Self {
        Self::start(config, Arc::new(PolicyRegistry::from_rules(&config.policies)))
    }

    /// Start with the file writer as the only subscriber.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &AuditConfig, resolver: Arc<dyn PolicyResolver>) -> Self {
        let default_path = config.persistence.resolve_default_path();
        let partitioner = DatePartitioner::new(config.is_production());
        let writer: Arc<dyn AuditSubscriber> =
            Arc::new(AuditWriter::new(default_path, partitioner));
        Self::with_subscribers(config, resolver, vec![writer])
    }

    /// Start with explicit subscribers, e.g. a writer with a fixed clock.
    pub fn with_subscribers(
        config: &AuditConfig,
        resolver: Arc<dyn PolicyResolver>,
        subscribers: Vec<Arc<dyn AuditSubscriber>>,
    ) -> Self {
        let dispatcher = subscribers
            .into_iter()
            .fold(Dispatcher::new(config.queue.capacity), Dispatcher::with_subscriber);
        let dispatcher = Arc::new(dispatcher);

        let processor = Arc::new(RecordProcessor::new(resolver, dispatcher.clone()));
        let pool = WorkerPool::spawn(config.workers.count, processor);

        tracing::info!(
            profile = %config.profile,
            production = config.is_production(),
            workers = pool.size(),
            queue_capacity = dispatcher.capacity(),
            "Audit pipeline started"
        );

        Self { pool, dispatcher }
    }

    pub fn interceptor(&self) -> Interceptor {
        Interceptor::new(self.pool.handle())
    }

    /// Finish all queued work, publish anything left pending, and stop.
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
        self.dispatcher.drain();
        tracing::info!("Audit pipeline stopped");
    }
}
