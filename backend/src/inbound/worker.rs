//! Queue consumer driving the fulfillment worker.
//!
//! Polls the job source, hands each claimed batch to the worker, and settles
//! every report: completed and fatal jobs are acknowledged, retryable jobs
//! are released for redelivery until they exhaust `max_deliveries`, after
//! which they are abandoned.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::ports::{JobQueueError, JobSource, QueuedJob, ReadinessCheck};
use crate::domain::{FulfillmentWorker, JobOutcome, JobReport};

/// Consumer polling and redelivery settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConsumerConfig {
    /// Maximum jobs claimed per poll.
    pub batch_size: usize,
    /// Idle wait after an empty poll.
    pub poll_interval: Duration,
    /// Visibility delay applied when releasing a retryable job.
    pub retry_delay: Duration,
    /// Deliveries after which a retryable job is abandoned.
    pub max_deliveries: u32,
}

impl Default for QueueConsumerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_interval: Duration::from_secs(1),
            retry_delay: Duration::from_secs(30),
            max_deliveries: 3,
        }
    }
}

/// Shared flag that is set while [`QueueConsumer::run`] is looping.
#[derive(Debug, Clone, Default)]
pub struct ConsumerHeartbeat(Arc<AtomicBool>);

impl ConsumerHeartbeat {
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, running: bool) {
        self.0.store(running, Ordering::Release);
    }
}

#[async_trait]
impl ReadinessCheck for ConsumerHeartbeat {
    fn name(&self) -> &'static str {
        "queue_consumer"
    }

    async fn is_ready(&self) -> bool {
        self.is_running()
    }
}

pub struct QueueConsumer {
    source: Arc<dyn JobSource>,
    worker: Arc<FulfillmentWorker>,
    config: QueueConsumerConfig,
    heartbeat: ConsumerHeartbeat,
}

impl QueueConsumer {
    pub fn new(
        source: Arc<dyn JobSource>,
        worker: Arc<FulfillmentWorker>,
        config: QueueConsumerConfig,
    ) -> Self {
        Self {
            source,
            worker,
            config,
            heartbeat: ConsumerHeartbeat::default(),
        }
    }

    /// Handle reporting whether the polling loop is alive.
    pub fn heartbeat(&self) -> ConsumerHeartbeat {
        self.heartbeat.clone()
    }

    /// Claim and process one batch, returning how many jobs were claimed.
    pub async fn poll_once(&self) -> Result<usize, JobQueueError> {
        let jobs = self.source.claim_batch(self.config.batch_size.max(1)).await?;
        if jobs.is_empty() {
            return Ok(0);
        }
        debug!(count = jobs.len(), "claimed fulfillment jobs");
        let reports = self.worker.process_batch(&jobs).await;
        for (queued, report) in jobs.iter().zip(reports) {
            self.settle(queued, report).await;
        }
        Ok(jobs.len())
    }

    /// Poll until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// A batch in flight always finishes before the loop exits.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            batch_size = self.config.batch_size,
            max_deliveries = self.config.max_deliveries,
            "fulfillment consumer started"
        );
        self.heartbeat.set(true);
        loop {
            if *shutdown.borrow() {
                break;
            }
            let claimed = match self.poll_once().await {
                Ok(claimed) => claimed,
                Err(error) => {
                    warn!(error = %error, "failed to claim fulfillment jobs");
                    0
                }
            };
            if claimed > 0 {
                continue;
            }
            tokio::select! {
                () = tokio::time::sleep(self.config.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        self.heartbeat.set(false);
        info!("fulfillment consumer stopped");
    }

    async fn settle(&self, queued: &QueuedJob, report: JobReport) {
        let job_id = report.job_id;
        let order_id = report.order_id;
        let result = match report.outcome {
            JobOutcome::Completed | JobOutcome::Fatal(_) => self.source.acknowledge(job_id).await,
            JobOutcome::Retryable(_) if report.attempts < self.config.max_deliveries => {
                debug!(%job_id, %order_id, attempts = report.attempts, "releasing job for redelivery");
                self.source.release(job_id, self.config.retry_delay).await
            }
            JobOutcome::Retryable(failure) => {
                warn!(%job_id, %order_id, attempts = report.attempts, error = %failure.message, "abandoning job");
                self.worker.abandon(&queued.job, &failure).await;
                self.source.acknowledge(job_id).await
            }
        };
        if let Err(error) = result {
            warn!(%job_id, %order_id, error = %error, "failed to settle fulfillment job");
        }
    }
}
