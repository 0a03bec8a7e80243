//! Ports for the fulfillment job queue.
//!
//! Producers see [`JobQueue`]; the queue consumer sees [`JobSource`]. Claimed
//! jobs stay invisible to other consumers until they are acknowledged,
//! released, or their visibility timeout lapses.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::Order;

use super::define_port_error;

/// Queue message asking the worker to fulfil a paid order.
///
/// Serialised as `{"order": <order snapshot>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentJob {
    pub order: Order,
}

impl FulfillmentJob {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Queue-assigned job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(i64);

impl JobId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn as_i64(self) -> i64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A claimed job with its delivery count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    pub id: JobId,
    /// Deliveries so far, including the current one.
    pub attempts: u32,
    pub job: FulfillmentJob,
}

define_port_error! {
    /// Errors surfaced by the queue adapter.
    pub enum JobQueueError {
        /// Queue infrastructure is unavailable.
        Unavailable { message: String } =>
            "fulfillment queue is unavailable: {message}" [retryable],
        /// The queue refused the operation.
        Rejected { message: String } =>
            "fulfillment queue rejected the operation: {message}",
        /// A stored payload could not be decoded.
        Decode { message: String } =>
            "fulfillment job payload is invalid: {message}",
    }
}

/// Producer side of the fulfillment queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Enqueue one job for delivery.
    async fn enqueue(&self, job: &FulfillmentJob) -> Result<(), JobQueueError>;
}

/// Consumer side of the fulfillment queue.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Claim up to `max` visible jobs, incrementing their delivery count.
    async fn claim_batch(&self, max: usize) -> Result<Vec<QueuedJob>, JobQueueError>;

    /// Remove a job permanently.
    async fn acknowledge(&self, id: JobId) -> Result<(), JobQueueError>;

    /// Make a claimed job visible again after `delay`.
    async fn release(&self, id: JobId, delay: Duration) -> Result<(), JobQueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatId, ObjectKey, OrderId, OrderStatus, Style};
    use chrono::DateTime;

    #[test]
    fn job_serialises_order_under_order_key() {
        let mut order = Order::pending(
            OrderId::new(8),
            ChatId::new(99),
            ObjectKey::new("99/file.jpg").expect("valid key"),
            DateTime::UNIX_EPOCH,
        );
        order.style = Some(Style::Ghibli);
        order.status = OrderStatus::Processing;
        let value = serde_json::to_value(FulfillmentJob::new(order.clone())).expect("serialise");
        assert_eq!(value["order"]["style"], "ghibli");
        assert_eq!(value["order"]["status"], "processing");
        let back: FulfillmentJob = serde_json::from_value(value).expect("deserialise");
        assert_eq!(back.order, order);
    }
}
