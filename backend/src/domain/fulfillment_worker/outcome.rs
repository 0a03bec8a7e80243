//! Explicit results of processing one fulfillment job.
//!
//! The worker never swallows failures; it classifies them so the queue
//! consumer can decide between acknowledging, releasing, and abandoning.

use crate::domain::OrderId;
use crate::domain::ports::JobId;

/// Category of a job failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The job names an order that does not exist.
    OrderMissing,
    /// The order has no style to render.
    StyleMissing,
    /// The input photo is absent from storage.
    InputMissing,
    /// The generated image is absent from storage on redelivery.
    OutputMissing,
    /// Object storage failed.
    Storage,
    /// Order persistence failed or the order changed underneath the worker.
    Persistence,
    /// Transient generator failures outlasted the retry budget.
    GenerationExhausted,
    /// The generator refused the request or returned nothing usable.
    GenerationRejected,
    /// Photo delivery failed transiently.
    DeliveryUnavailable,
    /// The platform refused the photo.
    DeliveryRejected,
}

/// A classified failure with its detail message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl JobFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Result of processing one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Done; the job can be acknowledged.
    Completed,
    /// Transient failure; redelivery may succeed.
    Retryable(JobFailure),
    /// Permanent failure; redelivery cannot help.
    Fatal(JobFailure),
}

impl JobOutcome {
    pub fn failure(&self) -> Option<&JobFailure> {
        match self {
            Self::Completed => None,
            Self::Retryable(failure) | Self::Fatal(failure) => Some(failure),
        }
    }
}

/// Outcome of one job within a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReport {
    pub job_id: JobId,
    pub order_id: OrderId,
    /// Deliveries of this job so far.
    pub attempts: u32,
    pub outcome: JobOutcome,
}

/// Step-local halt used to short-circuit job processing with `?`.
pub(super) enum Halt {
    Retry(JobFailure),
    Stop(JobFailure),
}

impl Halt {
    pub(super) fn retry(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Retry(JobFailure::new(kind, message))
    }

    pub(super) fn stop(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Stop(JobFailure::new(kind, message))
    }
}

impl From<Halt> for JobOutcome {
    fn from(halt: Halt) -> Self {
        match halt {
            Halt::Retry(failure) => Self::Retryable(failure),
            Halt::Stop(failure) => Self::Fatal(failure),
        }
    }
}
