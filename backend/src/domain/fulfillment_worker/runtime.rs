//! Port and runtime dependency bundles for the fulfillment worker.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    ChatRepository, ImageGenerator, ImageStore, Messenger, OrderRepository,
};

use super::{BackoffJitter, RetrySleeper};

/// Port bundle required by the fulfillment worker.
pub struct FulfillmentWorkerPorts {
    pub orders: Arc<dyn OrderRepository>,
    /// Used to pick the caption locale.
    pub chats: Arc<dyn ChatRepository>,
    pub store: Arc<dyn ImageStore>,
    pub generator: Arc<dyn ImageGenerator>,
    pub messenger: Arc<dyn Messenger>,
}

/// Runtime helpers used by the generator retry policy.
pub struct FulfillmentWorkerRuntime {
    pub sleeper: Arc<dyn RetrySleeper>,
    pub jitter: Arc<dyn BackoffJitter>,
}

impl Default for FulfillmentWorkerRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(AttemptJitter),
        }
    }
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl RetrySleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Adds up to a quarter of the base delay, seeded from the clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptJitter;

impl BackoffJitter for AttemptJitter {
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let max_extra = (base_ms / 4).max(1);
        let seed = u64::from(now.timestamp_subsec_nanos()) ^ u64::from(attempt);
        let extra = seed % max_extra.saturating_add(1);
        Duration::from_millis(base_ms.saturating_add(extra))
    }
}
