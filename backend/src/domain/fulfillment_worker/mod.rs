//! Domain orchestration for fulfilling paid orders.
//!
//! The worker reloads each order, generates (or reloads) the stylized image,
//! delivers it, and advances the order through the state machine. Generator
//! calls retry transient failures with jittered exponential backoff; every
//! other failure is classified into a [`JobOutcome`] for the queue consumer.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{debug, info, warn};

use crate::domain::admin::AdminNotifier;
use crate::domain::messages::{self, Locale};
use crate::domain::ports::{
    ChatRepository, FulfillmentJob, GeneratedImage, GenerationRequest, ImageGenerator,
    ImageGeneratorError, ImageStore, Messenger, OrderRepository, OrderRepositoryError,
    OutgoingPhoto, ParseMode, QueuedJob,
};
use crate::domain::{ObjectKey, Order, OrderId, OrderStatus, Style};

mod outcome;
mod runtime;

use outcome::Halt;
pub use outcome::{FailureKind, JobFailure, JobOutcome, JobReport};
pub use runtime::{AttemptJitter, FulfillmentWorkerPorts, FulfillmentWorkerRuntime, TokioSleeper};

/// Worker configuration controlling generation parameters and retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FulfillmentWorkerConfig {
    /// Maximum generator attempts per job (including the first call).
    pub max_generation_attempts: u32,
    /// Initial retry backoff.
    pub initial_backoff: Duration,
    /// Maximum retry backoff cap.
    pub max_backoff: Duration,
    /// Output dimensions requested from the generator.
    pub image_size: String,
    /// Output quality requested from the generator.
    pub image_quality: String,
}

impl Default for FulfillmentWorkerConfig {
    fn default() -> Self {
        Self {
            max_generation_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            image_size: "1024x1024".to_owned(),
            image_quality: "high".to_owned(),
        }
    }
}

/// Async clock-independent sleeping abstraction for retries.
#[async_trait]
pub trait RetrySleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Retry backoff jitter abstraction.
pub trait BackoffJitter: Send + Sync {
    /// Return a jittered delay from the exponential base delay.
    ///
    /// ```rust
    /// use stylebot::domain::BackoffJitter;
    /// use chrono::{TimeZone, Utc};
    /// use std::time::Duration;
    /// struct FixedStep;
    /// impl BackoffJitter for FixedStep {
    ///     fn jittered_delay(&self, base: Duration, attempt: u32, _now: chrono::DateTime<chrono::Utc>) -> Duration {
    ///         base + Duration::from_millis(u64::from(attempt) * 10)
    ///     }
    /// }
    /// let now = Utc.with_ymd_and_hms(2026, 5, 4, 9, 0, 0).single().expect("valid time");
    /// assert_eq!(FixedStep.jittered_delay(Duration::from_millis(500), 2, now), Duration::from_millis(520));
    /// ```
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration;
}

/// Fulfils paid orders delivered by the queue.
pub struct FulfillmentWorker {
    orders: Arc<dyn OrderRepository>,
    chats: Arc<dyn ChatRepository>,
    store: Arc<dyn ImageStore>,
    generator: Arc<dyn ImageGenerator>,
    messenger: Arc<dyn Messenger>,
    admin: AdminNotifier,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn RetrySleeper>,
    jitter: Arc<dyn BackoffJitter>,
    config: FulfillmentWorkerConfig,
}

impl FulfillmentWorker {
    /// Build a worker using default runtime dependencies.
    pub fn new(
        ports: FulfillmentWorkerPorts,
        admin: AdminNotifier,
        clock: Arc<dyn Clock>,
        config: FulfillmentWorkerConfig,
    ) -> Self {
        Self::with_runtime(
            ports,
            admin,
            clock,
            FulfillmentWorkerRuntime::default(),
            config,
        )
    }

    /// Build a worker with injected runtime abstractions.
    pub fn with_runtime(
        ports: FulfillmentWorkerPorts,
        admin: AdminNotifier,
        clock: Arc<dyn Clock>,
        runtime: FulfillmentWorkerRuntime,
        config: FulfillmentWorkerConfig,
    ) -> Self {
        Self {
            orders: ports.orders,
            chats: ports.chats,
            store: ports.store,
            generator: ports.generator,
            messenger: ports.messenger,
            admin,
            clock,
            sleeper: runtime.sleeper,
            jitter: runtime.jitter,
            config,
        }
    }

    /// Process a claimed batch.
    ///
    /// Jobs run one after another and independently; a failing job never
    /// prevents its siblings from being processed.
    pub async fn process_batch(&self, jobs: &[QueuedJob]) -> Vec<JobReport> {
        let mut reports = Vec::with_capacity(jobs.len());
        for queued in jobs {
            let outcome = self.process_job(&queued.job).await;
            reports.push(JobReport {
                job_id: queued.id,
                order_id: queued.job.order.id,
                attempts: queued.attempts,
                outcome,
            });
        }
        reports
    }

    /// Process one job.
    ///
    /// Redelivery is idempotent: jobs for `sent` or `failed` orders complete
    /// without side effects, and jobs for `processed` orders resume at
    /// delivery without regenerating.
    pub async fn process_job(&self, job: &FulfillmentJob) -> JobOutcome {
        let order_id = job.order.id;
        let outcome = match self.fulfil(order_id).await {
            Ok(()) => JobOutcome::Completed,
            Err(halt) => JobOutcome::from(halt),
        };
        match &outcome {
            JobOutcome::Completed => {}
            JobOutcome::Retryable(failure) => {
                warn!(%order_id, kind = ?failure.kind, error = %failure.message, "fulfillment will be retried");
            }
            JobOutcome::Fatal(failure) => {
                warn!(%order_id, kind = ?failure.kind, error = %failure.message, "fulfillment failed permanently");
                self.admin
                    .notify(messages::admin_order_failed(order_id, &failure.message))
                    .await;
            }
        }
        outcome
    }

    /// Give up on a job the consumer will not redeliver.
    ///
    /// Marks the order `failed` when the state machine allows it and
    /// notifies the admin chat.
    pub async fn abandon(&self, job: &FulfillmentJob, failure: &JobFailure) {
        let order_id = job.order.id;
        let detail = format!("abandoned after repeated failures: {}", failure.message);
        match self.orders.mark_failed(order_id, detail.clone()).await {
            Ok(true) => info!(%order_id, "abandoned order marked failed"),
            Ok(false) => debug!(%order_id, "abandoned order already settled"),
            Err(error) => warn!(%order_id, error = %error, "failed to mark abandoned order"),
        }
        self.admin
            .notify(messages::admin_order_failed(order_id, &detail))
            .await;
    }

    async fn fulfil(&self, order_id: OrderId) -> Result<(), Halt> {
        let order = self
            .orders
            .find(order_id)
            .await
            .map_err(Self::persistence_halt)?
            .ok_or_else(|| {
                Halt::stop(FailureKind::OrderMissing, format!("order {order_id} not found"))
            })?;

        if order.status.is_terminal() {
            debug!(%order_id, status = %order.status, "order already settled; skipping");
            return Ok(());
        }

        let Some(style) = order.style else {
            self.record_error(order_id, "order has no style").await;
            return Err(Halt::stop(FailureKind::StyleMissing, "order has no style"));
        };

        let image = if order.status == OrderStatus::Processed {
            self.reload_output(&order).await?
        } else {
            self.generate_and_store(&order, style).await?
        };

        let locale = self.caption_locale(&order).await;
        self.deliver(&order, style, locale, image).await?;

        let sent = self
            .orders
            .transition(order_id, OrderStatus::Sent)
            .await
            .map_err(Self::persistence_halt)?;
        if sent {
            info!(%order_id, %style, "order delivered");
        } else {
            warn!(%order_id, "order status changed before it could be marked sent");
        }
        Ok(())
    }

    async fn generate_and_store(&self, order: &Order, style: Style) -> Result<Vec<u8>, Halt> {
        let entered = self
            .orders
            .transition(order.id, OrderStatus::Processing)
            .await
            .map_err(Self::persistence_halt)?;
        if !entered {
            return Err(Halt::retry(
                FailureKind::Persistence,
                format!("order {} left a processable status", order.id),
            ));
        }

        let input = self
            .store
            .get(&order.input_image_path)
            .await
            .map_err(|error| Halt::retry(FailureKind::Storage, error.to_string()))?;
        let Some(input) = input else {
            let detail = format!("input image {} not found", order.input_image_path);
            self.record_error(order.id, &detail).await;
            return Err(Halt::stop(FailureKind::InputMissing, detail));
        };

        let request = GenerationRequest {
            order_id: order.id,
            prompt: style.prompt(),
            image: input,
            size: self.config.image_size.clone(),
            quality: self.config.image_quality.clone(),
        };
        let generated = self.generate_with_retry(&request).await?;

        let output_key = ObjectKey::output(order.chat_id, order.id);
        self.store
            .put(&output_key, generated.bytes.clone())
            .await
            .map_err(|error| Halt::retry(FailureKind::Storage, error.to_string()))?;

        let completed = self
            .orders
            .complete_generation(order.id, output_key)
            .await
            .map_err(Self::persistence_halt)?;
        if !completed {
            return Err(Halt::retry(
                FailureKind::Persistence,
                format!("order {} could not be marked processed", order.id),
            ));
        }
        Ok(generated.bytes)
    }

    async fn generate_with_retry(&self, request: &GenerationRequest) -> Result<GeneratedImage, Halt> {
        let order_id = request.order_id;
        let max_attempts = self.config.max_generation_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.generator.generate(request).await {
                Ok(image) => return Ok(image),
                Err(error) if error.is_retryable() && attempt < max_attempts => {
                    let base_delay = self.retry_base_delay(attempt);
                    let delay = self
                        .jitter
                        .jittered_delay(base_delay, attempt, self.clock.utc());
                    debug!(%order_id, attempt, error = %error, ?delay, "retrying image generation");
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Err(error) if error.is_retryable() => {
                    let detail = format!("image generation retries exhausted: {error}");
                    self.record_error(order_id, &detail).await;
                    return Err(Halt::retry(FailureKind::GenerationExhausted, detail));
                }
                Err(error) => return Err(self.reject_generation(order_id, error).await),
            }
        }
    }

    async fn reject_generation(&self, order_id: OrderId, error: ImageGeneratorError) -> Halt {
        let detail = format!("image generation failed: {error}");
        self.fail_order(order_id, &detail).await;
        Halt::stop(FailureKind::GenerationRejected, detail)
    }

    async fn reload_output(&self, order: &Order) -> Result<Vec<u8>, Halt> {
        let key = order
            .output_image_path
            .clone()
            .unwrap_or_else(|| ObjectKey::output(order.chat_id, order.id));
        let bytes = self
            .store
            .get(&key)
            .await
            .map_err(|error| Halt::retry(FailureKind::Storage, error.to_string()))?;
        match bytes {
            Some(bytes) => Ok(bytes),
            None => {
                let detail = format!("output image {key} not found");
                self.record_error(order.id, &detail).await;
                Err(Halt::stop(FailureKind::OutputMissing, detail))
            }
        }
    }

    async fn caption_locale(&self, order: &Order) -> Locale {
        match self.chats.find(order.chat_id).await {
            Ok(Some(chat)) => chat.locale(),
            Ok(None) => Locale::En,
            Err(error) => {
                warn!(order_id = %order.id, error = %error, "chat lookup failed; captioning in English");
                Locale::En
            }
        }
    }

    async fn deliver(
        &self,
        order: &Order,
        style: Style,
        locale: Locale,
        bytes: Vec<u8>,
    ) -> Result<(), Halt> {
        let photo = OutgoingPhoto {
            chat_id: order.chat_id,
            file_name: format!("output-{}.jpeg", order.id),
            bytes,
            caption: Some(messages::result_caption(locale, style)),
            parse_mode: Some(ParseMode::Markdown),
        };
        match self.messenger.send_photo(&photo).await {
            Ok(()) => Ok(()),
            Err(error) if error.is_retryable() => {
                let detail = format!("photo delivery failed: {error}");
                self.record_error(order.id, &detail).await;
                Err(Halt::retry(FailureKind::DeliveryUnavailable, detail))
            }
            Err(error) => {
                let detail = format!("photo delivery rejected: {error}");
                self.fail_order(order.id, &detail).await;
                Err(Halt::stop(FailureKind::DeliveryRejected, detail))
            }
        }
    }

    async fn record_error(&self, order_id: OrderId, detail: &str) {
        if let Err(error) = self.orders.record_error(order_id, detail.to_owned()).await {
            warn!(%order_id, error = %error, "failed to record order error");
        }
    }

    async fn fail_order(&self, order_id: OrderId, detail: &str) {
        match self.orders.mark_failed(order_id, detail.to_owned()).await {
            Ok(true) => {}
            Ok(false) => debug!(%order_id, "order already settled; not marking failed"),
            Err(error) => warn!(%order_id, error = %error, "failed to mark order failed"),
        }
    }

    fn persistence_halt(error: OrderRepositoryError) -> Halt {
        Halt::retry(FailureKind::Persistence, error.to_string())
    }

    fn retry_base_delay(&self, attempt: u32) -> Duration {
        let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
        let base_ms = u64::try_from(self.config.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.config.max_backoff.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(u64::from(exponent)).min(max_ms))
    }
}

#[cfg(test)]
mod tests;
