//! Unit tests for fulfillment worker orchestration.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rstest::{fixture, rstest};

use super::{
    FailureKind, FulfillmentWorker, FulfillmentWorkerConfig, FulfillmentWorkerPorts,
    FulfillmentWorkerRuntime, JobOutcome,
};
use crate::domain::admin::AdminNotifier;
use crate::domain::ports::{
    ChatRepository, FulfillmentJob, ImageGeneratorError, JobId, MessengerError,
    QueuedJob,
};
use crate::domain::{
    Chat, ChatId, ChatProfile, ObjectKey, Order, OrderId, OrderStatus, Style,
};
use crate::test_support::{
    InMemoryChatRepository, InMemoryImageStore, InMemoryOrderRepository, MutableClock, NoJitter,
    RecordingMessenger, RecordingSleeper, ScriptedImageGenerator,
};

const CHAT: i64 = 2718;
const ADMIN: i64 = 5752293796;
const OUTPUT: &[u8] = b"stylized";

struct Harness {
    orders: Arc<InMemoryOrderRepository>,
    chats: Arc<InMemoryChatRepository>,
    store: Arc<InMemoryImageStore>,
    generator: Arc<ScriptedImageGenerator>,
    messenger: Arc<RecordingMessenger>,
    sleeper: Arc<RecordingSleeper>,
}

impl Harness {
    fn new(generator: ScriptedImageGenerator) -> Self {
        Self {
            orders: Arc::new(InMemoryOrderRepository::default()),
            chats: Arc::new(InMemoryChatRepository::default()),
            store: Arc::new(InMemoryImageStore::default()),
            generator: Arc::new(generator),
            messenger: Arc::new(RecordingMessenger::default()),
            sleeper: Arc::new(RecordingSleeper::default()),
        }
    }

    fn worker(&self) -> FulfillmentWorker {
        let clock = Utc
            .with_ymd_and_hms(2026, 4, 1, 12, 0, 0)
            .single()
            .expect("valid time");
        FulfillmentWorker::with_runtime(
            FulfillmentWorkerPorts {
                orders: self.orders.clone(),
                chats: self.chats.clone(),
                store: self.store.clone(),
                generator: self.generator.clone(),
                messenger: self.messenger.clone(),
            },
            AdminNotifier::new(self.messenger.clone(), Some(ChatId::new(ADMIN))),
            Arc::new(MutableClock::new(clock)),
            FulfillmentWorkerRuntime {
                sleeper: self.sleeper.clone(),
                jitter: Arc::new(NoJitter),
            },
            FulfillmentWorkerConfig::default(),
        )
    }

    /// Seed a paid order with its input photo in storage.
    fn seed_order(&self, id: i64, status: OrderStatus) -> Order {
        let input = ObjectKey::new(format!("{CHAT}/file_{id}.jpg")).expect("valid key");
        let mut order = Order::pending(
            OrderId::new(id),
            ChatId::new(CHAT),
            input.clone(),
            Utc::now(),
        );
        order.style = Some(Style::Ghibli);
        order.status = status;
        self.orders.insert(order.clone());
        self.store.insert(input, b"selfie".to_vec());
        order
    }

    fn admin_messages(&self) -> Vec<String> {
        self.messenger
            .messages()
            .into_iter()
            .filter(|message| message.chat_id == ChatId::new(ADMIN))
            .map(|message| message.text)
            .collect()
    }

    fn status(&self, id: i64) -> OrderStatus {
        self.orders
            .get(OrderId::new(id))
            .expect("order exists")
            .status
    }
}

#[fixture]
fn harness() -> Harness {
    Harness::new(ScriptedImageGenerator::succeeding(OUTPUT.to_vec()))
}

fn job(order: &Order) -> FulfillmentJob {
    FulfillmentJob::new(order.clone())
}

#[rstest]
#[tokio::test]
async fn completes_paid_order_end_to_end(harness: Harness) {
    let order = harness.seed_order(5, OrderStatus::Processing);

    let outcome = harness.worker().process_job(&job(&order)).await;

    assert_eq!(outcome, JobOutcome::Completed);
    let stored = harness.orders.get(order.id).expect("order");
    assert_eq!(stored.status, OrderStatus::Sent);
    assert_eq!(
        stored.output_image_path.as_ref().map(ObjectKey::as_str),
        Some("2718/output-5.jpeg")
    );
    assert_eq!(harness.store.bytes("2718/output-5.jpeg"), Some(OUTPUT.to_vec()));

    let requests = harness.generator.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, "Convert this photo to ghibli style");
    assert_eq!(requests[0].size, "1024x1024");
    assert_eq!(requests[0].quality, "high");
    assert_eq!(requests[0].image, b"selfie".to_vec());

    let photos = harness.messenger.photos();
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0].chat_id, ChatId::new(CHAT));
    assert_eq!(photos[0].bytes, OUTPUT.to_vec());
    assert_eq!(
        photos[0].caption.as_deref(),
        Some("Your photo has been transformed to *Ghibli* style. Thank you for using our service! 🎉")
    );
    assert!(harness.admin_messages().is_empty());
}

#[rstest]
#[tokio::test]
async fn caption_follows_chat_locale(harness: Harness) {
    let order = harness.seed_order(6, OrderStatus::Processing);
    harness
        .chats
        .insert_if_absent(&Chat::new(
            ChatId::new(CHAT),
            ChatProfile {
                language_code: Some("ru".into()),
                ..ChatProfile::default()
            },
        ))
        .await
        .expect("seed chat");

    harness.worker().process_job(&job(&order)).await;

    let caption = harness.messenger.photos()[0].caption.clone().expect("caption");
    assert!(caption.starts_with("Твоё фото"));
}

#[rstest]
#[case::sent(OrderStatus::Sent)]
#[case::failed(OrderStatus::Failed)]
#[tokio::test]
async fn settled_orders_are_skipped(harness: Harness, #[case] status: OrderStatus) {
    let order = harness.seed_order(7, status);

    let outcome = harness.worker().process_job(&job(&order)).await;

    assert_eq!(outcome, JobOutcome::Completed);
    assert!(harness.generator.requests().is_empty());
    assert!(harness.messenger.photos().is_empty());
    assert_eq!(harness.status(7), status);
}

#[rstest]
#[tokio::test]
async fn missing_order_is_fatal_and_notifies_admin(harness: Harness) {
    let ghost = harness.seed_order(8, OrderStatus::Processing);
    let unknown = Order {
        id: OrderId::new(404),
        ..ghost
    };

    let outcome = harness.worker().process_job(&job(&unknown)).await;

    let JobOutcome::Fatal(failure) = &outcome else {
        panic!("expected fatal outcome, got {outcome:?}");
    };
    assert_eq!(failure.kind, FailureKind::OrderMissing);
    assert_eq!(harness.admin_messages(), vec!["Order 404 failed: order 404 not found"]);
}

#[rstest]
#[tokio::test]
async fn missing_input_records_error_and_keeps_processing(harness: Harness) {
    let mut order = harness.seed_order(9, OrderStatus::Processing);
    order.input_image_path = ObjectKey::new("2718/vanished.jpg").expect("valid key");
    harness.orders.insert(order.clone());

    let outcome = harness.worker().process_job(&job(&order)).await;

    let JobOutcome::Fatal(failure) = &outcome else {
        panic!("expected fatal outcome, got {outcome:?}");
    };
    assert_eq!(failure.kind, FailureKind::InputMissing);
    let stored = harness.orders.get(order.id).expect("order");
    assert_eq!(stored.status, OrderStatus::Processing);
    assert_eq!(
        stored.error.as_deref(),
        Some("input image 2718/vanished.jpg not found")
    );
    assert!(harness.generator.requests().is_empty());
}

#[tokio::test]
async fn transient_generator_errors_are_retried_with_backoff() {
    let harness = Harness::new(ScriptedImageGenerator::scripted(
        vec![
            Err(ImageGeneratorError::rate_limited("slow down")),
            Err(ImageGeneratorError::timeout("120s")),
        ],
        OUTPUT.to_vec(),
    ));
    let order = harness.seed_order(10, OrderStatus::Processing);

    let outcome = harness.worker().process_job(&job(&order)).await;

    assert_eq!(outcome, JobOutcome::Completed);
    assert_eq!(harness.generator.requests().len(), 3);
    assert_eq!(
        harness.sleeper.recorded(),
        vec![Duration::from_millis(500), Duration::from_millis(1000)]
    );
    assert_eq!(harness.status(10), OrderStatus::Sent);
}

#[tokio::test]
async fn exhausted_retries_surface_as_retryable() {
    let harness = Harness::new(ScriptedImageGenerator::scripted(
        vec![
            Err(ImageGeneratorError::transport("reset")),
            Err(ImageGeneratorError::transport("reset")),
            Err(ImageGeneratorError::transport("reset")),
        ],
        OUTPUT.to_vec(),
    ));
    let order = harness.seed_order(11, OrderStatus::Processing);

    let outcome = harness.worker().process_job(&job(&order)).await;

    let JobOutcome::Retryable(failure) = &outcome else {
        panic!("expected retryable outcome, got {outcome:?}");
    };
    assert_eq!(failure.kind, FailureKind::GenerationExhausted);
    assert_eq!(harness.sleeper.recorded().len(), 2);
    let stored = harness.orders.get(order.id).expect("order");
    assert_eq!(stored.status, OrderStatus::Processing);
    assert!(stored.error.is_some());
    assert!(harness.admin_messages().is_empty());
}

#[rstest]
#[case::rejected(ImageGeneratorError::rejected(400_u16, "safety system"))]
#[case::empty(ImageGeneratorError::empty_result())]
#[case::decode(ImageGeneratorError::decode("invalid base64"))]
#[tokio::test]
async fn permanent_generator_errors_fail_the_order(#[case] error: ImageGeneratorError) {
    let harness = Harness::new(ScriptedImageGenerator::scripted(
        vec![Err(error)],
        OUTPUT.to_vec(),
    ));
    let order = harness.seed_order(12, OrderStatus::Processing);

    let outcome = harness.worker().process_job(&job(&order)).await;

    let JobOutcome::Fatal(failure) = &outcome else {
        panic!("expected fatal outcome, got {outcome:?}");
    };
    assert_eq!(failure.kind, FailureKind::GenerationRejected);
    assert_eq!(harness.generator.requests().len(), 1);
    assert_eq!(harness.status(12), OrderStatus::Failed);
    assert_eq!(harness.admin_messages().len(), 1);
    assert!(harness.messenger.photos().is_empty());
}

#[rstest]
#[tokio::test]
async fn processed_orders_resume_at_delivery(harness: Harness) {
    let mut order = harness.seed_order(13, OrderStatus::Processed);
    let output = ObjectKey::output(ChatId::new(CHAT), order.id);
    order.output_image_path = Some(output.clone());
    harness.orders.insert(order.clone());
    harness.store.insert(output, b"earlier".to_vec());

    let outcome = harness.worker().process_job(&job(&order)).await;

    assert_eq!(outcome, JobOutcome::Completed);
    assert!(harness.generator.requests().is_empty());
    assert_eq!(harness.messenger.photos()[0].bytes, b"earlier".to_vec());
    assert_eq!(harness.status(13), OrderStatus::Sent);
}

#[rstest]
#[tokio::test]
async fn transient_delivery_failure_is_retryable_without_regeneration(harness: Harness) {
    let order = harness.seed_order(14, OrderStatus::Processing);
    harness
        .messenger
        .fail_next_photo(MessengerError::timeout("upload stalled"));
    let worker = harness.worker();

    let first = worker.process_job(&job(&order)).await;
    let JobOutcome::Retryable(failure) = &first else {
        panic!("expected retryable outcome, got {first:?}");
    };
    assert_eq!(failure.kind, FailureKind::DeliveryUnavailable);
    assert_eq!(harness.status(14), OrderStatus::Processed);

    let second = worker.process_job(&job(&order)).await;
    assert_eq!(second, JobOutcome::Completed);
    assert_eq!(harness.generator.requests().len(), 1);
    assert_eq!(harness.status(14), OrderStatus::Sent);
}

#[rstest]
#[tokio::test]
async fn rejected_delivery_fails_the_order(harness: Harness) {
    let order = harness.seed_order(15, OrderStatus::Processing);
    harness
        .messenger
        .fail_next_photo(MessengerError::api(403_u16, "bot was blocked by the user"));

    let outcome = harness.worker().process_job(&job(&order)).await;

    let JobOutcome::Fatal(failure) = &outcome else {
        panic!("expected fatal outcome, got {outcome:?}");
    };
    assert_eq!(failure.kind, FailureKind::DeliveryRejected);
    assert_eq!(harness.status(15), OrderStatus::Failed);
}

#[rstest]
#[tokio::test]
async fn batch_failures_do_not_abort_siblings(harness: Harness) {
    let mut broken = harness.seed_order(16, OrderStatus::Processing);
    broken.input_image_path = ObjectKey::new("2718/gone.jpg").expect("valid key");
    harness.orders.insert(broken.clone());
    let healthy = harness.seed_order(17, OrderStatus::Processing);
    let batch = vec![
        QueuedJob {
            id: JobId::new(1),
            attempts: 1,
            job: job(&broken),
        },
        QueuedJob {
            id: JobId::new(2),
            attempts: 2,
            job: job(&healthy),
        },
    ];

    let reports = harness.worker().process_batch(&batch).await;

    assert_eq!(reports.len(), 2);
    assert!(matches!(reports[0].outcome, JobOutcome::Fatal(_)));
    assert_eq!(reports[1].job_id, JobId::new(2));
    assert_eq!(reports[1].attempts, 2);
    assert_eq!(reports[1].outcome, JobOutcome::Completed);
    assert_eq!(harness.status(17), OrderStatus::Sent);
}

#[rstest]
#[tokio::test]
async fn abandon_marks_failed_and_notifies_admin(harness: Harness) {
    let order = harness.seed_order(18, OrderStatus::Processing);
    let failure = super::JobFailure::new(FailureKind::GenerationExhausted, "rate limited");

    harness.worker().abandon(&job(&order), &failure).await;

    let stored = harness.orders.get(order.id).expect("order");
    assert_eq!(stored.status, OrderStatus::Failed);
    assert_eq!(
        stored.error.as_deref(),
        Some("abandoned after repeated failures: rate limited")
    );
    assert_eq!(harness.admin_messages().len(), 1);
}

#[rstest]
#[tokio::test]
async fn order_without_style_is_fatal_and_untouched(harness: Harness) {
    let mut order = harness.seed_order(19, OrderStatus::Processing);
    order.style = None;
    harness.orders.insert(order.clone());

    let outcome = harness.worker().process_job(&job(&order)).await;

    assert!(matches!(
        outcome,
        JobOutcome::Fatal(ref failure) if failure.kind == FailureKind::StyleMissing
    ));
    assert_eq!(harness.status(19), OrderStatus::Processing);
}
