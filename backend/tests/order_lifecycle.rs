//! End-to-end order lifecycle through the webhook and the queue consumer.
//!
//! Drives a photo through style selection, invoicing, payment, and
//! fulfillment using the in-memory adapters from `stylebot::test_support`.

use std::sync::Arc;

use actix_web::{App, http::StatusCode, test, web};
use chrono::Utc;
use serde_json::json;
use stylebot::domain::{
    AdminNotifier, BotPorts, ChatId, FulfillmentWorker, FulfillmentWorkerConfig,
    FulfillmentWorkerPorts, FulfillmentWorkerRuntime, InvoicePayload, OrderId, OrderStatus,
    PricingPolicy, STARS_CURRENCY, Style, UpdateDispatcher,
};
use stylebot::inbound::http::HttpState;
use stylebot::inbound::http::webhook::receive_update;
use stylebot::inbound::worker::{QueueConsumer, QueueConsumerConfig};
use stylebot::test_support::{
    ImmediateSleeper, InMemoryChatRepository, InMemoryImageStore, InMemoryJobQueue,
    InMemoryOrderRepository, MutableClock, NoJitter, RecordingMessenger,
    ScriptedImageGenerator,
};

const CHAT: i64 = 4_242;
const ADMIN: i64 = 1;

struct Harness {
    messenger: Arc<RecordingMessenger>,
    orders: Arc<InMemoryOrderRepository>,
    store: Arc<InMemoryImageStore>,
    queue: Arc<InMemoryJobQueue>,
    generator: Arc<ScriptedImageGenerator>,
    state: HttpState,
    consumer: QueueConsumer,
}

fn harness() -> Harness {
    let messenger = Arc::new(RecordingMessenger::default().with_file(
        "photo-large",
        "photos/file_7.jpg",
        vec![0xFF, 0xD8, 0x01],
    ));
    let chats = Arc::new(InMemoryChatRepository::default());
    let orders = Arc::new(InMemoryOrderRepository::default());
    let store = Arc::new(InMemoryImageStore::default());
    let queue = Arc::new(InMemoryJobQueue::default());
    let generator = Arc::new(ScriptedImageGenerator::succeeding(vec![0xFF, 0xD8, 0x02]));
    let pricing = PricingPolicy {
        price_stars: 25,
        admin_price_stars: 1,
        admin_chat_id: Some(ChatId::new(ADMIN)),
    };

    let dispatcher = UpdateDispatcher::new(
        BotPorts {
            messenger: messenger.clone(),
            chats: chats.clone(),
            orders: orders.clone(),
            store: store.clone(),
            queue: queue.clone(),
        },
        pricing,
    );
    let worker = FulfillmentWorker::with_runtime(
        FulfillmentWorkerPorts {
            orders: orders.clone(),
            chats,
            store: store.clone(),
            generator: generator.clone(),
            messenger: messenger.clone(),
        },
        AdminNotifier::new(messenger.clone(), Some(ChatId::new(ADMIN))),
        Arc::new(MutableClock::new(Utc::now())),
        FulfillmentWorkerRuntime {
            sleeper: Arc::new(ImmediateSleeper),
            jitter: Arc::new(NoJitter),
        },
        FulfillmentWorkerConfig::default(),
    );
    let consumer = QueueConsumer::new(
        queue.clone(),
        Arc::new(worker),
        QueueConsumerConfig::default(),
    );

    Harness {
        messenger,
        orders,
        store,
        queue,
        generator,
        state: HttpState::new(Arc::new(dispatcher)),
        consumer,
    }
}

fn sender() -> serde_json::Value {
    json!({"id": CHAT, "is_bot": false, "first_name": "Mira", "language_code": "en"})
}

fn chat() -> serde_json::Value {
    json!({"id": CHAT, "type": "private", "first_name": "Mira"})
}

fn photo_update() -> serde_json::Value {
    json!({
        "update_id": 100,
        "message": {
            "message_id": 1,
            "chat": chat(),
            "from": sender(),
            "photo": [
                {"file_id": "photo-small", "file_unique_id": "s", "width": 90, "height": 90},
                {"file_id": "photo-large", "file_unique_id": "l", "width": 1280, "height": 960}
            ]
        }
    })
}

fn callback_update(data: &str) -> serde_json::Value {
    json!({
        "update_id": 101,
        "callback_query": {
            "id": "cb-1",
            "from": sender(),
            "chat_instance": "ci",
            "message": {"message_id": 2, "chat": chat()},
            "data": data
        }
    })
}

fn pre_checkout_update(payload: &str, amount: u32) -> serde_json::Value {
    json!({
        "update_id": 102,
        "pre_checkout_query": {
            "id": "pcq-1",
            "from": sender(),
            "currency": STARS_CURRENCY,
            "total_amount": amount,
            "invoice_payload": payload
        }
    })
}

fn payment_update(payload: &str, amount: u32) -> serde_json::Value {
    json!({
        "update_id": 103,
        "message": {
            "message_id": 3,
            "chat": chat(),
            "from": sender(),
            "successful_payment": {
                "currency": STARS_CURRENCY,
                "total_amount": amount,
                "invoice_payload": payload,
                "telegram_payment_charge_id": "charge-1",
                "provider_payment_charge_id": ""
            }
        }
    })
}

#[actix_web::test]
async fn paid_photo_is_styled_and_delivered() {
    let harness = harness();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(harness.state.clone()))
            .service(receive_update),
    )
    .await;
    let post = |body: serde_json::Value| {
        test::TestRequest::post()
            .uri("/telegram/webhook")
            .set_json(body)
            .to_request()
    };

    let response = test::call_service(&app, post(photo_update())).await;
    assert_eq!(response.status(), StatusCode::OK);
    let order_id = OrderId::new(1);
    let order = harness.orders.get(order_id).expect("order created");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.input_image_path.as_str(), "4242/file_7.jpg");
    assert_eq!(harness.store.bytes("4242/file_7.jpg"), Some(vec![0xFF, 0xD8, 0x01]));

    let keyboard = harness.messenger.messages()[0]
        .keyboard
        .clone()
        .expect("style keyboard");
    let anime = keyboard
        .rows
        .iter()
        .flatten()
        .find(|button| button.callback_data.starts_with("anime:"))
        .expect("anime button")
        .callback_data
        .clone();
    assert_eq!(anime, "anime:1");

    let response = test::call_service(&app, post(callback_update(&anime))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        harness.orders.get(order_id).and_then(|order| order.style),
        Some(Style::Anime)
    );
    let invoices = harness.messenger.invoices();
    assert_eq!(invoices.len(), 1);
    assert_eq!(invoices[0].chat_id, ChatId::new(CHAT));
    assert_eq!(invoices[0].payload, InvoicePayload::new(order_id));
    assert_eq!(invoices[0].prices[0].amount, 25);
    let payload = invoices[0].payload.encode();

    let response = test::call_service(&app, post(pre_checkout_update(&payload, 25))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let answers = harness.messenger.pre_checkout_answers();
    assert_eq!(answers.len(), 1);
    assert!(answers[0].ok);

    let response = test::call_service(&app, post(payment_update(&payload, 25))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let paid = harness.orders.get(order_id).expect("paid order");
    assert_eq!(paid.status, OrderStatus::Processing);
    assert_eq!(paid.payment_charge_id.as_deref(), Some("charge-1"));
    assert_eq!(harness.queue.len(), 1);
    assert!(
        harness
            .messenger
            .messages()
            .iter()
            .any(|message| message.chat_id == ChatId::new(ADMIN))
    );

    let claimed = harness.consumer.poll_once().await.expect("poll queue");
    assert_eq!(claimed, 1);
    assert!(harness.queue.is_empty());

    let delivered = harness.orders.get(order_id).expect("delivered order");
    assert_eq!(delivered.status, OrderStatus::Sent);
    assert_eq!(
        delivered.output_image_path.as_ref().map(|key| key.as_str()),
        Some("4242/output-1.jpeg")
    );
    assert_eq!(
        harness.store.bytes("4242/output-1.jpeg"),
        Some(vec![0xFF, 0xD8, 0x02])
    );
    let requests = harness.generator.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].image, vec![0xFF, 0xD8, 0x01]);
    let photos = harness.messenger.photos();
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0].chat_id, ChatId::new(CHAT));
    assert_eq!(photos[0].bytes, vec![0xFF, 0xD8, 0x02]);
    assert!(
        photos[0]
            .caption
            .as_deref()
            .is_some_and(|caption| caption.contains("Anime"))
    );

    assert_eq!(harness.consumer.poll_once().await.expect("idle poll"), 0);

    let response = test::call_service(&app, post(payment_update(&payload, 25))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let settled = harness.orders.get(order_id).expect("settled order");
    assert_eq!(settled.status, OrderStatus::Sent);
    assert_eq!(
        settled.output_image_path.as_ref().map(|key| key.as_str()),
        Some("4242/output-1.jpeg")
    );
    assert!(harness.queue.is_empty());
    assert_eq!(harness.messenger.photos().len(), 1);
}

#[actix_web::test]
async fn payment_for_unknown_order_enqueues_nothing() {
    let harness = harness();
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(harness.state.clone()))
            .service(receive_update),
    )
    .await;
    let payload = InvoicePayload::new(OrderId::new(99)).encode();

    let response = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/telegram/webhook")
            .set_json(payment_update(&payload, 25))
            .to_request(),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(harness.queue.is_empty());
    assert!(harness.messenger.photos().is_empty());
}
