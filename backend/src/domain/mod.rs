//! Domain primitives, services, and ports.
//!
//! Purpose: model the photo-stylization order lifecycle independently of
//! Telegram, PostgreSQL, or the image-generation provider. Entities and the
//! order state machine live here alongside the services that drive them;
//! adapters plug in through the traits in [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - Chat, Order, Style, OrderStatus: core entities and the state machine.
//! - UpdateDispatcher: entry point for inbound updates.
//! - FulfillmentWorker: queue-driven order fulfillment.

pub mod admin;
pub mod chat;
pub mod chat_registry;
pub mod error;
pub mod fulfillment_worker;
pub mod invoice;
pub mod messages;
pub mod object_key;
pub mod order;
pub mod order_intake;
pub mod payment;
pub mod ports;
mod service_support;
pub mod style_choice;
pub mod style_selection;
pub mod update;
pub mod update_dispatcher;

pub use self::admin::AdminNotifier;
pub use self::chat::{Chat, ChatId, ChatProfile};
pub use self::chat_registry::ChatRegistry;
pub use self::error::{Error, ErrorCode};
pub use self::fulfillment_worker::{
    AttemptJitter, BackoffJitter, FailureKind, FulfillmentWorker, FulfillmentWorkerConfig,
    FulfillmentWorkerPorts, FulfillmentWorkerRuntime, JobFailure, JobOutcome, JobReport,
    RetrySleeper, TokioSleeper,
};
pub use self::invoice::{
    Invoice, InvoicePayload, InvoicePayloadError, LabeledPrice, PricingPolicy, STARS_CURRENCY,
};
pub use self::messages::Locale;
pub use self::object_key::{ObjectKey, ObjectKeyError};
pub use self::order::{
    NewOrder, Order, OrderId, OrderStatus, Style, UnknownStatus, UnknownStyle,
};
pub use self::order_intake::{OrderIntake, style_keyboard};
pub use self::payment::PaymentService;
pub use self::style_choice::{StyleChoice, StyleChoiceError};
pub use self::style_selection::StyleSelection;
pub use self::update::{
    ChatContext, InboundUpdate, PaymentReceipt, PhotoSize, PreCheckoutQuery, UpdateKind,
    largest_photo,
};
pub use self::update_dispatcher::{BotPorts, UpdateDispatcher};
